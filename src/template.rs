//! # Prompt template
//!
//! The assistant sends the generative model a single prompt built from a fixed
//! template with two placeholders:
//!
//! - `{question}`: the user's question, verbatim;
//! - `{context}`: the retrieved corpus entries, space-joined.
//!
//! The built-in template is Portuguese and frames the model as an expert on the
//! Chamber of Deputies. A YAML file can replace it:
//!
//! ```yaml
//! # data/prompt.yaml
//! prompt: |
//!   Responda em uma frase.
//!   Pergunta: {question}
//!   Dados: {context}
//! ```
//!
//! ```no_run
//! use camara_rag::template::{PromptTemplate, load_template};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let template: PromptTemplate = load_template("data/prompt.yaml")?;
//! println!("{}", template.render("Quem é o líder?", &["Ana PL SP".to_string()]));
//! # Ok(()) }
//! ```

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path};

const DEFAULT_PROMPT: &str = "\
Você é um especialista em política brasileira e na Câmara dos Deputados em Brasília.

Baseando-se nas informações abaixo, responda a pergunta do usuário.

• Pergunta:
{question}

• Base de Dados:
{context}
";

/// A prompt with `{question}` and `{context}` placeholders.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PromptTemplate {
    pub prompt: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Fill in the question and the space-joined contexts.
    ///
    /// Placeholders are filled in a single pass over the template, so inserted
    /// text is never scanned for placeholders itself.
    pub fn render(&self, question: &str, contexts: &[String]) -> String {
        let context = contexts.join(" ");
        let mut out = String::with_capacity(self.prompt.len() + question.len() + context.len());
        let mut rest = self.prompt.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{question}") {
                out.push_str(question);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{context}") {
                out.push_str(&context);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// Load a prompt template from a YAML file.
///
/// ### Errors
/// Returns an error if the file cannot be read, is not valid YAML, or lacks
/// either placeholder.
pub fn load_template(path: impl AsRef<Path>) -> Result<PromptTemplate, Box<dyn Error>> {
    let path = path.as_ref();
    tracing::info!("Loading template: {}", path.display());

    let content = fs::read_to_string(path)?;
    let template: PromptTemplate = serde_yaml::from_str(&content)?;
    for placeholder in ["{question}", "{context}"] {
        if !template.prompt.contains(placeholder) {
            return Err(format!("template {} has no {placeholder}", path.display()).into());
        }
    }
    Ok(template)
}
