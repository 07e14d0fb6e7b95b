//! Test doubles shared by the unit tests.

use std::cell::RefCell;

use crate::{
    assistant::Generator,
    embedding::{EmbedResult, Embedder},
    error::AssistantError,
};

/// Bag-of-keywords embedder: component `i` counts occurrences of keyword `i`.
pub struct KeywordEmbedder {
    keywords: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl Embedder for KeywordEmbedder {
    fn dimension(&self) -> usize {
        self.keywords.len()
    }

    fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                self.keywords
                    .iter()
                    .map(|k| text.matches(k.as_str()).count() as f32)
                    .collect()
            })
            .collect())
    }
}

pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dimension(&self) -> usize {
        1
    }

    fn embed(&self, _texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        Err("model unavailable".into())
    }
}

/// Records every prompt and answers with a canned reply.
pub struct RecordingGenerator {
    answer: Option<String>,
    prompts: RefCell<Vec<String>>,
}

impl RecordingGenerator {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answer
            .clone()
            .ok_or_else(|| AssistantError::Generation("quota exceeded".to_string()))
    }
}
