//! # Assistant
//!
//! Retrieval-augmented question answering over the corpus.
//!
//! An [`AssistantSession`] owns everything one interactive session needs: the
//! corpus, the embedder, the generative model client and the prompt template.
//! The index is built lazily, on the first question:
//!
//! ```text
//! Uninitialized ──first question──▶ Indexing ──ok──▶ Ready ◀──┐
//!       ▲                              │                │      │ question
//!       └────────────failure───────────┘                └──────┘
//! ```
//!
//! Each question is answered independently. Nothing from earlier turns is
//! carried into the prompt.
//!
//! [`AssistantSession::answer`] returns a typed [`AssistantError`];
//! [`AssistantSession::reply`] is what the chat surface calls and folds every
//! failure into the generic message.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use tracing::{debug, error, info};

use crate::{
    config::CamaraConfig,
    corpus::Corpus,
    embedding::Embedder,
    error::{AssistantError, IndexError},
    template::PromptTemplate,
    vector_store::VectorStore,
};

/// A hosted text model: prompt in, completion out.
#[allow(async_fn_in_trait)]
pub trait Generator {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;
}

/// Creates a new OpenAI-compatible API client from configuration.
fn create_client(api_base: &str, api_key: &str) -> Client<OpenAIConfig> {
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key.to_string())
        .with_api_base(api_base.to_string());
    debug!("Client created for {}", api_base);
    Client::with_config(openai_config)
}

/// [`Generator`] backed by any OpenAI-compatible chat completion endpoint.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_base: &str, api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: create_client(api_base, api_key),
            model: model.into(),
        }
    }

    /// Build from configuration; fails when no credential is available.
    pub fn from_config(config: &CamaraConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let api_key = config.resolve_api_key()?;
        Ok(Self::new(&config.api_base, &api_key, config.model.clone()))
    }
}

impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
            name: None,
        });

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(vec![message])
            .build()
            .map_err(|e| AssistantError::Generation(e.to_string()))?;

        debug!("Sending request to {}", self.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AssistantError::Generation(e.to_string()))?;

        let text: String = response
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .collect();

        if text.trim().is_empty() {
            return Err(AssistantError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Indexing,
    Ready,
}

/// One interactive session of the assistant.
pub struct AssistantSession<E, G> {
    corpus: Corpus,
    embedder: E,
    generator: G,
    template: PromptTemplate,
    top_k: usize,
    state: SessionState,
    store: Option<VectorStore>,
}

impl<E: Embedder, G: Generator> AssistantSession<E, G> {
    pub fn new(corpus: Corpus, embedder: E, generator: G, template: PromptTemplate) -> Self {
        Self {
            corpus,
            embedder,
            generator,
            template,
            top_k: 20,
            state: SessionState::Uninitialized,
            store: None,
        }
    }

    /// Number of entries retrieved per question (20 unless overridden).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Embed the corpus and build the index, unless that already happened.
    pub fn ensure_ready(&mut self) -> Result<&VectorStore, AssistantError> {
        if self.store.is_none() {
            self.state = SessionState::Indexing;
            info!("Indexing {} corpus entries", self.corpus.len());
            match VectorStore::build(&self.embedder, self.corpus.texts()) {
                Ok(store) => {
                    self.store = Some(store);
                    self.state = SessionState::Ready;
                    info!("Assistant ready");
                }
                Err(e) => {
                    self.state = SessionState::Uninitialized;
                    return Err(e);
                }
            }
        }
        self.store
            .as_ref()
            .ok_or(AssistantError::Index(IndexError::EmptyCorpus))
    }

    /// Retrieved context strings for `question`, nearest first.
    pub fn retrieve(&mut self, question: &str) -> Result<Vec<String>, AssistantError> {
        let top_k = self.top_k;
        self.ensure_ready()?;
        let store = self
            .store
            .as_ref()
            .ok_or(AssistantError::Index(IndexError::EmptyCorpus))?;
        let hits = store.search(&self.embedder, question, top_k)?;
        debug!("Retrieved {:?}", hits.iter().map(|h| h.index).collect::<Vec<_>>());
        Ok(hits
            .iter()
            .filter_map(|hit| self.corpus.context(hit.index))
            .collect())
    }

    /// Answer one question: retrieve, build the prompt, generate.
    pub async fn answer(&mut self, question: &str) -> Result<String, AssistantError> {
        let contexts = self.retrieve(question)?;
        let prompt = self.template.render(question, &contexts);
        self.generator.generate(&prompt).await
    }

    /// Like [`answer`](Self::answer), but any failure becomes the generic message.
    pub async fn reply(&mut self, question: &str) -> String {
        match self.answer(question).await {
            Ok(text) => text,
            Err(e) => {
                error!("Assistant failed: {e}");
                e.user_message().to_string()
            }
        }
    }
}
