//! Scripted doubles shared by the unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use barista_core::{GatewayError, RetrievedPassage};

use crate::gateway::ModelClient;
use crate::retrieval::Retriever;

/// Model double that replays a fixed sequence of completion results and
/// records every prompt it was given.
pub struct ScriptedModel {
    completions: Mutex<Vec<Result<String, GatewayError>>>,
    prompts: Mutex<Vec<String>>,
    completion_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(completions: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            completions: Mutex::new(completions),
            prompts: Mutex::new(Vec::new()),
            completion_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("prompt log poisoned").push(prompt.to_string());
        let mut completions = self.completions.lock().expect("script poisoned");
        if completions.is_empty() {
            return Err(GatewayError::Unavailable {
                message: "scripted model ran out of replies".to_string(),
            });
        }
        completions.remove(0)
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, GatewayError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0.1, 0.2, 0.3])
    }
}

/// Retriever double returning a fixed passage list.
pub struct ScriptedRetriever {
    passages: Vec<RetrievedPassage>,
    search_calls: AtomicUsize,
}

impl ScriptedRetriever {
    pub fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self { passages, search_calls: AtomicUsize::new(0) }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for ScriptedRetriever {
    async fn search(
        &self,
        _vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, GatewayError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.passages.iter().take(limit).cloned().collect())
    }
}
