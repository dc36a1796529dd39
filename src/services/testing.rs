// src/services/testing.rs
use crate::errors::ServiceError;
use crate::services::gemini_service::{
    GenerateContentRequest, GenerateContentResponse, ModelRole, StyleService,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued responses in order and records what it was asked.
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<GenerateContentResponse, ServiceError>>>,
    calls: Mutex<Vec<(ModelRole, serde_json::Value)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_text(self, text: &str) -> Self {
        self.reply(Ok(GenerateContentResponse::from_text(text)))
    }

    pub fn reply(self, reply: Result<GenerateContentResponse, ServiceError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> (ModelRole, serde_json::Value) {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl StyleService for ScriptedService {
    async fn generate_content(
        &self,
        role: ModelRole,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((role, serde_json::to_value(request).unwrap()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("no scripted reply".into())))
    }
}
