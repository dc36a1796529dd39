// src/services/conversation.rs
use crate::errors::{ServiceError, StylistError};
use crate::models::{ConversationTurn, Role};
use crate::services::gemini_service::{
    Content, GenerateContentRequest, GenerationConfig, ModelRole, StyleService,
};

/// Append-only history of the styling conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    turns: Vec<ConversationTurn>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts over from a completed outfit generation.
    pub fn seeded(request_summary: &str, raw_response: &str) -> Self {
        Self {
            turns: vec![
                ConversationTurn::user(request_summary),
                ConversationTurn::model(raw_response),
            ],
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Records the user's message. Returns false for blank input.
    ///
    /// Resending the message of an unanswered user turn reuses that turn.
    pub fn push_user(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let pending = self
            .turns
            .last()
            .is_some_and(|last| last.role == Role::User && last.text == text);
        if !pending {
            self.turns.push(ConversationTurn::user(text));
        }
        true
    }

    pub fn push_model(&mut self, text: String) {
        self.turns.push(ConversationTurn::model(text));
    }

    pub fn request(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: self.turns.iter().map(Content::from).collect(),
            tools: None,
            generation_config: Some(GenerationConfig::default().with_thinking("medium")),
        }
    }

    pub async fn refine(
        &mut self,
        service: &dyn StyleService,
        text: &str,
    ) -> Result<Option<String>, StylistError> {
        if !self.push_user(text) {
            return Ok(None);
        }
        let reply = request_reply(service, self.request()).await?;
        self.push_model(reply.clone());
        Ok(Some(reply))
    }
}

/// Sends a history and pulls the model's text answer out of the response.
pub async fn request_reply(
    service: &dyn StyleService,
    request: GenerateContentRequest,
) -> Result<String, StylistError> {
    let response = service
        .generate_content(ModelRole::Refinement, &request)
        .await
        .map_err(StylistError::Refinement)?;

    response
        .text()
        .map(str::to_string)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            StylistError::Refinement(ServiceError::Parse("No text in refinement reply".to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::ScriptedService;

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let service = ScriptedService::new();
        let mut session = ConversationSession::seeded("Generated outfits", "{}");

        assert_eq!(session.refine(&service, "").await.unwrap(), None);
        assert_eq!(session.refine(&service, "   ").await.unwrap(), None);

        assert_eq!(session.len(), 2);
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_refinement_adds_user_then_model() {
        let service = ScriptedService::new().reply_text("Swap the shirt for a knit.");
        let mut session = ConversationSession::seeded("Generated outfits", "{\"outfits\":[]}");

        let reply = session.refine(&service, " make it warmer ").await.unwrap();

        assert_eq!(reply.as_deref(), Some("Swap the shirt for a knit."));
        assert_eq!(session.len(), 4);
        assert_eq!(session.turns()[2], ConversationTurn::user("make it warmer"));
        assert_eq!(session.turns()[3].role, Role::Model);

        let (role, body) = service.request(0);
        assert_eq!(role, ModelRole::Refinement);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "make it warmer");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingLevel"], "medium");
    }

    #[tokio::test]
    async fn failed_refinement_keeps_only_the_user_turn() {
        let service = ScriptedService::new().reply(Err(ServiceError::Transport("timeout".into())));
        let mut session = ConversationSession::seeded("Generated outfits", "{}");

        let err = session.refine(&service, "make it warmer").await.unwrap_err();

        assert!(matches!(err, StylistError::Refinement(_)));
        assert_eq!(session.len(), 3);
        assert_eq!(session.turns()[2].role, Role::User);
    }

    #[tokio::test]
    async fn retry_resubmits_the_pending_user_turn() {
        let service = ScriptedService::new()
            .reply(Err(ServiceError::Transport("timeout".into())))
            .reply_text("Layer a wool coat.");
        let mut session = ConversationSession::seeded("Generated outfits", "{}");

        session.refine(&service, "make it warmer").await.unwrap_err();
        let reply = session.refine(&service, " make it warmer").await.unwrap();

        assert_eq!(reply.as_deref(), Some("Layer a wool coat."));
        let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User, Role::Model]);

        let (_, body) = service.request(1);
        let sent: Vec<&str> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(sent, vec!["user", "model", "user"]);
    }

    #[test]
    fn a_new_message_after_a_failure_is_still_recorded() {
        let mut session = ConversationSession::seeded("Generated outfits", "{}");
        assert!(session.push_user("make it warmer"));
        assert!(session.push_user("actually, make it cooler"));
        assert_eq!(session.len(), 4);
    }

    #[tokio::test]
    async fn empty_reply_is_a_parse_failure() {
        let service = ScriptedService::new().reply_text("  ");
        let mut session = ConversationSession::new();

        let err = session.refine(&service, "hello").await.unwrap_err();
        assert!(matches!(err, StylistError::Refinement(ServiceError::Parse(_))));
        assert_eq!(session.len(), 1);
    }
}
