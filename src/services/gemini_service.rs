// src/services/gemini_service.rs
use crate::config::ModelConfig;
use crate::errors::ServiceError;
use crate::models::{ConversationTurn, EncodedImage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Which configured model a request is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Analysis,
    Generation,
    Refinement,
    Image,
}

#[async_trait]
pub trait StyleService: Send + Sync {
    async fn generate_content(
        &self,
        role: ModelRole,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ServiceError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

impl From<&ConversationTurn> for Content {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: Some(turn.role.as_str().to_string()),
            parts: vec![Part::text(turn.text.clone())],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn image(image: &EncodedImage) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: serde_json::Value,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: serde_json::json!({}),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

impl GenerationConfig {
    pub fn json(schema: serde_json::Value) -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Self::default()
        }
    }

    pub fn with_thinking(mut self, level: &str) -> Self {
        self.thinking_config = Some(ThinkingConfig {
            thinking_level: level.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_level: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
    #[serde(rename = "inlineData", alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// First text part of the first candidate.
    pub fn text(&self) -> Option<&str> {
        self.parts().find_map(|p| p.text.as_deref())
    }

    pub fn inline_image(&self) -> Option<&InlineData> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn from_text(text: &str) -> Self {
        Self::from_parts(vec![ResponsePart {
            text: Some(text.to_string()),
            inline_data: None,
        }])
    }

    #[cfg(test)]
    pub(crate) fn from_parts(parts: Vec<ResponsePart>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent { parts }),
            }],
        }
    }
}

/// Strips a markdown code fence the model sometimes wraps JSON in.
pub fn json_body(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Gemini `generateContent` REST client.
pub struct GeminiService {
    client: Client,
    base_url: String,
    models: ModelConfig,
    api_key: RwLock<Option<String>>,
}

impl GeminiService {
    pub fn new(base_url: String, models: ModelConfig, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            models,
            api_key: RwLock::new(api_key),
        }
    }

    pub fn set_api_key(&self, api_key: String) {
        if let Ok(mut slot) = self.api_key.write() {
            *slot = Some(api_key);
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn model(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Analysis => &self.models.analysis,
            ModelRole::Generation => &self.models.generation,
            ModelRole::Refinement => &self.models.refinement,
            ModelRole::Image => &self.models.image,
        }
    }
}

#[async_trait]
impl StyleService for GeminiService {
    async fn generate_content(
        &self,
        role: ModelRole,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ServiceError> {
        let api_key = self
            .api_key
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or(ServiceError::MissingCredential)?;

        let model = self.model(role);
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        log::debug!("POST {} ({:?})", url, role);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(format!("{} request failed: {}", model, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorWrapper>(&body)
                .ok()
                .map(|w| match (w.error.status, w.error.message) {
                    (Some(s), Some(m)) => format!("{}: {}", s, m),
                    (None, Some(m)) => m,
                    (Some(s), None) => s,
                    (None, None) => body.clone(),
                })
                .unwrap_or(body);
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(format!("Failed to read {} response: {}", model, e)))?;

        serde_json::from_str(&body)
            .map_err(|e| ServiceError::Parse(format!("Failed to parse {} response: {}", model, e)))
    }
}
