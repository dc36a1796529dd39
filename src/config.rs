// src/config.rs
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub analysis: String,
    pub generation: String,
    pub refinement: String,
    pub image: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            analysis: "gemini-3-flash-preview".to_string(),
            generation: "gemini-3-pro-preview".to_string(),
            refinement: "gemini-3-flash-preview".to_string(),
            image: "gemini-3-pro-image-preview".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub models: ModelConfig,
    pub max_image_dimension: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            models: ModelConfig::default(),
            max_image_dimension: 2048,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_image_dimension = match get("STYLIST_MAX_IMAGE_DIMENSION") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!(
                    "Ignoring invalid STYLIST_MAX_IMAGE_DIMENSION={}, using {}",
                    raw,
                    defaults.max_image_dimension
                );
                defaults.max_image_dimension
            }),
            None => defaults.max_image_dimension,
        };

        Self {
            bind_addr: get("STYLIST_BIND_ADDR").unwrap_or(defaults.bind_addr),
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            api_key: get("GEMINI_API_KEY"),
            base_url: get("GEMINI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            models: ModelConfig {
                analysis: get("GEMINI_ANALYSIS_MODEL").unwrap_or(defaults.models.analysis),
                generation: get("GEMINI_GENERATION_MODEL").unwrap_or(defaults.models.generation),
                refinement: get("GEMINI_REFINEMENT_MODEL").unwrap_or(defaults.models.refinement),
                image: get("GEMINI_IMAGE_MODEL").unwrap_or(defaults.models.image),
            },
            max_image_dimension,
        }
    }
}
