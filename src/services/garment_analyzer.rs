// src/services/garment_analyzer.rs
use crate::errors::{ServiceError, StylistError};
use crate::models::{ClothingItem, EncodedUpload, Season};
use crate::services::gemini_service::{
    Content, GenerateContentRequest, GenerationConfig, ModelRole, Part, StyleService, json_body,
};
use crate::services::image_processor::{ImageProcessor, RawUpload};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

const ANALYSIS_PROMPT: &str = r#"Analyze this clothing item in detail. Return a JSON object with:
- category (e.g., "shirt", "pants", "dress", "jacket", "shoes", "accessories")
- primaryColor (main color)
- secondaryColors (array of other colors)
- style (e.g., "casual", "formal", "sporty", "bohemian", "streetwear")
- season (array: can be "spring", "summer", "fall", "winter")
- formality (1-5 scale, 1=very casual, 5=very formal)
- pattern (e.g., "solid", "striped", "floral", "geometric")
- material (e.g., "cotton", "denim", "wool", "leather")
- description (brief 1-2 sentence description)"#;

fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "category": { "type": "string" },
            "primaryColor": { "type": "string" },
            "secondaryColors": { "type": "array", "items": { "type": "string" } },
            "style": { "type": "string" },
            "season": { "type": "array", "items": { "type": "string" } },
            "formality": { "type": "number" },
            "pattern": { "type": "string" },
            "material": { "type": "string" },
            "description": { "type": "string" }
        },
        "required": ["category", "primaryColor", "style", "season", "formality", "description"]
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarmentAttributes {
    category: Option<String>,
    primary_color: Option<String>,
    #[serde(default)]
    secondary_colors: Option<Vec<String>>,
    style: Option<String>,
    season: Option<OneOrMany>,
    formality: Option<f64>,
    pattern: Option<String>,
    material: Option<String>,
    description: Option<String>,
}

/// An upload that did not make it into the wardrobe.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedUpload {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub analyzed: Vec<ClothingItem>,
    pub rejected: Vec<RejectedUpload>,
    /// Set when the service became unreachable and the rest of the batch was skipped.
    pub aborted: Option<StylistError>,
}

pub struct GarmentAnalyzer {
    service: Arc<dyn StyleService>,
}

impl GarmentAnalyzer {
    pub fn new(service: Arc<dyn StyleService>) -> Self {
        Self { service }
    }

    pub fn request(upload: &EncodedUpload) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::image(&upload.image),
                Part::text(ANALYSIS_PROMPT),
            ])],
            tools: None,
            generation_config: Some(GenerationConfig::json(analysis_schema())),
        }
    }

    pub async fn analyze(&self, upload: &EncodedUpload) -> Result<ClothingItem, StylistError> {
        let response = self
            .service
            .generate_content(ModelRole::Analysis, &Self::request(upload))
            .await
            .map_err(StylistError::Analysis)?;

        let text = response.text().ok_or_else(|| {
            StylistError::Analysis(ServiceError::Parse("No text in analysis response".to_string()))
        })?;

        let item = parse_garment(text, upload).map_err(StylistError::Analysis)?;
        log::info!(
            "Analyzed {} as {} ({})",
            upload.filename,
            item.category,
            item.primary_color
        );
        Ok(item)
    }

    /// Analyzes photos one after another, in the order given.
    pub async fn analyze_batch(
        &self,
        processor: &ImageProcessor,
        uploads: Vec<RawUpload>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for raw in uploads {
            let encoded = match processor.encode(&raw.filename, &raw.data) {
                Ok(encoded) => encoded,
                Err(e) => {
                    log::warn!("Skipping {}: {}", raw.filename, e);
                    outcome.rejected.push(RejectedUpload {
                        filename: raw.filename,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.analyze(&encoded).await {
                Ok(item) => outcome.analyzed.push(item),
                Err(StylistError::Analysis(ServiceError::Parse(reason))) => {
                    log::warn!("Rejected analysis of {}: {}", encoded.filename, reason);
                    outcome.rejected.push(RejectedUpload {
                        filename: encoded.filename,
                        reason,
                    });
                }
                Err(e) => {
                    log::error!("Aborting upload batch at {}: {}", encoded.filename, e);
                    outcome.aborted = Some(e);
                    break;
                }
            }
        }

        outcome
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Parse(format!("Missing {} in analysis", field)))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_garment(text: &str, upload: &EncodedUpload) -> Result<ClothingItem, ServiceError> {
    let attrs: GarmentAttributes = serde_json::from_str(json_body(text))
        .map_err(|e| ServiceError::Parse(format!("Failed to parse analysis JSON: {}", e)))?;

    let formality = attrs
        .formality
        .ok_or_else(|| ServiceError::Parse("Missing formality in analysis".to_string()))?
        .round();
    if !(1.0..=5.0).contains(&formality) {
        return Err(ServiceError::Parse(format!(
            "Formality {} outside 1-5",
            formality
        )));
    }

    let raw_seasons = match attrs.season {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(list)) => list,
        None => Vec::new(),
    };
    let seasons = raw_seasons
        .iter()
        .map(|s| {
            Season::parse(s).ok_or_else(|| ServiceError::Parse(format!("Unknown season {:?}", s)))
        })
        .collect::<Result<BTreeSet<_>, _>>()?;
    if seasons.is_empty() {
        return Err(ServiceError::Parse("Missing season in analysis".to_string()));
    }

    Ok(ClothingItem {
        id: Uuid::new_v4(),
        image: upload.image.clone(),
        filename: upload.filename.clone(),
        category: required(attrs.category, "category")?,
        primary_color: required(attrs.primary_color, "primaryColor")?,
        secondary_colors: attrs
            .secondary_colors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| optional(Some(c)))
            .collect(),
        style: required(attrs.style, "style")?,
        seasons,
        formality: formality as u8,
        pattern: optional(attrs.pattern),
        material: optional(attrs.material),
        description: required(attrs.description, "description")?,
        added_at: chrono::Utc::now(),
    })
}
