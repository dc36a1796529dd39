// src/services/visualizer.rs
use crate::errors::{ServiceError, StylistError};
use crate::models::{EncodedImage, MissingPieceVisualization};
use crate::services::gemini_service::{
    Content, GenerateContentRequest, GenerationConfig, ImageConfig, ModelRole, Part, StyleService,
    Tool,
};
use base64::{Engine as _, engine::general_purpose};
use std::sync::Arc;
use uuid::Uuid;

pub fn product_photo_prompt(description: &str) -> String {
    format!(
        "Generate a professional product photo of this clothing item: {}. \
         The image should look like a high-quality e-commerce product photo with clean background, \
         proper lighting, and show the garment clearly.",
        description
    )
}

pub struct Visualizer {
    service: Arc<dyn StyleService>,
}

impl Visualizer {
    pub fn new(service: Arc<dyn StyleService>) -> Self {
        Self { service }
    }

    /// Returns `None` when the service answered without an image.
    pub async fn visualize(
        &self,
        description: &str,
        outfit_index: usize,
    ) -> Result<Option<MissingPieceVisualization>, StylistError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(StylistError::Validation(
                "Describe the piece to visualize".to_string(),
            ));
        }

        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(product_photo_prompt(description))])],
            tools: Some(vec![Tool::google_search()]),
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: "1:1".to_string(),
                    image_size: "2K".to_string(),
                }),
                ..GenerationConfig::default()
            }),
        };

        let response = self
            .service
            .generate_content(ModelRole::Image, &request)
            .await
            .map_err(StylistError::Visualization)?;

        let Some(inline) = response.inline_image() else {
            log::info!("No image returned for {:?}", description);
            return Ok(None);
        };

        general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| {
                StylistError::Visualization(ServiceError::Parse(format!(
                    "Failed to decode image: {}",
                    e
                )))
            })?;

        Ok(Some(MissingPieceVisualization {
            id: Uuid::new_v4(),
            description: description.to_string(),
            image: EncodedImage {
                mime_type: inline.mime_type.clone(),
                data: inline.data.clone(),
            },
            outfit_index,
            created_at: chrono::Utc::now(),
        }))
    }
}
