// src/services/outfit_generator.rs
use crate::errors::{ServiceError, StylistError};
use crate::models::{ClothingItem, Lookbook, Occasion, Outfit};
use crate::services::gemini_service::{
    Content, GenerateContentRequest, GenerationConfig, ModelRole, Part, StyleService, Tool,
    json_body,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const MIN_WARDROBE_SIZE: usize = 3;
pub const OUTFITS_PER_LOOKBOOK: usize = 3;

/// A validated generation plus the text the conversation is seeded with.
#[derive(Debug, Clone)]
pub struct GeneratedLookbook {
    pub lookbook: Lookbook,
    pub request_summary: String,
    pub raw_response: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLookbook {
    weather_info: Option<String>,
    trend_insights: Option<String>,
    outfits: Option<Vec<RawOutfit>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOutfit {
    name: Option<String>,
    items: Option<Vec<f64>>,
    reasoning: Option<String>,
    color_harmony: Option<String>,
    rating: Option<f64>,
    missing_piece: Option<String>,
}

fn lookbook_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "weatherInfo": { "type": "string" },
            "trendInsights": { "type": "string" },
            "outfits": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "items": { "type": "array", "items": { "type": "number" } },
                        "reasoning": { "type": "string" },
                        "colorHarmony": { "type": "string" },
                        "rating": { "type": "number" },
                        "missingPiece": { "type": "string" }
                    },
                    "required": ["name", "items", "reasoning", "colorHarmony", "rating"]
                }
            }
        },
        "required": ["outfits"]
    })
}

pub fn build_prompt(wardrobe: &[ClothingItem], occasion: Occasion, location: Option<&str>) -> String {
    let listing = wardrobe
        .iter()
        .map(ClothingItem::summary_line)
        .collect::<Vec<_>>()
        .join("\n");

    let place = location.map(|l| format!(" in {}", l)).unwrap_or_default();
    let research = match location {
        Some(l) => format!(
            "First, search for current weather in {} and latest fashion trends for {} occasions.",
            l, occasion
        ),
        None => format!("Search for latest fashion trends for {} occasions.", occasion),
    };

    format!(
        r#"You are a professional fashion stylist. Analyze this wardrobe and create 3 complete outfit combinations for a {occasion} occasion{place}.

Wardrobe items:
{listing}

{research}

Then create 3 outfit combinations. For each outfit:
1. Select specific items from the wardrobe by their index (0-{last})
2. Explain why these pieces work together (color theory, style, occasion appropriateness)
3. Rate the outfit (1-10)
4. Suggest one "missing piece" that would complete/enhance the outfit

Return JSON with this structure:
{{
  "weatherInfo": "current weather if location provided",
  "trendInsights": "2-3 current fashion trends for this occasion",
  "outfits": [
    {{
      "name": "outfit name",
      "items": [array of wardrobe item indices],
      "reasoning": "why this works",
      "colorHarmony": "color theory explanation",
      "rating": 8,
      "missingPiece": "description of item that would enhance this outfit"
    }}
  ]
}}"#,
        last = wardrobe.len().saturating_sub(1),
    )
}

pub struct OutfitGenerator {
    service: Arc<dyn StyleService>,
}

impl OutfitGenerator {
    pub fn new(service: Arc<dyn StyleService>) -> Self {
        Self { service }
    }

    pub async fn generate(
        &self,
        wardrobe: &[ClothingItem],
        occasion: Occasion,
        location: Option<&str>,
    ) -> Result<GeneratedLookbook, StylistError> {
        if wardrobe.len() < MIN_WARDROBE_SIZE {
            return Err(StylistError::Validation(format!(
                "Upload at least {} items to generate outfits (have {})",
                MIN_WARDROBE_SIZE,
                wardrobe.len()
            )));
        }
        let location = location.map(str::trim).filter(|l| !l.is_empty());

        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(build_prompt(
                wardrobe, occasion, location,
            ))])],
            tools: Some(vec![Tool::google_search()]),
            generation_config: Some(GenerationConfig::json(lookbook_schema()).with_thinking("high")),
        };

        let response = self
            .service
            .generate_content(ModelRole::Generation, &request)
            .await
            .map_err(StylistError::Generation)?;

        let raw_response = response
            .text()
            .ok_or_else(|| {
                StylistError::Generation(ServiceError::Parse(
                    "No text in generation response".to_string(),
                ))
            })?
            .to_string();

        let lookbook = parse_lookbook(&raw_response, wardrobe, occasion, location)
            .map_err(StylistError::Generation)?;

        let request_summary = match location {
            Some(l) => format!("Generated outfits for {} occasion in {}", occasion, l),
            None => format!("Generated outfits for {} occasion", occasion),
        };

        log::info!(
            "Generated {} outfits for {} from {} items",
            lookbook.outfits.len(),
            occasion,
            wardrobe.len()
        );

        Ok(GeneratedLookbook {
            lookbook,
            request_summary,
            raw_response,
        })
    }
}

fn field(value: Option<String>, name: &str, outfit: usize) -> Result<String, ServiceError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Parse(format!("Outfit {} is missing {}", outfit, name)))
}

fn parse_outfit(
    raw: RawOutfit,
    position: usize,
    wardrobe: &[ClothingItem],
) -> Result<Outfit, ServiceError> {
    let name = field(raw.name, "name", position)?;
    let reasoning = field(raw.reasoning, "reasoning", position)?;
    let color_harmony = field(raw.color_harmony, "colorHarmony", position)?;
    let rating = raw
        .rating
        .ok_or_else(|| ServiceError::Parse(format!("Outfit {} is missing rating", position)))?
        .round() as i64;
    let indices = raw
        .items
        .ok_or_else(|| ServiceError::Parse(format!("Outfit {} is missing items", position)))?;

    let mut items = Vec::with_capacity(indices.len());
    let mut item_ids = Vec::with_capacity(indices.len());
    for index in indices {
        if index < 0.0 || index.fract() != 0.0 {
            return Err(ServiceError::Parse(format!(
                "Outfit {} has invalid item index {}",
                position, index
            )));
        }
        let index = index as usize;
        match wardrobe.get(index) {
            Some(item) if !items.contains(&index) => {
                items.push(index);
                item_ids.push(item.id);
            }
            Some(_) => {}
            None => log::warn!(
                "Outfit {:?} references item {} outside a wardrobe of {}",
                name,
                index,
                wardrobe.len()
            ),
        }
    }

    Ok(Outfit {
        name,
        items,
        item_ids,
        reasoning,
        color_harmony,
        rating,
        missing_piece: raw
            .missing_piece
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
    })
}

fn parse_lookbook(
    text: &str,
    wardrobe: &[ClothingItem],
    occasion: Occasion,
    location: Option<&str>,
) -> Result<Lookbook, ServiceError> {
    let raw: RawLookbook = serde_json::from_str(json_body(text))
        .map_err(|e| ServiceError::Parse(format!("Failed to parse outfits JSON: {}", e)))?;

    let mut raw_outfits = raw
        .outfits
        .ok_or_else(|| ServiceError::Parse("Missing outfits".to_string()))?;
    if raw_outfits.len() < OUTFITS_PER_LOOKBOOK {
        return Err(ServiceError::Parse(format!(
            "Expected {} outfits, got {}",
            OUTFITS_PER_LOOKBOOK,
            raw_outfits.len()
        )));
    }
    if raw_outfits.len() > OUTFITS_PER_LOOKBOOK {
        log::warn!(
            "Dropping {} extra outfits",
            raw_outfits.len() - OUTFITS_PER_LOOKBOOK
        );
        raw_outfits.truncate(OUTFITS_PER_LOOKBOOK);
    }

    let outfits = raw_outfits
        .into_iter()
        .enumerate()
        .map(|(i, raw)| parse_outfit(raw, i, wardrobe))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Lookbook {
        occasion,
        location: location.map(str::to_string),
        weather_info: raw.weather_info.filter(|w| !w.trim().is_empty()),
        trend_insights: raw.trend_insights.filter(|t| !t.trim().is_empty()),
        outfits,
        generated_at: chrono::Utc::now(),
    })
}

#[cfg(test)]
pub(crate) const THREE_OUTFITS: &str = r#"{
    "weatherInfo": "Sunny, 22C",
    "trendInsights": "Relaxed tailoring",
    "outfits": [
        {"name": "Easy Saturday", "items": [0, 1, 2], "reasoning": "Balanced", "colorHarmony": "Navy base", "rating": 8, "missingPiece": "White sneakers"},
        {"name": "Layered", "items": [1, 2], "reasoning": "Texture", "colorHarmony": "Tonal", "rating": 7.4, "missingPiece": ""},
        {"name": "Minimal", "items": [0, 2, 2, 9], "reasoning": "Clean", "colorHarmony": "Mono", "rating": 6}
    ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::ScriptedService;
    use crate::services::wardrobe::sample_item;

    fn wardrobe() -> Vec<ClothingItem> {
        vec![sample_item("shirt"), sample_item("pants"), sample_item("shoes")]
    }

    #[tokio::test]
    async fn small_wardrobe_never_calls_the_service() {
        let service = Arc::new(ScriptedService::new().reply_text(THREE_OUTFITS));
        let generator = OutfitGenerator::new(service.clone());

        let err = generator
            .generate(&wardrobe()[..2], Occasion::Casual, None)
            .await
            .unwrap_err();

        assert!(matches!(err, StylistError::Validation(_)));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn valid_response_yields_three_outfits() {
        let service = Arc::new(ScriptedService::new().reply_text(THREE_OUTFITS));
        let generator = OutfitGenerator::new(service.clone());
        let items = wardrobe();

        let result = generator
            .generate(&items, Occasion::Casual, Some("  "))
            .await
            .unwrap();

        let outfits = &result.lookbook.outfits;
        assert_eq!(outfits.len(), 3);
        assert_eq!(outfits[0].items, vec![0, 1, 2]);
        assert_eq!(outfits[0].item_ids, vec![items[0].id, items[1].id, items[2].id]);
        assert_eq!(outfits[1].rating, 7);
        assert_eq!(outfits[1].missing_piece, None);
        // duplicate and out-of-range indices are dropped
        assert_eq!(outfits[2].items, vec![0, 2]);
        assert!(outfits.iter().all(|o| o.items.iter().all(|i| *i < 3)));

        assert_eq!(result.lookbook.location, None);
        assert_eq!(result.request_summary, "Generated outfits for casual occasion");
        assert_eq!(result.raw_response, THREE_OUTFITS);
    }

    #[tokio::test]
    async fn request_mentions_location_and_every_item() {
        let service = Arc::new(ScriptedService::new().reply_text(THREE_OUTFITS));
        let generator = OutfitGenerator::new(service.clone());

        let result = generator
            .generate(&wardrobe(), Occasion::DateNight, Some("Lisbon"))
            .await
            .unwrap();
        assert_eq!(
            result.request_summary,
            "Generated outfits for date-night occasion in Lisbon"
        );

        let (role, body) = service.request(0);
        assert_eq!(role, ModelRole::Generation);
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("date-night occasion in Lisbon"));
        assert!(prompt.contains("current weather in Lisbon"));
        assert!(prompt.contains("(0-2)"));
        assert!(prompt.contains("shoes: navy/white solid, casual style, formality 2/5"));
        assert_eq!(body["tools"][0]["googleSearch"], json!({}));
    }

    #[test]
    fn too_few_or_incomplete_outfits_fail() {
        let items = wardrobe();
        let two = r#"{"outfits":[
            {"name":"a","items":[0],"reasoning":"r","colorHarmony":"c","rating":5},
            {"name":"b","items":[1],"reasoning":"r","colorHarmony":"c","rating":5}
        ]}"#;
        assert!(parse_lookbook(two, &items, Occasion::Formal, None).is_err());

        let no_rating = r#"{"outfits":[
            {"name":"a","items":[0],"reasoning":"r","colorHarmony":"c","rating":5},
            {"name":"b","items":[1],"reasoning":"r","colorHarmony":"c","rating":5},
            {"name":"c","items":[2],"reasoning":"r","colorHarmony":"c"}
        ]}"#;
        assert!(parse_lookbook(no_rating, &items, Occasion::Formal, None).is_err());

        let fractional = r#"{"outfits":[
            {"name":"a","items":[0.5],"reasoning":"r","colorHarmony":"c","rating":5},
            {"name":"b","items":[1],"reasoning":"r","colorHarmony":"c","rating":5},
            {"name":"c","items":[2],"reasoning":"r","colorHarmony":"c","rating":5}
        ]}"#;
        assert!(parse_lookbook(fractional, &items, Occasion::Formal, None).is_err());

        assert!(parse_lookbook("{}", &items, Occasion::Formal, None).is_err());
    }
}
