// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Base64 image payload ready to be sent inline to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone)]
pub struct EncodedUpload {
    pub filename: String,
    pub image: EncodedImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "spring" => Some(Season::Spring),
            "summer" => Some(Season::Summer),
            "fall" | "autumn" => Some(Season::Fall),
            "winter" => Some(Season::Winter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothingItem {
    pub id: Uuid,
    pub image: EncodedImage,
    pub filename: String,
    pub category: String,
    pub primary_color: String,
    #[serde(default)]
    pub secondary_colors: Vec<String>,
    pub style: String,
    pub seasons: BTreeSet<Season>,
    pub formality: u8,
    pub pattern: Option<String>,
    pub material: Option<String>,
    pub description: String,
    pub added_at: DateTime<Utc>,
}

impl ClothingItem {
    /// One line of the wardrobe listing sent with a generation request.
    pub fn summary_line(&self) -> String {
        let colors = std::iter::once(&self.primary_color)
            .chain(&self.secondary_colors)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/");
        let mut look = vec![colors.as_str()];
        if let Some(pattern) = &self.pattern {
            look.push(pattern);
        }
        if let Some(material) = &self.material {
            look.push(material);
        }
        format!(
            "{}: {}, {} style, formality {}/5",
            self.category,
            look.join(" "),
            self.style,
            self.formality
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Occasion {
    Casual,
    BusinessCasual,
    Formal,
    Party,
    Workout,
    DateNight,
    Brunch,
}

impl fmt::Display for Occasion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Occasion::Casual => "casual",
            Occasion::BusinessCasual => "business-casual",
            Occasion::Formal => "formal",
            Occasion::Party => "party",
            Occasion::Workout => "workout",
            Occasion::DateNight => "date-night",
            Occasion::Brunch => "brunch",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outfit {
    pub name: String,
    /// Offsets into the wardrobe snapshot the outfit was generated from.
    pub items: Vec<usize>,
    /// The ids those offsets pointed at when the outfit was generated.
    pub item_ids: Vec<Uuid>,
    pub reasoning: String,
    pub color_harmony: String,
    pub rating: i64,
    pub missing_piece: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookbook {
    pub occasion: Occasion,
    pub location: Option<String>,
    pub weather_info: Option<String>,
    pub trend_insights: Option<String>,
    pub outfits: Vec<Outfit>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingPieceVisualization {
    pub id: Uuid,
    pub description: String,
    pub image: EncodedImage,
    pub outfit_index: usize,
    pub created_at: DateTime<Utc>,
}

/// An outfit with its items looked up in the current wardrobe.
#[derive(Debug, Clone, Serialize)]
pub struct OutfitView {
    #[serde(flatten)]
    pub outfit: Outfit,
    pub resolved_items: Vec<ClothingItem>,
    pub missing_items: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookbookView {
    pub occasion: Occasion,
    pub location: Option<String>,
    pub weather_info: Option<String>,
    pub trend_insights: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub outfits: Vec<OutfitView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_parsing_accepts_autumn() {
        assert_eq!(Season::parse(" Autumn "), Some(Season::Fall));
        assert_eq!(Season::parse("WINTER"), Some(Season::Winter));
        assert_eq!(Season::parse("monsoon"), None);
    }

    #[test]
    fn summary_line_lists_every_color() {
        let mut item = crate::services::wardrobe::sample_item("shirt");
        item.material = Some("cotton".to_string());
        assert_eq!(
            item.summary_line(),
            "shirt: navy/white solid cotton, casual style, formality 2/5"
        );

        item.secondary_colors.clear();
        item.pattern = None;
        assert_eq!(item.summary_line(), "shirt: navy cotton, casual style, formality 2/5");
    }

    #[test]
    fn occasion_uses_kebab_case_everywhere() {
        let parsed: Occasion = serde_json::from_str("\"date-night\"").unwrap();
        assert_eq!(parsed, Occasion::DateNight);
        assert_eq!(Occasion::BusinessCasual.to_string(), "business-casual");
    }
}
