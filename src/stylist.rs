// src/stylist.rs
use crate::errors::StylistError;
use crate::models::{
    ClothingItem, ConversationTurn, Lookbook, LookbookView, MissingPieceVisualization, Occasion,
    OutfitView,
};
use crate::services::conversation::{ConversationSession, request_reply};
use crate::services::garment_analyzer::{GarmentAnalyzer, RejectedUpload};
use crate::services::gemini_service::StyleService;
use crate::services::image_processor::{ImageProcessor, RawUpload};
use crate::services::outfit_generator::OutfitGenerator;
use crate::services::storage::KeyValueStore;
use crate::services::visualizer::Visualizer;
use crate::services::wardrobe::WardrobeStore;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Everything the user has built up in this session.
pub struct StylistState {
    pub wardrobe: WardrobeStore,
    pub lookbook: Option<Lookbook>,
    pub conversation: ConversationSession,
    pub visualization: Option<MissingPieceVisualization>,
}

#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub added: Vec<ClothingItem>,
    pub rejected: Vec<RejectedUpload>,
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub busy: bool,
    pub wardrobe_items: usize,
    pub outfits: usize,
    pub conversation_turns: usize,
    pub has_visualization: bool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the session state and runs every user action against it.
///
/// Service calls never hold the state lock: an operation snapshots what it
/// needs, awaits the service, then commits. Only one service-calling
/// operation may be in flight at a time.
pub struct Stylist {
    state: Mutex<StylistState>,
    busy: AtomicBool,
    service: Arc<dyn StyleService>,
    processor: ImageProcessor,
    analyzer: GarmentAnalyzer,
    generator: OutfitGenerator,
    visualizer: Visualizer,
}

impl Stylist {
    pub async fn restore(
        service: Arc<dyn StyleService>,
        store: Arc<dyn KeyValueStore>,
        max_image_dimension: u32,
    ) -> Self {
        let wardrobe = WardrobeStore::restore(store).await;
        Self {
            state: Mutex::new(StylistState {
                wardrobe,
                lookbook: None,
                conversation: ConversationSession::new(),
                visualization: None,
            }),
            busy: AtomicBool::new(false),
            processor: ImageProcessor::new(max_image_dimension),
            analyzer: GarmentAnalyzer::new(service.clone()),
            generator: OutfitGenerator::new(service.clone()),
            visualizer: Visualizer::new(service.clone()),
            service,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard<'_>, StylistError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StylistError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    pub async fn upload(&self, files: Vec<RawUpload>) -> Result<UploadReport, StylistError> {
        if files.is_empty() {
            return Err(StylistError::Validation("No images provided".to_string()));
        }
        let _busy = self.begin()?;

        let outcome = self.analyzer.analyze_batch(&self.processor, files).await;

        let mut state = self.state.lock().await;
        if let Err(e) = state.wardrobe.add(outcome.analyzed.clone()).await {
            if let Some(aborted) = &outcome.aborted {
                log::error!("Upload batch was already aborted: {}", aborted);
            }
            return Err(e);
        }
        log::info!(
            "Added {} items to the wardrobe ({} rejected)",
            outcome.analyzed.len(),
            outcome.rejected.len()
        );

        match outcome.aborted {
            Some(e) => Err(e),
            None => Ok(UploadReport {
                added: outcome.analyzed,
                rejected: outcome.rejected,
            }),
        }
    }

    pub async fn remove_item(&self, id: &Uuid) -> Result<bool, StylistError> {
        let mut state = self.state.lock().await;
        let removed = state.wardrobe.remove(id).await?;
        if removed {
            log::info!("Removed wardrobe item {}", id);
        }
        Ok(removed)
    }

    pub async fn clear_wardrobe(&self) -> Result<(), StylistError> {
        let mut state = self.state.lock().await;
        state.wardrobe.clear().await?;
        state.lookbook = None;
        state.visualization = None;
        log::info!("Cleared wardrobe");
        Ok(())
    }

    pub async fn generate(
        &self,
        occasion: Occasion,
        location: Option<&str>,
    ) -> Result<Lookbook, StylistError> {
        let _busy = self.begin()?;
        let snapshot = self.state.lock().await.wardrobe.all().to_vec();

        let generated = self.generator.generate(&snapshot, occasion, location).await?;

        let mut state = self.state.lock().await;
        state.conversation =
            ConversationSession::seeded(&generated.request_summary, &generated.raw_response);
        state.visualization = None;
        state.lookbook = Some(generated.lookbook.clone());
        Ok(generated.lookbook)
    }

    /// Returns `None` without touching the history when `text` is blank.
    pub async fn refine(&self, text: &str) -> Result<Option<String>, StylistError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let _busy = self.begin()?;

        let request = {
            let mut state = self.state.lock().await;
            state.conversation.push_user(text);
            state.conversation.request()
        };

        let reply = request_reply(self.service.as_ref(), request).await?;

        self.state
            .lock()
            .await
            .conversation
            .push_model(reply.clone());
        Ok(Some(reply))
    }

    /// Renders the missing piece of an outfit. `description` defaults to the
    /// outfit's own suggestion.
    pub async fn visualize(
        &self,
        outfit_index: usize,
        description: Option<&str>,
    ) -> Result<Option<MissingPieceVisualization>, StylistError> {
        let _busy = self.begin()?;

        let description = {
            let state = self.state.lock().await;
            let outfit = state
                .lookbook
                .as_ref()
                .and_then(|l| l.outfits.get(outfit_index))
                .ok_or_else(|| {
                    StylistError::Validation(format!("No outfit at index {}", outfit_index))
                })?;
            description
                .map(str::to_string)
                .filter(|d| !d.trim().is_empty())
                .or_else(|| outfit.missing_piece.clone())
                .ok_or_else(|| {
                    StylistError::Validation(format!(
                        "Outfit {} has no missing piece to visualize",
                        outfit_index
                    ))
                })?
        };

        let visualization = self.visualizer.visualize(&description, outfit_index).await?;

        if let Some(v) = &visualization {
            self.state.lock().await.visualization = Some(v.clone());
        }
        Ok(visualization)
    }

    pub async fn wardrobe(&self) -> Vec<ClothingItem> {
        self.state.lock().await.wardrobe.all().to_vec()
    }

    /// The current outfits with their items looked up by id. Items removed
    /// since generation are skipped and counted.
    pub async fn outfits(&self) -> Option<LookbookView> {
        let state = self.state.lock().await;
        let lookbook = state.lookbook.as_ref()?;

        let outfits = lookbook
            .outfits
            .iter()
            .map(|outfit| {
                let resolved_items: Vec<ClothingItem> = outfit
                    .item_ids
                    .iter()
                    .filter_map(|id| state.wardrobe.get(id).cloned())
                    .collect();
                OutfitView {
                    missing_items: outfit.item_ids.len() - resolved_items.len(),
                    resolved_items,
                    outfit: outfit.clone(),
                }
            })
            .collect();

        Some(LookbookView {
            occasion: lookbook.occasion,
            location: lookbook.location.clone(),
            weather_info: lookbook.weather_info.clone(),
            trend_insights: lookbook.trend_insights.clone(),
            generated_at: lookbook.generated_at,
            outfits,
        })
    }

    pub async fn conversation(&self) -> Vec<ConversationTurn> {
        self.state.lock().await.conversation.turns().to_vec()
    }

    pub async fn visualization(&self) -> Option<MissingPieceVisualization> {
        self.state.lock().await.visualization.clone()
    }

    pub async fn status(&self) -> Status {
        let state = self.state.lock().await;
        Status {
            busy: self.is_busy(),
            wardrobe_items: state.wardrobe.len(),
            outfits: state.lookbook.as_ref().map_or(0, |l| l.outfits.len()),
            conversation_turns: state.conversation.len(),
            has_visualization: state.visualization.is_some(),
        }
    }
}
