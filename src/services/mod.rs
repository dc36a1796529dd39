// src/services/mod.rs
pub mod conversation;
pub mod garment_analyzer;
pub mod gemini_service;
pub mod image_processor;
pub mod outfit_generator;
pub mod storage;
pub mod visualizer;
pub mod wardrobe;

#[cfg(test)]
pub(crate) mod testing;

pub use gemini_service::{GeminiService, StyleService};
pub use image_processor::{ImageProcessor, RawUpload};
pub use storage::{KeyValueStore, MemoryStore, RedisStore};
