// src/lib.rs
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod stylist;

use std::sync::Arc;

use crate::services::{GeminiService, KeyValueStore};
use crate::stylist::Stylist;

#[derive(Clone)]
pub struct AppState {
    pub stylist: Arc<Stylist>,
    pub gemini: Arc<GeminiService>,
    pub store: Arc<dyn KeyValueStore>,
}
