// src/handlers.rs
use crate::models::Occasion;
use crate::services::RawUpload;
use crate::services::storage::save_credential;
use crate::{AppState, errors::StylistError};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use base64::{Engine as _, engine::general_purpose};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub occasion: Occasion,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VisualizeRequest {
    pub outfit_index: usize,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

fn ensure_idle(data: &AppState) -> Result<(), StylistError> {
    if data.stylist.is_busy() {
        return Err(StylistError::Busy);
    }
    Ok(())
}

pub async fn upload_items(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    ensure_idle(&data)?;

    let mut files = Vec::new();
    while let Some(mut field) = payload.try_next().await? {
        let filename = field
            .content_disposition()
            .get_filename()
            .ok_or_else(|| StylistError::Validation("No filename provided".to_string()))?
            .to_string();

        let mut image_data = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }

        files.push(RawUpload {
            filename,
            data: image_data.to_vec(),
        });
    }

    let report = data.stylist.upload(files).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "added": report.added,
        "rejected": report.rejected,
        "count": report.added.len()
    })))
}

pub async fn list_items(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.stylist.wardrobe().await)
}

pub async fn remove_item(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    ensure_idle(&data)?;
    let item_id = path.into_inner();
    let removed = data.stylist.remove_item(&item_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "removed": removed })))
}

pub async fn clear_wardrobe(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    ensure_idle(&data)?;
    data.stylist.clear_wardrobe().await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn generate_outfits(
    data: web::Data<AppState>,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse, Error> {
    ensure_idle(&data)?;
    let request = body.into_inner();
    data.stylist
        .generate(request.occasion, request.location.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(data.stylist.outfits().await))
}

pub async fn get_outfits(data: web::Data<AppState>) -> HttpResponse {
    match data.stylist.outfits().await {
        Some(view) => HttpResponse::Ok().json(view),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Not found",
            "message": "No outfits generated yet"
        })),
    }
}

pub async fn get_conversation(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.stylist.conversation().await)
}

pub async fn refine(
    data: web::Data<AppState>,
    body: web::Json<RefineRequest>,
) -> Result<HttpResponse, Error> {
    ensure_idle(&data)?;
    let reply = data
        .stylist
        .refine(&body.message)
        .await?
        .ok_or_else(|| StylistError::Validation("Message is empty".to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "reply": reply })))
}

pub async fn visualize(
    data: web::Data<AppState>,
    body: web::Json<VisualizeRequest>,
) -> Result<HttpResponse, Error> {
    ensure_idle(&data)?;
    let visualization = data
        .stylist
        .visualize(body.outfit_index, body.description.as_deref())
        .await?;

    Ok(match visualization {
        Some(v) => HttpResponse::Ok().json(v),
        None => HttpResponse::Ok().json(serde_json::json!({
            "visualization": null,
            "message": "No image was produced"
        })),
    })
}

pub async fn get_visualization(data: web::Data<AppState>) -> HttpResponse {
    match data.stylist.visualization().await {
        Some(v) => HttpResponse::Ok().json(v),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Not found",
            "message": "No active visualization"
        })),
    }
}

pub async fn get_visualization_image(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let Some(v) = data.stylist.visualization().await else {
        return Ok(HttpResponse::NotFound().finish());
    };

    let bytes = general_purpose::STANDARD
        .decode(v.image.data.as_bytes())
        .map_err(|e| StylistError::Serialization(format!("Stored image is corrupt: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type(v.image.mime_type)
        .body(bytes))
}

pub async fn set_credential(
    data: web::Data<AppState>,
    body: web::Json<CredentialRequest>,
) -> Result<HttpResponse, Error> {
    let api_key = body.into_inner().api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(StylistError::Validation("API key is empty".to_string()).into());
    }

    save_credential(data.store.as_ref(), &api_key).await?;
    data.gemini.set_api_key(api_key);
    log::info!("Stored new API key");

    Ok(HttpResponse::NoContent().finish())
}

pub async fn status(data: web::Data<AppState>) -> HttpResponse {
    let status = data.stylist.status().await;
    HttpResponse::Ok().json(serde_json::json!({
        "busy": status.busy,
        "credential_set": data.gemini.has_api_key(),
        "wardrobe_items": status.wardrobe_items,
        "outfits": status.outfits,
        "conversation_turns": status.conversation_turns,
        "has_visualization": status.has_visualization
    }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "stylist",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/wardrobe", web::get().to(list_items))
            .route("/wardrobe", web::delete().to(clear_wardrobe))
            .route("/wardrobe/upload", web::post().to(upload_items))
            .route("/wardrobe/{item_id}", web::delete().to(remove_item))
            .route("/outfits", web::get().to(get_outfits))
            .route("/outfits", web::post().to(generate_outfits))
            .route("/conversation", web::get().to(get_conversation))
            .route("/conversation", web::post().to(refine))
            .route("/visualization", web::get().to(get_visualization))
            .route("/visualization", web::post().to(visualize))
            .route("/visualization/image", web::get().to(get_visualization_image))
            .route("/credential", web::put().to(set_credential))
            .route("/status", web::get().to(status)),
    )
    .route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::services::storage::{CREDENTIAL_KEY, MemoryStore};
    use crate::services::{GeminiService, KeyValueStore};
    use crate::stylist::Stylist;
    use actix_web::{App, http::StatusCode, test};
    use std::sync::Arc;

    async fn app_state() -> AppState {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let gemini = Arc::new(GeminiService::new(
            "http://127.0.0.1:9".to_string(),
            ModelConfig::default(),
            None,
        ));
        let stylist = Stylist::restore(gemini.clone(), store.clone(), 256).await;
        AppState {
            stylist: Arc::new(stylist),
            gemini,
            store,
        }
    }

    #[actix_web::test]
    async fn empty_session_endpoints() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/wardrobe").to_request();
        let items: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert!(items.is_empty());

        let req = test::TestRequest::get().uri("/api/v1/outfits").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn generation_with_empty_wardrobe_is_bad_request() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/outfits")
            .set_json(serde_json::json!({ "occasion": "business-casual", "location": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/conversation")
            .set_json(serde_json::json!({ "message": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn credential_is_persisted() {
        let state = app_state().await;
        let store = state.store.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/v1/credential")
            .set_json(serde_json::json!({ "api_key": " key-42 " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            store.get(CREDENTIAL_KEY).await.unwrap().as_deref(),
            Some("key-42")
        );

        let req = test::TestRequest::get().uri("/api/v1/status").to_request();
        let status: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status["credential_set"], true);
        assert_eq!(status["busy"], false);
    }
}
