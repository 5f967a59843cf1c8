use super::{
    dto::{parse_body, BatchBody, BatchResponse, CleanupBody, IllustrationBody, PageIllustration},
    error::ApiError,
    AppState,
};
use crate::{batch::BatchOrchestrator, models::ArtStyle, storage::filename};
use actix_web::{get, http::header, post, web, HttpResponse};
use serde_json::{json, Value};
use std::collections::HashMap;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(create_illustration)
            .service(create_advanced_illustration)
            .service(create_batch_illustrations)
            .service(serve_image)
            .service(cleanup_images),
    )
    .service(health);
}

#[post("/illustrations")]
pub async fn create_illustration(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let pipeline = state.pipeline()?;
    let body: IllustrationBody = parse_body(body.into_inner())?;
    let request = body.to_request(pipeline.config(), false)?;

    let outcome = pipeline.run(&request, &filename::illustration()).await;
    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/illustrations/advanced")]
pub async fn create_advanced_illustration(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let pipeline = state.pipeline()?;
    let body: IllustrationBody = parse_body(body.into_inner())?;
    let request = body.to_request(pipeline.config(), true)?;

    log::info!(
        "🖌️  Advanced illustration: style={}, edit={}, fusion={}",
        request.style,
        request.edit_mode,
        request.fusion_mode
    );
    let outcome = pipeline
        .run(&request, &filename::advanced(request.style))
        .await;
    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/illustrations/batch")]
pub async fn create_batch_illustrations(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let pipeline = state.pipeline()?;
    let body: BatchBody = parse_body(body.into_inner())?;
    let config = pipeline.config();
    body.validate(config)?;
    let pages = body.to_pages(config)?;
    let batch_size = config.clamp_batch_size(body.batch_size);

    let report = BatchOrchestrator::new(pipeline.clone())
        .run(&body.book_id, pages, batch_size)
        .await;

    let page_meta: HashMap<usize, _> = body
        .pages
        .iter()
        .map(|page| (page.page_index, page))
        .collect();
    let style = ArtStyle::resolve(body.style.as_deref(), config.default_style);

    let results = report
        .results
        .iter()
        .filter_map(|result| {
            let page = page_meta.get(&result.page_index)?;
            Some(PageIllustration {
                page_index: result.page_index,
                image_url: result.image_url.clone()?,
                text: page.text.clone(),
                prompt: page.prompt.clone(),
                style,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(BatchResponse {
        book_id: body.book_id.clone(),
        results,
        failed_results: report.failed_results,
        summary: report.summary,
    }))
}

#[get("/images/{tail:.*}")]
pub async fn serve_image(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let tail = path.into_inner();
    let segments: Vec<&str> = tail.split('/').collect();
    let (bytes, content_type) = state.local().read(&segments).await?;

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(bytes))
}

#[post("/admin/cleanup-images")]
pub async fn cleanup_images(
    state: web::Data<AppState>,
    body: Option<web::Json<CleanupBody>>,
) -> Result<HttpResponse, ApiError> {
    let keep = body
        .and_then(|b| b.into_inner().keep)
        .unwrap_or(state.retention_limit());
    let report = state.local().sweep(keep).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "deleted": report.deleted,
        "kept": report.kept,
        "failed": report.failed,
        "retentionLimit": keep,
    })))
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "generation": state.pipeline().is_ok(),
    }))
}
