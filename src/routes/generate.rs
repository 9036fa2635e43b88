use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::ai;
use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::{generate_article, GenerateRequest};

// ── Generate Article ──────────────────────────────────

#[post("/api/generate", data = "<body>")]
pub async fn generate(
    config: &State<Arc<Config>>,
    body: Json<GenerateRequest>,
) -> (Status, Json<Value>) {
    let config = Arc::clone(config.inner());
    let request = body.into_inner();

    // Sitemap fetch and provider calls are blocking HTTP.
    let result = rocket::tokio::task::spawn_blocking(move || {
        let provider = match ai::provider_from_config(&config.llm) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("LLM provider unavailable, using templates: {}", e);
                None
            }
        };
        generate_article(&config, provider.as_deref(), &request)
    })
    .await;

    match result {
        Ok(Ok(out)) => match serde_json::to_value(&out) {
            Ok(v) => (Status::Ok, Json(v)),
            Err(e) => error(Status::InternalServerError, e.to_string()),
        },
        Ok(Err(e)) => {
            log::warn!("Generation failed: {}", e);
            error(status_for(&e), e.to_string())
        }
        Err(e) => error(
            Status::InternalServerError,
            format!("Generation task failed: {}", e),
        ),
    }
}

fn status_for(e: &PipelineError) -> Status {
    match e {
        PipelineError::MissingSitemap => Status::BadRequest,
        PipelineError::Engine(_) => Status::UnprocessableEntity,
        PipelineError::Sitemap(_) => Status::BadGateway,
    }
}

fn error(status: Status, message: String) -> (Status, Json<Value>) {
    (status, Json(json!({"error": message})))
}
