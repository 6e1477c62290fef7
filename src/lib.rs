use std::path::PathBuf;
use std::sync::Arc;

use poem::{
    EndpointExt, Error, Response, Route,
    endpoint::BoxEndpoint,
    middleware::{AddData, Cors},
};
use poem_openapi::OpenApiService;

use crate::core::engine::QrEngine;
use crate::routes::{decode::ApiDecode, generate::ApiGenerate, system::ApiSystem};
use settings::Config;

pub mod core;
pub mod routes;
pub mod schemas;
pub mod settings;

pub struct AppState {
    pub engine: Arc<QrEngine>,
    pub log_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, log_dir: PathBuf) -> Self {
        Self {
            engine: Arc::new(QrEngine::new(config.limits())),
            log_dir,
        }
    }
}

pub fn init_openapi_route(app_state: Arc<AppState>, config: &Config) -> BoxEndpoint<'static> {
    let prefix = config.prefix();
    let openapi_route = OpenApiService::new(
        (ApiGenerate, ApiDecode, ApiSystem),
        "QR Code Generator API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(prefix.clone());

    let openapi_json_endpoint = openapi_route.spec_endpoint();
    let ui = openapi_route.swagger_ui();
    Route::new()
        .nest(prefix, openapi_route)
        .nest("/docs", ui)
        .at("/openapi.json", openapi_json_endpoint)
        .with(AddData::new(app_state))
        .catch_all_error(error_to_json)
        .with(Cors::new())
        .boxed()
}

/// Framework-level failures (bad JSON, missing multipart parts, unknown routes)
/// get the same `{"detail": ...}` body as handler errors.
async fn error_to_json(err: Error) -> Response {
    let status = err.status();
    let detail = if status.is_server_error() {
        tracing::error!("error: unhandled {}", err);
        "Internal server error.".to_string()
    } else {
        err.to_string()
    };

    Response::builder()
        .status(status)
        .content_type("application/json")
        .body(serde_json::json!({ "detail": detail }).to_string())
}
