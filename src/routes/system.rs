use std::sync::Arc;

use poem::web::Data;
use poem_openapi::{OpenApi, payload::Json};

use super::ApiTags;
use crate::{
    AppState,
    schemas::{
        common::ErrorResponse,
        system::{FilesystemStatus, HealthResponse, HealthStatus, ServiceStatus},
    },
    settings::probe_writable,
};

pub struct ApiSystem;

#[OpenApi]
impl ApiSystem {
    /// Root
    ///
    /// Service banner with pointers to the docs and the health check.
    #[oai(path = "/", method = "get", tag = "ApiTags::System")]
    async fn root(&self, state: Data<&Arc<AppState>>) -> Json<ServiceStatus> {
        Json(ServiceStatus {
            status: "online".to_string(),
            message: "QR Code Generator API is running".to_string(),
            docs_url: "/docs".to_string(),
            health_check: "/health".to_string(),
            data_dir: state.log_dir.display().to_string(),
        })
    }

    /// Health
    ///
    /// Encodes a probe symbol and checks that the log directory is writable.
    #[oai(path = "/health", method = "get", tag = "ApiTags::System")]
    async fn health(&self, state: Data<&Arc<AppState>>) -> HealthResponse {
        if let Err(e) = state.engine.self_test().await {
            return HealthResponse::InternalServerError(Json(ErrorResponse::new(
                "routes.system",
                "health",
                &e,
            )));
        }

        let exists = state.log_dir.is_dir();
        let writable = exists && probe_writable(&state.log_dir).is_ok();
        if !writable {
            tracing::warn!("log dir {} is not writable", state.log_dir.display());
        }

        HealthResponse::Ok(Json(HealthStatus {
            status: if writable { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            encoder: "ok".to_string(),
            filesystem: FilesystemStatus {
                data_dir: state.log_dir.display().to_string(),
                data_dir_exists: exists,
                data_dir_writable: writable,
            },
        }))
    }
}
