use poem_openapi::{ApiResponse, Object, payload::Json};

use super::common::ErrorResponse;

#[derive(Object, Debug, Clone)]
pub struct ServiceStatus {
    pub status: String,
    pub message: String,
    pub docs_url: String,
    pub health_check: String,
    /// Directory the service writes its log file to
    pub data_dir: String,
}

#[derive(Object, Debug, Clone)]
pub struct FilesystemStatus {
    pub data_dir: String,
    pub data_dir_exists: bool,
    pub data_dir_writable: bool,
}

#[derive(Object, Debug, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    /// Result of encoding a probe symbol
    pub encoder: String,
    pub filesystem: FilesystemStatus,
}

#[derive(ApiResponse)]
pub enum HealthResponse {
    #[oai(status = 200)]
    Ok(Json<HealthStatus>),

    #[oai(status = 500)]
    InternalServerError(Json<ErrorResponse>),
}
