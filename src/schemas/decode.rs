use poem_openapi::{ApiResponse, Multipart, Object, payload::Json, types::multipart::Upload};

use super::common::ErrorResponse;
use crate::core::decoder::DecodedResult;
use crate::core::error::QrError;

#[derive(Multipart)]
pub struct DecodeForm {
    /// Image that may contain QR codes
    pub file: Upload,
}

#[derive(Object, Debug, Clone, PartialEq)]
pub struct DecodedSymbol {
    /// Decoded payload
    pub data: String,

    /// Symbol kind, always "QRCODE"
    #[oai(rename = "type")]
    pub symbol_type: String,
}

impl From<DecodedResult> for DecodedSymbol {
    fn from(result: DecodedResult) -> Self {
        Self {
            data: result.data,
            symbol_type: result.symbol_type,
        }
    }
}

#[derive(Object, Debug, Clone)]
pub struct DecodeResult {
    /// Symbols in the order the decoder found them; empty when none
    pub results: Vec<DecodedSymbol>,
}

#[derive(ApiResponse)]
pub enum DecodeResponse {
    #[oai(status = 200)]
    Ok(Json<DecodeResult>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),

    #[oai(status = 413)]
    PayloadTooLarge(Json<ErrorResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<ErrorResponse>),
}

impl DecodeResponse {
    pub fn error(err: &QrError) -> Self {
        let body = Json(ErrorResponse::new("routes.decode", "decode", err));
        match err.status().as_u16() {
            413 => Self::PayloadTooLarge(body),
            500..=599 => Self::InternalServerError(body),
            _ => Self::BadRequest(body),
        }
    }
}
