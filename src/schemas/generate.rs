use poem_openapi::{
    ApiResponse, Multipart, Object,
    payload::{Attachment, AttachmentType, Json},
    types::{ParseFromJSON, multipart::Upload},
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::common::ErrorResponse;
use crate::core::engine::GeneratedImage;
use crate::core::error::{QrError, QrResult};
use crate::core::options::{OutputFormat, RawArtisticOptions, RawQrOptions};
use crate::core::packager;

#[derive(Object, Clone, Debug, Default)]
#[oai(deny_unknown_fields)]
pub struct GenerateRequest {
    /// The data to encode in the QR code, as a string
    pub data: Option<JsonValue>,

    /// Pixels per module (default 10)
    pub box_size: Option<i64>,

    /// Quiet zone width in modules (default 4)
    pub border: Option<i64>,

    /// Module color, e.g. "black" or "#1e293b"
    pub fill_color: Option<String>,

    /// Background color, e.g. "white" or "transparent"
    pub back_color: Option<String>,

    /// QR version 1-40, or "auto" for the smallest that fits
    pub version: Option<JsonValue>,

    /// Error correction level: L, M, Q or H
    pub error_correction: Option<String>,

    /// Image format: png, svg or jpeg
    pub format: Option<String>,

    /// Optional filename for download
    pub filename: Option<String>,

    /// Return as base64 string in JSON
    pub base64: Option<bool>,
}

/// Numbers or booleans in `data` are rejected rather than stringified.
impl TryFrom<GenerateRequest> for RawQrOptions {
    type Error = QrError;

    fn try_from(req: GenerateRequest) -> QrResult<Self> {
        let data = match req.data {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s),
            Some(other) => {
                return Err(QrError::invalid_parameter(
                    "data",
                    format!("must be a string, got {}", json_kind(&other)),
                ));
            }
        };

        Ok(Self {
            data,
            box_size: req.box_size.map(|v| v.to_string()),
            border: req.border.map(|v| v.to_string()),
            fill_color: req.fill_color,
            back_color: req.back_color,
            version: req.version.map(|v| match v {
                JsonValue::String(s) => s,
                other => other.to_string(),
            }),
            error_correction: req.error_correction,
            format: req.format,
            filename: req.filename,
            base64: req.base64.map(|v| v.to_string()),
        })
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[derive(Object, Clone, Debug)]
#[oai(deny_unknown_fields)]
pub struct BatchRequest {
    /// QR code requests with the same fields as `POST /generate`, archived
    /// in this order. Each item is validated on its own.
    pub items: Vec<JsonValue>,
}

impl BatchRequest {
    /// Parses every item separately so one malformed item only fails itself.
    pub fn into_items(self) -> Vec<QrResult<RawQrOptions>> {
        self.items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let req = GenerateRequest::parse_from_json(Some(item)).map_err(|e| {
                    QrError::invalid_parameter(format!("item {}", i + 1), e.into_message())
                })?;
                RawQrOptions::try_from(req)
            })
            .collect()
    }
}

#[derive(Multipart)]
pub struct LogoForm {
    pub data: Option<String>,
    pub box_size: Option<String>,
    pub border: Option<String>,
    pub fill_color: Option<String>,
    pub back_color: Option<String>,
    pub version: Option<String>,
    /// Accepted for symmetry with /generate; always overridden to H
    pub error_correction: Option<String>,
    pub format: Option<String>,
    pub filename: Option<String>,
    pub base64: Option<String>,
    /// Logo image (png, jpeg, gif, webp, ...)
    pub logo: Option<Upload>,
}

impl LogoForm {
    pub fn split(self) -> (RawQrOptions, Option<Upload>) {
        let raw = RawQrOptions {
            data: self.data,
            box_size: self.box_size,
            border: self.border,
            fill_color: self.fill_color,
            back_color: self.back_color,
            version: self.version,
            error_correction: self.error_correction,
            format: self.format,
            filename: self.filename,
            base64: self.base64,
        };
        (raw, self.logo)
    }
}

#[derive(Multipart)]
pub struct ArtisticForm {
    pub data: Option<String>,
    /// Module color (default "#000")
    pub dark: Option<String>,
    /// Background color (default "#fff")
    pub light: Option<String>,
    pub border: Option<String>,
    /// Pixels per module (default 10)
    pub scale: Option<String>,
    pub error_correction: Option<String>,
    /// png or svg
    pub format: Option<String>,
}

impl From<ArtisticForm> for RawArtisticOptions {
    fn from(form: ArtisticForm) -> Self {
        Self {
            data: form.data,
            dark: form.dark,
            light: form.light,
            border: form.border,
            scale: form.scale,
            error_correction: form.error_correction,
            format: form.format,
        }
    }
}

#[derive(Object, Serialize, Debug, Clone)]
pub struct Base64Response {
    /// Base64 encoded image bytes
    pub base64: String,

    /// png, svg or jpeg
    pub format: String,

    /// MIME type of the encoded image
    pub content_type: String,

    /// Download name, extension included
    pub filename: Option<String>,
}

#[derive(ApiResponse)]
pub enum GenerateResponse {
    #[oai(status = 200, content_type = "image/png")]
    Png(Attachment<Vec<u8>>),

    #[oai(status = 200, content_type = "image/svg+xml")]
    Svg(Attachment<Vec<u8>>),

    #[oai(status = 200, content_type = "image/jpeg")]
    Jpeg(Attachment<Vec<u8>>),

    #[oai(status = 200, content_type = "application/json")]
    Base64(Json<Base64Response>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),

    #[oai(status = 413)]
    PayloadTooLarge(Json<ErrorResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<ErrorResponse>),
}

impl GenerateResponse {
    /// Raw bytes, or a base64 JSON envelope when asked for.
    pub fn image(image: GeneratedImage, base64: bool) -> Self {
        if base64 {
            return Self::Base64(Json(packager::to_base64(
                &image.bytes,
                image.format,
                image.filename.as_deref(),
            )));
        }

        // without a filename the browser may display the image in place
        let attachment = match image.filename.as_deref() {
            Some(name) => Attachment::new(image.bytes)
                .attachment_type(AttachmentType::Attachment)
                .filename(packager::download_name(name, image.format)),
            None => Attachment::new(image.bytes).attachment_type(AttachmentType::Inline),
        };
        match image.format {
            OutputFormat::Png => Self::Png(attachment),
            OutputFormat::Svg => Self::Svg(attachment),
            OutputFormat::Jpeg => Self::Jpeg(attachment),
        }
    }

    pub fn error(function: &str, err: &QrError) -> Self {
        let body = Json(ErrorResponse::new("routes.generate", function, err));
        match err.status().as_u16() {
            413 => Self::PayloadTooLarge(body),
            500..=599 => Self::InternalServerError(body),
            _ => Self::BadRequest(body),
        }
    }
}

#[derive(ApiResponse)]
pub enum BatchResponse {
    #[oai(status = 200, content_type = "application/zip")]
    Zip(Attachment<Vec<u8>>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<ErrorResponse>),
}

impl BatchResponse {
    pub fn zip(bytes: Vec<u8>) -> Self {
        Self::Zip(Attachment::new(bytes).filename(packager::BATCH_ARCHIVE_NAME))
    }

    pub fn error(function: &str, err: &QrError) -> Self {
        let body = Json(ErrorResponse::new("routes.generate", function, err));
        match err.status().as_u16() {
            500..=599 => Self::InternalServerError(body),
            _ => Self::BadRequest(body),
        }
    }
}
