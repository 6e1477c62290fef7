use std::sync::Arc;

use poem::web::Data;
use poem_openapi::{
    OpenApi,
    param::Query,
    payload::Json,
    types::multipart::Upload,
};

use super::ApiTags;
use crate::{
    AppState,
    core::{
        error::{QrError, QrResult},
        options::{ArtisticOptions, QrOptions, RawArtisticOptions, RawQrOptions},
    },
    schemas::generate::{
        ArtisticForm, BatchRequest, BatchResponse, GenerateRequest, GenerateResponse, LogoForm,
    },
};

pub struct ApiGenerate;

#[OpenApi]
impl ApiGenerate {
    /// Generate (query)
    ///
    /// Generate a QR code from URL query parameters. Returns the image bytes,
    /// or a JSON envelope with the base64 encoded image when `base64=true`.
    #[oai(path = "/generate", method = "get", tag = "ApiTags::Generate")]
    async fn generate_get(
        &self,
        state: Data<&Arc<AppState>>,
        /// The data to encode in the QR code
        data: Query<Option<String>>,
        /// Image format: png, svg or jpeg
        format: Query<Option<String>>,
        /// Optional filename for download
        filename: Query<Option<String>>,
        /// Return as base64 string in JSON
        #[oai(name = "base64")]
        return_base64: Query<Option<String>>,
        box_size: Query<Option<String>>,
        border: Query<Option<String>>,
        fill_color: Query<Option<String>>,
        back_color: Query<Option<String>>,
        /// 1-40 or "auto"
        version: Query<Option<String>>,
        /// L, M, Q or H
        error_correction: Query<Option<String>>,
    ) -> GenerateResponse {
        let raw = RawQrOptions {
            data: data.0,
            box_size: box_size.0,
            border: border.0,
            fill_color: fill_color.0,
            back_color: back_color.0,
            version: version.0,
            error_correction: error_correction.0,
            format: format.0,
            filename: filename.0,
            base64: return_base64.0,
        };

        generate_image(&state, "generate_get", raw).await
    }

    /// Generate
    ///
    /// Generate a QR code from a JSON body.
    ///
    /// # Example Request
    /// ```json
    /// {
    ///   "data": "https://example.com",
    ///   "format": "svg",
    ///   "box_size": 8,
    ///   "error_correction": "M"
    /// }
    /// ```
    #[oai(path = "/generate", method = "post", tag = "ApiTags::Generate")]
    async fn generate_post(
        &self,
        Json(json): Json<GenerateRequest>,
        state: Data<&Arc<AppState>>,
    ) -> GenerateResponse {
        match RawQrOptions::try_from(json) {
            Ok(raw) => generate_image(&state, "generate_post", raw).await,
            Err(e) => GenerateResponse::error("generate_post", &e),
        }
    }

    /// Batch Generate
    ///
    /// Generate several QR codes and return them as one ZIP archive. Items
    /// that fail are skipped and reported in the archive's `manifest.json`;
    /// the request only fails when every item does.
    #[oai(path = "/batch_generate", method = "post", tag = "ApiTags::Generate")]
    async fn batch_generate(
        &self,
        Json(json): Json<BatchRequest>,
        state: Data<&Arc<AppState>>,
    ) -> BatchResponse {
        tracing::info!("Batch generating {} items", json.items.len());

        match state.engine.generate_batch(json.into_items()).await {
            Ok(zip) => {
                tracing::info!("Batch completed, archive size: {} bytes", zip.len());
                BatchResponse::zip(zip)
            }
            Err(e) => BatchResponse::error("batch_generate", &e),
        }
    }

    /// Generate With Logo
    ///
    /// Generate a QR code with a logo centered on it. Error correction is
    /// always H so the covered modules can be recovered.
    #[oai(path = "/generate_with_logo", method = "post", tag = "ApiTags::Generate")]
    async fn generate_with_logo(
        &self,
        form: LogoForm,
        state: Data<&Arc<AppState>>,
    ) -> GenerateResponse {
        let (raw, logo) = form.split();
        let opts = match QrOptions::normalize(raw) {
            Ok(opts) => opts,
            Err(e) => return GenerateResponse::error("generate_with_logo", &e),
        };
        let logo = match read_logo(&state, logo).await {
            Ok(logo) => logo,
            Err(e) => return GenerateResponse::error("generate_with_logo", &e),
        };

        tracing::info!(
            "Generating with logo: format={}, logo={} bytes",
            opts.format.as_str(),
            logo.as_ref().map_or(0, Vec::len)
        );

        let base64 = opts.base64;
        match state.engine.generate_with_logo(opts, logo).await {
            Ok(image) => GenerateResponse::image(image, base64),
            Err(e) => GenerateResponse::error("generate_with_logo", &e),
        }
    }

    /// Generate Artistic
    ///
    /// Generate a styled QR code. Colors, scale and border are applied while
    /// encoding. Only png and svg are supported.
    #[oai(path = "/generate_artistic", method = "post", tag = "ApiTags::Generate")]
    async fn generate_artistic(
        &self,
        form: ArtisticForm,
        state: Data<&Arc<AppState>>,
    ) -> GenerateResponse {
        let opts = match ArtisticOptions::normalize(RawArtisticOptions::from(form)) {
            Ok(opts) => opts,
            Err(e) => return GenerateResponse::error("generate_artistic", &e),
        };

        tracing::info!(
            "Generating artistic: format={}, scale={}, border={}",
            opts.format.as_str(),
            opts.scale,
            opts.border
        );

        match state.engine.generate_artistic(opts).await {
            Ok(image) => GenerateResponse::image(image, false),
            Err(e) => GenerateResponse::error("generate_artistic", &e),
        }
    }
}

async fn generate_image(state: &AppState, function: &str, raw: RawQrOptions) -> GenerateResponse {
    let opts = match QrOptions::normalize(raw) {
        Ok(opts) => opts,
        Err(e) => return GenerateResponse::error(function, &e),
    };

    tracing::info!(
        "Generating: format={}, ec={}, version={:?}, data={} bytes",
        opts.format.as_str(),
        opts.ec_level,
        opts.version,
        opts.data.len()
    );

    let base64 = opts.base64;
    match state.engine.generate(opts).await {
        Ok(image) => {
            tracing::info!("Generate completed, size: {} bytes", image.bytes.len());
            GenerateResponse::image(image, base64)
        }
        Err(e) => GenerateResponse::error(function, &e),
    }
}

/// Browsers send an empty part when no file was picked; that counts as no logo.
async fn read_logo(state: &AppState, logo: Option<Upload>) -> QrResult<Option<Vec<u8>>> {
    let Some(upload) = logo else {
        return Ok(None);
    };
    state.engine.check_upload("logo", upload.size())?;
    let bytes = upload.into_vec().await.map_err(QrError::internal)?;
    Ok((!bytes.is_empty()).then_some(bytes))
}
