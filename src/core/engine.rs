use std::sync::Arc;

use crate::core::decoder::{DecodedResult, QrDecoder, RqrrDecoder};
use crate::core::encoder::{QrEncoder, QrcodeEncoder};
use crate::core::error::{QrError, QrResult};
use crate::core::options::{ArtisticOptions, OutputFormat, QrOptions, RawQrOptions};
use crate::core::packager::{self, BatchItem};
use crate::core::postprocess;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub max_upload_bytes: usize,
    pub max_batch_items: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            max_batch_items: 100,
        }
    }
}

/// Final bytes of one generated QR code.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub filename: Option<String>,
}

/// Runs the encode and decode pipelines off the async reactor.
#[derive(Clone)]
pub struct QrEngine {
    encoder: Arc<dyn QrEncoder>,
    decoder: Arc<dyn QrDecoder>,
    limits: EngineLimits,
}

impl QrEngine {
    pub fn new(limits: EngineLimits) -> Self {
        Self::with_capabilities(Arc::new(QrcodeEncoder), Arc::new(RqrrDecoder), limits)
    }

    pub fn with_capabilities(
        encoder: Arc<dyn QrEncoder>,
        decoder: Arc<dyn QrDecoder>,
        limits: EngineLimits,
    ) -> Self {
        Self { encoder, decoder, limits }
    }

    pub fn limits(&self) -> EngineLimits {
        self.limits
    }

    async fn run<T, F>(&self, job: F) -> QrResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&QrEngine) -> QrResult<T> + Send + 'static,
    {
        let engine = self.clone();

        tokio::task::spawn_blocking(move || job(&engine))
            .await
            .map_err(|e| QrError::internal(format!("Task join error: {}", e)))?
    }

    fn generate_sync(&self, opts: &QrOptions) -> QrResult<Vec<u8>> {
        let artifact = self.encoder.encode(&opts.data, &opts.encode_params())?;
        packager::to_bytes(artifact)
    }

    pub async fn generate(&self, opts: QrOptions) -> QrResult<GeneratedImage> {
        self.run(move |engine| {
            let bytes = engine.generate_sync(&opts)?;
            Ok(GeneratedImage { bytes, format: opts.format, filename: opts.filename })
        })
        .await
    }

    /// Forces error correction H; without a logo the result is a plain H-level code.
    pub async fn generate_with_logo(
        &self,
        opts: QrOptions,
        logo: Option<Vec<u8>>,
    ) -> QrResult<GeneratedImage> {
        let opts = opts.with_logo();

        self.run(move |engine| {
            let mut artifact = engine.encoder.encode(&opts.data, &opts.encode_params())?;
            if let Some(logo) = logo.as_deref() {
                artifact = postprocess::overlay_logo(artifact, logo)?;
            }
            let bytes = packager::to_bytes(artifact)?;
            Ok(GeneratedImage { bytes, format: opts.format, filename: opts.filename })
        })
        .await
    }

    pub async fn generate_artistic(&self, opts: ArtisticOptions) -> QrResult<GeneratedImage> {
        self.run(move |engine| {
            let artifact = postprocess::render_artistic(engine.encoder.as_ref(), &opts)?;
            let bytes = packager::to_bytes(artifact)?;
            Ok(GeneratedImage { bytes, format: opts.format, filename: None })
        })
        .await
    }

    /// Items are processed in order; a failing item, including one that could
    /// not be parsed, is reported, not fatal.
    pub async fn generate_batch(&self, items: Vec<QrResult<RawQrOptions>>) -> QrResult<Vec<u8>> {
        if items.is_empty() {
            return Err(QrError::invalid_parameter(
                "items",
                "must be a non-empty list of QR code requests",
            ));
        }
        if items.len() > self.limits.max_batch_items {
            return Err(QrError::invalid_parameter(
                "items",
                format!(
                    "at most {} items per batch, got {}",
                    self.limits.max_batch_items,
                    items.len()
                ),
            ));
        }

        self.run(move |engine| {
            let outcomes = items
                .into_iter()
                .map(|raw| -> QrResult<BatchItem> {
                    let opts = QrOptions::normalize(raw?)?;
                    let bytes = engine.generate_sync(&opts)?;
                    Ok(BatchItem { filename: opts.filename, format: opts.format, bytes })
                })
                .collect();
            packager::build_zip(outcomes)
        })
        .await
    }

    pub async fn decode(&self, image: Vec<u8>) -> QrResult<Vec<DecodedResult>> {
        self.run(move |engine| engine.decoder.decode(&image)).await
    }

    pub fn check_upload(&self, field: &str, len: usize) -> QrResult<()> {
        if len > self.limits.max_upload_bytes {
            return Err(QrError::PayloadTooLarge {
                field: field.to_string(),
                limit: self.limits.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Encodes a tiny symbol; used by the health endpoint.
    pub async fn self_test(&self) -> QrResult<()> {
        let opts = QrOptions::normalize(RawQrOptions {
            data: Some("test".to_string()),
            ..Default::default()
        })?;
        self.generate(opts).await.map(|_| ())
    }
}
