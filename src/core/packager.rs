use std::collections::HashSet;
use std::io::{Cursor, Write};

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, Rgb, RgbImage};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::encoder::{Artifact, Rendered};
use crate::core::error::{BatchItemError, QrError, QrResult};
use crate::core::options::OutputFormat;
use crate::schemas::generate::Base64Response;

pub const MANIFEST_NAME: &str = "manifest.json";
pub const BATCH_ARCHIVE_NAME: &str = "qr_codes.zip";

/// Serializes an artifact into the bytes of its wire format.
pub fn to_bytes(artifact: Artifact) -> QrResult<Vec<u8>> {
    let img = match artifact.image {
        Rendered::Vector(svg) => return Ok(svg.to_document().into_bytes()),
        Rendered::Raster(img) => img,
    };

    let mut buf = Vec::new();
    if artifact.format == OutputFormat::Jpeg {
        // jpeg has no alpha channel; flatten onto white
        let flat = RgbImage::from_fn(img.width(), img.height(), |x, y| {
            let p = img.get_pixel(x, y);
            let a = p[3] as u32;
            let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
            Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
        });
        flat.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .map_err(QrError::internal)?;
    } else {
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(QrError::internal)?;
    }
    Ok(buf)
}

/// Appends the format's extension unless the name already carries it.
pub fn download_name(filename: &str, format: OutputFormat) -> String {
    let ext = format.extension();
    if filename.to_ascii_lowercase().ends_with(ext) {
        filename.to_string()
    } else {
        format!("{}{}", filename, ext)
    }
}

pub fn to_base64(bytes: &[u8], format: OutputFormat, filename: Option<&str>) -> Base64Response {
    Base64Response {
        base64: general_purpose::STANDARD.encode(bytes),
        format: format.as_str().to_string(),
        content_type: format.content_type().to_string(),
        filename: filename.map(|name| download_name(name, format)),
    }
}

/// One successfully encoded batch item, ready to be archived.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub filename: Option<String>,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct Manifest {
    succeeded: usize,
    failed: usize,
    items: Vec<ManifestEntry>,
}

#[derive(Serialize)]
struct ManifestEntry {
    index: usize,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Builds the batch archive: successful items in input order plus a manifest.
///
/// Failed items are skipped and reported in the manifest. When nothing
/// succeeded the whole batch fails with every item's error.
pub fn build_zip(outcomes: Vec<QrResult<BatchItem>>) -> QrResult<Vec<u8>> {
    let mut used: HashSet<String> = HashSet::from([MANIFEST_NAME.to_string()]);
    let mut entries = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    let mut files = Vec::new();

    for (i, outcome) in outcomes.into_iter().enumerate() {
        let index = i + 1;
        match outcome {
            Ok(item) => {
                let name = unique_name(&mut used, &item, index);
                entries.push(ManifestEntry {
                    index,
                    status: "ok",
                    filename: Some(name.clone()),
                    detail: None,
                });
                files.push((name, item.bytes));
            }
            Err(e) => {
                if let QrError::Internal(detail) = &e {
                    tracing::error!("batch item {} failed: {}", index, detail);
                }
                let detail = e.client_message();
                entries.push(ManifestEntry {
                    index,
                    status: "error",
                    filename: None,
                    detail: Some(detail.clone()),
                });
                failures.push(BatchItemError { index, detail });
            }
        }
    }

    if files.is_empty() {
        return Err(QrError::BatchFailed(failures));
    }

    let manifest = Manifest {
        succeeded: files.len(),
        failed: failures.len(),
        items: entries,
    };
    let manifest = serde_json::to_vec_pretty(&manifest).map_err(QrError::internal)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let archived = files.iter().map(|(n, b)| (n.as_str(), b));
    for (name, bytes) in archived.chain([(MANIFEST_NAME, &manifest)]) {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name, options).map_err(QrError::internal)?;
        zip.write_all(bytes).map_err(QrError::internal)?;
    }
    let cursor = zip.finish().map_err(QrError::internal)?;

    Ok(cursor.into_inner())
}

fn unique_name(used: &mut HashSet<String>, item: &BatchItem, index: usize) -> String {
    let ext = item.format.extension();
    let base = match &item.filename {
        Some(name) => download_name(name, item.format),
        None => format!("qr_{}{}", index, ext),
    };
    let stem = base[..base.len() - ext.len()].to_string();

    let mut candidate = base;
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}_{}{}", stem, n, ext);
        n += 1;
    }
    candidate
}
