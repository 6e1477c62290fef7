use crate::core::error::{QrError, QrResult};

pub const SYMBOL_TYPE_QR: &str = "QRCODE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResult {
    pub data: String,
    pub symbol_type: String,
}

pub trait QrDecoder: Send + Sync {
    /// Finds and decodes every QR symbol in an encoded image (png, jpeg, ...).
    ///
    /// An image without symbols yields an empty list, not an error.
    fn decode(&self, image: &[u8]) -> QrResult<Vec<DecodedResult>>;
}

/// Decoder backed by the `rqrr` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, image: &[u8]) -> QrResult<Vec<DecodedResult>> {
        let img = image::load_from_memory(image)
            .map_err(|e| {
                tracing::debug!("rejecting decode upload: {}", e);
                QrError::InvalidImage
            })?
            .to_luma8();

        let (width, height) = img.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| img.get_pixel(x as u32, y as u32)[0],
        );

        let grids = prepared.detect_grids();
        tracing::debug!("found {} candidate grids in {}x{} image", grids.len(), width, height);

        let results = grids
            .iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_meta, content)) => Some(DecodedResult {
                    data: content,
                    symbol_type: SYMBOL_TYPE_QR.to_string(),
                }),
                Err(e) => {
                    tracing::debug!("skipping undecodable grid: {:?}", e);
                    None
                }
            })
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::{EncodeParams, QrEncoder, QrcodeEncoder};
    use crate::core::options::{EcLevel, OutputFormat};
    use crate::core::packager::to_bytes;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_of(data: &str) -> Vec<u8> {
        let params = EncodeParams {
            version: None,
            ec_level: EcLevel::M,
            box_size: 8,
            border: 4,
            dark: Rgba([0, 0, 0, 255]),
            light: Rgba([255, 255, 255, 255]),
            format: OutputFormat::Png,
        };
        to_bytes(QrcodeEncoder.encode(data, &params).unwrap()).unwrap()
    }

    #[test]
    fn decodes_generated_code() {
        let results = RqrrDecoder.decode(&png_of("HelloWorld")).unwrap();
        assert_eq!(
            results,
            vec![DecodedResult { data: "HelloWorld".into(), symbol_type: "QRCODE".into() }]
        );
    }

    #[test]
    fn blank_image_has_no_results() {
        let blank = image::RgbImage::from_pixel(200, 200, image::Rgb([255, 255, 255]));
        let mut buf = Vec::new();
        blank.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        assert!(RqrrDecoder.decode(&buf).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_invalid_image() {
        assert_eq!(RqrrDecoder.decode(b"%PDF-1.4 not an image"), Err(QrError::InvalidImage));
    }
}
