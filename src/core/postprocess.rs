use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, imageops, imageops::FilterType};

use crate::core::encoder::{Artifact, EncodeParams, QrEncoder, Rendered};
use crate::core::error::{QrError, QrResult};
use crate::core::options::ArtisticOptions;

/// The logo fits in a square of `1 / LOGO_FACTOR` of the QR side.
pub const LOGO_FACTOR: u32 = 6;

/// Centers `logo` on the QR code. The QR code must have been encoded at level H.
pub fn overlay_logo(artifact: Artifact, logo: &[u8]) -> QrResult<Artifact> {
    let logo = image::load_from_memory(logo).map_err(|e| {
        tracing::debug!("rejecting logo upload: {}", e);
        QrError::InvalidLogoImage
    })?;

    let image = match artifact.image {
        Rendered::Raster(mut qr) => {
            let target = qr.width().min(qr.height()) / LOGO_FACTOR;
            if target > 0 {
                let logo = logo.resize(target, target, FilterType::Lanczos3).to_rgba8();
                let x = (qr.width() - logo.width()) / 2;
                let y = (qr.height() - logo.height()) / 2;
                imageops::overlay(&mut qr, &logo, x as i64, y as i64);
            }
            Rendered::Raster(qr)
        }
        Rendered::Vector(mut svg) => {
            let target = svg.pixels / LOGO_FACTOR;
            if target > 0 {
                let logo = logo.resize(target, target, FilterType::Lanczos3);
                let mut png = Vec::new();
                logo.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                    .map_err(QrError::internal)?;

                // view box units are modules, one module is `scale` pixels
                let scale = svg.pixels as f32 / svg.dimension as f32;
                let (w, h) = (logo.width() as f32 / scale, logo.height() as f32 / scale);
                let x = (svg.dimension as f32 - w) / 2.0;
                let y = (svg.dimension as f32 - h) / 2.0;
                let href = format!(
                    "data:image/png;base64,{}",
                    general_purpose::STANDARD.encode(&png)
                );
                svg.elements.push(format!(
                    "<image x=\"{:.3}\" y=\"{:.3}\" width=\"{:.3}\" height=\"{:.3}\" href=\"{href}\" xlink:href=\"{href}\"/>",
                    x, y, w, h
                ));
            }
            Rendered::Vector(svg)
        }
    };

    Ok(Artifact { image, format: artifact.format })
}

/// Styling happens at encode time: colors, scale and border go straight to the encoder.
pub fn render_artistic(encoder: &dyn QrEncoder, opts: &ArtisticOptions) -> QrResult<Artifact> {
    let params = EncodeParams {
        version: None,
        ec_level: opts.ec_level,
        box_size: opts.scale,
        border: opts.border,
        dark: opts.dark,
        light: opts.light,
        format: opts.format,
    };
    encoder.encode(&opts.data, &params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::QrcodeEncoder;
    use crate::core::options::{EcLevel, OutputFormat};
    use image::{DynamicImage, Rgba};

    fn encode(format: OutputFormat) -> Artifact {
        let params = EncodeParams {
            version: None,
            ec_level: EcLevel::H,
            box_size: 10,
            border: 4,
            dark: Rgba([0, 0, 0, 255]),
            light: Rgba([255, 255, 255, 255]),
            format,
        };
        QrcodeEncoder.encode("logo test", &params).unwrap()
    }

    fn solid_logo(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    // resampling may shift a channel by one
    fn is_red(p: &Rgba<u8>) -> bool {
        p[0] > 200 && p[1] < 50 && p[2] < 50
    }

    fn is_blue(p: &Rgba<u8>) -> bool {
        p[0] < 50 && p[1] < 50 && p[2] > 200
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn raster_logo_is_centered() {
        let qr = encode(OutputFormat::Png);
        let logo = png_bytes(&solid_logo(64, 64, [255, 0, 0, 255]));
        let Rendered::Raster(img) = overlay_logo(qr, &logo).unwrap().image else {
            panic!("expected raster output");
        };
        let (w, h) = img.dimensions();
        assert!(is_red(img.get_pixel(w / 2, h / 2)));
        assert!(!is_red(img.get_pixel(0, 0)));
    }

    #[test]
    fn logo_aspect_ratio_is_kept() {
        let qr = encode(OutputFormat::Png);
        let logo = png_bytes(&solid_logo(100, 20, [0, 0, 255, 255]));
        let Rendered::Raster(img) = overlay_logo(qr, &logo).unwrap().image else {
            panic!("expected raster output");
        };
        let (w, h) = img.dimensions();
        let target = w / LOGO_FACTOR;
        // wide logo: full target width, one fifth of it tall
        assert!(is_blue(img.get_pixel(w / 2 - target / 2 + 1, h / 2)));
        assert!(!is_blue(img.get_pixel(w / 2, h / 2 - target / 2 + 1)));
    }

    #[test]
    fn svg_logo_is_embedded() {
        let qr = encode(OutputFormat::Svg);
        let logo = png_bytes(&solid_logo(32, 32, [0, 255, 0, 255]));
        let Rendered::Vector(svg) = overlay_logo(qr, &logo).unwrap().image else {
            panic!("expected vector output");
        };
        assert!(svg.to_document().contains("data:image/png;base64,"));
    }

    #[test]
    fn unreadable_logo() {
        let qr = encode(OutputFormat::Png);
        let err = overlay_logo(qr, b"definitely not an image").unwrap_err();
        assert_eq!(err, QrError::InvalidLogoImage);
    }

    #[test]
    fn artistic_uses_encode_time_colors() {
        let opts = ArtisticOptions {
            data: "art".into(),
            dark: Rgba([200, 0, 100, 255]),
            light: Rgba([240, 240, 200, 255]),
            border: 2,
            scale: 3,
            ec_level: EcLevel::Q,
            format: OutputFormat::Png,
        };
        let Rendered::Raster(img) = render_artistic(&QrcodeEncoder, &opts).unwrap().image else {
            panic!("expected raster output");
        };
        assert_eq!(*img.get_pixel(0, 0), Rgba([240, 240, 200, 255]));
        assert_eq!(*img.get_pixel(6, 6), Rgba([200, 0, 100, 255]));
    }
}
