use image::{ImageBuffer, Rgba, RgbaImage, imageops};
use qrcode::render::svg;
use qrcode::types::QrError as EncodeError;
use qrcode::{QrCode, Version};

use crate::core::color::to_hex;
use crate::core::error::{QrError, QrResult};
use crate::core::options::{EcLevel, OutputFormat};

/// Largest rendered side in pixels.
pub const MAX_IMAGE_SIDE: u64 = 8192;

/// Everything the encoding capability needs, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub version: Option<u8>,
    pub ec_level: EcLevel,
    pub box_size: u32,
    pub border: u32,
    pub dark: Rgba<u8>,
    pub light: Rgba<u8>,
    pub format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct SvgImage {
    /// Side of the view box, in modules (border included).
    pub dimension: u32,
    /// Rendered side in pixels.
    pub pixels: u32,
    pub elements: Vec<String>,
}

impl SvgImage {
    pub fn to_document(&self) -> String {
        let mut doc = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
             version=\"1.1\" width=\"{px}\" height=\"{px}\" viewBox=\"0 0 {dim} {dim}\" \
             shape-rendering=\"crispEdges\">\n",
            px = self.pixels,
            dim = self.dimension
        );
        for element in &self.elements {
            doc.push('\t');
            doc.push_str(element);
            doc.push('\n');
        }
        doc.push_str("</svg>\n");
        doc
    }
}

#[derive(Debug, Clone)]
pub enum Rendered {
    Raster(RgbaImage),
    Vector(SvgImage),
}

/// A rendered QR code owned by the request that produced it.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub image: Rendered,
    pub format: OutputFormat,
}

pub trait QrEncoder: Send + Sync {
    fn encode(&self, data: &str, params: &EncodeParams) -> QrResult<Artifact>;
}

/// Encoder backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrcodeEncoder;

impl QrcodeEncoder {
    fn symbol(data: &str, params: &EncodeParams) -> QrResult<QrCode> {
        let ec_level = match params.ec_level {
            EcLevel::L => qrcode::EcLevel::L,
            EcLevel::M => qrcode::EcLevel::M,
            EcLevel::Q => qrcode::EcLevel::Q,
            EcLevel::H => qrcode::EcLevel::H,
        };
        let result = match params.version {
            Some(v) => QrCode::with_version(data, Version::Normal(v as i16), ec_level),
            None => QrCode::with_error_correction_level(data, ec_level),
        };

        result.map_err(|e| match e {
            EncodeError::DataTooLong => QrError::CapacityExceeded {
                version: params.version,
                ec_level: params.ec_level,
            },
            EncodeError::InvalidVersion => {
                QrError::invalid_parameter("version", "not supported by the encoder")
            }
            other => QrError::internal(format!("qr encoding failed: {}", other)),
        })
    }
}

impl QrEncoder for QrcodeEncoder {
    fn encode(&self, data: &str, params: &EncodeParams) -> QrResult<Artifact> {
        let code = Self::symbol(data, params)?;
        let width = code.width() as u32;
        let dimension = width + 2 * params.border;

        let side = dimension as u64 * params.box_size as u64;
        if side > MAX_IMAGE_SIDE {
            return Err(QrError::invalid_parameter(
                "box_size",
                format!(
                    "rendered image would be {}px wide, the limit is {}px",
                    side, MAX_IMAGE_SIDE
                ),
            ));
        }

        tracing::debug!(
            "encoded {} bytes into {}x{} modules (ec={})",
            data.len(),
            width,
            width,
            params.ec_level
        );

        let image = match params.format {
            OutputFormat::Svg => Rendered::Vector(render_svg(&code, dimension, params)?),
            OutputFormat::Png | OutputFormat::Jpeg => {
                Rendered::Raster(render_raster(&code, side as u32, params))
            }
        };

        Ok(Artifact { image, format: params.format })
    }
}

fn render_raster(code: &QrCode, side: u32, params: &EncodeParams) -> RgbaImage {
    let symbol = code
        .render::<Rgba<u8>>()
        .quiet_zone(false)
        .module_dimensions(params.box_size, params.box_size)
        .dark_color(params.dark)
        .light_color(params.light)
        .build();

    let offset = (params.border * params.box_size) as i64;
    let mut img: RgbaImage = ImageBuffer::from_pixel(side, side, params.light);
    imageops::replace(&mut img, &symbol, offset, offset);
    img
}

/// The renderer draws the symbol without a quiet zone in module units; the
/// border is added here by shifting it inside a larger view box.
fn render_svg(code: &QrCode, dimension: u32, params: &EncodeParams) -> QrResult<SvgImage> {
    let dark = svg_color(params.dark);
    let light = svg_color(params.light);
    let document = code
        .render::<svg::Color>()
        .quiet_zone(false)
        .module_dimensions(1, 1)
        .dark_color(svg::Color(&dark))
        .light_color(svg::Color(&light))
        .build();
    let body = svg_body(&document)
        .ok_or_else(|| QrError::internal("svg renderer produced no <svg> root"))?;

    let mut elements = Vec::with_capacity(2);
    if params.light[3] > 0 {
        elements.push(format!("<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>", light));
    }
    elements.push(format!(
        "<g transform=\"translate({b},{b})\">{}</g>",
        body,
        b = params.border
    ));

    Ok(SvgImage {
        dimension,
        pixels: dimension * params.box_size,
        elements,
    })
}

/// Children of the root element, without the XML declaration and `<svg>` tags.
fn svg_body(document: &str) -> Option<&str> {
    let root = document.find("<svg")?;
    let open_end = root + document[root..].find('>')? + 1;
    let close = document.rfind("</svg>")?;
    (open_end <= close).then(|| &document[open_end..close])
}

fn svg_color(color: Rgba<u8>) -> String {
    match color[3] {
        0 => "none".to_string(),
        255 => to_hex(color),
        a => format!("rgba({},{},{},{:.3})", color[0], color[1], color[2], a as f32 / 255.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn params(format: OutputFormat) -> EncodeParams {
        EncodeParams {
            version: None,
            ec_level: EcLevel::L,
            box_size: 10,
            border: 4,
            dark: Rgba([0, 0, 0, 255]),
            light: Rgba([255, 255, 255, 255]),
            format,
        }
    }

    #[test]
    fn raster_size_follows_box_size_and_border() {
        let artifact = QrcodeEncoder.encode("HelloWorld", &params(OutputFormat::Png)).unwrap();
        let Rendered::Raster(img) = artifact.image else {
            panic!("expected raster output");
        };
        // version 1 is 21 modules wide, plus 4 modules of border on each side
        assert_eq!(img.dimensions(), (290, 290));
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        // top-left finder pattern starts right after the border
        assert_eq!(*img.get_pixel(40, 40), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn custom_colors_are_painted() {
        let mut p = params(OutputFormat::Png);
        p.dark = Rgba([0, 0, 128, 255]);
        p.light = Rgba([255, 255, 0, 255]);
        p.border = 0;
        p.box_size = 1;
        let Rendered::Raster(img) = QrcodeEncoder.encode("x", &p).unwrap().image else {
            panic!("expected raster output");
        };
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 128, 255]));
        assert_eq!(*img.get_pixel(7, 0), Rgba([255, 255, 0, 255]));
    }

    #[test]
    fn svg_output() {
        let artifact = QrcodeEncoder
            .encode("https://example.com", &params(OutputFormat::Svg))
            .unwrap();
        let Rendered::Vector(svg) = artifact.image else {
            panic!("expected vector output");
        };
        let doc = svg.to_document();
        assert!(doc.starts_with("<svg"));
        assert!(doc.contains("fill=\"#000000\""));
        assert!(doc.trim_end().ends_with("</svg>"));
        assert_eq!(svg.pixels, svg.dimension * 10);
    }

    #[test]
    fn transparent_background_has_no_rect() {
        let mut p = params(OutputFormat::Svg);
        p.light = Rgba([0, 0, 0, 0]);
        let Rendered::Vector(svg) = QrcodeEncoder.encode("x", &p).unwrap().image else {
            panic!("expected vector output");
        };
        let doc = svg.to_document();
        assert!(!doc.contains("<rect width=\"100%\""));
        assert!(!doc.contains("#ffffff"));
    }

    #[test]
    fn svg_border_shifts_the_symbol() {
        let mut p = params(OutputFormat::Svg);
        p.border = 2;
        let Rendered::Vector(svg) = QrcodeEncoder.encode("x", &p).unwrap().image else {
            panic!("expected vector output");
        };
        // version 1 is 21 modules wide
        assert_eq!(svg.dimension, 25);
        let doc = svg.to_document();
        assert!(doc.contains("viewBox=\"0 0 25 25\""));
        assert!(doc.contains("translate(2,2)"));
        assert!(!doc.contains("<?xml"));
    }

    #[test]
    fn svg_body_strips_the_root() {
        let doc = "<?xml version=\"1.0\"?><svg a=\"b\"><rect/><path d=\"M0 0\"/></svg>";
        assert_eq!(svg_body(doc), Some("<rect/><path d=\"M0 0\"/>"));
        assert_eq!(svg_body("<rect/>"), None);
    }

    #[test_case(Rgba([255, 0, 0, 255]), "#ff0000"; "opaque")]
    #[test_case(Rgba([0, 0, 0, 0]), "none"; "transparent")]
    #[test_case(Rgba([0, 0, 255, 51]), "rgba(0,0,255,0.200)"; "translucent")]
    fn svg_colors(color: Rgba<u8>, expected: &str) {
        assert_eq!(svg_color(color), expected);
    }

    #[test]
    fn data_too_long_for_version() {
        let mut p = params(OutputFormat::Png);
        p.version = Some(1);
        p.ec_level = EcLevel::H;
        let err = QrcodeEncoder.encode(&"A".repeat(200), &p).unwrap_err();
        assert_eq!(
            err,
            QrError::CapacityExceeded { version: Some(1), ec_level: EcLevel::H }
        );
    }

    #[test]
    fn data_too_long_for_any_version() {
        let p = params(OutputFormat::Png);
        let err = QrcodeEncoder.encode(&"x".repeat(4000), &p).unwrap_err();
        assert!(matches!(err, QrError::CapacityExceeded { version: None, .. }));
    }

    #[test]
    fn oversized_render_is_rejected() {
        let mut p = params(OutputFormat::Png);
        p.version = Some(40);
        p.box_size = 100;
        let err = QrcodeEncoder.encode("x", &p).unwrap_err();
        assert!(matches!(err, QrError::InvalidParameter { ref field, .. } if field == "box_size"));
    }
}
