use std::fmt::{Display, Formatter};

use image::Rgba;

use crate::core::color::parse_color;
use crate::core::encoder::EncodeParams;
use crate::core::error::{QrError, QrResult};

pub const DEFAULT_BOX_SIZE: u32 = 10;
pub const MAX_BOX_SIZE: u32 = 100;
pub const DEFAULT_BORDER: u32 = 4;
pub const MAX_BORDER: u32 = 100;
pub const MIN_VERSION: u32 = 1;
pub const MAX_VERSION: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcLevel {
    #[default]
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    pub fn parse(value: &str) -> QrResult<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            _ => Err(QrError::InvalidErrorCorrection(value.to_string())),
        }
    }
}

impl Display for EcLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
    Jpeg,
}

impl OutputFormat {
    pub const ALL: &'static [OutputFormat] = &[Self::Png, Self::Svg, Self::Jpeg];
    pub const ARTISTIC: &'static [OutputFormat] = &[Self::Png, Self::Svg];

    pub fn parse(value: &str, supported: &'static [OutputFormat]) -> QrResult<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        supported
            .iter()
            .copied()
            .find(|f| f.as_str() == lowered)
            .ok_or(QrError::UnsupportedFormat { format: lowered, supported })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Svg => ".svg",
            Self::Jpeg => ".jpg",
        }
    }
}

/// Loosely typed options as they arrive from a query string, JSON body or form.
#[derive(Debug, Clone, Default)]
pub struct RawQrOptions {
    pub data: Option<String>,
    pub box_size: Option<String>,
    pub border: Option<String>,
    pub fill_color: Option<String>,
    pub back_color: Option<String>,
    pub version: Option<String>,
    pub error_correction: Option<String>,
    pub format: Option<String>,
    pub filename: Option<String>,
    pub base64: Option<String>,
}

/// Canonical, validated options for one QR code.
#[derive(Debug, Clone, PartialEq)]
pub struct QrOptions {
    pub data: String,
    pub box_size: u32,
    pub border: u32,
    pub fill_color: Rgba<u8>,
    pub back_color: Rgba<u8>,
    /// `None` picks the smallest version that fits.
    pub version: Option<u8>,
    pub ec_level: EcLevel,
    pub format: OutputFormat,
    pub filename: Option<String>,
    pub base64: bool,
}

impl QrOptions {
    pub fn normalize(raw: RawQrOptions) -> QrResult<Self> {
        let data = require_data(raw.data)?;
        let format = match present(&raw.format) {
            Some(value) => OutputFormat::parse(value, OutputFormat::ALL)?,
            None => OutputFormat::default(),
        };
        let ec_level = match present(&raw.error_correction) {
            Some(value) => EcLevel::parse(value)?,
            None => EcLevel::default(),
        };

        Ok(Self {
            data,
            box_size: parse_bounded("box_size", &raw.box_size, 1, MAX_BOX_SIZE, DEFAULT_BOX_SIZE)?,
            border: parse_bounded("border", &raw.border, 0, MAX_BORDER, DEFAULT_BORDER)?,
            fill_color: parse_color_or("fill_color", &raw.fill_color, "black")?,
            back_color: parse_color_or("back_color", &raw.back_color, "white")?,
            version: parse_version(&raw.version)?,
            ec_level,
            format,
            filename: present(&raw.filename).and_then(sanitize_filename),
            base64: parse_bool("base64", &raw.base64)?,
        })
    }

    /// Logos hide modules in the middle of the symbol, so only H is safe.
    pub fn with_logo(mut self) -> Self {
        self.ec_level = EcLevel::H;
        self
    }

    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            version: self.version,
            ec_level: self.ec_level,
            box_size: self.box_size,
            border: self.border,
            dark: self.fill_color,
            light: self.back_color,
            format: self.format,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawArtisticOptions {
    pub data: Option<String>,
    pub dark: Option<String>,
    pub light: Option<String>,
    pub border: Option<String>,
    pub scale: Option<String>,
    pub error_correction: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtisticOptions {
    pub data: String,
    pub dark: Rgba<u8>,
    pub light: Rgba<u8>,
    pub border: u32,
    pub scale: u32,
    pub ec_level: EcLevel,
    pub format: OutputFormat,
}

impl ArtisticOptions {
    pub fn normalize(raw: RawArtisticOptions) -> QrResult<Self> {
        let data = require_data(raw.data)?;
        let format = match present(&raw.format) {
            Some(value) => OutputFormat::parse(value, OutputFormat::ARTISTIC)?,
            None => OutputFormat::Png,
        };
        let ec_level = match present(&raw.error_correction) {
            Some(value) => EcLevel::parse(value)?,
            None => EcLevel::default(),
        };

        Ok(Self {
            data,
            dark: parse_color_or("dark", &raw.dark, "#000")?,
            light: parse_color_or("light", &raw.light, "#fff")?,
            border: parse_bounded("border", &raw.border, 0, MAX_BORDER, DEFAULT_BORDER)?,
            scale: parse_bounded("scale", &raw.scale, 1, MAX_BOX_SIZE, DEFAULT_BOX_SIZE)?,
            ec_level,
            format,
        })
    }
}

fn require_data(data: Option<String>) -> QrResult<String> {
    match data {
        Some(data) if !data.is_empty() => Ok(data),
        _ => Err(QrError::MissingData),
    }
}

/// Blank optional fields count as absent; forms send them empty.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bounded(field: &str, value: &Option<String>, min: u32, max: u32, default: u32) -> QrResult<u32> {
    let Some(value) = present(value) else {
        return Ok(default);
    };
    value
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| {
            QrError::invalid_parameter(
                field,
                format!("expected an integer between {} and {}, got '{}'", min, max, value),
            )
        })
}

fn parse_version(value: &Option<String>) -> QrResult<Option<u8>> {
    match present(value) {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("auto") => Ok(None),
        Some(_) => {
            parse_bounded("version", value, MIN_VERSION, MAX_VERSION, MIN_VERSION).map(|v| Some(v as u8))
        }
    }
}

fn parse_color_or(field: &str, value: &Option<String>, default: &str) -> QrResult<Rgba<u8>> {
    parse_color(field, present(value).unwrap_or(default))
}

fn parse_bool(field: &str, value: &Option<String>) -> QrResult<bool> {
    let Some(value) = present(value) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(QrError::invalid_parameter(field, format!("expected a boolean, got '{}'", value))),
    }
}

/// Keeps file names usable in a `Content-Disposition` header and as a zip entry.
fn sanitize_filename(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn raw(data: &str) -> RawQrOptions {
        RawQrOptions { data: Some(data.to_string()), ..Default::default() }
    }

    #[test]
    fn defaults() {
        let opts = QrOptions::normalize(raw("HelloWorld")).unwrap();
        assert_eq!(opts.box_size, 10);
        assert_eq!(opts.border, 4);
        assert_eq!(opts.version, None);
        assert_eq!(opts.ec_level, EcLevel::L);
        assert_eq!(opts.format, OutputFormat::Png);
        assert_eq!(opts.fill_color, Rgba([0, 0, 0, 255]));
        assert_eq!(opts.back_color, Rgba([255, 255, 255, 255]));
        assert!(!opts.base64);
        assert!(opts.filename.is_none());
    }

    #[test]
    fn missing_and_empty_data() {
        assert_eq!(QrOptions::normalize(RawQrOptions::default()), Err(QrError::MissingData));
        assert_eq!(QrOptions::normalize(raw("")), Err(QrError::MissingData));
    }

    #[test]
    fn whitespace_data_is_kept_verbatim() {
        let opts = QrOptions::normalize(raw("  spaced  ")).unwrap();
        assert_eq!(opts.data, "  spaced  ");
    }

    #[test_case("PNG", OutputFormat::Png; "upper png")]
    #[test_case("svg", OutputFormat::Svg; "svg")]
    #[test_case("Jpeg", OutputFormat::Jpeg; "jpeg")]
    fn formats(input: &str, expected: OutputFormat) {
        let mut r = raw("x");
        r.format = Some(input.to_string());
        assert_eq!(QrOptions::normalize(r).unwrap().format, expected);
    }

    #[test]
    fn unsupported_format() {
        let mut r = raw("x");
        r.format = Some("gif".to_string());
        match QrOptions::normalize(r) {
            Err(QrError::UnsupportedFormat { format, .. }) => assert_eq!(format, "gif"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test_case("l", EcLevel::L; "lower l")]
    #[test_case("m", EcLevel::M; "lower m")]
    #[test_case("Q", EcLevel::Q; "upper q")]
    #[test_case("H", EcLevel::H; "upper h")]
    fn error_correction(input: &str, expected: EcLevel) {
        let mut r = raw("x");
        r.error_correction = Some(input.to_string());
        assert_eq!(QrOptions::normalize(r).unwrap().ec_level, expected);
    }

    #[test]
    fn invalid_error_correction() {
        let mut r = raw("x");
        r.error_correction = Some("X".to_string());
        assert_eq!(QrOptions::normalize(r), Err(QrError::InvalidErrorCorrection("X".to_string())));
    }

    #[test_case("box_size", "0"; "zero box size")]
    #[test_case("box_size", "-3"; "negative box size")]
    #[test_case("box_size", "ten"; "text box size")]
    #[test_case("border", "101"; "border too large")]
    #[test_case("version", "41"; "version too large")]
    #[test_case("version", "0"; "version zero")]
    #[test_case("base64", "maybe"; "bad bool")]
    #[test_case("fill_color", "not-a-color"; "bad color")]
    fn invalid_parameters(field: &str, value: &str) {
        let mut r = raw("x");
        let slot = match field {
            "box_size" => &mut r.box_size,
            "border" => &mut r.border,
            "version" => &mut r.version,
            "base64" => &mut r.base64,
            "fill_color" => &mut r.fill_color,
            _ => unreachable!(),
        };
        *slot = Some(value.to_string());
        match QrOptions::normalize(r) {
            Err(QrError::InvalidParameter { field: got, .. }) => assert_eq!(got, field),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn explicit_and_auto_version() {
        let mut r = raw("x");
        r.version = Some("7".to_string());
        assert_eq!(QrOptions::normalize(r.clone()).unwrap().version, Some(7));
        r.version = Some("AUTO".to_string());
        assert_eq!(QrOptions::normalize(r).unwrap().version, None);
    }

    #[test]
    fn blank_optional_fields_fall_back_to_defaults() {
        let mut r = raw("x");
        r.format = Some(String::new());
        r.box_size = Some("  ".to_string());
        r.filename = Some(String::new());
        let opts = QrOptions::normalize(r).unwrap();
        assert_eq!(opts.format, OutputFormat::Png);
        assert_eq!(opts.box_size, DEFAULT_BOX_SIZE);
        assert!(opts.filename.is_none());
    }

    #[test]
    fn filename_is_sanitized() {
        let mut r = raw("x");
        r.filename = Some("../etc/\"passwd\"".to_string());
        let opts = QrOptions::normalize(r).unwrap();
        assert_eq!(opts.filename.as_deref(), Some("_etc__passwd_"));
    }

    #[test]
    fn logo_forces_high_error_correction() {
        let mut r = raw("x");
        r.error_correction = Some("L".to_string());
        let opts = QrOptions::normalize(r).unwrap().with_logo();
        assert_eq!(opts.ec_level, EcLevel::H);
    }

    #[test]
    fn artistic_defaults_and_format_restriction() {
        let base = RawArtisticOptions { data: Some("art".into()), ..Default::default() };
        let opts = ArtisticOptions::normalize(base.clone()).unwrap();
        assert_eq!(opts.dark, Rgba([0, 0, 0, 255]));
        assert_eq!(opts.light, Rgba([255, 255, 255, 255]));
        assert_eq!(opts.scale, 10);
        assert_eq!(opts.format, OutputFormat::Png);

        let jpeg = RawArtisticOptions { format: Some("jpeg".into()), ..base };
        assert!(matches!(
            ArtisticOptions::normalize(jpeg),
            Err(QrError::UnsupportedFormat { .. })
        ));
    }
}
