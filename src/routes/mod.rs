use poem_openapi::Tags;

pub mod decode;
pub mod generate;
pub mod system;

#[derive(Tags)]
pub enum ApiTags {
    /// Encode data into QR code images
    Generate,
    /// Read QR codes from uploaded images
    Decode,
    /// Service status
    System,
}
