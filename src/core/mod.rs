pub mod color;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod options;
pub mod packager;
pub mod postprocess;
