pub mod common;
pub mod decode;
pub mod generate;
pub mod system;
