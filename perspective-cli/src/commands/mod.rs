pub mod diff;
pub mod export;
pub mod import;
pub mod render;
pub mod status;
