//! Core conversion modules

pub mod convert;
pub mod resolve;

// Re-export main types
pub use convert::{convert_file_to_geotiff, process_product_directory, Conversion, ConversionSummary};
pub use resolve::resolve_band_metadata;
