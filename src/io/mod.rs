//! I/O modules for annotation text, raw binary layers, and GeoTIFF output

pub mod annotation;
pub mod binary;
pub mod geotiff;

pub use annotation::{Annotation, AnnotationEntry};
pub use binary::read_band;
pub use geotiff::{stack_bands, write_single_band};
