//! uavsar2tiff: Annotation-Driven UAVSAR Product Conversion
//!
//! This library turns directories of raw UAVSAR binary products (GRD, SLC,
//! MLC and friends) into georeferenced GeoTIFFs. The product's `.ann`
//! annotation file drives everything: which metadata block governs a given
//! binary layer, how its samples are encoded, and how pixels map to UTM or
//! geographic coordinates. Converted single-band rasters can then be
//! stacked into one multi-band GeoTIFF with per-band labels.
//!
//! Catalog search, authenticated download and archive extraction are
//! external collaborators; this crate only consumes unzipped directories.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    AnnotationValue, BandGrid, BandMetadata, FileType, GeoTransform, ProductDescriptor,
    SampleFormat, UavsarError, UavsarResult,
};

pub use crate::core::{convert_file_to_geotiff, process_product_directory, resolve_band_metadata};
pub use crate::io::{stack_bands, Annotation};
