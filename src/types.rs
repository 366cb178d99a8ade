use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use ndarray::Array2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Complex-valued UAVSAR sample (I + jQ)
pub type UavsarComplex = Complex<f32>;

/// One parsed value from an annotation statement.
///
/// Whole-number values are stored as `Int`, fractional ones as `Float`,
/// anything non-numeric as `Text`. The two acquisition-time keys are
/// rewritten to `Timestamp` in a post-pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Tz>),
}

impl AnnotationValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AnnotationValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; `Int` widens to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnnotationValue::Int(v) => Some(*v as f64),
            AnnotationValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Tz>> {
        match self {
            AnnotationValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Product file types with distinct binary layouts, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Grd,
    Slc,
    Mlc,
    Inc,
    Hgt,
    Slope,
    Dem,
    Amp,
    Cor,
    Unw,
}

impl FileType {
    /// Map a file extension (without the dot) to a product type.
    pub fn from_extension(ext: &str) -> Option<FileType> {
        match ext.to_ascii_lowercase().as_str() {
            "grd" => Some(FileType::Grd),
            "slc" => Some(FileType::Slc),
            "mlc" => Some(FileType::Mlc),
            "inc" => Some(FileType::Inc),
            "hgt" => Some(FileType::Hgt),
            "slope" => Some(FileType::Slope),
            "dem" => Some(FileType::Dem),
            "amp" => Some(FileType::Amp),
            "cor" => Some(FileType::Cor),
            "unw" => Some(FileType::Unw),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Grd => "grd",
            FileType::Slc => "slc",
            FileType::Mlc => "mlc",
            FileType::Inc => "inc",
            FileType::Hgt => "hgt",
            FileType::Slope => "slope",
            FileType::Dem => "dem",
            FileType::Amp => "amp",
            FileType::Cor => "cor",
            FileType::Unw => "unw",
        }
    }

    /// Ancillary layers that often lack their own annotation block and
    /// borrow dimensions from a related layer.
    pub fn is_ancillary(&self) -> bool {
        matches!(self, FileType::Inc | FileType::Hgt | FileType::Slope)
    }

    /// Elevation or angle maps, where 0 is a valid sample and the nodata
    /// default must be a large negative sentinel.
    pub fn is_elevation_or_angle(&self) -> bool {
        matches!(
            self,
            FileType::Hgt | FileType::Dem | FileType::Inc | FileType::Slope
        )
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Numeric encoding of the raw samples in a binary product file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    Float32,
    Float64,
    Complex64,
}

impl SampleFormat {
    /// Size of one stored element in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            SampleFormat::Float32 => 4,
            SampleFormat::Float64 => 8,
            SampleFormat::Complex64 => 8,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, SampleFormat::Complex64)
    }
}

/// Geospatial transformation parameters (pixel row/col to world x/y)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform with no rotation terms.
    pub fn north_up(top_left_x: f64, pixel_width: f64, top_left_y: f64, pixel_height: f64) -> Self {
        GeoTransform {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height,
        }
    }

    /// GDAL geotransform array ordering.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        GeoTransform {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }
}

/// Everything needed to decode and georeference one binary product file.
///
/// Built fresh per conversion from the annotation table; never persisted.
#[derive(Debug, Clone)]
pub struct BandMetadata {
    pub rows: usize,
    pub cols: usize,
    pub format: SampleFormat,
    pub is_complex: bool,
    pub nodata: f64,
    pub epsg: u32,
    pub transform: GeoTransform,
    /// Annotation block prefix the metadata was resolved from.
    pub prefix: String,
}

/// Decoded 2-D sample grid. Complex inputs are reduced to `F32` magnitudes
/// by the decoder, so only the two real layouts survive to the writer.
#[derive(Debug, Clone)]
pub enum BandGrid {
    F32(Array2<f32>),
    F64(Array2<f64>),
}

impl BandGrid {
    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            BandGrid::F32(a) => a.dim(),
            BandGrid::F64(a) => a.dim(),
        }
    }
}

/// Catalog-search collaborator contract: one remotely discoverable product.
///
/// The core never performs the search itself; it only consumes directories
/// of already-downloaded, already-unzipped files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub scene_name: String,
    pub processing_level: String,
    pub url: String,
    pub start_time: DateTime<Utc>,
    pub stop_time: DateTime<Utc>,
}

impl ProductDescriptor {
    /// Scene name without the `_grd` suffix, used to name the local
    /// product directory.
    pub fn base_name(&self) -> &str {
        self.scene_name
            .strip_suffix("_grd")
            .unwrap_or(&self.scene_name)
    }
}

/// Error types for UAVSAR product processing
#[derive(Debug, thiserror::Error)]
pub enum UavsarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Metadata resolution failed: {0}")]
    Resolve(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Stack consistency error: {0}")]
    Consistency(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for UAVSAR operations
pub type UavsarResult<T> = Result<T, UavsarError>;
