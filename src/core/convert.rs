use crate::core::resolve::resolve_band_metadata;
use crate::io::annotation::Annotation;
use crate::io::binary::read_band;
use crate::io::geotiff::write_single_band;
use crate::types::{FileType, UavsarError, UavsarResult};
use std::path::{Path, PathBuf};

/// Outcome of a single-file conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// A new GeoTIFF was written at this path.
    Written(PathBuf),
    /// The destination already existed; nothing was written.
    AlreadyExists(PathBuf),
}

impl Conversion {
    pub fn path(&self) -> &Path {
        match self {
            Conversion::Written(p) | Conversion::AlreadyExists(p) => p,
        }
    }
}

/// Per-directory batch results. Failures are counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Convert one binary product file to a georeferenced single-band GeoTIFF
/// at `<name>.<ext>.tiff` next to the source.
pub fn convert_file_to_geotiff<P: AsRef<Path>>(
    in_path: P,
    ann: &Annotation,
) -> UavsarResult<Conversion> {
    let in_path = in_path.as_ref();
    let out_path = tiff_destination(in_path);

    if out_path.exists() {
        log::info!(
            "Output file {} already exists. Skipping conversion.",
            out_path.display()
        );
        return Ok(Conversion::AlreadyExists(out_path));
    }

    let meta = resolve_band_metadata(in_path, ann)?;
    log::info!(
        "Converting {} using annotation block '{}'",
        in_path.display(),
        meta.prefix
    );

    let grid = read_band(in_path, &meta)?;
    write_single_band(&out_path, &grid, &meta)?;

    Ok(Conversion::Written(out_path))
}

/// Destination path with `.tiff` appended to the full source file name,
/// preserving the data-type suffix (`scene.grd` -> `scene.grd.tiff`).
fn tiff_destination(in_path: &Path) -> PathBuf {
    let mut name = in_path.as_os_str().to_os_string();
    name.push(".tiff");
    PathBuf::from(name)
}

/// Convert every recognizable binary file in an unzipped product
/// directory, driven by the directory's `.ann` annotation file.
///
/// Resolution and decode failures skip the affected file with a warning;
/// only a missing or unusable annotation file fails the directory.
pub fn process_product_directory<P: AsRef<Path>>(dir: P) -> UavsarResult<ConversionSummary> {
    let dir = dir.as_ref();
    log::info!("Processing convertible files in {}", dir.display());

    let ann_path = find_annotation_file(dir)?;
    log::info!("Found annotation file: {}", ann_path.display());

    let ann = Annotation::from_file(&ann_path)?;
    if ann.is_empty() {
        return Err(UavsarError::Annotation(format!(
            "{} contains no parseable statements",
            ann_path.display()
        )));
    }

    let files = find_convertible_files(dir)?;
    if files.is_empty() {
        log::info!("No convertible files found in {}", dir.display());
        return Ok(ConversionSummary::default());
    }

    let mut summary = ConversionSummary::default();
    for data_file in &files {
        match convert_file_to_geotiff(data_file, &ann) {
            Ok(Conversion::Written(_)) => summary.converted += 1,
            Ok(Conversion::AlreadyExists(_)) => summary.skipped += 1,
            Err(e) => {
                log::warn!("Skipping {}: {}", data_file.display(), e);
                summary.failed += 1;
            }
        }
    }

    log::info!(
        "Directory {}: {} converted, {} skipped, {} failed",
        dir.display(),
        summary.converted,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

/// The single `.ann` metadata file of a product directory.
fn find_annotation_file(dir: &Path) -> UavsarResult<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("ann"))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        UavsarError::Annotation(format!("no .ann file found in {}", dir.display()))
    })
}

/// All binary files in the directory whose extension names a known
/// product type, in sorted order for deterministic processing.
fn find_convertible_files(dir: &Path) -> UavsarResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .and_then(FileType::from_extension)
                .is_some()
        })
        .collect();
    files.sort();
    Ok(files)
}
