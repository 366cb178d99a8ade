use crate::types::{BandGrid, BandMetadata, UavsarError, UavsarResult};
use gdal::raster::{Buffer, GdalDataType, GdalType, RasterCreationOption};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Write a decoded grid as a single-band LZW-compressed GeoTIFF.
///
/// Returns `false` without touching the filesystem when the destination
/// already exists; conversion is idempotent by presence, not content.
pub fn write_single_band<P: AsRef<Path>>(
    path: P,
    grid: &BandGrid,
    meta: &BandMetadata,
) -> UavsarResult<bool> {
    let path = path.as_ref();
    if path.exists() {
        log::info!("Output file {} already exists. Skipping write.", path.display());
        return Ok(false);
    }

    match grid {
        BandGrid::F32(data) => create_single_band(path, data, meta)?,
        BandGrid::F64(data) => create_single_band(path, data, meta)?,
    }

    log::info!("Wrote GeoTIFF {}", path.display());
    Ok(true)
}

fn create_single_band<T: GdalType + Copy>(
    path: &Path,
    data: &Array2<T>,
    meta: &BandMetadata,
) -> UavsarResult<()> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (rows, cols) = data.dim();

    let options = [RasterCreationOption {
        key: "COMPRESS",
        value: "LZW",
    }];
    let mut dataset = driver.create_with_band_type_with_options::<T, _>(
        path,
        cols as isize,
        rows as isize,
        1,
        &options,
    )?;

    dataset.set_geo_transform(&meta.transform.to_gdal())?;
    dataset.set_spatial_ref(&SpatialRef::from_epsg(meta.epsg)?)?;

    let mut band = dataset.rasterband(1)?;
    let flat: Vec<T> = data.iter().copied().collect();
    let buffer = Buffer::new((cols, rows), flat);
    band.write((0, 0), (cols, rows), &buffer)?;
    band.set_no_data_value(Some(meta.nodata))?;

    Ok(())
}

/// Geometry of the first stack input, against which every later input is
/// validated.
struct StackProfile {
    width: usize,
    height: usize,
    geo_transform: [f64; 6],
    srs_wkt: String,
    nodata: Option<f64>,
}

enum StackBands {
    F32(Vec<(String, Vec<f32>)>),
    F64(Vec<(String, Vec<f64>)>),
}

/// Open a stack input, requiring it to carry exactly one band.
fn open_single_band(path: &Path) -> UavsarResult<Dataset> {
    let dataset = Dataset::open(path)?;
    if dataset.raster_count() != 1 {
        return Err(UavsarError::Consistency(format!(
            "{} has {} bands, expected exactly one",
            path.display(),
            dataset.raster_count()
        )));
    }
    Ok(dataset)
}

/// Compose previously written single-band GeoTIFFs into one multi-band
/// raster at `{out_dir}/{out_dir_name}_stack.tif`, one band per input in
/// input order, each labeled with the input's file stem.
///
/// Every input must have exactly one band, and all inputs must agree on
/// width, height, CRS and geotransform; any mismatch aborts the whole
/// stack with a consistency failure and no partial output.
pub fn stack_bands<P: AsRef<Path>>(
    out_dir: P,
    tiff_paths: &[PathBuf],
) -> UavsarResult<Option<PathBuf>> {
    let out_dir = out_dir.as_ref();

    if tiff_paths.is_empty() {
        log::warn!("No GeoTIFF files provided for stacking.");
        return Ok(None);
    }

    let dir_name = out_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| UavsarError::Consistency("stack output directory has no name".to_string()))?;
    let out_fp = out_dir.join(format!("{}_stack.tif", dir_name));

    if out_fp.exists() {
        log::info!("Output stack file {} already exists. Skipping.", out_fp.display());
        return Ok(Some(out_fp));
    }

    // The first input fixes the output geometry and sample type.
    let first = open_single_band(&tiff_paths[0])?;
    let (width, height) = first.raster_size();
    let first_band = first.rasterband(1)?;
    let profile = StackProfile {
        width,
        height,
        geo_transform: first.geo_transform()?,
        srs_wkt: first.spatial_ref()?.to_wkt()?,
        nodata: first_band.no_data_value(),
    };
    let mut bands = if first_band.band_type() == GdalDataType::Float64 {
        StackBands::F64(Vec::with_capacity(tiff_paths.len()))
    } else {
        StackBands::F32(Vec::with_capacity(tiff_paths.len()))
    };
    drop(first_band);
    drop(first);

    for tiff_path in tiff_paths {
        let dataset = open_single_band(tiff_path)?;

        let (w, h) = dataset.raster_size();
        if w != profile.width
            || h != profile.height
            || dataset.geo_transform()? != profile.geo_transform
            || dataset.spatial_ref()?.to_wkt()? != profile.srs_wkt
        {
            return Err(UavsarError::Consistency(format!(
                "{} does not match the first band's geometry or CRS",
                tiff_path.display()
            )));
        }

        let band = dataset.rasterband(1)?;
        let name = tiff_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        match &mut bands {
            StackBands::F32(list) => {
                let data = band.read_as::<f32>((0, 0), (w, h), (w, h), None)?;
                list.push((name, data.data));
            }
            StackBands::F64(list) => {
                let data = band.read_as::<f64>((0, 0), (w, h), (w, h), None)?;
                list.push((name, data.data));
            }
        }
    }

    match &bands {
        StackBands::F32(list) => write_stack(&out_fp, &profile, list)?,
        StackBands::F64(list) => write_stack(&out_fp, &profile, list)?,
    }

    log::info!(
        "Wrote {}-band stacked GeoTIFF {}",
        tiff_paths.len(),
        out_fp.display()
    );
    Ok(Some(out_fp))
}

fn write_stack<T: GdalType + Copy>(
    out_fp: &Path,
    profile: &StackProfile,
    bands: &[(String, Vec<T>)],
) -> UavsarResult<()> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;

    // Predictor 3 is the horizontal-differencing predictor for floats.
    let options = [
        RasterCreationOption {
            key: "COMPRESS",
            value: "DEFLATE",
        },
        RasterCreationOption {
            key: "PREDICTOR",
            value: "3",
        },
    ];
    let mut dataset = driver.create_with_band_type_with_options::<T, _>(
        out_fp,
        profile.width as isize,
        profile.height as isize,
        bands.len() as isize,
        &options,
    )?;

    dataset.set_geo_transform(&profile.geo_transform)?;
    dataset.set_spatial_ref(&SpatialRef::from_wkt(&profile.srs_wkt)?)?;

    for (i, (name, data)) in bands.iter().enumerate() {
        let mut band = dataset.rasterband((i + 1) as isize)?;
        let buffer = Buffer::new((profile.width, profile.height), data.clone());
        band.write((0, 0), (profile.width, profile.height), &buffer)?;
        band.set_description(name)?;
        if let Some(nodata) = profile.nodata {
            band.set_no_data_value(Some(nodata))?;
        }
    }

    Ok(())
}
