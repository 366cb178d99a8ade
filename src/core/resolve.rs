use crate::io::annotation::Annotation;
use crate::types::{
    BandMetadata, FileType, GeoTransform, SampleFormat, UavsarError, UavsarResult,
};
use regex::Regex;
use std::path::Path;

/// How to build one candidate annotation-block prefix for a file type.
#[derive(Debug, Clone, Copy)]
enum PrefixCandidate {
    /// The file type's own code, e.g. `inc`.
    Own,
    /// The file type's code with a layer suffix, e.g. `grd` + `_pwr`.
    Suffixed(&'static str),
    /// A fixed prefix borrowed from a related layer, e.g. `grd_pwr`.
    Literal(&'static str),
}

/// One row of the prefix rule table: which file types it applies to and
/// the ordered candidates to try. An empty `applies_to` matches any type,
/// so the catch-all row must come last.
struct PrefixRule {
    applies_to: &'static [FileType],
    candidates: &'static [PrefixCandidate],
}

/// Ancillary layers share dimensions with other layers but often lack
/// their own block; they fall back to `hgt`, then `grd_pwr`. Everything
/// else tries the per-layer suffixes first. New file types extend this
/// table rather than adding branches.
static PREFIX_RULES: [PrefixRule; 2] = [
    PrefixRule {
        applies_to: &[FileType::Inc, FileType::Hgt, FileType::Slope],
        candidates: &[
            PrefixCandidate::Own,
            PrefixCandidate::Literal("hgt"),
            PrefixCandidate::Literal("grd_pwr"),
        ],
    },
    PrefixRule {
        applies_to: &[],
        candidates: &[
            PrefixCandidate::Suffixed("_pwr"),
            PrefixCandidate::Suffixed("_mag"),
            PrefixCandidate::Suffixed("_phase"),
            PrefixCandidate::Own,
        ],
    },
];

/// Polarization codes of real-valued power products. Any other code
/// captured from a GRD filename marks a complex cross-product.
const REAL_POL_CODES: [&str; 4] = ["HHHH", "VVVV", "HVHV", "VHVH"];

/// Default nodata when the annotation carries no `no_data` entry.
const NODATA_ELEVATION: f64 = -10000.0;
const NODATA_POWER: f64 = 0.0;

/// Resolve decoding and georeferencing metadata for one binary product
/// file from the parsed annotation table.
pub fn resolve_band_metadata<P: AsRef<Path>>(
    path: P,
    ann: &Annotation,
) -> UavsarResult<BandMetadata> {
    let path = path.as_ref();

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| UavsarError::Resolve(format!("{}: missing extension", path.display())))?;
    let file_type = FileType::from_extension(ext).ok_or_else(|| {
        UavsarError::Resolve(format!("{}: unknown product type '{}'", path.display(), ext))
    })?;

    let prefix = resolve_prefix(file_type, ann).ok_or_else(|| {
        UavsarError::Resolve(format!(
            "no annotation block found for '{}'",
            path.display()
        ))
    })?;
    log::debug!(
        "Resolved '{}' ({}) to annotation block '{}'",
        path.display(),
        file_type,
        prefix
    );

    let rows = require_int(ann, &format!("{}.set_rows", prefix))? as usize;
    let cols = require_int(ann, &format!("{}.set_cols", prefix))? as usize;

    let declared = declared_format(ann, &prefix);
    let format = apply_polarization_override(file_type, path, declared)?;

    let nodata = match ann.float(&format!("{}.no_data", prefix)) {
        Some(v) => v,
        None if file_type.is_elevation_or_angle() => NODATA_ELEVATION,
        None => NODATA_POWER,
    };

    let (epsg, transform) = resolve_georeferencing(file_type, &prefix, ann)?;

    Ok(BandMetadata {
        rows,
        cols,
        format,
        is_complex: format.is_complex(),
        nodata,
        epsg,
        transform,
        prefix,
    })
}

/// Walk the rule table and return the first candidate prefix whose
/// `set_rows` entry exists in the annotation table.
fn resolve_prefix(file_type: FileType, ann: &Annotation) -> Option<String> {
    let rule = PREFIX_RULES
        .iter()
        .find(|r| r.applies_to.is_empty() || r.applies_to.contains(&file_type))?;

    for candidate in rule.candidates {
        let prefix = match candidate {
            PrefixCandidate::Own => file_type.as_str().to_string(),
            PrefixCandidate::Suffixed(suffix) => format!("{}{}", file_type.as_str(), suffix),
            PrefixCandidate::Literal(name) => name.to_string(),
        };
        if ann.contains_key(&format!("{}.set_rows", prefix)) {
            return Some(prefix);
        }
    }
    None
}

fn require_int(ann: &Annotation, key: &str) -> UavsarResult<i64> {
    ann.int(key)
        .ok_or_else(|| UavsarError::Resolve(format!("missing required key '{}'", key)))
}

fn require_float(ann: &Annotation, key: &str) -> UavsarResult<f64> {
    ann.float(key)
        .ok_or_else(|| UavsarError::Resolve(format!("missing required key '{}'", key)))
}

/// Sample format declared by the annotation's `val_frmt` entry. Absent or
/// unrecognized formats default to 32-bit float.
fn declared_format(ann: &Annotation, prefix: &str) -> SampleFormat {
    let val_frmt = ann
        .text(&format!("{}.val_frmt", prefix))
        .map(|s| s.to_ascii_uppercase())
        .unwrap_or_default();

    if val_frmt.contains("COMPLEX") {
        SampleFormat::Complex64
    } else if val_frmt.contains("REAL*8") {
        SampleFormat::Float64
    } else if val_frmt.contains("REAL") {
        SampleFormat::Float32
    } else {
        SampleFormat::Float32
    }
}

/// GRD cross-products are complex even when the governing block (usually
/// `grd_pwr`) describes a real layer. The filename's polarization code
/// decides: codes outside the real power set force complex, codes inside
/// force real, no recognizable code defers to the annotation.
fn apply_polarization_override(
    file_type: FileType,
    path: &Path,
    declared: SampleFormat,
) -> UavsarResult<SampleFormat> {
    if file_type != FileType::Grd {
        return Ok(declared);
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let re = Regex::new(r"L\d{3}([HV]{4})_CX")
        .map_err(|e| UavsarError::Resolve(format!("polarization pattern: {}", e)))?;

    match re.captures(stem) {
        Some(caps) => {
            let code = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if REAL_POL_CODES.contains(&code) {
                // Real power image, whatever the annotation claims.
                Ok(match declared {
                    SampleFormat::Complex64 => SampleFormat::Float32,
                    real => real,
                })
            } else {
                log::debug!("Polarization '{}' marks a complex cross-product", code);
                Ok(SampleFormat::Complex64)
            }
        }
        None => Ok(declared),
    }
}

/// Try UTM-projected georeferencing first, then geographic lat/lon.
fn resolve_georeferencing(
    file_type: FileType,
    prefix: &str,
    ann: &Annotation,
) -> UavsarResult<(u32, GeoTransform)> {
    let candidates = [
        prefix.to_string(),
        format!("{}_pwr", file_type.as_str()),
        file_type.as_str().to_string(),
    ];

    if let Some(p) = candidates
        .iter()
        .find(|p| ann.contains_key(&format!("{}.upper_left_easting", p)))
    {
        return utm_georeferencing(p, ann);
    }

    // Geographic blocks carry row/col addresses in degrees.
    if let Some(p) = candidates
        .iter()
        .find(|p| ann.units(&format!("{}.row_addr", p)) == Some("deg"))
    {
        return geographic_georeferencing(p, ann);
    }

    Err(UavsarError::Resolve(format!(
        "no usable georeferencing under block '{}'",
        prefix
    )))
}

fn utm_georeferencing(prefix: &str, ann: &Annotation) -> UavsarResult<(u32, GeoTransform)> {
    let ul_easting = require_float(ann, &format!("{}.upper_left_easting", prefix))?;
    let ul_northing = require_float(ann, &format!("{}.upper_left_northing", prefix))?;
    let easting_spacing = require_float(ann, &format!("{}.easting_pixel_spacing", prefix))?;
    let northing_spacing = require_float(ann, &format!("{}.northing_pixel_spacing", prefix))?;
    let zone = require_int(ann, "peg_point_utm_zone")?;
    let latitude = require_float(ann, "peg_point_latitude")?;

    let epsg = if latitude >= 0.0 {
        32600 + zone as u32
    } else {
        32700 + zone as u32
    };

    // Rows advance southward, so the y scale is the negated spacing.
    let transform = GeoTransform::north_up(ul_easting, easting_spacing, ul_northing, -northing_spacing);
    Ok((epsg, transform))
}

fn geographic_georeferencing(prefix: &str, ann: &Annotation) -> UavsarResult<(u32, GeoTransform)> {
    let ul_lat = require_float(ann, &format!("{}.row_addr", prefix))?;
    let ul_lon = require_float(ann, &format!("{}.col_addr", prefix))?;
    let lat_spacing = require_float(ann, &format!("{}.row_mult", prefix))?;
    let lon_spacing = require_float(ann, &format!("{}.col_mult", prefix))?;

    // row_mult already carries the scan direction in its sign; no flip.
    let transform = GeoTransform::north_up(ul_lon, lon_spacing, ul_lat, lat_spacing);
    Ok((4326, transform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    const GEO_ANN: &str = "\
grd_pwr.set_rows (pixels) = 10
grd_pwr.set_cols (pixels) = 15
grd_pwr.row_addr (deg) = 50.0
grd_pwr.col_addr (deg) = -100.0
grd_pwr.row_mult (deg/pixel) = -5.556e-05
grd_pwr.col_mult (deg/pixel) = 5.556e-05
grd_pwr.val_frmt (&) = REAL*4
grd_pwr.no_data (dB) = -10000.0
";

    const UTM_ANN: &str = "\
hgt.set_rows (pixels) = 20
hgt.set_cols (pixels) = 30
hgt.upper_left_easting (m) = 500000.0
hgt.upper_left_northing (m) = 4100000.0
hgt.easting_pixel_spacing (m) = 5.0
hgt.northing_pixel_spacing (m) = 5.0
peg_point_utm_zone (&) = 12
peg_point_latitude (deg) = 37.2
";

    #[test]
    fn resolves_grd_through_pwr_suffix() {
        let ann = Annotation::parse(GEO_ANN);
        let meta = resolve_band_metadata(PathBuf::from("scene.grd"), &ann).unwrap();

        assert_eq!(meta.prefix, "grd_pwr");
        assert_eq!((meta.rows, meta.cols), (10, 15));
        assert_eq!(meta.format, SampleFormat::Float32);
        assert!(!meta.is_complex);
        assert_eq!(meta.nodata, -10000.0);
        assert_eq!(meta.epsg, 4326);
        assert_relative_eq!(meta.transform.pixel_width, 5.556e-05);
        assert_relative_eq!(meta.transform.pixel_height, -5.556e-05);
        assert_relative_eq!(meta.transform.top_left_x, -100.0);
        assert_relative_eq!(meta.transform.top_left_y, 50.0);
    }

    #[test]
    fn ancillary_type_falls_back_to_grd_pwr_block() {
        let ann = Annotation::parse(GEO_ANN);
        let meta = resolve_band_metadata(PathBuf::from("scene.inc"), &ann).unwrap();
        assert_eq!(meta.prefix, "grd_pwr");
        assert_eq!((meta.rows, meta.cols), (10, 15));
        // No no_data entry applies to inc via its own block; the grd_pwr one does.
        assert_eq!(meta.nodata, -10000.0);
    }

    #[test]
    fn ancillary_prefers_own_block_then_hgt() {
        let text = format!("{}\ninc.set_rows (pixels) = 4\ninc.set_cols (pixels) = 5\n", GEO_ANN);
        let mut ann = Annotation::parse(&text);
        // Own block wins the prefix search, but it carries no row_addr
        // under inc/inc_pwr, so georeferencing resolution fails.
        let meta = resolve_band_metadata(PathBuf::from("scene.inc"), &ann);
        assert!(meta.is_err());

        ann.remove("inc.set_rows");
        ann.remove("inc.set_cols");
        let meta = resolve_band_metadata(PathBuf::from("scene.inc"), &ann).unwrap();
        assert_eq!(meta.prefix, "grd_pwr");
    }

    #[test]
    fn ancillary_nodata_defaults_to_elevation_sentinel() {
        let text = GEO_ANN.replace("grd_pwr.no_data (dB) = -10000.0\n", "");
        let ann = Annotation::parse(&text);
        let meta = resolve_band_metadata(PathBuf::from("scene.inc"), &ann).unwrap();
        assert_eq!(meta.nodata, -10000.0);

        let meta = resolve_band_metadata(PathBuf::from("scene.grd"), &ann).unwrap();
        assert_eq!(meta.nodata, 0.0);
    }

    #[test]
    fn no_block_at_all_is_a_resolution_failure() {
        let ann = Annotation::parse("unrelated = 1\n");
        let err = resolve_band_metadata(PathBuf::from("scene.grd"), &ann).unwrap_err();
        assert!(matches!(err, UavsarError::Resolve(_)));
    }

    #[test]
    fn val_frmt_mapping() {
        let ann = Annotation::parse(GEO_ANN);
        assert_eq!(declared_format(&ann, "grd_pwr"), SampleFormat::Float32);

        let ann = Annotation::parse(&GEO_ANN.replace("REAL*4", "REAL*8"));
        assert_eq!(declared_format(&ann, "grd_pwr"), SampleFormat::Float64);

        let ann = Annotation::parse(&GEO_ANN.replace("REAL*4", "COMPLEX"));
        assert_eq!(declared_format(&ann, "grd_pwr"), SampleFormat::Complex64);

        // Absent entry defaults to f32.
        let ann = Annotation::parse(&GEO_ANN.replace("grd_pwr.val_frmt (&) = REAL*4\n", ""));
        assert_eq!(declared_format(&ann, "grd_pwr"), SampleFormat::Float32);
    }

    #[test]
    fn cross_pol_filename_forces_complex() {
        let ann = Annotation::parse(GEO_ANN);
        let path = PathBuf::from("winnip_14501_19005_005_190201_L090HVVV_CX_01.grd");
        let meta = resolve_band_metadata(path, &ann).unwrap();
        assert_eq!(meta.format, SampleFormat::Complex64);
        assert!(meta.is_complex);
    }

    #[test]
    fn matched_cross_pol_power_forces_real() {
        // Annotation claims complex, but HVHV is a real power product.
        let ann = Annotation::parse(&GEO_ANN.replace("REAL*4", "COMPLEX"));
        let path = PathBuf::from("winnip_14501_19005_005_190201_L090HVHV_CX_01.grd");
        let meta = resolve_band_metadata(path, &ann).unwrap();
        assert_eq!(meta.format, SampleFormat::Float32);
        assert!(!meta.is_complex);
    }

    #[test]
    fn unmatched_filename_defers_to_annotation() {
        let ann = Annotation::parse(&GEO_ANN.replace("REAL*4", "COMPLEX"));
        let meta = resolve_band_metadata(PathBuf::from("plain_name.grd"), &ann).unwrap();
        assert_eq!(meta.format, SampleFormat::Complex64);
    }

    #[test]
    fn override_only_applies_to_grd() {
        let text = GEO_ANN.replace("grd_pwr", "mlc_pwr");
        let ann = Annotation::parse(&text);
        let path = PathBuf::from("winnip_14501_19005_005_190201_L090HVVV_CX_01.mlc");
        let meta = resolve_band_metadata(path, &ann).unwrap();
        assert_eq!(meta.format, SampleFormat::Float32);
    }

    #[test]
    fn utm_block_wins_and_negates_northing_spacing() {
        let ann = Annotation::parse(UTM_ANN);
        let meta = resolve_band_metadata(PathBuf::from("scene.hgt"), &ann).unwrap();

        assert_eq!(meta.epsg, 32612);
        assert_relative_eq!(meta.transform.top_left_x, 500000.0);
        assert_relative_eq!(meta.transform.top_left_y, 4100000.0);
        assert_relative_eq!(meta.transform.pixel_width, 5.0);
        assert_relative_eq!(meta.transform.pixel_height, -5.0);
    }

    #[test]
    fn southern_hemisphere_gets_327xx() {
        let ann = Annotation::parse(&UTM_ANN.replace("37.2", "-33.9"));
        let meta = resolve_band_metadata(PathBuf::from("scene.hgt"), &ann).unwrap();
        assert_eq!(meta.epsg, 32712);
    }

    #[test]
    fn missing_utm_zone_fails_resolution() {
        let ann = Annotation::parse(&UTM_ANN.replace("peg_point_utm_zone (&) = 12\n", ""));
        let err = resolve_band_metadata(PathBuf::from("scene.hgt"), &ann).unwrap_err();
        assert!(matches!(err, UavsarError::Resolve(_)));
    }

    #[test]
    fn row_addr_without_deg_units_is_not_geographic() {
        let text = GEO_ANN.replace("grd_pwr.row_addr (deg)", "grd_pwr.row_addr (m)");
        let ann = Annotation::parse(&text);
        let err = resolve_band_metadata(PathBuf::from("scene.grd"), &ann).unwrap_err();
        assert!(matches!(err, UavsarError::Resolve(_)));
    }
}
