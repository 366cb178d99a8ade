use crate::types::{BandGrid, BandMetadata, SampleFormat, UavsarComplex, UavsarError, UavsarResult};
use ndarray::Array2;
use std::path::Path;

/// Decode a raw UAVSAR binary file into a 2-D grid using resolved band
/// metadata. Samples are little-endian. Complex samples are reduced to
/// their magnitude, so the result is always real-valued.
pub fn read_band<P: AsRef<Path>>(path: P, meta: &BandMetadata) -> UavsarResult<BandGrid> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    let elem_size = meta.format.byte_len();
    if bytes.len() % elem_size != 0 {
        return Err(UavsarError::Decode(format!(
            "{}: byte length {} is not a multiple of the {}-byte element size",
            path.display(),
            bytes.len(),
            elem_size
        )));
    }

    let count = bytes.len() / elem_size;
    let expected = meta.rows * meta.cols;
    if count != expected {
        return Err(UavsarError::Decode(format!(
            "{}: found {} elements, expected {} ({} rows x {} cols)",
            path.display(),
            count,
            expected,
            meta.rows,
            meta.cols
        )));
    }

    log::debug!(
        "Decoding {} as {:?}, {} x {}",
        path.display(),
        meta.format,
        meta.rows,
        meta.cols
    );

    let grid = match meta.format {
        SampleFormat::Float32 => {
            let samples: Vec<f32> = bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            BandGrid::F32(reshape(samples, meta, path)?)
        }
        SampleFormat::Float64 => {
            let samples: Vec<f64> = bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect();
            BandGrid::F64(reshape(samples, meta, path)?)
        }
        SampleFormat::Complex64 => {
            // Magnitude of each I/Q pair, for visualization.
            let samples: Vec<f32> = bytes
                .chunks_exact(8)
                .map(|c| {
                    let re = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                    let im = f32::from_le_bytes([c[4], c[5], c[6], c[7]]);
                    UavsarComplex::new(re, im).norm()
                })
                .collect();
            BandGrid::F32(reshape(samples, meta, path)?)
        }
    };

    Ok(grid)
}

fn reshape<T>(samples: Vec<T>, meta: &BandMetadata, path: &Path) -> UavsarResult<Array2<T>> {
    Array2::from_shape_vec((meta.rows, meta.cols), samples).map_err(|e| {
        UavsarError::Decode(format!("{}: failed to reshape samples: {}", path.display(), e))
    })
}
