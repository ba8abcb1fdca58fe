//! Binary format for fitted GTM models, plus the text log-likelihood trace.
//!
//! ## Format Layout
//!
//! All integers are little-endian `i32`, all reals little-endian `f64`.
//!
//! ```text
//! +---------------------------+
//! | Name (32 bytes)           |  "GTM!" zero padded
//! | Version (4 bytes)         |
//! | Input count (4 bytes)     |  training points
//! | Output count (4 bytes)    |  embedding nodes
//! | Basis per axis (4 bytes)  |
//! | Latent per axis (4 bytes) |
//! | Spacing scale             |  v3: i32, v4: f64
//! | Latent dims (4 bytes)     |
//! | Data dims (4 bytes)       |
//! | Beta (8 bytes)            |  v4 only
//! +---------------------------+
//! | Embedding                 |  output count x data dims, row-major
//! +---------------------------+
//! ```
//!
//! Version 3 files carry an integral spacing scale and no noise precision;
//! version 4 is what [`ModelFormat::write`] produces.

use crate::error::{GtmError, Result};
use crate::gtm::GtmModel;
use nalgebra::DMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Magic name at the start of every model file.
const MAGIC: &[u8; 4] = b"GTM!";

/// Size of the zero-padded name field.
const NAME_SIZE: usize = 32;

/// Version written by this crate.
const VERSION: i32 = 4;

/// Oldest readable version.
const VERSION_INTEGRAL_SCALE: i32 = 3;

/// Header size of version 3 files.
const HEADER_SIZE_V3: usize = NAME_SIZE + 8 * 4;

/// Header size of version 4 files.
const HEADER_SIZE_V4: usize = NAME_SIZE + 7 * 4 + 2 * 8;

/// Model file header.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    /// Format version.
    pub version: i32,
    /// Number of training points.
    pub input_count: usize,
    /// Number of embedding nodes.
    pub output_count: usize,
    /// RBF centers per latent axis.
    pub basis_functions_per_axis: usize,
    /// Latent samples per latent axis.
    pub latent_samples_per_axis: usize,
    /// Kernel width multiplier.
    pub spacing_scale: f64,
    /// Latent dimensionality.
    pub latent_dimensions: usize,
    /// Data dimensionality.
    pub data_dimensions: usize,
    /// Noise precision; absent in version 3 files.
    pub beta: Option<f64>,
}

fn to_i32(value: usize, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        GtmError::InvalidModelFormat(format!("{} {} does not fit in i32", field, value))
    })
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn read_f64(bytes: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_le_bytes(raw)
}

fn read_count(bytes: &[u8], offset: usize, field: &str) -> Result<usize> {
    let value = read_i32(bytes, offset);
    usize::try_from(value)
        .map_err(|_| GtmError::InvalidModelFormat(format!("Negative {}: {}", field, value)))
}

impl ModelHeader {
    /// Header size in bytes for this header's version.
    pub fn size(&self) -> usize {
        if self.version == VERSION_INTEGRAL_SCALE {
            HEADER_SIZE_V3
        } else {
            HEADER_SIZE_V4
        }
    }

    /// Writes a version 4 header to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE_V4);

        let mut name = [0u8; NAME_SIZE];
        name[..MAGIC.len()].copy_from_slice(MAGIC);
        bytes.extend_from_slice(&name);

        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&to_i32(self.input_count, "input count")?.to_le_bytes());
        bytes.extend_from_slice(&to_i32(self.output_count, "output count")?.to_le_bytes());
        bytes.extend_from_slice(
            &to_i32(self.basis_functions_per_axis, "basis count")?.to_le_bytes(),
        );
        bytes.extend_from_slice(
            &to_i32(self.latent_samples_per_axis, "latent count")?.to_le_bytes(),
        );
        bytes.extend_from_slice(&self.spacing_scale.to_le_bytes());
        bytes.extend_from_slice(
            &to_i32(self.latent_dimensions, "latent dimensions")?.to_le_bytes(),
        );
        bytes.extend_from_slice(&to_i32(self.data_dimensions, "data dimensions")?.to_le_bytes());
        bytes.extend_from_slice(&self.beta.unwrap_or(f64::NAN).to_le_bytes());

        Ok(bytes)
    }

    /// Reads a version 3 or version 4 header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < NAME_SIZE + 4 {
            return Err(GtmError::InvalidModelFormat("Header too short".to_string()));
        }

        if &bytes[0..MAGIC.len()] != MAGIC {
            return Err(GtmError::InvalidModelFormat(
                "Invalid magic name".to_string(),
            ));
        }

        let version = read_i32(bytes, NAME_SIZE);
        let size = match version {
            VERSION_INTEGRAL_SCALE => HEADER_SIZE_V3,
            VERSION => HEADER_SIZE_V4,
            other => {
                return Err(GtmError::InvalidModelFormat(format!(
                    "Unsupported version {}",
                    other
                )))
            }
        };
        if bytes.len() < size {
            return Err(GtmError::InvalidModelFormat("Header too short".to_string()));
        }

        let input_count = read_count(bytes, NAME_SIZE + 4, "input count")?;
        let output_count = read_count(bytes, NAME_SIZE + 8, "output count")?;
        let basis_functions_per_axis = read_count(bytes, NAME_SIZE + 12, "basis count")?;
        let latent_samples_per_axis = read_count(bytes, NAME_SIZE + 16, "latent count")?;

        let (spacing_scale, rest) = if version == VERSION_INTEGRAL_SCALE {
            (read_i32(bytes, NAME_SIZE + 20) as f64, NAME_SIZE + 24)
        } else {
            (read_f64(bytes, NAME_SIZE + 20), NAME_SIZE + 28)
        };

        let latent_dimensions = read_count(bytes, rest, "latent dimensions")?;
        let data_dimensions = read_count(bytes, rest + 4, "data dimensions")?;
        let beta = if version == VERSION_INTEGRAL_SCALE {
            None
        } else {
            Some(read_f64(bytes, rest + 8))
        };

        Ok(Self {
            version,
            input_count,
            output_count,
            basis_functions_per_axis,
            latent_samples_per_axis,
            spacing_scale,
            latent_dimensions,
            data_dimensions,
            beta,
        })
    }
}

/// A model file read back from disk.
#[derive(Debug, Clone)]
pub struct StoredModel {
    /// File header.
    pub header: ModelHeader,
    /// Embedding, one node per row.
    pub embedding: DMatrix<f64>,
}

/// Model file reader and writer.
pub struct ModelFormat;

impl ModelFormat {
    /// Writes `model` as a version 4 file.
    pub fn write<P: AsRef<Path>>(path: P, model: &GtmModel) -> Result<()> {
        let config = &model.config().model;
        let embedding = model.embedding();

        let header = ModelHeader {
            version: VERSION,
            input_count: model.input().nrows(),
            output_count: embedding.nrows(),
            basis_functions_per_axis: config.basis_functions_per_axis,
            latent_samples_per_axis: config.latent_samples_per_axis,
            spacing_scale: config.spacing_scale,
            latent_dimensions: config.latent_dimensions,
            data_dimensions: embedding.ncols(),
            beta: Some(model.beta()),
        };

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&header.to_bytes()?)?;
        for row in embedding.row_iter() {
            for value in row.iter() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Reads a version 3 or version 4 file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<StoredModel> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parses a whole model file held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<StoredModel> {
        let header = ModelHeader::from_bytes(bytes)?;
        let rows = header.output_count;
        let cols = header.data_dimensions;
        let start = header.size();
        let expected = rows
            .checked_mul(cols)
            .and_then(|values| values.checked_mul(8))
            .and_then(|body| body.checked_add(start))
            .ok_or_else(|| {
                GtmError::InvalidModelFormat(format!(
                    "Embedding of {}x{} values is too large",
                    rows, cols
                ))
            })?;

        if bytes.len() != expected {
            return Err(GtmError::InvalidModelFormat(format!(
                "Expected {} bytes, found {}",
                expected,
                bytes.len()
            )));
        }

        let values: Vec<f64> = bytes[start..]
            .chunks_exact(8)
            .map(|chunk| read_f64(chunk, 0))
            .collect();

        Ok(StoredModel {
            header,
            embedding: DMatrix::from_row_slice(rows, cols, &values),
        })
    }
}

/// Writes one log-likelihood per line, then the total time in milliseconds.
pub fn write_log_likelihoods<P: AsRef<Path>>(
    path: P,
    log_likelihoods: &[f64],
    elapsed: Duration,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for llh in log_likelihoods {
        writeln!(writer, "{:.6}", llh)?;
    }
    write!(writer, "time: {:.6}ms", elapsed.as_secs_f64() * 1000.0)?;

    writer.flush()?;
    Ok(())
}
