//! Input data: the sine-curve demonstration set and the text data file.
//!
//! ## Data file layout
//!
//! Whitespace-separated text:
//!
//! ```text
//! <name> <version>
//! <input count> <output count>
//! <basis functions per axis> <latent samples per axis> <spacing scale>
//! <latent dimensions> <data dimensions>
//! <rows> <columns>
//! <rows * columns values, row-major>
//! ```

use crate::config::GtmConfig;
use crate::error::{GtmError, Result};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::fs;
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

/// Number of points in [`sine_curve`].
pub const SINE_CURVE_POINTS: usize = 59;

/// First x coordinate of the sine curve.
const SINE_CURVE_START: f64 = 0.15;

/// Spacing of x along the sine curve.
const SINE_CURVE_STEP: f64 = 0.05;

#[inline]
fn sine_curve_y(x: f64) -> f64 {
    x + 1.25 * (2.0 * x).sin()
}

/// The 2-D demonstration curve: `x = 0.15, 0.20, ..., 3.05`, `y = x + 1.25·sin(2x)`.
pub fn sine_curve() -> DMatrix<f64> {
    DMatrix::from_fn(SINE_CURVE_POINTS, 2, |i, j| {
        let x = SINE_CURVE_START + SINE_CURVE_STEP * i as f64;
        if j == 0 {
            x
        } else {
            sine_curve_y(x)
        }
    })
}

/// `points` samples of the sine curve over the same x range, with Gaussian
/// noise of standard deviation `noise_std` added to y.
///
/// A `seed` makes the output reproducible.
pub fn noisy_sine_curve(points: usize, noise_std: f64, seed: Option<u64>) -> Result<DMatrix<f64>> {
    if points < 2 {
        return Err(GtmError::InvalidArgument(format!(
            "Noisy sine curve needs at least 2 points, got {}",
            points
        )));
    }
    // Normal::new only rejects non-finite deviations.
    if noise_std.is_nan() || noise_std < 0.0 {
        return Err(GtmError::InvalidArgument(format!(
            "Noise deviation must be non-negative, got {}",
            noise_std
        )));
    }
    let normal = Normal::new(0.0, noise_std)
        .map_err(|e| GtmError::InvalidArgument(format!("Noise deviation {}: {}", noise_std, e)))?;

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let span = SINE_CURVE_STEP * (SINE_CURVE_POINTS - 1) as f64;
    let step = span / (points - 1) as f64;

    let mut data = DMatrix::zeros(points, 2);
    for i in 0..points {
        let x = SINE_CURVE_START + step * i as f64;
        data[(i, 0)] = x;
        data[(i, 1)] = sine_curve_y(x) + normal.sample(&mut rng);
    }

    Ok(data)
}

/// Contents of a text data file.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    /// Data set name.
    pub name: String,
    /// File version.
    pub version: i32,
    /// Input count recorded in the file.
    pub input_count: usize,
    /// Output count recorded in the file.
    pub output_count: usize,
    /// Model shape stored with the data.
    pub config: GtmConfig,
    /// Points, one per row.
    pub points: DMatrix<f64>,
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl Tokens<'_> {
    fn next<T: FromStr>(&mut self, field: &str) -> Result<T> {
        let token = self
            .inner
            .next()
            .ok_or_else(|| GtmError::InvalidDataFile(format!("Missing {}", field)))?;
        token
            .parse()
            .map_err(|_| GtmError::InvalidDataFile(format!("Bad {}: {:?}", field, token)))
    }
}

impl DataFile {
    /// Reads and parses a data file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses the text layout described in the module docs.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = Tokens {
            inner: text.split_whitespace(),
        };

        let name: String = tokens.next("name")?;
        let version = tokens.next("version")?;
        let input_count = tokens.next("input count")?;
        let output_count = tokens.next("output count")?;
        let basis_functions_per_axis = tokens.next("basis functions per axis")?;
        let latent_samples_per_axis = tokens.next("latent samples per axis")?;
        let spacing_scale = tokens.next("spacing scale")?;
        let latent_dimensions = tokens.next("latent dimensions")?;
        let data_dimensions: usize = tokens.next("data dimensions")?;
        let rows: usize = tokens.next("row count")?;
        let cols: usize = tokens.next("column count")?;

        if cols != data_dimensions {
            return Err(GtmError::InvalidDataFile(format!(
                "Data dimensions {} do not match column count {}",
                data_dimensions, cols
            )));
        }

        let count = rows.checked_mul(cols).ok_or_else(|| {
            GtmError::InvalidDataFile(format!("{} rows of {} values overflow", rows, cols))
        })?;

        // The header counts are untrusted, so the buffer grows as values arrive.
        let mut values = Vec::new();
        for _ in 0..count {
            values.push(tokens.next::<f64>("data value")?);
        }
        if tokens.inner.next().is_some() {
            return Err(GtmError::InvalidDataFile(format!(
                "More than {} values present",
                count
            )));
        }

        Ok(Self {
            name,
            version,
            input_count,
            output_count,
            config: GtmConfig {
                latent_dimensions,
                latent_samples_per_axis,
                basis_functions_per_axis,
                spacing_scale,
                ..Default::default()
            },
            points: DMatrix::from_row_slice(rows, cols, &values),
        })
    }

    /// Renders the file text.
    pub fn to_text(&self) -> String {
        let mut text = format!(
            "{} {}\n{} {}\n{} {} {}\n{} {}\n{} {}\n",
            self.name,
            self.version,
            self.input_count,
            self.output_count,
            self.config.basis_functions_per_axis,
            self.config.latent_samples_per_axis,
            self.config.spacing_scale,
            self.config.latent_dimensions,
            self.points.ncols(),
            self.points.nrows(),
            self.points.ncols()
        );
        for row in self.points.row_iter() {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            text.push_str(&line.join(" "));
            text.push('\n');
        }
        text
    }

    /// Writes the file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }
}
