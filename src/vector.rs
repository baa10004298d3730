use crate::error::{InputError, Result};

/// Class identifier attached to a sample: a digit `0..=9` or a character code.
pub type Label = u8;

/// A flattened grayscale raster, stored as `f64` intensities.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    pub fn new(values: Vec<f64>) -> Self {
        Sample { values }
    }

    /// Builds a sample from raw 8-bit pixels without rescaling them.
    pub fn from_pixels(pixels: &[u8]) -> Self {
        Sample {
            values: pixels.iter().map(|&p| p as f64).collect(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for Sample {
    fn from(values: Vec<f64>) -> Self {
        Sample::new(values)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabeledSample {
    pub label: Label,
    pub sample: Sample,
}

impl LabeledSample {
    pub fn new(label: Label, sample: Sample) -> Self {
        LabeledSample { label, sample }
    }
}

/// Distance between two equal-length vectors.
///
/// Implementations may assume the lengths already match; the classifier checks
/// them once up front instead of on every call.
pub trait DistanceCalculator: Send + Sync {
    fn calculate(&self, a: &[f64], b: &[f64]) -> f64;
}

/// Minkowski distance of integer order `p`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinkowskiDistance {
    p: u32,
}

impl MinkowskiDistance {
    pub fn new(p: u32) -> Result<Self> {
        if p == 0 {
            return Err(InputError::ZeroOrder);
        }
        Ok(MinkowskiDistance { p })
    }

    pub fn order(&self) -> u32 {
        self.p
    }
}

impl DistanceCalculator for MinkowskiDistance {
    fn calculate(&self, a: &[f64], b: &[f64]) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs());
        match self.p {
            1 => diffs.sum(),
            2 => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            p => {
                // Dividing by the largest difference keeps every term in [0, 1],
                // so d^p cannot overflow for large p.
                let largest = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y).abs())
                    .fold(0.0, f64::max);
                if largest == 0.0 {
                    return 0.0;
                }
                let sum: f64 = match i32::try_from(p) {
                    Ok(exp) => diffs.map(|d| (d / largest).powi(exp)).sum(),
                    Err(_) => diffs.map(|d| (d / largest).powf(p as f64)).sum(),
                };
                largest * sum.powf(1.0 / p as f64)
            }
        }
    }
}

/// Minkowski distance of order `p` between two samples.
///
/// ```
/// use knn_classify::{distance, Sample};
///
/// let a = Sample::new(vec![0.0, 0.0]);
/// let b = Sample::new(vec![3.0, 4.0]);
/// assert_eq!(7.0, distance(&a, &b, 1).unwrap());
/// assert_eq!(5.0, distance(&a, &b, 2).unwrap());
/// ```
pub fn distance(a: &Sample, b: &Sample, p: u32) -> Result<f64> {
    if a.len() != b.len() {
        return Err(InputError::LengthMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    let metric = MinkowskiDistance::new(p)?;
    Ok(metric.calculate(a.values(), b.values()))
}
