//! Per-pixel transformations applied to raw 8-bit rasters before they become
//! samples. Each returns a new buffer and leaves its input untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vector::{LabeledSample, Sample};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("bit depth must be between 1 and 8, got {0}")]
    BitDepth(u32),

    #[error("divisor must be non-zero")]
    ZeroDivisor,
}

/// Reduces pixels to `bit_depth` bits of intensity while keeping the 0..=255
/// range, e.g. a depth of 4 leaves 16 distinct levels.
pub fn quantize(pixels: &[u8], bit_depth: u32) -> Result<Vec<u8>, PreprocessError> {
    if !(1..=8).contains(&bit_depth) {
        return Err(PreprocessError::BitDepth(bit_depth));
    }
    let max_value = (1u32 << bit_depth) - 1;
    let factor = (255 / max_value) as u8;
    Ok(pixels.iter().map(|&p| p / factor * factor).collect())
}

/// Maps each pixel to the centre of its `div`-wide bucket.
pub fn color_reduce(pixels: &[u8], div: u8) -> Result<Vec<u8>, PreprocessError> {
    if div == 0 {
        return Err(PreprocessError::ZeroDivisor);
    }
    Ok(pixels
        .iter()
        .map(|&p| (p as u16 / div as u16 * div as u16 + div as u16 / 2).min(255) as u8)
        .collect())
}

/// Scales pixels into `[0, 1]`.
pub fn normalize(pixels: &[u8]) -> Sample {
    Sample::new(pixels.iter().map(|&p| p as f64 / 255.0).collect())
}

/// Same as [`normalize`] for a sample already holding 0..=255 intensities.
pub fn normalize_sample(sample: &Sample) -> Sample {
    Sample::new(sample.values().iter().map(|v| v / 255.0).collect())
}

/// Steps applied to every training and test sample, in field order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocessing {
    /// Bit depth passed to [`quantize`].
    pub quantize_bits: Option<u32>,
    /// Bucket width passed to [`color_reduce`].
    pub color_reduce: Option<u8>,
    /// Scale the result into `[0, 1]`.
    pub normalize: bool,
}

impl Preprocessing {
    pub fn validate(&self) -> Result<(), PreprocessError> {
        if let Some(bits) = self.quantize_bits {
            if !(1..=8).contains(&bits) {
                return Err(PreprocessError::BitDepth(bits));
            }
        }
        if self.color_reduce == Some(0) {
            return Err(PreprocessError::ZeroDivisor);
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.quantize_bits.is_none() && self.color_reduce.is_none() && !self.normalize
    }

    pub fn apply(&self, sample: &Sample) -> Result<Sample, PreprocessError> {
        let mut out = if self.quantize_bits.is_some() || self.color_reduce.is_some() {
            // Pixel steps work on bytes; values outside 0..=255 saturate.
            let mut pixels: Vec<u8> = sample
                .values()
                .iter()
                .map(|v| v.round().clamp(0.0, 255.0) as u8)
                .collect();
            if let Some(bits) = self.quantize_bits {
                pixels = quantize(&pixels, bits)?;
            }
            if let Some(div) = self.color_reduce {
                pixels = color_reduce(&pixels, div)?;
            }
            Sample::from_pixels(&pixels)
        } else {
            sample.clone()
        };
        if self.normalize {
            out = normalize_sample(&out);
        }
        Ok(out)
    }

    pub fn apply_all(&self, samples: Vec<LabeledSample>) -> Result<Vec<LabeledSample>, PreprocessError> {
        if self.is_identity() {
            return Ok(samples);
        }
        samples
            .iter()
            .map(|s| Ok(LabeledSample::new(s.label, self.apply(&s.sample)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_to_four_bits() {
        // factor 17
        assert_eq!(vec![0, 0, 17, 238, 255], quantize(&[0, 16, 17, 250, 255], 4).unwrap());
    }

    #[test]
    fn quantize_extremes() {
        assert_eq!(vec![0, 0, 255], quantize(&[0, 254, 255], 1).unwrap());
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(all, quantize(&all, 8).unwrap());
        assert_eq!(Err(PreprocessError::BitDepth(0)), quantize(&all, 0));
        assert_eq!(Err(PreprocessError::BitDepth(9)), quantize(&all, 9));
    }

    #[test]
    fn color_reduce_centres_buckets() {
        assert_eq!(vec![32, 32, 96, 224], color_reduce(&[0, 63, 64, 255], 64).unwrap());
        assert_eq!(vec![0, 200], color_reduce(&[0, 200], 1).unwrap());
        assert_eq!(Err(PreprocessError::ZeroDivisor), color_reduce(&[1], 0));
    }

    #[test]
    fn input_is_left_untouched() {
        let pixels = vec![10, 20, 30];
        let _ = quantize(&pixels, 2).unwrap();
        let _ = color_reduce(&pixels, 8).unwrap();
        assert_eq!(vec![10, 20, 30], pixels);
    }

    #[test]
    fn pipeline_runs_steps_in_order() {
        let steps = Preprocessing {
            quantize_bits: Some(4),
            color_reduce: Some(64),
            normalize: false,
        };
        // 250 -> 238 -> 224, 16 -> 0 -> 32
        let sample = Sample::from_pixels(&[250, 16]);
        assert_eq!(&[224.0, 32.0], steps.apply(&sample).unwrap().values());

        let scaled = Preprocessing {
            normalize: true,
            ..steps
        };
        assert_eq!(&[224.0 / 255.0, 32.0 / 255.0], scaled.apply(&sample).unwrap().values());
    }

    #[test]
    fn pipeline_validates_parameters() {
        assert!(Preprocessing::default().validate().is_ok());
        assert!(Preprocessing::default().is_identity());
        let bad_bits = Preprocessing {
            quantize_bits: Some(9),
            ..Preprocessing::default()
        };
        assert_eq!(Err(PreprocessError::BitDepth(9)), bad_bits.validate());
        let bad_div = Preprocessing {
            color_reduce: Some(0),
            ..Preprocessing::default()
        };
        assert_eq!(Err(PreprocessError::ZeroDivisor), bad_div.validate());
        assert_eq!(
            Err(PreprocessError::ZeroDivisor),
            bad_div.apply(&Sample::from_pixels(&[1]))
        );
    }

    #[test]
    fn pipeline_keeps_labels_and_saturates_values() {
        let steps = Preprocessing {
            color_reduce: Some(1),
            ..Preprocessing::default()
        };
        let samples = vec![LabeledSample::new(b'Q', Sample::new(vec![-4.0, 300.0, 7.4]))];
        let out = steps.apply_all(samples).unwrap();
        assert_eq!(b'Q', out[0].label);
        assert_eq!(&[0.0, 255.0, 7.0], out[0].sample.values());
    }

    #[test]
    fn normalize_scales_to_unit_range() {
        assert_eq!(&[0.0, 1.0], normalize(&[0, 255]).values());
        let sample = Sample::from_pixels(&[0, 51, 255]);
        assert_eq!(&[0.0, 0.2, 1.0], normalize_sample(&sample).values());
    }
}
