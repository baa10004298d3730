//! Reader and writer for the IDX files that hold image and label datasets.
//!
//! A label file is a big-endian `u32` magic (2049), a `u32` count and then
//! one byte per label. An image file is a magic (2051), a count, a row count
//! and a column count, followed by `count * rows * cols` pixel bytes stored
//! row-major.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::vector::{Label, LabeledSample, Sample};

pub const LABEL_MAGIC: u32 = 2049;
pub const IMAGE_MAGIC: u32 = 2051;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic number: expected {expected}, found {found}")]
    BadMagic { expected: u32, found: u32 },

    #[error("file ended after {read} of {expected} bytes")]
    Truncated { expected: usize, read: usize },

    #[error("{images} images but {labels} labels")]
    CountMismatch { images: usize, labels: usize },

    #[error("image dimensions must be non-zero, got {rows}x{cols}")]
    EmptyDimensions { rows: usize, cols: usize },

    #[error("{0} does not fit in an IDX file")]
    TooLarge(&'static str),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Images read from an IDX file, all `rows * cols` pixels long.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSet {
    pub rows: usize,
    pub cols: usize,
    pub images: Vec<Sample>,
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_magic<R: Read>(reader: &mut R, expected: u32) -> Result<()> {
    let found = read_u32(reader)?;
    if found != expected {
        return Err(DatasetError::BadMagic { expected, found });
    }
    Ok(())
}

fn read_body<R: Read>(reader: &mut R, expected: usize) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(expected.min(1 << 24));
    reader.take(expected as u64).read_to_end(&mut body)?;
    if body.len() < expected {
        return Err(DatasetError::Truncated {
            expected,
            read: body.len(),
        });
    }
    Ok(body)
}

pub fn parse_labels<R: Read>(reader: &mut R) -> Result<Vec<Label>> {
    read_magic(reader, LABEL_MAGIC)?;
    let count = read_u32(reader)? as usize;
    read_body(reader, count)
}

pub fn parse_images<R: Read>(reader: &mut R) -> Result<ImageSet> {
    read_magic(reader, IMAGE_MAGIC)?;
    let count = read_u32(reader)? as usize;
    let rows = read_u32(reader)? as usize;
    let cols = read_u32(reader)? as usize;
    if rows == 0 || cols == 0 {
        return Err(DatasetError::EmptyDimensions { rows, cols });
    }
    let pixels = rows
        .checked_mul(cols)
        .ok_or(DatasetError::TooLarge("image size"))?;
    let total = count
        .checked_mul(pixels)
        .ok_or(DatasetError::TooLarge("image data"))?;
    let body = read_body(reader, total)?;
    let images = body.chunks_exact(pixels).map(Sample::from_pixels).collect();
    Ok(ImageSet { rows, cols, images })
}

pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<Label>> {
    let path = path.as_ref();
    let labels = parse_labels(&mut BufReader::new(File::open(path)?))?;
    debug!("read {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

pub fn read_images<P: AsRef<Path>>(path: P) -> Result<ImageSet> {
    let path = path.as_ref();
    let set = parse_images(&mut BufReader::new(File::open(path)?))?;
    debug!(
        "read {} images of {}x{} from {}",
        set.images.len(),
        set.rows,
        set.cols,
        path.display()
    );
    Ok(set)
}

/// Pairs an image file with its label file.
pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(image_path: P, label_path: Q) -> Result<Vec<LabeledSample>> {
    let labels = read_labels(label_path)?;
    let set = read_images(image_path)?;
    if set.images.len() != labels.len() {
        return Err(DatasetError::CountMismatch {
            images: set.images.len(),
            labels: labels.len(),
        });
    }
    Ok(set
        .images
        .into_iter()
        .zip(labels)
        .map(|(sample, label)| LabeledSample::new(label, sample))
        .collect())
}

/// Keeps every `n`-th sample, starting with the first.
pub fn every_nth(samples: &[LabeledSample], n: usize) -> Vec<LabeledSample> {
    samples.iter().step_by(n.max(1)).cloned().collect()
}

fn header_field(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| DatasetError::TooLarge(what))
}

pub fn write_labels<P: AsRef<Path>>(path: P, labels: &[Label]) -> Result<()> {
    let count = header_field(labels.len(), "label count")?;
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&LABEL_MAGIC.to_be_bytes())?;
    out.write_all(&count.to_be_bytes())?;
    out.write_all(labels)?;
    out.flush()?;
    Ok(())
}

/// Writes raw pixel rasters; every image must hold `rows * cols` bytes.
pub fn write_images<P: AsRef<Path>>(path: P, rows: usize, cols: usize, images: &[Vec<u8>]) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(DatasetError::EmptyDimensions { rows, cols });
    }
    let fields = [
        IMAGE_MAGIC,
        header_field(images.len(), "image count")?,
        header_field(rows, "row count")?,
        header_field(cols, "column count")?,
    ];
    let mut out = BufWriter::new(File::create(path)?);
    for header in fields {
        out.write_all(&header.to_be_bytes())?;
    }
    for image in images {
        if image.len() != rows * cols {
            return Err(DatasetError::Truncated {
                expected: rows * cols,
                read: image.len(),
            });
        }
        out.write_all(image)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn images() -> Vec<Vec<u8>> {
        vec![vec![0, 1, 2, 3, 4, 5], vec![250, 251, 252, 253, 254, 255]]
    }

    #[test]
    fn load_pairs_images_with_labels() {
        let dir = tempdir().unwrap();
        let image_path = dir.path().join("train-images-idx3-ubyte");
        let label_path = dir.path().join("train-labels-idx1-ubyte");
        write_images(&image_path, 2, 3, &images()).unwrap();
        write_labels(&label_path, &[7, 3]).unwrap();

        let loaded = load(&image_path, &label_path).unwrap();
        assert_eq!(2, loaded.len());
        assert_eq!(7, loaded[0].label);
        assert_eq!(3, loaded[1].label);
        assert_eq!(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], loaded[0].sample.values());

        let set = read_images(&image_path).unwrap();
        assert_eq!((2, 3), (set.rows, set.cols));
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let dir = tempdir().unwrap();
        let image_path = dir.path().join("images");
        let label_path = dir.path().join("labels");
        write_images(&image_path, 2, 3, &images()).unwrap();
        write_labels(&label_path, &[1]).unwrap();
        assert!(matches!(
            load(&image_path, &label_path),
            Err(DatasetError::CountMismatch { images: 2, labels: 1 })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            parse_labels(&mut Cursor::new(bytes)),
            Err(DatasetError::BadMagic { expected: LABEL_MAGIC, found: IMAGE_MAGIC })
        ));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let mut bytes = Vec::new();
        for header in [IMAGE_MAGIC, 2, 2, 2] {
            bytes.extend_from_slice(&header.to_be_bytes());
        }
        bytes.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert!(matches!(
            parse_images(&mut Cursor::new(bytes)),
            Err(DatasetError::Truncated { expected: 8, read: 5 })
        ));
    }

    #[test]
    fn truncated_header_is_io_error() {
        let bytes = LABEL_MAGIC.to_be_bytes()[..2].to_vec();
        assert!(matches!(
            parse_labels(&mut Cursor::new(bytes)),
            Err(DatasetError::Io(_))
        ));
    }

    #[test]
    fn oversized_header_is_rejected() {
        let mut bytes = Vec::new();
        for header in [IMAGE_MAGIC, u32::MAX, u32::MAX, u32::MAX] {
            bytes.extend_from_slice(&header.to_be_bytes());
        }
        assert!(matches!(
            parse_images(&mut Cursor::new(bytes)),
            Err(DatasetError::TooLarge(_))
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn dimensions_beyond_u32_are_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("images");
        let too_wide = u32::MAX as usize + 1;
        assert!(matches!(
            write_images(&path, 1, too_wide, &[]),
            Err(DatasetError::TooLarge("column count"))
        ));
        assert!(matches!(
            write_images(&path, too_wide, 1, &[]),
            Err(DatasetError::TooLarge("row count"))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn every_nth_keeps_first_of_each_stride() {
        let samples: Vec<LabeledSample> = (0..7)
            .map(|i| LabeledSample::new(i, Sample::new(vec![i as f64])))
            .collect();
        let kept: Vec<Label> = every_nth(&samples, 3).iter().map(|s| s.label).collect();
        assert_eq!(vec![0, 3, 6], kept);
        assert_eq!(7, every_nth(&samples, 0).len());
    }
}
