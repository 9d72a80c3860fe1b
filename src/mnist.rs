use anyhow::{Context, Result, bail, ensure};
use flate2::read::GzDecoder;
use itertools::Itertools;
use ndarray::{Array1, Array3};
use std::fs::File;
use std::io::Read;
use std::path::Path;

// Magic numbers from the IDX file format: 2051 marks an image file (four
// 32-bit big-endian headers: magic, count, rows, columns), 2049 a label file
// (two headers: magic, count). Anything else means the wrong file was given.
const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;

// One split of the dataset, still in raw form: pixel intensities 0..=255 as
// a [count, rows, cols] array, one label byte per image. Normalization and
// resizing happen later in the preprocessor.
#[derive(Debug)]
pub struct RawSplit {
    pub images: Array3<f64>,
    pub labels: Array1<u8>,
}

impl RawSplit {
    pub fn len(&self) -> usize {
        self.images.dim().0
    }
}

pub struct MnistData {
    pub train: RawSplit,
    pub test: RawSplit,
}

// Load the four standard gzip-compressed IDX files from data_dir.
pub fn load(data_dir: &Path) -> Result<MnistData> {
    Ok(MnistData {
        train: load_split(data_dir, "train")?,
        test: load_split(data_dir, "t10k")?,
    })
}

// Load one image/label file pair. prefix is "train" or "t10k", matching the
// file names the dataset is distributed under.
pub fn load_split(data_dir: &Path, prefix: &str) -> Result<RawSplit> {
    let image_bytes = read_gz(&data_dir.join(format!("{prefix}-images-idx3-ubyte.gz")))?;
    let label_bytes = read_gz(&data_dir.join(format!("{prefix}-labels-idx1-ubyte.gz")))?;

    let header = image_bytes
        .get(..16)
        .with_context(|| format!("{prefix} image file shorter than its 16-byte header"))?;
    let (magic, count, rows, cols) = be_u32s(header)
        .collect_tuple()
        .with_context(|| format!("malformed {prefix} image header"))?;
    ensure!(
        magic == IMAGE_MAGIC,
        "{prefix} image file has magic number {magic}, expected {IMAGE_MAGIC}"
    );

    let header = label_bytes
        .get(..8)
        .with_context(|| format!("{prefix} label file shorter than its 8-byte header"))?;
    let (label_magic, label_count) = be_u32s(header)
        .collect_tuple()
        .with_context(|| format!("malformed {prefix} label header"))?;
    ensure!(
        label_magic == LABEL_MAGIC,
        "{prefix} label file has magic number {label_magic}, expected {LABEL_MAGIC}"
    );

    // The two files describe the same examples, so their counts must agree.
    ensure!(
        count == label_count,
        "{prefix} split has {count} images but {label_count} labels"
    );

    let (count, rows, cols) = (count as usize, rows as usize, cols as usize);
    let pixels = &image_bytes[16..];
    ensure!(
        pixels.len() == count * rows * cols,
        "{prefix} image payload is {} bytes, header promises {} ({count} images of {rows}x{cols})",
        pixels.len(),
        count * rows * cols
    );
    let labels = &label_bytes[8..];
    ensure!(
        labels.len() == count,
        "{prefix} label payload is {} bytes, header promises {count}",
        labels.len()
    );
    if let Some(&bad) = labels.iter().find(|&&label| label > 9) {
        bail!("{prefix} split contains label {bad}, expected digits 0-9");
    }

    let images = Array3::from_shape_vec(
        (count, rows, cols),
        pixels.iter().map(|&p| f64::from(p)).collect(),
    )?;
    Ok(RawSplit {
        images,
        labels: Array1::from_vec(labels.to_vec()),
    })
}

fn read_gz(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .with_context(|| format!("decompressing {}", path.display()))?;
    Ok(bytes)
}

fn be_u32s(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()))
}
