use crate::mnist::RawSplit;
use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};

// A split after preprocessing: flattened normalized inputs, one row per
// example, with one-hot targets for training and the plain labels for
// accuracy checks.
pub struct Dataset {
    pub inputs: Array2<f64>,
    pub targets: Array2<f64>,
    pub labels: Array1<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.inputs.dim().0
    }
}

// Run the full preprocessing chain on a raw split: normalize intensities,
// resize each image to side x side, flatten to vectors, one-hot the labels.
pub fn prepare(raw: &RawSplit, side: usize, classes: usize) -> Result<Dataset> {
    let inputs = flatten(resize(&normalize(&raw.images), side))?;
    Ok(Dataset {
        inputs,
        targets: one_hot(&raw.labels, classes),
        labels: raw.labels.clone(),
    })
}

// Map raw intensities [0, 255] onto the centered range [-0.5, 0.5].
pub fn normalize(images: &Array3<f64>) -> Array3<f64> {
    images.mapv(|p| p / 255.0 - 0.5)
}

// Bilinear resize of every image in the stack to side x side. Sample points
// sit at half-pixel centers, so resizing to the source resolution returns the
// image unchanged.
pub fn resize(images: &Array3<f64>, side: usize) -> Array3<f64> {
    let (count, rows, cols) = images.dim();
    let row_scale = rows as f64 / side as f64;
    let col_scale = cols as f64 / side as f64;
    Array3::from_shape_fn((count, side, side), |(i, y, x)| {
        let src_y = ((y as f64 + 0.5) * row_scale - 0.5).clamp(0.0, (rows - 1) as f64);
        let src_x = ((x as f64 + 0.5) * col_scale - 0.5).clamp(0.0, (cols - 1) as f64);
        sample(images.index_axis(Axis(0), i), src_y, src_x)
    })
}

// Interpolate between the four pixels surrounding (y, x).
fn sample(image: ArrayView2<f64>, y: f64, x: f64) -> f64 {
    let (rows, cols) = image.dim();
    let y0 = y.floor() as usize;
    let x0 = x.floor() as usize;
    let y1 = (y0 + 1).min(rows - 1);
    let x1 = (x0 + 1).min(cols - 1);
    let fy = y - y0 as f64;
    let fx = x - x0 as f64;

    image[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
        + image[[y0, x1]] * fx * (1.0 - fy)
        + image[[y1, x0]] * (1.0 - fx) * fy
        + image[[y1, x1]] * fx * fy
}

// Collapse the two spatial axes into one vector per image, row-major.
pub fn flatten(images: Array3<f64>) -> Result<Array2<f64>> {
    let (count, rows, cols) = images.dim();
    images
        .into_shape_with_order((count, rows * cols))
        .context("flattening image stack")
}

// Turn each label into a length-`classes` vector with a single 1.0 at the
// label's index.
pub fn one_hot(labels: &Array1<u8>, classes: usize) -> Array2<f64> {
    Array2::from_shape_fn((labels.len(), classes), |(i, class)| {
        if usize::from(labels[i]) == class {
            1.0
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn normalize_maps_the_intensity_range() {
        let images = Array3::from_shape_vec((1, 2, 2), vec![0.0, 255.0, 127.5, 51.0]).unwrap();
        let normalized = normalize(&images);
        assert_eq!(normalized[[0, 0, 0]], -0.5);
        assert_eq!(normalized[[0, 0, 1]], 0.5);
        assert!((normalized[[0, 1, 0]]).abs() < 1e-12);
        assert!((normalized[[0, 1, 1]] - (-0.3)).abs() < 1e-12);
    }

    #[test]
    fn resize_to_source_resolution_is_identity() {
        let images = Array3::from_shape_fn((2, 4, 4), |(i, y, x)| (i * 16 + y * 4 + x) as f64);
        let resized = resize(&images, 4);
        assert_eq!(resized, images);
    }

    #[test]
    fn resize_keeps_constant_images_constant() {
        let images = Array3::from_elem((1, 28, 28), 3.25);
        let resized = resize(&images, 16);
        assert_eq!(resized.dim(), (1, 16, 16));
        for &value in resized.iter() {
            assert!((value - 3.25).abs() < 1e-12);
        }
    }

    #[test]
    fn resize_preserves_a_horizontal_ramp_ordering() {
        let images = Array3::from_shape_fn((1, 28, 28), |(_, _, x)| x as f64);
        let resized = resize(&images, 16);
        for y in 0..16 {
            for x in 1..16 {
                assert!(resized[[0, y, x]] > resized[[0, y, x - 1]]);
            }
        }
    }

    #[test]
    fn flatten_is_row_major() {
        let images = Array3::from_shape_vec((1, 2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let flat = flatten(images).unwrap();
        assert_eq!(flat, array![[1.0, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn one_hot_sets_exactly_the_label_index() {
        let labels = Array1::from_vec(vec![0u8, 9, 4]);
        let encoded = one_hot(&labels, 10);
        assert_eq!(encoded.dim(), (3, 10));
        for (row, &label) in encoded.rows().into_iter().zip(labels.iter()) {
            assert_eq!(row.sum(), 1.0);
            assert_eq!(row[usize::from(label)], 1.0);
        }
    }

    #[test]
    fn prepare_produces_flat_centered_inputs() {
        let raw = RawSplit {
            images: Array3::from_shape_fn((3, 28, 28), |(i, y, x)| {
                ((i + y * 28 + x) % 256) as f64
            }),
            labels: Array1::from_vec(vec![1u8, 2, 3]),
        };
        let dataset = prepare(&raw, 16, 10).unwrap();
        assert_eq!(dataset.inputs.dim(), (3, 256));
        assert_eq!(dataset.targets.dim(), (3, 10));
        assert_eq!(dataset.len(), 3);
        for &value in dataset.inputs.iter() {
            assert!((-0.5..=0.5).contains(&value));
        }
    }
}
