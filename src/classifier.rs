//! Face classifier: a tract-onnx inference plan plus the fixed label set.
//!
//! The model is loaded once at startup and shared read-only across request
//! handlers, so `predict` takes `&self` and needs no locking.

use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, RgbaImage};
use ndarray::Array4;
use tract_onnx::prelude::*;

/// Classes the trained weights predict, in training order. The strings must
/// stay byte-for-byte what the model was trained against (typos included).
pub const LABELS: [&str; 15] = [
    "Abraham Lincoln",
    "Adolf Hitler",
    "Barack Obama",
    "Condoleezza Rice",
    "Dick Cheny",
    "Donald Trump",
    "George HW Bush",
    "George W Bush",
    "Hillary Clinton",
    "Jimmy Carter",
    "John F Kennedy",
    "Martin Luther King",
    "Nancy Pelosi",
    "Richard Nixon",
    "Ronald Regan",
];

/// Model input is a square RGB image of this side length.
const INPUT_SIZE: u32 = 224;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

type Plan = TypedRunnableModel<TypedModel>;

pub struct Classifier {
    plan: Plan,
    labels: &'static [&'static str],
}

/// Top predicted class for one image.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: &'static str,
    /// Confidence as a percentage in `[0, 100]`, rounded to two decimals.
    pub confidence: f32,
}

impl Classifier {
    /// Loads the ONNX weights and builds an optimized inference plan.
    ///
    /// Fails if the file is missing or corrupt, or if the model's output
    /// dimension does not match the compiled-in label set.
    pub fn load(path: &Path) -> Result<Self> {
        let size = INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to read ONNX model from {}", path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )?
            .into_optimized()
            .context("failed to optimize ONNX model")?;

        let classes = output_classes(&model)?;
        if classes != LABELS.len() {
            anyhow::bail!(
                "model predicts {} classes but {} labels are configured",
                classes,
                LABELS.len()
            );
        }

        let plan = model
            .into_runnable()
            .context("failed to build inference plan")?;

        Ok(Self {
            plan,
            labels: &LABELS,
        })
    }

    /// Decodes an uploaded image and returns the top predicted class.
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction> {
        let img = image::load_from_memory(image_bytes).context("failed to decode image")?;
        let input = to_input_tensor(&letterbox(&img));

        let size = INPUT_SIZE as usize;
        let tensor = tract_ndarray::Array4::from_shape_vec((1, 3, size, size), input.into_raw_vec())
            .context("input tensor shape mismatch")?
            .into_tensor();

        let result = self.plan.run(tvec!(tensor.into())).context("inference failed")?;
        let scores: Vec<f32> = result[0].to_array_view::<f32>()?.iter().copied().collect();
        let probs = softmax(&scores);

        let (label, prob) = self
            .labels
            .iter()
            .zip(probs.iter())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(label, prob)| (*label, *prob))
            .context("model produced no scores")?;

        let prediction = Prediction {
            label,
            confidence: to_percent(prob),
        };
        log::debug!("predicted {} ({:.2}%)", prediction.label, prediction.confidence);
        Ok(prediction)
    }
}

/// Scales `(width, height)` so the longer side becomes `INPUT_SIZE`,
/// preserving aspect ratio. Dimensions never round down to zero.
fn fit_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width > height {
        (INPUT_SIZE, ((INPUT_SIZE * height) / width).max(1))
    } else {
        (((INPUT_SIZE * width) / height).max(1), INPUT_SIZE)
    }
}

/// Resizes the image to fit `INPUT_SIZE` and pads it to a centered square.
fn letterbox(img: &DynamicImage) -> RgbaImage {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = fit_dimensions(width, height);
    let resized = img.resize(new_width, new_height, image::imageops::FilterType::Triangle);

    let mut canvas = RgbaImage::new(INPUT_SIZE, INPUT_SIZE);
    let (resized_width, resized_height) = resized.dimensions();
    let pad_x = (INPUT_SIZE - resized_width) / 2;
    let pad_y = (INPUT_SIZE - resized_height) / 2;

    for y in 0..resized_height {
        for x in 0..resized_width {
            let pixel = resized.get_pixel(x, y);
            canvas.put_pixel(
                x + pad_x,
                y + pad_y,
                image::Rgba([pixel[0], pixel[1], pixel[2], 255]),
            );
        }
    }

    canvas
}

/// Converts a letterboxed image to a normalized NCHW tensor.
fn to_input_tensor(img: &RgbaImage) -> Array4<f32> {
    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));
    for y in 0..INPUT_SIZE {
        for x in 0..INPUT_SIZE {
            let pixel = img.get_pixel(x, y);
            for c in 0..3 {
                let value = (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }
    }
    tensor
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Probability to percentage, rounded to two decimals.
fn to_percent(prob: f32) -> f32 {
    (prob * 100.0 * 100.0).round() / 100.0
}

/// Number of classes in the model's (static) output shape.
fn output_classes(model: &TypedModel) -> Result<usize> {
    let fact = model.output_fact(0)?;
    let shape = fact
        .shape
        .as_concrete()
        .context("model output shape is not static")?;
    shape
        .last()
        .copied()
        .context("model output has no dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_set_is_fixed() {
        assert_eq!(LABELS.len(), 15);
        assert_eq!(LABELS[0], "Abraham Lincoln");
        assert_eq!(LABELS[14], "Ronald Regan");
    }

    #[test]
    fn fit_dimensions_preserves_aspect_ratio() {
        assert_eq!(fit_dimensions(224, 224), (224, 224));
        assert_eq!(fit_dimensions(448, 224), (224, 112));
        assert_eq!(fit_dimensions(224, 448), (112, 224));
        assert_eq!(fit_dimensions(100, 100), (224, 224));
    }

    #[test]
    fn fit_dimensions_never_collapses_to_zero() {
        assert_eq!(fit_dimensions(1000, 1), (224, 1));
        assert_eq!(fit_dimensions(1, 1000), (1, 224));
    }

    #[test]
    fn letterbox_pads_to_centered_square() {
        let mut img = RgbaImage::new(100, 50);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgba([200, 10, 10, 255]);
        }
        let boxed = letterbox(&DynamicImage::ImageRgba8(img));

        assert_eq!(boxed.dimensions(), (224, 224));
        // Center lands inside the resized content, corners in the padding.
        let center = boxed.get_pixel(112, 112);
        assert!(center[0] > 150);
        let corner = boxed.get_pixel(0, 0);
        assert_eq!(corner[0], 0);
        assert_eq!(corner[1], 0);
        assert_eq!(corner[2], 0);
    }

    #[test]
    fn input_tensor_applies_imagenet_normalization() {
        let mut img = RgbaImage::new(224, 224);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgba([128, 128, 128, 255]);
        }
        let tensor = to_input_tensor(&img);

        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        for c in 0..3 {
            let expected = (128.0 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            let got = tensor[[0, c, 100, 100]];
            assert!((got - expected).abs() < 1e-6, "channel {c}: {got} vs {expected}");
        }
    }

    #[test]
    fn softmax_sums_to_one_and_keeps_argmax() {
        let probs = softmax(&[1.0, 3.0, 0.5, 2.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);

        let argmax = probs
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i);
        assert_eq!(argmax, Some(1));
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn percent_is_rounded_to_two_decimals() {
        assert_eq!(to_percent(0.87654), 87.65);
        assert_eq!(to_percent(1.0), 100.0);
        assert_eq!(to_percent(0.0), 0.0);
    }
}
