// Segmenter running a U²-Net style salient-object model from an ONNX file.
// Inference uses tract, so no native runtime has to be installed next to the server.

use super::{SegmentationError, Segmenter};
use image::{GrayImage, Rgba, RgbImage, RgbaImage, imageops, imageops::FilterType};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info};

/// Side length of the square input the model expects.
pub const MODEL_INPUT_SIZE: usize = 320;

// ImageNet statistics the model was trained with.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

type SegmentationModel = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

#[derive(Debug)]
pub struct ModelError {
    path: PathBuf,
    details: String,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to load ONNX model from {:?}: {}", self.path, self.details)
    }
}

impl std::error::Error for ModelError {}

pub struct TractSegmenter {
    name: String,
    model: SegmentationModel,
}

impl TractSegmenter {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let started = Instant::now();

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    f32::fact([1, 3, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE]).into(),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ModelError {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());
        info!(
            "Loaded segmentation model '{}' from {:?} in {:?}",
            name,
            path,
            started.elapsed()
        );

        Ok(Self { name, model })
    }

    fn failed(&self, details: impl fmt::Display) -> SegmentationError {
        SegmentationError::Failed {
            segmenter: self.name.clone(),
            details: details.to_string(),
        }
    }
}

impl Segmenter for TractSegmenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn segment(&self, image: RgbImage) -> Result<RgbaImage, SegmentationError> {
        let started = Instant::now();
        let outputs = self
            .model
            .run(tvec![input_tensor(&image).into()])
            .map_err(|e| self.failed(e))?;
        debug!("Inference with '{}' took {:?}", self.name, started.elapsed());

        // The first output is the fused saliency map; the rest are side outputs.
        let prediction = outputs
            .into_iter()
            .next()
            .ok_or_else(|| SegmentationError::InvalidOutput("model produced no outputs".to_string()))?
            .into_arc_tensor();
        let view = prediction
            .to_array_view::<f32>()
            .map_err(|e| SegmentationError::InvalidOutput(e.to_string()))?;

        let (height, width) = match view.shape() {
            [leading @ .., height, width] if leading.iter().product::<usize>() == 1 => {
                (*height, *width)
            }
            shape => {
                return Err(SegmentationError::InvalidOutput(format!(
                    "expected a single-channel mask, got shape {:?}",
                    shape
                )));
            }
        };

        let values: Vec<f32> = view.iter().copied().collect();
        let mask = alpha_mask(&values, width, height, image.dimensions())?;
        Ok(apply_alpha(&image, &mask))
    }
}

/// Resize to the model input and normalize into an NCHW tensor.
fn input_tensor(image: &RgbImage) -> Tensor {
    let side = MODEL_INPUT_SIZE as u32;
    let resized = imageops::resize(image, side, side, FilterType::Lanczos3);
    let max = f32::from(resized.as_raw().iter().copied().max().unwrap_or(0).max(1));

    tract_ndarray::Array4::from_shape_fn(
        (1, 3, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE),
        |(_, c, y, x)| {
            let value = f32::from(resized.get_pixel(x as u32, y as u32)[c]) / max;
            (value - MEAN[c]) / STD[c]
        },
    )
    .into()
}

/// Stretch the raw prediction to 0..=255 and scale it to `size`.
fn alpha_mask(
    prediction: &[f32],
    width: usize,
    height: usize,
    size: (u32, u32),
) -> Result<GrayImage, SegmentationError> {
    let (min, max) = prediction
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    let range = if max - min > f32::EPSILON { max - min } else { 1.0 };

    let pixels: Vec<u8> = prediction
        .iter()
        .map(|&v| (((v - min) / range).clamp(0.0, 1.0) * 255.0) as u8)
        .collect();

    let invalid = || {
        SegmentationError::InvalidOutput(format!(
            "{} values do not form a {}x{} mask",
            prediction.len(),
            width,
            height
        ))
    };
    let width = u32::try_from(width).map_err(|_| invalid())?;
    let height = u32::try_from(height).map_err(|_| invalid())?;
    let mask = GrayImage::from_raw(width, height, pixels).ok_or_else(invalid)?;

    if mask.dimensions() == size {
        Ok(mask)
    } else {
        Ok(imageops::resize(&mask, size.0, size.1, FilterType::Lanczos3))
    }
}

fn apply_alpha(image: &RgbImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let alpha = mask.get_pixel(x, y)[0];
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let [r, g, b] = image.get_pixel(x, y).0;
        Rgba([r, g, b, alpha])
    })
}
