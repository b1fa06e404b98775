//! ONNX-backed recognizer.
//!
//! Loads an optimum-style encoder/decoder export (`encoder_model.onnx`,
//! `decoder_model.onnx`, `tokenizer.json`) and runs a greedy decode loop:
//! one encoder pass over the preprocessed image, then repeated decoder
//! passes extending the token sequence until EOS or the length cap.

use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::{Array2, Array3, Array4, s};
use ort::session::{Session, builder::GraphOptimizationLevel};
use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::registry::RegisteredModel;
use super::{Recognizer, RecognizerError};

/// Model input edge length. Images are aspect-fit onto a white canvas.
const INPUT_SIZE: u32 = 448;

/// Hard cap on generated tokens; formulas longer than this are cut off.
const MAX_DECODE_TOKENS: usize = 512;

/// Resident encoder/decoder model.
///
/// Sessions sit behind mutexes because ort requires exclusive access during
/// a run; contention never happens in practice since the job runner is the
/// only caller and enforces single-flight.
pub struct OnnxRecognizer {
    id: &'static str,
    tokenizer: Tokenizer,
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    bos_id: u32,
    eos_id: u32,
}

impl OnnxRecognizer {
    /// Load model files from `<models_dir>/<model.dir_name>/`.
    ///
    /// Blocking and slow; called once at startup. The registry has already
    /// verified the files exist.
    pub fn load(models_dir: &Path, model: &RegisteredModel) -> Result<Self, RecognizerError> {
        let dir = model.model_dir(models_dir);
        let threads = intra_threads();

        info!(model = model.id, dir = %dir.display(), threads, "loading recognizer");

        let encoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(dir.join("encoder_model.onnx"))?;
        let decoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(dir.join("decoder_model.onnx"))?;

        let tokenizer = Tokenizer::from_file(dir.join("tokenizer.json"))
            .map_err(|e| RecognizerError::Tokenizer(e.to_string()))?;

        let bos_id = tokenizer.token_to_id("<s>").unwrap_or(0);
        let eos_id = tokenizer.token_to_id("</s>").unwrap_or(2);

        Ok(Self {
            id: model.id,
            tokenizer,
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            bos_id,
            eos_id,
        })
    }
}

impl Recognizer for OnnxRecognizer {
    fn id(&self) -> &str {
        self.id
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognizerError> {
        let pixels = preprocess(image);

        // Single encoder pass; the hidden state is copied out so the session
        // lock is released before the decode loop starts.
        let hidden: Array3<f32> = {
            let mut encoder = self.encoder.lock();
            let outputs = encoder.run(ort::inputs!["pixel_values" => pixels.view()]?)?;
            outputs["last_hidden_state"]
                .try_extract_tensor::<f32>()?
                .to_owned()
                .into_dimensionality()
                .map_err(|e| RecognizerError::Decode(format!("encoder output shape: {e}")))?
        };

        let mut ids: Vec<i64> = vec![i64::from(self.bos_id)];
        let mut decoder = self.decoder.lock();

        loop {
            let input_ids = Array2::from_shape_vec((1, ids.len()), ids.clone())
                .map_err(|e| RecognizerError::Decode(format!("input ids shape: {e}")))?;

            let outputs = decoder.run(ort::inputs![
                "input_ids" => input_ids.view(),
                "encoder_hidden_states" => hidden.view(),
            ]?)?;
            let logits = outputs["logits"].try_extract_tensor::<f32>()?;

            let last = logits.slice(s![0, ids.len() - 1, ..]);
            let next = last
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i as u32)
                .ok_or_else(|| RecognizerError::Decode("empty logits".into()))?;

            if next == self.eos_id {
                break;
            }
            ids.push(i64::from(next));
            if ids.len() >= MAX_DECODE_TOKENS {
                debug!(tokens = ids.len(), "decode hit length cap");
                break;
            }
        }

        // Drop the leading BOS before detokenizing.
        let generated: Vec<u32> = ids[1..].iter().map(|&id| id as u32).collect();
        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| RecognizerError::Tokenizer(e.to_string()))?;

        Ok(text.trim().to_string())
    }
}

/// Grayscale, aspect-fit resize onto a white canvas, normalize to [-1, 1].
fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let luma = image.to_luma8();
    let (w, h) = luma.dimensions();

    let scale = f64::from(INPUT_SIZE) / f64::from(w.max(h).max(1));
    let new_w = ((f64::from(w) * scale) as u32).clamp(1, INPUT_SIZE);
    let new_h = ((f64::from(h) * scale) as u32).clamp(1, INPUT_SIZE);
    let resized = image::imageops::resize(&luma, new_w, new_h, FilterType::Triangle);

    let mut canvas =
        image::GrayImage::from_pixel(INPUT_SIZE, INPUT_SIZE, image::Luma([255u8]));
    let x = (INPUT_SIZE - new_w) / 2;
    let y = (INPUT_SIZE - new_h) / 2;
    image::imageops::replace(&mut canvas, &resized, i64::from(x), i64::from(y));

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 1, size, size));
    for (px, py, pixel) in canvas.enumerate_pixels() {
        tensor[[0, 0, py as usize, px as usize]] = (f32::from(pixel[0]) / 255.0 - 0.5) / 0.5;
    }
    tensor
}

/// Cap inference threads; the daemon shares the machine with the user's
/// actual work.
fn intra_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(4))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_shape_and_range() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            100,
            40,
            image::Luma([0u8]),
        ));
        let tensor = preprocess(&img);
        assert_eq!(tensor.shape(), &[1, 1, 448, 448]);
        assert!(tensor.iter().all(|&v| (-1.0..=1.0).contains(&v)));
        // White padding normalizes to 1.0 at the corners.
        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
    }

    #[test]
    fn preprocess_centers_content() {
        // A black 100x40 image lands centered vertically on the canvas.
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            100,
            40,
            image::Luma([0u8]),
        ));
        let tensor = preprocess(&img);
        assert_eq!(tensor[[0, 0, 224, 224]], -1.0);
    }

    #[test]
    fn intra_threads_is_bounded() {
        let threads = intra_threads();
        assert!((1..=4).contains(&threads));
    }
}
