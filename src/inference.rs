use std::io::Cursor;

use log::info;
use serde::Serialize;
use tract_onnx::prelude::*;

use crate::error::InferenceError;
use crate::models::{FeatureVector, FEATURE_COUNT};

/// Binary classifier contract. `predict` yields one 0/1 label per row and
/// `predict_proba` one `[p_no_default, p_default]` pair per row; both are
/// read-only and safe to call from any worker thread.
pub trait Classifier: Send + Sync {
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<u8>, InferenceError>;

    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<[f32; 2]>, InferenceError>;

    fn info(&self) -> ModelInfo;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Pre-trained default-risk model executed with tract.
pub struct OnnxClassifier {
    model: OnnxPlan,
    pub threshold: f32,
}

impl OnnxClassifier {
    /// Compile a serialized ONNX graph into a runnable plan. The model takes
    /// a single `[1, 10]` f32 row and emits the positive-class logit.
    pub fn from_bytes(bytes: &[u8], threshold: f32) -> TractResult<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut Cursor::new(bytes))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { model, threshold })
    }

    fn positive_probability(&self, features: &FeatureVector) -> TractResult<f32> {
        let input_tensor = Tensor::from_shape(&[1, FEATURE_COUNT], features)?;
        let outputs = self.model.run(tvec!(input_tensor.into()))?;

        let logit: f32 = *outputs[0]
            .to_array_view::<f32>()?
            .iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("model produced no output"))?;

        Ok(1.0 / (1.0 + (-logit).exp())) // sigmoid
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<u8>, InferenceError> {
        rows.iter()
            .map(|row| {
                self.positive_probability(row)
                    .map(|p| u8::from(p >= self.threshold))
                    .map_err(|e| InferenceError(e.to_string()))
            })
            .collect()
    }

    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<[f32; 2]>, InferenceError> {
        rows.iter()
            .map(|row| {
                self.positive_probability(row)
                    .map(|p| [1.0 - p, p])
                    .map_err(|e| InferenceError(e.to_string()))
            })
            .collect()
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            input_shape: vec![1, FEATURE_COUNT as i32],
            threshold: self.threshold,
            version: "1.0.0".to_owned(),
            features: vec![
                "LIMIT_BAL".to_owned(),
                "SEX".to_owned(),
                "EDUCATION".to_owned(),
                "MARRIAGE".to_owned(),
                "AGE".to_owned(),
                "TOTAL_BILL_AMT".to_owned(),
                "TOTAL_PAY_AMT".to_owned(),
                "AVG_BILL_AMT".to_owned(),
                "AVG_PAY_AMT".to_owned(),
                "UTILIZATION_RATIO".to_owned(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub input_shape: Vec<i32>,
    pub threshold: f32,
    pub version: String,
    pub features: Vec<String>,
}

/// Download the serialized model from its published location.
pub async fn fetch_model_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;
    info!("fetched model: {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Fetch and compile the model once at startup. The caller decides what to
/// do when this fails; the classifier itself is never reloaded or retried.
pub async fn load_remote(url: &str, threshold: f32) -> anyhow::Result<OnnxClassifier> {
    let bytes = fetch_model_bytes(url).await?;
    OnnxClassifier::from_bytes(&bytes, threshold)
}
