use crate::error::{InferenceError, ScoreError};
use crate::inference::Classifier;
use crate::models::{BorrowerFeatures, Outcome, Prediction, RawInput};

/// Round to three decimal places, half away from zero.
fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Parse the submitted fields, derive the feature vector and ask the
/// classifier for a verdict. Validation failures return before the
/// classifier is touched.
pub fn score(classifier: &dyn Classifier, input: &RawInput) -> Result<Prediction, ScoreError> {
    let features = BorrowerFeatures::derive(input)?;
    let rows = [features.to_array()];

    let labels = classifier.predict(&rows)?;
    let probabilities = classifier.predict_proba(&rows)?;

    let label = labels
        .first()
        .copied()
        .ok_or_else(|| InferenceError("classifier returned no label".to_owned()))?;
    let proba = probabilities
        .first()
        .ok_or_else(|| InferenceError("classifier returned no probabilities".to_owned()))?;

    Ok(Prediction {
        outcome: Outcome::from_label(label),
        probability: round3(proba[1]),
    })
}
