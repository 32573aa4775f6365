use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of columns the classifier was trained on.
pub const FEATURE_COUNT: usize = 10;

/// One row of model input, in training column order.
pub type FeatureVector = [f32; FEATURE_COUNT];

/// Raw form submission. Every value arrives as an untrusted string; `None`
/// means the key was absent from the request body entirely.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawInput {
    #[serde(rename = "LIMIT_BAL")]
    pub limit_bal: Option<String>,
    #[serde(rename = "SEX")]
    pub sex: Option<String>,
    #[serde(rename = "EDUCATION")]
    pub education: Option<String>,
    #[serde(rename = "MARRIAGE")]
    pub marriage: Option<String>,
    #[serde(rename = "AGE")]
    pub age: Option<String>,
    #[serde(rename = "TOTAL_BILL_AMT")]
    pub total_bill_amt: Option<String>,
    #[serde(rename = "TOTAL_PAY_AMT")]
    pub total_pay_amt: Option<String>,
}

/// Parsed borrower attributes plus the three derived ratio features.
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowerFeatures {
    pub limit_bal: f32,
    pub sex: f32,
    pub education: f32,
    pub marriage: f32,
    pub age: f32,
    pub total_bill_amt: f32,
    pub total_pay_amt: f32,
    pub avg_bill_amt: f32,
    pub avg_pay_amt: f32,
    pub utilization_ratio: f32,
}

impl BorrowerFeatures {
    /// Parse the seven submitted fields and compute the derived features.
    ///
    /// `LIMIT_BAL`, `TOTAL_BILL_AMT` and `TOTAL_PAY_AMT` are floats; `SEX`,
    /// `EDUCATION`, `MARRIAGE` and `AGE` are integers. The averages are over
    /// the six statement months in the training data. Only non-positive
    /// denominators are guarded: a negative bill total with a positive limit
    /// yields a negative utilization ratio.
    pub fn derive(input: &RawInput) -> Result<Self, ValidationError> {
        let limit_bal = parse_float("LIMIT_BAL", &input.limit_bal)?;
        let sex = parse_int("SEX", &input.sex)?;
        let education = parse_int("EDUCATION", &input.education)?;
        let marriage = parse_int("MARRIAGE", &input.marriage)?;
        let age = parse_int("AGE", &input.age)?;
        let total_bill_amt = parse_float("TOTAL_BILL_AMT", &input.total_bill_amt)?;
        let total_pay_amt = parse_float("TOTAL_PAY_AMT", &input.total_pay_amt)?;

        let avg_bill_amt = if total_bill_amt > 0.0 {
            total_bill_amt / 6.0
        } else {
            0.0
        };
        let avg_pay_amt = if total_pay_amt > 0.0 {
            total_pay_amt / 6.0
        } else {
            0.0
        };
        let utilization_ratio = if limit_bal > 0.0 {
            total_bill_amt / limit_bal
        } else {
            0.0
        };

        Ok(Self {
            limit_bal,
            sex,
            education,
            marriage,
            age,
            total_bill_amt,
            total_pay_amt,
            avg_bill_amt,
            avg_pay_amt,
            utilization_ratio,
        })
    }

    /// Column order the model was trained on. Do not reorder.
    pub fn to_array(&self) -> FeatureVector {
        [
            self.limit_bal,
            self.sex,
            self.education,
            self.marriage,
            self.age,
            self.total_bill_amt,
            self.total_pay_amt,
            self.avg_bill_amt,
            self.avg_pay_amt,
            self.utilization_ratio,
        ]
    }
}

fn parse_float(field: &'static str, value: &Option<String>) -> Result<f32, ValidationError> {
    let raw = value
        .as_deref()
        .ok_or(ValidationError::MissingField(field))?;
    raw.trim()
        .parse::<f32>()
        .map_err(|_| ValidationError::NotNumeric(field, raw.to_owned()))
}

fn parse_int(field: &'static str, value: &Option<String>) -> Result<f32, ValidationError> {
    let raw = value
        .as_deref()
        .ok_or(ValidationError::MissingField(field))?;
    raw.trim()
        .parse::<i64>()
        .map(|n| n as f32)
        .map_err(|_| ValidationError::NotNumeric(field, raw.to_owned()))
}

/// Predicted class for a borrower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Default,
    NoDefault,
}

impl Outcome {
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            Outcome::Default
        } else {
            Outcome::NoDefault
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Default => "Default",
            Outcome::NoDefault => "No Default",
        }
    }
}

/// Classifier verdict rendered back into the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub outcome: Outcome,
    /// Positive-class probability, already rounded to three decimals.
    pub probability: f32,
}

/// Envelope for the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
    pub execution_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_owned()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }
}
