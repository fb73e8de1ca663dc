use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{InputError, PredictError};

pub const FEATURE_COUNT: usize = 7;

/// Form field names in feature order. "Phosporus" is spelled the way the
/// existing input form submits it.
pub const FEATURE_FIELDS: [&str; FEATURE_COUNT] = [
    "Nitrogen",
    "Phosporus",
    "Potassium",
    "Temperature",
    "Humidity",
    "pH",
    "Rainfall",
];

pub const UNDETERMINED_MESSAGE: &str =
    "Sorry, we could not determine the best crop to be cultivated with the provided data.";

/// One row of soil/climate measurements:
/// N, P, K, temperature, humidity, pH, rainfall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Parse the seven named form fields in feature order. The first missing
    /// or non-numeric field aborts the parse.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, InputError> {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, field) in values.iter_mut().zip(FEATURE_FIELDS) {
            let raw = form
                .get(field)
                .ok_or_else(|| InputError::MissingField(field.to_string()))?;
            *slot = parse_float(raw)?;
        }
        Ok(Self(values))
    }
}

fn parse_float(raw: &str) -> Result<f64, InputError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| InputError::NotNumeric(raw.to_string()))
}

/// The 22 crops the classifier was trained to recommend, keyed by the
/// integer label it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crop {
    Rice,
    Maize,
    Jute,
    Cotton,
    Coconut,
    Papaya,
    Orange,
    Apple,
    Muskmelon,
    Watermelon,
    Grapes,
    Mango,
    Banana,
    Pomegranate,
    Lentil,
    Blackgram,
    Mungbean,
    Mothbeans,
    Pigeonpeas,
    Kidneybeans,
    Chickpea,
    Coffee,
}

impl Crop {
    /// Table order; `ALL[i]` has code `i + 1`.
    pub const ALL: [Crop; 22] = [
        Crop::Rice,
        Crop::Maize,
        Crop::Jute,
        Crop::Cotton,
        Crop::Coconut,
        Crop::Papaya,
        Crop::Orange,
        Crop::Apple,
        Crop::Muskmelon,
        Crop::Watermelon,
        Crop::Grapes,
        Crop::Mango,
        Crop::Banana,
        Crop::Pomegranate,
        Crop::Lentil,
        Crop::Blackgram,
        Crop::Mungbean,
        Crop::Mothbeans,
        Crop::Pigeonpeas,
        Crop::Kidneybeans,
        Crop::Chickpea,
        Crop::Coffee,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        if code < 1 {
            return None;
        }
        Self::ALL.get((code - 1) as usize).copied()
    }

    pub fn code(self) -> i64 {
        self as i64 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Crop::Rice => "Rice",
            Crop::Maize => "Maize",
            Crop::Jute => "Jute",
            Crop::Cotton => "Cotton",
            Crop::Coconut => "Coconut",
            Crop::Papaya => "Papaya",
            Crop::Orange => "Orange",
            Crop::Apple => "Apple",
            Crop::Muskmelon => "Muskmelon",
            Crop::Watermelon => "Watermelon",
            Crop::Grapes => "Grapes",
            Crop::Mango => "Mango",
            Crop::Banana => "Banana",
            Crop::Pomegranate => "Pomegranate",
            Crop::Lentil => "Lentil",
            Crop::Blackgram => "Blackgram",
            Crop::Mungbean => "Mungbean",
            Crop::Mothbeans => "Mothbeans",
            Crop::Pigeonpeas => "Pigeonpeas",
            Crop::Kidneybeans => "Kidneybeans",
            Crop::Chickpea => "Chickpea",
            Crop::Coffee => "Coffee",
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A class label as stored in a fitted model's `classes` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ClassLabel {
    /// Numeric labels compare by value, so `1.0` finds the same crop as `1`.
    /// Text labels never match the integer-keyed table.
    pub fn crop(&self) -> Option<Crop> {
        match self {
            ClassLabel::Int(code) => Crop::from_code(*code),
            ClassLabel::Float(v) if v.fract() == 0.0 && v.abs() <= i64::MAX as f64 => {
                Crop::from_code(*v as i64)
            }
            ClassLabel::Float(_) | ClassLabel::Text(_) => None,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Int(v) => write!(f, "{v}"),
            ClassLabel::Float(v) => write!(f, "{v}"),
            ClassLabel::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Final outcome of one prediction request.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Recommended(Crop),
    Undetermined,
    Failed(PredictError),
}

impl PredictionResult {
    pub fn from_label(label: &ClassLabel) -> Self {
        match label.crop() {
            Some(crop) => PredictionResult::Recommended(crop),
            None => PredictionResult::Undetermined,
        }
    }

    pub fn crop(&self) -> Option<Crop> {
        match self {
            PredictionResult::Recommended(crop) => Some(*crop),
            _ => None,
        }
    }

    /// The sentence rendered into the result page.
    pub fn message(&self) -> String {
        match self {
            PredictionResult::Recommended(crop) => {
                format!("{crop} is the best crop to be cultivated right there.")
            }
            PredictionResult::Undetermined => UNDETERMINED_MESSAGE.to_string(),
            PredictionResult::Failed(e) => e.user_message(),
        }
    }
}

impl From<Result<ClassLabel, PredictError>> for PredictionResult {
    fn from(result: Result<ClassLabel, PredictError>) -> Self {
        match result {
            Ok(label) => PredictionResult::from_label(&label),
            Err(e) => PredictionResult::Failed(e),
        }
    }
}
