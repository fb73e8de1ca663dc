use thiserror::Error;

/// Failures raised while turning raw form fields into a [`FeatureVector`](crate::FeatureVector).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("missing form field '{0}'")]
    MissingField(String),

    #[error("could not convert string to float: '{0}'")]
    NotNumeric(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("This {scaler} instance is not fitted yet")]
    NotFitted { scaler: &'static str },

    #[error("X has {got} features, but {scaler} is expecting {expected} features as input")]
    FeatureCount {
        scaler: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Minimum of desired feature range must be smaller than maximum. Got ({lo}, {hi}).")]
    InvalidFeatureRange { lo: f64, hi: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("unsupported model artifact format version {found} (supported: {supported})")]
    UnsupportedFormat { found: u32, supported: u32 },

    #[error("estimator kind '{0}' has no predict implementation")]
    UnsupportedEstimator(String),

    #[error("malformed estimator: {0}")]
    Malformed(String),

    #[error("X has {got} features, but the classifier is expecting {expected} features as input")]
    FeatureCount { expected: usize, got: usize },

    #[error("Input X contains NaN or infinity")]
    NonFinite,
}

impl ModelError {
    /// True when the loaded classifier cannot perform inference at all, as
    /// opposed to rejecting this particular input.
    pub fn is_compatibility(&self) -> bool {
        matches!(
            self,
            ModelError::UnsupportedFormat { .. }
                | ModelError::UnsupportedEstimator(_)
                | ModelError::Malformed(_)
        )
    }
}

/// Everything that can go wrong between the form submission and a crop label.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Scale(#[from] ScaleError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{0}")]
    Other(String),
}

pub const SCALER_NOT_FITTED_MESSAGE: &str =
    "Error: Scalers are not properly fitted. Please check preprocessing.";

pub const MODEL_COMPATIBILITY_MESSAGE: &str =
    "Error: Model compatibility issue. Check scikit-learn version.";

pub const GENERIC_ERROR_PREFIX: &str = "An error occurred: ";

impl PredictError {
    /// The sentence shown to the user in place of a recommendation.
    pub fn user_message(&self) -> String {
        match self {
            PredictError::Scale(ScaleError::NotFitted { .. }) => {
                SCALER_NOT_FITTED_MESSAGE.to_string()
            }
            PredictError::Model(e) if e.is_compatibility() => {
                MODEL_COMPATIBILITY_MESSAGE.to_string()
            }
            PredictError::Scale(ScaleError::FeatureCount { .. })
            | PredictError::Scale(ScaleError::InvalidFeatureRange { .. })
            | PredictError::Model(_)
            | PredictError::Input(_)
            | PredictError::Other(_) => format!("{GENERIC_ERROR_PREFIX}{self}"),
        }
    }
}
