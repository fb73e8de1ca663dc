use crate::{ClassLabel, FeatureVector, ModelError, ScaleError};

/// A pre-fitted feature transform
pub trait Scaler: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, ScaleError>;
}

/// A pre-trained model producing one class label per feature row
pub trait Classifier: Send + Sync {
    /// Short human-readable description used in startup logs and `/health`.
    fn describe(&self) -> String;

    fn predict(&self, features: &FeatureVector) -> Result<ClassLabel, ModelError>;
}
