use crop_core::{
    ClassLabel, Classifier, FeatureVector, PredictError, PredictionResult, Scaler,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::artifacts::{load_json, ArtifactError, ArtifactPaths};
use crate::classifier::ClassifierModel;
use crate::scaler::{MinMaxScaler, StandardScaler};

/// Min-max scaling, then standardisation, then classification.
///
/// Every component is immutable after construction, so one predictor is
/// shared by all requests.
#[derive(Clone)]
pub struct CropPredictor {
    minmax: Arc<dyn Scaler>,
    standard: Arc<dyn Scaler>,
    classifier: Arc<dyn Classifier>,
}

impl CropPredictor {
    pub fn new(
        minmax: Arc<dyn Scaler>,
        standard: Arc<dyn Scaler>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            minmax,
            standard,
            classifier,
        }
    }

    /// Load the classifier and both scalers from disk.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let classifier: ClassifierModel = load_json(&paths.model)?;
        let standard: StandardScaler = load_json(&paths.standard_scaler)?;
        let minmax: MinMaxScaler = load_json(&paths.minmax_scaler)?;

        tracing::info!(
            "Loaded classifier {} from {}",
            classifier.describe(),
            paths.model.display()
        );
        if minmax.fitted.is_none() || standard.fitted.is_none() {
            tracing::warn!("One or both scalers carry no fitted parameters; predictions will fail");
        }

        Ok(Self::new(
            Arc::new(minmax),
            Arc::new(standard),
            Arc::new(classifier),
        ))
    }

    pub fn describe(&self) -> String {
        self.classifier.describe()
    }

    pub fn predict_features(&self, features: &FeatureVector) -> Result<ClassLabel, PredictError> {
        let scaled = self.minmax.transform(features)?;
        let scaled = self.standard.transform(&scaled)?;
        Ok(self.classifier.predict(&scaled)?)
    }

    /// Run the full request pipeline over submitted form fields.
    pub fn predict_form(&self, form: &HashMap<String, String>) -> PredictionResult {
        let result = FeatureVector::from_form(form)
            .map_err(PredictError::from)
            .and_then(|features| self.predict_features(&features));

        match &result {
            Ok(label) => tracing::debug!("Classifier returned label {label}"),
            Err(e) => tracing::warn!("Prediction failed: {e}"),
        }
        PredictionResult::from(result)
    }
}
