pub mod artifacts;
pub mod classifier;
pub mod predictor;
pub mod scaler;

pub use artifacts::{load_json, ArtifactError, ArtifactPaths};
pub use classifier::{ClassifierModel, Estimator, SUPPORTED_FORMAT_VERSION};
pub use predictor::CropPredictor;
pub use scaler::{MinMaxScaler, StandardScaler};
