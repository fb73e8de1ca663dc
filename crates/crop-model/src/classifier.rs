use crop_core::{ClassLabel, Classifier, FeatureVector, ModelError, FEATURE_COUNT};
use serde::Deserialize;
use std::f64::consts::PI;

/// Artifact layout this build knows how to run.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Marker used in `children_left` / `children_right` for leaf nodes.
const TREE_LEAF: i64 = -1;

/// A fitted classifier exported from scikit-learn into JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierModel {
    pub format_version: u32,
    #[serde(default)]
    pub n_features_in: Option<usize>,
    pub classes: Vec<ClassLabel>,
    pub estimator: Estimator,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawEstimator")]
pub enum Estimator {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GaussianNb(GaussianNb),
    /// A kind this build has no inference code for. Loading succeeds so the
    /// server can start; every prediction reports a compatibility error.
    Unsupported(String),
}

impl Estimator {
    pub fn kind(&self) -> &str {
        match self {
            Estimator::DecisionTree(_) => "decision_tree",
            Estimator::RandomForest(_) => "random_forest",
            Estimator::GaussianNb(_) => "gaussian_nb",
            Estimator::Unsupported(kind) => kind.as_str(),
        }
    }
}

#[derive(Deserialize)]
struct RawEstimator {
    kind: String,
    #[serde(flatten)]
    body: serde_json::Value,
}

impl TryFrom<RawEstimator> for Estimator {
    type Error = String;

    fn try_from(raw: RawEstimator) -> Result<Self, Self::Error> {
        let decode_err = |e: serde_json::Error| format!("invalid {} estimator: {e}", raw.kind);
        match raw.kind.as_str() {
            "decision_tree" => serde_json::from_value(raw.body.clone())
                .map(Estimator::DecisionTree)
                .map_err(decode_err),
            "random_forest" => serde_json::from_value(raw.body.clone())
                .map(Estimator::RandomForest)
                .map_err(decode_err),
            "gaussian_nb" => serde_json::from_value(raw.body.clone())
                .map(Estimator::GaussianNb)
                .map_err(decode_err),
            other => Ok(Estimator::Unsupported(other.to_string())),
        }
    }
}

/// Flattened scikit-learn tree arrays, indexed by node id.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions).
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn leaf_value(&self, x: &[f64; FEATURE_COUNT]) -> Result<&[f64], ModelError> {
        let mut node = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.children_left.len() {
            let left = *self
                .children_left
                .get(node)
                .ok_or_else(|| malformed(format!("node {node} is out of range")))?;
            if left == TREE_LEAF {
                return self
                    .value
                    .get(node)
                    .map(Vec::as_slice)
                    .ok_or_else(|| malformed(format!("leaf {node} has no value")));
            }
            let right = *self
                .children_right
                .get(node)
                .ok_or_else(|| malformed(format!("node {node} has no right child")))?;
            let feature = self
                .feature
                .get(node)
                .and_then(|f| usize::try_from(*f).ok())
                .and_then(|f| x.get(f))
                .ok_or_else(|| malformed(format!("node {node} splits on an unknown feature")))?;
            let threshold = *self
                .threshold
                .get(node)
                .ok_or_else(|| malformed(format!("node {node} has no threshold")))?;

            // Split thresholds were learned on float32 inputs.
            let next = if f64::from(*feature as f32) <= threshold {
                left
            } else {
                right
            };
            node = usize::try_from(next)
                .map_err(|_| malformed(format!("node {node} has an invalid child {next}")))?;
        }
        Err(malformed("tree does not terminate".to_string()))
    }

    fn predict_index(&self, x: &[f64; FEATURE_COUNT], n_classes: usize) -> Result<usize, ModelError> {
        let value = self.leaf_value(x)?;
        check_width(value.len(), n_classes)?;
        Ok(argmax(value))
    }

    /// Leaf weights normalised to sum to one.
    fn predict_proba(&self, x: &[f64; FEATURE_COUNT], n_classes: usize) -> Result<Vec<f64>, ModelError> {
        let value = self.leaf_value(x)?;
        check_width(value.len(), n_classes)?;
        let total: f64 = value.iter().sum();
        let total = if total == 0.0 { 1.0 } else { total };
        Ok(value.iter().map(|v| v / total).collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn predict_index(&self, x: &[f64; FEATURE_COUNT], n_classes: usize) -> Result<usize, ModelError> {
        if self.trees.is_empty() {
            return Err(malformed("forest has no trees".to_string()));
        }
        let mut proba = vec![0.0; n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(x, n_classes)?) {
                *acc += p;
            }
        }
        Ok(argmax(&proba))
    }
}

/// Gaussian naive Bayes: per-class feature means (`theta`), variances and
/// priors.
#[derive(Debug, Clone, Deserialize)]
pub struct GaussianNb {
    pub theta: Vec<Vec<f64>>,
    pub var: Vec<Vec<f64>>,
    pub class_prior: Vec<f64>,
}

impl GaussianNb {
    fn predict_index(&self, x: &[f64; FEATURE_COUNT], n_classes: usize) -> Result<usize, ModelError> {
        check_width(self.theta.len(), n_classes)?;
        check_width(self.var.len(), n_classes)?;
        check_width(self.class_prior.len(), n_classes)?;

        let mut jll = Vec::with_capacity(n_classes);
        for c in 0..n_classes {
            let (theta, var) = (&self.theta[c], &self.var[c]);
            if theta.len() != FEATURE_COUNT || var.len() != FEATURE_COUNT {
                return Err(malformed(format!("class {c} does not cover every feature")));
            }
            let mut ll = self.class_prior[c].ln();
            for j in 0..FEATURE_COUNT {
                ll -= 0.5 * (2.0 * PI * var[j]).ln();
                ll -= 0.5 * (x[j] - theta[j]).powi(2) / var[j];
            }
            jll.push(ll);
        }
        Ok(argmax(&jll))
    }
}

impl Classifier for ClassifierModel {
    fn describe(&self) -> String {
        match &self.estimator {
            Estimator::RandomForest(forest) => format!(
                "random_forest ({} trees, {} classes)",
                forest.trees.len(),
                self.classes.len()
            ),
            other => format!("{} ({} classes)", other.kind(), self.classes.len()),
        }
    }

    fn predict(&self, features: &FeatureVector) -> Result<ClassLabel, ModelError> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat {
                found: self.format_version,
                supported: SUPPORTED_FORMAT_VERSION,
            });
        }
        if let Estimator::Unsupported(kind) = &self.estimator {
            return Err(ModelError::UnsupportedEstimator(kind.clone()));
        }
        if let Some(expected) = self.n_features_in {
            if expected != FEATURE_COUNT {
                return Err(ModelError::FeatureCount {
                    expected,
                    got: FEATURE_COUNT,
                });
            }
        }

        let x = features.values();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        let n_classes = self.classes.len();
        let index = match &self.estimator {
            Estimator::DecisionTree(tree) => tree.predict_index(x, n_classes)?,
            Estimator::RandomForest(forest) => forest.predict_index(x, n_classes)?,
            Estimator::GaussianNb(nb) => nb.predict_index(x, n_classes)?,
            Estimator::Unsupported(kind) => {
                return Err(ModelError::UnsupportedEstimator(kind.clone()))
            }
        };

        self.classes
            .get(index)
            .cloned()
            .ok_or_else(|| malformed(format!("class index {index} is out of range")))
    }
}

fn malformed(detail: String) -> ModelError {
    ModelError::Malformed(detail)
}

fn check_width(got: usize, n_classes: usize) -> Result<(), ModelError> {
    if got != n_classes || n_classes == 0 {
        return Err(malformed(format!(
            "expected {n_classes} class columns, found {got}"
        )));
    }
    Ok(())
}

/// Index of the first maximum; NaN entries never win.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] || (values[best].is_nan() && !v.is_nan()) {
            best = i;
        }
    }
    best
}
