use crop_core::{FeatureVector, ScaleError, Scaler, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Fitted state of a min-max scaler: per-feature minimum and maximum seen
/// during fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxParams {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
}

/// Rescales each feature into `feature_range` using the fitted data range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
    #[serde(default)]
    pub clip: bool,
    #[serde(default)]
    pub fitted: Option<MinMaxParams>,
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl MinMaxScaler {
    pub fn unfitted() -> Self {
        Self {
            feature_range: default_feature_range(),
            clip: false,
            fitted: None,
        }
    }

    pub fn fitted(data_min: Vec<f64>, data_max: Vec<f64>) -> Self {
        Self {
            fitted: Some(MinMaxParams { data_min, data_max }),
            ..Self::unfitted()
        }
    }
}

impl Scaler for MinMaxScaler {
    fn name(&self) -> &'static str {
        "MinMaxScaler"
    }

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, ScaleError> {
        let params = self
            .fitted
            .as_ref()
            .ok_or(ScaleError::NotFitted { scaler: self.name() })?;
        check_len(self.name(), params.data_min.len())?;
        check_len(self.name(), params.data_max.len())?;

        let (lo, hi) = self.feature_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(ScaleError::InvalidFeatureRange { lo, hi });
        }
        let mut out = *features.values();
        for (i, x) in out.iter_mut().enumerate() {
            let scale = (hi - lo) / non_zero(params.data_max[i] - params.data_min[i]);
            let min = lo - params.data_min[i] * scale;
            *x = *x * scale + min;
            if self.clip {
                *x = x.clamp(lo, hi);
            }
        }
        Ok(FeatureVector::new(out))
    }
}

/// Fitted state of a standard scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardParams {
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
}

/// Centers each feature on its fitted mean and divides by its fitted
/// standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default = "default_true")]
    pub with_mean: bool,
    #[serde(default = "default_true")]
    pub with_std: bool,
    #[serde(default)]
    pub fitted: Option<StandardParams>,
}

fn default_true() -> bool {
    true
}

impl StandardScaler {
    pub fn unfitted() -> Self {
        Self {
            with_mean: true,
            with_std: true,
            fitted: None,
        }
    }

    pub fn fitted(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            fitted: Some(StandardParams {
                mean: Some(mean),
                scale: Some(scale),
            }),
            ..Self::unfitted()
        }
    }
}

impl Scaler for StandardScaler {
    fn name(&self) -> &'static str {
        "StandardScaler"
    }

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, ScaleError> {
        let not_fitted = ScaleError::NotFitted { scaler: self.name() };
        let params = self.fitted.as_ref().ok_or(not_fitted.clone())?;

        let mean = match (self.with_mean, &params.mean) {
            (true, Some(mean)) => Some(mean),
            (true, None) => return Err(not_fitted),
            (false, _) => None,
        };
        let scale = match (self.with_std, &params.scale) {
            (true, Some(scale)) => Some(scale),
            (true, None) => return Err(not_fitted),
            (false, _) => None,
        };

        let mut out = *features.values();
        if let Some(mean) = mean {
            check_len(self.name(), mean.len())?;
            for (x, m) in out.iter_mut().zip(mean) {
                *x -= m;
            }
        }
        if let Some(scale) = scale {
            check_len(self.name(), scale.len())?;
            for (x, s) in out.iter_mut().zip(scale) {
                *x /= non_zero(*s);
            }
        }
        Ok(FeatureVector::new(out))
    }
}

fn check_len(scaler: &'static str, fitted: usize) -> Result<(), ScaleError> {
    if fitted != FEATURE_COUNT {
        return Err(ScaleError::FeatureCount {
            scaler,
            expected: fitted,
            got: FEATURE_COUNT,
        });
    }
    Ok(())
}

// Constant features have a zero range/deviation; they pass through unscaled.
fn non_zero(v: f64) -> f64 {
    if v == 0.0 {
        1.0
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FeatureVector {
        FeatureVector::new([90.0, 42.0, 43.0, 20.0, 80.0, 6.5, 200.0])
    }

    #[test]
    fn test_min_max_transform() {
        let scaler = MinMaxScaler::fitted(
            vec![0.0, 5.0, 5.0, 8.0, 14.0, 3.5, 20.0],
            vec![140.0, 145.0, 205.0, 44.0, 100.0, 10.0, 300.0],
        );
        let out = scaler.transform(&row()).unwrap();
        let expected = [
            90.0 / 140.0,
            37.0 / 140.0,
            38.0 / 200.0,
            12.0 / 36.0,
            66.0 / 86.0,
            3.0 / 6.5,
            180.0 / 280.0,
        ];
        for (a, b) in out.values().iter().zip(expected) {
            assert!((a - b).abs() < 1e-12, "{a} != {b}");
        }
    }

    #[test]
    fn test_min_max_custom_range_and_clip() {
        let mut scaler = MinMaxScaler::fitted(vec![0.0; 7], vec![10.0; 7]);
        scaler.feature_range = (-1.0, 1.0);
        let input = FeatureVector::new([0.0, 5.0, 10.0, 20.0, -10.0, 2.5, 7.5]);

        let out = scaler.transform(&input).unwrap();
        assert_eq!(out.values(), &[-1.0, 0.0, 1.0, 3.0, -3.0, -0.5, 0.5]);

        scaler.clip = true;
        let out = scaler.transform(&input).unwrap();
        assert_eq!(out.values(), &[-1.0, 0.0, 1.0, 1.0, -1.0, -0.5, 0.5]);
    }

    #[test]
    fn test_min_max_rejects_inverted_range() {
        let mut scaler = MinMaxScaler::fitted(vec![0.0; 7], vec![10.0; 7]);
        scaler.clip = true;
        for (lo, hi) in [(1.0, 0.0), (0.5, 0.5), (f64::NAN, 1.0), (0.0, f64::INFINITY)] {
            scaler.feature_range = (lo, hi);
            assert!(matches!(
                scaler.transform(&row()),
                Err(ScaleError::InvalidFeatureRange { .. })
            ));
        }
    }

    #[test]
    fn test_min_max_constant_feature() {
        let scaler = MinMaxScaler::fitted(vec![5.0; 7], vec![5.0; 7]);
        let out = scaler
            .transform(&FeatureVector::new([5.0, 6.0, 5.0, 5.0, 5.0, 5.0, 5.0]))
            .unwrap();
        assert_eq!(out.values()[0], 0.0);
        assert_eq!(out.values()[1], 1.0);
    }

    #[test]
    fn test_standard_transform() {
        let scaler = StandardScaler::fitted(vec![50.0; 7], vec![2.0, 4.0, 1.0, 0.0, 10.0, 0.5, 100.0]);
        let out = scaler
            .transform(&FeatureVector::new([52.0, 42.0, 50.0, 53.0, 80.0, 50.5, 250.0]))
            .unwrap();
        assert_eq!(out.values(), &[1.0, -2.0, 0.0, 3.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_standard_without_mean() {
        let mut scaler = StandardScaler::fitted(vec![50.0; 7], vec![2.0; 7]);
        scaler.with_mean = false;
        let out = scaler.transform(&FeatureVector::new([4.0; 7])).unwrap();
        assert_eq!(out.values(), &[2.0; 7]);
    }

    #[test]
    fn test_unfitted_scalers() {
        assert_eq!(
            MinMaxScaler::unfitted().transform(&row()),
            Err(ScaleError::NotFitted {
                scaler: "MinMaxScaler"
            })
        );
        assert_eq!(
            StandardScaler::unfitted().transform(&row()),
            Err(ScaleError::NotFitted {
                scaler: "StandardScaler"
            })
        );
    }

    #[test]
    fn test_standard_missing_scale_is_not_fitted() {
        let mut scaler = StandardScaler::fitted(vec![0.0; 7], vec![1.0; 7]);
        if let Some(params) = scaler.fitted.as_mut() {
            params.scale = None;
        }
        assert!(matches!(
            scaler.transform(&row()),
            Err(ScaleError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_feature_count_mismatch() {
        let scaler = MinMaxScaler::fitted(vec![0.0; 8], vec![1.0; 8]);
        assert_eq!(
            scaler.transform(&row()),
            Err(ScaleError::FeatureCount {
                scaler: "MinMaxScaler",
                expected: 8,
                got: 7
            })
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let scaler: MinMaxScaler =
            serde_json::from_str(r#"{"fitted": {"data_min": [0,0,0,0,0,0,0], "data_max": [1,1,1,1,1,1,1]}}"#)
                .unwrap();
        assert_eq!(scaler.feature_range, (0.0, 1.0));
        assert!(!scaler.clip);

        let scaler: StandardScaler = serde_json::from_str("{}").unwrap();
        assert!(scaler.with_mean && scaler.with_std);
        assert!(scaler.fitted.is_none());
    }
}
