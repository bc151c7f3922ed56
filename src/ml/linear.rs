use ndarray::{ArrayView1, aview1};
use serde::{Deserialize, Serialize};

use super::PredictionError;

/// Binary logistic regression: `sigmoid(coef · x + intercept)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// One weight per input feature.
    pub coef: Vec<f64>,
    /// Bias added to the weighted sum.
    pub intercept: f64,
}

impl LogisticModel {
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.coef.len() != n_features {
            return Err(format!(
                "coef length {} does not match {n_features} inputs",
                self.coef.len()
            ));
        }
        if !self.intercept.is_finite() || self.coef.iter().any(|c| !c.is_finite()) {
            return Err("coefficients must be finite".to_string());
        }
        Ok(())
    }

    /// Raw margin; positive means the second class.
    pub fn decision(&self, features: ArrayView1<'_, f64>) -> Result<f64, PredictionError> {
        if features.len() != self.coef.len() {
            return Err(PredictionError::FeatureWidth {
                expected: self.coef.len(),
                found: features.len(),
            });
        }
        Ok(features.dot(&aview1(&self.coef)) + self.intercept)
    }

    pub fn proba(&self, features: ArrayView1<'_, f64>) -> Result<f64, PredictionError> {
        self.decision(features).map(sigmoid)
    }
}

/// Logistic function, stable for large negative inputs.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_symmetric_and_bounded() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
    }

    #[test]
    fn decision_is_dot_plus_intercept() {
        let model = LogisticModel {
            coef: vec![0.5, -2.0],
            intercept: 1.0,
        };
        assert_eq!(model.decision(aview1(&[4.0, 1.0])).unwrap(), 1.0);
        assert!(model.validate(2).is_ok());
        assert!(model.validate(3).is_err());
    }

    #[test]
    fn short_input_is_an_error_not_a_panic() {
        let model = LogisticModel {
            coef: vec![0.5, -2.0],
            intercept: 1.0,
        };
        assert_eq!(
            model.proba(aview1(&[4.0])),
            Err(PredictionError::FeatureWidth {
                expected: 2,
                found: 1
            })
        );
    }
}
