use market_core::{MarketError, MarketResult};
use serde::{Deserialize, Serialize};

/// Min-max scaler onto `[0, 1]`.
///
/// Fit once and reused for every transform. A flat series (zero range) maps
/// everything to `0.0` and inverts back to the constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> MarketResult<Self> {
        if values.is_empty() {
            return Err(MarketError::NoData("cannot fit scaler on an empty series".to_string()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MarketError::InvalidData("series contains non-finite values".to_string()));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn transform(&self, value: f64) -> f64 {
        let range = self.range();
        if range == 0.0 {
            0.0
        } else {
            (value - self.min) / range
        }
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.min
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.transform(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform_bounds() {
        let scaler = MinMaxScaler::fit(&[10.0, 20.0, 15.0]).unwrap();
        assert_eq!(scaler.transform(10.0), 0.0);
        assert_eq!(scaler.transform(20.0), 1.0);
        assert!((scaler.transform(15.0) - 0.5).abs() < 1e-12);
        assert!((scaler.inverse(0.25) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_flat_series() {
        let scaler = MinMaxScaler::fit(&[7.0; 5]).unwrap();
        assert_eq!(scaler.transform(7.0), 0.0);
        assert_eq!(scaler.inverse(0.0), 7.0);
    }

    #[test]
    fn test_empty_and_nan_rejected() {
        assert!(matches!(MinMaxScaler::fit(&[]), Err(MarketError::NoData(_))));
        assert!(matches!(
            MinMaxScaler::fit(&[1.0, f64::NAN]),
            Err(MarketError::InvalidData(_))
        ));
    }
}
