//! Bollinger Bands over the previous close.
//!
//! Bands are computed on `close_prev`, so the value at bar t only uses
//! closes up to t-1:
//! - Middle: rolling mean of close_prev over `window`
//! - Upper / Lower: middle ± k · sample stddev (n - 1)
//! - ZScore: (close_prev - middle) / stddev
//!
//! A full window of defined values is required; otherwise NaN.

/// All four Bollinger series over an input series, computed in one pass.
#[derive(Debug, Clone, Default)]
pub struct BandSeries {
    pub mid: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub z: Vec<f64>,
}

impl BandSeries {
    pub fn compute(values: &[f64], window: usize, num_std: f64) -> Self {
        let n = values.len();
        let mut out = Self {
            mid: vec![f64::NAN; n],
            upper: vec![f64::NAN; n],
            lower: vec![f64::NAN; n],
            z: vec![f64::NAN; n],
        };
        if window < 2 || n < window {
            return out;
        }

        for i in (window - 1)..n {
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                continue;
            }
            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance = slice
                .iter()
                .map(|v| {
                    let d = v - mean;
                    d * d
                })
                .sum::<f64>()
                / (window - 1) as f64;
            let std = variance.sqrt();

            out.mid[i] = mean;
            out.upper[i] = mean + num_std * std;
            out.lower[i] = mean - num_std * std;
            out.z[i] = if std > 0.0 {
                (values[i] - mean) / std
            } else {
                f64::NAN
            };
        }
        out
    }
}
