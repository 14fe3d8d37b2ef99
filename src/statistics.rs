use std::fmt;

/// A derived ratio. Undefined when its denominator is zero; written as `NA`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ratio(Option<f64>);

impl Ratio {
    pub const UNDEFINED: Ratio = Ratio(None);

    pub fn new(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            Ratio::UNDEFINED
        } else {
            Ratio(Some(numerator as f64 / denominator as f64))
        }
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_defined(self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{:.6}", v),
            None => f.write_str("NA"),
        }
    }
}

/// Call rate
/// call_rate = (correct + wrong) / truth_total
pub fn call_rate(correct: u64, wrong: u64, truth_total: u64) -> Ratio {
    Ratio::new(correct + wrong, truth_total)
}

/// Accuracy among classifiable calls
/// accuracy = correct / (correct + wrong)
pub fn accuracy(correct: u64, wrong: u64) -> Ratio {
    Ratio::new(correct, correct + wrong)
}

/// Arithmetic mean over the defined values only; all-undefined stays undefined.
pub fn mean_defined(values: impl IntoIterator<Item = Ratio>) -> Ratio {
    let (sum, n) = values
        .into_iter()
        .filter_map(Ratio::value)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        Ratio::UNDEFINED
    } else {
        Ratio(Some(sum / n as f64))
    }
}

/// Mean of raw counters across runs.
pub fn mean_count(values: &[u64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}
