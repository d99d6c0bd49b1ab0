/// Model inputs and their next-step targets over a normalized series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSet {
    pub inputs: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl WindowSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// For each `i` in `window..len`, pairs `series[i - window..i]` with `series[i]`.
pub fn sliding_windows(series: &[f64], window: usize) -> WindowSet {
    if window == 0 || series.len() <= window {
        return WindowSet::default();
    }

    let inputs = series.windows(window).take(series.len() - window).map(<[f64]>::to_vec).collect();
    let targets = series[window..].to_vec();
    WindowSet { inputs, targets }
}
