//! Sliding windows over a scaled series.

use ndarray::{Array1, Array3, Axis};

/// Overlapping step-1 windows with their next-step targets.
///
/// `windows` has shape `(count, n_steps, 1)` and `targets[i]` is the value
/// right after window `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    pub windows: Array3<f64>,
    pub targets: Array1<f64>,
}

impl WindowSet {
    /// Number of windows.
    pub fn len(&self) -> usize {
        self.windows.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window length.
    pub fn n_steps(&self) -> usize {
        self.windows.len_of(Axis(1))
    }
}

/// Slice `series` into `max(0, len - n_steps)` windows of `n_steps` values.
///
/// Too-short input gives an empty set rather than an error.
pub fn make_windows(series: &[f64], n_steps: usize) -> WindowSet {
    let count = series.len().saturating_sub(n_steps);
    let windows = Array3::from_shape_fn((count, n_steps, 1), |(i, t, _)| series[i + t]);
    let targets = Array1::from_shape_fn(count, |i| series[i + n_steps]);
    WindowSet { windows, targets }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_slide_by_one() {
        let series: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let set = make_windows(&series, 3);

        assert_eq!(set.len(), 3);
        assert_eq!(set.n_steps(), 3);
        assert_eq!(set.windows.shape(), &[3, 3, 1]);
        assert_eq!(set.windows[[0, 0, 0]], 0.0);
        assert_eq!(set.windows[[1, 2, 0]], 3.0);
        assert_eq!(set.windows[[2, 2, 0]], 4.0);
        assert_eq!(set.targets.to_vec(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn short_series_gives_empty_set() {
        let set = make_windows(&[1.0, 2.0, 3.0], 3);
        assert!(set.is_empty());
        assert_eq!(set.windows.shape(), &[0, 3, 1]);
        assert!(set.targets.is_empty());

        assert!(make_windows(&[], 30).is_empty());
    }
}
