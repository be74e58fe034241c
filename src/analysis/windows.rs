/// Time windows over a sorted timestamp series.
///
/// Windows are index ranges, not time buckets. The scan keeps two indices,
/// advancing `right` while the span from `left` is shorter than the width and
/// emitting `[left, right)` then advancing `left` once it is not. Every
/// emitted window therefore covers less than `width` between its first and
/// last sample, and adding the sample at `right` would reach `width`.
///
/// `timestamps` must be sorted ascending; this is not checked.

/// Half-open index range `[left, right)` into the timestamp series.
///
/// `right` is always a valid index: the sample at `right` closes the window
/// and its timestamp represents the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub left: usize,
    pub right: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.right - self.left
    }

    pub fn is_empty(&self) -> bool {
        self.right == self.left
    }

    /// The slice of `series` covered by this window.
    pub fn slice<'a, T>(&self, series: &'a [T]) -> &'a [T] {
        &series[self.left..self.right]
    }
}

/// Emits every window of `width_ms` over `timestamps`.
///
/// `width_ms` must be positive; with a positive width `left < right` holds
/// for every window, so no window is empty.
pub fn rolling_windows(timestamps: &[i64], width_ms: i64) -> Vec<Window> {
    debug_assert!(width_ms > 0, "window width must be positive");

    let mut windows = Vec::new();
    let mut left = 0usize;
    let mut right = 0usize;

    while right < timestamps.len() {
        if timestamps[right].saturating_sub(timestamps[left]) < width_ms {
            right += 1;
        } else {
            windows.push(Window { left, right });
            left += 1;
        }
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_sampling() {
        // one sample every 30 s, 60 s windows
        let ts: Vec<i64> = (0..6).map(|i| i * 30_000).collect();
        let windows = rolling_windows(&ts, 60_000);
        assert_eq!(
            windows,
            vec![
                Window { left: 0, right: 2 },
                Window { left: 1, right: 3 },
                Window { left: 2, right: 4 },
                Window { left: 3, right: 5 },
            ]
        );
    }

    #[test]
    fn test_series_shorter_than_width_has_no_windows() {
        let ts = [0, 10_000, 20_000];
        assert!(rolling_windows(&ts, 60_000).is_empty());
    }

    #[test]
    fn test_empty_series() {
        assert!(rolling_windows(&[], 1_000).is_empty());
    }

    #[test]
    fn test_gap_advances_left_several_times() {
        // a long gap before the last sample closes several windows at once
        let ts = [0, 1_000, 2_000, 100_000];
        let windows = rolling_windows(&ts, 5_000);
        assert_eq!(
            windows,
            vec![
                Window { left: 0, right: 3 },
                Window { left: 1, right: 3 },
                Window { left: 2, right: 3 },
            ]
        );
    }

    #[test]
    fn test_duplicate_timestamps_stay_in_one_window() {
        let ts = [0, 0, 0, 10_000];
        let windows = rolling_windows(&ts, 10_000);
        assert_eq!(
            windows,
            vec![
                Window { left: 0, right: 3 },
                Window { left: 1, right: 3 },
                Window { left: 2, right: 3 },
            ]
        );
    }

    #[test]
    fn test_coverage_invariant() {
        let ts = [0, 7_000, 9_000, 15_000, 31_000, 32_000, 40_000, 55_000];
        let width = 10_000;
        for w in rolling_windows(&ts, width) {
            assert!(!w.is_empty());
            assert!(ts[w.right - 1] - ts[w.left] < width);
            assert!(ts[w.right] - ts[w.left] >= width);
        }
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let ts = [-9_000_000_000_000_000_000, 9_000_000_000_000_000_000];
        assert_eq!(rolling_windows(&ts, 1_000), vec![Window { left: 0, right: 1 }]);
    }

    #[test]
    fn test_slice() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let w = Window { left: 1, right: 3 };
        assert_eq!(w.slice(&values), &[2.0, 3.0]);
        assert_eq!(w.len(), 2);
    }
}
