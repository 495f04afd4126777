//! Per-move loss series derived from an evaluation time series
//!
//! The upstream series sometimes includes the position before move 1 and
//! sometimes starts after it. The only signal is the length: a series with at
//! least `move_count + 1` samples is taken to include the baseline. If the
//! upstream framing changes, this silently misaligns; the heuristic is kept
//! as-is rather than tuned.

/// Absolute change of `series` across each move, one entry per move
///
/// Entry `m - 1` describes move `m` (1-based). It is `None` when either
/// neighbouring sample is missing, out of range or not finite; an unknown
/// loss is never reported as zero.
pub fn loss_series(series: &[Option<f64>], move_count: usize) -> Vec<Option<f64>> {
    let has_initial = series.len() >= move_count + 1;
    (1..=move_count)
        .map(|move_number| {
            let (prev, next) = if has_initial {
                (move_number.checked_sub(1)?, move_number)
            } else {
                (move_number.checked_sub(2)?, move_number - 1)
            };
            let before = sample(series, prev)?;
            let after = sample(series, next)?;
            Some((after - before).abs())
        })
        .collect()
}

/// Sample at `move_number` using the same baseline framing as [`loss_series`]
///
/// Clamped to the series; move 0 is the initial position when present.
pub fn value_at_move(series: &[Option<f64>], move_count: usize, move_number: usize) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let has_initial = series.len() >= move_count + 1;
    let index = if has_initial {
        move_number
    } else {
        move_number.saturating_sub(1)
    };
    sample(series, index.min(series.len() - 1))
}

fn sample(series: &[Option<f64>], index: usize) -> Option<f64> {
    series
        .get(index)
        .copied()
        .flatten()
        .filter(|value| value.is_finite())
}
