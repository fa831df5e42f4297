//! Small numeric helpers shared by the extractor and insight generator

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// `p` is in [0, 100]. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Number of records in the top `fraction` of a batch, never less than one
pub fn top_count(len: usize, fraction: f64) -> usize {
    // Nudge so that e.g. 10 * 0.2 never floors to 1 on rounding error
    let count = (len as f64 * fraction + 1e-9).floor() as usize;
    count.max(1).min(len.max(1))
}

/// Character count, not byte length
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
