pub(crate) fn mean(values: &[u8]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn stddev(values: &[u8]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values
        .iter()
        .map(|v| (f64::from(*v) - m).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    var.sqrt()
}

pub(crate) fn digit_counts(values: &[u8]) -> [usize; 10] {
    let mut counts = [0usize; 10];
    for v in values {
        counts[usize::from(*v % 10)] += 1;
    }
    counts
}

/// Digits sharing the highest frequency, ascending, plus that frequency.
pub(crate) fn modal_digits(values: &[u8]) -> (Vec<u8>, usize) {
    let counts = digit_counts(values);
    let top = counts.iter().copied().max().unwrap_or(0);
    let digits = (0u8..10)
        .filter(|d| top > 0 && counts[usize::from(*d)] == top)
        .collect();
    (digits, top)
}

pub(crate) fn round_digit(x: f64) -> u8 {
    (x.round().clamp(0.0, 255.0) as u8) % 10
}
