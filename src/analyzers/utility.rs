/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Returns `N` evenly spaced values from `start` to `stop`, both included.
pub fn linspace<const N: usize>(start: f64, stop: f64) -> [f64; N] {
    let mut out = [start; N];
    if N < 2 {
        return out;
    }
    let step = (stop - start) / (N - 1) as f64;
    for (i, value) in out.iter_mut().enumerate() {
        *value = start + step * i as f64;
    }
    out[N - 1] = stop;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_linspace_includes_both_ends() {
        let edges: [f64; 5] = linspace(0.0, 1.0);
        assert_eq!(edges, [0.0, 0.25, 0.5, 0.75, 1.0]);

        let flat: [f64; 3] = linspace(52.2, 52.2);
        assert_eq!(flat, [52.2, 52.2, 52.2]);
    }
}
