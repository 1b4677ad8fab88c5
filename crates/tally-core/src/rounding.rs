//! Two-decimal rounding used for every reported time value.

/// Rounds `value` to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round2(18.888_888), 18.89);
        assert_eq!(round2(11.111_111), 11.11);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(2.005_1), 2.01);
    }
}
