//! Character-level name similarity used for the fuzzy fallback.
//!
//! `ratio(a, b) = round(100 * 2 * M / (|a| + |b|))` where `M` is the number
//! of matched chars in the char diff of `a` and `b`. Symmetric, bounded to
//! `0..=100`, `ratio(a, a) == 100`.

use similar::TextDiff;

/// Максимальное значение сходства
pub const MAX_RATIO: u8 = 100;

/// Similarity ratio of two strings in `0..=100`
pub fn ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return MAX_RATIO;
    }

    let diff = TextDiff::from_chars(a, b);
    let scaled = (f64::from(diff.ratio()) * f64::from(MAX_RATIO)).round();
    scaled.clamp(0.0, f64::from(MAX_RATIO)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("rna_star", "rna_star", 100)]
    #[case("", "", 100)]
    #[case("abc", "", 0)]
    #[case("abc", "xyz", 0)]
    #[case("bamFilter", "bamfilter", 89)]
    #[case("bam_filter", "bamfilter", 95)]
    #[case("rna_star", "rnastar", 93)]
    #[case("umi_tools_extract", "umi_extract", 79)]
    fn test_ratio_values(#[case] a: &str, #[case] b: &str, #[case] expected: u8) {
        assert_eq!(ratio(a, b), expected);
    }

    #[test]
    fn test_ratio_counts_chars_not_bytes() {
        // "é" два байта, но один символ
        assert_eq!(ratio("é", "e"), 0);
        assert_eq!(ratio("éa", "ea"), 50);
    }

    proptest! {
        #[test]
        fn prop_ratio_is_symmetric(a in "[a-zA-Z_]{0,16}", b in "[a-zA-Z_]{0,16}") {
            prop_assert_eq!(ratio(&a, &b), ratio(&b, &a));
        }

        #[test]
        fn prop_ratio_is_bounded(a in ".{0,16}", b in ".{0,16}") {
            prop_assert!(ratio(&a, &b) <= MAX_RATIO);
        }

        #[test]
        fn prop_identity_is_max(a in ".{0,16}") {
            prop_assert_eq!(ratio(&a, &a), MAX_RATIO);
        }
    }
}
