//! Indicator-vector closeness.

use std::cmp::Ordering;

use market_data_ingestor::indicators::IndicatorVector;

/// Matches must score strictly above this.
pub const SIMILARITY_THRESHOLD: f64 = 0.9;

/// Mean relative closeness of `candidate` to `reference`.
///
/// Each indicator present on both sides with a non-zero reference contributes
/// `1 - |reference - candidate| / reference`. The result is not clamped: a far
/// away candidate scores below zero, and a negative reference flips the sign of
/// its term. Nothing comparable scores `0.0`.
pub fn similarity(reference: &IndicatorVector, candidate: &IndicatorVector) -> f64 {
    let (sum, n) = reference
        .values()
        .into_iter()
        .zip(candidate.values())
        .filter_map(|pair| match pair {
            (Some(r), Some(c)) if r != 0.0 => Some(1.0 - (r - c).abs() / r),
            _ => None,
        })
        .fold((0.0, 0u32), |(sum, n), term| (sum + term, n + 1));

    if n == 0 { 0.0 } else { sum / f64::from(n) }
}

/// Total order of matches: score descending, then ticker, then date ascending.
pub(crate) fn rank(
    a_score: f64,
    a_key: (&str, chrono::NaiveDate),
    b_score: f64,
    b_key: (&str, chrono::NaiveDate),
) -> Ordering {
    b_score.total_cmp(&a_score).then_with(|| a_key.cmp(&b_key))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn full(v: f64) -> IndicatorVector {
        IndicatorVector {
            ma_200: Some(v),
            ma_50: Some(v),
            ma_20: Some(v),
            ma_9: Some(v),
            rsi: Some(v),
            vwap: Some(v),
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        assert_eq!(similarity(&full(12.5), &full(12.5)), 1.0);
    }

    #[test]
    fn only_shared_indicators_count() {
        let reference = IndicatorVector {
            ma_9: Some(10.0),
            rsi: Some(50.0),
            vwap: Some(20.0),
            ..Default::default()
        };
        let candidate = IndicatorVector {
            ma_9: Some(11.0),
            rsi: None,
            vwap: Some(20.0),
            ma_200: Some(99.0),
            ..Default::default()
        };
        // (0.9 + 1.0) / 2
        assert!((similarity(&reference, &candidate) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn zero_reference_is_skipped() {
        let reference = IndicatorVector {
            rsi: Some(0.0),
            vwap: Some(10.0),
            ..Default::default()
        };
        let candidate = IndicatorVector {
            rsi: Some(30.0),
            vwap: Some(10.0),
            ..Default::default()
        };
        assert_eq!(similarity(&reference, &candidate), 1.0);
    }

    #[test]
    fn nothing_comparable_scores_zero() {
        let reference = IndicatorVector {
            rsi: Some(50.0),
            ..Default::default()
        };
        let candidate = IndicatorVector {
            vwap: Some(50.0),
            ..Default::default()
        };
        assert_eq!(similarity(&reference, &candidate), 0.0);
        assert_eq!(similarity(&IndicatorVector::default(), &full(1.0)), 0.0);
    }

    #[test]
    fn scores_are_not_clamped() {
        assert!((similarity(&full(10.0), &full(30.0)) - -1.0).abs() < 1e-12);
    }

    #[test]
    fn rank_breaks_ties_by_ticker_then_date() {
        let d1 = chrono::NaiveDate::from_ymd_opt(2023, 1, 3).unwrap();
        let d2 = chrono::NaiveDate::from_ymd_opt(2023, 1, 4).unwrap();
        assert_eq!(rank(0.95, ("MSFT", d1), 0.97, ("AAPL", d1)), Ordering::Greater);
        assert_eq!(rank(0.95, ("AAPL", d2), 0.95, ("MSFT", d1)), Ordering::Less);
        assert_eq!(rank(0.95, ("AAPL", d2), 0.95, ("AAPL", d1)), Ordering::Greater);
    }

    proptest! {
        #[test]
        fn positive_vectors_never_exceed_one(
            r in prop::array::uniform6(prop::option::of(0.01f64..1e4)),
            c in prop::array::uniform6(prop::option::of(0.0f64..1e4)),
        ) {
            let to_vec = |a: [Option<f64>; 6]| IndicatorVector {
                ma_200: a[0], ma_50: a[1], ma_20: a[2], ma_9: a[3], rsi: a[4], vwap: a[5],
            };
            let score = similarity(&to_vec(r), &to_vec(c));
            prop_assert!(score <= 1.0 + 1e-12);
            prop_assert!(score.is_finite());
        }
    }
}
