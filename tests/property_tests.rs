//! Property-based tests for the transforms and the anomaly decision.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated price series.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use spot_anomaly::detection::{build_records, percentile_threshold};
use spot_anomaly::transform::{make_windows, reconstruct_forecast, stationarize, ScalerState};

/// Strictly positive prices with a little variation.
fn price_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.5..500.0_f64, min_len..max_len)
}

fn dates(n: usize) -> Vec<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2010, 1, 4).unwrap();
    (0..n).map(|i| base + Duration::days(i as i64)).collect()
}

// =============================================================================
// Property: scaling round-trips every finite price
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn scaler_round_trip(train in price_strategy(1, 60), x in -1000.0..1000.0_f64) {
        let scaler = ScalerState::fit(&train).unwrap();
        let back = scaler.inverse_value(scaler.transform_value(x));
        prop_assert!((back - x).abs() <= 1e-9 * (1.0 + x.abs()),
            "round trip of {} gave {}", x, back);
    }

    #[test]
    fn scaler_is_fitted_on_its_input_only(train in price_strategy(4, 60)) {
        let scaler = ScalerState::fit(&train).unwrap();
        prop_assert!(scaler.scale > 0.0);
        let min = train.iter().copied().fold(f64::INFINITY, f64::min);
        let max = train.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(scaler.center >= min && scaler.center <= max);
    }
}

// =============================================================================
// Property: window count and targets
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn window_count_matches_length(series in prop::collection::vec(-5.0..5.0_f64, 0..80), n in 1usize..20) {
        let set = make_windows(&series, n);
        let expected = series.len().saturating_sub(n);

        prop_assert_eq!(set.len(), expected);
        prop_assert_eq!(set.windows.shape(), &[expected, n, 1]);
        for i in 0..expected {
            prop_assert_eq!(set.targets[i], series[i + n]);
            prop_assert_eq!(set.windows[[i, 0, 0]], series[i]);
            prop_assert_eq!(set.windows[[i, n - 1, 0]], series[i + n - 1]);
        }
    }
}

// =============================================================================
// Property: thresholds and flags
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn percentile_threshold_is_monotone(
        scores in prop::collection::vec(0.0..10.0_f64, 1..60),
        a in 0.0..=1.0_f64,
        b in 0.0..=1.0_f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let t_low = percentile_threshold(&scores, low).unwrap();
        let t_high = percentile_threshold(&scores, high).unwrap();
        prop_assert!(t_low <= t_high);
    }

    #[test]
    fn flags_are_strictly_above_threshold(
        scores in prop::collection::vec(0.0..2.0_f64, 1..50),
        threshold in 0.0..2.0_f64,
    ) {
        let prices = vec![3.0; scores.len()];
        let records = build_records(&dates(scores.len()), &prices, &scores, threshold).unwrap();

        for (record, score) in records.iter().zip(&scores) {
            prop_assert_eq!(record.is_anomaly, *score > threshold);
            prop_assert_eq!(record.threshold, threshold);
        }
    }

    #[test]
    fn threshold_equal_to_a_score_does_not_flag_it(scores in prop::collection::vec(0.0..2.0_f64, 1..50), pick in 0usize..50) {
        let threshold = scores[pick % scores.len()];
        let prices = vec![3.0; scores.len()];
        let records = build_records(&dates(scores.len()), &prices, &scores, threshold).unwrap();
        prop_assert!(!records[pick % scores.len()].is_anomaly);
    }
}

// =============================================================================
// Property: stationarization and reconstruction
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn stationarize_drops_one_value(prices in price_strategy(1, 100)) {
        let log_diff = stationarize(&prices).unwrap();
        prop_assert_eq!(log_diff.len(), prices.len() - 1);
    }

    #[test]
    fn reconstruction_chains_cumulative_sums(
        predictions in prop::collection::vec(-0.1..0.1_f64, 0..30),
        last in 0.5..100.0_f64,
    ) {
        let prices = reconstruct_forecast(&predictions, last);
        prop_assert_eq!(prices.len(), predictions.len());

        let mut cumulative = 0.0;
        for (d, p) in predictions.iter().zip(&prices) {
            cumulative += d;
            let expected = last * f64::exp(cumulative);
            prop_assert!((p - expected).abs() <= 1e-12 * expected);
        }
    }
}
