use muniscope::service::HistoryGenerator;
use muniscope::types::{FinancialRecord, Metric, MetricValue, Modifier};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use std::collections::HashSet;
use uuid::Uuid;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn series_shape_holds(seed in any::<u64>(), years in 0u32..30, start in 1900i32..2100) {
        let baseline = FinancialRecord::sample(Uuid::new_v4(), start + 1);
        let mut rng = StdRng::seed_from_u64(seed);
        let series = HistoryGenerator::default()
            .generate_with(&mut rng, &baseline, start, years)
            .unwrap();

        prop_assert_eq!(series.len(), years as usize);
        let ids: HashSet<Uuid> = series.iter().map(|r| r.record_id).collect();
        prop_assert_eq!(ids.len(), series.len());
        for (k, record) in series.iter().enumerate() {
            prop_assert_eq!(record.year, start - k as i32);
            prop_assert_eq!(record.mid, baseline.mid);
            prop_assert_eq!(record.modifier, Modifier::Auto);
            prop_assert_eq!(record.metrics.len(), Metric::ALL.len());
            for metric in [Metric::StreetRepairMiles, Metric::SewerRepairs, Metric::SewerMiles] {
                match record.metrics.get(metric) {
                    Some(MetricValue::Decimal(v)) => prop_assert_eq!(v.scale(), 2),
                    other => prop_assert!(false, "{metric}: {other:?}"),
                }
            }
            for (_, value) in record.metrics.iter() {
                match value {
                    MetricValue::Decimal(v) => prop_assert_eq!(v.scale(), 2),
                    MetricValue::Count(v) => prop_assert!(v >= 0),
                    MetricValue::Measure(v) => prop_assert!(v.is_finite()),
                }
            }
        }
    }

    #[test]
    fn each_year_stays_within_drift_of_the_next(seed in any::<u64>(), drift in 0.0f64..0.5) {
        let generator = HistoryGenerator::with_max_drift(drift);
        let baseline = FinancialRecord::sample(Uuid::new_v4(), 2025);
        let mut rng = StdRng::seed_from_u64(seed);
        let series = generator.generate_with(&mut rng, &baseline, 2024, 5).unwrap();

        let mut previous = &baseline;
        for record in &series {
            for &metric in Metric::ALL {
                let before = previous.metrics.get(metric).unwrap();
                let after = record.metrics.get(metric).unwrap();
                match (before, after) {
                    (MetricValue::Decimal(b), MetricValue::Decimal(a)) => {
                        let bound = b.abs() * Decimal::from_f64_retain(drift).unwrap()
                            + Decimal::new(1, 2);
                        prop_assert!((a - b).abs() <= bound, "{metric}: {b} -> {a}");
                    }
                    (MetricValue::Measure(b), MetricValue::Measure(a)) => {
                        prop_assert!((a - b).abs() <= b.abs() * drift + 1e-9, "{metric}");
                    }
                    (MetricValue::Count(b), MetricValue::Count(a)) => {
                        let b = b as f64;
                        prop_assert!((a as f64 - b).abs() <= b * drift + 1.0, "{metric}");
                    }
                    _ => prop_assert!(false, "{metric} changed class"),
                }
            }
            previous = record;
        }
    }
}
