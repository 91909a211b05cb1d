//! Synthetic multi-year financial history.
//!
//! Each generated year is a random perturbation of the year after it, so the
//! series drifts like a random walk away from the baseline.

use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;
use uuid::Uuid;

use crate::error::AtlasError;
use crate::types::{FinancialRecord, Metric, MetricValue, Metrics, Modifier};

pub const DEFAULT_MAX_DRIFT: f64 = 0.08;
const MONEY_DP: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct HistoryGenerator {
    max_drift: f64,
}

impl Default for HistoryGenerator {
    fn default() -> Self {
        Self {
            max_drift: DEFAULT_MAX_DRIFT,
        }
    }
}

impl HistoryGenerator {
    /// `max_drift` is the largest relative change between consecutive years,
    /// clamped to `[0, 1)`.
    pub fn with_max_drift(max_drift: f64) -> Self {
        let max_drift = if max_drift.is_finite() {
            max_drift.clamp(0.0, 0.99)
        } else {
            DEFAULT_MAX_DRIFT
        };
        Self { max_drift }
    }

    pub fn max_drift(&self) -> f64 {
        self.max_drift
    }

    pub fn generate(
        &self,
        baseline: &FinancialRecord,
        start_year: i32,
        num_years: u32,
    ) -> Result<Vec<FinancialRecord>, AtlasError> {
        self.generate_with(&mut rand::thread_rng(), baseline, start_year, num_years)
    }

    /// Records for `start_year`, `start_year - 1`, ... (`num_years` of them),
    /// each derived from the one before it. Fails before producing anything
    /// if the baseline lacks a metric or holds one of the wrong class.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        baseline: &FinancialRecord,
        start_year: i32,
        num_years: u32,
    ) -> Result<Vec<FinancialRecord>, AtlasError> {
        baseline
            .metrics
            .check_complete()
            .map_err(AtlasError::MalformedBaseline)?;

        let mut series: Vec<FinancialRecord> = Vec::with_capacity(num_years.min(256) as usize);
        for offset in 0..num_years {
            let year = i32::try_from(offset)
                .ok()
                .and_then(|o| start_year.checked_sub(o))
                .ok_or_else(|| {
                    AtlasError::InvalidRequest(format!(
                        "{num_years} years back from {start_year} is out of range"
                    ))
                })?;
            let previous = series.last().unwrap_or(baseline);
            let record = self.next_year(rng, previous, year)?;
            series.push(record);
        }
        debug!(
            mid = %baseline.mid,
            start_year,
            num_years,
            "generated synthetic history"
        );
        Ok(series)
    }

    fn next_year<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        previous: &FinancialRecord,
        year: i32,
    ) -> Result<FinancialRecord, AtlasError> {
        let mut metrics = Metrics::new();
        for &metric in Metric::ALL {
            let value = previous.metrics.get(metric).ok_or_else(|| {
                AtlasError::MalformedBaseline(format!("missing field `{metric}`"))
            })?;
            metrics.insert(metric, self.perturb(rng, metric, value)?);
        }
        Ok(FinancialRecord {
            record_id: Uuid::new_v4(),
            mid: previous.mid,
            year,
            metrics,
            component_units: previous.component_units.clone(),
            principal_employers: previous.principal_employers.clone(),
            modifier: Modifier::Auto,
            created_at: Utc::now(),
        })
    }

    fn perturb<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        metric: Metric,
        value: MetricValue,
    ) -> Result<MetricValue, AtlasError> {
        let pct: f64 = rng.gen_range(-self.max_drift..=self.max_drift);
        let perturbed = match value {
            MetricValue::Decimal(v) => {
                let factor = Decimal::ONE + Decimal::from_f64(pct).unwrap_or(Decimal::ZERO);
                let mut scaled = v
                    .checked_mul(factor)
                    .ok_or_else(|| {
                        AtlasError::MalformedBaseline(format!("field `{metric}` overflows"))
                    })?
                    .round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero);
                scaled.rescale(MONEY_DP);
                MetricValue::Decimal(scaled)
            }
            MetricValue::Count(v) => {
                let scaled = (v as f64 * (1.0 + pct)).floor().max(0.0);
                MetricValue::Count(scaled as i64)
            }
            MetricValue::Measure(v) => {
                let scaled = v * (1.0 + pct);
                if !scaled.is_finite() {
                    return Err(AtlasError::MalformedBaseline(format!(
                        "field `{metric}` overflows"
                    )));
                }
                MetricValue::Measure(scaled)
            }
        };
        Ok(perturbed)
    }
}

/// [`HistoryGenerator::generate`] with the default ±8% drift.
pub fn generate_history(
    baseline: &FinancialRecord,
    start_year: i32,
    num_years: u32,
) -> Result<Vec<FinancialRecord>, AtlasError> {
    HistoryGenerator::default().generate(baseline, start_year, num_years)
}
