use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AtlasError;

/// Numeric class of a metric. Decides how the history generator perturbs
/// and rounds it, and how the store persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricClass {
    /// Currency or a measured quantity kept at exactly two decimal places.
    Decimal,
    /// Non-negative whole number.
    Count,
    /// Floating point quantity with no fixed precision. No schema metric
    /// uses it today; the generator still honours the policy.
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    BalanceSheet,
    CapitalAssets,
    Depreciation,
    Statistical,
    Operations,
}

macro_rules! metrics {
    ($( $variant:ident => $name:literal, $class:ident, $category:ident; )+) => {
        /// Every numeric field of a municipal financial record.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Metric {
            $( $variant, )+
        }

        impl Metric {
            /// Schema order; also the column order of `municipal_finances`.
            pub const ALL: &'static [Metric] = &[ $( Metric::$variant, )+ ];

            pub const fn name(self) -> &'static str {
                match self {
                    $( Metric::$variant => $name, )+
                }
            }

            pub const fn class(self) -> MetricClass {
                match self {
                    $( Metric::$variant => MetricClass::$class, )+
                }
            }

            pub const fn category(self) -> MetricCategory {
                match self {
                    $( Metric::$variant => MetricCategory::$category, )+
                }
            }
        }
    };
}

metrics! {
    CurrentAssets => "current_assets", Decimal, BalanceSheet;
    CapitalAssets => "capital_assets", Decimal, BalanceSheet;
    TotalAssets => "total_assets", Decimal, BalanceSheet;
    DeferredOutflows => "deferred_outflows", Decimal, BalanceSheet;
    Debt => "debt", Decimal, BalanceSheet;
    Liabilities => "liabilities", Decimal, BalanceSheet;
    DeferredInflows => "deferred_inflows", Decimal, BalanceSheet;
    TotalRevenues => "total_revenues", Decimal, BalanceSheet;
    OperatingGrants => "operating_grants", Decimal, BalanceSheet;
    CapitalGrants => "capital_grants", Decimal, BalanceSheet;
    InterestCharges => "interest_charges", Decimal, BalanceSheet;

    GovernmentAssetsNotBeingDepreciated => "government_assets_not_being_depreciated", Decimal, CapitalAssets;
    GovernmentAssetsBeingDepreciated => "government_assets_being_depreciated", Decimal, CapitalAssets;
    GovernmentAssetsOther => "government_assets_other", Decimal, CapitalAssets;
    BusinessTypeAssetsNotBeingDepreciated => "business_type_assets_not_being_depreciated_total", Decimal, CapitalAssets;
    BusinessTypeAssetsBeingDepreciated => "business_type_assets_being_depreciated_total", Decimal, CapitalAssets;
    ComponentUnitAssetsNotBeingDepreciated => "component_unit_assets_not_being_depreciated", Decimal, CapitalAssets;
    ComponentUnitAssetsBeingDepreciated => "component_unit_assets_being_depreciated", Decimal, CapitalAssets;
    ComponentUnitAssetsOther => "component_unit_assets_other", Decimal, CapitalAssets;
    NetBookTotalCapitalAssets => "net_book_total_capital_assets", Decimal, CapitalAssets;

    DeGeneral => "de_general", Decimal, Depreciation;
    DeInfrastructure => "de_infrastructure", Decimal, Depreciation;
    DePublicSafety => "de_public_safety", Decimal, Depreciation;
    DeHealth => "de_health", Decimal, Depreciation;
    DeHousing => "de_housing", Decimal, Depreciation;
    DeRecreation => "de_recreation", Decimal, Depreciation;
    DeUtilities => "de_utilities", Decimal, Depreciation;
    DeAirport => "de_airport", Decimal, Depreciation;
    DeOther => "de_other", Decimal, Depreciation;

    TaxableAssessedValue => "taxable_assessed_value", Decimal, Statistical;
    PropertyTaxesLevied => "property_taxes_levied", Decimal, Statistical;
    PensionBonds => "pension_bonds", Decimal, Statistical;
    WaterRevenueBonds => "water_revenue_bonds", Decimal, Statistical;
    TotalUtilityBonds => "total_utility_bonds", Decimal, Statistical;
    AirportBonds => "airport_bonds", Decimal, Statistical;
    DebtGovernmentalActivities => "debt_governmental_activities", Decimal, Statistical;
    DebtBusinessActivities => "debt_business_activities", Decimal, Statistical;
    DebtTotalPrimaryGovernment => "debt_total_primary_government", Decimal, Statistical;
    GeneralObligationBonds => "general_obligation_bonds", Decimal, Statistical;
    Population => "population", Count, Statistical;
    PerCapitaIncome => "per_capita_income", Decimal, Statistical;

    PoliceForce => "police_force", Count, Operations;
    FireDept => "fire_dept", Count, Operations;
    TotalEmployees => "total_employees", Count, Operations;
    StreetRepairMiles => "street_repair_miles", Decimal, Operations;
    WaterMainBreaks => "water_main_breaks", Count, Operations;
    WaterDailyPumpageGallonsMillion => "water_daily_pumpage_gallons_million", Decimal, Operations;
    SewerRepairs => "sewer_repairs", Decimal, Operations;
    Parks => "parks", Count, Operations;
    StreetMiles => "street_miles", Decimal, Operations;
    SewerMiles => "sewer_miles", Decimal, Operations;
    WaterMainMiles => "water_main_miles", Decimal, Operations;
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| AtlasError::InvalidRecord(format!("unknown field `{s}`")))
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// A single metric value, tagged by class.
///
/// Decimals serialize as strings so the two decimal places survive
/// the trip through JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Decimal(Decimal),
    Count(i64),
    Measure(f64),
}

impl MetricValue {
    pub fn class(&self) -> MetricClass {
        match self {
            MetricValue::Decimal(_) => MetricClass::Decimal,
            MetricValue::Count(_) => MetricClass::Count,
            MetricValue::Measure(_) => MetricClass::Measure,
        }
    }

    /// Parse a JSON value according to the metric's class. Numbers and
    /// numeric strings are both accepted.
    pub fn from_json(class: MetricClass, value: &Value) -> Option<MetricValue> {
        let text = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return None,
        };
        match class {
            MetricClass::Decimal => Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .map(MetricValue::Decimal),
            MetricClass::Count => text.parse::<i64>().ok().map(MetricValue::Count),
            MetricClass::Measure => text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(MetricValue::Measure),
        }
    }
}

/// Metric values of one record, keyed by metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics(BTreeMap<Metric, MetricValue>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<MetricValue> {
        self.0.get(&metric).copied()
    }

    pub fn insert(&mut self, metric: Metric, value: MetricValue) {
        self.0.insert(metric, value);
    }

    pub fn remove(&mut self, metric: Metric) -> Option<MetricValue> {
        self.0.remove(&metric)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, MetricValue)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }

    /// Check every schema metric is present with a value of its own class.
    /// Returns a description of the first problem found.
    pub fn check_complete(&self) -> Result<(), String> {
        for metric in Metric::ALL {
            match self.0.get(metric) {
                None => return Err(format!("missing field `{metric}`")),
                Some(v) if v.class() != metric.class() => {
                    return Err(format!(
                        "field `{metric}` expected {:?}, found {:?}",
                        metric.class(),
                        v.class()
                    ));
                }
                Some(MetricValue::Measure(f)) if !f.is_finite() => {
                    return Err(format!("field `{metric}` is not finite"));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Build from a JSON object holding metric names. Non-metric keys are
    /// rejected; every metric must be present.
    pub fn from_json_object(obj: &Map<String, Value>) -> Result<Metrics, AtlasError> {
        let mut metrics = Metrics::new();
        for (key, value) in obj {
            let metric: Metric = key.parse()?;
            let parsed = MetricValue::from_json(metric.class(), value).ok_or_else(|| {
                AtlasError::InvalidRecord(format!(
                    "field `{key}` is not a valid {:?} value",
                    metric.class()
                ))
            })?;
            metrics.insert(metric, parsed);
        }
        metrics.check_complete().map_err(AtlasError::InvalidRecord)?;
        Ok(metrics)
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (metric, value) in &self.0 {
            map.serialize_entry(metric.name(), value)?;
        }
        map.end()
    }
}

/// Provenance tag of a financial record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Produced by the history generator.
    Auto,
    /// Entered by a person.
    User,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Auto => "auto",
            Modifier::User => "user",
        }
    }
}

impl FromStr for Modifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Modifier::Auto),
            "user" => Ok(Modifier::User),
            other => Err(format!("unknown modifier `{other}`")),
        }
    }
}

/// One year of a municipality's finances. At most one per (`mid`, `year`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecord {
    pub record_id: Uuid,
    pub mid: Uuid,
    pub year: i32,
    #[serde(flatten)]
    pub metrics: Metrics,
    pub component_units: Option<String>,
    pub principal_employers: Option<String>,
    pub modifier: Modifier,
    pub created_at: DateTime<Utc>,
}

/// Body of a manual record entry: the text fields plus one key per metric.
#[derive(Debug, Clone, Deserialize)]
pub struct FinancialRecordInput {
    #[serde(default)]
    pub component_units: Option<String>,
    #[serde(default)]
    pub principal_employers: Option<String>,
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

impl FinancialRecordInput {
    pub fn into_record(self, mid: Uuid, year: i32) -> Result<FinancialRecord, AtlasError> {
        let metrics = Metrics::from_json_object(&self.metrics)?;
        Ok(FinancialRecord {
            record_id: Uuid::new_v4(),
            mid,
            year,
            metrics,
            component_units: self.component_units,
            principal_employers: self.principal_employers,
            modifier: Modifier::User,
            created_at: Utc::now(),
        })
    }
}

/// Sample snapshot used to seed a municipality: (metric, mantissa, scale).
const SAMPLE_BASELINE: &[(Metric, i64, u32)] = &[
    (Metric::CurrentAssets, 123456789, 2),
    (Metric::CapitalAssets, 234567890, 2),
    (Metric::TotalAssets, 358024679, 2),
    (Metric::DeferredOutflows, 1234567, 2),
    (Metric::Debt, 76543210, 2),
    (Metric::Liabilities, 45678912, 2),
    (Metric::DeferredInflows, 2345678, 2),
    (Metric::TotalRevenues, 987654321, 2),
    (Metric::OperatingGrants, 34567890, 2),
    (Metric::CapitalGrants, 45678912, 2),
    (Metric::InterestCharges, 1234567, 2),
    (Metric::GovernmentAssetsNotBeingDepreciated, 100000000, 2),
    (Metric::GovernmentAssetsBeingDepreciated, 50000000, 2),
    (Metric::GovernmentAssetsOther, 20000000, 2),
    (Metric::BusinessTypeAssetsNotBeingDepreciated, 15000000, 2),
    (Metric::BusinessTypeAssetsBeingDepreciated, 35000000, 2),
    (Metric::ComponentUnitAssetsNotBeingDepreciated, 25000000, 2),
    (Metric::ComponentUnitAssetsBeingDepreciated, 15000000, 2),
    (Metric::ComponentUnitAssetsOther, 10000000, 2),
    (Metric::NetBookTotalCapitalAssets, 175000000, 2),
    (Metric::DeGeneral, 1000000, 2),
    (Metric::DeInfrastructure, 1500000, 2),
    (Metric::DePublicSafety, 1200000, 2),
    (Metric::DeHealth, 800000, 2),
    (Metric::DeHousing, 700000, 2),
    (Metric::DeRecreation, 600000, 2),
    (Metric::DeUtilities, 900000, 2),
    (Metric::DeAirport, 400000, 2),
    (Metric::DeOther, 300000, 2),
    (Metric::TaxableAssessedValue, 2000000000, 2),
    (Metric::PropertyTaxesLevied, 150000000, 2),
    (Metric::PensionBonds, 50000000, 2),
    (Metric::WaterRevenueBonds, 30000000, 2),
    (Metric::TotalUtilityBonds, 20000000, 2),
    (Metric::AirportBonds, 25000000, 2),
    (Metric::DebtGovernmentalActivities, 40000000, 2),
    (Metric::DebtBusinessActivities, 35000000, 2),
    (Metric::DebtTotalPrimaryGovernment, 75000000, 2),
    (Metric::GeneralObligationBonds, 60000000, 2),
    (Metric::Population, 100000, 0),
    (Metric::PerCapitaIncome, 4500000, 2),
    (Metric::PoliceForce, 200, 0),
    (Metric::FireDept, 150, 0),
    (Metric::TotalEmployees, 5000, 0),
    (Metric::StreetRepairMiles, 12050, 2),
    (Metric::WaterMainBreaks, 12, 0),
    (Metric::WaterDailyPumpageGallonsMillion, 5050, 2),
    (Metric::SewerRepairs, 70025, 2),
    (Metric::Parks, 45, 0),
    (Metric::StreetMiles, 35050, 2),
    (Metric::SewerMiles, 60050, 2),
    (Metric::WaterMainMiles, 40050, 2),
];

impl FinancialRecord {
    /// Sample snapshot for seeding a fresh municipality.
    pub fn sample(mid: Uuid, year: i32) -> FinancialRecord {
        let mut metrics = Metrics::new();
        for &(metric, mantissa, scale) in SAMPLE_BASELINE {
            let value = match metric.class() {
                MetricClass::Decimal => MetricValue::Decimal(Decimal::new(mantissa, scale)),
                MetricClass::Count => MetricValue::Count(mantissa),
                MetricClass::Measure => {
                    MetricValue::Measure(mantissa as f64 / 10f64.powi(scale as i32))
                }
            };
            metrics.insert(metric, value);
        }
        FinancialRecord {
            record_id: Uuid::new_v4(),
            mid,
            year,
            metrics,
            component_units: Some("Sample Component Units".to_string()),
            principal_employers: Some("Acme Corp, Beta LLC, Gamma Inc.".to_string()),
            modifier: Modifier::User,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_names_are_unique_and_parse_back() {
        let mut seen = std::collections::HashSet::new();
        for metric in Metric::ALL {
            assert!(seen.insert(metric.name()), "duplicate {}", metric);
            assert_eq!(metric.name().parse::<Metric>().unwrap(), *metric);
        }
        assert!("not_a_metric".parse::<Metric>().is_err());
    }

    #[test]
    fn sample_covers_the_whole_schema() {
        let record = FinancialRecord::sample(Uuid::new_v4(), 2025);
        assert_eq!(record.metrics.len(), Metric::ALL.len());
        assert!(record.metrics.check_complete().is_ok());
        assert_eq!(
            record.metrics.get(Metric::Debt),
            Some(MetricValue::Decimal(Decimal::new(76543210, 2)))
        );
        assert_eq!(
            record.metrics.get(Metric::PoliceForce),
            Some(MetricValue::Count(200))
        );
    }

    #[test]
    fn check_complete_reports_missing_and_mistyped() {
        let mut metrics = FinancialRecord::sample(Uuid::new_v4(), 2025).metrics;
        metrics.remove(Metric::Parks);
        let err = metrics.check_complete().unwrap_err();
        assert!(err.contains("parks"));

        metrics.insert(Metric::Parks, MetricValue::Measure(4.5));
        let err = metrics.check_complete().unwrap_err();
        assert!(err.contains("parks"));
    }

    #[test]
    fn record_serializes_flat_with_money_as_string() {
        let record = FinancialRecord::sample(Uuid::nil(), 2025);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["debt"], json!("765432.10"));
        assert_eq!(value["police_force"], json!(200));
        assert_eq!(value["street_miles"], json!("350.50"));
        assert_eq!(value["modifier"], json!("user"));
        assert_eq!(value["year"], json!(2025));
    }

    #[test]
    fn input_parses_numbers_and_strings_by_class() {
        let sample = serde_json::to_value(FinancialRecord::sample(Uuid::nil(), 2025)).unwrap();
        let mut body = Map::new();
        for metric in Metric::ALL {
            body.insert(metric.name().to_string(), sample[metric.name()].clone());
        }
        body.insert("debt".to_string(), json!(1000.5));
        body.insert("parks".to_string(), json!("7"));
        body.insert("principal_employers".to_string(), json!("City Hall"));

        let input: FinancialRecordInput = serde_json::from_value(Value::Object(body)).unwrap();
        let record = input.into_record(Uuid::nil(), 2020).unwrap();
        assert_eq!(record.modifier, Modifier::User);
        assert_eq!(record.principal_employers.as_deref(), Some("City Hall"));
        assert_eq!(
            record.metrics.get(Metric::Debt),
            Some(MetricValue::Decimal(Decimal::new(10005, 1)))
        );
        assert_eq!(record.metrics.get(Metric::Parks), Some(MetricValue::Count(7)));
    }

    #[test]
    fn input_rejects_unknown_and_incomplete_bodies() {
        let mut body = Map::new();
        body.insert("debt".to_string(), json!("10.00"));
        let err = Metrics::from_json_object(&body).unwrap_err();
        assert!(matches!(err, AtlasError::InvalidRecord(_)));

        body.insert("bogus".to_string(), json!(1));
        let err = Metrics::from_json_object(&body).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
