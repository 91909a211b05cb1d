//! Matches municipal boundary polygons to financial-store municipalities.
//!
//! The join key is the pair (county FIPS code, municipal name). A boundary's
//! county code is the leading five digits of its place FIPS code; a
//! municipality carries its county code directly.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{BoundaryStorage, FinanceStorage};
use crate::error::AtlasError;
use crate::types::{
    AnnotatedBoundaryFeature, AnnotatedProperties, Feature, MunicipalBoundary, Municipality,
    UsState,
};

const COUNTY_FIPS_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinKey {
    pub county_fips: String,
    pub name: String,
}

impl JoinKey {
    /// Key of a boundary feature. `None` when the FIPS code is absent,
    /// shorter than five characters or not numeric in its first five.
    pub fn from_boundary(boundary: &MunicipalBoundary) -> Option<JoinKey> {
        let fips = boundary.properties.fips_code.as_deref()?;
        let county = county_fips_prefix(fips)?;
        let name = boundary.properties.municipal_name.trim();
        if name.is_empty() {
            return None;
        }
        Some(JoinKey {
            county_fips: county.to_string(),
            name: name.to_string(),
        })
    }

    /// Key of a municipality. Its county code must be exactly five digits.
    pub fn from_municipality(municipality: &Municipality) -> Option<JoinKey> {
        let county = municipality.county_fips.trim();
        if county.len() != COUNTY_FIPS_LEN {
            return None;
        }
        let county = county_fips_prefix(county)?;
        Some(JoinKey {
            county_fips: county.to_string(),
            name: municipality.name.trim().to_string(),
        })
    }
}

/// Leading five-digit county code of a FIPS string.
pub fn county_fips_prefix(fips: &str) -> Option<&str> {
    let fips = fips.trim();
    let prefix = fips.get(..COUNTY_FIPS_LEN)?;
    prefix
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then_some(prefix)
}

/// Lookup from join key to municipality id for one state.
///
/// Keys shared by two or more municipalities are ambiguous: they are left out
/// of the lookup entirely so no feature is tagged with a guessed id.
#[derive(Debug, Default)]
pub struct MunicipalityIndex {
    by_key: HashMap<JoinKey, Uuid>,
    ambiguous: HashMap<JoinKey, Vec<Uuid>>,
}

impl MunicipalityIndex {
    pub fn build<'a>(
        state: &UsState,
        municipalities: impl IntoIterator<Item = &'a Municipality>,
    ) -> Self {
        let mut index = MunicipalityIndex::default();
        for municipality in municipalities {
            if !municipality.state.trim().eq_ignore_ascii_case(state.abbr) {
                continue;
            }
            let Some(key) = JoinKey::from_municipality(municipality) else {
                debug!(
                    mid = %municipality.mid,
                    county_fips = %municipality.county_fips,
                    "municipality has no usable county FIPS; skipped"
                );
                continue;
            };
            if let Some(mids) = index.ambiguous.get_mut(&key) {
                mids.push(municipality.mid);
                continue;
            }
            match index.by_key.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(municipality.mid);
                }
                Entry::Occupied(slot) => {
                    let (key, first) = slot.remove_entry();
                    index.ambiguous.insert(key, vec![first, municipality.mid]);
                }
            }
        }
        for (key, mids) in &index.ambiguous {
            warn!(
                state = %state,
                county_fips = %key.county_fips,
                name = %key.name,
                mids = ?mids,
                "join key shared by several municipalities; boundaries left untagged"
            );
        }
        index
    }

    pub fn get(&self, key: &JoinKey) -> Option<Uuid> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn ambiguous_keys(&self) -> impl Iterator<Item = &JoinKey> {
        self.ambiguous.keys()
    }
}

/// Tag every boundary of `state_ref` that matches a known municipality with
/// that municipality's id. Unmatched boundaries are dropped.
pub fn reconcile_boundaries(
    state_ref: &str,
    municipalities: &[Municipality],
    features: Vec<MunicipalBoundary>,
) -> Result<Vec<AnnotatedBoundaryFeature>, AtlasError> {
    let state = UsState::resolve(state_ref)?;
    let index = MunicipalityIndex::build(&state, municipalities);
    Ok(annotate(&state, &index, features))
}

fn annotate(
    state: &UsState,
    index: &MunicipalityIndex,
    features: Vec<MunicipalBoundary>,
) -> Vec<AnnotatedBoundaryFeature> {
    let total = features.len();
    let matched: Vec<AnnotatedBoundaryFeature> = features
        .into_iter()
        .filter(|f| f.properties.state.trim().eq_ignore_ascii_case(state.abbr))
        .filter_map(|f| {
            let mid = JoinKey::from_boundary(&f).and_then(|key| index.get(&key))?;
            Some(Feature {
                geometry: f.geometry,
                properties: AnnotatedProperties {
                    mid,
                    boundary: f.properties,
                },
            })
        })
        .collect();
    debug!(
        state = %state,
        features = total,
        matched = matched.len(),
        "boundaries reconciled"
    );
    matched
}

/// Reconciliation against the two stores.
#[derive(Clone)]
pub struct Reconciler {
    finance: FinanceStorage,
    gis: BoundaryStorage,
}

impl Reconciler {
    pub fn new(finance: FinanceStorage, gis: BoundaryStorage) -> Self {
        Self { finance, gis }
    }

    pub async fn reconcile_state(
        &self,
        state_ref: &str,
    ) -> Result<Vec<AnnotatedBoundaryFeature>, AtlasError> {
        let state = UsState::resolve(state_ref)?;
        let municipalities = self.finance.list_municipalities(state.abbr).await?;
        if municipalities.is_empty() {
            info!(state = %state, "no municipalities known; nothing to reconcile");
            return Ok(Vec::new());
        }
        let features = self.gis.list_municipal_boundaries(state.abbr).await?;
        let index = MunicipalityIndex::build(&state, &municipalities);
        Ok(annotate(&state, &index, features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MunicipalProperties;
    use serde_json::Value;

    fn muni(name: &str, state: &str, county: &str) -> Municipality {
        Municipality::new(name, state, county)
    }

    fn boundary(id: i64, name: &str, state: &str, fips: Option<&str>) -> MunicipalBoundary {
        Feature {
            geometry: Value::Null,
            properties: MunicipalProperties {
                id,
                municipal_name: name.to_string(),
                municipal_code: None,
                municipal_type: None,
                county_name: None,
                state: state.to_string(),
                gnis_id: None,
                fips_code: fips.map(str::to_string),
                fips_name: None,
                pop_1990: None,
                pop_2000: None,
                pop_2010: None,
                pop_2020: None,
                sq_mi: None,
            },
        }
    }

    #[test]
    fn prefix_requires_five_leading_digits() {
        assert_eq!(county_fips_prefix("4845305"), Some("48453"));
        assert_eq!(county_fips_prefix("48453"), Some("48453"));
        assert_eq!(county_fips_prefix(" 0603712 "), Some("06037"));
        assert_eq!(county_fips_prefix("4845"), None);
        assert_eq!(county_fips_prefix(""), None);
        assert_eq!(county_fips_prefix("48A5305"), None);
        assert_eq!(county_fips_prefix("é8453"), None);
    }

    #[test]
    fn municipality_key_must_be_exactly_a_county_code() {
        assert!(JoinKey::from_municipality(&muni("Austin", "TX", "48453")).is_some());
        assert!(JoinKey::from_municipality(&muni("Austin", "TX", "4845")).is_none());
        assert!(JoinKey::from_municipality(&muni("Austin", "TX", "4845305")).is_none());
    }

    #[test]
    fn unnamed_boundary_has_no_key() {
        assert!(JoinKey::from_boundary(&boundary(1, "  ", "TX", Some("4845305"))).is_none());
        assert!(JoinKey::from_boundary(&boundary(2, "Austin", "TX", Some("4845305"))).is_some());
    }

    #[test]
    fn matches_by_county_and_name() {
        let austin = muni("Austin", "TX", "48453");
        let features = vec![
            boundary(1, "Austin", "TX", Some("4845305")),
            boundary(2, "Dallas", "TX", Some("4811319000")),
            boundary(3, "Austin", "TX", Some("4801905")),
        ];
        let out = reconcile_boundaries("TX", &[austin.clone()], features).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].properties.mid, austin.mid);
        assert_eq!(out[0].properties.boundary.id, 1);
    }

    #[test]
    fn same_name_in_two_counties_is_disambiguated() {
        let a = muni("Springfield", "IL", "17167");
        let b = muni("Springfield", "IL", "17031");
        let features = vec![
            boundary(1, "Springfield", "IL", Some("1716772000")),
            boundary(2, "Springfield", "IL", Some("1703172000")),
        ];
        let out = reconcile_boundaries("Illinois", &[a.clone(), b.clone()], features).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].properties.mid, a.mid);
        assert_eq!(out[1].properties.mid, b.mid);
    }

    #[test]
    fn duplicate_keys_tag_nothing() {
        let a = muni("Franklin", "TN", "47187");
        let b = muni("Franklin", "TN", "47187");
        let c = muni("Franklin", "TN", "47187");
        let index =
            MunicipalityIndex::build(&UsState::resolve("TN").unwrap(), [&a, &b, &c]);
        assert!(index.is_empty());
        assert_eq!(index.ambiguous_keys().count(), 1);

        let out = reconcile_boundaries(
            "TN",
            &[a, b, c],
            vec![boundary(1, "Franklin", "TN", Some("4718727740"))],
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn no_municipalities_means_no_features() {
        let features = vec![
            boundary(1, "Fresno", "CA", Some("0601927000")),
            boundary(2, "Sacramento", "CA", Some("0606764000")),
        ];
        let out = reconcile_boundaries("CA", &[], features).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn every_state_form_gives_the_same_result() {
        let munis = vec![muni("Austin", "TX", "48453"), muni("Waco", "TX", "48309")];
        let features = || {
            vec![
                boundary(1, "Austin", "TX", Some("4845305")),
                boundary(2, "Waco", "TX", Some("4830976000")),
                boundary(3, "Nowhere", "TX", Some("48001")),
                boundary(4, "Short", "TX", Some("481")),
            ]
        };
        let by_abbr = reconcile_boundaries("TX", &munis, features()).unwrap();
        let by_name = reconcile_boundaries("Texas", &munis, features()).unwrap();
        let by_fips = reconcile_boundaries("48", &munis, features()).unwrap();
        assert_eq!(by_abbr.len(), 2);
        assert_eq!(by_abbr, by_name);
        assert_eq!(by_abbr, by_fips);
    }

    #[test]
    fn other_states_are_ignored_on_both_sides() {
        let ok = muni("Kansas City", "MO", "29095");
        let wrong_state = muni("Kansas City", "KS", "29095");
        let features = vec![
            boundary(1, "Kansas City", "MO", Some("2909538000")),
            boundary(2, "Kansas City", "KS", Some("2909538000")),
        ];
        let out = reconcile_boundaries("MO", &[ok.clone(), wrong_state], features).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].properties.mid, ok.mid);
        assert_eq!(out[0].properties.boundary.id, 1);
    }

    #[test]
    fn unresolvable_state_is_an_error() {
        let err = reconcile_boundaries("Narnia", &[], Vec::new()).unwrap_err();
        assert!(matches!(err, AtlasError::InvalidState(_)));
    }
}
