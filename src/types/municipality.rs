use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A municipality known to the financial store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub mid: Uuid,
    pub name: String,
    /// Two-letter state code.
    pub state: String,
    /// Five-digit county FIPS code.
    pub county_fips: String,
}

impl Municipality {
    pub fn new(
        name: impl Into<String>,
        state: impl Into<String>,
        county_fips: impl Into<String>,
    ) -> Self {
        Self {
            mid: Uuid::new_v4(),
            name: name.into(),
            state: state.into(),
            county_fips: county_fips.into(),
        }
    }
}
