use serde::Serialize;
use std::fmt;

use crate::error::AtlasError;

/// A US state or inhabited territory, in canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UsState {
    pub abbr: &'static str,
    pub name: &'static str,
    pub fips: &'static str,
}

const STATES: &[UsState] = &[
    UsState { abbr: "AL", name: "Alabama", fips: "01" },
    UsState { abbr: "AK", name: "Alaska", fips: "02" },
    UsState { abbr: "AZ", name: "Arizona", fips: "04" },
    UsState { abbr: "AR", name: "Arkansas", fips: "05" },
    UsState { abbr: "CA", name: "California", fips: "06" },
    UsState { abbr: "CO", name: "Colorado", fips: "08" },
    UsState { abbr: "CT", name: "Connecticut", fips: "09" },
    UsState { abbr: "DE", name: "Delaware", fips: "10" },
    UsState { abbr: "DC", name: "District of Columbia", fips: "11" },
    UsState { abbr: "FL", name: "Florida", fips: "12" },
    UsState { abbr: "GA", name: "Georgia", fips: "13" },
    UsState { abbr: "HI", name: "Hawaii", fips: "15" },
    UsState { abbr: "ID", name: "Idaho", fips: "16" },
    UsState { abbr: "IL", name: "Illinois", fips: "17" },
    UsState { abbr: "IN", name: "Indiana", fips: "18" },
    UsState { abbr: "IA", name: "Iowa", fips: "19" },
    UsState { abbr: "KS", name: "Kansas", fips: "20" },
    UsState { abbr: "KY", name: "Kentucky", fips: "21" },
    UsState { abbr: "LA", name: "Louisiana", fips: "22" },
    UsState { abbr: "ME", name: "Maine", fips: "23" },
    UsState { abbr: "MD", name: "Maryland", fips: "24" },
    UsState { abbr: "MA", name: "Massachusetts", fips: "25" },
    UsState { abbr: "MI", name: "Michigan", fips: "26" },
    UsState { abbr: "MN", name: "Minnesota", fips: "27" },
    UsState { abbr: "MS", name: "Mississippi", fips: "28" },
    UsState { abbr: "MO", name: "Missouri", fips: "29" },
    UsState { abbr: "MT", name: "Montana", fips: "30" },
    UsState { abbr: "NE", name: "Nebraska", fips: "31" },
    UsState { abbr: "NV", name: "Nevada", fips: "32" },
    UsState { abbr: "NH", name: "New Hampshire", fips: "33" },
    UsState { abbr: "NJ", name: "New Jersey", fips: "34" },
    UsState { abbr: "NM", name: "New Mexico", fips: "35" },
    UsState { abbr: "NY", name: "New York", fips: "36" },
    UsState { abbr: "NC", name: "North Carolina", fips: "37" },
    UsState { abbr: "ND", name: "North Dakota", fips: "38" },
    UsState { abbr: "OH", name: "Ohio", fips: "39" },
    UsState { abbr: "OK", name: "Oklahoma", fips: "40" },
    UsState { abbr: "OR", name: "Oregon", fips: "41" },
    UsState { abbr: "PA", name: "Pennsylvania", fips: "42" },
    UsState { abbr: "RI", name: "Rhode Island", fips: "44" },
    UsState { abbr: "SC", name: "South Carolina", fips: "45" },
    UsState { abbr: "SD", name: "South Dakota", fips: "46" },
    UsState { abbr: "TN", name: "Tennessee", fips: "47" },
    UsState { abbr: "TX", name: "Texas", fips: "48" },
    UsState { abbr: "UT", name: "Utah", fips: "49" },
    UsState { abbr: "VT", name: "Vermont", fips: "50" },
    UsState { abbr: "VA", name: "Virginia", fips: "51" },
    UsState { abbr: "WA", name: "Washington", fips: "53" },
    UsState { abbr: "WV", name: "West Virginia", fips: "54" },
    UsState { abbr: "WI", name: "Wisconsin", fips: "55" },
    UsState { abbr: "WY", name: "Wyoming", fips: "56" },
    UsState { abbr: "AS", name: "American Samoa", fips: "60" },
    UsState { abbr: "GU", name: "Guam", fips: "66" },
    UsState { abbr: "MP", name: "Northern Mariana Islands", fips: "69" },
    UsState { abbr: "PR", name: "Puerto Rico", fips: "72" },
    UsState { abbr: "VI", name: "U.S. Virgin Islands", fips: "78" },
];

impl UsState {
    pub fn all() -> &'static [UsState] {
        STATES
    }

    /// Resolve a full name, 2-letter abbreviation or FIPS code.
    ///
    /// Digits are read as a FIPS code (`"6"` and `"06"` both mean California),
    /// two letters as an abbreviation, anything else as a name. Matching is
    /// case-insensitive and tolerant of repeated whitespace.
    pub fn resolve(input: &str) -> Result<UsState, AtlasError> {
        let trimmed = input.trim();
        let invalid = || AtlasError::InvalidState(input.to_string());
        if trimmed.is_empty() {
            return Err(invalid());
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if trimmed.len() > 2 {
                return Err(invalid());
            }
            let code = format!("{trimmed:0>2}");
            return STATES
                .iter()
                .find(|s| s.fips == code)
                .copied()
                .ok_or_else(invalid);
        }

        if trimmed.len() == 2 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return STATES
                .iter()
                .find(|s| s.abbr.eq_ignore_ascii_case(trimmed))
                .copied()
                .ok_or_else(invalid);
        }

        let wanted = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        STATES
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(&wanted))
            .copied()
            .ok_or_else(invalid)
    }
}

impl fmt::Display for UsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbr)
    }
}
