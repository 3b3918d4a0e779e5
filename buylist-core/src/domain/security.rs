use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Static reference data for a listed security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityMeta {
    pub symbol: String,
    pub name: String,
    pub list_date: Option<NaiveDate>,
}

impl SecurityMeta {
    /// Calendar days between the listing date and `as_of`, if the listing date is known.
    pub fn listing_age_days(&self, as_of: NaiveDate) -> Option<i64> {
        self.list_date.map(|d| (as_of - d).num_days())
    }
}

/// Canonical form of an exchange code.
///
/// Numeric codes lose their leading zeros when a holdings file passes through
/// a spreadsheet (`000001` becomes `1`); they are padded back to six digits.
pub fn normalize_symbol(raw: &str) -> String {
    let s = raw.trim();
    if !s.is_empty() && s.len() < 6 && s.bytes().all(|b| b.is_ascii_digit()) {
        format!("{s:0>6}")
    } else {
        s.to_string()
    }
}
