use chrono::NaiveDate;

/// Legacy day-month-year form used by spreadsheets and older clients
const LEGACY_FORMAT: &str = "%d-%m-%Y";
const ISO_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid date (expected YYYY-MM-DD or DD-MM-YYYY)")]
pub struct InvalidDate(pub String);

/// Normalize a date to ISO year-month-day.
///
/// Values whose first hyphen-delimited segment has two digits are read as
/// `DD-MM-YYYY`; everything else must already be `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, InvalidDate> {
    let value = raw.trim();
    let format = if has_two_digit_lead(value) { LEGACY_FORMAT } else { ISO_FORMAT };
    NaiveDate::parse_from_str(value, format).map_err(|_| InvalidDate(value.to_string()))
}

fn has_two_digit_lead(value: &str) -> bool {
    match value.split_once('-') {
        Some((lead, _)) => lead.len() == 2 && lead.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
