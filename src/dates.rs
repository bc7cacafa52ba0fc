// ABOUTME: Gregorian and Hijri date derivation for report stay periods
// ABOUTME: Computes exit dates from entry date and day count and formats Hijri equivalents

use chrono::{Datelike, Days, NaiveDate};
use icu_calendar::{Date, islamic::IslamicCivil};

pub const GREGORIAN_FORMAT: &str = "%Y-%m-%d";

/// Exit date of a stay that starts on `entry` and lasts `days` days.
///
/// The entry day counts as the first day of leave, so a one-day stay exits on
/// the entry date itself. Day counts below one are treated as one. Returns
/// `None` when the exit date falls outside the representable calendar.
pub fn exit_date(entry: NaiveDate, days: u32) -> Option<NaiveDate> {
    let offset = u64::from(days.saturating_sub(1));
    entry.checked_add_days(Days::new(offset))
}

pub fn parse_gregorian(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), GREGORIAN_FORMAT).ok()
}

/// Converts a `YYYY-MM-DD` string to a Hijri `DD/MM/YYYY` string.
///
/// Returns an empty string when the input is blank or not a valid date.
pub fn to_hijri(gregorian: &str) -> String {
    match parse_gregorian(gregorian) {
        Some(date) => hijri_from_date(date),
        None => String::new(),
    }
}

pub fn hijri_from_date(date: NaiveDate) -> String {
    let (Ok(month), Ok(day)) = (u8::try_from(date.month()), u8::try_from(date.day())) else {
        return String::new();
    };

    let iso = match Date::try_new_iso_date(date.year(), month, day) {
        Ok(iso) => iso,
        Err(err) => {
            tracing::debug!(%date, error = ?err, "hijri conversion rejected date");
            return String::new();
        }
    };

    let hijri = iso.to_calendar(IslamicCivil::new());
    format!(
        "{:02}/{:02}/{}",
        hijri.day_of_month().0,
        hijri.month().ordinal,
        hijri.year().number
    )
}
