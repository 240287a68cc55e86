//! Core domain helpers used across shop services

use chrono::Utc;
use uuid::Uuid;

/// Amounts are whole currency units (tomans), never fractional.
pub type Money = i64;

/// Generate a short, human-readable tracking code for a credit request.
///
/// 12 uppercase hex characters, unique enough for customer-facing lookup
/// while staying typeable over the phone.
pub fn generate_tracking_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..12].to_uppercase()
}

/// Generate an order tracking number: `TRK-<yymmddHHMMSS>-<suffix>`.
///
/// The timestamp keeps numbers roughly sortable; the random suffix keeps
/// them unique when two orders land in the same second.
pub fn generate_order_number() -> String {
    let ts = Utc::now().format("%y%m%d%H%M%S");
    let suffix = &Uuid::new_v4().simple().to_string()[..6];
    format!("TRK-{}-{}", ts, suffix.to_uppercase())
}

/// Normalize Persian (۰-۹) and Arabic-Indic (٠-٩) digits to ASCII.
///
/// Customers paste phone and postal codes from Persian-locale keyboards;
/// validation always runs on the normalized form.
pub fn normalize_digits(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => {
                char::from(b'0' + (c as u32 - 0x06F0) as u8)
            }
            '\u{0660}'..='\u{0669}' => {
                char::from(b'0' + (c as u32 - 0x0660) as u8)
            }
            other => other,
        })
        .collect()
}

/// Keep only ASCII digits after normalization.
pub fn digits_only(value: &str) -> String {
    normalize_digits(value)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}
