//! Field checks shared by the request handlers. Every check runs before the
//! first store call of a handler.

use crate::error::{ServiceError, ServiceResult};
use regex::Regex;
use std::sync::OnceLock;

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
static NATIONAL_ID: OnceLock<Option<Regex>> = OnceLock::new();

fn is_match(cell: &'static OnceLock<Option<Regex>>, source: &str, value: &str) -> bool {
    cell.get_or_init(|| match Regex::new(source) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Invalid validation pattern {source}: {e}");
            None
        }
    })
    .as_ref()
    .is_some_and(|re| re.is_match(value))
}

/// Trimmed value of a required field.
pub fn required(label: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{label} is required")));
    }
    Ok(value.to_string())
}

/// Lowercased, trimmed email address.
pub fn email(value: &str) -> ServiceResult<String> {
    let value = required("Email", value)?.to_ascii_lowercase();
    if !is_match(&EMAIL, r"^[^@\s]+@[^@\s]+\.[^@\s]+$", &value) {
        return Err(ServiceError::validation("Please enter a valid email address"));
    }
    Ok(value)
}

/// 7 to 15 digits, optional leading `+`, spaces and dashes allowed.
pub fn phone(value: &str) -> ServiceResult<String> {
    let value = required("Phone", value)?;
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if !is_match(&PHONE, r"^\+?[0-9][0-9 \-]*$", &value) || !(7..=15).contains(&digits) {
        return Err(ServiceError::validation("Please enter a valid phone number"));
    }
    Ok(value)
}

pub fn national_id(value: &str) -> ServiceResult<String> {
    let value = required("National ID", value)?;
    if !is_match(&NATIONAL_ID, r"^[0-9A-Za-z]{4,20}$", &value) {
        return Err(ServiceError::validation(
            "National ID must be 4 to 20 letters or digits",
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalised() {
        assert_eq!(email("  Thabo@Example.COM ").unwrap(), "thabo@example.com");
        assert!(email("thabo@").is_err());
        assert!(email("").is_err());
    }

    #[test]
    fn phone_counts_digits() {
        assert!(phone("+27 82-555-0101").is_ok());
        assert!(phone("0825550101").is_ok());
        assert!(phone("12345").is_err());
        assert!(phone("082 555 abc").is_err());
        assert!(phone("+1234567890123456").is_err());
    }

    #[test]
    fn national_id_bounds() {
        assert!(national_id("900101").is_ok());
        assert!(national_id("ab1").is_err());
        assert!(national_id("9001-01").is_err());
    }

    #[test]
    fn required_reports_the_label() {
        let err = required("Surname", "   ").unwrap_err();
        assert_eq!(err.to_string(), "Surname is required");
    }
}
