//! String formats checked by [`FieldKind`](super::FieldKind) variants.

use validator::{ValidateCreditCard, ValidateEmail};

/// Longest URL accepted for a `Url` field.
pub const MAX_URL_LENGTH: usize = 2083;

pub fn is_email(value: &str) -> bool {
    value.validate_email()
}

/// Absolute `http`/`https` URL with a non-empty host.
pub fn is_http_url(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_URL_LENGTH {
        return false;
    }
    match url::Url::parse(value) {
        Ok(u) => {
            matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Strip whitespace from a card number; `None` unless the rest is 12-19 digits
/// passing the issuer and checksum checks.
pub fn normalize_card_number(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if !(12..=19).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.as_str().validate_credit_card().then_some(digits)
}
