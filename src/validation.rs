// ============================================================================
// Submission Validation
// ============================================================================
//
// Contact fields are normalized rather than rejected: a malformed phone or
// email becomes `None` so the other channel can still identify the submitter.
// The request fails only when no usable contact remains, or the name length
// is out of range.
//
// ============================================================================

use intake_config::{MAX_NAME_LENGTH, MIN_NAME_LENGTH, PHONE_LENGTH};
use intake_error::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::NewClient;

/// Longest address SMTP allows
const MAX_EMAIL_LENGTH: usize = 254;

/// Raw `POST /api/submit-form` body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubmissionForm {
    #[serde(default)]
    pub name: Option<String>,
    /// Accepts either a JSON string or a JSON number. Any other value
    /// (fractional, negative, boolean, ...) reads as absent.
    #[serde(default, deserialize_with = "deserialize_phone")]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneValue {
    Number(u64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn deserialize_phone<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<PhoneValue>::deserialize(deserializer)?.and_then(|value| match value {
            PhoneValue::Number(n) => Some(n.to_string()),
            PhoneValue::Text(s) => Some(s),
            PhoneValue::Other(_) => None,
        }),
    )
}

impl SubmissionForm {
    /// Validate and normalize into the fields stored on a client
    pub fn normalize(self) -> AppResult<NewClient> {
        let name = validate_name(self.name)?;
        let phone = self.phone.as_deref().and_then(normalize_phone);
        let email = self.email.as_deref().and_then(normalize_email);

        if phone.is_none() && email.is_none() {
            return Err(AppError::validation(
                "A valid phone number or email address is required",
            ));
        }

        let message = self
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(NewClient {
            name,
            phone,
            email,
            message,
        })
    }
}

/// Strips `+`, `-`, spaces and parentheses; the rest must be exactly 11 digits
/// starting with 7 or 8.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')' | '+' | '-'))
        .collect();

    if stripped.len() != PHONE_LENGTH || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    if !(stripped.starts_with('7') || stripped.starts_with('8')) {
        return None;
    }

    Some(stripped)
}

/// Checks `local@domain.tld` shape and lowercases the result so lookups are
/// case-insensitive.
///
/// - local part: ASCII letters, digits and `._%+-`
/// - domain: ASCII letters, digits, `.` and `-`, with at least one dot
/// - top-level label: two or more ASCII letters
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return None;
    }

    let (local, domain) = email.split_once('@')?;

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
    {
        return None;
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
    {
        return None;
    }

    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some(email.to_ascii_lowercase())
}

/// Blank names count as absent; anything else must be 2-50 characters
pub fn validate_name(name: Option<String>) -> AppResult<Option<String>> {
    let Some(name) = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    let length = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
        return Err(AppError::validation(format!(
            "Name must be between {} and {} characters",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        )));
    }

    Ok(Some(name))
}
