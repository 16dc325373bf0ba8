use regex::Regex;
use thiserror::Error;

use super::user::UserCandidate;

/// Accepted values of `gender` under the strict profile.
pub const GENDERS: [&str; 3] = ["Male", "Female", "Non-binary"];

lazy_static::lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$"
    )
    .expect("email pattern is a valid regex");
}

/// Which rule set a candidate is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaProfile {
    /// `gender` required and restricted to [`GENDERS`].
    #[default]
    Strict,
    /// `gender` optional and unconstrained.
    Legacy,
}

impl SchemaProfile {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "legacy" => Some(Self::Legacy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Checks `candidate` rule by rule and reports the first violation.
pub fn validate(candidate: &UserCandidate, profile: SchemaProfile) -> Result<(), ValidationError> {
    if is_blank(candidate.first_name.as_deref()) {
        return Err(ValidationError::new("first_name is required"));
    }
    if is_blank(candidate.last_name.as_deref()) {
        return Err(ValidationError::new("last_name is required"));
    }
    if !candidate.email.as_deref().is_some_and(is_valid_email) {
        return Err(ValidationError::new("email must be a valid email"));
    }
    if profile == SchemaProfile::Strict
        && !candidate
            .gender
            .as_deref()
            .is_some_and(|gender| GENDERS.contains(&gender))
    {
        return Err(ValidationError::new(format!(
            "gender must be one of {}",
            GENDERS.join(", ")
        )));
    }

    Ok(())
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}
