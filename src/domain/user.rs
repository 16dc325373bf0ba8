use serde::{Deserialize, Serialize};

/// A stored user. `id` is always assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl UserRecord {
    pub fn from_candidate(id: u64, candidate: UserCandidate) -> Self {
        Self {
            id,
            first_name: candidate.first_name.unwrap_or_default(),
            last_name: candidate.last_name.unwrap_or_default(),
            email: candidate.email.unwrap_or_default(),
            gender: candidate.gender,
        }
    }

    /// Case-insensitive email comparison used for the uniqueness check.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().to_lowercase() == email.trim().to_lowercase()
    }
}

/// Client-supplied fields of a user to create.
///
/// Every field is optional so that a missing field reaches the validator
/// instead of failing JSON decoding. Any `id` in the body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCandidate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl UserCandidate {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            email: Some(email.into()),
            gender: None,
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_ignores_client_supplied_id() {
        let candidate: UserCandidate = serde_json::from_str(
            r#"{"id": 99, "first_name": "Ann", "last_name": "Lee", "email": "ann@x.com"}"#,
        )
        .unwrap();

        let record = UserRecord::from_candidate(1, candidate);
        assert_eq!(record.id, 1);
        assert_eq!(record.first_name, "Ann");
        assert_eq!(record.gender, None);
    }

    #[test]
    fn record_without_gender_omits_the_field() {
        let record = UserRecord::from_candidate(3, UserCandidate::new("A", "B", "a@b.io"));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("gender").is_none());
        assert_eq!(json["id"], 3);
    }

    #[test]
    fn email_match_ignores_case_and_padding() {
        let record = UserRecord::from_candidate(1, UserCandidate::new("A", "B", "Ann@X.com"));
        assert!(record.has_email(" ann@x.COM "));
        assert!(!record.has_email("ann@y.com"));
    }
}
