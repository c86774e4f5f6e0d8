use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MissingField;

pub type UserId = Uuid;

/// Status assigned to every user at signup.
pub const DEFAULT_USER_STATUS: &str = "active";

/// A wallet owner. The identifier never changes after signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4(),
            firstname: firstname.into(),
            lastname: lastname.into(),
            username: username.into(),
            email: email.into(),
            status: DEFAULT_USER_STATUS.to_string(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// Signup fields as they arrive from a caller; any of them may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDraft {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserDraft {
    /// Check that every field is present and non-blank, then build the user.
    pub fn validate(self) -> Result<User, MissingField> {
        let firstname = required(self.firstname, "firstname")?;
        let lastname = required(self.lastname, "lastname")?;
        let username = required(self.username, "username")?;
        let email = required(self.email, "email")?;
        Ok(User::new(firstname, lastname, username, email))
    }
}

/// Require a present, non-blank value for the named field.
pub fn required(value: Option<String>, field: &'static str) -> Result<String, MissingField> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingField(field)),
    }
}

/// Parse a caller-supplied user identifier. Anything that is not a UUID
/// cannot name an existing user.
pub fn parse_user_id(raw: &str) -> Option<UserId> {
    Uuid::parse_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> UserDraft {
        UserDraft {
            firstname: Some("Ada".into()),
            lastname: Some("Lovelace".into()),
            username: Some("ada".into()),
            email: Some("ada@example.com".into()),
        }
    }

    #[test]
    fn test_new_user_defaults() {
        let user = complete_draft().validate().unwrap();
        assert_eq!(user.status, DEFAULT_USER_STATUS);
        assert_eq!(user.created_at, user.modified_at);
        assert_eq!(user.id.get_version_num(), 4);
    }

    #[test]
    fn test_missing_field_is_reported_by_name() {
        let draft = UserDraft {
            email: None,
            ..complete_draft()
        };
        assert_eq!(draft.validate(), Err(MissingField("email")));

        let draft = UserDraft {
            username: Some("   ".into()),
            ..complete_draft()
        };
        assert_eq!(draft.validate(), Err(MissingField("username")));
    }

    #[test]
    fn test_parse_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(&id.to_string()), Some(id));
        assert_eq!(parse_user_id("not-a-uuid"), None);
    }
}
