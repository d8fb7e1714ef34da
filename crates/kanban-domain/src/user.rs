use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Opaque hash produced by the authentication layer.
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    pub fn new(input: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&input.email),
            password_hash: input.password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            created_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Emails are unique case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(first: Option<&str>, last: Option<&str>) -> User {
        User::new(NewUser {
            email: "  Ada@Example.COM ".to_string(),
            password_hash: "hash".to_string(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
        })
    }

    #[test]
    fn test_email_normalized() {
        assert_eq!(new_user(None, None).email, "ada@example.com");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            new_user(Some("Ada"), Some("Lovelace")).display_name(),
            "Ada Lovelace"
        );
        assert_eq!(new_user(None, Some("Lovelace")).display_name(), "Lovelace");
        assert_eq!(new_user(None, None).display_name(), "ada@example.com");
    }
}
