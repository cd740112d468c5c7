use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::dto::request::RegisterUserRequest;

/// A survey participant. Created once per registration and immutable except
/// for contact-field edits; the resume token is the credential for recovering
/// the session elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, email: &str, phone: &str, resume_token: &str) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            resume_token: resume_token.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_request(request: &RegisterUserRequest, resume_token: &str) -> Self {
        User::new(
            request.name.trim(),
            &request.email.trim().to_lowercase(),
            request.phone.trim(),
            resume_token,
        )
    }

    /// Contact-field edit; identity and token never change.
    pub fn apply_contact_update(
        &mut self,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) {
        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = email {
            self.email = email.trim().to_lowercase();
        }
        if let Some(phone) = phone {
            self.phone = phone.trim().to_string();
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("Jane Doe", "jane@example.com", "(123) 456-7890", "ABC123-XY98ZW76");
        assert_eq!(user.name, "Jane Doe");
        assert_eq!(user.resume_token, "ABC123-XY98ZW76");
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_from_request_normalizes_fields() {
        let request = RegisterUserRequest {
            name: "  Jane Doe  ".to_string(),
            email: "Jane@Example.COM".to_string(),
            phone: "1234567890".to_string(),
        };

        let user = User::from_request(&request, "ABC123-XY98ZW76");
        assert_eq!(user.name, "Jane Doe");
        assert_eq!(user.email, "jane@example.com");
    }

    #[test]
    fn test_contact_update_bumps_updated_at_only() {
        let mut user = User::new("Jane", "jane@example.com", "1234567890", "ABC123-XY98ZW76");
        let id = user.id;
        let token = user.resume_token.clone();

        user.apply_contact_update(Some("Janet"), None, Some("0987654321"));

        assert_eq!(user.name, "Janet");
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.phone, "0987654321");
        assert_eq!(user.id, id);
        assert_eq!(user.resume_token, token);
        assert!(user.updated_at >= user.created_at);
    }
}
