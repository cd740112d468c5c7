use serde::Deserialize;
use validator::Validate;

/// Registration input. Structural checks live on the derive; the
/// domain-specific rules (name charset, phone digits) run in
/// `validation::validate_registration` before any I/O is attempted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: String,

    #[validate(email(message = "Invalid email format"), length(max = 254))]
    pub email: String,

    #[validate(length(min = 10, max = 20))]
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"), length(max = 254))]
    pub email: Option<String>,

    #[validate(length(min = 10, max = 20))]
    pub phone: Option<String>,
}
