use super::{FieldKind, trimmed, Resource};
use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

/// Stored user document. Never serialized to clients directly, see [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// argon2 PHC string
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_expire: Option<bson::DateTime>,
    pub created_at: bson::DateTime,
}

impl Resource for User {
    const COLLECTION: &'static str = "users";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("_id", FieldKind::Id),
        ("name", FieldKind::Text),
        ("email", FieldKind::Text),
        ("role", FieldKind::Text),
        ("createdAt", FieldKind::Date),
    ];
}

/// User profile information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: DateTime::from_timestamp_millis(user.created_at.timestamp_millis())
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(required(message = "Please add a name"))]
    pub name: Option<String>,
    #[validate(
        required(message = "Please add an email"),
        email(message = "Please add a valid email")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Please add a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
    #[validate(custom(function = "validate_self_assigned_role"))]
    pub role: Option<Role>,
}

impl RegisterRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: trimmed(self.name),
            email: trimmed(self.email).map(|e| e.to_lowercase()),
            ..self
        }
    }
}

fn validate_self_assigned_role(role: &Role) -> Result<(), ValidationError> {
    if *role == Role::Admin {
        let mut error = ValidationError::new("role");
        error.message = Some(Cow::Borrowed("Role must be either user or publisher"));
        return Err(error);
    }
    Ok(())
}

/// Authentication request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add a name"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
}

impl UpdateDetailsRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|s| s.trim().to_string()),
            email: self.email.map(|s| s.trim().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Authentication response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
