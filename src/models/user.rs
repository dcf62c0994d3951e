use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Role;
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl DbUser {
    /// A stored role that does not parse is a data/configuration fault, never a default.
    pub fn parsed_role(&self) -> Result<Role, AppError> {
        self.role.parse::<Role>().map_err(|_| {
            AppError::configuration(format!(
                "user {} has unrecognised role {:?}",
                self.id, self.role
            ))
        })
    }
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        let role = value.parsed_role()?;
        Ok(User {
            id: value.id,
            username: value.username,
            email: value.email,
            role,
            first_name: value.first_name,
            last_name: value.last_name,
            is_active: value.is_active,
        })
    }
}

/// Listing form of [`User::try_from`]: a row with an unrecognised role is
/// logged and left out instead of failing the whole read.
pub fn listable(rows: Vec<DbUser>) -> Vec<User> {
    rows.into_iter()
        .filter_map(|row| match User::try_from(row) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::error!(error = %err, "user row left out of listing");
                None
            }
        })
        .collect()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Profile {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreateRequest {
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    /// Without a password the account cannot log in until one is set.
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Registration payload. Every field is optional at the wire level so that
/// missing fields are reported per field instead of as a decode error.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "ada")]
    pub username: Option<String>,
    #[schema(example = "S3cur3P@ssword!")]
    pub password: Option<String>,
    #[schema(example = "S3cur3P@ssword!")]
    pub password2: Option<String>,
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    #[schema(example = "Ada")]
    pub first_name: Option<String>,
    #[schema(example = "Lovelace")]
    pub last_name: Option<String>,
    #[schema(example = "Developer")]
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada")]
    pub username: Option<String>,
    #[schema(example = "S3cur3P@ssword!")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b")]
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
