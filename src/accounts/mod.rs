//! Registration, login and the account bootstrap shared by every creation path.

pub mod password;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Actor, Role};
use crate::errors::{AppError, AppResult, FieldErrors};
use crate::models::user::{DbUser, LoginRequest, Profile, RegisterRequest, User};
use crate::token;
use crate::utils::{hash_password, utc_now, verify_password};

const REQUIRED: &str = "This field is required.";
const USERNAME_MAX_LENGTH: usize = 150;
pub(crate) const USERNAME_TAKEN: &str = "A user with that username already exists.";
const EMAIL_TAKEN: &str = "This field must be unique.";

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, role, is_active, date_joined";

/// Everything needed to insert an account row.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub password_hash: String,
}

/// Inserts the account and issues its single token.
pub async fn create_account(pool: &SqlitePool, account: NewAccount) -> AppResult<User> {
    insert_account(pool, account, false).await
}

/// With `unique_email` the insert only happens when no account holds the
/// address yet; the check and the write are one statement.
async fn insert_account(pool: &SqlitePool, account: NewAccount, unique_email: bool) -> AppResult<User> {
    let user_id = Uuid::new_v4();

    let inserted = sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, first_name, last_name, role, is_active, date_joined) \
         SELECT ?, ?, ?, ?, ?, ?, ?, 1, ? \
         WHERE NOT ? OR NOT EXISTS (SELECT 1 FROM users WHERE email = ?)",
    )
    .bind(user_id)
    .bind(&account.username)
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(account.role.as_str())
    .bind(utc_now())
    .bind(unique_email)
    .bind(&account.email)
    .execute(pool)
    .await
    .map_err(username_conflict)?;

    if inserted.rows_affected() == 0 {
        return Err(AppError::Validation(FieldErrors::single("email", EMAIL_TAKEN)));
    }

    token::get_or_create(pool, user_id).await?;

    tracing::info!(user_id = %user_id, username = %account.username, role = %account.role, "account created");

    fetch_user(pool, user_id).await?.try_into()
}

/// A lost race on `users.username` surfaces as a field error, not a 500.
pub(crate) fn username_conflict(err: sqlx::Error) -> AppError {
    let duplicate = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation() && db.message().contains("users.username"));

    if duplicate {
        AppError::Validation(FieldErrors::single("username", USERNAME_TAKEN))
    } else {
        AppError::Database(err)
    }
}

pub async fn fetch_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(AppError::missing)
}

async fn fetch_user_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Exact, case-sensitive match. `exclude` skips the row being updated.
pub async fn username_taken(pool: &SqlitePool, username: &str, exclude: Option<Uuid>) -> AppResult<bool> {
    let count: i64 = match exclude {
        Some(id) => {
            sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE username = ? AND id <> ?")
                .bind(username)
                .bind(id)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE username = ?")
                .bind(username)
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count > 0)
}

async fn email_taken(pool: &SqlitePool, email: &str) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Letters, digits and `@.+-_`, at most 150 characters.
pub fn username_problem(username: &str) -> Option<String> {
    if username.is_empty() {
        return Some("This field may not be blank.".to_string());
    }
    if username.chars().count() > USERNAME_MAX_LENGTH {
        return Some(format!(
            "Ensure this field has no more than {USERNAME_MAX_LENGTH} characters."
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    None
}

pub fn is_valid_email(email: &str) -> bool {
    email.parse::<lettre::Address>().is_ok()
}

fn required<'a>(errors: &mut FieldErrors, field: &str, value: &'a Option<String>) -> Option<&'a str> {
    match value.as_deref() {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some("") => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Some(value) => Some(value),
    }
}

/// Self-service registration. Open to anonymous callers.
///
/// Field checks run first and are reported together; the password
/// confirmation is only compared once every field is individually valid.
pub async fn register(pool: &SqlitePool, request: RegisterRequest) -> AppResult<User> {
    let mut errors = FieldErrors::new();

    let username = required(&mut errors, "username", &request.username);
    let email = required(&mut errors, "email", &request.email);
    let password = required(&mut errors, "password", &request.password);
    let password2 = required(&mut errors, "password2", &request.password2);

    if let Some(username) = username {
        if let Some(problem) = username_problem(username) {
            errors.add("username", problem);
        } else if username_taken(pool, username, None).await? {
            errors.add("username", USERNAME_TAKEN);
        }
    }

    if let Some(email) = email {
        if !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        } else if email_taken(pool, email).await? {
            errors.add("email", EMAIL_TAKEN);
        }
    }

    if let Some(password) = password {
        let attributes = [username.unwrap_or_default(), email.unwrap_or_default()];
        for problem in password::validate(password, &attributes) {
            errors.add("password", problem);
        }
    }

    let role = match request.role.as_deref() {
        None => Role::default(),
        Some(label) => match label.parse::<Role>() {
            Ok(role) => role,
            Err(err) => {
                errors.add("role", err.to_string());
                Role::default()
            }
        },
    };

    errors.into_result()?;

    // Every field above is present when there are no errors.
    let (Some(username), Some(email), Some(password), Some(password2)) = (username, email, password, password2) else {
        return Err(AppError::internal("registration fields missing after validation"));
    };

    if password != password2 {
        return Err(AppError::Validation(FieldErrors::single(
            "password",
            "Passwords didn't match.",
        )));
    }

    let account = NewAccount {
        username: username.to_string(),
        email: email.to_string(),
        first_name: request.first_name.unwrap_or_default(),
        last_name: request.last_name.unwrap_or_default(),
        role,
        password_hash: hash_password(password)?,
    };

    insert_account(pool, account, true).await
}

/// Exchanges credentials for the account's token, creating it lazily.
pub async fn login(pool: &SqlitePool, request: LoginRequest) -> AppResult<String> {
    let mut errors = FieldErrors::new();
    let username = required(&mut errors, "username", &request.username);
    let password = required(&mut errors, "password", &request.password);
    errors.into_result()?;

    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::internal("login fields missing after validation"));
    };

    let rejected = || {
        AppError::Validation(FieldErrors::single(
            "non_field_errors",
            "Unable to log in with provided credentials.",
        ))
    };

    let user = fetch_user_by_username(pool, username).await?.ok_or_else(rejected)?;

    if !verify_password(password, &user.password_hash)? || !user.is_active {
        tracing::info!(username = %username, "login rejected");
        return Err(rejected());
    }

    let key = token::get_or_create(pool, user.id).await?;
    tracing::info!(user_id = %user.id, "login succeeded");
    Ok(key)
}

pub async fn profile(pool: &SqlitePool, actor: &Actor) -> AppResult<Profile> {
    let identity = actor
        .identity()
        .ok_or_else(|| AppError::unauthorized("Authentication credentials were not provided."))?;

    let user: User = fetch_user(pool, identity.user_id).await?.try_into()?;
    Ok(user.into())
}
