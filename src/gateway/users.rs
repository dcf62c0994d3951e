use super::{required_field, Gateway};
use crate::accounts::{self, password, NewAccount, USER_COLUMNS};
use crate::authz::{Operation, ResourceKind};
use crate::errors::{AppError, AppResult};
use crate::models::user::{self, DbUser, User, UserCreateRequest, UserUpdateRequest};
use crate::models::UpdateMode;
use crate::utils::{hash_password, parse_path_id, unusable_password};

fn check_username(username: &str) -> AppResult<()> {
    match accounts::username_problem(username) {
        Some(problem) => Err(AppError::bad_request(format!("username: {problem}"))),
        None => Ok(()),
    }
}

fn check_email(email: &str) -> AppResult<()> {
    if !email.is_empty() && !accounts::is_valid_email(email) {
        return Err(AppError::bad_request("email: Enter a valid email address."));
    }
    Ok(())
}

impl Gateway<'_> {
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.authorize(ResourceKind::User, Operation::Read)?;

        let rows = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY date_joined ASC, rowid ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(user::listable(rows))
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        self.authorize(ResourceKind::User, Operation::Read)?;
        let id = parse_path_id(id)?;
        accounts::fetch_user(self.pool, id).await?.try_into()
    }

    pub async fn create_user(&self, request: UserCreateRequest) -> AppResult<User> {
        self.authorize(ResourceKind::User, Operation::Create)?;

        check_username(&request.username)?;
        if accounts::username_taken(self.pool, &request.username, None).await? {
            return Err(AppError::bad_request(
                "username: A user with that username already exists.",
            ));
        }

        let email = request.email.unwrap_or_default();
        check_email(&email)?;

        let password_hash = match request.password.as_deref() {
            Some(password) => {
                let problems = password::validate(password, &[request.username.as_str(), email.as_str()]);
                if let Some(problem) = problems.into_iter().next() {
                    return Err(AppError::bad_request(format!("password: {problem}")));
                }
                hash_password(password)?
            }
            None => unusable_password(),
        };

        let account = NewAccount {
            username: request.username,
            email,
            first_name: request.first_name.unwrap_or_default(),
            last_name: request.last_name.unwrap_or_default(),
            role: request.role.unwrap_or_default(),
            password_hash,
        };

        accounts::create_account(self.pool, account).await
    }

    pub async fn update_user(&self, id: &str, request: UserUpdateRequest, mode: UpdateMode) -> AppResult<User> {
        self.authorize(ResourceKind::User, Operation::Update)?;
        let id = parse_path_id(id)?;

        let mut user: User = accounts::fetch_user(self.pool, id).await?.try_into()?;

        if mode == UpdateMode::Replace && request.username.is_none() {
            return Err(required_field("username"));
        }

        if let Some(username) = request.username {
            check_username(&username)?;
            if accounts::username_taken(self.pool, &username, Some(id)).await? {
                return Err(AppError::bad_request(
                    "username: A user with that username already exists.",
                ));
            }
            user.username = username;
        }
        if let Some(email) = request.email {
            check_email(&email)?;
            user.email = email;
        }
        if let Some(first_name) = request.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }

        sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?, role = ?, is_active = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(accounts::username_conflict)?;

        tracing::info!(user_id = %id, role = %user.role, is_active = user.is_active, "user updated");
        Ok(user)
    }

    /// Inactive accounts are refused even for admins.
    pub async fn delete_user(&self, id: &str) -> AppResult<()> {
        self.authorize(ResourceKind::User, Operation::Delete)?;
        let id = parse_path_id(id)?;

        let user = accounts::fetch_user(self.pool, id).await?;
        if !user.is_active {
            return Err(AppError::unauthorized("Cannot delete inactive users."));
        }

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        tracing::info!(user_id = %id, username = %user.username, "user deleted");
        Ok(())
    }
}
