use async_trait::async_trait;
use parking_lot::RwLock;
use shared::{AppError, Permission, Result, Role};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A user as seen by the permission checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    /// `None` when the stored role id is not one we know; such users hold no permissions.
    pub role: Option<Role>,
    pub school_id: Option<i32>,
    pub deactivated: bool,
}

impl User {
    pub fn authorize(&self, permission: Permission) -> Result<()> {
        if self.deactivated {
            warn!(user_id = %self.id, "Deactivated user attempted {}", permission);
            return Err(AppError::authorization("User account is deactivated"));
        }

        let allowed = self.role.is_some_and(|role| role.has_permission(permission));
        if !allowed {
            warn!(user_id = %self.id, role = ?self.role, "Permission `{}` denied", permission);
            return Err(AppError::authorization(format!(
                "User does not have permission `{}`",
                permission
            )));
        }

        debug!(user_id = %self.id, "Permission `{}` granted", permission);
        Ok(())
    }
}

/// Resolves token subjects to users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Like `find_user`, but an unknown subject is an authentication failure.
    async fn resolve_user(&self, user_id: &str) -> Result<User> {
        self.find_user(user_id)
            .await?
            .ok_or_else(|| AppError::authentication("User not found"))
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    role_id: i32,
    school_id: Option<i32>,
    deactivated: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            role: Role::from_id(row.role_id),
            school_id: row.school_id,
            deactivated: row.deactivated,
        }
    }
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, role_id, school_id, deactivated FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.write().insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.read().get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<Role>, deactivated: bool) -> User {
        User {
            id: "user-1".to_string(),
            username: "principal".to_string(),
            role,
            school_id: Some(5),
            deactivated,
        }
    }

    #[test]
    fn test_principal_can_write_local_reports() {
        assert!(user(Some(Role::Principal), false)
            .authorize(Permission::ReportsLocalWrite)
            .is_ok());
    }

    #[test]
    fn test_superintendent_cannot_write_local_reports() {
        let err = user(Some(Role::Superintendent), false)
            .authorize(Permission::ReportsLocalWrite)
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization { .. }));
        assert!(err.to_string().contains("reports:local:write"));
    }

    #[test]
    fn test_deactivated_user_is_denied() {
        assert!(user(Some(Role::Principal), true)
            .authorize(Permission::ReportsLocalRead)
            .is_err());
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        assert!(user(None, false).authorize(Permission::ReportsLocalRead).is_err());
    }

    #[test]
    fn test_row_with_unknown_role_id() {
        let user = User::from(UserRow {
            id: "u".to_string(),
            username: "u".to_string(),
            role_id: 42,
            school_id: None,
            deactivated: false,
        });
        assert_eq!(user.role, None);
    }

    #[tokio::test]
    async fn test_resolve_unknown_user_is_authentication_error() {
        let directory = InMemoryUserDirectory::new();
        let err = directory.resolve_user("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication { .. }));

        directory.insert(user(Some(Role::Principal), false));
        assert_eq!(directory.resolve_user("user-1").await.unwrap().username, "principal");
    }
}
