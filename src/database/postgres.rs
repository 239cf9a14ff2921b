use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::{self, DatabaseError};
use crate::database::repository::{
    dedup_uuids, require_uuid, Page, PermissionRepository, RoleRepository, Store, UserRepository,
};
use crate::entity::{Permission, Role, RolePermission, User, UserRole};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

const USER_COLUMNS: &str =
    "uuid, first_name, last_name, email, phone, password, avatar_uuid, created_at, updated_at, deleted_at";
const ROLE_COLUMNS: &str = "uuid, name, created_at, updated_at, deleted_at";
const PERMISSION_COLUMNS: &str = "uuid, module_key, permission_key, description, created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct UserRow {
    uuid: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    password: String,
    avatar_uuid: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            uuid: Some(row.uuid),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            password: row.password,
            avatar_uuid: row.avatar_uuid,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            user_roles: Vec::new(),
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    uuid: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            uuid: Some(row.uuid),
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            role_permissions: Vec::new(),
        }
    }
}

#[derive(FromRow)]
struct PermissionRow {
    uuid: Uuid,
    module_key: String,
    permission_key: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            uuid: Some(row.uuid),
            module_key: row.module_key,
            permission_key: row.permission_key,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserRoleRow {
    user_role_uuid: Uuid,
    user_uuid: Uuid,
    #[sqlx(flatten)]
    role: RoleRow,
}

#[derive(FromRow)]
struct RolePermissionRow {
    role_permission_uuid: Uuid,
    role_uuid: Uuid,
    #[sqlx(flatten)]
    permission: PermissionRow,
}

/// Map constraint violations onto domain errors
fn map_write_error(err: sqlx::Error, what: &str) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return DatabaseError::Conflict(format!("{} already exists", what)),
            Some(FOREIGN_KEY_VIOLATION) => return DatabaseError::NotFound(format!("{} reference not found", what)),
            _ => {}
        }
    }
    DatabaseError::Sqlx(err)
}

fn total(count: i64) -> u64 {
    count.max(0) as u64
}

/// LIMIT/OFFSET argument; values past `i64::MAX` clamp to it
fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let uuid = require_uuid(user.uuid, "user")?;
        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL) RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&query)
            .bind(uuid)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.password)
            .bind(user.avatar_uuid)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "user email"))?;
        Ok(row.into())
    }

    async fn update_user(&self, uuid: Uuid, user: &User) -> Result<User, DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4, phone = $5, updated_at = $6 \
             WHERE uuid = $1 AND deleted_at IS NULL",
        )
        .bind(uuid)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "user email"))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", uuid)));
        }
        self.get_user(uuid).await
    }

    async fn update_user_password(&self, uuid: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET password = $2, updated_at = now() WHERE uuid = $1 AND deleted_at IS NULL",
        )
        .bind(uuid)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", uuid)));
        }
        Ok(())
    }

    async fn delete_user(&self, uuid: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET deleted_at = now() WHERE uuid = $1 AND deleted_at IS NULL")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", uuid)));
        }
        Ok(())
    }

    async fn get_user(&self, uuid: Uuid) -> Result<User, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE uuid = $1 AND deleted_at IS NULL");
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        let mut user: User = row
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", uuid)))?
            .into();

        let roles: Vec<UserRoleRow> = sqlx::query_as(
            "SELECT ur.uuid AS user_role_uuid, ur.user_uuid, r.uuid, r.name, r.created_at, r.updated_at, r.deleted_at \
             FROM user_roles ur JOIN roles r ON r.uuid = ur.role_uuid \
             WHERE ur.user_uuid = $1 AND r.deleted_at IS NULL ORDER BY r.name",
        )
        .bind(uuid)
        .fetch_all(&self.pool)
        .await?;

        user.user_roles = roles
            .into_iter()
            .map(|row| UserRole {
                uuid: Some(row.user_role_uuid),
                user_uuid: row.user_uuid,
                role_uuid: row.role.uuid,
                role: Some(row.role.into()),
            })
            .collect();
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self, page: Page) -> Result<(Vec<User>, u64), DatabaseError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows: Vec<UserRow> = sqlx::query_as(&query)
            .bind(to_bigint(page.limit()))
            .bind(to_bigint(page.offset()))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok((rows.into_iter().map(User::from).collect(), total(count)))
    }

    async fn set_user_roles(&self, user_uuid: Uuid, role_uuids: &[Uuid]) -> Result<(), DatabaseError> {
        let role_uuids = dedup_uuids(role_uuids);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_roles WHERE user_uuid = $1")
            .bind(user_uuid)
            .execute(&mut *tx)
            .await?;
        for role_uuid in &role_uuids {
            sqlx::query("INSERT INTO user_roles (uuid, user_uuid, role_uuid) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(user_uuid)
                .bind(role_uuid)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_write_error(e, "role"))?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for PgStore {
    async fn create_role(&self, role: &Role) -> Result<Role, DatabaseError> {
        let uuid = require_uuid(role.uuid, "role")?;
        let query = format!(
            "INSERT INTO roles ({ROLE_COLUMNS}) VALUES ($1, $2, $3, $4, NULL) RETURNING {ROLE_COLUMNS}"
        );
        let row: RoleRow = sqlx::query_as(&query)
            .bind(uuid)
            .bind(&role.name)
            .bind(role.created_at)
            .bind(role.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "role name"))?;
        Ok(row.into())
    }

    async fn update_role(&self, uuid: Uuid, role: &Role) -> Result<Role, DatabaseError> {
        let result = sqlx::query(
            "UPDATE roles SET name = $2, updated_at = $3 WHERE uuid = $1 AND deleted_at IS NULL",
        )
        .bind(uuid)
        .bind(&role.name)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "role name"))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("role {}", uuid)));
        }
        self.get_role(uuid).await
    }

    async fn delete_role(&self, uuid: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE roles SET deleted_at = now() WHERE uuid = $1 AND deleted_at IS NULL")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("role {}", uuid)));
        }
        Ok(())
    }

    async fn get_role(&self, uuid: Uuid) -> Result<Role, DatabaseError> {
        let query = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE uuid = $1 AND deleted_at IS NULL");
        let row: Option<RoleRow> = sqlx::query_as(&query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        let mut role: Role = row
            .ok_or_else(|| DatabaseError::NotFound(format!("role {}", uuid)))?
            .into();

        let permissions: Vec<RolePermissionRow> = sqlx::query_as(
            "SELECT rp.uuid AS role_permission_uuid, rp.role_uuid, p.uuid, p.module_key, p.permission_key, \
             p.description, p.created_at, p.updated_at \
             FROM role_permissions rp JOIN permissions p ON p.uuid = rp.permission_uuid \
             WHERE rp.role_uuid = $1 ORDER BY p.module_key, p.permission_key",
        )
        .bind(uuid)
        .fetch_all(&self.pool)
        .await?;

        role.role_permissions = permissions
            .into_iter()
            .map(|row| RolePermission {
                uuid: Some(row.role_permission_uuid),
                role_uuid: row.role_uuid,
                permission_uuid: row.permission.uuid,
                permission: Some(row.permission.into()),
            })
            .collect();
        Ok(role)
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError> {
        let query = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1 AND deleted_at IS NULL");
        let row: Option<RoleRow> = sqlx::query_as(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Role::from))
    }

    async fn list_roles(&self, page: Page) -> Result<(Vec<Role>, u64), DatabaseError> {
        let query = format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows: Vec<RoleRow> = sqlx::query_as(&query)
            .bind(to_bigint(page.limit()))
            .bind(to_bigint(page.offset()))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok((rows.into_iter().map(Role::from).collect(), total(count)))
    }

    async fn set_role_permissions(&self, role_uuid: Uuid, permission_uuids: &[Uuid]) -> Result<(), DatabaseError> {
        let permission_uuids = dedup_uuids(permission_uuids);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_uuid = $1")
            .bind(role_uuid)
            .execute(&mut *tx)
            .await?;
        for permission_uuid in &permission_uuids {
            sqlx::query("INSERT INTO role_permissions (uuid, role_uuid, permission_uuid) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(role_uuid)
                .bind(permission_uuid)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_write_error(e, "permission"))?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for PgStore {
    async fn create_permission(&self, permission: &Permission) -> Result<Permission, DatabaseError> {
        let uuid = require_uuid(permission.uuid, "permission")?;
        let query = format!(
            "INSERT INTO permissions ({PERMISSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PERMISSION_COLUMNS}"
        );
        let row: PermissionRow = sqlx::query_as(&query)
            .bind(uuid)
            .bind(&permission.module_key)
            .bind(&permission.permission_key)
            .bind(&permission.description)
            .bind(permission.created_at)
            .bind(permission.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "permission key"))?;
        Ok(row.into())
    }

    async fn get_permission(&self, uuid: Uuid) -> Result<Permission, DatabaseError> {
        let query = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE uuid = $1");
        let row: Option<PermissionRow> = sqlx::query_as(&query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Permission::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("permission {}", uuid)))
    }

    async fn get_permission_by_key(
        &self,
        module_key: &str,
        permission_key: &str,
    ) -> Result<Option<Permission>, DatabaseError> {
        let query = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE module_key = $1 AND permission_key = $2"
        );
        let row: Option<PermissionRow> = sqlx::query_as(&query)
            .bind(module_key)
            .bind(permission_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Permission::from))
    }

    async fn list_permissions(&self, page: Page) -> Result<(Vec<Permission>, u64), DatabaseError> {
        let query = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY module_key, permission_key LIMIT $1 OFFSET $2"
        );
        let rows: Vec<PermissionRow> = sqlx::query_as(&query)
            .bind(to_bigint(page.limit()))
            .bind(to_bigint(page.offset()))
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&self.pool)
            .await?;
        Ok((rows.into_iter().map(Permission::from).collect(), total(count)))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        manager::health_check(&self.pool).await
    }
}
