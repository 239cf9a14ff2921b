use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::{
    dedup_uuids, require_uuid, Page, PermissionRepository, RoleRepository, Store, UserRepository,
};
use crate::entity::{Permission, Role, RolePermission, User, UserRole};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    user_roles: Vec<UserRole>,
    role_permissions: Vec<RolePermission>,
}

impl Tables {
    fn live_user(&self, uuid: Uuid) -> Result<&User, DatabaseError> {
        self.users
            .get(&uuid)
            .filter(|user| user.deleted_at.is_none())
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", uuid)))
    }

    fn live_role(&self, uuid: Uuid) -> Result<&Role, DatabaseError> {
        self.roles
            .get(&uuid)
            .filter(|role| role.deleted_at.is_none())
            .ok_or_else(|| DatabaseError::NotFound(format!("role {}", uuid)))
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email == email && u.uuid != except)
    }

    fn role_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|r| r.deleted_at.is_none() && r.name == name && r.uuid != except)
    }

    fn resolve_user(&self, user: &User) -> User {
        let mut resolved = user.clone();
        let mut user_roles: Vec<UserRole> = self
            .user_roles
            .iter()
            .filter(|ur| Some(ur.user_uuid) == user.uuid)
            .filter_map(|ur| {
                let role = self.live_role(ur.role_uuid).ok()?;
                Some(UserRole {
                    role: Some(role.clone()),
                    ..ur.clone()
                })
            })
            .collect();
        user_roles.sort_by(|a, b| role_name(a.role.as_ref()).cmp(role_name(b.role.as_ref())));
        resolved.user_roles = user_roles;
        resolved
    }

    fn resolve_role(&self, role: &Role) -> Role {
        let mut resolved = role.clone();
        let mut role_permissions: Vec<RolePermission> = self
            .role_permissions
            .iter()
            .filter(|rp| Some(rp.role_uuid) == role.uuid)
            .filter_map(|rp| {
                let permission = self.permissions.get(&rp.permission_uuid)?;
                Some(RolePermission {
                    permission: Some(permission.clone()),
                    ..rp.clone()
                })
            })
            .collect();
        role_permissions.sort_by_key(|rp| rp.permission.as_ref().map(Permission::key));
        resolved.role_permissions = role_permissions;
        resolved
    }
}

fn role_name(role: Option<&Role>) -> &str {
    role.map(|r| r.name.as_str()).unwrap_or_default()
}

/// Order rows with `sort`, then slice out the requested page
fn paginate<T: Clone>(mut rows: Vec<T>, page: Page, sort: impl Fn(&T, &T) -> std::cmp::Ordering) -> (Vec<T>, u64) {
    rows.sort_by(sort);
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
        .collect();
    (items, total)
}

/// Process-local store used by tests and `serve --in-memory`
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let uuid = require_uuid(user.uuid, "user")?;
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&uuid) || tables.email_taken(&user.email, None) {
            return Err(DatabaseError::Conflict("user email already exists".to_string()));
        }
        let mut stored = user.clone();
        stored.user_roles.clear();
        tables.users.insert(uuid, stored.clone());
        Ok(stored)
    }

    async fn update_user(&self, uuid: Uuid, user: &User) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.live_user(uuid)?;
        if tables.email_taken(&user.email, Some(uuid)) {
            return Err(DatabaseError::Conflict("user email already exists".to_string()));
        }
        let updated = {
            let Some(stored) = tables.users.get_mut(&uuid) else {
                return Err(DatabaseError::NotFound(format!("user {}", uuid)));
            };
            stored.first_name = user.first_name.clone();
            stored.last_name = user.last_name.clone();
            stored.email = user.email.clone();
            stored.phone = user.phone.clone();
            stored.updated_at = user.updated_at;
            stored.clone()
        };
        Ok(tables.resolve_user(&updated))
    }

    async fn update_user_password(&self, uuid: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.live_user(uuid)?;
        if let Some(stored) = tables.users.get_mut(&uuid) {
            stored.password = password_hash.to_string();
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_user(&self, uuid: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.live_user(uuid)?;
        if let Some(stored) = tables.users.get_mut(&uuid) {
            stored.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_user(&self, uuid: Uuid) -> Result<User, DatabaseError> {
        let tables = self.tables.read().await;
        let user = tables.live_user(uuid)?;
        Ok(tables.resolve_user(user))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email == email)
            .cloned())
    }

    async fn list_users(&self, page: Page) -> Result<(Vec<User>, u64), DatabaseError> {
        let tables = self.tables.read().await;
        let live = tables
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect();
        Ok(paginate(live, page, |a, b| b.created_at.cmp(&a.created_at)))
    }

    async fn set_user_roles(&self, user_uuid: Uuid, role_uuids: &[Uuid]) -> Result<(), DatabaseError> {
        let role_uuids = dedup_uuids(role_uuids);
        let mut tables = self.tables.write().await;
        tables.live_user(user_uuid)?;
        for role_uuid in &role_uuids {
            tables.live_role(*role_uuid)?;
        }
        tables.user_roles.retain(|ur| ur.user_uuid != user_uuid);
        for role_uuid in role_uuids {
            tables.user_roles.push(UserRole {
                uuid: Some(Uuid::new_v4()),
                user_uuid,
                role_uuid,
                role: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn create_role(&self, role: &Role) -> Result<Role, DatabaseError> {
        let uuid = require_uuid(role.uuid, "role")?;
        let mut tables = self.tables.write().await;
        if tables.roles.contains_key(&uuid) || tables.role_name_taken(&role.name, None) {
            return Err(DatabaseError::Conflict("role name already exists".to_string()));
        }
        let mut stored = role.clone();
        stored.role_permissions.clear();
        tables.roles.insert(uuid, stored.clone());
        Ok(stored)
    }

    async fn update_role(&self, uuid: Uuid, role: &Role) -> Result<Role, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.live_role(uuid)?;
        if tables.role_name_taken(&role.name, Some(uuid)) {
            return Err(DatabaseError::Conflict("role name already exists".to_string()));
        }
        let updated = {
            let Some(stored) = tables.roles.get_mut(&uuid) else {
                return Err(DatabaseError::NotFound(format!("role {}", uuid)));
            };
            stored.name = role.name.clone();
            stored.updated_at = role.updated_at;
            stored.clone()
        };
        Ok(tables.resolve_role(&updated))
    }

    async fn delete_role(&self, uuid: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.live_role(uuid)?;
        if let Some(stored) = tables.roles.get_mut(&uuid) {
            stored.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_role(&self, uuid: Uuid) -> Result<Role, DatabaseError> {
        let tables = self.tables.read().await;
        let role = tables.live_role(uuid)?;
        Ok(tables.resolve_role(role))
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .values()
            .find(|r| r.deleted_at.is_none() && r.name == name)
            .cloned())
    }

    async fn list_roles(&self, page: Page) -> Result<(Vec<Role>, u64), DatabaseError> {
        let tables = self.tables.read().await;
        let live = tables
            .roles
            .values()
            .filter(|r| r.deleted_at.is_none())
            .cloned()
            .collect();
        Ok(paginate(live, page, |a, b| b.created_at.cmp(&a.created_at)))
    }

    async fn set_role_permissions(&self, role_uuid: Uuid, permission_uuids: &[Uuid]) -> Result<(), DatabaseError> {
        let permission_uuids = dedup_uuids(permission_uuids);
        let mut tables = self.tables.write().await;
        tables.live_role(role_uuid)?;
        if let Some(missing) = permission_uuids.iter().find(|p| !tables.permissions.contains_key(*p)) {
            return Err(DatabaseError::NotFound(format!("permission {}", missing)));
        }
        tables.role_permissions.retain(|rp| rp.role_uuid != role_uuid);
        for permission_uuid in permission_uuids {
            tables.role_permissions.push(RolePermission {
                uuid: Some(Uuid::new_v4()),
                role_uuid,
                permission_uuid,
                permission: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for MemoryStore {
    async fn create_permission(&self, permission: &Permission) -> Result<Permission, DatabaseError> {
        let uuid = require_uuid(permission.uuid, "permission")?;
        let mut tables = self.tables.write().await;
        let duplicate = tables.permissions.values().any(|p| {
            p.module_key == permission.module_key && p.permission_key == permission.permission_key
        });
        if duplicate || tables.permissions.contains_key(&uuid) {
            return Err(DatabaseError::Conflict(format!("permission {} already exists", permission.key())));
        }
        tables.permissions.insert(uuid, permission.clone());
        Ok(permission.clone())
    }

    async fn get_permission(&self, uuid: Uuid) -> Result<Permission, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .permissions
            .get(&uuid)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("permission {}", uuid)))
    }

    async fn get_permission_by_key(
        &self,
        module_key: &str,
        permission_key: &str,
    ) -> Result<Option<Permission>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .find(|p| p.module_key == module_key && p.permission_key == permission_key)
            .cloned())
    }

    async fn list_permissions(&self, page: Page) -> Result<(Vec<Permission>, u64), DatabaseError> {
        let tables = self.tables.read().await;
        let all = tables.permissions.values().cloned().collect();
        Ok(paginate(all, page, |a, b| a.key().cmp(&b.key())))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
