// Development data: default roles, CRUD permissions and a handful of fake users
use fake::faker::internet::raw::{Password, SafeEmail};
use fake::faker::name::raw::{FirstName, LastName};
use fake::faker::phone_number::raw::PhoneNumber;
use fake::locales::EN;
use fake::Fake;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::{DatabaseError, Page, Store};
use crate::entity::{Operation, Permission, PrepareError, Role, SecretHasher, User, Validated};

pub const FAKE_USER_COUNT: usize = 5;

pub const SUPER_ADMINISTRATOR: &str = "Super Administrator";
pub const ADMIN: &str = "Admin";
pub const USER: &str = "User";

const MODULES: [&str; 3] = ["users", "roles", "permissions"];
const ACTIONS: [&str; 4] = ["create", "read", "update", "delete"];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error("Generated {entity} failed validation: {fields}")]
    Invalid { entity: String, fields: String },

    #[error("Seed task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Rows created by a seed run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub permissions: usize,
    pub roles: usize,
    pub users: usize,
}

/// Seed everything. Existing permissions and roles are left alone, and fake
/// users are only generated into an empty user table.
pub async fn run(store: &dyn Store, hasher: Arc<dyn SecretHasher>) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    let permissions = seed_permissions(store, hasher.as_ref(), &mut report).await?;
    seed_roles(store, hasher.as_ref(), &permissions, &mut report).await?;
    seed_users(store, hasher, &mut report).await?;

    info!(
        permissions = report.permissions,
        roles = report.roles,
        users = report.users,
        "Seeding finished"
    );
    Ok(report)
}

fn validated<T: crate::entity::Validate>(entity: T, name: &str) -> Result<Validated<T>, SeedError> {
    Validated::check(entity, Operation::Create).map_err(|errors| SeedError::Invalid {
        entity: name.to_string(),
        fields: errors
            .iter()
            .map(|e| e.field.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

async fn seed_permissions(
    store: &dyn Store,
    hasher: &dyn SecretHasher,
    report: &mut SeedReport,
) -> Result<Vec<Permission>, SeedError> {
    let mut seeded = Vec::new();
    for module in MODULES {
        for action in ACTIONS {
            if let Some(existing) = store.get_permission_by_key(module, action).await? {
                seeded.push(existing);
                continue;
            }
            let description = format!("Allow {} on {}", action, module);
            let permission = validated(Permission::new(module, action, &description), "permission")?
                .prepare()
                .before_save(hasher)?
                .into_inner();
            let created = store.create_permission(&permission).await?;
            debug!("Created permission {}", created.key());
            report.permissions += 1;
            seeded.push(created);
        }
    }
    Ok(seeded)
}

/// Whether a freshly seeded role is granted `permission`
fn grants(role: &str, permission: &Permission) -> bool {
    match role {
        SUPER_ADMINISTRATOR => true,
        ADMIN => permission.module_key == "users" || permission.permission_key == "read",
        _ => false,
    }
}

async fn seed_roles(
    store: &dyn Store,
    hasher: &dyn SecretHasher,
    permissions: &[Permission],
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    for name in [SUPER_ADMINISTRATOR, ADMIN, USER] {
        if store.get_role_by_name(name).await?.is_some() {
            debug!("Role {} already exists", name);
            continue;
        }
        let role = Role {
            name: name.to_string(),
            ..Default::default()
        };
        let role = validated(role, "role")?
            .prepare()
            .before_save(hasher)?
            .into_inner();
        let created = store.create_role(&role).await?;

        let granted: Vec<Uuid> = permissions
            .iter()
            .filter(|permission| grants(name, permission))
            .filter_map(|permission| permission.uuid)
            .collect();
        if let Some(uuid) = created.uuid {
            store.set_role_permissions(uuid, &granted).await?;
        }
        info!("Created role {} with {} permissions", name, granted.len());
        report.roles += 1;
    }
    Ok(())
}

fn fake_user() -> User {
    User {
        first_name: FirstName(EN).fake(),
        last_name: LastName(EN).fake(),
        email: SafeEmail(EN).fake(),
        phone: Some(PhoneNumber(EN).fake()),
        password: Password(EN, 8..16).fake(),
        ..Default::default()
    }
}

async fn seed_users(store: &dyn Store, hasher: Arc<dyn SecretHasher>, report: &mut SeedReport) -> Result<(), SeedError> {
    let (_, existing) = store.list_users(Page::default()).await?;
    if existing > 0 {
        info!("Skipping fake users; {} users already exist", existing);
        return Ok(());
    }

    while report.users < FAKE_USER_COUNT {
        let user = fake_user();
        if store.get_user_by_email(&user.email).await?.is_some() {
            continue;
        }
        let name = user.full_name();
        let prepared = validated(user, "user")?.prepare();

        let hasher = hasher.clone();
        let user = tokio::task::spawn_blocking(move || prepared.before_save(hasher.as_ref()))
            .await??
            .into_inner();
        store.create_user(&user).await?;
        info!("Create {}", name);
        report.users += 1;
    }
    Ok(())
}
