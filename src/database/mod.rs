pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use manager::DatabaseError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{
    dedup_uuids, Page, PageMeta, PermissionRepository, RoleRepository, SharedStore, Store, UserRepository,
};
