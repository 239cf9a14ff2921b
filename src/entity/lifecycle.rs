// Lifecycle preparation: Unvalidated -> Validated -> Prepared -> Persisted
use thiserror::Error;
use uuid::Uuid;

use crate::entity::validation::{Operation, Validate, ValidationResult};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrepareError {
    #[error("Hashing error: {0}")]
    HashingError(String),
}

/// Irreversible hashing of secret fields
pub trait SecretHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PrepareError>;

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, PrepareError>;
}

/// bcrypt hasher at a fixed cost
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl SecretHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PrepareError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| PrepareError::HashingError(e.to_string()))
    }

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, PrepareError> {
        bcrypt::verify(plaintext, hashed).map_err(|e| PrepareError::HashingError(e.to_string()))
    }
}

/// Normalize human-entered text and stamp timestamps. Text is escaped with
/// [`sanitize`], which leaves existing entities alone, so preparing a value
/// read back from storage does not change it.
pub trait Prepare {
    fn prepare(&mut self);
}

/// Derive persistence-only fields: identifier and hashed secrets.
///
/// Implementations must compute everything fallible first and mutate the
/// entity only once nothing can fail, so an `Err` leaves it untouched.
pub trait BeforeSave {
    fn before_save(&mut self, hasher: &dyn SecretHasher) -> Result<(), PrepareError>;
}

/// An entity whose rule set for one operation came back empty
#[derive(Debug, Clone)]
pub struct Validated<T> {
    entity: T,
    operation: Operation,
}

impl<T: Validate> Validated<T> {
    pub fn check(entity: T, operation: Operation) -> Result<Self, ValidationResult> {
        let errors = entity.validate(operation);
        if errors.is_empty() {
            Ok(Self { entity, operation })
        } else {
            Err(errors)
        }
    }
}

impl<T> Validated<T> {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }
}

impl<T: Prepare> Validated<T> {
    pub fn prepare(mut self) -> Prepared<T> {
        self.entity.prepare();
        Prepared { entity: self.entity }
    }
}

/// A validated entity that has been normalized and is ready for storage
#[derive(Debug, Clone)]
pub struct Prepared<T> {
    entity: T,
}

impl<T: BeforeSave> Prepared<T> {
    /// On failure the entity is dropped; it never reaches storage.
    pub fn before_save(mut self, hasher: &dyn SecretHasher) -> Result<Self, PrepareError> {
        self.entity.before_save(hasher)?;
        Ok(self)
    }
}

impl<T> Prepared<T> {
    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn into_inner(self) -> T {
        self.entity
    }
}

/// Trim surrounding whitespace, then escape HTML-significant characters
pub fn sanitize(value: &str) -> String {
    escape_html(value.trim())
}

// Entities emitted by `escape_html`
const ENTITIES: [&str; 5] = ["&lt;", "&gt;", "&amp;", "&#39;", "&#34;"];

/// Idempotent: an `&` that already starts one of the emitted entities is kept
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' if ENTITIES.iter().any(|entity| value[i..].starts_with(entity)) => escaped.push('&'),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&#34;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Identifier to store: the existing one, or a fresh v4 when absent
pub fn resolve_uuid(current: Option<Uuid>) -> Uuid {
    current.unwrap_or_else(Uuid::new_v4)
}
