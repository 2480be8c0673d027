//! Persistence strategies.
//!
//! Every entity is served through the same [`EntityStore`] contract. The
//! relational store covers all entities; the document store covers members,
//! memberships and products. [`Backend`] is the strategy picked once at
//! startup from [`BackendKind`] and injected into the router state.

pub mod mongo;
pub mod sql;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::admission::Rejection;
use crate::models::{
    Booking, BookingInput, Class, ClassInput, Employee, EmployeeInput, Enrollment, Member,
    MemberInput, Membership, MembershipInput, Product, ProductInput,
};
use crate::settings::Settings;
use crate::validation::{Validate, ValidationError};

pub use mongo::MongoStore;
pub use sql::SqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid {entity} id: {id}")]
    MalformedId { entity: &'static str, id: String },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Logs a storage client error and folds it into a generic failure.
pub(crate) fn failed<E: fmt::Display>(context: String) -> impl FnOnce(E) -> StoreError {
    move |err| {
        error!("{context}: {err}");
        StoreError::Backend(context)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Operation {
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub(crate) fn failure<E: Entity>(self) -> String {
        let verb = match self {
            Operation::Retrieve => return format!("Failed to retrieve {}", E::COLLECTION),
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        format!("Failed to {verb} {}", E::NAME.to_lowercase())
    }
}

/// A stored record type and the payload used to write it.
pub trait Entity: Serialize + Send + Sync + 'static {
    type Input: Validate + Send + Sync + 'static;
    /// What `add` hands back; enrollments also report whether the person was reused.
    type Created: Serialize + Send + 'static;

    const NAME: &'static str;
    const COLLECTION: &'static str;
}

impl Entity for Member {
    type Input = MemberInput;
    type Created = Enrollment<Member>;
    const NAME: &'static str = "Member";
    const COLLECTION: &'static str = "members";
}

impl Entity for Employee {
    type Input = EmployeeInput;
    type Created = Enrollment<Employee>;
    const NAME: &'static str = "Employee";
    const COLLECTION: &'static str = "employees";
}

impl Entity for Membership {
    type Input = MembershipInput;
    type Created = Membership;
    const NAME: &'static str = "Membership";
    const COLLECTION: &'static str = "memberships";
}

impl Entity for Product {
    type Input = ProductInput;
    type Created = Product;
    const NAME: &'static str = "Product";
    const COLLECTION: &'static str = "products";
}

impl Entity for Class {
    type Input = ClassInput;
    type Created = Class;
    const NAME: &'static str = "Class";
    const COLLECTION: &'static str = "classes";
}

impl Entity for Booking {
    type Input = BookingInput;
    type Created = Booking;
    const NAME: &'static str = "Booking";
    const COLLECTION: &'static str = "bookings";
}

/// Uniform CRUD contract. Ids arrive as raw strings; each backend coerces them
/// and reports a malformed id instead of failing the request.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    async fn get_all(&self) -> StoreResult<Vec<E>>;

    async fn get_by_id(&self, id: &str) -> StoreResult<E>;

    async fn add(&self, input: E::Input) -> StoreResult<E::Created>;

    async fn update(&self, id: &str, input: E::Input) -> StoreResult<E>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sql,
    Mongo,
}

impl BackendKind {
    /// Whether members live in the relational store, where bookings reference them.
    ///
    /// Bookings are relational only and carry an integer `member_id` with a
    /// foreign key to the relational `members` table. Under the document
    /// strategy that table stays empty, so every booking is refused with
    /// "Referenced member does not exist".
    pub fn members_bookable(self) -> bool {
        matches!(self, BackendKind::Sql)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sql => f.write_str("sql"),
            BackendKind::Mongo => f.write_str("mongo"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" => Ok(BackendKind::Sql),
            "mongo" => Ok(BackendKind::Mongo),
            other => Err(format!("Invalid database type: {other}")),
        }
    }
}

/// The selected strategy for entities that exist on both backends.
#[derive(Clone)]
pub enum Backend {
    Sql(SqlStore),
    Mongo(MongoStore),
}

impl Backend {
    pub async fn connect(
        kind: BackendKind,
        sql: &SqlStore,
        settings: &Settings,
    ) -> StoreResult<Self> {
        let backend = match kind {
            BackendKind::Sql => Backend::Sql(sql.clone()),
            BackendKind::Mongo => {
                let url = settings.mongo_url.as_ref().ok_or_else(|| {
                    StoreError::Backend("APP_MONGO_URL must be set for the mongo backend".into())
                })?;
                Backend::Mongo(MongoStore::connect(url.as_str(), &settings.mongo_database).await?)
            }
        };
        info!("Using {} persistence strategy", backend.kind());
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Sql(_) => BackendKind::Sql,
            Backend::Mongo(_) => BackendKind::Mongo,
        }
    }

    pub async fn ping(&self) -> StoreResult<()> {
        match self {
            Backend::Sql(store) => store.ping().await,
            Backend::Mongo(store) => store.ping().await,
        }
    }
}

#[async_trait]
impl<E> EntityStore<E> for Backend
where
    E: Entity,
    SqlStore: EntityStore<E>,
    MongoStore: EntityStore<E>,
{
    async fn get_all(&self) -> StoreResult<Vec<E>> {
        match self {
            Backend::Sql(store) => EntityStore::<E>::get_all(store).await,
            Backend::Mongo(store) => EntityStore::<E>::get_all(store).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<E> {
        match self {
            Backend::Sql(store) => EntityStore::<E>::get_by_id(store, id).await,
            Backend::Mongo(store) => EntityStore::<E>::get_by_id(store, id).await,
        }
    }

    async fn add(&self, input: E::Input) -> StoreResult<E::Created> {
        match self {
            Backend::Sql(store) => EntityStore::<E>::add(store, input).await,
            Backend::Mongo(store) => EntityStore::<E>::add(store, input).await,
        }
    }

    async fn update(&self, id: &str, input: E::Input) -> StoreResult<E> {
        match self {
            Backend::Sql(store) => EntityStore::<E>::update(store, id, input).await,
            Backend::Mongo(store) => EntityStore::<E>::update(store, id, input).await,
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        match self {
            Backend::Sql(store) => EntityStore::<E>::delete(store, id).await,
            Backend::Mongo(store) => EntityStore::<E>::delete(store, id).await,
        }
    }
}
