//! Synchronized shared-state capability set.
//!
//! # Responsibility
//! - Define the store contract consumed by board/lobby/view code.
//! - Keep backend choice (in-memory, SQLite) behind one trait seam.
//!
//! # Invariants
//! - Field writes are last-write-wins at single-field granularity; no
//!   cross-field transactional guarantee is offered by the contract.
//! - Collection removal preserves the relative order of surviving items.
//! - Observers are notified after every successful mutation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

pub mod memory;
pub mod sqlite;

/// Stable identifier of one shared record.
pub type RecordId = Uuid;
/// Stable identifier of one shared ordered collection.
pub type CollectionId = Uuid;
/// Stable identifier of one permission group.
pub type GroupId = Uuid;
/// Identity of one connected client handle.
pub type ClientId = Uuid;
/// Handle for one registered change observer.
pub type SubscriptionId = u64;

pub type StoreResult<T> = Result<T, StoreError>;

/// Scalar value held by one shared-record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

/// Grant subject inside a permission group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Open role matching every connected client.
    Everyone,
    /// One specific client identity.
    Client(ClientId),
}

/// Permission level attached to a grant.
///
/// Ordering is meaningful: `Reader < Writer < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    Reader,
    Writer,
    Admin,
}

/// Change notification emitted by a store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    RecordCreated { record: RecordId },
    FieldWritten { record: RecordId, field: String },
    CollectionChanged { collection: CollectionId },
}

/// Callback invoked after every successful mutation, local or remote.
pub type StoreObserver = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Store contract errors.
#[derive(Debug)]
pub enum StoreError {
    RecordNotFound(RecordId),
    CollectionNotFound(CollectionId),
    GroupNotFound(GroupId),
    IndexOutOfBounds {
        collection: CollectionId,
        index: usize,
        len: usize,
    },
    PermissionDenied {
        group: GroupId,
        client: ClientId,
    },
    /// Persisted state failed to decode into contract shapes.
    InvalidData(String),
    /// Backend-specific failure (storage engine, I/O).
    Backend(Box<dyn Error + Send + Sync>),
}

impl StoreError {
    pub(crate) fn backend(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecordNotFound(id) => write!(f, "record not found: {id}"),
            Self::CollectionNotFound(id) => write!(f, "collection not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::IndexOutOfBounds {
                collection,
                index,
                len,
            } => write!(
                f,
                "index {index} out of bounds for collection {collection} of length {len}"
            ),
            Self::PermissionDenied { group, client } => {
                write!(f, "group {group} denies write for client {client}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted store data: {message}"),
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Capability set of an externally-synchronized shared store.
///
/// Implementations replicate records, ordered collections, and permission
/// groups between connected clients with field-granular last-write-wins
/// convergence. This crate ships [`memory::MemoryStore`] (multi-client,
/// in-process) and [`sqlite::SqliteStore`] (single-client, persistent).
pub trait SharedStore {
    /// Identity of this client handle.
    fn client_id(&self) -> ClientId;

    /// Creates an empty permission group created/administered by this client.
    fn create_group(&self) -> StoreResult<GroupId>;

    /// Adds or replaces one grant on a group. Requires admin permission.
    fn add_group_member(
        &self,
        group: GroupId,
        role: Role,
        permission: Permission,
    ) -> StoreResult<()>;

    /// Creates a record owned by `owner` with initial field values.
    fn create_record(
        &self,
        owner: GroupId,
        fields: &[(&str, FieldValue)],
    ) -> StoreResult<RecordId>;

    /// Reads one field. `Ok(None)` when the field was never written.
    fn read_field(&self, record: RecordId, field: &str) -> StoreResult<Option<FieldValue>>;

    /// Writes one field, last-write-wins.
    fn write_field(&self, record: RecordId, field: &str, value: FieldValue) -> StoreResult<()>;

    /// Creates an empty ordered collection owned by `owner`.
    fn create_collection(&self, owner: GroupId) -> StoreResult<CollectionId>;

    /// Returns the owning group of a collection.
    fn collection_owner(&self, collection: CollectionId) -> StoreResult<GroupId>;

    /// Returns collection members in insertion order.
    fn collection_items(&self, collection: CollectionId) -> StoreResult<Vec<RecordId>>;

    /// Appends one record reference to the end of a collection.
    fn append_to_collection(&self, collection: CollectionId, record: RecordId) -> StoreResult<()>;

    /// Removes the item at `index`, preserving the order of the rest.
    fn remove_from_collection(&self, collection: CollectionId, index: usize) -> StoreResult<()>;

    /// Registers a change observer. Observers fire for local mutations and,
    /// where the backend has them, mutations from other client handles.
    fn subscribe(&self, observer: StoreObserver) -> SubscriptionId;

    /// Removes a previously registered observer. Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Evaluates whether `client` holds at least `needed` on a group.
///
/// The creator holds an implicit admin grant. Other clients match either an
/// `Everyone` grant or a grant naming their identity.
pub(crate) fn grant_allows(
    creator: ClientId,
    grants: &[(Role, Permission)],
    client: ClientId,
    needed: Permission,
) -> bool {
    if creator == client {
        return true;
    }
    grants.iter().any(|(role, permission)| {
        *permission >= needed
            && match role {
                Role::Everyone => true,
                Role::Client(id) => *id == client,
            }
    })
}

/// Observer bookkeeping shared by store backends.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: SubscriptionId,
    observers: BTreeMap<SubscriptionId, StoreObserver>,
}

impl ObserverRegistry {
    pub(crate) fn register(&mut self, observer: StoreObserver) -> SubscriptionId {
        self.next_id += 1;
        self.observers.insert(self.next_id, observer);
        self.next_id
    }

    pub(crate) fn remove(&mut self, subscription: SubscriptionId) {
        self.observers.remove(&subscription);
    }

    /// Clones registered observers so they can be invoked outside any lock.
    pub(crate) fn snapshot(&self) -> Vec<StoreObserver> {
        self.observers.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{grant_allows, ClientId, Permission, Role};
    use uuid::Uuid;

    fn client() -> ClientId {
        Uuid::new_v4()
    }

    #[test]
    fn creator_always_passes_grant_check() {
        let creator = client();
        assert!(grant_allows(creator, &[], creator, Permission::Admin));
    }

    #[test]
    fn everyone_writer_grant_allows_writes_but_not_admin() {
        let creator = client();
        let other = client();
        let grants = vec![(Role::Everyone, Permission::Writer)];

        assert!(grant_allows(creator, &grants, other, Permission::Reader));
        assert!(grant_allows(creator, &grants, other, Permission::Writer));
        assert!(!grant_allows(creator, &grants, other, Permission::Admin));
    }

    #[test]
    fn client_grant_only_matches_named_identity() {
        let creator = client();
        let named = client();
        let stranger = client();
        let grants = vec![(Role::Client(named), Permission::Writer)];

        assert!(grant_allows(creator, &grants, named, Permission::Writer));
        assert!(!grant_allows(creator, &grants, stranger, Permission::Reader));
    }
}
