//! In-memory store backend.
//!
//! # Responsibility
//! - Provide the reference [`SharedStore`] implementation for tests and
//!   single-process multi-client scenarios.
//! - Model several connected clients as cheap handles over one shared state.
//!
//! # Invariants
//! - Mutations validate group grants before touching state.
//! - Observer callbacks run after the state lock is released.
//! - Change propagation between client handles is synchronous.

use crate::store::{
    grant_allows, ClientId, CollectionId, FieldValue, GroupId, ObserverRegistry, Permission,
    RecordId, Role, SharedStore, StoreError, StoreEvent, StoreObserver, StoreResult,
    SubscriptionId,
};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

struct GroupEntry {
    creator: ClientId,
    grants: Vec<(Role, Permission)>,
}

struct RecordEntry {
    owner: GroupId,
    fields: HashMap<String, FieldValue>,
}

struct CollectionEntry {
    owner: GroupId,
    items: Vec<RecordId>,
}

#[derive(Default)]
struct SharedState {
    groups: HashMap<GroupId, GroupEntry>,
    records: HashMap<RecordId, RecordEntry>,
    collections: HashMap<CollectionId, CollectionEntry>,
    observers: ObserverRegistry,
}

/// Shared in-memory store; each value is one client handle.
///
/// [`MemoryStore::client`] derives further handles with distinct client
/// identities over the same state, which is how multiple connected clients
/// are modeled in one process.
pub struct MemoryStore {
    state: Arc<Mutex<SharedState>>,
    client: ClientId,
}

impl MemoryStore {
    /// Creates a fresh store with one initial client handle.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SharedState::default())),
            client: Uuid::new_v4(),
        }
    }

    /// Derives another client handle over the same shared state.
    pub fn client(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            client: Uuid::new_v4(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SharedState> {
        // A poisoned lock only means another handle panicked mid-mutation;
        // the map state itself stays structurally usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, observers: Vec<StoreObserver>, event: StoreEvent) {
        for observer in &observers {
            observer(&event);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_group_permission(
    state: &SharedState,
    group: GroupId,
    client: ClientId,
    needed: Permission,
) -> StoreResult<()> {
    let entry = state
        .groups
        .get(&group)
        .ok_or(StoreError::GroupNotFound(group))?;
    if grant_allows(entry.creator, &entry.grants, client, needed) {
        return Ok(());
    }
    Err(StoreError::PermissionDenied { group, client })
}

impl SharedStore for MemoryStore {
    fn client_id(&self) -> ClientId {
        self.client
    }

    fn create_group(&self) -> StoreResult<GroupId> {
        let group = Uuid::new_v4();
        let mut state = self.state();
        state.groups.insert(
            group,
            GroupEntry {
                creator: self.client,
                grants: Vec::new(),
            },
        );
        drop(state);
        debug!("event=group_created module=store group={group}");
        Ok(group)
    }

    fn add_group_member(
        &self,
        group: GroupId,
        role: Role,
        permission: Permission,
    ) -> StoreResult<()> {
        let mut state = self.state();
        ensure_group_permission(&state, group, self.client, Permission::Admin)?;
        let entry = state
            .groups
            .get_mut(&group)
            .ok_or(StoreError::GroupNotFound(group))?;
        match entry.grants.iter_mut().find(|(existing, _)| *existing == role) {
            Some(grant) => grant.1 = permission,
            None => entry.grants.push((role, permission)),
        }
        Ok(())
    }

    fn create_record(
        &self,
        owner: GroupId,
        fields: &[(&str, FieldValue)],
    ) -> StoreResult<RecordId> {
        let record = Uuid::new_v4();
        let mut state = self.state();
        ensure_group_permission(&state, owner, self.client, Permission::Writer)?;
        state.records.insert(
            record,
            RecordEntry {
                owner,
                fields: fields
                    .iter()
                    .map(|(field, value)| ((*field).to_string(), value.clone()))
                    .collect(),
            },
        );
        let observers = state.observers.snapshot();
        drop(state);
        self.notify(observers, StoreEvent::RecordCreated { record });
        Ok(record)
    }

    fn read_field(&self, record: RecordId, field: &str) -> StoreResult<Option<FieldValue>> {
        let state = self.state();
        let entry = state
            .records
            .get(&record)
            .ok_or(StoreError::RecordNotFound(record))?;
        ensure_group_permission(&state, entry.owner, self.client, Permission::Reader)?;
        Ok(entry.fields.get(field).cloned())
    }

    fn write_field(&self, record: RecordId, field: &str, value: FieldValue) -> StoreResult<()> {
        let mut state = self.state();
        let owner = state
            .records
            .get(&record)
            .ok_or(StoreError::RecordNotFound(record))?
            .owner;
        ensure_group_permission(&state, owner, self.client, Permission::Writer)?;
        let entry = state
            .records
            .get_mut(&record)
            .ok_or(StoreError::RecordNotFound(record))?;
        entry.fields.insert(field.to_string(), value);
        let observers = state.observers.snapshot();
        drop(state);
        self.notify(
            observers,
            StoreEvent::FieldWritten {
                record,
                field: field.to_string(),
            },
        );
        Ok(())
    }

    fn create_collection(&self, owner: GroupId) -> StoreResult<CollectionId> {
        let collection = Uuid::new_v4();
        let mut state = self.state();
        ensure_group_permission(&state, owner, self.client, Permission::Writer)?;
        state.collections.insert(
            collection,
            CollectionEntry {
                owner,
                items: Vec::new(),
            },
        );
        let observers = state.observers.snapshot();
        drop(state);
        self.notify(observers, StoreEvent::CollectionChanged { collection });
        Ok(collection)
    }

    fn collection_owner(&self, collection: CollectionId) -> StoreResult<GroupId> {
        let state = self.state();
        let entry = state
            .collections
            .get(&collection)
            .ok_or(StoreError::CollectionNotFound(collection))?;
        ensure_group_permission(&state, entry.owner, self.client, Permission::Reader)?;
        Ok(entry.owner)
    }

    fn collection_items(&self, collection: CollectionId) -> StoreResult<Vec<RecordId>> {
        let state = self.state();
        let entry = state
            .collections
            .get(&collection)
            .ok_or(StoreError::CollectionNotFound(collection))?;
        ensure_group_permission(&state, entry.owner, self.client, Permission::Reader)?;
        Ok(entry.items.clone())
    }

    fn append_to_collection(&self, collection: CollectionId, record: RecordId) -> StoreResult<()> {
        let mut state = self.state();
        let owner = state
            .collections
            .get(&collection)
            .ok_or(StoreError::CollectionNotFound(collection))?
            .owner;
        ensure_group_permission(&state, owner, self.client, Permission::Writer)?;
        if !state.records.contains_key(&record) {
            return Err(StoreError::RecordNotFound(record));
        }
        let entry = state
            .collections
            .get_mut(&collection)
            .ok_or(StoreError::CollectionNotFound(collection))?;
        entry.items.push(record);
        let observers = state.observers.snapshot();
        drop(state);
        self.notify(observers, StoreEvent::CollectionChanged { collection });
        Ok(())
    }

    fn remove_from_collection(&self, collection: CollectionId, index: usize) -> StoreResult<()> {
        let mut state = self.state();
        let owner = state
            .collections
            .get(&collection)
            .ok_or(StoreError::CollectionNotFound(collection))?
            .owner;
        ensure_group_permission(&state, owner, self.client, Permission::Writer)?;
        let entry = state
            .collections
            .get_mut(&collection)
            .ok_or(StoreError::CollectionNotFound(collection))?;
        if index >= entry.items.len() {
            return Err(StoreError::IndexOutOfBounds {
                collection,
                index,
                len: entry.items.len(),
            });
        }
        entry.items.remove(index);
        let observers = state.observers.snapshot();
        drop(state);
        self.notify(observers, StoreEvent::CollectionChanged { collection });
        Ok(())
    }

    fn subscribe(&self, observer: StoreObserver) -> SubscriptionId {
        self.state().observers.register(observer)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.state().observers.remove(subscription);
    }
}
