//! SQLite store backend.
//!
//! # Responsibility
//! - Persist shared-store shapes (groups, records, collections) locally so
//!   a board survives process restart.
//! - Keep SQL details inside the store persistence boundary.
//!
//! # Invariants
//! - The local client identity is created once and reloaded on reopen.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Observer callbacks run after the connection lock is released.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::store::{
    grant_allows, ClientId, CollectionId, FieldValue, GroupId, ObserverRegistry, Permission,
    RecordId, Role, SharedStore, StoreError, StoreEvent, StoreObserver, StoreResult,
    SubscriptionId,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const ROLE_EVERYONE: &str = "everyone";
const FIELD_KIND_TEXT: &str = "text";
const FIELD_KIND_NUMBER: &str = "number";
const FIELD_KIND_FLAG: &str = "flag";

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::backend(DbError::Sqlite(value))
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::backend(value)
    }
}

/// Persistent single-client store over one SQLite database.
///
/// There are no remote peers behind this backend; observers still fire for
/// local mutations so view code behaves identically over either backend.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    observers: Mutex<ObserverRegistry>,
    client: ClientId,
}

impl SqliteStore {
    /// Opens (or creates) a store database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    /// Opens a transient in-memory store database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let client = load_or_create_local_client(&conn)?;
        info!("event=store_open module=store backend=sqlite client={client}");
        Ok(Self {
            conn: Mutex::new(conn),
            observers: Mutex::new(ObserverRegistry::default()),
            client,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: StoreEvent) {
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        for observer in &observers {
            observer(&event);
        }
    }
}

impl SharedStore for SqliteStore {
    fn client_id(&self) -> ClientId {
        self.client
    }

    fn create_group(&self) -> StoreResult<GroupId> {
        let group = Uuid::new_v4();
        self.conn().execute(
            "INSERT INTO groups (uuid, creator) VALUES (?1, ?2);",
            params![group.to_string(), self.client.to_string()],
        )?;
        Ok(group)
    }

    fn add_group_member(
        &self,
        group: GroupId,
        role: Role,
        permission: Permission,
    ) -> StoreResult<()> {
        let conn = self.conn();
        ensure_group_permission(&conn, group, self.client, Permission::Admin)?;
        conn.execute(
            "INSERT OR REPLACE INTO group_grants (group_uuid, role, permission)
             VALUES (?1, ?2, ?3);",
            params![
                group.to_string(),
                role_to_db(role),
                permission_to_db(permission)
            ],
        )?;
        Ok(())
    }

    fn create_record(
        &self,
        owner: GroupId,
        fields: &[(&str, FieldValue)],
    ) -> StoreResult<RecordId> {
        let record = Uuid::new_v4();
        {
            let mut conn = self.conn();
            ensure_group_permission(&conn, owner, self.client, Permission::Writer)?;
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO records (uuid, owner_group) VALUES (?1, ?2);",
                params![record.to_string(), owner.to_string()],
            )?;
            for (field, value) in fields {
                insert_field(&tx, record, field, value)?;
            }
            tx.commit()?;
        }
        self.notify(StoreEvent::RecordCreated { record });
        Ok(record)
    }

    fn read_field(&self, record: RecordId, field: &str) -> StoreResult<Option<FieldValue>> {
        let conn = self.conn();
        let owner = record_owner(&conn, record)?;
        ensure_group_permission(&conn, owner, self.client, Permission::Reader)?;

        let row = conn
            .query_row(
                "SELECT kind, text_value, number_value, flag_value
                 FROM record_fields
                 WHERE record_uuid = ?1 AND field = ?2;",
                params![record.to_string(), field],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((kind, text, number, flag)) => {
                Ok(Some(decode_field(&kind, text, number, flag, field)?))
            }
            None => Ok(None),
        }
    }

    fn write_field(&self, record: RecordId, field: &str, value: FieldValue) -> StoreResult<()> {
        {
            let conn = self.conn();
            let owner = record_owner(&conn, record)?;
            ensure_group_permission(&conn, owner, self.client, Permission::Writer)?;
            insert_field(&conn, record, field, &value)?;
        }
        self.notify(StoreEvent::FieldWritten {
            record,
            field: field.to_string(),
        });
        Ok(())
    }

    fn create_collection(&self, owner: GroupId) -> StoreResult<CollectionId> {
        let collection = Uuid::new_v4();
        {
            let conn = self.conn();
            ensure_group_permission(&conn, owner, self.client, Permission::Writer)?;
            conn.execute(
                "INSERT INTO collections (uuid, owner_group) VALUES (?1, ?2);",
                params![collection.to_string(), owner.to_string()],
            )?;
        }
        self.notify(StoreEvent::CollectionChanged { collection });
        Ok(collection)
    }

    fn collection_owner(&self, collection: CollectionId) -> StoreResult<GroupId> {
        let conn = self.conn();
        let owner = stored_collection_owner(&conn, collection)?;
        ensure_group_permission(&conn, owner, self.client, Permission::Reader)?;
        Ok(owner)
    }

    fn collection_items(&self, collection: CollectionId) -> StoreResult<Vec<RecordId>> {
        let conn = self.conn();
        let owner = stored_collection_owner(&conn, collection)?;
        ensure_group_permission(&conn, owner, self.client, Permission::Reader)?;

        let mut stmt = conn.prepare(
            "SELECT record_uuid FROM collection_items
             WHERE collection_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query(params![collection.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            items.push(parse_uuid(&value, "collection_items.record_uuid")?);
        }
        Ok(items)
    }

    fn append_to_collection(&self, collection: CollectionId, record: RecordId) -> StoreResult<()> {
        {
            let conn = self.conn();
            let owner = stored_collection_owner(&conn, collection)?;
            ensure_group_permission(&conn, owner, self.client, Permission::Writer)?;
            record_owner(&conn, record)?;

            conn.execute(
                "INSERT INTO collection_items (collection_uuid, position, record_uuid)
                 SELECT ?1, COALESCE(MAX(position) + 1, 0), ?2
                 FROM collection_items WHERE collection_uuid = ?1;",
                params![collection.to_string(), record.to_string()],
            )?;
        }
        self.notify(StoreEvent::CollectionChanged { collection });
        Ok(())
    }

    fn remove_from_collection(&self, collection: CollectionId, index: usize) -> StoreResult<()> {
        {
            let conn = self.conn();
            let owner = stored_collection_owner(&conn, collection)?;
            ensure_group_permission(&conn, owner, self.client, Permission::Writer)?;

            let position: Option<i64> = conn
                .query_row(
                    "SELECT position FROM collection_items
                     WHERE collection_uuid = ?1
                     ORDER BY position ASC
                     LIMIT 1 OFFSET ?2;",
                    params![collection.to_string(), index as i64],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(position) = position else {
                let len: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM collection_items WHERE collection_uuid = ?1;",
                    params![collection.to_string()],
                    |row| row.get(0),
                )?;
                return Err(StoreError::IndexOutOfBounds {
                    collection,
                    index,
                    len: len as usize,
                });
            };

            conn.execute(
                "DELETE FROM collection_items
                 WHERE collection_uuid = ?1 AND position = ?2;",
                params![collection.to_string(), position],
            )?;
        }
        self.notify(StoreEvent::CollectionChanged { collection });
        Ok(())
    }

    fn subscribe(&self, observer: StoreObserver) -> SubscriptionId {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(observer)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(subscription);
    }
}

fn load_or_create_local_client(conn: &Connection) -> StoreResult<ClientId> {
    let existing: Option<String> = conn
        .query_row("SELECT uuid FROM local_client LIMIT 1;", [], |row| {
            row.get(0)
        })
        .optional()?;

    match existing {
        Some(value) => parse_uuid(&value, "local_client.uuid"),
        None => {
            let client = Uuid::new_v4();
            conn.execute(
                "INSERT INTO local_client (uuid) VALUES (?1);",
                params![client.to_string()],
            )?;
            Ok(client)
        }
    }
}

fn record_owner(conn: &Connection, record: RecordId) -> StoreResult<GroupId> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT owner_group FROM records WHERE uuid = ?1;",
            params![record.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        Some(value) => parse_uuid(&value, "records.owner_group"),
        None => Err(StoreError::RecordNotFound(record)),
    }
}

fn stored_collection_owner(conn: &Connection, collection: CollectionId) -> StoreResult<GroupId> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT owner_group FROM collections WHERE uuid = ?1;",
            params![collection.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        Some(value) => parse_uuid(&value, "collections.owner_group"),
        None => Err(StoreError::CollectionNotFound(collection)),
    }
}

fn ensure_group_permission(
    conn: &Connection,
    group: GroupId,
    client: ClientId,
    needed: Permission,
) -> StoreResult<()> {
    let creator: Option<String> = conn
        .query_row(
            "SELECT creator FROM groups WHERE uuid = ?1;",
            params![group.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(creator) = creator else {
        return Err(StoreError::GroupNotFound(group));
    };
    let creator = parse_uuid(&creator, "groups.creator")?;

    let mut stmt = conn.prepare(
        "SELECT role, permission FROM group_grants WHERE group_uuid = ?1;",
    )?;
    let mut rows = stmt.query(params![group.to_string()])?;
    let mut grants = Vec::new();
    while let Some(row) = rows.next()? {
        let role: String = row.get(0)?;
        let permission: String = row.get(1)?;
        grants.push((parse_role(&role)?, parse_permission(&permission)?));
    }

    if grant_allows(creator, &grants, client, needed) {
        return Ok(());
    }
    Err(StoreError::PermissionDenied { group, client })
}

fn insert_field(
    conn: &Connection,
    record: RecordId,
    field: &str,
    value: &FieldValue,
) -> StoreResult<()> {
    let (kind, text, number, flag) = encode_field(value);
    conn.execute(
        "INSERT OR REPLACE INTO record_fields
            (record_uuid, field, kind, text_value, number_value, flag_value, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, strftime('%s', 'now') * 1000);",
        params![record.to_string(), field, kind, text, number, flag],
    )?;
    Ok(())
}

fn encode_field(value: &FieldValue) -> (&'static str, Option<String>, Option<f64>, Option<i64>) {
    match value {
        FieldValue::Text(text) => (FIELD_KIND_TEXT, Some(text.clone()), None, None),
        FieldValue::Number(number) => (FIELD_KIND_NUMBER, None, Some(*number), None),
        FieldValue::Flag(flag) => (FIELD_KIND_FLAG, None, None, Some(i64::from(*flag))),
    }
}

fn decode_field(
    kind: &str,
    text: Option<String>,
    number: Option<f64>,
    flag: Option<i64>,
    field: &str,
) -> StoreResult<FieldValue> {
    match kind {
        FIELD_KIND_TEXT => text.map(FieldValue::Text).ok_or_else(|| {
            StoreError::InvalidData(format!("text field `{field}` has no text_value"))
        }),
        FIELD_KIND_NUMBER => number.map(FieldValue::Number).ok_or_else(|| {
            StoreError::InvalidData(format!("number field `{field}` has no number_value"))
        }),
        FIELD_KIND_FLAG => match flag {
            Some(0) => Ok(FieldValue::Flag(false)),
            Some(1) => Ok(FieldValue::Flag(true)),
            other => Err(StoreError::InvalidData(format!(
                "flag field `{field}` has invalid flag_value `{other:?}`"
            ))),
        },
        other => Err(StoreError::InvalidData(format!(
            "unknown field kind `{other}` for field `{field}`"
        ))),
    }
}

fn role_to_db(role: Role) -> String {
    match role {
        Role::Everyone => ROLE_EVERYONE.to_string(),
        Role::Client(id) => id.to_string(),
    }
}

fn parse_role(value: &str) -> StoreResult<Role> {
    if value == ROLE_EVERYONE {
        return Ok(Role::Everyone);
    }
    Ok(Role::Client(parse_uuid(value, "group_grants.role")?))
}

fn permission_to_db(permission: Permission) -> &'static str {
    match permission {
        Permission::Reader => "reader",
        Permission::Writer => "writer",
        Permission::Admin => "admin",
    }
}

fn parse_permission(value: &str) -> StoreResult<Permission> {
    match value {
        "reader" => Ok(Permission::Reader),
        "writer" => Ok(Permission::Writer),
        "admin" => Ok(Permission::Admin),
        other => Err(StoreError::InvalidData(format!(
            "invalid permission value `{other}` in group_grants.permission"
        ))),
    }
}

fn parse_uuid(value: &str, context: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{value}` in {context}")))
}
