use serde_json::Value;
use std::sync::Arc;

use super::fields::{BODY, CREATED_AT, OWNER_ID, OWNER_LABEL, TITLE, UPDATED_AT};
use super::{EntryContent, EntryPatch, JournalEntry, JournalError};
use crate::identity::Identity;
use crate::store::{
    parse_timestamp, server_timestamp, Direction, Document, DocumentStore, StoreError, WriteFields,
};

/// CRUD over the journal collection.
///
/// Every operation takes the caller explicitly. Reads are open to any
/// signed-in caller; update and delete re-read the live document and
/// compare its owner against the caller before writing.
#[derive(Clone)]
pub struct EntryRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl EntryRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All entries, newest first
    pub async fn list_all(&self, caller: Option<&Identity>) -> Result<Vec<JournalEntry>, JournalError> {
        let caller = require_caller(caller, "fetch entries")?;

        let documents = self
            .store
            .list_ordered(&self.collection, CREATED_AT, Direction::Descending)
            .await
            .inspect_err(|e| tracing::error!("Error fetching journal entries: {}", e))?;

        // A malformed document is skipped so the rest of the collection stays readable
        Ok(documents
            .into_iter()
            .filter_map(|doc| match decode_entry(doc, caller) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping journal entry: {}", e);
                    None
                }
            })
            .collect())
    }

    /// `Ok(None)` when no document has this id
    pub async fn get_by_id(&self, caller: Option<&Identity>, id: &str) -> Result<Option<JournalEntry>, JournalError> {
        let caller = require_caller(caller, "fetch entry")?;

        let document = self
            .store
            .get(&self.collection, id)
            .await
            .inspect_err(|e| tracing::error!("Error fetching journal entry {}: {}", id, e))?;

        document.map(|doc| decode_entry(doc, caller)).transpose()
    }

    /// Create an entry owned by the caller and return its id
    pub async fn create(&self, caller: Option<&Identity>, content: EntryContent) -> Result<String, JournalError> {
        let caller = require_caller(caller, "create entry")?;

        let mut fields = WriteFields::new();
        fields.insert(TITLE.into(), content.title.into());
        fields.insert(BODY.into(), content.body.into());
        fields.insert(OWNER_ID.into(), caller.id.clone().into());
        fields.insert(OWNER_LABEL.into(), caller.label().into());
        fields.insert(CREATED_AT.into(), server_timestamp());
        fields.insert(UPDATED_AT.into(), server_timestamp());

        let id = self
            .store
            .insert(&self.collection, fields)
            .await
            .inspect_err(|e| tracing::error!("Error creating journal entry: {}", e))?;

        tracing::info!("Created journal entry {} for {}", id, caller.id);
        Ok(id)
    }

    /// Merge `patch` into an entry the caller owns and refresh `updated_at`
    pub async fn update(&self, caller: Option<&Identity>, id: &str, patch: EntryPatch) -> Result<(), JournalError> {
        let caller = require_caller(caller, "update entry")?;
        self.require_owner(caller, id, "update").await?;

        let mut fields = WriteFields::new();
        if let Some(title) = patch.title {
            fields.insert(TITLE.into(), title.into());
        }
        if let Some(body) = patch.body {
            fields.insert(BODY.into(), body.into());
        }
        fields.insert(UPDATED_AT.into(), server_timestamp());

        self.store
            .merge(&self.collection, id, fields)
            .await
            .map_err(|e| self.write_error(e, id, "updating"))?;

        tracing::info!("Updated journal entry {}", id);
        Ok(())
    }

    /// Permanently delete an entry the caller owns
    pub async fn delete(&self, caller: Option<&Identity>, id: &str) -> Result<(), JournalError> {
        let caller = require_caller(caller, "delete entry")?;
        self.require_owner(caller, id, "delete").await?;

        self.store
            .remove(&self.collection, id)
            .await
            .map_err(|e| self.write_error(e, id, "deleting"))?;

        tracing::info!("Deleted journal entry {}", id);
        Ok(())
    }

    /// Store connectivity probe
    pub async fn ping(&self) -> Result<(), JournalError> {
        Ok(self.store.ping().await?)
    }

    /// Owner re-check against the live document, never a cached copy
    async fn require_owner(&self, caller: &Identity, id: &str, action: &'static str) -> Result<Document, JournalError> {
        let document = self
            .store
            .get(&self.collection, id)
            .await
            .inspect_err(|e| tracing::error!("Error loading journal entry {} to {}: {}", id, action, e))?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))?;

        let owner = document.fields.get(OWNER_ID).and_then(Value::as_str);
        if owner != Some(caller.id.as_str()) {
            tracing::warn!("User {} denied {} of journal entry {}", caller.id, action, id);
            return Err(JournalError::Permission {
                action,
                id: id.to_string(),
            });
        }

        Ok(document)
    }

    /// A document that vanished between the owner check and the write is not found
    fn write_error(&self, err: StoreError, id: &str, verb: &str) -> JournalError {
        match err {
            StoreError::NotFound { .. } => JournalError::NotFound(id.to_string()),
            other => {
                tracing::error!("Error {} journal entry {}: {}", verb, id, other);
                other.into()
            }
        }
    }
}

fn require_caller<'a>(caller: Option<&'a Identity>, action: &'static str) -> Result<&'a Identity, JournalError> {
    caller.ok_or(JournalError::NotAuthenticated(action))
}

fn decode_entry(doc: Document, caller: &Identity) -> Result<JournalEntry, JournalError> {
    let Document { id, fields } = doc;

    let text = |field: &'static str| fields.get(field).and_then(Value::as_str).map(str::to_string);
    let time = |field: &'static str| fields.get(field).and_then(parse_timestamp);
    let missing = |field: &'static str| JournalError::InvalidDocument {
        id: id.clone(),
        field,
    };

    let owner_id = text(OWNER_ID).ok_or_else(|| missing(OWNER_ID))?;
    let created_at = time(CREATED_AT).ok_or_else(|| missing(CREATED_AT))?;
    let updated_at = time(UPDATED_AT).unwrap_or(created_at);

    Ok(JournalEntry {
        is_owned_by_current_user: owner_id == caller.id,
        owner_label: text(OWNER_LABEL).unwrap_or_default(),
        title: text(TITLE).unwrap_or_default(),
        body: text(BODY).unwrap_or_default(),
        owner_id,
        created_at,
        updated_at,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use crate::testing::identity;
    use serde_json::json;

    const COLLECTION: &str = "journal_entries";

    fn repository() -> (EntryRepository, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        (EntryRepository::new(Arc::new(store.clone()), COLLECTION), store)
    }

    fn content(title: &str) -> EntryContent {
        EntryContent {
            title: title.to_string(),
            body: format!("{} body", title),
        }
    }

    fn title_patch(title: &str) -> EntryPatch {
        EntryPatch {
            title: Some(title.to_string()),
            body: None,
        }
    }

    #[tokio::test]
    async fn anonymous_callers_are_rejected() {
        let (repo, _) = repository();
        assert!(matches!(repo.list_all(None).await, Err(JournalError::NotAuthenticated(_))));
        assert!(matches!(repo.get_by_id(None, "x").await, Err(JournalError::NotAuthenticated(_))));
        assert!(matches!(repo.create(None, content("x")).await, Err(JournalError::NotAuthenticated(_))));
        assert!(matches!(
            repo.update(None, "x", title_patch("y")).await,
            Err(JournalError::NotAuthenticated(_))
        ));
        assert!(matches!(repo.delete(None, "x").await, Err(JournalError::NotAuthenticated(_))));
    }

    #[tokio::test]
    async fn create_then_get_round_trip() {
        let (repo, _) = repository();
        let ada = identity("ada", Some("Ada"));

        let id = repo.create(Some(&ada), content("x")).await.unwrap();
        let entry = repo.get_by_id(Some(&ada), &id).await.unwrap().unwrap();

        assert_eq!(entry.id, id);
        assert_eq!(entry.title, "x");
        assert_eq!(entry.body, "x body");
        assert_eq!(entry.owner_id, ada.id);
        assert_eq!(entry.owner_label, "Ada");
        assert_eq!(entry.created_at, entry.updated_at);
        assert!(entry.is_owned_by_current_user);
    }

    #[tokio::test]
    async fn owner_label_falls_back_to_email() {
        let (repo, _) = repository();
        let nameless = identity("nameless", None);

        let id = repo.create(Some(&nameless), content("x")).await.unwrap();
        let entry = repo.get_by_id(Some(&nameless), &id).await.unwrap().unwrap();
        assert_eq!(entry.owner_label, "nameless@example.com");
    }

    #[tokio::test]
    async fn missing_entry_reads_as_none() {
        let (repo, _) = repository();
        let ada = identity("ada", None);
        assert!(repo.get_by_id(Some(&ada), "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_are_open_but_ownership_is_per_caller() {
        let (repo, _) = repository();
        let ada = identity("ada", None);
        let bob = identity("bob", None);

        let id = repo.create(Some(&ada), content("x")).await.unwrap();
        let seen_by_bob = repo.get_by_id(Some(&bob), &id).await.unwrap().unwrap();
        assert_eq!(seen_by_bob.owner_id, ada.id);
        assert!(!seen_by_bob.is_owned_by_current_user);
    }

    #[tokio::test]
    async fn list_all_is_newest_first() {
        let (repo, _) = repository();
        let ada = identity("ada", None);
        let bob = identity("bob", None);

        repo.create(Some(&ada), content("one")).await.unwrap();
        repo.create(Some(&bob), content("two")).await.unwrap();
        repo.create(Some(&ada), content("three")).await.unwrap();

        let entries = repo.list_all(Some(&bob)).await.unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);
        assert!(entries.windows(2).all(|w| w[0].created_at > w[1].created_at));

        let owned: Vec<_> = entries.iter().map(|e| e.is_owned_by_current_user).collect();
        assert_eq!(owned, vec![false, true, false]);
    }

    #[tokio::test]
    async fn owner_update_merges_and_refreshes_updated_at() {
        let (repo, _) = repository();
        let ada = identity("ada", Some("Ada"));

        let id = repo.create(Some(&ada), content("x")).await.unwrap();
        let before = repo.get_by_id(Some(&ada), &id).await.unwrap().unwrap();

        repo.update(Some(&ada), &id, title_patch("y")).await.unwrap();
        let after = repo.get_by_id(Some(&ada), &id).await.unwrap().unwrap();

        assert_eq!(after.title, "y");
        assert_eq!(after.body, before.body);
        assert_eq!(after.owner_id, before.owner_id);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn non_owner_update_is_denied_and_leaves_entry_unchanged() {
        let (repo, store) = repository();
        let ada = identity("ada", None);
        let bob = identity("bob", None);

        let id = repo.create(Some(&ada), content("x")).await.unwrap();
        let before = store.get(COLLECTION, &id).await.unwrap().unwrap();

        let err = repo.update(Some(&bob), &id, title_patch("y")).await.unwrap_err();
        assert!(matches!(err, JournalError::Permission { action: "update", .. }));

        let after = store.get(COLLECTION, &id).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(after.fields[TITLE], json!("x"));
    }

    #[tokio::test]
    async fn non_owner_delete_is_denied() {
        let (repo, store) = repository();
        let ada = identity("ada", None);
        let bob = identity("bob", None);

        let id = repo.create(Some(&ada), content("x")).await.unwrap();
        let err = repo.delete(Some(&bob), &id).await.unwrap_err();
        assert!(matches!(err, JournalError::Permission { action: "delete", .. }));
        assert_eq!(store.len(COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn mutations_on_missing_entries_are_not_found() {
        let (repo, _) = repository();
        let ada = identity("ada", None);

        assert!(matches!(
            repo.update(Some(&ada), "missing", title_patch("y")).await,
            Err(JournalError::NotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            repo.delete(Some(&ada), "missing").await,
            Err(JournalError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let (repo, store) = repository();
        let ada = identity("ada", None);

        let id = repo.create(Some(&ada), content("x")).await.unwrap();
        repo.delete(Some(&ada), &id).await.unwrap();
        assert_eq!(store.len(COLLECTION).await, 0);
        assert!(matches!(
            repo.delete(Some(&ada), &id).await,
            Err(JournalError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn documents_without_owner_are_invalid() {
        let (repo, store) = repository();
        let ada = identity("ada", None);

        let mut fields = WriteFields::new();
        fields.insert(TITLE.into(), "orphan".into());
        fields.insert(CREATED_AT.into(), server_timestamp());
        let id = store.insert(COLLECTION, fields).await.unwrap();

        assert!(matches!(
            repo.get_by_id(Some(&ada), &id).await,
            Err(JournalError::InvalidDocument { field: OWNER_ID, .. })
        ));
        // Nobody owns it, so nobody may touch it
        assert!(matches!(
            repo.delete(Some(&ada), &id).await,
            Err(JournalError::Permission { .. })
        ));
    }

    #[tokio::test]
    async fn listing_skips_malformed_documents() {
        let (repo, store) = repository();
        let ada = identity("ada", None);
        let good = repo.create(Some(&ada), content("kept")).await.unwrap();

        let mut fields = WriteFields::new();
        fields.insert(TITLE.into(), "orphan".into());
        fields.insert(CREATED_AT.into(), server_timestamp());
        store.insert(COLLECTION, fields).await.unwrap();

        let entries = repo.list_all(Some(&ada)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, good);
        assert!(entries[0].is_owned_by_current_user);
    }
}
