use std::sync::Arc;

use shared::{
    domain::{AccountId, Recipient, RecipientId},
    protocol::{from_record, Direction, ListQuery, OwnerProfileRow, OWNER_PROFILES_TABLE},
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    backend::BackendClient,
    error::{BackendError, MessagingError},
};

/// Owners that can receive admin messages, ordered by unit.
pub struct RecipientDirectory {
    backend: Arc<dyn BackendClient>,
    recipients: RwLock<Vec<Recipient>>,
}

impl RecipientDirectory {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            recipients: RwLock::new(Vec::new()),
        }
    }

    pub async fn recipients(&self) -> Vec<Recipient> {
        self.recipients.read().await.clone()
    }

    pub async fn load_all(&self) -> Result<Vec<Recipient>, MessagingError> {
        let records = self
            .backend
            .list(
                OWNER_PROFILES_TABLE,
                &ListQuery::new().order_by("unit_number", Direction::Ascending),
            )
            .await
            .map_err(|err| {
                error!(error = %err, "failed to load owners");
                MessagingError::LoadRecipientsFailed(err)
            })?;

        let mut loaded = Vec::with_capacity(records.len());
        for record in records {
            let row: OwnerProfileRow = from_record(record).map_err(|err| {
                error!(error = %err, "malformed owner row");
                MessagingError::LoadRecipientsFailed(BackendError::Decode(err.to_string()))
            })?;
            loaded.push(Recipient::from(row));
        }

        let unaddressable = loaded.iter().filter(|r| !r.is_addressable()).count();
        if unaddressable > 0 {
            warn!(unaddressable, "owners without an account reference");
        }

        *self.recipients.write().await = loaded.clone();
        info!(count = loaded.len(), "owners loaded");
        Ok(loaded)
    }

    /// Account reference for `id`, absent when the owner is unknown or has
    /// no account.
    pub async fn account_for(&self, id: &RecipientId) -> Option<AccountId> {
        self.recipients
            .read()
            .await
            .iter()
            .find(|recipient| &recipient.id == id)
            .and_then(|recipient| recipient.account.clone())
            .filter(|account| !account.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::Operation, memory::InMemoryBackend};
    use serde_json::json;

    fn owner(id: &str, user_id: Option<&str>, unit: &str) -> shared::protocol::Record {
        json!({
            "id": id,
            "user_id": user_id,
            "unit_number": unit,
            "first_name": "Pat",
            "last_name": id.to_uppercase(),
            "email": format!("{id}@example.com"),
        })
        .as_object()
        .cloned()
        .expect("object")
    }

    #[tokio::test]
    async fn loads_owners_in_unit_order() {
        let backend = Arc::new(InMemoryBackend::new().with_rows(
            OWNER_PROFILES_TABLE,
            vec![
                owner("b", Some("acct-b"), "102"),
                owner("a", Some("acct-a"), "101"),
            ],
        ));
        let directory = RecipientDirectory::new(backend);

        let loaded = directory.load_all().await.expect("load");
        let units: Vec<_> = loaded.iter().map(|r| r.unit_label.as_str()).collect();
        assert_eq!(units, vec!["101", "102"]);
        assert_eq!(loaded[0].display_name(), "Pat A");
        assert_eq!(
            directory.account_for(&RecipientId::from("b")).await,
            Some(AccountId::from("acct-b"))
        );
    }

    #[tokio::test]
    async fn unaddressable_owner_is_listed_but_resolves_to_nothing() {
        let backend = Arc::new(InMemoryBackend::new().with_rows(
            OWNER_PROFILES_TABLE,
            vec![owner("x", None, "201"), owner("y", Some(""), "202")],
        ));
        let directory = RecipientDirectory::new(backend);

        assert_eq!(directory.load_all().await.expect("load").len(), 2);
        assert_eq!(directory.account_for(&RecipientId::from("x")).await, None);
        assert_eq!(directory.account_for(&RecipientId::from("y")).await, None);
        assert_eq!(directory.account_for(&RecipientId::from("nope")).await, None);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_rows(OWNER_PROFILES_TABLE, vec![owner("a", Some("acct-a"), "101")]),
        );
        let directory = RecipientDirectory::new(backend.clone());
        directory.load_all().await.expect("first load");

        backend.fail(Operation::List, "offline").await;
        let err = directory.load_all().await.err().expect("error");
        assert!(matches!(err, MessagingError::LoadRecipientsFailed(_)));
        assert_eq!(directory.recipients().await.len(), 1);
    }
}
