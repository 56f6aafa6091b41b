use std::{collections::HashSet, sync::Arc};

use shared::{
    domain::{Template, TemplateId},
    protocol::{
        from_record, to_record, Direction, ListQuery, TemplateRow, TemplateWrite, TEMPLATES_TABLE,
    },
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    backend::BackendClient, confirm::ConfirmationGate, error::BackendError,
    error::MessagingError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The administrator declined the confirmation; nothing was sent.
    Cancelled,
}

/// Sole writer of the template list. Everything else reads snapshots.
pub struct TemplateStore {
    backend: Arc<dyn BackendClient>,
    templates: RwLock<Vec<Template>>,
}

impl TemplateStore {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            templates: RwLock::new(Vec::new()),
        }
    }

    pub async fn templates(&self) -> Vec<Template> {
        self.templates.read().await.clone()
    }

    pub async fn find(&self, id: &TemplateId) -> Option<Template> {
        self.templates
            .read()
            .await
            .iter()
            .find(|template| &template.id == id)
            .cloned()
    }

    /// Reloads every template ordered by name. On failure the current list
    /// is kept as it was.
    pub async fn load_all(&self) -> Result<Vec<Template>, MessagingError> {
        let records = self
            .backend
            .list(
                TEMPLATES_TABLE,
                &ListQuery::new().order_by("template_name", Direction::Ascending),
            )
            .await
            .map_err(|err| {
                error!(error = %err, "failed to load templates");
                MessagingError::LoadTemplatesFailed(err)
            })?;

        let mut loaded = Vec::with_capacity(records.len());
        for record in records {
            let row: TemplateRow = from_record(record).map_err(|err| {
                error!(error = %err, "malformed template row");
                MessagingError::LoadTemplatesFailed(BackendError::Decode(err.to_string()))
            })?;
            loaded.push(Template::from(row));
        }

        *self.templates.write().await = loaded.clone();
        info!(count = loaded.len(), "templates loaded");
        Ok(loaded)
    }

    /// Inserts a new template (empty id) or updates an existing one, then
    /// reloads the list so backend-assigned fields become visible.
    pub async fn save(&self, template: &Template) -> Result<Template, MessagingError> {
        if !template.is_complete() {
            return Err(MessagingError::IncompleteTemplate);
        }

        let write = to_record(&TemplateWrite::from(template)).map_err(|err| {
            MessagingError::SaveTemplateFailed(BackendError::Encode(err.to_string()))
        })?;
        let known: HashSet<TemplateId> = if template.is_new() {
            self.templates
                .read()
                .await
                .iter()
                .map(|existing| existing.id.clone())
                .collect()
        } else {
            HashSet::new()
        };
        let result = if template.is_new() {
            self.backend.insert(TEMPLATES_TABLE, vec![write]).await
        } else {
            self.backend
                .update(TEMPLATES_TABLE, template.id.as_str(), write)
                .await
        };
        if let Err(err) = result {
            error!(template_id = %template.id, error = %err, "failed to save template");
            return Err(MessagingError::SaveTemplateFailed(err));
        }
        info!(template_id = %template.id, name = %template.name, "template saved");

        self.refresh_after_write().await;
        Ok(self.saved_copy(template, &known).await)
    }

    /// Deletes after the gate confirms. A declined confirmation is not an error.
    pub async fn delete(
        &self,
        id: &TemplateId,
        gate: &dyn ConfirmationGate,
    ) -> Result<DeleteOutcome, MessagingError> {
        if !gate
            .confirm("Are you sure you want to delete this template?")
            .await
        {
            info!(template_id = %id, "template deletion cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.backend
            .delete(TEMPLATES_TABLE, id.as_str())
            .await
            .map_err(|err| {
                error!(template_id = %id, error = %err, "failed to delete template");
                MessagingError::DeleteTemplateFailed(err)
            })?;
        info!(template_id = %id, "template deleted");

        self.refresh_after_write().await;
        Ok(DeleteOutcome::Deleted)
    }

    async fn refresh_after_write(&self) {
        if let Err(err) = self.load_all().await {
            warn!(error = %err, "template list not refreshed after write");
        }
    }

    /// Inserts are matched by content, skipping ids that were listed before
    /// the write. A duplicate that was never loaded can still be picked.
    async fn saved_copy(&self, template: &Template, known: &HashSet<TemplateId>) -> Template {
        let templates = self.templates.read().await;
        let found = if template.is_new() {
            let matching: Vec<&Template> = templates
                .iter()
                .filter(|candidate| {
                    candidate.name == template.name
                        && candidate.subject_pattern == template.subject_pattern
                        && candidate.body_pattern == template.body_pattern
                })
                .collect();
            matching
                .iter()
                .find(|candidate| !known.contains(&candidate.id))
                .or(matching.first())
                .copied()
        } else {
            templates.iter().find(|candidate| candidate.id == template.id)
        };
        found.cloned().unwrap_or_else(|| template.clone())
    }
}

#[cfg(test)]
#[path = "tests/templates_tests.rs"]
mod tests;
