//! Message composition: the draft being written, the recipients it goes to,
//! and the single batch insert that sends it.

use std::{collections::HashSet, sync::Arc};

use shared::{
    domain::{OutboundMessage, Recipient, RecipientId, Template, TemplateId},
    protocol::{to_record, SiteMessageRow, SITE_MESSAGES_TABLE},
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    backend::BackendClient,
    directory::RecipientDirectory,
    error::{BackendError, MessagingError},
    notice::Notice,
    templates::TemplateStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionState {
    Empty,
    Editing,
    Sending,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub subject: String,
    pub body: String,
    pub template: Option<TemplateId>,
    pub selected: HashSet<RecipientId>,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.subject.is_empty()
            && self.body.is_empty()
            && self.template.is_none()
            && self.selected.is_empty()
    }

    pub fn validate(&self) -> Result<(), MessagingError> {
        if self.subject.is_empty() || self.body.is_empty() || self.selected.is_empty() {
            return Err(MessagingError::IncompleteDraft);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The batch was accepted and the draft reset to `Empty`.
    Sent { recipients: usize },
    /// A send was already in flight; this call issued nothing.
    AlreadySending,
}

struct ComposerInner {
    state: CompositionState,
    draft: Draft,
    notice: Option<Notice>,
}

impl ComposerInner {
    /// Applies `edit` unless a send is in flight.
    fn edit(&mut self, action: &'static str, edit: impl FnOnce(&mut Draft)) {
        if self.state == CompositionState::Sending {
            debug!(action, "draft is frozen while sending");
            return;
        }
        edit(&mut self.draft);
        self.state = CompositionState::Editing;
    }
}

pub struct Composer {
    backend: Arc<dyn BackendClient>,
    directory: Arc<RecipientDirectory>,
    templates: Arc<TemplateStore>,
    inner: Mutex<ComposerInner>,
}

impl Composer {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        directory: Arc<RecipientDirectory>,
        templates: Arc<TemplateStore>,
    ) -> Self {
        Self {
            backend,
            directory,
            templates,
            inner: Mutex::new(ComposerInner {
                state: CompositionState::Empty,
                draft: Draft::default(),
                notice: None,
            }),
        }
    }

    /// Populates the owner and template lists. Failures are reported through
    /// the notice and do not prevent composing.
    pub async fn initialize(&self) {
        let owners = self.directory.load_all().await;
        let templates = self.templates.load_all().await;
        if let Some(err) = owners.err().or(templates.err()) {
            self.inner.lock().await.notice = Some(Notice::error(err.to_string()));
        }
    }

    pub async fn state(&self) -> CompositionState {
        self.inner.lock().await.state
    }

    pub async fn draft(&self) -> Draft {
        self.inner.lock().await.draft.clone()
    }

    pub async fn notice(&self) -> Option<Notice> {
        self.inner.lock().await.notice.clone()
    }

    pub async fn clear_notice(&self) {
        self.inner.lock().await.notice = None;
    }

    pub async fn available_templates(&self) -> Vec<Template> {
        self.templates.templates().await
    }

    pub async fn recipients(&self) -> Vec<Recipient> {
        self.directory.recipients().await
    }

    /// Copies the template's subject and body into the draft verbatim.
    pub async fn apply_template(&self, template: &Template) {
        self.inner.lock().await.edit("apply_template", |draft| {
            draft.subject = template.subject_pattern.clone();
            draft.body = template.body_pattern.clone();
            draft.template = Some(template.id.clone());
        });
    }

    pub async fn select_template(&self, id: &TemplateId) -> Result<(), MessagingError> {
        let template = self
            .templates
            .find(id)
            .await
            .ok_or(MessagingError::TemplateNotFound)?;
        self.apply_template(&template).await;
        Ok(())
    }

    /// Drops the template selection; subject and body stay as they are.
    pub async fn clear_template(&self) {
        self.inner
            .lock()
            .await
            .edit("clear_template", |draft| draft.template = None);
    }

    pub async fn set_subject(&self, subject: impl Into<String>) {
        let subject = subject.into();
        self.inner
            .lock()
            .await
            .edit("set_subject", |draft| draft.subject = subject);
    }

    pub async fn set_body(&self, body: impl Into<String>) {
        let body = body.into();
        self.inner
            .lock()
            .await
            .edit("set_body", |draft| draft.body = body);
    }

    pub async fn toggle_recipient(&self, id: &RecipientId) {
        self.inner.lock().await.edit("toggle_recipient", |draft| {
            if !draft.selected.remove(id) {
                draft.selected.insert(id.clone());
            }
        });
    }

    pub async fn select_all(&self) {
        let everyone: HashSet<RecipientId> = self
            .directory
            .recipients()
            .await
            .into_iter()
            .map(|recipient| recipient.id)
            .collect();
        self.inner
            .lock()
            .await
            .edit("select_all", |draft| draft.selected = everyone);
    }

    pub async fn deselect_all(&self) {
        self.inner
            .lock()
            .await
            .edit("deselect_all", |draft| draft.selected.clear());
    }

    /// The "select all" checkbox.
    pub async fn set_all_selected(&self, checked: bool) {
        if checked {
            self.select_all().await;
        } else {
            self.deselect_all().await;
        }
    }

    /// Selected recipients in directory order.
    pub async fn selected_recipients(&self) -> Vec<Recipient> {
        let selected = self.inner.lock().await.draft.selected.clone();
        self.directory
            .recipients()
            .await
            .into_iter()
            .filter(|recipient| selected.contains(&recipient.id))
            .collect()
    }

    pub async fn validate(&self) -> Result<(), MessagingError> {
        self.inner.lock().await.draft.validate()
    }

    /// Returns a failed send to editing with the draft intact.
    pub async fn acknowledge(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == CompositionState::Failed {
            inner.state = CompositionState::Editing;
            inner.notice = None;
        }
    }

    /// Sends one message per selected recipient as a single batch insert.
    pub async fn send(&self) -> Result<SendOutcome, MessagingError> {
        let draft = {
            let mut inner = self.inner.lock().await;
            if inner.state == CompositionState::Sending {
                debug!("send ignored; a send is already in flight");
                return Ok(SendOutcome::AlreadySending);
            }
            if let Err(err) = inner.draft.validate() {
                inner.notice = Some(Notice::error(err.to_string()));
                return Err(err);
            }
            inner.state = CompositionState::Sending;
            inner.notice = None;
            inner.draft.clone()
        };

        let messages = self.outbound_messages(&draft).await;
        let count = messages.len();
        let result = match encode_batch(&messages) {
            Ok(records) => self.backend.insert(SITE_MESSAGES_TABLE, records).await,
            Err(err) => Err(err),
        };

        let mut inner = self.inner.lock().await;
        match result {
            Ok(()) => {
                info!(recipients = count, "admin message sent");
                inner.draft = Draft::default();
                inner.state = CompositionState::Empty;
                inner.notice = Some(Notice::success(format!(
                    "Message sent to {count} recipient(s)"
                )));
                Ok(SendOutcome::Sent { recipients: count })
            }
            Err(err) => {
                error!(recipients = count, error = %err, "failed to send admin message");
                inner.state = CompositionState::Failed;
                let err = MessagingError::SendFailed(err);
                inner.notice = Some(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn outbound_messages(&self, draft: &Draft) -> Vec<OutboundMessage> {
        let directory = self.directory.recipients().await;
        let mut ordered: Vec<RecipientId> = directory
            .iter()
            .filter(|recipient| draft.selected.contains(&recipient.id))
            .map(|recipient| recipient.id.clone())
            .collect();
        let mut unknown: Vec<RecipientId> = draft
            .selected
            .iter()
            .filter(|id| !directory.iter().any(|recipient| &recipient.id == *id))
            .cloned()
            .collect();
        unknown.sort();
        ordered.extend(unknown);

        let mut messages = Vec::with_capacity(ordered.len());
        for id in ordered {
            let account = self.directory.account_for(&id).await;
            if account.is_none() {
                warn!(recipient_id = %id, "selected owner has no account; sending without target");
            }
            messages.push(OutboundMessage::admin(account, &draft.subject, &draft.body));
        }
        messages
    }
}

fn encode_batch(
    messages: &[OutboundMessage],
) -> Result<Vec<shared::protocol::Record>, BackendError> {
    messages
        .iter()
        .map(|message| {
            to_record(&SiteMessageRow::from(message))
                .map_err(|err| BackendError::Encode(err.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/composer_tests.rs"]
mod tests;
