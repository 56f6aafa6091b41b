//! Create/edit lifecycle of one template at a time.

use std::sync::Arc;

use shared::domain::Template;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{error::MessagingError, notice::Notice, templates::TemplateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    New,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    Open(EditorMode),
    Saving(EditorMode),
    /// Last save failed; fields are kept and remain editable.
    Failed(EditorMode),
}

impl EditorState {
    fn editable_mode(self) -> Option<EditorMode> {
        match self {
            Self::Open(mode) | Self::Failed(mode) => Some(mode),
            Self::Closed | Self::Saving(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Template),
    /// The editor was closed or already saving.
    Ignored,
}

struct EditorInner {
    state: EditorState,
    draft: Template,
    notice: Option<Notice>,
}

pub struct TemplateEditor {
    store: Arc<TemplateStore>,
    inner: Mutex<EditorInner>,
}

impl TemplateEditor {
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(EditorInner {
                state: EditorState::Closed,
                draft: Template::default(),
                notice: None,
            }),
        }
    }

    pub async fn state(&self) -> EditorState {
        self.inner.lock().await.state
    }

    pub async fn draft(&self) -> Template {
        self.inner.lock().await.draft.clone()
    }

    pub async fn notice(&self) -> Option<Notice> {
        self.inner.lock().await.notice.clone()
    }

    /// Opens a blank editor for a new template.
    pub async fn open_new(&self) {
        let mut inner = self.inner.lock().await;
        inner.draft = Template::default();
        inner.state = EditorState::Open(EditorMode::New);
        inner.notice = None;
    }

    /// Opens the editor seeded with an existing template's fields.
    pub async fn open(&self, template: &Template) {
        let mut inner = self.inner.lock().await;
        inner.draft = template.clone();
        inner.state = if template.is_new() {
            EditorState::Open(EditorMode::New)
        } else {
            EditorState::Open(EditorMode::Editing)
        };
        inner.notice = None;
    }

    pub async fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.edit("set_name", |draft| draft.name = name).await;
    }

    pub async fn set_subject(&self, subject: impl Into<String>) {
        let subject = subject.into();
        self.edit("set_subject", |draft| draft.subject_pattern = subject)
            .await;
    }

    pub async fn set_body(&self, body: impl Into<String>) {
        let body = body.into();
        self.edit("set_body", |draft| draft.body_pattern = body).await;
    }

    async fn edit(&self, action: &'static str, edit: impl FnOnce(&mut Template)) {
        let mut inner = self.inner.lock().await;
        if inner.state.editable_mode().is_none() {
            debug!(action, state = ?inner.state, "template editor not editable");
            return;
        }
        edit(&mut inner.draft);
    }

    /// Persists the draft through the store. On success the editor closes
    /// and the store's list has been refreshed; on failure the edits stay.
    pub async fn save(&self) -> Result<SaveOutcome, MessagingError> {
        let (mode, draft) = {
            let mut inner = self.inner.lock().await;
            let Some(mode) = inner.state.editable_mode() else {
                debug!(state = ?inner.state, "template save ignored");
                return Ok(SaveOutcome::Ignored);
            };
            inner.state = EditorState::Saving(mode);
            inner.notice = None;
            (mode, inner.draft.clone())
        };

        let result = self.store.save(&draft).await;

        let mut inner = self.inner.lock().await;
        if !matches!(inner.state, EditorState::Saving(_)) {
            debug!("editor cancelled while saving; keeping closed state");
            return result.map(SaveOutcome::Saved);
        }
        match result {
            Ok(saved) => {
                inner.state = EditorState::Closed;
                inner.draft = Template::default();
                inner.notice = Some(Notice::success(match mode {
                    EditorMode::New => "Template created",
                    EditorMode::Editing => "Template updated",
                }));
                Ok(SaveOutcome::Saved(saved))
            }
            Err(err) => {
                inner.state = if err.is_validation() {
                    EditorState::Open(mode)
                } else {
                    EditorState::Failed(mode)
                };
                inner.notice = Some(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Discards in-progress edits unconditionally.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = EditorState::Closed;
        inner.draft = Template::default();
        inner.notice = None;
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
