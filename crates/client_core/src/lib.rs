//! Admin messaging core: the backend facade, the template and owner adapters,
//! and the composition and template-editor state machines built on them.

pub mod backend;
pub mod composer;
pub mod confirm;
pub mod directory;
pub mod editor;
pub mod error;
pub mod memory;
pub mod notice;
pub mod rest;
pub mod templates;

pub use backend::{BackendClient, Operation};
pub use composer::{Composer, CompositionState, Draft, SendOutcome};
pub use confirm::{AlwaysConfirm, AlwaysDecline, ConfirmationGate};
pub use directory::RecipientDirectory;
pub use editor::{EditorMode, EditorState, SaveOutcome, TemplateEditor};
pub use error::{BackendError, MessagingError};
pub use memory::{BackendCall, InMemoryBackend};
pub use notice::Notice;
pub use rest::RestBackend;
pub use templates::{DeleteOutcome, TemplateStore};
