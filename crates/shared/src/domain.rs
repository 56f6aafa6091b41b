use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(TemplateId);
id_newtype!(RecipientId);
id_newtype!(AccountId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    AdminMessage,
}

/// A reusable message template. An empty `id` marks a template that has not
/// been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub subject_pattern: String,
    pub body_pattern: String,
    pub is_default: bool,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        subject_pattern: impl Into<String>,
        body_pattern: impl Into<String>,
    ) -> Self {
        Self {
            id: TemplateId::default(),
            name: name.into(),
            subject_pattern: subject_pattern.into(),
            body_pattern: body_pattern.into(),
            is_default: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    /// Name, subject pattern and body pattern are all required before a save.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.subject_pattern.is_empty() && !self.body_pattern.is_empty()
    }
}

/// An owner that can be addressed by an admin message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    pub id: RecipientId,
    /// Account the message is delivered to; distinct from `id`.
    pub account: Option<AccountId>,
    pub unit_label: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Recipient {
    pub fn is_addressable(&self) -> bool {
        self.account
            .as_ref()
            .is_some_and(|account| !account.is_empty())
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// One row of a send batch. `recipient` is absent when the selected
/// recipient had no resolvable account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: Option<AccountId>,
    pub subject: String,
    pub body: String,
    pub sender_type: SenderType,
    pub message_type: MessageType,
}

impl OutboundMessage {
    pub fn admin(recipient: Option<AccountId>, subject: &str, body: &str) -> Self {
        Self {
            recipient,
            subject: subject.to_string(),
            body: body.to_string(),
            sender_type: SenderType::Admin,
            message_type: MessageType::AdminMessage,
        }
    }
}
