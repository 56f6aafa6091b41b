use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    AccountId, MessageType, OutboundMessage, Recipient, RecipientId, SenderType, Template,
    TemplateId,
};

pub const TEMPLATES_TABLE: &str = "admin_message_templates";
pub const OWNER_PROFILES_TABLE: &str = "owner_profiles";
pub const SITE_MESSAGES_TABLE: &str = "site_messages";

/// A single backend row, keyed by column name.
pub type Record = Map<String, Value>;

pub fn to_record<T: Serialize>(row: &T) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(row)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "row did not serialize to an object: {other}"
        ))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(record))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    Eq { column: String, value: Value },
}

/// Filters and ordering for a `list` call against one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }
}

/// Row of `admin_message_templates` as read back from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRow {
    pub id: String,
    pub template_name: String,
    pub subject_template: String,
    pub content_template: String,
    #[serde(default)]
    pub is_default: bool,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Self {
            id: TemplateId(row.id),
            name: row.template_name,
            subject_pattern: row.subject_template,
            body_pattern: row.content_template,
            is_default: row.is_default,
        }
    }
}

/// The writable columns of a template. `id` and `is_default` are assigned by
/// the backend and never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateWrite {
    pub template_name: String,
    pub subject_template: String,
    pub content_template: String,
}

impl From<&Template> for TemplateWrite {
    fn from(template: &Template) -> Self {
        Self {
            template_name: template.name.clone(),
            subject_template: template.subject_pattern.clone(),
            content_template: template.body_pattern.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerProfileRow {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub unit_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<OwnerProfileRow> for Recipient {
    fn from(row: OwnerProfileRow) -> Self {
        Self {
            id: RecipientId(row.id),
            account: row.user_id.map(AccountId),
            unit_label: row.unit_number.unwrap_or_default(),
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
        }
    }
}

/// Row written to `site_messages`. An unresolved recipient is written as an
/// explicit `null` so every row in a batch carries the same columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMessageRow {
    #[serde(default)]
    pub recipient_user_id: Option<String>,
    pub subject: String,
    pub content: String,
    pub sender_type: SenderType,
    pub message_type: MessageType,
}

impl From<&OutboundMessage> for SiteMessageRow {
    fn from(message: &OutboundMessage) -> Self {
        Self {
            recipient_user_id: message.recipient.as_ref().map(|account| account.0.clone()),
            subject: message.subject.clone(),
            content: message.body.clone(),
            sender_type: message.sender_type,
            message_type: message.message_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_write_omits_server_assigned_columns() {
        let mut template = Template::new("Pool", "Pool notice", "The pool is closed");
        template.id = TemplateId::from("t-1");
        template.is_default = true;

        let record = to_record(&TemplateWrite::from(&template)).expect("record");
        assert_eq!(
            Value::Object(record),
            json!({
                "template_name": "Pool",
                "subject_template": "Pool notice",
                "content_template": "The pool is closed",
            })
        );
    }

    #[test]
    fn site_message_uses_constant_tags() {
        let message = OutboundMessage::admin(Some(AccountId::from("acct-a")), "Notice", "Body");
        let record = to_record(&SiteMessageRow::from(&message)).expect("record");
        assert_eq!(record["recipient_user_id"], json!("acct-a"));
        assert_eq!(record["sender_type"], json!("admin"));
        assert_eq!(record["message_type"], json!("admin_message"));
        assert_eq!(record["content"], json!("Body"));
    }

    #[test]
    fn site_message_without_account_writes_null_target() {
        let resolved = OutboundMessage::admin(Some(AccountId::from("acct-a")), "Notice", "Body");
        let unresolved = OutboundMessage::admin(None, "Notice", "Body");
        let resolved = to_record(&SiteMessageRow::from(&resolved)).expect("record");
        let unresolved = to_record(&SiteMessageRow::from(&unresolved)).expect("record");

        assert_eq!(unresolved.get("recipient_user_id"), Some(&Value::Null));
        assert!(resolved.keys().eq(unresolved.keys()));
    }

    #[test]
    fn owner_profile_tolerates_missing_columns() {
        let row: OwnerProfileRow =
            from_record(to_record(&json!({ "id": "o-1", "unit_number": "101" })).expect("record"))
                .expect("row");
        let recipient = Recipient::from(row);
        assert_eq!(recipient.unit_label, "101");
        assert!(!recipient.is_addressable());
    }
}
