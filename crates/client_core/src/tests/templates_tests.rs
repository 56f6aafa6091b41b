use super::*;
use serde_json::{json, Value};
use shared::protocol::Record;

use crate::{
    backend::Operation,
    confirm::{AlwaysConfirm, AlwaysDecline},
    memory::InMemoryBackend,
};

fn template_row(id: &str, name: &str) -> Record {
    json!({
        "id": id,
        "template_name": name,
        "subject_template": format!("{name} subject"),
        "content_template": format!("{name} body"),
        "is_default": false,
    })
    .as_object()
    .cloned()
    .expect("object")
}

fn backend_with_templates() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_column_default(TEMPLATES_TABLE, "is_default", json!(false))
        .with_rows(
            TEMPLATES_TABLE,
            vec![
                template_row("t-2", "Water shutoff"),
                template_row("t-1", "Annual meeting"),
            ],
        )
}

#[tokio::test]
async fn load_all_orders_by_name() {
    let store = TemplateStore::new(Arc::new(backend_with_templates()));
    let names: Vec<_> = store
        .load_all()
        .await
        .expect("load")
        .into_iter()
        .map(|template| template.name)
        .collect();
    assert_eq!(names, vec!["Annual meeting", "Water shutoff"]);
}

#[tokio::test]
async fn load_all_on_empty_table_is_empty() {
    let store = TemplateStore::new(Arc::new(InMemoryBackend::new()));
    assert!(store.load_all().await.expect("load").is_empty());
}

#[tokio::test]
async fn failed_load_keeps_previous_list() {
    let backend = Arc::new(backend_with_templates());
    let store = TemplateStore::new(backend.clone());
    store.load_all().await.expect("load");

    backend.fail(Operation::List, "timeout").await;
    let err = store.load_all().await.err().expect("error");
    assert!(matches!(err, MessagingError::LoadTemplatesFailed(_)));
    assert_eq!(store.templates().await.len(), 2);
}

#[tokio::test]
async fn saving_new_template_inserts_only_writable_columns() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = TemplateStore::new(backend.clone());

    let mut draft = Template::new("Pool", "Pool notice", "The pool is closed");
    draft.is_default = true;
    let saved = store.save(&draft).await.expect("save");

    let rows = backend.rows(TEMPLATES_TABLE).await;
    assert_eq!(rows.len(), 1);
    let mut sent = rows[0].clone();
    let generated_id = sent.remove("id").expect("id assigned by backend");
    assert_eq!(
        Value::Object(sent),
        json!({
            "template_name": "Pool",
            "subject_template": "Pool notice",
            "content_template": "The pool is closed",
        })
    );

    assert_eq!(saved.id.as_str(), generated_id.as_str().expect("string id"));
    assert_eq!(store.templates().await, vec![saved]);
}

#[tokio::test]
async fn saving_existing_template_updates_by_id_and_refreshes() {
    let backend = Arc::new(backend_with_templates());
    let store = TemplateStore::new(backend.clone());
    store.load_all().await.expect("load");

    let mut template = store
        .find(&TemplateId::from("t-1"))
        .await
        .expect("template");
    template.name = "Annual general meeting".into();
    let saved = store.save(&template).await.expect("save");
    assert_eq!(saved.name, "Annual general meeting");

    let calls = backend.calls().await;
    assert!(calls
        .iter()
        .any(|call| call.operation == Operation::Update && call.table == TEMPLATES_TABLE));
    assert!(!calls.iter().any(|call| call.operation == Operation::Insert));
    assert_eq!(
        calls.last().map(|call| call.operation),
        Some(Operation::List)
    );
    assert_eq!(
        store
            .find(&TemplateId::from("t-1"))
            .await
            .map(|template| template.name),
        Some("Annual general meeting".to_string())
    );
}

#[tokio::test]
async fn saving_duplicate_content_returns_the_new_row() {
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_column_default(TEMPLATES_TABLE, "is_default", json!(false))
            .with_rows(
                TEMPLATES_TABLE,
                vec![json!({
                    "id": "t-old",
                    "template_name": "Pool",
                    "subject_template": "Pool notice",
                    "content_template": "The pool is closed",
                    "is_default": true,
                })
                .as_object()
                .cloned()
                .expect("object")],
            ),
    );
    let store = TemplateStore::new(backend.clone());
    store.load_all().await.expect("load");

    let saved = store
        .save(&Template::new("Pool", "Pool notice", "The pool is closed"))
        .await
        .expect("save");
    assert_ne!(saved.id, TemplateId::from("t-old"));
    assert!(!saved.is_default);
    assert_eq!(store.templates().await.len(), 2);
}

#[tokio::test]
async fn incomplete_template_is_rejected_locally() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = TemplateStore::new(backend.clone());

    for draft in [
        Template::new("", "s", "b"),
        Template::new("n", "", "b"),
        Template::new("n", "s", ""),
    ] {
        let err = store.save(&draft).await.err().expect("error");
        assert!(matches!(err, MessagingError::IncompleteTemplate));
    }
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn backend_failure_on_save_is_reported_generically() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.fail(Operation::Insert, "duplicate key").await;
    let store = TemplateStore::new(backend.clone());

    let err = store
        .save(&Template::new("n", "s", "b"))
        .await
        .err()
        .expect("error");
    assert_eq!(err.to_string(), "Failed to save template");
    assert!(err
        .backend_cause()
        .is_some_and(|cause| cause.to_string().contains("duplicate key")));
}

#[tokio::test]
async fn declined_delete_is_a_no_op() {
    let backend = Arc::new(backend_with_templates());
    let store = TemplateStore::new(backend.clone());
    store.load_all().await.expect("load");
    let calls_before = backend.calls().await.len();

    let outcome = store
        .delete(&TemplateId::from("t-1"), &AlwaysDecline)
        .await
        .expect("delete");
    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(backend.calls().await.len(), calls_before);
    assert_eq!(backend.rows(TEMPLATES_TABLE).await.len(), 2);
}

#[tokio::test]
async fn confirmed_delete_removes_and_reloads() {
    let backend = Arc::new(backend_with_templates());
    let store = TemplateStore::new(backend.clone());
    store.load_all().await.expect("load");

    let outcome = store
        .delete(&TemplateId::from("t-1"), &AlwaysConfirm)
        .await
        .expect("delete");
    assert_eq!(outcome, DeleteOutcome::Deleted);
    let remaining: Vec<_> = store
        .templates()
        .await
        .into_iter()
        .map(|template| template.id)
        .collect();
    assert_eq!(remaining, vec![TemplateId::from("t-2")]);
}

#[tokio::test]
async fn failed_delete_reports_generic_message() {
    let backend = Arc::new(backend_with_templates());
    backend.fail(Operation::Delete, "foreign key").await;
    let store = TemplateStore::new(backend);

    let err = store
        .delete(&TemplateId::from("t-1"), &AlwaysConfirm)
        .await
        .err()
        .expect("error");
    assert_eq!(err.to_string(), "Failed to delete template");
}
