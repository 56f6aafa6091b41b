use std::{collections::BTreeSet, fs, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    AlwaysConfirm, BackendClient, Composer, ConfirmationGate, DeleteOutcome, InMemoryBackend,
    MessagingError, RecipientDirectory, RestBackend, SaveOutcome, SendOutcome, TemplateEditor,
    TemplateStore,
};
use serde_json::Value;
use shared::{
    domain::{RecipientId, TemplateId},
    protocol::TEMPLATES_TABLE,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::{load_settings, BackendKind, Settings};
use console::{print_notice, print_owners, print_templates, StdinConfirmation};

#[derive(Parser, Debug)]
#[command(
    name = "admin_console",
    about = "Send admin messages to owners and manage message templates"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage reusable message templates.
    Templates {
        #[command(subcommand)]
        action: TemplateCommand,
    },
    /// Inspect the owner directory.
    Owners {
        #[command(subcommand)]
        action: OwnerCommand,
    },
    /// Compose and send a message to one or more owners.
    Send(SendArgs),
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum OwnerCommand {
    List,
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Seed subject and body from this template.
    #[arg(long)]
    template: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    body: Option<String>,
    /// Owner id to address; repeat for several owners.
    #[arg(long = "to", conflicts_with = "all")]
    to: Vec<String>,
    /// Address every owner in the directory.
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings();
    let backend = build_backend(&settings)?;

    let templates = Arc::new(TemplateStore::new(backend.clone()));
    let directory = Arc::new(RecipientDirectory::new(backend.clone()));

    match cli.command {
        Command::Templates { action } => run_templates(action, templates).await,
        Command::Owners {
            action: OwnerCommand::List,
        } => {
            let owners = directory.load_all().await.map_err(user_facing)?;
            print_owners(&owners);
            Ok(())
        }
        Command::Send(args) => {
            let composer = Composer::new(backend, directory, templates);
            run_send(args, &composer).await
        }
    }
}

fn build_backend(settings: &Settings) -> Result<Arc<dyn BackendClient>> {
    match settings.backend {
        BackendKind::Rest => {
            if settings.supabase_anon_key.is_empty() {
                warn!("no anon key configured; backend requests are unauthenticated");
            }
            let backend =
                RestBackend::new(&settings.supabase_url, settings.supabase_anon_key.clone())
                    .context("failed to configure REST backend")?;
            info!(url = %backend.rest_url(), "using REST backend");
            Ok(Arc::new(backend))
        }
        BackendKind::Memory => {
            let backend = match &settings.seed_path {
                Some(path) => {
                    let raw = fs::read_to_string(path)
                        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
                    let seed: Value = serde_json::from_str(&raw)
                        .with_context(|| format!("seed file '{}' is not JSON", path.display()))?;
                    InMemoryBackend::from_seed(seed)?
                }
                None => InMemoryBackend::new(),
            };
            info!("using in-memory backend; changes last for this run only");
            Ok(Arc::new(backend.with_column_default(
                TEMPLATES_TABLE,
                "is_default",
                Value::Bool(false),
            )))
        }
    }
}

async fn run_templates(action: TemplateCommand, store: Arc<TemplateStore>) -> Result<()> {
    match action {
        TemplateCommand::List => {
            let templates = store.load_all().await.map_err(user_facing)?;
            print_templates(&templates);
        }
        TemplateCommand::Create {
            name,
            subject,
            body,
        } => {
            let editor = TemplateEditor::new(store);
            editor.open_new().await;
            editor.set_name(name).await;
            editor.set_subject(subject).await;
            editor.set_body(body).await;
            save_with(&editor).await?;
        }
        TemplateCommand::Edit {
            id,
            name,
            subject,
            body,
        } => {
            store.load_all().await.map_err(user_facing)?;
            let template = store
                .find(&TemplateId::from(id))
                .await
                .ok_or_else(|| user_facing(MessagingError::TemplateNotFound))?;
            let editor = TemplateEditor::new(store);
            editor.open(&template).await;
            if let Some(name) = name {
                editor.set_name(name).await;
            }
            if let Some(subject) = subject {
                editor.set_subject(subject).await;
            }
            if let Some(body) = body {
                editor.set_body(body).await;
            }
            save_with(&editor).await?;
        }
        TemplateCommand::Delete { id, yes } => {
            let gate: &dyn ConfirmationGate = if yes {
                &AlwaysConfirm
            } else {
                &StdinConfirmation
            };
            let outcome = store
                .delete(&TemplateId::from(id), gate)
                .await
                .map_err(user_facing)?;
            match outcome {
                DeleteOutcome::Deleted => println!("Template deleted"),
                DeleteOutcome::Cancelled => println!("Deletion cancelled"),
            }
        }
    }
    Ok(())
}

/// Backend causes are logged where they occur; the terminal only gets the
/// short message.
fn user_facing(err: MessagingError) -> anyhow::Error {
    anyhow!("{err}")
}

async fn save_with(editor: &TemplateEditor) -> Result<()> {
    match editor.save().await.map_err(user_facing)? {
        SaveOutcome::Saved(template) => {
            print_notice(editor.notice().await);
            println!("{}  {}", template.id, template.name);
            Ok(())
        }
        SaveOutcome::Ignored => Err(anyhow!("template editor was not open")),
    }
}

async fn run_send(args: SendArgs, composer: &Composer) -> Result<()> {
    composer.initialize().await;
    if let Some(notice) = composer.notice().await {
        if notice.is_error() {
            bail!("{}", notice.message());
        }
    }

    if let Some(template) = args.template {
        composer
            .select_template(&TemplateId::from(template))
            .await
            .map_err(user_facing)?;
    }
    if let Some(subject) = args.subject {
        composer.set_subject(subject).await;
    }
    if let Some(body) = args.body {
        composer.set_body(body).await;
    }
    if args.all {
        composer.set_all_selected(true).await;
    } else {
        let unique: BTreeSet<String> = args.to.into_iter().collect();
        for id in unique {
            composer.toggle_recipient(&RecipientId::from(id)).await;
        }
    }

    match composer.send().await.map_err(user_facing)? {
        SendOutcome::Sent { recipients } => {
            print_notice(composer.notice().await);
            info!(recipients, "send complete");
            Ok(())
        }
        SendOutcome::AlreadySending => Err(anyhow!("a send is already in progress")),
    }
}
