//! Terminal rendering and the stdin confirmation prompt.

use async_trait::async_trait;
use client_core::{ConfirmationGate, Notice};
use shared::domain::{Recipient, Template};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

/// Asks on stderr and reads the answer from stdin. Anything but `y`/`yes`
/// declines.
pub struct StdinConfirmation;

#[async_trait]
impl ConfirmationGate for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        let mut stderr = tokio::io::stderr();
        ask(prompt, BufReader::new(tokio::io::stdin()), &mut stderr).await
    }
}

/// Writes the prompt and reads one answer line. Any I/O failure declines.
async fn ask<R, W>(prompt: &str, mut input: R, output: &mut W) -> bool
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let written = async {
        output.write_all(format!("{prompt} [y/N] ").as_bytes()).await?;
        output.flush().await
    };
    if let Err(err) = written.await {
        warn!(error = %err, "could not show confirmation prompt");
        return false;
    }

    let mut answer = String::new();
    match input.read_line(&mut answer).await {
        Ok(_) => is_yes(&answer),
        Err(err) => {
            warn!(error = %err, "could not read confirmation");
            false
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn print_templates(templates: &[Template]) {
    if templates.is_empty() {
        println!("No templates yet.");
        return;
    }
    for template in templates {
        let marker = if template.is_default { " (default)" } else { "" };
        println!("{}  {}{}", template.id, template.name, marker);
        println!("    subject: {}", template.subject_pattern);
        println!("    body:    {}", first_line(&template.body_pattern));
    }
}

pub fn print_owners(owners: &[Recipient]) {
    if owners.is_empty() {
        println!("No owners found.");
        return;
    }
    for owner in owners {
        let reachable = if owner.is_addressable() { "" } else { "  [no account]" };
        println!(
            "{}  unit {:<6} {} <{}>{}",
            owner.id,
            owner.unit_label,
            owner.display_name(),
            owner.email,
            reachable
        );
    }
}

pub fn print_notice(notice: Option<Notice>) {
    match notice {
        Some(Notice::Success(message)) => println!("{message}"),
        Some(Notice::Error(message)) => eprintln!("{message}"),
        None => {}
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
    };

    /// Accepts writes but cannot flush, like a closed terminal.
    struct UnflushableWriter;

    impl AsyncWrite for UnflushableWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn ask_shows_prompt_and_reads_answer() {
        let mut output = Vec::new();
        assert!(ask("Delete it?", &b"yes\n"[..], &mut output).await);
        assert_eq!(String::from_utf8(output).expect("utf8"), "Delete it? [y/N] ");
    }

    #[tokio::test]
    async fn unflushed_prompt_declines() {
        assert!(!ask("Delete it?", &b"y\n"[..], &mut UnflushableWriter).await);
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn first_line_of_multiline_body() {
        assert_eq!(first_line("Dear owner,\nThe pool is closed."), "Dear owner,");
        assert_eq!(first_line(""), "");
    }
}
