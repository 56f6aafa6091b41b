use async_trait::async_trait;

/// Yes/no gate asked before destructive actions.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

pub struct AlwaysConfirm;

#[async_trait]
impl ConfirmationGate for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

pub struct AlwaysDecline;

#[async_trait]
impl ConfirmationGate for AlwaysDecline {
    async fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
