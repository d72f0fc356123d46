use async_trait::async_trait;

use crate::types::KeyStatus;

/// One submit-and-classify cycle for a single key. Implementations convert
/// every internal failure into a `KeyStatus` — probing never returns an
/// error that could abort the loop.
#[async_trait]
pub trait KeyProber: Send {
    async fn probe(&mut self, key: &str) -> KeyStatus;

    /// Tear down the underlying session. Called exactly once, on every exit
    /// path out of the verification loop.
    fn close(&mut self) {}
}

/// The human-in-the-loop gate between "browser is open on the login page"
/// and "start probing". The portal requires a real interactive login, so
/// this must block until someone explicitly signals readiness — a CLI
/// prompt in production, an auto-acknowledge in tests. Never skipped.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    async fn proceed(&self, prompt: &str) -> anyhow::Result<()>;
}
