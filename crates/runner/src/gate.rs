use async_trait::async_trait;
use tracing::info;

use keycheck_core::ports::ConfirmGate;

/// Production gate: print the instructions and block until the operator
/// presses Enter. Runs on the blocking pool so the runtime (and with it the
/// cancellation signal handler) stays responsive.
pub struct StdinGate;

#[async_trait]
impl ConfirmGate for StdinGate {
    async fn proceed(&self, prompt: &str) -> anyhow::Result<()> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            eprintln!("{}", prompt);
            eprint!("Press Enter to continue... ");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(())
        })
        .await??;
        info!("manual login acknowledged");
        Ok(())
    }
}
