//! Interactive confirmation on the terminal.

use async_trait::async_trait;
use conform_domain::ConfirmationPrompt;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Asks on stderr and reads a `y`/`yes` answer from stdin.
///
/// Anything else, including EOF or a read error, is a no.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

#[async_trait]
impl ConfirmationPrompt for StdinPrompt {
    async fn ask(&self, message: &str) -> bool {
        let message = message.to_string();
        let answer = tokio::task::spawn_blocking(move || read_answer(&message)).await;
        match answer {
            Ok(Ok(yes)) => yes,
            Ok(Err(err)) => {
                debug!(error = %err, "confirmation read failed; treating as no");
                false
            }
            Err(err) => {
                debug!(error = %err, "confirmation task failed; treating as no");
                false
            }
        }
    }
}

fn read_answer(message: &str) -> io::Result<bool> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{message} [y/N] ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(is_yes(&line))
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
