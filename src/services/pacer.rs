use std::time::Duration;

use tokio::{sync::watch, time::Instant};

/// Spaces out upstream calls.
///
/// Invariant: at least `spacing` passes between `finish()` of one call and the
/// return of the next `ready()`, regardless of how long the call itself took.
#[derive(Debug)]
pub struct RequestPacer {
    spacing: Duration,
    last_finished: Option<Instant>,
}

impl RequestPacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_finished: None,
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Waits until the next call may start. Returns false if shutdown was
    /// signalled while waiting.
    pub async fn ready(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }
        let Some(last) = self.last_finished else {
            return true;
        };

        let deadline = last + self.spacing;
        if deadline <= Instant::now() {
            return true;
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                res = shutdown.changed() => {
                    if res.is_err() {
                        // sender gone, nobody can ask us to stop anymore
                        tokio::time::sleep_until(deadline).await;
                        return true;
                    }
                    if *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }

    pub fn finish(&mut self) {
        self.last_finished = Some(Instant::now());
    }
}
