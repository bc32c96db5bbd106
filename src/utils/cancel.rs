// src/utils/cancel.rs

//! Cooperative cancellation shared between the CLI and a running crawl.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{AppError, Result};

/// Clonable cancellation signal; every clone observes the same state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal fires.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so this only errors if it was dropped.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Fail fast with [`AppError::Cancelled`] if the signal already fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `delay`, aborting with [`AppError::Cancelled`] if the signal
    /// fires first.
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.check()?;
        tokio::select! {
            _ = self.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_cancel() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_sleep_aborts_when_cancelled() {
        let token = CancelToken::new();
        let remote = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.cancel();
        });

        let err = token.sleep(Duration::from_secs(30)).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_check_after_cancel() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        token.cancel();
        assert!(token.check().unwrap_err().is_cancelled());
    }
}
