use std::future::Future;
use std::time::Duration;

use crate::app::{PanelcastError, Result};

/// Run network work as its own tokio task under a deadline.
///
/// A timeout aborts the task; a panic inside it comes back as an error.
/// Either way the caller sees a recoverable [`PanelcastError`].
pub async fn run_isolated<T, F>(label: &str, deadline: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(work);

    match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            tracing::error!("Task join error in {}: {}", label, join_error);
            Err(PanelcastError::Other(format!("{} failed: {}", label, join_error)))
        }
        Err(_) => {
            handle.abort();
            Err(PanelcastError::Timeout(format!(
                "{} after {:.1}s",
                label,
                deadline.as_secs_f64()
            )))
        }
    }
}
