//! Cooperative shutdown signal
//!
//! A `watch::Receiver<bool>` flips to `true` once shutdown is requested.

use tokio::sync::watch;

/// Resolve once shutdown is requested.
///
/// A dropped sender means nobody can ask for shutdown any more, so this
/// then never resolves.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Non-blocking check
pub fn is_shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}
