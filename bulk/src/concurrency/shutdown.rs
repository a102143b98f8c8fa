//! Cancellation signaling for bulk operations.
//!
//! Abstracts tokio's watch channels into a shutdown signal that a caller holds the
//! transmitter side of and every stage of a bulk operation observes. The signal
//! carries no data payload - it purely notifies that the operation must abort.

use tokio::sync::watch;

use crate::error::{BulkResult, ErrorKind};
use crate::{bail, bulk_error};

/// Transmitter side of a shutdown signal channel.
///
/// Calling [`watch::Sender::send`] with `()` cancels every in-flight bulk operation
/// holding a receiver subscribed from this transmitter.
pub type ShutdownTx = watch::Sender<()>;

/// Receiver side of a shutdown signal channel.
///
/// Stages check this between steps and select on it while awaiting, so a
/// cancellation interrupts both queued and in-flight work.
pub type ShutdownRx = watch::Receiver<()>;

/// Creates a new shutdown signal channel.
///
/// Additional receivers can be created from the transmitter via `subscribe`, which
/// keeps call sites clean when one caller drives several operations.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    watch::channel(())
}

/// Returns a cancellation error if the shutdown signal has fired.
///
/// Used at stage boundaries so an operation never starts a new stage after the
/// caller requested an abort.
pub fn check_canceled(shutdown_rx: &mut ShutdownRx) -> BulkResult<()> {
    if shutdown_rx.has_changed().unwrap_or(false) {
        bail!(
            ErrorKind::OperationCanceled,
            "Bulk operation canceled before stage start"
        );
    }

    Ok(())
}

/// Runs a future to completion unless the shutdown signal fires first.
///
/// Cancellation surfaces as [`ErrorKind::OperationCanceled`], distinct from any
/// execution failure the wrapped future could produce.
pub async fn run_cancellable<F, T>(shutdown_rx: &mut ShutdownRx, fut: F) -> BulkResult<T>
where
    F: Future<Output = BulkResult<T>>,
{
    tokio::select! {
        result = fut => result,
        _ = shutdown_rx.changed() => {
            Err(bulk_error!(
                ErrorKind::OperationCanceled,
                "Bulk operation canceled while a stage was in flight"
            ))
        }
    }
}
