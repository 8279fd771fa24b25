use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::store::AttendanceRecord;

/// Hook invoked after a record is written. Delivery (email, chat, push) lives
/// behind this trait; the core never awaits or retries it.
#[async_trait]
pub trait AttendanceNotifier: Send + Sync {
    async fn on_recorded(&self, record: AttendanceRecord);
}

/// Writes a structured log line per recorded attendance.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl AttendanceNotifier for LogNotifier {
    async fn on_recorded(&self, record: AttendanceRecord) {
        tracing::info!(
            session_id = record.session_id,
            student_id = %record.student_id,
            status = %record.status,
            method = %record.method,
            "attendance notification"
        );
    }
}

/// Fire-and-forget dispatch on the current tokio runtime.
///
/// The record is already stored when this runs. Without a runtime the
/// notification is dropped with a warning.
pub(crate) fn dispatch(notifier: &Arc<dyn AttendanceNotifier>, record: &AttendanceRecord) {
    let Ok(handle) = Handle::try_current() else {
        tracing::warn!(
            session_id = record.session_id,
            student_id = %record.student_id,
            "no async runtime, attendance notification dropped"
        );
        return;
    };

    let notifier = Arc::clone(notifier);
    let record = record.clone();
    handle.spawn(async move {
        notifier.on_recorded(record).await;
    });
}
