//! Attendance core: signed time-boxed session tokens, a deduplicating
//! attendance ledger, and batch reconciliation of teacher-submitted marks.

pub mod attendance_service;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod qr;
pub mod reconcile;
pub mod report;
pub mod request;
pub mod response;
pub mod state;
pub mod store;
pub mod token;

pub use attendance_service::{AttendanceService, QrImage};
pub use error::AttendanceError;
pub use ledger::{AttendanceLedger, RecordOutcome, StatusOutcome};
pub use reconcile::{BatchEntry, ReconciliationEngine, RowChange, RowOutcome};
pub use response::ServiceResponse;
pub use state::AppState;
pub use store::{AttendanceRecord, SeaOrmStore};
