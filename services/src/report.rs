//! Read-side aggregates over the per-session and per-student indexes.

use db::models::attendance_record::AttendanceStatus;
use serde::Serialize;

use crate::store::AttendanceRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

impl StatusCounts {
    fn tally<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let mut counts = StatusCounts::default();
        for record in records {
            match record.status {
                AttendanceStatus::Present => counts.present += 1,
                AttendanceStatus::Absent => counts.absent += 1,
                AttendanceStatus::Late => counts.late += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.late
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: i64,
    pub total: usize,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

impl SessionSummary {
    pub fn from_records(session_id: i64, records: &[AttendanceRecord]) -> Self {
        let counts = StatusCounts::tally(records.iter().filter(|r| r.session_id == session_id));
        Self {
            session_id,
            total: counts.total(),
            counts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
    pub student_id: String,
    pub total_sessions: usize,
    #[serde(flatten)]
    pub counts: StatusCounts,
    /// Share of sessions marked present, 0-100. Late does not count.
    pub present_percentage: f64,
    pub records: Vec<AttendanceRecord>,
}

impl StudentReport {
    pub fn from_records(student_id: &str, records: Vec<AttendanceRecord>) -> Self {
        let records: Vec<AttendanceRecord> = records
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect();
        let counts = StatusCounts::tally(&records);
        let total_sessions = records.len();
        let present_percentage = if total_sessions == 0 {
            0.0
        } else {
            counts.present as f64 * 100.0 / total_sessions as f64
        };

        Self {
            student_id: student_id.to_owned(),
            total_sessions,
            counts,
            present_percentage,
            records,
        }
    }
}
