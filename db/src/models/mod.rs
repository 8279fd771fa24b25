pub mod attendance_record;
pub mod class_session;
pub mod session_student;

pub use attendance_record::Entity as AttendanceRecord;
pub use class_session::Entity as ClassSession;
pub use session_student::Entity as SessionStudent;
