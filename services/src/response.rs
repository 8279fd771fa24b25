use serde::Serialize;

use crate::error::AttendanceError;

/// Uniform envelope for every request-level operation:
///
/// ```json
/// {
///   "success": false,
///   "data": null,
///   "message": "invalid token: token has expired",
///   "error": "expired",
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub retryable: bool,
}

impl<T> ServiceResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            retryable: false,
        }
    }

    pub fn error(err: &AttendanceError) -> Self {
        Self {
            success: false,
            data: None,
            message: err.to_string(),
            error: Some(err.kind()),
            retryable: err.is_retryable(),
        }
    }

    /// Wraps an operation result, asking `describe` for the success message.
    pub fn from_result(
        result: Result<T, AttendanceError>,
        describe: impl FnOnce(&T) -> String,
    ) -> Self {
        match result {
            Ok(data) => {
                let message = describe(&data);
                Self::success(data, message)
            }
            Err(err) => Self::error(&err),
        }
    }
}
