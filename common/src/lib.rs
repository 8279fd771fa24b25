pub mod config;
pub mod logger;

use validator::ValidationErrors;

/// Flattens validator errors into a single `; `-separated message.
///
/// Errors without a custom message fall back to `<field>: <code>`.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect::<Vec<_>>();
    messages.sort();
    messages.join("; ")
}
