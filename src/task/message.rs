//! User-facing failure messages.

use crate::executor::{ErrorDetail, ExecutorError};

/// Shown when nothing more specific can be said about a failure.
pub const UNKNOWN_FAILURE_MESSAGE: &str = "An unknown error occurred during generation.";

/// Shown when the service answered with an empty file.
pub const EMPTY_RESULT_MESSAGE: &str = "The generated presentation file is empty.";

/// Turns an executor failure into the message stored in `TaskState::Failed`.
///
/// Server errors prefer a per-field validation message, then a generic error
/// string from the body, then the status text, then
/// [`UNKNOWN_FAILURE_MESSAGE`].
#[must_use]
pub fn failure_message(error: &ExecutorError) -> String {
    match error {
        ExecutorError::Server {
            status,
            status_text,
            detail,
        } => match detail {
            Some(ErrorDetail::Field(message) | ErrorDetail::Message(message)) => message.clone(),
            None => match status_text {
                Some(text) => format!("Request failed: {text} ({status})"),
                None => UNKNOWN_FAILURE_MESSAGE.to_string(),
            },
        },
        ExecutorError::Network { source, .. } => {
            format!("Could not reach the generation service: {source}")
        }
        ExecutorError::EmptyResult => EMPTY_RESULT_MESSAGE.to_string(),
        ExecutorError::Parse { reason } => reason.clone(),
        ExecutorError::InvalidEndpoint { .. } | ExecutorError::Client { .. } => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_detail_wins() {
        let error = ExecutorError::server(
            422,
            Some(ErrorDetail::Field("num_slides must be positive".to_string())),
        );
        assert_eq!(failure_message(&error), "num_slides must be positive");
    }

    #[test]
    fn test_message_detail() {
        let error =
            ExecutorError::server(500, Some(ErrorDetail::Message("model timeout".to_string())));
        assert_eq!(failure_message(&error), "model timeout");
    }

    #[test]
    fn test_status_text_fallback() {
        let error = ExecutorError::server(502, None);
        assert_eq!(failure_message(&error), "Request failed: Bad Gateway (502)");
    }

    #[test]
    fn test_unknown_status_uses_generic_fallback() {
        let error = ExecutorError::server(599, None);
        assert_eq!(failure_message(&error), UNKNOWN_FAILURE_MESSAGE);
    }

    #[test]
    fn test_empty_and_parse_messages() {
        assert_eq!(
            failure_message(&ExecutorError::EmptyResult),
            "The generated presentation file is empty."
        );
        assert_eq!(
            failure_message(&ExecutorError::parse(
                "Server did not provide a download link despite success status."
            )),
            "Server did not provide a download link despite success status."
        );
    }

    #[test]
    fn test_invalid_endpoint_uses_display() {
        let message = failure_message(&ExecutorError::invalid_endpoint("nope"));
        assert!(message.contains("nope"), "Expected endpoint in: {message}");
    }
}
