/// Centralized helper for WebSocket error frames.
///
/// Used for failures that happen before a frame reaches the coordinator
/// (parse errors, serialization errors); coordinator-level rejections travel
/// as regular `error` events instead.

/// Formats a WebSocket error message as a JSON string.
///
/// # Arguments
/// - `code`: Unique error code (e.g. "INVALID_MESSAGE").
/// - `message`: Human-readable error message.
/// - `context`: Optional context (e.g. connection id).
pub fn ws_error_message(code: &str, message: &str, context: Option<&str>) -> String {
    let context_str = context.unwrap_or("");
    format!(
        r#"{{"action":"error","data":{{"code":"{}","message":"{}","context":"{}"}}}}"#,
        code, message, context_str
    )
}
