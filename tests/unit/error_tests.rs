//! Unit tests for `AppError` display format, session fatality, and HTTP
//! status mapping.

use axum::http::StatusCode;

use ami_monitor::AppError;

fn every_kind(msg: &str) -> Vec<AppError> {
    vec![
        AppError::Config(msg.into()),
        AppError::Connection(msg.into()),
        AppError::Authentication(msg.into()),
        AppError::Protocol(msg.into()),
        AppError::Action(msg.into()),
        AppError::Io(msg.into()),
    ]
}

#[test]
fn display_carries_kind_prefix() {
    let prefixes: Vec<_> = every_kind("boom")
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(
        prefixes,
        [
            "config: boom",
            "connection: boom",
            "authentication: boom",
            "protocol: boom",
            "action: boom",
            "io: boom",
        ]
    );
}

#[test]
fn action_error_keeps_multiline_response() {
    let err = AppError::Action("Response: Error\nMessage: Interface not found".into());
    assert_eq!(
        err.to_string(),
        "action: Response: Error\nMessage: Interface not found"
    );
}

#[test]
fn error_message_no_trailing_period() {
    for err in every_kind("write failed") {
        let s = err.to_string();
        assert!(!s.ends_with('.'), "error message must not end with a period: {s}");
    }
}

#[test]
fn only_transport_and_protocol_errors_are_session_fatal() {
    let fatal: Vec<_> = every_kind("x")
        .into_iter()
        .filter(AppError::is_session_fatal)
        .collect();

    assert_eq!(
        fatal,
        [
            AppError::Connection("x".into()),
            AppError::Authentication("x".into()),
            AppError::Protocol("x".into()),
        ]
    );
}

#[test]
fn io_error_converts_to_connection() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
    let err = AppError::from(io);
    assert!(matches!(err, AppError::Connection(ref msg) if msg.contains("reset by peer")));
}

#[test]
fn status_codes_follow_error_kind() {
    let codes: Vec<_> = every_kind("x").iter().map(AppError::status_code).collect();

    assert_eq!(
        codes,
        [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::BAD_GATEWAY,
            StatusCode::BAD_GATEWAY,
            StatusCode::BAD_REQUEST,
            StatusCode::INTERNAL_SERVER_ERROR,
        ]
    );
}

#[test]
fn implements_std_error_trait() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    let err = AppError::Protocol("truncated".into());
    assert_error(&err);
    assert!(format!("{err:?}").contains("Protocol"));
}
