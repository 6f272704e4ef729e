//! Unit tests for outbound action blocks and agent commands.

use std::str::FromStr;

use ami_monitor::ami::action::{ActionRequest, AgentAction, AgentActionCommand};
use ami_monitor::AppError;

fn wire(request: &ActionRequest) -> String {
    request.to_string()
}

// ── ActionRequest ────────────────────────────────────────────

#[test]
fn headers_keep_insertion_order() {
    let request = ActionRequest::new("Custom")
        .header("B", "2")
        .header("A", "1");

    assert_eq!(request.action(), "Custom");
    assert_eq!(
        request.headers(),
        &[
            ("Action".to_owned(), "Custom".to_owned()),
            ("B".to_owned(), "2".to_owned()),
            ("A".to_owned(), "1".to_owned()),
        ]
    );
}

#[test]
fn to_lines_ends_with_empty_line() {
    let lines = ActionRequest::logoff().to_lines();
    assert_eq!(lines, vec!["Action: Logoff".to_owned(), String::new()]);
}

#[test]
fn login_turns_events_off() {
    assert_eq!(
        wire(&ActionRequest::login("admin", "s3cret")),
        "Action: Login\r\nUsername: admin\r\nSecret: s3cret\r\nEvents: off\r\n\r\n"
    );
}

#[test]
fn listing_actions_carry_no_extra_headers() {
    assert_eq!(
        wire(&ActionRequest::queue_status()),
        "Action: QueueStatus\r\n\r\n"
    );
    assert_eq!(
        wire(&ActionRequest::core_show_channels()),
        "Action: CoreShowChannels\r\n\r\n"
    );
}

#[test]
fn optional_header_skips_none() {
    let request = ActionRequest::new("X").optional_header("Queue", None::<&str>);
    assert_eq!(request.headers().len(), 1);
}

// ── AgentActionCommand ───────────────────────────────────────

#[test]
fn pause_with_queue_serializes_in_order() {
    let cmd = AgentActionCommand::new(
        AgentAction::Pause,
        "Agent/1001",
        Some("support".to_owned()),
    );

    assert_eq!(
        wire(&cmd.to_request()),
        "Action: QueuePause\r\nInterface: Agent/1001\r\nQueue: support\r\nPaused: true\r\n\r\n"
    );
}

#[test]
fn unpause_sends_paused_false() {
    let cmd = AgentActionCommand::new(AgentAction::Unpause, "SIP/1001", None);

    assert_eq!(
        wire(&cmd.to_request()),
        "Action: QueuePause\r\nInterface: SIP/1001\r\nPaused: false\r\n\r\n"
    );
}

#[test]
fn remove_omits_paused_header() {
    let cmd = AgentActionCommand::new(
        AgentAction::Remove,
        "Agent/1001",
        Some("sales".to_owned()),
    );

    assert_eq!(
        wire(&cmd.to_request()),
        "Action: QueueRemove\r\nInterface: Agent/1001\r\nQueue: sales\r\n\r\n"
    );
}

#[test]
fn empty_queue_is_treated_as_absent() {
    let cmd = AgentActionCommand::new(AgentAction::Pause, "Agent/1", Some(String::new()));

    let request = cmd.to_request();
    assert!(request.headers().iter().all(|(key, _)| key != "Queue"));
}

// ── AgentAction ──────────────────────────────────────────────

#[test]
fn agent_action_parses_case_insensitively() {
    assert_eq!(AgentAction::from_str("pause").unwrap(), AgentAction::Pause);
    assert_eq!(AgentAction::from_str(" UnPause ").unwrap(), AgentAction::Unpause);
    assert_eq!(AgentAction::from_str("REMOVE").unwrap(), AgentAction::Remove);
}

#[test]
fn unknown_agent_action_is_action_error() {
    let err = AgentAction::from_str("transfer").expect_err("not an agent action");
    assert_eq!(
        err,
        AppError::Action("invalid agent action: transfer".into())
    );
}

#[test]
fn agent_action_serde_uses_snake_case() {
    assert_eq!(
        serde_json::to_string(&AgentAction::Unpause).unwrap(),
        "\"unpause\""
    );
    let parsed: AgentAction = serde_json::from_str("\"remove\"").unwrap();
    assert_eq!(parsed, AgentAction::Remove);
    assert!(serde_json::from_str::<AgentAction>("\"Pause\"").is_err());
}

#[test]
fn agent_action_display_matches_wire_name() {
    assert_eq!(AgentAction::Pause.to_string(), "pause");
    assert_eq!(AgentAction::Remove.as_str(), "remove");
}

// ── Header validation ────────────────────────────────────────

#[test]
fn plain_headers_pass_validation() {
    let cmd = AgentActionCommand::new(
        AgentAction::Pause,
        "Agent/1001",
        Some("support".to_owned()),
    );
    assert!(cmd.to_request().validate().is_ok());
    assert!(ActionRequest::login("admin", "s3cret").validate().is_ok());
}

#[test]
fn line_break_in_value_fails_validation() {
    let cmd = AgentActionCommand::new(
        AgentAction::Pause,
        "Agent/1\r\n\r\nAction: Logoff",
        None,
    );

    let err = cmd.to_request().validate().expect_err("value splits the block");

    assert_eq!(
        err,
        AppError::Action("\"QueuePause\" header \"Interface\" contains a line break".into())
    );
}

#[test]
fn bare_lf_in_queue_fails_validation() {
    let cmd = AgentActionCommand::new(
        AgentAction::Remove,
        "Agent/1",
        Some("support\nAction: Originate".to_owned()),
    );
    assert!(matches!(
        cmd.to_request().validate(),
        Err(AppError::Action(ref msg)) if msg.contains("\"Queue\"")
    ));
}

#[test]
fn line_break_in_key_fails_validation() {
    let request = ActionRequest::new("Custom").header("X\rY", "1");
    assert!(request.validate().is_err());
}

#[test]
fn validation_error_does_not_echo_the_value() {
    let err = ActionRequest::login("admin", "hunter2\r\nEvents: on")
        .validate()
        .expect_err("secret splits the block");
    assert!(!err.to_string().contains("hunter2"), "leaked: {err}");
}
