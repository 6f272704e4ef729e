//! Unit tests for the grammar-driven event list decoder.

use ami_monitor::ami::parser::{
    Completion, EventBlockParser, Progress, CORE_SHOW_CHANNELS, QUEUE_STATUS,
};
use ami_monitor::models::channel::ChannelRecord;
use ami_monitor::models::queue::QueueSnapshot;
use ami_monitor::AppError;

fn queues(lines: &[&str]) -> Vec<QueueSnapshot> {
    EventBlockParser::parse_lines(&QUEUE_STATUS, lines).expect("complete listing")
}

fn channels(lines: &[&str]) -> Vec<ChannelRecord> {
    EventBlockParser::parse_lines(&CORE_SHOW_CHANNELS, lines).expect("complete listing")
}

// ── QueueStatus ──────────────────────────────────────────────

#[test]
fn single_queue_block_with_completion_event() {
    let records = queues(&[
        "Event: QueueParams",
        "Queue: support",
        "Calls: 3",
        "Completed: 10",
        "Abandoned: 1",
        "ServiceLevel: 90.5",
        "Event: QueueStatusComplete",
    ]);

    assert_eq!(
        records,
        vec![QueueSnapshot {
            name: "support".into(),
            calls: 3,
            completed: 10,
            abandoned: 1,
            service_level: 90.5,
        }]
    );
}

#[test]
fn each_start_marker_yields_one_record_in_order() {
    let records = queues(&[
        "Response: Success",
        "EventList: start",
        "",
        "Event: QueueParams",
        "Queue: a",
        "",
        "Event: QueueParams",
        "Queue: b",
        "",
        "Event: QueueParams",
        "Queue: c",
        "",
        "Event: QueueStatusComplete",
    ]);

    let names: Vec<_> = records.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn member_blocks_do_not_leak_into_queue_records() {
    let records = queues(&[
        "Event: QueueParams",
        "Queue: support",
        "Calls: 2",
        "",
        "Event: QueueMember",
        "Queue: overflow",
        "Calls: 99",
        "",
        "Event: QueueStatusComplete",
    ]);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "support");
    assert_eq!(records[0].calls, 2);
}

#[test]
fn fields_before_first_start_marker_are_ignored() {
    let records = queues(&[
        "Queue: stray",
        "Calls: 7",
        "Event: QueueParams",
        "Queue: real",
        "--END COMMAND--",
    ]);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "real");
    assert_eq!(records[0].calls, 0);
}

#[test]
fn unparseable_integer_is_skipped() {
    let records = queues(&[
        "Event: QueueParams",
        "Queue: support",
        "Calls: many",
        "Completed: 5",
        "Event: QueueStatusComplete",
    ]);

    assert_eq!(records[0].calls, 0);
    assert_eq!(records[0].completed, 5);
}

#[test]
fn keys_match_exactly_and_values_are_trimmed() {
    let records = queues(&[
        "Event: QueueParams",
        "Queue:   padded  ",
        "CallsTaken: 40",
        "ServiceLevelPerf: 12.0",
        "Event: QueueStatusComplete",
    ]);

    assert_eq!(records[0].name, "padded");
    assert_eq!(records[0].calls, 0);
    assert!(records[0].service_level.abs() < f64::EPSILON);
}

#[test]
fn block_without_known_fields_is_not_emitted() {
    let records = queues(&[
        "Event: QueueParams",
        "Strategy: ringall",
        "Event: QueueStatusComplete",
    ]);

    assert!(records.is_empty());
}

#[test]
fn end_command_flushes_pending_record() {
    let mut parser = EventBlockParser::new(&QUEUE_STATUS);

    assert_eq!(parser.feed("Event: QueueParams"), Progress::Continue);
    assert_eq!(parser.feed("Queue: support"), Progress::Continue);
    assert!(parser.records().is_empty());

    assert_eq!(
        parser.feed("--END COMMAND--"),
        Progress::Complete(Completion::Terminator)
    );
    assert!(parser.is_complete());
    assert_eq!(parser.into_records().len(), 1);
}

#[test]
fn completion_event_reports_trailer_still_pending() {
    let mut parser = EventBlockParser::new(&QUEUE_STATUS);

    assert_eq!(
        parser.feed("Event: QueueStatusComplete"),
        Progress::Complete(Completion::Event)
    );
    assert!(parser.into_records().is_empty());
}

#[test]
fn missing_terminator_is_protocol_error() {
    let err = EventBlockParser::parse_lines(
        &QUEUE_STATUS,
        ["Event: QueueParams", "Queue: support", "Calls: 1"],
    )
    .expect_err("listing never ends");

    assert_eq!(
        err,
        AppError::Protocol("QueueStatus response truncated after 0 record(s)".into())
    );
}

// ── CoreShowChannels ─────────────────────────────────────────

#[test]
fn two_channels_in_input_order() {
    let records = channels(&[
        "Event: CoreShowChannel",
        "Channel: SIP/1001-0001",
        "CallerIDNum: 5551234",
        "Duration: 00:01:05",
        "Application: Queue",
        "",
        "Event: CoreShowChannel",
        "Channel: SIP/1002-0002",
        "CallerIDNum: 5559876",
        "Duration: 00:00:12",
        "Application: Dial",
        "",
        "Event: CoreShowChannelsComplete",
    ]);

    assert_eq!(
        records,
        vec![
            ChannelRecord {
                channel: "SIP/1001-0001".into(),
                caller_id: "5551234".into(),
                duration: "00:01:05".into(),
                application: "Queue".into(),
            },
            ChannelRecord {
                channel: "SIP/1002-0002".into(),
                caller_id: "5559876".into(),
                duration: "00:00:12".into(),
                application: "Dial".into(),
            },
        ]
    );
}

#[test]
fn completion_marker_is_not_mistaken_for_start_marker() {
    let mut parser = EventBlockParser::new(&CORE_SHOW_CHANNELS);

    parser.feed("Event: CoreShowChannel");
    parser.feed("Channel: SIP/1-1");
    let progress = parser.feed("Event: CoreShowChannelsComplete");

    assert_eq!(progress, Progress::Complete(Completion::Event));
    let records = parser.into_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, "SIP/1-1");
}

#[test]
fn application_closes_channel_record() {
    let records = channels(&[
        "Event: CoreShowChannel",
        "Channel: SIP/1-1",
        "Application: Queue",
        "Duration: 00:00:09",
        "Event: CoreShowChannelsComplete",
    ]);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].application, "Queue");
    assert_eq!(records[0].duration, "");
}

#[test]
fn lines_after_completion_are_ignored() {
    let mut parser = EventBlockParser::new(&CORE_SHOW_CHANNELS);

    parser.feed("--END COMMAND--");
    parser.feed("Event: CoreShowChannel");
    parser.feed("Channel: SIP/late");

    assert!(parser.into_records().is_empty());
}
