// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

#[parameterized(
    ok = { "OK" },
    bye = { "BYE 0" },
    bye_negative = { "BYE -2" },
    item = { "ITEM 40" },
    heart_single = { "HEART: 17" },
    heart_pair = { "HEART: 17 120" },
    email = { "EMAIL finished stage one" },
    log = { "LOG opening archive" },
    verbose = { "VERBOSE chunk checksum ok" },
    counter = { "PAGES: 9" },
    counter_pair = { "PAGES: 9 44" },
)]
fn well_formed_lines_round_trip(line: &str) {
    let message = AgentMessage::parse(line).unwrap();
    assert_eq!(message.to_string(), line);
}

#[parameterized(
    blankish = { "   " },
    lowercase_key = { "heart: 1" },
    mixed_case_key = { "Heart: 1" },
    missing_number = { "HEART:" },
    non_numeric = { "HEART: abc" },
    trailing_junk = { "HEART: 1 2 3" },
    empty_key = { ": 4" },
    plain_chatter = { "processing file 12 of 90" },
)]
fn unrecognized_lines_return_none(line: &str) {
    assert_eq!(AgentMessage::parse(line), None);
}

#[test]
fn parse_strips_line_endings() {
    assert_eq!(AgentMessage::parse("OK\n"), Some(AgentMessage::Ok));
    assert_eq!(
        AgentMessage::parse("HEART: 3\r\n"),
        Some(AgentMessage::Heartbeat {
            done: 3,
            total: None
        })
    );
}

#[test]
fn heart_parses_progress_counters() {
    assert_eq!(
        AgentMessage::parse("HEART: 5 100"),
        Some(AgentMessage::Heartbeat {
            done: 5,
            total: Some(100)
        })
    );
}

#[test]
fn work_orders_serialize_as_protocol_lines() {
    assert_eq!(WorkOrder::Chunk { id: 31 }.to_string(), "31");
    assert_eq!(WorkOrder::Close.to_string(), "CLOSE");
    assert_eq!(WorkOrder::End.to_string(), "END");
}
