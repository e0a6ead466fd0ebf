// src/proto/parser.rs
use thiserror::Error;

use super::command::{Command, Message};

// Messages we send
const IDENTIFY: &str = "ID;";
const STOP: &str = "TEST;CMD=STOP;";

// Messages we receive verbatim
const TEST_STARTED: &str = "TEST;RESULT=STARTED;";
const TEST_STOPPED: &str = "TEST;RESULT=STOPPED;";
const ALREADY_STARTED: &str = "TEST;RESULT=error;MSG=already_started;";
const ALREADY_STOPPED: &str = "TEST;RESULT=error;MSG=already_stopped;";
const IDLE: &str = "STATUS;STATE=IDLE;";

// Tags of the two parameterised replies
const TELEMETRY_TAG: &str = "STATUS;";
const IDENTIFICATION_TAG: &str = "ID;";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing tag: {0}")]
    MissingTag(&'static str),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unterminated field: {0}")]
    Unterminated(&'static str),
    #[error("invalid integer for {0}: {1}")]
    BadInt(&'static str, String),
    #[error("invalid digit string for {0}: {1}")]
    BadDigits(&'static str, String),
    #[error("trailing characters: {0:?}")]
    Trailing(String),
}

/// Public API: serialize a command to its wire text.
pub fn format_command(cmd: &Command) -> String {
    match cmd {
        Command::Identify => IDENTIFY.to_string(),
        Command::Start {
            duration_seconds,
            rate_milliseconds,
        } => format!("TEST;CMD=START;DURATION={duration_seconds};RATE={rate_milliseconds};"),
        Command::Stop => STOP.to_string(),
    }
}

/// Public API: the exact datagram payload for a command.
pub fn encode(cmd: &Command) -> Vec<u8> {
    format_command(cmd).into_bytes()
}

/// Public API: classify a received text. Never fails; anything outside the
/// grammar becomes `Message::Unrecognized`.
pub fn decode(raw: &str) -> Message {
    if let Ok(msg) = parse_telemetry(raw) {
        return msg;
    }
    if let Ok(msg) = parse_identification(raw) {
        return msg;
    }
    match raw {
        TEST_STARTED => Message::TestStarted,
        TEST_STOPPED => Message::TestStopped,
        ALREADY_STARTED => Message::AlreadyStarted,
        ALREADY_STOPPED => Message::AlreadyStopped,
        IDLE => Message::Idle,
        _ => Message::Unrecognized {
            raw: raw.to_string(),
        },
    }
}

/// Decode a datagram payload, one byte per character (Latin-1).
pub fn decode_datagram(bytes: &[u8]) -> Message {
    decode(&latin1(bytes))
}

/// One char per byte, so every payload has a text form.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Best guess at why `raw` failed the parameterised grammars, for diagnostics.
pub fn rejection(raw: &str) -> Option<ParseError> {
    let result = if raw.starts_with(IDENTIFICATION_TAG) {
        parse_identification(raw)
    } else {
        parse_telemetry(raw)
    };
    result.err()
}

/// `STATUS;TIME=<digits>;MV=-?<digits>;MA=-?<digits>;`, whole input.
pub fn parse_telemetry(s: &str) -> Result<Message, ParseError> {
    let rest = s
        .strip_prefix(TELEMETRY_TAG)
        .ok_or(ParseError::MissingTag(TELEMETRY_TAG))?;
    let (time, rest) = take_field(rest, "TIME")?;
    let (mv, rest) = take_field(rest, "MV")?;
    let (ma, rest) = take_field(rest, "MA")?;
    end_of_input(rest)?;

    Ok(Message::Telemetry {
        time_ms: req_unsigned("TIME", time)?,
        millivolts: req_signed("MV", mv)?,
        milliamps: req_signed("MA", ma)?,
    })
}

/// `ID;MODEL=<digits>;SERIAL=<digits>;`, whole input.
pub fn parse_identification(s: &str) -> Result<Message, ParseError> {
    let rest = s
        .strip_prefix(IDENTIFICATION_TAG)
        .ok_or(ParseError::MissingTag(IDENTIFICATION_TAG))?;
    let (model, rest) = take_field(rest, "MODEL")?;
    let (serial, rest) = take_field(rest, "SERIAL")?;
    end_of_input(rest)?;

    Ok(Message::Identification {
        model: req_digits("MODEL", model)?.to_string(),
        serial: req_digits("SERIAL", serial)?.to_string(),
    })
}

/* ---------- helpers ---------- */

/// Split `KEY=value;rest` into `(value, rest)`.
fn take_field<'a>(s: &'a str, key: &'static str) -> Result<(&'a str, &'a str), ParseError> {
    let s = s
        .strip_prefix(key)
        .and_then(|s| s.strip_prefix('='))
        .ok_or(ParseError::MissingField(key))?;
    let end = s.find(';').ok_or(ParseError::Unterminated(key))?;
    Ok((&s[..end], &s[end + 1..]))
}

fn end_of_input(rest: &str) -> Result<(), ParseError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(ParseError::Trailing(rest.to_string()))
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn req_digits<'a>(k: &'static str, v: &'a str) -> Result<&'a str, ParseError> {
    if is_digits(v) {
        Ok(v)
    } else {
        Err(ParseError::BadDigits(k, v.to_string()))
    }
}

// `str::parse` also takes a leading '+', which the grammar does not.
fn req_unsigned(k: &'static str, v: &str) -> Result<u64, ParseError> {
    if !is_digits(v) {
        return Err(ParseError::BadInt(k, v.to_string()));
    }
    v.parse::<u64>()
        .map_err(|_| ParseError::BadInt(k, v.to_string()))
}

fn req_signed(k: &'static str, v: &str) -> Result<i64, ParseError> {
    if !is_digits(v.strip_prefix('-').unwrap_or(v)) {
        return Err(ParseError::BadInt(k, v.to_string()));
    }
    v.parse::<i64>()
        .map_err(|_| ParseError::BadInt(k, v.to_string()))
}

/* ---------- tests ---------- */
