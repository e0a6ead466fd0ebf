/// Outbound control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // ---- Discovery ----
    Identify,

    // ---- Test control ----
    Start {
        duration_seconds: u32,
        rate_milliseconds: u32,
    },
    Stop,
}

/// A decoded inbound datagram. Every payload maps to exactly one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // ---- Telemetry ----
    Telemetry {
        time_ms: u64,
        millivolts: i64,
        milliamps: i64,
    },

    // ---- Discovery reply ----
    // Kept as strings so leading zeros survive.
    Identification {
        model: String,
        serial: String,
    },

    // ---- Test status ----
    TestStarted,
    TestStopped,
    AlreadyStarted,
    AlreadyStopped,
    Idle,

    Unrecognized {
        raw: String,
    },
}

impl Message {
    /// Short tag used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Telemetry { .. } => "telemetry",
            Message::Identification { .. } => "identification",
            Message::TestStarted => "test-started",
            Message::TestStopped => "test-stopped",
            Message::AlreadyStarted => "already-started",
            Message::AlreadyStopped => "already-stopped",
            Message::Idle => "idle",
            Message::Unrecognized { .. } => "unrecognized",
        }
    }
}
