use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;

use crate::buffer::DEFAULT_CAPACITY;
use crate::proto::command::Command;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sensor-link",
    about = "Control and telemetry client for a UDP sensor device"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Receive telemetry and drive the device from an interactive console
    Monitor(MonitorOpts),
    /// Send a single command and exit
    Send(SendOpts),
}

#[derive(Args, Debug, Clone)]
pub struct RemoteOpts {
    /// Sensor host name or IP address
    pub remote_address: String,
    /// Sensor UDP port
    pub remote_port: u16,
}

#[derive(Args, Debug, Clone)]
pub struct MonitorOpts {
    #[command(flatten)]
    pub remote: RemoteOpts,
    /// Test duration sent with `start`, in seconds
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub duration_seconds: u32,
    /// Sample period sent with `start`, in milliseconds
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_milliseconds: u32,
    /// Local address the device sends telemetry to
    #[arg(long, default_value = "0.0.0.0:8082")]
    pub bind: String,
    /// Number of samples kept in the sliding window
    #[arg(long, default_value_t = DEFAULT_CAPACITY as u32, value_parser = clap::value_parser!(u32).range(1..))]
    pub capacity: u32,
    /// Length of one backoff unit after receive failures, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub backoff_unit_ms: u64,
    /// Receive statistics log interval in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub stats: u64,
}

impl MonitorOpts {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats)
    }
}

#[derive(Args, Debug, Clone)]
pub struct SendOpts {
    #[command(flatten)]
    pub remote: RemoteOpts,
    /// Command to send
    #[arg(value_enum)]
    pub action: Action,
    /// Test duration for `start`, in seconds
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub duration: u32,
    /// Sample period for `start`, in milliseconds
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate: u32,
    /// Local address to send from
    #[arg(long, default_value = "0.0.0.0:0")]
    pub bind: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Id,
    Start,
    Stop,
}

impl SendOpts {
    pub fn command(&self) -> Command {
        match self.action {
            Action::Id => Command::Identify,
            Action::Start => Command::Start {
                duration_seconds: self.duration,
                rate_milliseconds: self.rate,
            },
            Action::Stop => Command::Stop,
        }
    }
}
