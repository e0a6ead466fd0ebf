use anyhow::Result;

use crate::cli::SendOpts;
use crate::proto::command::Command;
use crate::proto::parser::{encode, format_command};
use crate::transport::{Transport, UdpTransport, resolve_remote};

/// One-shot `send` subcommand.
pub fn run(opts: SendOpts) -> Result<()> {
    let remote = resolve_remote(&opts.remote.remote_address, opts.remote.remote_port)?;
    let sender = CommandSender::new(UdpTransport::open(&opts.bind, remote)?);
    sender.send(&opts.command());
    Ok(())
}

/// Fire-and-forget command path: one datagram per command, failures only logged.
pub struct CommandSender<T> {
    transport: T,
}

impl<T: Transport> CommandSender<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn send_identify(&self) {
        self.send(&Command::Identify);
    }

    pub fn send_start(&self, duration_seconds: u32, rate_milliseconds: u32) {
        self.send(&Command::Start {
            duration_seconds,
            rate_milliseconds,
        });
    }

    pub fn send_stop(&self) {
        self.send(&Command::Stop);
    }

    pub fn send(&self, cmd: &Command) {
        let payload = encode(cmd);
        match self.transport.send(&payload) {
            Ok(n) => log::info!("[tx] {} ({} bytes)", format_command(cmd), n),
            Err(e) => log::warn!("[tx] send {} failed: {}", format_command(cmd), e),
        }
    }
}
