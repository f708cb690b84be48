use std::time::Duration;

use serde::Deserialize;

use peerline_core::error::{PeerlineError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub server: ServerSection,

    #[serde(default)]
    pub transport: TransportSection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PeerlineError::InvalidConfig(
                "version must be 1".into(),
            ));
        }
        self.server.validate()?;
        self.transport.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(PeerlineError::InvalidConfig(
                "server.host must not be empty".into(),
            ));
        }
        if self.port == 0 {
            return Err(PeerlineError::InvalidConfig(
                "server.port must not be 0".into(),
            ));
        }
        Ok(())
    }

    /// Dial address for `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Poll deadline the push listener uses between receive attempts.
    #[serde(default = "default_push_poll_ms")]
    pub push_poll_ms: u64,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_push_queue")]
    pub push_queue: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            send_timeout_ms: default_send_timeout_ms(),
            push_poll_ms: default_push_poll_ms(),
            outbound_queue: default_outbound_queue(),
            push_queue: default_push_queue(),
        }
    }
}

impl TransportSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60_000).contains(&self.connect_timeout_ms) {
            return Err(PeerlineError::InvalidConfig(
                "transport.connect_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(100..=600_000).contains(&self.send_timeout_ms) {
            return Err(PeerlineError::InvalidConfig(
                "transport.send_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if !(100..=600_000).contains(&self.push_poll_ms) {
            return Err(PeerlineError::InvalidConfig(
                "transport.push_poll_ms must be between 100 and 600000".into(),
            ));
        }
        if !(1..=65_536).contains(&self.outbound_queue) {
            return Err(PeerlineError::InvalidConfig(
                "transport.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(1..=65_536).contains(&self.push_queue) {
            return Err(PeerlineError::InvalidConfig(
                "transport.push_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn push_poll(&self) -> Duration {
        Duration::from_millis(self.push_poll_ms)
    }
}

fn default_host() -> String {
    "localhost".into()
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_send_timeout_ms() -> u64 {
    5000
}
fn default_push_poll_ms() -> u64 {
    30_000
}
fn default_outbound_queue() -> usize {
    64
}
fn default_push_queue() -> usize {
    256
}
