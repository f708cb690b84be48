//! Shared fixtures for the transport tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use peerline_client::config::{ClientConfig, ServerSection, TransportSection};

/// Config pointing at a test server on localhost.
pub fn test_config(port: u16) -> ClientConfig {
    ClientConfig {
        version: 1,
        server: ServerSection {
            host: "127.0.0.1".into(),
            port,
        },
        transport: TransportSection::default(),
    }
}
