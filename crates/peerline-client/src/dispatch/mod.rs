//! Push demultiplexing: registry of handlers plus the long-lived listener
//! that drains the push channel and routes each notification by its tag.

pub mod listener;
pub mod router;

pub use listener::PushListener;
pub use router::{PushHandler, PushRouter};
