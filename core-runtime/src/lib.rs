//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the player crates:
//! - Logging and tracing initialisation
//! - Broadcast event bus for asynchronous observers
//!
//! ## Overview
//!
//! Nothing in here knows about playback. The coordination core in
//! `core-playback` publishes its events through [`events::EventBus`] and logs
//! through `tracing`, which [`logging::init_logging`] wires to stdout and the
//! host's [`LoggerSink`](bridge_traits::logging::LoggerSink).

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
