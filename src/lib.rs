//! Vendor M-code extension pipeline
//!
//! A chain-of-responsibility command pipeline for motion-controller
//! firmware: a fixed set of pick-and-place vendor M-codes is recognized,
//! validated against live hardware limits, and executed, while everything
//! else flows through to whatever extension was installed before.
//!
//! This library provides:
//! - The parsed-block model and validation status codes
//! - The handler chain and three-stage dispatcher
//! - The OpenPNP-style extension with its private scaling state
//! - Collaborator traits for I/O ports, motion, settings, and the stream
//! - Configuration management

pub mod chain;
pub mod config;
pub mod gcode;
pub mod hal;
pub mod openpnp;
pub mod report;

// Re-exports for clean public API
pub use chain::{Claim, Dispatcher, McodeHandler};
pub use config::{ExtensionConfig, UnhandledPolicy};
pub use gcode::{Mcode, ParsedBlock, RunState, Status, Word};
pub use hal::SystemContext;
pub use openpnp::OpenPnpCodes;
