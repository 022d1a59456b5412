//! Application Layer - Port definitions.
//!
//! Interfaces the stream loop drives. Infrastructure adapters implement them.

/// Port interfaces for the transport and output sinks.
pub mod ports;
