//! Domain Layer - Core trade types.
//!
//! Pure types with no knowledge of the exchange wire format or transport.

/// Trading pairs known to the service.
pub mod pair;

/// Trade records and sides.
pub mod trade;
