//! Pure logic with no I/O dependencies

pub mod endpoint;

pub use endpoint::{EndpointDescriptor, TransportType};
