//! Stream Quasar mesh frames over a datagram link.
//!
//! [`Transmitter`] turns extracted components into frames and hands them
//! to a [`Transport`], one datagram per component. [`Receiver`] pulls
//! datagrams back off a transport, drops anything that is not a valid mesh
//! frame, and passes reconstructed meshes to an [`Exporter`].
//!
//! Both sides are blocking and single-threaded. The receive loop checks a
//! [`Shutdown`] handle between datagrams, so the transport's poll interval
//! bounds how long shutdown takes.

mod error;
mod shutdown;

pub mod receive;
pub mod transmit;
pub mod transport;

pub use error::{Error, ReceiveError, Result};
pub use receive::{Exporter, ReceiveConfig, ReceiveStats, ReconstructedMesh, Receiver};
pub use shutdown::Shutdown;
pub use transmit::{TransmitConfig, Transmitter};
pub use transport::{Transport, TransportConfig, UdpTransport};

/// Largest UDP payload that fits in one IPv4 datagram.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
