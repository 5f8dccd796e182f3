//! Error types for the transmit and receive pipelines.

use quasar_codec::{CodecError, FrameError};
use thiserror::Error;

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no components to transmit")]
    NoComponents,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single datagram was discarded by the receiver.
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("reconstruction failed: {0}")]
    Reconstruction(#[from] CodecError),
}
