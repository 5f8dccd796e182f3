//! Receive pipeline: datagrams in, reconstructed meshes out.
//!
//! Every datagram goes through `Listening -> FrameReceived ->
//! (Discarded | Reconstructed) -> Listening`. A discarded datagram never
//! ends the loop; only [`Shutdown`] does.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use quasar_codec::{
    COMPONENTS_PER_VERTEX, CodecError, CompressionFlags, DeflateCodec, EntropyCodec,
    HaarTransform, PlanarCodec, WaveletTransform, check_indices, decode_indices, decode_vertices,
    parse_frame,
};

use crate::MAX_DATAGRAM_SIZE;
use crate::error::ReceiveError;
use crate::shutdown::Shutdown;
use crate::transport::Transport;

/// A mesh recovered from one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructedMesh {
    /// Emission sequence number from the sender. Labels output only.
    pub target_id: u32,
    /// Interleaved `x, y, z` positions after the inverse transform.
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl ReconstructedMesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / COMPONENTS_PER_VERTEX
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Destination for reconstructed meshes.
pub trait Exporter {
    type Error: std::fmt::Display;

    fn export(&mut self, mesh: &ReconstructedMesh) -> Result<(), Self::Error>;
}

/// Collects meshes in memory.
impl Exporter for Vec<ReconstructedMesh> {
    type Error = Infallible;

    fn export(&mut self, mesh: &ReconstructedMesh) -> Result<(), Self::Error> {
        self.push(mesh.clone());
        Ok(())
    }
}

/// Settings for [`Receiver`].
#[derive(Debug, Clone)]
pub struct ReceiveConfig {
    /// Receive buffer size. Longer datagrams are truncated by the socket.
    pub max_datagram_size: usize,
    /// Upper bound on the decompressed index payload.
    pub max_index_bytes: usize,
    /// Drop frames whose indices name vertices the frame does not carry.
    pub validate_indices: bool,
    /// Pause after a failed receive before trying again.
    pub error_backoff: Duration,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: MAX_DATAGRAM_SIZE + 1,
            max_index_bytes: 16 * 1024 * 1024,
            validate_indices: true,
            error_backoff: Duration::from_millis(200),
        }
    }
}

/// Counters reported when the receive loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    pub datagrams: usize,
    pub reconstructed: usize,
    pub discarded: usize,
    pub export_failures: usize,
    pub transport_errors: usize,
}

/// Reconstructs meshes from datagrams pulled off a [`Transport`].
pub struct Receiver<T, E = DeflateCodec, W = HaarTransform> {
    transport: T,
    entropy: E,
    planar: PlanarCodec<W>,
    config: ReceiveConfig,
}

impl<T: Transport> Receiver<T> {
    /// Receiver with the default Haar transform and DEFLATE coder.
    pub fn new(transport: T, config: ReceiveConfig) -> Self {
        Self::with_codecs(transport, DeflateCodec::default(), HaarTransform::default(), config)
    }
}

impl<T, E, W> Receiver<T, E, W>
where
    T: Transport,
    E: EntropyCodec,
    W: WaveletTransform,
{
    pub fn with_codecs(transport: T, entropy: E, transform: W, config: ReceiveConfig) -> Self {
        Self {
            transport,
            entropy,
            planar: PlanarCodec::new(transform),
            config,
        }
    }

    /// Receive and reconstruct frames until `shutdown` is requested.
    pub fn run<X: Exporter>(&self, exporter: &mut X, shutdown: &Shutdown) -> ReceiveStats {
        let mut buf = vec![0u8; self.config.max_datagram_size];
        let mut stats = ReceiveStats::default();
        let mut failures = 0usize;

        while !shutdown.is_requested() {
            let len = match self.transport.recv(&mut buf) {
                Ok(received) => {
                    if failures > 0 {
                        tracing::info!("Transport recovered after {failures} failed receives");
                        failures = 0;
                    }
                    match received {
                        Some(len) => len,
                        None => continue,
                    }
                }
                Err(e) => {
                    failures += 1;
                    stats.transport_errors += 1;
                    if failures == 1 {
                        tracing::warn!("Receive failed: {e}");
                    } else {
                        tracing::debug!("Receive failed ({failures} in a row): {e}");
                    }
                    thread::sleep(self.config.error_backoff);
                    continue;
                }
            };
            stats.datagrams += 1;

            let mesh = match self.reconstruct(&buf[..len]) {
                Ok(mesh) => mesh,
                Err(e) => {
                    tracing::debug!("Discarding {len} byte datagram: {e}");
                    stats.discarded += 1;
                    continue;
                }
            };

            tracing::info!(
                "Reconstructed frame {}: {} vertices, {} triangles",
                mesh.target_id,
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            match exporter.export(&mesh) {
                Ok(()) => stats.reconstructed += 1,
                Err(e) => {
                    tracing::error!("Failed to export frame {}: {e}", mesh.target_id);
                    stats.export_failures += 1;
                }
            }
        }

        tracing::info!(
            "Receiver stopped: {} datagrams, {} reconstructed, {} discarded",
            stats.datagrams,
            stats.reconstructed,
            stats.discarded
        );
        stats
    }

    /// Validate one datagram and rebuild the mesh it carries.
    pub fn reconstruct(&self, datagram: &[u8]) -> Result<ReconstructedMesh, ReceiveError> {
        let frame = parse_frame(datagram)?.expect_mesh()?;
        let flags = frame.header.compression;

        let mut vertices = decode_vertices(frame.vertex_bytes)?;
        let indices = if flags.contains(CompressionFlags::ENTROPY) {
            let raw = self
                .entropy
                .decompress(frame.index_bytes, self.config.max_index_bytes)
                .map_err(CodecError::from)?;
            decode_indices(&raw)?
        } else {
            decode_indices(frame.index_bytes)?
        };

        if flags.contains(CompressionFlags::WAVELET) {
            self.planar.inverse(&mut vertices)?;
        } else if vertices.len() % COMPONENTS_PER_VERTEX != 0 {
            return Err(CodecError::NotInterleaved {
                len: vertices.len(),
            }
            .into());
        }

        if self.config.validate_indices {
            check_indices(&indices, vertices.len() / COMPONENTS_PER_VERTEX)?;
        }

        Ok(ReconstructedMesh {
            target_id: frame.header.target_id,
            vertices,
            indices,
        })
    }
}
