//! Transmit pipeline: components in, one frame per component out.

use std::net::SocketAddr;

use quasar_codec::{
    CodecError, CodecResult, Component, CompressionFlags, DeflateCodec, EntropyCodec, FrameHeader,
    HaarTransform, PlanarCodec, WaveletTransform, build_frame, encode_indices, encode_vertices,
};

use crate::MAX_DATAGRAM_SIZE;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Settings for [`Transmitter`].
#[derive(Debug, Clone)]
pub struct TransmitConfig {
    /// Skip components with no vertices and no indices instead of sending
    /// an empty frame.
    pub skip_empty: bool,
    /// Frames longer than this are not sent.
    pub max_frame_size: usize,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            skip_empty: false,
            max_frame_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// Encodes components and sends them over a [`Transport`].
pub struct Transmitter<T, E = DeflateCodec, W = HaarTransform> {
    transport: T,
    entropy: E,
    planar: PlanarCodec<W>,
    config: TransmitConfig,
}

impl<T: Transport> Transmitter<T> {
    /// Transmitter with the default Haar transform and DEFLATE coder.
    pub fn new(transport: T, config: TransmitConfig) -> Self {
        Self::with_codecs(transport, DeflateCodec::default(), HaarTransform::default(), config)
    }
}

impl<T, E, W> Transmitter<T, E, W>
where
    T: Transport,
    E: EntropyCodec,
    W: WaveletTransform,
{
    pub fn with_codecs(transport: T, entropy: E, transform: W, config: TransmitConfig) -> Self {
        Self {
            transport,
            entropy,
            planar: PlanarCodec::new(transform),
            config,
        }
    }

    /// Send every component to `destination`, in order.
    ///
    /// Each component gets a `target_id` equal to its position in
    /// `components`, starting at zero on every call. Components that cannot
    /// be encoded or sent are logged and skipped; their ids are not reused.
    ///
    /// # Returns
    ///
    /// The number of frames handed to the transport.
    pub fn run(
        &self,
        components: &[Component],
        threshold: f32,
        destination: SocketAddr,
    ) -> Result<usize> {
        if components.is_empty() {
            return Err(Error::NoComponents);
        }
        if threshold.is_nan() || threshold < 0.0 {
            return Err(CodecError::InvalidThreshold(threshold).into());
        }

        let mut frames_sent = 0;
        let mut bytes_sent = 0;
        let mut raw_bytes = 0;
        for (target_id, component) in (0u32..).zip(components) {
            if self.config.skip_empty && component.is_empty() {
                tracing::debug!("Skipping empty component '{}' ({target_id})", component.name);
                continue;
            }

            let frame = match self.encode_component(target_id, component, threshold) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("Skipping component '{}' ({target_id}): {e}", component.name);
                    continue;
                }
            };
            if frame.len() > self.config.max_frame_size {
                tracing::error!(
                    "Component '{}' ({target_id}) needs a {} byte frame, limit is {}",
                    component.name,
                    frame.len(),
                    self.config.max_frame_size
                );
                continue;
            }

            if let Err(e) = self.transport.send(&frame, destination) {
                tracing::error!(
                    "Failed to send component '{}' ({target_id}): {e}",
                    component.name
                );
                continue;
            }

            tracing::info!(
                "Sent component '{}' as frame {target_id}: {} vertices, {} triangles, {} bytes ({:.1}% of raw)",
                component.name,
                component.vertex_count(),
                component.triangle_count(),
                frame.len(),
                ratio(frame.len(), component.raw_size())
            );
            frames_sent += 1;
            bytes_sent += frame.len();
            raw_bytes += component.raw_size();
        }

        tracing::info!(
            "Dispatched {frames_sent}/{} frames to {destination}: {bytes_sent} bytes ({:.1}% of raw)",
            components.len(),
            ratio(bytes_sent, raw_bytes)
        );
        Ok(frames_sent)
    }

    /// Build the frame for one component without sending it.
    pub fn encode_component(
        &self,
        target_id: u32,
        component: &Component,
        threshold: f32,
    ) -> CodecResult<Vec<u8>> {
        let mut vertices = component.vertices.clone();
        self.planar.forward(&mut vertices, threshold)?;
        let index_payload = self.entropy.compress(&encode_indices(&component.indices))?;

        let vertex_count =
            u32::try_from(vertices.len()).map_err(|_| CodecError::NotInterleaved {
                len: vertices.len(),
            })?;
        let original_size = u32::try_from(component.raw_size()).unwrap_or(u32::MAX);
        let mut header = FrameHeader::mesh(target_id, vertex_count, original_size);
        if self.entropy.is_identity() {
            header.compression = CompressionFlags::WAVELET;
        }
        Ok(build_frame(
            &header,
            &encode_vertices(&vertices),
            &index_payload,
        ))
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(compressed: usize, raw: usize) -> f64 {
    if raw == 0 {
        return 100.0;
    }
    compressed as f64 / raw as f64 * 100.0
}
