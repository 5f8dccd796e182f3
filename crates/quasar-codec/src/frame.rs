//! Quasar frame header and payload layout.
//!
//! # Format
//!
//! ```text
//! offset  size  field
//!      0     4  magic             "QSR1"
//!      4     1  file_type         0x03 = mesh component
//!      5     1  compression_flags bit0 = entropy, bit1 = wavelet
//!      6     4  original_size     u32, informational
//!     10     4  scale             f32, reserved
//!     14     4  target_id         u32, emission sequence number
//!     18     4  vertex_count      u32, number of vertex scalars
//!     22     -  vertex payload    vertex_count * 4 bytes of f32
//!      -     -  index payload     entropy-coded, runs to the end of the frame
//! ```
//!
//! All multi-byte fields are little-endian. The `vertex_count` field is
//! four bytes wide; earlier two-byte revisions of this field are not
//! readable by this parser.

use crate::error::FrameError;

/// Protocol family identifier at the start of every frame.
pub const MAGIC: [u8; 4] = *b"QSR1";

/// Fixed header length in bytes.
pub const HEADER_SIZE: usize = 22;

/// `file_type` value for a spatial mesh component.
pub const FILE_TYPE_MESH: u8 = 0x03;

/// Value written to the reserved `scale` field by the mesh path.
pub const DEFAULT_SCALE: f32 = 1.0;

bitflags::bitflags! {
    /// Compression stages applied to a frame. Unknown bits are retained.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct CompressionFlags: u8 {
        /// Index payload is DEFLATE coded.
        const ENTROPY = 0x01;
        /// Vertex payload holds planar wavelet coefficients.
        const WAVELET = 0x02;
        /// Both stages, as written by the mesh path.
        const MESH = Self::ENTROPY.bits() | Self::WAVELET.bits();
    }
}

/// Decoded frame header (everything after the magic).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    pub file_type: u8,
    pub compression: CompressionFlags,
    /// Uncompressed vertex plus index payload size. Never used to bound parsing.
    pub original_size: u32,
    /// Reserved quantization scale. Preserved bit-for-bit, unused by meshes.
    pub scale: f32,
    pub target_id: u32,
    /// Number of `f32` scalars in the vertex payload.
    pub vertex_count: u32,
}

impl FrameHeader {
    /// Header for a mesh component with both compression stages applied.
    #[must_use]
    pub fn mesh(target_id: u32, vertex_count: u32, original_size: u32) -> Self {
        Self {
            file_type: FILE_TYPE_MESH,
            compression: CompressionFlags::MESH,
            original_size,
            scale: DEFAULT_SCALE,
            target_id,
            vertex_count,
        }
    }

    /// Serialize into the fixed 22-byte layout, magic included.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&MAGIC);
        out[4] = self.file_type;
        out[5] = self.compression.bits();
        out[6..10].copy_from_slice(&self.original_size.to_le_bytes());
        out[10..14].copy_from_slice(&self.scale.to_le_bytes());
        out[14..18].copy_from_slice(&self.target_id.to_le_bytes());
        out[18..22].copy_from_slice(&self.vertex_count.to_le_bytes());
        out
    }

    /// Parse the fixed header from the start of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        let Some(header) = data.get(..HEADER_SIZE) else {
            return Err(FrameError::Truncated {
                needed: HEADER_SIZE,
                actual: data.len(),
            });
        };
        let magic = [header[0], header[1], header[2], header[3]];
        if magic != MAGIC {
            return Err(FrameError::BadMagic(magic));
        }
        let word = |at: usize| [header[at], header[at + 1], header[at + 2], header[at + 3]];
        Ok(Self {
            file_type: header[4],
            compression: CompressionFlags::from_bits_retain(header[5]),
            original_size: u32::from_le_bytes(word(6)),
            scale: f32::from_le_bytes(word(10)),
            target_id: u32::from_le_bytes(word(14)),
            vertex_count: u32::from_le_bytes(word(18)),
        })
    }
}

/// Borrowed view of a parsed frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub header: FrameHeader,
    /// `header.vertex_count * 4` bytes of little-endian `f32`.
    pub vertex_bytes: &'a [u8],
    /// Entropy-coded index blob. Empty for a component with no triangles.
    pub index_bytes: &'a [u8],
}

impl FrameView<'_> {
    /// Reject frames whose payload is not a mesh component.
    pub fn expect_mesh(self) -> Result<Self, FrameError> {
        if self.header.file_type == FILE_TYPE_MESH {
            Ok(self)
        } else {
            Err(FrameError::UnknownType(self.header.file_type))
        }
    }
}

/// Build a frame from a header and two payloads.
///
/// `header.vertex_count` must describe `vertex_payload`, otherwise the
/// receiver will split the payloads at the wrong offset.
#[must_use]
pub fn build_frame(header: &FrameHeader, vertex_payload: &[u8], index_payload: &[u8]) -> Vec<u8> {
    debug_assert_eq!(
        usize::try_from(header.vertex_count).ok(),
        Some(vertex_payload.len() / 4)
    );
    let mut frame = Vec::with_capacity(HEADER_SIZE + vertex_payload.len() + index_payload.len());
    frame.extend_from_slice(&header.to_bytes());
    frame.extend_from_slice(vertex_payload);
    frame.extend_from_slice(index_payload);
    frame
}

/// Split a datagram into header, vertex payload and index payload.
pub fn parse_frame(data: &[u8]) -> Result<FrameView<'_>, FrameError> {
    let header = FrameHeader::from_bytes(data)?;
    let needed = usize::try_from(header.vertex_count)
        .ok()
        .and_then(|count| count.checked_mul(4))
        .and_then(|bytes| bytes.checked_add(HEADER_SIZE))
        .unwrap_or(usize::MAX);
    if needed > data.len() {
        return Err(FrameError::Truncated {
            needed,
            actual: data.len(),
        });
    }
    let (vertex_bytes, index_bytes) = data[HEADER_SIZE..].split_at(needed - HEADER_SIZE);
    Ok(FrameView {
        header,
        vertex_bytes,
        index_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_header() -> FrameHeader {
        FrameHeader {
            file_type: FILE_TYPE_MESH,
            compression: CompressionFlags::ENTROPY | CompressionFlags::WAVELET,
            original_size: 0x0403_0201,
            scale: 1000.0,
            target_id: 7,
            vertex_count: 2,
        }
    }

    #[test]
    fn header_layout() {
        let bytes = sample_header().to_bytes();
        assert_eq!(&bytes[0..4], b"QSR1");
        assert_eq!(bytes[4], 0x03);
        assert_eq!(bytes[5], 0x03);
        assert_eq!(&bytes[6..10], [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[10..14], 1000.0f32.to_le_bytes());
        assert_eq!(&bytes[14..18], [7, 0, 0, 0]);
        assert_eq!(&bytes[18..22], [2, 0, 0, 0]);
    }

    #[test]
    fn mesh_header_defaults() {
        let header = FrameHeader::mesh(3, 9, 48);
        assert_eq!(header.file_type, FILE_TYPE_MESH);
        assert!(header.compression.contains(CompressionFlags::ENTROPY));
        assert!(header.compression.contains(CompressionFlags::WAVELET));
        assert_eq!(header.scale.to_bits(), DEFAULT_SCALE.to_bits());
    }

    #[test]
    fn unknown_flag_bits_survive_parsing() {
        let mut bytes = FrameHeader::mesh(0, 0, 0).to_bytes();
        bytes[5] = 0x83;
        let header = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.compression.bits(), 0x83);
        assert!(header.compression.contains(CompressionFlags::MESH));
        assert_eq!(header.to_bytes()[5], 0x83);
    }

    #[test]
    fn splits_payloads() {
        let frame = build_frame(&sample_header(), &[1; 8], &[9, 9, 9]);
        assert_eq!(frame.len(), HEADER_SIZE + 11);
        let view = parse_frame(&frame).unwrap();
        assert_eq!(view.header, sample_header());
        assert_eq!(view.vertex_bytes, [1; 8]);
        assert_eq!(view.index_bytes, [9, 9, 9]);
    }

    #[test]
    fn empty_index_payload_is_valid() {
        let header = FrameHeader::mesh(0, 0, 0);
        let frame = build_frame(&header, &[], &[]);
        let view = parse_frame(&frame).unwrap();
        assert!(view.vertex_bytes.is_empty());
        assert!(view.index_bytes.is_empty());
    }

    #[test]
    fn short_input_is_truncated() {
        assert_eq!(
            parse_frame(b"QSR").unwrap_err(),
            FrameError::Truncated {
                needed: HEADER_SIZE,
                actual: 3
            }
        );
        assert!(matches!(
            parse_frame(&[]),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn vertex_count_past_end_is_truncated() {
        let mut frame = build_frame(&sample_header(), &[0; 8], &[]);
        frame.truncate(HEADER_SIZE + 7);
        assert!(matches!(
            parse_frame(&frame),
            Err(FrameError::Truncated { needed: 30, .. })
        ));

        let mut huge = sample_header();
        huge.vertex_count = u32::MAX;
        let frame = huge.to_bytes();
        assert!(matches!(
            parse_frame(&frame),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn foreign_type_is_rejected_by_expect_mesh() {
        let mut header = sample_header();
        header.file_type = 0x01;
        header.vertex_count = 0;
        let frame = build_frame(&header, &[], &[]);
        let view = parse_frame(&frame).unwrap();
        assert_eq!(view.expect_mesh().unwrap_err(), FrameError::UnknownType(0x01));
    }

    #[test]
    fn scale_round_trips_bit_exact() {
        let mut header = sample_header();
        header.vertex_count = 0;
        header.scale = f32::from_bits(0x7fc0_1234);
        let frame = build_frame(&header, &[], &[]);
        let parsed = parse_frame(&frame).unwrap().header;
        assert_eq!(parsed.scale.to_bits(), 0x7fc0_1234);
    }

    proptest! {
        #[test]
        fn build_parse_round_trip(
            file_type in any::<u8>(),
            flags in any::<u8>(),
            original_size in any::<u32>(),
            scale in -1.0e6f32..1.0e6,
            target_id in any::<u32>(),
            vertices in prop::collection::vec(any::<u8>(), 0..64).prop_map(|mut v| {
                v.truncate(v.len() / 4 * 4);
                v
            }),
            indices in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let header = FrameHeader {
                file_type,
                compression: CompressionFlags::from_bits_retain(flags),
                original_size,
                scale,
                target_id,
                vertex_count: u32::try_from(vertices.len() / 4).unwrap(),
            };
            let frame = build_frame(&header, &vertices, &indices);
            let view = parse_frame(&frame).unwrap();
            prop_assert_eq!(view.header, header);
            prop_assert_eq!(view.vertex_bytes, &vertices[..]);
            prop_assert_eq!(view.index_bytes, &indices[..]);
        }

        #[test]
        fn short_inputs_never_parse(data in prop::collection::vec(any::<u8>(), 0..HEADER_SIZE)) {
            let is_truncated = matches!(parse_frame(&data), Err(FrameError::Truncated { .. }));
            prop_assert!(is_truncated);
        }

        #[test]
        fn wrong_magic_is_rejected(
            magic in any::<[u8; 4]>().prop_filter("not the protocol magic", |m| *m != MAGIC),
            rest in prop::collection::vec(any::<u8>(), HEADER_SIZE - 4..128),
        ) {
            let mut data = magic.to_vec();
            data.extend(rest);
            prop_assert_eq!(parse_frame(&data).unwrap_err(), FrameError::BadMagic(magic));
        }

        #[test]
        fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
            if let Ok(view) = parse_frame(&data) {
                prop_assert_eq!(
                    HEADER_SIZE + view.vertex_bytes.len() + view.index_bytes.len(),
                    data.len()
                );
            }
        }
    }
}
