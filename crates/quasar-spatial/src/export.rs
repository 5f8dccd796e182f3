//! File sinks: OBJ export for reconstructed meshes and a frame directory
//! for offline packing.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use glam::Vec3;
use quasar_codec::{COMPONENTS_PER_VERTEX, FrameHeader};
use quasar_link::{Exporter, ReconstructedMesh, Transport};

/// Writes each mesh to `component_<target_id>.obj` under `out_dir`.
#[derive(Debug)]
pub struct ObjExporter {
    out_dir: PathBuf,
}

impl ObjExporter {
    /// Create the exporter, creating `out_dir` if needed.
    pub fn new(out_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir })
    }

    pub fn path_for(&self, target_id: u32) -> PathBuf {
        self.out_dir.join(format!("component_{target_id}.obj"))
    }
}

impl Exporter for ObjExporter {
    type Error = io::Error;

    fn export(&mut self, mesh: &ReconstructedMesh) -> io::Result<()> {
        let path = self.path_for(mesh.target_id);
        let mut out = BufWriter::new(File::create(&path)?);
        write_obj(&mut out, mesh)?;
        out.flush()?;

        match bounds(&mesh.vertices) {
            Some((min, max)) => tracing::info!(
                "Wrote {} ({} vertices, {} triangles, bounds {min} to {max})",
                path.display(),
                mesh.vertex_count(),
                mesh.triangle_count()
            ),
            None => tracing::info!("Wrote {} (empty mesh)", path.display()),
        }
        Ok(())
    }
}

fn write_obj(out: &mut impl Write, mesh: &ReconstructedMesh) -> io::Result<()> {
    writeln!(out, "o component_{}", mesh.target_id)?;
    for v in mesh.vertices.chunks_exact(COMPONENTS_PER_VERTEX) {
        writeln!(out, "v {} {} {}", v[0], v[1], v[2])?;
    }
    // OBJ faces are 1-based. A trailing partial triangle is dropped.
    for face in mesh.indices.chunks_exact(3) {
        writeln!(
            out,
            "f {} {} {}",
            u64::from(face[0]) + 1,
            u64::from(face[1]) + 1,
            u64::from(face[2]) + 1
        )?;
    }
    Ok(())
}

/// Axis-aligned bounding box of interleaved positions.
fn bounds(vertices: &[f32]) -> Option<(Vec3, Vec3)> {
    let mut points = vertices
        .chunks_exact(COMPONENTS_PER_VERTEX)
        .map(Vec3::from_slice);
    let first = points.next()?;
    Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
}

/// [`Transport`] that stores each frame as `frame_<target_id>.qsr` instead
/// of sending it.
#[derive(Debug)]
pub struct FrameDir {
    out_dir: PathBuf,
}

impl FrameDir {
    pub fn new(out_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir })
    }
}

impl Transport for FrameDir {
    fn send(&self, frame: &[u8], _destination: SocketAddr) -> io::Result<()> {
        let header = FrameHeader::from_bytes(frame)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let path = self
            .out_dir
            .join(format!("frame_{}.qsr", header.target_id));
        fs::write(&path, frame)?;
        tracing::debug!("Stored {} byte frame at {}", frame.len(), path.display());
        Ok(())
    }

    fn recv(&self, _buf: &mut [u8]) -> io::Result<Option<usize>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quasar_codec::{build_frame, parse_frame};

    #[test]
    fn writes_one_based_faces() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ObjExporter::new(dir.path().join("out")).unwrap();
        let mesh = ReconstructedMesh {
            target_id: 7,
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.5, 0.0],
            indices: vec![0, 1, 2],
        };
        exporter.export(&mesh).unwrap();

        let written = fs::read_to_string(exporter.path_for(7)).unwrap();
        assert_eq!(
            written,
            "o component_7\nv 0 0 0\nv 1 0 0\nv 0 1.5 0\nf 1 2 3\n"
        );
    }

    #[test]
    fn empty_meshes_still_produce_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ObjExporter::new(dir.path()).unwrap();
        exporter.export(&ReconstructedMesh::default()).unwrap();
        assert_eq!(
            fs::read_to_string(exporter.path_for(0)).unwrap(),
            "o component_0\n"
        );
    }

    #[test]
    fn bounding_box() {
        let (min, max) = bounds(&[1.0, -2.0, 3.0, -1.0, 4.0, 0.5]).unwrap();
        assert_eq!(min, Vec3::new(-1.0, -2.0, 0.5));
        assert_eq!(max, Vec3::new(1.0, 4.0, 3.0));
        assert!(bounds(&[]).is_none());
    }

    #[test]
    fn frame_dir_names_files_by_target_id() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FrameDir::new(dir.path()).unwrap();
        let frame = build_frame(&FrameHeader::mesh(3, 0, 0), &[], &[]);
        sink.send(&frame, "127.0.0.1:1".parse().unwrap()).unwrap();

        let stored = fs::read(dir.path().join("frame_3.qsr")).unwrap();
        assert_eq!(parse_frame(&stored).unwrap().header.target_id, 3);
        assert!(sink.send(&[0; 4], "127.0.0.1:1".parse().unwrap()).is_err());
    }
}
