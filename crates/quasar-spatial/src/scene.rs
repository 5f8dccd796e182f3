//! Scene ingestion: glTF/GLB and Wavefront OBJ files to [`Component`]s.

use std::path::Path;

use quasar_codec::Component;

const UNNAMED_COMPONENT: &str = "unnamed_component";

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to load glTF scene: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("failed to load OBJ scene: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("unsupported scene format {0:?} (expected .gltf, .glb or .obj)")]
    UnsupportedFormat(String),

    #[error("mesh '{name}' has more vertices than a 32-bit index can address")]
    TooManyVertices { name: String },
}

/// Load every mesh in the scene at `path`, in file order.
///
/// The format is chosen by file extension.
pub fn extract_components(path: &Path) -> Result<Vec<Component>, SceneError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let components = match extension.as_str() {
        "gltf" | "glb" => extract_gltf(path)?,
        "obj" => extract_obj(path)?,
        _ => return Err(SceneError::UnsupportedFormat(extension)),
    };

    tracing::info!(
        "Extracted {} components from {}",
        components.len(),
        path.display()
    );
    Ok(components)
}

/// One component per node that references a mesh. All primitives of the
/// mesh are concatenated.
fn extract_gltf(path: &Path) -> Result<Vec<Component>, SceneError> {
    let (document, buffers, _images) = gltf::import(path)?;

    let mut components = Vec::new();
    for node in document.nodes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let name = node.name().unwrap_or(UNNAMED_COMPONENT);
        let mut component = Component::new(name, Vec::new(), Vec::new());

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));
            let Some(positions) = reader.read_positions() else {
                tracing::debug!("Skipping primitive without positions in '{name}'");
                continue;
            };

            let base = vertex_base(&component)?;
            for position in positions {
                component.vertices.extend_from_slice(&position);
            }
            let added = vertex_base(&component)? - base;

            // Indices are local to the primitive.
            match reader.read_indices() {
                Some(indices) => {
                    for index in indices.into_u32() {
                        let index = offset_index(index, base, &component.name)?;
                        component.indices.push(index);
                    }
                }
                None => component.indices.extend(base..base + added),
            }
        }

        tracing::debug!(
            "Node '{}': {} vertices, {} triangles",
            component.name,
            component.vertex_count(),
            component.triangle_count()
        );
        components.push(component);
    }
    Ok(components)
}

fn vertex_base(component: &Component) -> Result<u32, SceneError> {
    u32::try_from(component.vertex_count()).map_err(|_| SceneError::TooManyVertices {
        name: component.name.clone(),
    })
}

/// Shift a primitive-local index past the vertices already appended.
fn offset_index(index: u32, base: u32, name: &str) -> Result<u32, SceneError> {
    index
        .checked_add(base)
        .ok_or_else(|| SceneError::TooManyVertices {
            name: name.to_owned(),
        })
}

fn extract_obj(path: &Path) -> Result<Vec<Component>, SceneError> {
    let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)?;
    if let Err(e) = materials {
        tracing::debug!("Ignoring materials for {}: {e}", path.display());
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let name = if model.name.is_empty() {
                UNNAMED_COMPONENT.to_owned()
            } else {
                model.name
            };
            Component::new(name, model.mesh.positions, model.mesh.indices)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Two triangles followed by two `u32` index triples, base64 encoded.
    const BUFFER: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AACAPwAAAAAAAIA/AAAAAAAAgD8AAIA/AAAAAAEAAAACAAAAAgAAAAEAAAAAAAAA";

    fn gltf_scene() -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0, 1, 2] }}],
  "nodes": [
    {{ "name": "hull", "mesh": 0 }},
    {{ "mesh": 1 }},
    {{ "name": "empty" }}
  ],
  "meshes": [
    {{ "primitives": [
      {{ "attributes": {{ "POSITION": 0 }}, "indices": 2 }},
      {{ "attributes": {{ "POSITION": 1 }}, "indices": 3 }}
    ] }},
    {{ "primitives": [{{ "attributes": {{ "POSITION": 0 }} }}] }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0, 0, 0], "max": [1, 1, 0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0, 0, 1], "max": [1, 1, 1] }},
    {{ "bufferView": 2, "componentType": 5125, "count": 3, "type": "SCALAR" }},
    {{ "bufferView": 3, "componentType": 5125, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 72, "byteLength": 12 }},
    {{ "buffer": 0, "byteOffset": 84, "byteLength": 12 }}
  ],
  "buffers": [{{
    "byteLength": 96,
    "uri": "data:application/octet-stream;base64,{BUFFER}"
  }}]
}}"#
        )
    }

    #[test]
    fn gltf_nodes_become_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gltf");
        fs::write(&path, gltf_scene()).unwrap();

        let components = extract_components(&path).unwrap();
        assert_eq!(components.len(), 2);

        let hull = &components[0];
        assert_eq!(hull.name, "hull");
        assert_eq!(hull.vertex_count(), 6);
        assert_eq!(&hull.vertices[15..], [0.0, 1.0, 1.0]);
        // Second primitive's indices are shifted past the first's vertices.
        assert_eq!(hull.indices, [0, 1, 2, 5, 4, 3]);

        let unnamed = &components[1];
        assert_eq!(unnamed.name, UNNAMED_COMPONENT);
        assert_eq!(unnamed.indices, [0, 1, 2]);
    }

    #[test]
    fn obj_models_become_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.OBJ");
        fs::write(
            &path,
            "o quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();

        let components = extract_components(&path).unwrap();
        assert_eq!(components.len(), 1);
        let quad = &components[0];
        assert_eq!(quad.name, "quad");
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.triangle_count(), 2);
        assert!(quad.indices.iter().all(|&i| i < 4));
    }

    #[test]
    fn index_offsets_do_not_wrap() {
        assert_eq!(offset_index(2, 3, "hull").unwrap(), 5);
        assert!(matches!(
            offset_index(u32::MAX, 1, "hull"),
            Err(SceneError::TooManyVertices { name }) if name == "hull"
        ));
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert!(matches!(
            extract_components(Path::new("model.fbx")),
            Err(SceneError::UnsupportedFormat(ext)) if ext == "fbx"
        ));
        assert!(matches!(
            extract_components(Path::new("model")),
            Err(SceneError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_files_are_reported() {
        assert!(matches!(
            extract_components(Path::new("/nonexistent/scene.glb")),
            Err(SceneError::Gltf(_))
        ));
    }
}
