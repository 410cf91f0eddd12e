use std::path::{Path, PathBuf};

use glam::Vec3;
use thiserror::Error;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("failed to load mesh {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("mesh {} has no triangles", .path.display())]
    Empty { path: PathBuf },

    #[error("mesh needs a {bytes} byte buffer, the device allows at most {max}")]
    TooLarge { bytes: u64, max: u64 },
}

/// Vertex layout shared with `mesh.vert.wgsl` (locations 0, 1, 2)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Load a Wavefront OBJ file. All objects in the file end up in one mesh.
    pub fn load_obj(path: &Path) -> Result<Self, MeshError> {
        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj(path, &options).map_err(|source| MeshError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        if let Err(e) = materials {
            // materials are ignored, only the diffuse texture next to the file is used
            debug!(path = %path.display(), "no materials: {e}");
        }

        let mesh = Self::from_models(&models);
        if mesh.is_empty() {
            return Err(MeshError::Empty { path: path.to_path_buf() });
        }

        info!(
            path = %path.display(),
            models = models.len(),
            vertices = mesh.vertices.len(),
            triangles = mesh.triangle_count(),
            "mesh loaded"
        );
        Ok(mesh)
    }

    /// Merge tobj models into one vertex/index list
    pub fn from_models(models: &[tobj::Model]) -> Self {
        let mut mesh = Mesh::default();
        for model in models {
            mesh.append(&model.mesh);
        }
        mesh
    }

    fn append(&mut self, source: &tobj::Mesh) {
        let base = self.vertices.len() as u32;
        let count = source.positions.len() / 3;
        let has_normals = source.normals.len() == source.positions.len();
        let has_uvs = source.texcoords.len() / 2 == count;

        self.vertices.extend((0..count).map(|i| Vertex {
            position: [source.positions[3 * i], source.positions[3 * i + 1], source.positions[3 * i + 2]],
            normal: if has_normals {
                [source.normals[3 * i], source.normals[3 * i + 1], source.normals[3 * i + 2]]
            } else {
                [0.0; 3]
            },
            uv: if has_uvs {
                [source.texcoords[2 * i], source.texcoords[2 * i + 1]]
            } else {
                [0.0; 2]
            },
        }));
        self.indices.extend(source.indices.iter().map(|&i| base + i));

        if !has_normals {
            self.generate_normals(base as usize);
        }
    }

    /// Smooth normals for vertices from `first` on, area-weighted over their triangles
    fn generate_normals(&mut self, first: usize) {
        let mut sums = vec![Vec3::ZERO; self.vertices.len() - first];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a < first || b < first || c < first {
                continue;
            }
            let pa = Vec3::from(self.vertices[a].position);
            let pb = Vec3::from(self.vertices[b].position);
            let pc = Vec3::from(self.vertices[c].position);
            let n = (pb - pa).cross(pc - pa);
            for i in [a, b, c] {
                sums[i - first] += n;
            }
        }
        for (vertex, sum) in self.vertices[first..].iter_mut().zip(sums) {
            vertex.normal = sum.normalize_or_zero().to_array();
        }
    }

    /// Both buffers must fit in `max_buffer_size` bytes
    pub fn check_size(&self, max_buffer_size: u64) -> Result<(), MeshError> {
        let vertex_bytes = std::mem::size_of_val(self.vertices.as_slice()) as u64;
        let index_bytes = std::mem::size_of_val(self.indices.as_slice()) as u64;
        let bytes = vertex_bytes.max(index_bytes);
        if bytes > max_buffer_size {
            return Err(MeshError::TooLarge { bytes, max: max_buffer_size });
        }
        Ok(())
    }

    pub fn upload(&self, device: &wgpu::Device) -> Result<MeshBuffer, MeshError> {
        self.check_size(device.limits().max_buffer_size)?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn write_obj(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn quad_is_triangulated_with_generated_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_obj(
            &dir,
            "quad.obj",
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        );

        let mesh = Mesh::load_obj(&path).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        for vertex in &mesh.vertices {
            assert_relative_eq!(vertex.normal[0], 0.0);
            assert_relative_eq!(vertex.normal[1], 0.0);
            assert_relative_eq!(vertex.normal[2], 1.0);
            assert_eq!(vertex.uv, [0.0, 0.0]);
        }
    }

    #[test]
    fn file_normals_and_uvs_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_obj(
            &dir,
            "tri.obj",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.25 0.75\nvn 0 1 0\nf 1/1/1 2/1/1 3/1/1\n",
        );

        let mesh = Mesh::load_obj(&path).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert!(mesh.vertices.iter().all(|v| v.uv == [0.25, 0.75]));
    }

    #[test]
    fn objects_are_merged_with_offset_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_obj(
            &dir,
            "two.obj",
            "o first\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
             o second\nv 0 0 2\nv 1 0 2\nv 0 1 2\nf 4 5 6\n",
        );

        let mesh = Mesh::load_obj(&path).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.indices[3..].iter().all(|&i| i >= 3));
        assert!(mesh.vertices[..3].iter().all(|v| v.position[2] == 0.0));
        assert!(mesh.vertices[3..].iter().all(|v| v.position[2] == 2.0));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Mesh::load_obj(&dir.path().join("missing.obj"));
        assert!(matches!(result, Err(MeshError::Load { .. })));
    }

    #[test]
    fn file_without_faces_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_obj(&dir, "points.obj", "v 0 0 0\nv 1 0 0\n");
        assert!(matches!(Mesh::load_obj(&path), Err(MeshError::Empty { .. })));
    }

    #[test]
    fn buffers_past_the_device_limit_are_rejected() {
        let mesh = Mesh {
            vertices: vec![Vertex { position: [0.0; 3], normal: [0.0; 3], uv: [0.0; 2] }; 3],
            indices: vec![0, 1, 2],
        };
        // 3 vertices of 32 bytes each
        assert!(mesh.check_size(96).is_ok());
        assert!(matches!(mesh.check_size(95), Err(MeshError::TooLarge { bytes: 96, max: 95 })));
    }

    #[test]
    fn vertex_layout_matches_the_shader_inputs() {
        let locations: Vec<u32> = Vertex::layout().attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, crate::shader::link::MESH_VERTEX_LOCATIONS);
    }
}
