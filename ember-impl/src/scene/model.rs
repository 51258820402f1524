// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Imported models: a single vertex/index buffer pair shared by every mesh, a set of materials
//! and a tree of nodes referencing meshes by index.
//!
//! [`ModelData`] is what a model importer produces and [`TextureData`] is what an image decoder
//! produces; both are plain data, the GPU resources are created by [`Model::new`].

use crate::{
    core::{algebra::Matrix4, color::Color, fxhash, warn_once},
    graphics::{
        buffer::{BufferKind, BufferUsage},
        command::CommandBuffer,
        descriptor::{DescriptorSet, ParameterValue, Semantic},
        gpu_texture::{
            GpuTexture, GpuTextureDescriptor, GpuTextureKind, MagnificationFilter,
            MinificationFilter, PixelKind,
        },
        pipeline::PipelineState,
        server::GraphicsServer,
        vertex_array::{
            AttributeDefinition, IndexKind, VertexArrayDescriptor, VertexArrayObject, VertexLayout,
        },
    },
    renderer::RendererError,
};
use bytemuck::{Pod, Zeroable};
use std::rc::Rc;

/// Descriptor slot materials are bound to. Slot 0 holds per-pass data such as camera matrices.
pub const MATERIAL_SLOT: usize = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl ModelVertex {
    pub fn layout() -> VertexLayout {
        VertexLayout::new(vec![
            AttributeDefinition::float(0, 3),
            AttributeDefinition::float(1, 3),
            AttributeDefinition::float(2, 2),
        ])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub material: usize,
    pub first_index: usize,
    pub index_count: usize,
    /// Added to every index of the mesh.
    pub base_vertex: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialData {
    pub base_color: Color,
    /// Index into [`ModelData::textures`]. Replaces the base color when present.
    pub albedo_texture: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Converts the pixels to RGBA8. Grayscale and RGB images get an opaque alpha channel.
    pub fn to_rgba8(&self) -> Result<Vec<u8>, RendererError> {
        let channels = self.channels as usize;
        if !matches!(channels, 1 | 3 | 4) {
            return Err(RendererError::UnsupportedChannelCount(self.channels));
        }
        let pixel_count = self.width as usize * self.height as usize;
        if self.pixels.len() != pixel_count * channels {
            return Err(RendererError::InvalidModelData(format!(
                "texture {}x{} with {} channels has {} bytes of pixels",
                self.width,
                self.height,
                self.channels,
                self.pixels.len()
            )));
        }

        Ok(match channels {
            4 => self.pixels.clone(),
            3 => self
                .pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
                .collect(),
            _ => self
                .pixels
                .iter()
                .flat_map(|&luma| [luma, luma, luma, 255])
                .collect(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeData {
    pub name: String,
    pub transform: Matrix4<f32>,
    pub meshes: Vec<usize>,
    pub children: Vec<NodeData>,
}

/// Output of a model importer.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
    pub textures: Vec<TextureData>,
    pub root: NodeData,
}

pub struct Mesh {
    first_index: usize,
    index_count: usize,
    base_vertex: i32,
    material: Rc<DescriptorSet>,
}

impl Mesh {
    pub fn index_range(&self) -> std::ops::Range<usize> {
        self.first_index..self.first_index + self.index_count
    }

    pub fn material(&self) -> &Rc<DescriptorSet> {
        &self.material
    }
}

/// A node of the model tree. Children are owned exclusively, so the tree can't have cycles.
pub struct Node {
    name: String,
    local_transform: Matrix4<f32>,
    meshes: Vec<usize>,
    children: Vec<Node>,
}

impl Node {
    fn from_data(data: NodeData) -> Self {
        Self {
            name: data.name,
            local_transform: data.transform,
            meshes: data.meshes,
            children: data.children.into_iter().map(Node::from_data).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_transform(&self) -> &Matrix4<f32> {
        &self.local_transform
    }

    pub fn meshes(&self) -> &[usize] {
        &self.meshes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    fn collect_world_transforms<'a>(
        &'a self,
        parent: &Matrix4<f32>,
        out: &mut Vec<(&'a str, Matrix4<f32>)>,
    ) {
        let world = parent * self.local_transform;
        out.push((&self.name, world));
        for child in self.children.iter() {
            child.collect_world_transforms(&world, out);
        }
    }
}

pub struct Model {
    vertex_array: Rc<dyn VertexArrayObject>,
    meshes: Vec<Mesh>,
    textures: Vec<Rc<dyn GpuTexture>>,
    root: Node,
}

fn create_texture(
    server: &dyn GraphicsServer,
    width: u32,
    height: u32,
    pixels: &[u8],
    mipmaps: bool,
) -> Result<Rc<dyn GpuTexture>, RendererError> {
    let texture = server.create_texture(GpuTextureDescriptor {
        kind: GpuTextureKind::Rectangle { width, height },
        pixel_kind: PixelKind::RGBA8,
        min_filter: if mipmaps {
            MinificationFilter::LinearMipMapLinear
        } else {
            MinificationFilter::Linear
        },
        mag_filter: MagnificationFilter::Linear,
        data: Some(pixels),
        ..Default::default()
    })?;
    if mipmaps {
        texture.generate_mipmaps()?;
    }
    Ok(texture)
}

impl Model {
    pub fn new(server: &dyn GraphicsServer, data: ModelData) -> Result<Self, RendererError> {
        let textures = data
            .textures
            .iter()
            .map(|texture| {
                create_texture(
                    server,
                    texture.width,
                    texture.height,
                    &texture.to_rgba8()?,
                    true,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Base color modulates the albedo sample, untextured materials sample plain white.
        let mut white = None;
        let mut materials = Vec::with_capacity(data.materials.len());
        for (index, material) in data.materials.iter().enumerate() {
            let albedo = match material.albedo_texture {
                Some(texture) => textures.get(texture).cloned().ok_or_else(|| {
                    RendererError::InvalidModelData(format!(
                        "material {index} references missing texture {texture}"
                    ))
                })?,
                None => match white.as_ref() {
                    Some(white) => Rc::clone(white),
                    None => white
                        .insert(create_texture(server, 1, 1, &[255; 4], false)?)
                        .clone(),
                },
            };
            materials.push(Rc::new(
                DescriptorSet::new()
                    .with(Semantic::AlbedoTexture, ParameterValue::Texture(albedo))
                    .with(
                        Semantic::DiffuseColor,
                        ParameterValue::Vector4(material.base_color.as_frgba()),
                    ),
            ));
        }

        let mut meshes = Vec::with_capacity(data.meshes.len());
        for (index, mesh) in data.meshes.iter().enumerate() {
            if mesh.first_index + mesh.index_count > data.indices.len() {
                return Err(RendererError::InvalidModelData(format!(
                    "mesh {index} uses indices {}..{}, but there are only {}",
                    mesh.first_index,
                    mesh.first_index + mesh.index_count,
                    data.indices.len()
                )));
            }
            let material = materials.get(mesh.material).cloned().ok_or_else(|| {
                RendererError::InvalidModelData(format!(
                    "mesh {index} references missing material {}",
                    mesh.material
                ))
            })?;
            meshes.push(Mesh {
                first_index: mesh.first_index,
                index_count: mesh.index_count,
                base_vertex: mesh.base_vertex,
                material,
            });
        }

        let vertex_buffer = server.create_buffer(0, BufferKind::Vertex, BufferUsage::StaticDraw)?;
        vertex_buffer.write_data(bytemuck::cast_slice(&data.vertices))?;
        let index_buffer = server.create_buffer(0, BufferKind::Index, BufferUsage::StaticDraw)?;
        index_buffer.write_data(bytemuck::cast_slice(&data.indices))?;
        let vertex_array = server.create_vertex_array_object(VertexArrayDescriptor {
            layout: ModelVertex::layout(),
            vertex_buffer,
            index_buffer: Some(index_buffer),
            index_kind: IndexKind::U32,
        })?;

        Ok(Self {
            vertex_array,
            meshes,
            textures,
            root: Node::from_data(data.root),
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn textures(&self) -> &[Rc<dyn GpuTexture>] {
        &self.textures
    }

    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.root.find(name)
    }

    /// World transforms of all nodes in pre-order, with the root placed at identity.
    pub fn world_transforms(&self) -> Vec<(&str, Matrix4<f32>)> {
        let mut transforms = Vec::new();
        self.root
            .collect_world_transforms(&Matrix4::identity(), &mut transforms);
        transforms
    }

    /// Draws the whole tree with the given pipeline. Returns the amount of recorded draw calls.
    pub fn render(
        &self,
        cmd: &mut CommandBuffer,
        pipeline: &Rc<PipelineState>,
        root_transform: &Matrix4<f32>,
    ) -> Result<usize, RendererError> {
        cmd.bind_pipeline(pipeline.clone());
        cmd.bind_vertex_array_object(self.vertex_array.clone());
        let count = self.render_node(cmd, &self.root, root_transform)?;
        cmd.unbind_descriptor_set(MATERIAL_SLOT);
        Ok(count)
    }

    /// Draws `node` and its descendants in pre-order. Expects the pipeline and the vertex array
    /// of the model to be bound already.
    pub fn render_node(
        &self,
        cmd: &mut CommandBuffer,
        node: &Node,
        parent_transform: &Matrix4<f32>,
    ) -> Result<usize, RendererError> {
        let world = parent_transform * node.local_transform;

        let mut count = 0;
        for &mesh_index in node.meshes.iter() {
            let Some(mesh) = self.meshes.get(mesh_index) else {
                warn_once!(
                    fxhash::hash(&(node.name.as_str(), mesh_index)),
                    "Node {} references missing mesh {mesh_index}, it was skipped.",
                    node.name
                );
                continue;
            };

            cmd.push_constants(bytemuck::cast_slice(world.as_slice()))?;
            cmd.bind_descriptor_set(MATERIAL_SLOT, mesh.material.clone())?;
            cmd.draw_indexed(mesh.first_index, mesh.index_count, mesh.base_vertex)?;
            count += 1;
        }

        for child in node.children.iter() {
            count += self.render_node(cmd, child, &world)?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::algebra::Vector3,
        graphics::{
            command::Command,
            gl::{native::NativeCall, server::GlGraphicsServer},
        },
        renderer::{lighting::LightingManager, loader::EmbeddedFileLoader},
    };

    fn node(name: &str, x: f32, meshes: Vec<usize>, children: Vec<NodeData>) -> NodeData {
        NodeData {
            name: name.to_owned(),
            transform: Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0)),
            meshes,
            children,
        }
    }

    fn quad() -> ModelData {
        let vertex = |x: f32, z: f32| ModelVertex {
            position: [x, 0.0, z],
            normal: [0.0, 1.0, 0.0],
            tex_coord: [x, z],
        };
        ModelData {
            vertices: vec![
                vertex(0.0, 0.0),
                vertex(1.0, 0.0),
                vertex(1.0, 1.0),
                vertex(0.0, 1.0),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
            meshes: vec![MeshData {
                material: 0,
                first_index: 0,
                index_count: 6,
                base_vertex: 0,
            }],
            materials: vec![MaterialData {
                base_color: Color::RED,
                albedo_texture: None,
            }],
            textures: Vec::new(),
            root: node(
                "Root",
                1.0,
                vec![],
                vec![
                    node("A", 2.0, vec![0], vec![node("A1", 3.0, vec![0], vec![])]),
                    // Mesh 5 does not exist and must be skipped.
                    node("B", 4.0, vec![5, 0], vec![]),
                ],
            ),
        }
    }

    #[test]
    fn test_render_traversal() {
        let (server, _) = GlGraphicsServer::headless(64, 64).unwrap();
        let lighting =
            LightingManager::new(&*server, &EmbeddedFileLoader, Default::default(), (64, 64))
                .unwrap();
        let model = Model::new(&*server, quad()).unwrap();

        let mut cmd = server.create_command_buffer();
        let count = model
            .render(&mut cmd, lighting.geometry_pipeline(), &Matrix4::identity())
            .unwrap();
        assert_eq!(count, 3);

        // Pre-order, every draw gets the composed world matrix of its node.
        let translations = cmd
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::Draw(draw) => Some(bytemuck::pod_read_unaligned::<f32>(
                    &draw.push_constants[48..52],
                )),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(translations, vec![3.0, 6.0, 5.0]);

        assert!(server.submit(&mut cmd).is_ok());
    }

    #[test]
    fn test_world_transforms_and_lookup() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let model = Model::new(&*server, quad()).unwrap();
        let names = model
            .world_transforms()
            .into_iter()
            .map(|(name, transform)| (name.to_owned(), transform[(0, 3)]))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                ("Root".to_owned(), 1.0),
                ("A".to_owned(), 3.0),
                ("A1".to_owned(), 6.0),
                ("B".to_owned(), 5.0)
            ]
        );
        assert_eq!(model.find_node("A1").map(|n| n.meshes().len()), Some(1));
        assert!(model.find_node("C").is_none());
    }

    #[test]
    fn test_invalid_data() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();

        let mut data = quad();
        data.meshes[0].index_count = 7;
        assert!(matches!(
            Model::new(&*server, data),
            Err(RendererError::InvalidModelData(_))
        ));

        let mut data = quad();
        data.materials[0].albedo_texture = Some(0);
        assert!(matches!(
            Model::new(&*server, data),
            Err(RendererError::InvalidModelData(_))
        ));

        let mut data = quad();
        data.textures.push(TextureData {
            width: 1,
            height: 1,
            channels: 2,
            pixels: vec![0, 0],
        });
        assert!(matches!(
            Model::new(&*server, data),
            Err(RendererError::UnsupportedChannelCount(2))
        ));
    }

    #[test]
    fn test_rgb_textures_are_expanded() {
        let texture = TextureData {
            width: 2,
            height: 1,
            channels: 3,
            pixels: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(texture.to_rgba8().unwrap(), vec![1, 2, 3, 255, 4, 5, 6, 255]);

        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let mut data = quad();
        data.textures.push(texture);
        data.materials[0].albedo_texture = Some(0);
        let model = Model::new(&*server, data).unwrap();
        assert_eq!(model.textures()[0].size(), (2, 1));
        assert!(model.textures()[0].mip_count() > 1);
    }

    #[test]
    fn test_base_color_modulates_texture() {
        let (server, recorder) = GlGraphicsServer::headless(16, 16).unwrap();
        let lighting =
            LightingManager::new(&*server, &EmbeddedFileLoader, Default::default(), (16, 16))
                .unwrap();
        let mut data = quad();
        data.textures.push(TextureData {
            width: 1,
            height: 1,
            channels: 4,
            pixels: vec![10, 20, 30, 255],
        });
        data.materials[0].albedo_texture = Some(0);
        let model = Model::new(&*server, data).unwrap();

        let material = &model.meshes[0].material;
        assert!(matches!(
            material.get(Semantic::AlbedoTexture),
            Some(ParameterValue::Texture(texture)) if Rc::ptr_eq(texture, &model.textures()[0])
        ));
        assert!(matches!(
            material.get(Semantic::DiffuseColor),
            Some(ParameterValue::Vector4(color)) if *color == Color::RED.as_frgba()
        ));

        let mut cmd = server.create_command_buffer();
        model
            .render(&mut cmd, lighting.geometry_pipeline(), &Matrix4::identity())
            .unwrap();
        recorder.clear();
        server.submit(&mut cmd).unwrap();
        assert!(recorder.calls().iter().any(|call| matches!(
            call,
            NativeCall::Uniform4F32 { value, .. } if *value == [1.0, 0.0, 0.0, 1.0]
        )));
    }
}
