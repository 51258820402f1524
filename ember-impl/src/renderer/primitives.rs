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

//! Proxy geometry for light volumes.

use crate::graphics::{
    buffer::{BufferKind, BufferUsage},
    error::FrameworkError,
    server::GraphicsServer,
    vertex_array::{
        AttributeDefinition, IndexKind, VertexArrayDescriptor, VertexArrayObject, VertexLayout,
    },
};
use std::{f32::consts::PI, rc::Rc};

/// Vertices and triangle indices of a unit sphere centered at the origin.
pub fn uv_sphere(slices: usize, stacks: usize) -> (Vec<[f32; 3]>, Vec<u32>) {
    let slices = slices.max(3);
    let stacks = stacks.max(2);

    let mut vertices = Vec::with_capacity((slices + 1) * (stacks + 1));
    for stack in 0..=stacks {
        let theta = PI * stack as f32 / stacks as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for slice in 0..=slices {
            let phi = 2.0 * PI * slice as f32 / slices as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            vertices.push([sin_theta * cos_phi, cos_theta, sin_theta * sin_phi]);
        }
    }

    let row = slices as u32 + 1;
    let mut indices = Vec::with_capacity(slices * stacks * 6);
    for stack in 0..stacks as u32 {
        for slice in 0..slices as u32 {
            let a = stack * row + slice;
            let b = a + row;
            indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }

    (vertices, indices)
}

/// A single triangle that covers the whole clip space square.
pub fn fullscreen_triangle() -> [[f32; 3]; 3] {
    [[-1.0, -1.0, 0.0], [3.0, -1.0, 0.0], [-1.0, 3.0, 0.0]]
}

fn position_layout() -> VertexLayout {
    VertexLayout::new(vec![AttributeDefinition::float(0, 3)])
}

pub fn create_sphere(
    server: &dyn GraphicsServer,
    slices: usize,
    stacks: usize,
) -> Result<Rc<dyn VertexArrayObject>, FrameworkError> {
    let (vertices, indices) = uv_sphere(slices, stacks);

    let vertex_buffer = server.create_buffer(0, BufferKind::Vertex, BufferUsage::StaticDraw)?;
    vertex_buffer.write_data(bytemuck::cast_slice(&vertices))?;
    let index_buffer = server.create_buffer(0, BufferKind::Index, BufferUsage::StaticDraw)?;
    index_buffer.write_data(bytemuck::cast_slice(&indices))?;

    server.create_vertex_array_object(VertexArrayDescriptor {
        layout: position_layout(),
        vertex_buffer,
        index_buffer: Some(index_buffer),
        index_kind: IndexKind::U32,
    })
}

pub fn create_fullscreen_triangle(
    server: &dyn GraphicsServer,
) -> Result<Rc<dyn VertexArrayObject>, FrameworkError> {
    let vertex_buffer = server.create_buffer(0, BufferKind::Vertex, BufferUsage::StaticDraw)?;
    vertex_buffer.write_data(bytemuck::cast_slice(&fullscreen_triangle()))?;

    server.create_vertex_array_object(VertexArrayDescriptor {
        layout: position_layout(),
        vertex_buffer,
        index_buffer: None,
        index_kind: IndexKind::U32,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::gl::server::GlGraphicsServer;

    #[test]
    fn test_uv_sphere() {
        let (vertices, indices) = uv_sphere(16, 8);
        assert_eq!(vertices.len(), 17 * 9);
        assert_eq!(indices.len(), 16 * 8 * 6);
        assert!(indices.iter().all(|i| (*i as usize) < vertices.len()));
        for [x, y, z] in vertices {
            approx::assert_relative_eq!((x * x + y * y + z * z).sqrt(), 1.0, epsilon = 1.0e-5);
        }
    }

    #[test]
    fn test_gpu_primitives() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let sphere = create_sphere(&*server, 16, 8).unwrap();
        assert_eq!(sphere.vertex_count(), 17 * 9);
        assert_eq!(sphere.index_count(), 16 * 8 * 6);
        let triangle = create_fullscreen_triangle(&*server).unwrap();
        assert_eq!(triangle.vertex_count(), 3);
        assert_eq!(triangle.index_count(), 0);
    }
}
