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

//! Per-frame storage of recorded vector draws. Everything recorded between two flushes lands in
//! one vertex array and one uniform array, draw calls only keep ranges into them.

use crate::graphics::{
    error::FrameworkError, gpu_texture::GpuTexture, uniform::AlignedUniformArray, BlendFunc,
};
use crate::vg::paint::{FragUniforms, PAINT_BLOCK_SIZE};
use bytemuck::{Pod, Zeroable};
use std::{ops::Range, rc::Rc};

#[derive(Copy, Clone, PartialEq, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct VgVertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

impl VgVertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { x, y, u, v }
    }
}

/// Geometry of one contour as produced by the tesselator: a triangle fan of the interior and a
/// triangle strip of the outline (the anti-aliased fringe for fills).
#[derive(Clone, Default, Debug)]
pub struct VgPath {
    pub fill: Vec<VgVertex>,
    pub stroke: Vec<VgVertex>,
    pub convex: bool,
}

/// Ranges of one path inside the frame vertex array.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct PathRecord {
    pub fill: Range<usize>,
    pub stroke: Range<usize>,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallKind {
    Fill,
    ConvexFill,
    Stroke,
    Triangles,
}

#[derive(Clone)]
pub struct DrawCallRecord {
    pub kind: CallKind,
    pub image: i32,
    /// Texture of `image` captured when the draw was recorded, so deleting the image before the
    /// flush does not affect the draw.
    pub texture: Option<Rc<dyn GpuTexture>>,
    pub paths: Range<usize>,
    /// Bounding quad of a fill or the vertices of a triangle soup.
    pub triangles: Range<usize>,
    /// Index of the first uniform, stencil passes use the one that follows.
    pub uniform: usize,
    pub blend: BlendFunc,
}

/// Collection sizes at some moment, used to drop a partially recorded draw.
#[derive(Copy, Clone, Debug)]
pub struct BatchMark {
    vertices: usize,
    paths: usize,
    uniforms: usize,
    calls: usize,
}

pub struct FrameBatch {
    pub(crate) vertices: Vec<VgVertex>,
    pub(crate) paths: Vec<PathRecord>,
    pub(crate) uniforms: AlignedUniformArray,
    pub(crate) calls: Vec<DrawCallRecord>,
}

impl FrameBatch {
    pub fn new(uniform_alignment: usize) -> Self {
        Self {
            vertices: Vec::new(),
            paths: Vec::new(),
            uniforms: AlignedUniformArray::new(uniform_alignment, 0, PAINT_BLOCK_SIZE),
            calls: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn calls(&self) -> &[DrawCallRecord] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.paths.clear();
        self.uniforms.clear();
        self.calls.clear();
    }

    pub fn mark(&self) -> BatchMark {
        BatchMark {
            vertices: self.vertices.len(),
            paths: self.paths.len(),
            uniforms: self.uniforms.len(),
            calls: self.calls.len(),
        }
    }

    pub fn rollback(&mut self, mark: BatchMark) {
        self.vertices.truncate(mark.vertices);
        self.paths.truncate(mark.paths);
        self.uniforms.resize(mark.uniforms.min(self.uniforms.len()));
        self.calls.truncate(mark.calls);
    }

    pub(crate) fn push_vertices(&mut self, vertices: &[VgVertex]) -> Range<usize> {
        let start = self.vertices.len();
        self.vertices.extend_from_slice(vertices);
        start..self.vertices.len()
    }

    pub(crate) fn push_uniform(&mut self, uniform: &FragUniforms) -> Result<usize, FrameworkError> {
        self.uniforms.push(bytemuck::bytes_of(uniform))
    }

    /// Copies the geometry of every path and returns the range of the new path records.
    pub(crate) fn push_paths(&mut self, paths: &[VgPath]) -> Range<usize> {
        let start = self.paths.len();
        for path in paths {
            let record = PathRecord {
                fill: self.push_vertices(&path.fill),
                stroke: self.push_vertices(&path.stroke),
            };
            self.paths.push(record);
        }
        start..self.paths.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn quad() -> VgPath {
        VgPath {
            fill: vec![VgVertex::default(); 4],
            stroke: vec![VgVertex::default(); 10],
            convex: true,
        }
    }

    #[test]
    fn test_paths_are_flattened() {
        let mut batch = FrameBatch::new(256);
        let paths = batch.push_paths(&[quad(), quad()]);
        assert_eq!(paths, 0..2);
        assert_eq!(batch.paths[1].fill, 14..18);
        assert_eq!(batch.paths[1].stroke, 18..28);
        assert_eq!(batch.vertex_count(), 28);
    }

    #[test]
    fn test_rollback() {
        let mut batch = FrameBatch::new(256);
        batch.push_paths(&[quad()]);
        batch.push_uniform(&FragUniforms::default()).unwrap();
        let mark = batch.mark();
        batch.push_paths(&[quad()]);
        batch.push_uniform(&FragUniforms::stencil_only()).unwrap();
        batch.rollback(mark);
        assert_eq!(batch.path_count(), 1);
        assert_eq!(batch.vertex_count(), 14);
        assert_eq!(batch.uniform_count(), 1);
        assert_eq!(batch.uniforms.offset(1), 256);
    }
}
