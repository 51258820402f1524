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

//! Command buffers. Commands are recorded on the CPU with all contract checks done at record
//! time and executed later by [`crate::server::GraphicsServer::submit`].

use crate::{
    core::{color::Color, math::Rect},
    descriptor::DescriptorSet,
    error::FrameworkError,
    pipeline::PipelineState,
    query::{Query, QueryKind},
    render_target::RenderTarget,
    vertex_array::VertexArrayObject,
    PrimitiveTopology,
};
use smallvec::SmallVec;
use std::{fmt::Debug, rc::Rc};

/// Amount of descriptor set slots a draw call can use.
pub const DESCRIPTOR_SLOT_COUNT: usize = 4;

/// Maximum size of push constant data in bytes.
pub const MAX_PUSH_CONSTANTS_SIZE: usize = 256;

/// Inline storage for push constants. Data up to 128 bytes (two matrices) stays on the stack.
pub type PushConstants = SmallVec<[u8; 128]>;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct DrawRange {
    /// First vertex, or first index for indexed draws.
    pub first: usize,
    pub count: usize,
    pub indexed: bool,
    /// Value added to every index before fetching a vertex. Indexed draws only.
    pub base_vertex: i32,
    pub instances: usize,
}

/// An immutable, fully validated draw.
#[derive(Clone)]
pub struct DrawCall {
    pub pipeline: Rc<PipelineState>,
    pub vertex_array: Rc<dyn VertexArrayObject>,
    pub topology: PrimitiveTopology,
    pub range: DrawRange,
    pub descriptor_sets: [Option<Rc<DescriptorSet>>; DESCRIPTOR_SLOT_COUNT],
    pub push_constants: PushConstants,
}

impl Debug for DrawCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawCall")
            .field("program", &self.pipeline.program().name())
            .field("topology", &self.topology)
            .field("range", &self.range)
            .field("push_constants", &self.push_constants.len())
            .finish()
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct ClearValues {
    pub color: Option<Color>,
    pub depth: Option<f32>,
    pub stencil: Option<i32>,
}

pub enum Command {
    PushRenderTarget(Rc<dyn RenderTarget>),
    PopRenderTarget,
    SetViewport(Rect<i32>),
    Clear(ClearValues),
    Draw(DrawCall),
    /// Copies the depth buffer of `source` into `dest`.
    BlitDepth {
        source: Rc<dyn RenderTarget>,
        dest: Rc<dyn RenderTarget>,
    },
    BeginQuery {
        query: Rc<dyn Query>,
        kind: QueryKind,
    },
    EndQuery(Rc<dyn Query>),
}

impl Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::PushRenderTarget(rt) => write!(f, "PushRenderTarget({:?})", rt.size()),
            Command::PopRenderTarget => write!(f, "PopRenderTarget"),
            Command::SetViewport(rect) => write!(f, "SetViewport({rect:?})"),
            Command::Clear(values) => write!(f, "Clear({values:?})"),
            Command::Draw(draw) => write!(f, "{draw:?}"),
            Command::BlitDepth { .. } => write!(f, "BlitDepth"),
            Command::BeginQuery { kind, .. } => write!(f, "BeginQuery({kind:?})"),
            Command::EndQuery(_) => write!(f, "EndQuery"),
        }
    }
}

/// Records commands. Bound pipeline, vertex array, descriptor sets and push constants persist
/// between draws until they are replaced.
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    pipeline: Option<Rc<PipelineState>>,
    vertex_array: Option<Rc<dyn VertexArrayObject>>,
    descriptor_sets: [Option<Rc<DescriptorSet>>; DESCRIPTOR_SLOT_COUNT],
    push_constants: PushConstants,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self, values: ClearValues) {
        self.commands.push(Command::Clear(values));
    }

    pub fn push_render_target(&mut self, render_target: Rc<dyn RenderTarget>) {
        self.commands.push(Command::PushRenderTarget(render_target));
    }

    pub fn pop_render_target(&mut self) {
        self.commands.push(Command::PopRenderTarget);
    }

    pub fn set_viewport(&mut self, viewport: Rect<i32>) {
        self.commands.push(Command::SetViewport(viewport));
    }

    pub fn blit_depth(&mut self, source: Rc<dyn RenderTarget>, dest: Rc<dyn RenderTarget>) {
        self.commands.push(Command::BlitDepth { source, dest });
    }

    pub fn begin_query(&mut self, query: Rc<dyn Query>, kind: QueryKind) {
        self.commands.push(Command::BeginQuery { query, kind });
    }

    pub fn end_query(&mut self, query: Rc<dyn Query>) {
        self.commands.push(Command::EndQuery(query));
    }

    pub fn bind_pipeline(&mut self, pipeline: Rc<PipelineState>) {
        self.pipeline = Some(pipeline);
    }

    pub fn bind_vertex_array_object(&mut self, vertex_array: Rc<dyn VertexArrayObject>) {
        self.vertex_array = Some(vertex_array);
    }

    pub fn bind_descriptor_set(
        &mut self,
        slot: usize,
        set: Rc<DescriptorSet>,
    ) -> Result<(), FrameworkError> {
        let entry = self
            .descriptor_sets
            .get_mut(slot)
            .ok_or(FrameworkError::InvalidDescriptorSlot {
                slot,
                max: DESCRIPTOR_SLOT_COUNT,
            })?;
        *entry = Some(set);
        Ok(())
    }

    pub fn unbind_descriptor_set(&mut self, slot: usize) {
        if let Some(entry) = self.descriptor_sets.get_mut(slot) {
            *entry = None;
        }
    }

    /// Replaces the current push constant data.
    pub fn push_constants(&mut self, bytes: &[u8]) -> Result<(), FrameworkError> {
        if bytes.len() > MAX_PUSH_CONSTANTS_SIZE {
            return Err(FrameworkError::PushConstantsOverflow {
                size: bytes.len(),
                limit: MAX_PUSH_CONSTANTS_SIZE,
            });
        }
        self.push_constants.clear();
        self.push_constants.extend_from_slice(bytes);
        Ok(())
    }

    pub fn draw(&mut self, first: usize, count: usize) -> Result<(), FrameworkError> {
        self.record_draw(DrawRange {
            first,
            count,
            indexed: false,
            base_vertex: 0,
            instances: 1,
        })
    }

    pub fn draw_instanced(
        &mut self,
        first: usize,
        count: usize,
        instances: usize,
    ) -> Result<(), FrameworkError> {
        self.record_draw(DrawRange {
            first,
            count,
            indexed: false,
            base_vertex: 0,
            instances,
        })
    }

    pub fn draw_indexed(
        &mut self,
        first: usize,
        count: usize,
        base_vertex: i32,
    ) -> Result<(), FrameworkError> {
        self.record_draw(DrawRange {
            first,
            count,
            indexed: true,
            base_vertex,
            instances: 1,
        })
    }

    fn record_draw(&mut self, range: DrawRange) -> Result<(), FrameworkError> {
        let pipeline = self
            .pipeline
            .clone()
            .ok_or(FrameworkError::NoPipelineBound)?;
        let vertex_array = self
            .vertex_array
            .clone()
            .ok_or(FrameworkError::NoVertexArrayBound)?;

        let total = if range.indexed {
            if vertex_array.index_buffer().is_none() {
                return Err(FrameworkError::MissingIndexBuffer);
            }
            vertex_array.index_count()
        } else {
            vertex_array.vertex_count()
        };

        let end = range.first.checked_add(range.count);
        if end.map_or(true, |end| end > total) {
            return Err(FrameworkError::InvalidElementRange {
                start: range.first,
                end: end.unwrap_or(usize::MAX),
                total,
            });
        }

        // Indices themselves are not inspected, only the offset they start from.
        let vertex_count = vertex_array.vertex_count();
        if range.indexed
            && range.count > 0
            && usize::try_from(range.base_vertex).map_or(true, |base| base >= vertex_count)
        {
            return Err(FrameworkError::InvalidBaseVertex {
                base_vertex: range.base_vertex,
                vertex_count,
            });
        }

        self.commands.push(Command::Draw(DrawCall {
            topology: pipeline.topology(),
            pipeline,
            vertex_array,
            range,
            descriptor_sets: self.descriptor_sets.clone(),
            push_constants: self.push_constants.clone(),
        }));

        Ok(())
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Amount of recorded draw commands.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Draw(_)))
            .count()
    }

    /// Takes all recorded commands out, bindings stay as they are.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Drops all recorded commands and resets every binding.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
