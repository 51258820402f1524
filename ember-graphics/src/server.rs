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

#![warn(missing_docs)]

//! Graphics server is an abstraction layer over the graphics API. It creates every GPU resource
//! and executes recorded command buffers.

use crate::{
    buffer::{Buffer, BufferKind, BufferUsage},
    command::CommandBuffer,
    descriptor::DescriptorSet,
    error::FrameworkError,
    gpu_program::GpuProgram,
    gpu_texture::{
        GpuTexture, GpuTextureDescriptor, GpuTextureKind, MagnificationFilter, MinificationFilter,
        PixelKind, WrapMode,
    },
    pipeline::{PipelineDescriptor, PipelineState},
    query::Query,
    render_target::{Attachment, RenderTarget},
    stats::{DrawStatistics, PipelineStatistics},
    vertex_array::{VertexArrayDescriptor, VertexArrayObject},
};
use std::{any::Any, rc::Rc};

/// Graphics server capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerCapabilities {
    /// The maximum size in basic machine units of a uniform block, which must be at least 16384.
    pub max_uniform_block_size: usize,
    /// The minimum required alignment for uniform buffer sizes and offset. The initial value is 1.
    pub uniform_buffer_offset_alignment: usize,
    /// Largest texture width or height the device accepts.
    pub max_texture_size: usize,
    /// Maximum amount of color attachments of a render target.
    pub max_color_attachments: usize,
}

/// A shared reference to a graphics server.
pub type SharedGraphicsServer = Rc<dyn GraphicsServer>;

/// Graphics server is an abstraction layer over the graphics API. It provides a more or less
/// stateless interface on top of a stateful API: all pipeline state changes are deduplicated by
/// the backend, so callers just describe what they want for every draw.
///
/// Low-level API-specific optimizations could be performed using direct access to the underlying
/// API, by downcasting to a specific type.
pub trait GraphicsServer: Any {
    /// Casts the server to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Creates a GPU buffer with the given size and kind. Usage is a hint to the video driver
    /// that allows to perform some potential performance optimizations.
    fn create_buffer(
        &self,
        size: usize,
        buffer_kind: BufferKind,
        buffer_usage: BufferUsage,
    ) -> Result<Rc<dyn Buffer>, FrameworkError>;

    /// Creates a new GPU texture using the given descriptor.
    fn create_texture(&self, desc: GpuTextureDescriptor)
        -> Result<Rc<dyn GpuTexture>, FrameworkError>;

    /// Creates a new render target using the given depth and color attachments. Fails if the
    /// resulting framebuffer is incomplete.
    fn create_render_target(
        &self,
        depth_attachment: Option<Attachment>,
        color_attachments: Vec<Attachment>,
    ) -> Result<Rc<dyn RenderTarget>, FrameworkError>;

    /// Returns the render target that is "connected" to the final image that will be displayed
    /// on screen.
    fn back_buffer(&self) -> Rc<dyn RenderTarget>;

    /// Creates a new named GPU program using a pair of vertex and fragment shaders. The name could
    /// be used for debugging purposes.
    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Rc<dyn GpuProgram>, FrameworkError>;

    /// Creates an immutable pipeline state object.
    fn create_pipeline_state(
        &self,
        desc: PipelineDescriptor,
    ) -> Result<Rc<PipelineState>, FrameworkError>;

    /// Creates an empty descriptor set.
    fn create_descriptor_set(&self) -> DescriptorSet {
        DescriptorSet::new()
    }

    /// Creates an empty command buffer.
    fn create_command_buffer(&self) -> CommandBuffer {
        CommandBuffer::new()
    }

    /// Creates a vertex array object that binds a vertex layout to its buffers.
    fn create_vertex_array_object(
        &self,
        desc: VertexArrayDescriptor,
    ) -> Result<Rc<dyn VertexArrayObject>, FrameworkError>;

    /// Creates a new GPU query, that can perform asynchronous data fetching from GPU.
    fn create_query(&self) -> Result<Rc<dyn Query>, FrameworkError>;

    /// Executes every command recorded in the buffer and empties it. Render target pushes and
    /// pops must be balanced within one submission.
    fn submit(&self, command_buffer: &mut CommandBuffer) -> Result<DrawStatistics, FrameworkError>;

    /// Presents the back buffer on screen.
    fn present_next_frame(&self) -> Result<(), FrameworkError>;

    /// Notifies the graphics server that the size of the back buffer has changed.
    fn set_frame_size(&self, new_size: (u32, u32));

    /// Returns current capabilities of the graphics server. See [`ServerCapabilities`] for more
    /// info.
    fn limits(&self) -> ServerCapabilities;

    /// Returns GPU pipeline statistics. See [`PipelineStatistics`] for more info.
    fn pipeline_statistics(&self) -> PipelineStatistics;

    /// Forgets every cached piece of pipeline state, so the next state change of every kind is
    /// re-emitted. Must be called after foreign code touched the context.
    fn invalidate_state_cache(&self);

    /// A shortcut for [`Self::create_texture`], that creates a rectangular texture with the given
    /// size and pixel kind.
    fn create_2d_render_target(
        &self,
        pixel_kind: PixelKind,
        width: u32,
        height: u32,
    ) -> Result<Rc<dyn GpuTexture>, FrameworkError> {
        self.create_texture(GpuTextureDescriptor {
            kind: GpuTextureKind::Rectangle { width, height },
            pixel_kind,
            min_filter: MinificationFilter::Nearest,
            mag_filter: MagnificationFilter::Nearest,
            s_wrap_mode: WrapMode::ClampToEdge,
            t_wrap_mode: WrapMode::ClampToEdge,
            ..Default::default()
        })
    }
}
