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

//! Contains all possible errors that may occur during rendering, initialization of
//! renderer structures, or GAPI.

/// Set of possible renderer errors.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// Compilation of a shader has failed.
    #[error("Compilation of \"{}\" shader has failed: {}", shader_name, error_message)]
    ShaderCompilationFailed {
        /// Name of shader.
        shader_name: String,
        /// Compilation error message.
        error_message: String,
    },
    /// Means that shader link stage failed, exact reason is inside `error_message`
    #[error("Linking shader \"{}\" failed: {}", shader_name, error_message)]
    ShaderLinkingFailed {
        /// Name of shader.
        shader_name: String,
        /// Linking error message.
        error_message: String,
    },
    /// Texture has invalid data - insufficient size.
    #[error(
        "Texture has invalid data (insufficent size): expected {}, actual: {}",
        expected_data_size,
        actual_data_size
    )]
    InvalidTextureData {
        /// Expected data size in bytes.
        expected_data_size: usize,
        /// Actual data size in bytes.
        actual_data_size: usize,
    },
    /// A region update does not fit into the texture.
    #[error("Texture region {x};{y} {width}x{height} is out of bounds")]
    InvalidTextureRegion {
        /// Left edge of the region.
        x: u32,
        /// Top edge of the region.
        y: u32,
        /// Width of the region.
        width: u32,
        /// Height of the region.
        height: u32,
    },
    /// Means that you tried to draw element range from a vertex array that
    /// does not have enough elements.
    #[error(
        "Tried to draw elements that are out of bounds: start: {}, end: {}, total: {}",
        start,
        end,
        total
    )]
    InvalidElementRange {
        /// First element.
        start: usize,
        /// One past the last element.
        end: usize,
        /// Total amount of elements.
        total: usize,
    },
    /// Base vertex of an indexed draw is negative or points past the last vertex.
    #[error("Base vertex {base_vertex} is out of bounds, vertex count: {vertex_count}")]
    InvalidBaseVertex {
        /// Requested base vertex.
        base_vertex: i32,
        /// Total amount of vertices.
        vertex_count: usize,
    },
    /// An indexed draw was requested on a vertex array without index buffer.
    #[error("Indexed draw requested on a vertex array without an index buffer")]
    MissingIndexBuffer,
    /// A draw was recorded before any pipeline was bound.
    #[error("Draw call recorded without a bound pipeline")]
    NoPipelineBound,
    /// A draw was recorded before any vertex array was bound.
    #[error("Draw call recorded without a bound vertex array object")]
    NoVertexArrayBound,
    /// Push constant data does not fit into the push constant block.
    #[error("Push constants are too large: {size} bytes, limit is {limit}")]
    PushConstantsOverflow {
        /// Size of the data.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },
    /// Descriptor set slot is out of range.
    #[error("Descriptor set slot {slot} is out of range (max {max})")]
    InvalidDescriptorSlot {
        /// Requested slot.
        slot: usize,
        /// Amount of slots.
        max: usize,
    },
    /// OpenGL failed to construct framebuffer.
    #[error("OpenGL failed to construct framebuffer, status: {0:#x}")]
    FailedToConstructFBO(u32),
    /// Render target binding stack was popped more times than it was pushed.
    #[error("Render target stack underflow")]
    RenderTargetStackUnderflow,
    /// A texture unit or a uniform buffer binding point past the supported amount.
    #[error("{kind} binding {index} is out of range, supported amount is {max}")]
    BindingOutOfRange {
        /// Kind of the binding point.
        kind: &'static str,
        /// Requested binding point.
        index: u32,
        /// Amount of binding points of this kind.
        max: usize,
    },
    /// A frame ended while some render targets were still pushed.
    #[error("Frame ended with {0} render target(s) still pushed")]
    UnbalancedRenderTargetStack(usize),
    /// Uniform array element index is out of range.
    #[error("Uniform array index {index} is out of range, length is {len}")]
    UniformArrayIndexOutOfRange {
        /// Requested element.
        index: usize,
        /// Current element count.
        len: usize,
    },
    /// Data written into a uniform array does not match the element size.
    #[error("Uniform array element must be {expected} bytes, got {actual}")]
    UniformArrayElementSize {
        /// Fixed element size.
        expected: usize,
        /// Size of the data.
        actual: usize,
    },
    /// Write goes past the end of a fixed-size buffer.
    #[error("Buffer write of {size} bytes at {offset} exceeds buffer size {capacity}")]
    BufferOverflow {
        /// Offset of the write.
        offset: usize,
        /// Size of the write.
        size: usize,
        /// Size of the buffer.
        capacity: usize,
    },
    /// Query was used in a wrong way.
    #[error("Query misuse: {0}")]
    QueryMisuse(&'static str),
    /// A resource created by some other graphics server was passed in.
    #[error("Resource \"{0}\" does not belong to this graphics server")]
    ForeignResource(&'static str),
    /// Custom error. Usually used for internal errors.
    #[error("Custom error: {0}")]
    Custom(String),
}

impl From<String> for FrameworkError {
    fn from(v: String) -> Self {
        Self::Custom(v)
    }
}
