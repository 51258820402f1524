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

//! GPU buffers. A buffer owns exactly one native buffer object and frees it on drop.

use crate::error::FrameworkError;
use std::any::Any;

/// Kind of a buffer, defines the binding point it is used with.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BufferKind {
    /// Per-vertex data.
    Vertex,
    /// Element (index) data.
    Index,
    /// Uniform block storage.
    Uniform,
}

/// A hint to the driver on how the buffer will be used.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    StaticDraw,
    /// Rewritten every frame or so.
    DynamicDraw,
    /// Written once, drawn a few times.
    StreamDraw,
}

/// Backend-agnostic GPU buffer.
pub trait Buffer: Any {
    fn as_any(&self) -> &dyn Any;

    fn kind(&self) -> BufferKind;

    fn usage(&self) -> BufferUsage;

    /// Current size of the buffer in bytes.
    fn size(&self) -> usize;

    /// Replaces the content of the buffer. Writing more bytes than the buffer can hold reallocates
    /// the storage, so the buffer size only grows.
    fn write_data(&self, data: &[u8]) -> Result<(), FrameworkError>;

    /// Overwrites a sub-range of the buffer. Unlike [`Self::write_data`] this never reallocates,
    /// writing past the end is an error.
    fn write_data_at(&self, offset: usize, data: &[u8]) -> Result<(), FrameworkError>;
}
