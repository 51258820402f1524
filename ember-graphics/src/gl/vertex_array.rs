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

use crate::{
    buffer::Buffer,
    error::FrameworkError,
    gl::{buffer::GlBuffer, native::NativeCall, state::StateTracker, GlName, ToGlConstant},
    vertex_array::{
        AttributeKind, IndexKind, VertexArrayDescriptor, VertexArrayObject, VertexLayout,
    },
};
use std::{
    any::Any,
    rc::{Rc, Weak},
};

impl ToGlConstant for AttributeKind {
    fn into_gl(self) -> u32 {
        match self {
            AttributeKind::Float => glow::FLOAT,
            AttributeKind::UnsignedByte => glow::UNSIGNED_BYTE,
            AttributeKind::UnsignedShort => glow::UNSIGNED_SHORT,
            AttributeKind::UnsignedInt => glow::UNSIGNED_INT,
        }
    }
}

impl ToGlConstant for IndexKind {
    fn into_gl(self) -> u32 {
        match self {
            IndexKind::U16 => glow::UNSIGNED_SHORT,
            IndexKind::U32 => glow::UNSIGNED_INT,
        }
    }
}

pub(crate) fn gl_buffer(buffer: &Rc<dyn Buffer>) -> Result<&GlBuffer, FrameworkError> {
    buffer
        .as_any()
        .downcast_ref::<GlBuffer>()
        .ok_or(FrameworkError::ForeignResource("buffer"))
}

pub struct GlVertexArray {
    state: Weak<StateTracker>,
    pub id: GlName,
    vertex_buffer: Rc<dyn Buffer>,
    index_buffer: Option<Rc<dyn Buffer>>,
    layout: VertexLayout,
    index_kind: IndexKind,
}

impl GlVertexArray {
    pub fn new(
        state: &Rc<StateTracker>,
        desc: VertexArrayDescriptor,
    ) -> Result<Self, FrameworkError> {
        let vertex_buffer_id = gl_buffer(&desc.vertex_buffer)?.id;
        let index_buffer_id = desc
            .index_buffer
            .as_ref()
            .map(gl_buffer)
            .transpose()?
            .map(|b| b.id);

        let id = state.api().create_vertex_array()?;
        state.set_vertex_array_object(id);
        state.set_vertex_buffer_object(vertex_buffer_id);

        for (offset, attribute) in desc.layout.offsets() {
            state.execute(NativeCall::EnableVertexAttribArray(attribute.location));
            state.execute(NativeCall::VertexAttribPointer {
                index: attribute.location,
                size: attribute.component_count as i32,
                data_type: attribute.kind.into_gl(),
                normalized: attribute.normalized,
                stride: desc.layout.stride as i32,
                offset: offset as i32,
            });
            if attribute.divisor != 0 {
                state.execute(NativeCall::VertexAttribDivisor {
                    index: attribute.location,
                    divisor: attribute.divisor,
                });
            }
        }

        // The element array binding is a part of the vertex array object.
        if let Some(index_buffer_id) = index_buffer_id {
            state.execute(NativeCall::BindBuffer {
                target: glow::ELEMENT_ARRAY_BUFFER,
                buffer: index_buffer_id,
            });
        }

        Ok(Self {
            state: Rc::downgrade(state),
            id,
            vertex_buffer: desc.vertex_buffer,
            index_buffer: desc.index_buffer,
            layout: desc.layout,
            index_kind: desc.index_kind,
        })
    }
}

impl VertexArrayObject for GlVertexArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn vertex_buffer(&self) -> &Rc<dyn Buffer> {
        &self.vertex_buffer
    }

    fn index_buffer(&self) -> Option<&Rc<dyn Buffer>> {
        self.index_buffer.as_ref()
    }

    fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    fn index_kind(&self) -> IndexKind {
        self.index_kind
    }
}

impl Drop for GlVertexArray {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.forget_vertex_array(self.id);
            state.execute(NativeCall::DeleteVertexArray(self.id));
        }
    }
}
