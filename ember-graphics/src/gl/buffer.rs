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
    buffer::{Buffer, BufferKind, BufferUsage},
    error::FrameworkError,
    gl::{native::NativeCall, state::StateTracker, GlName, ToGlConstant},
};
use std::{
    any::Any,
    borrow::Cow,
    cell::Cell,
    rc::{Rc, Weak},
};

impl ToGlConstant for BufferUsage {
    fn into_gl(self) -> u32 {
        match self {
            BufferUsage::StaticDraw => glow::STATIC_DRAW,
            BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
            BufferUsage::StreamDraw => glow::STREAM_DRAW,
        }
    }
}

pub struct GlBuffer {
    state: Weak<StateTracker>,
    pub id: GlName,
    kind: BufferKind,
    usage: BufferUsage,
    size: Cell<usize>,
}

impl GlBuffer {
    pub fn new(
        state: &Rc<StateTracker>,
        size: usize,
        kind: BufferKind,
        usage: BufferUsage,
    ) -> Result<Self, FrameworkError> {
        let id = state.api().create_buffer()?;
        state.set_copy_write_buffer(id);
        state.execute(NativeCall::BufferData {
            target: glow::COPY_WRITE_BUFFER,
            size,
            data: None,
            usage: usage.into_gl(),
        });
        Ok(Self {
            state: Rc::downgrade(state),
            id,
            kind,
            usage,
            size: Cell::new(size),
        })
    }

    fn state(&self) -> Result<Rc<StateTracker>, FrameworkError> {
        self.state
            .upgrade()
            .ok_or_else(|| FrameworkError::Custom("graphics server was destroyed".to_owned()))
    }
}

impl Buffer for GlBuffer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> BufferKind {
        self.kind
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn size(&self) -> usize {
        self.size.get()
    }

    fn write_data(&self, data: &[u8]) -> Result<(), FrameworkError> {
        if data.is_empty() {
            return Ok(());
        }
        let state = self.state()?;
        state.set_copy_write_buffer(self.id);
        if data.len() > self.size.get() {
            state.execute(NativeCall::BufferData {
                target: glow::COPY_WRITE_BUFFER,
                size: data.len(),
                data: Some(Cow::Borrowed(data)),
                usage: self.usage.into_gl(),
            });
            self.size.set(data.len());
        } else {
            state.execute(NativeCall::BufferSubData {
                target: glow::COPY_WRITE_BUFFER,
                offset: 0,
                data: Cow::Borrowed(data),
            });
        }
        Ok(())
    }

    fn write_data_at(&self, offset: usize, data: &[u8]) -> Result<(), FrameworkError> {
        if offset + data.len() > self.size.get() {
            return Err(FrameworkError::BufferOverflow {
                offset,
                size: data.len(),
                capacity: self.size.get(),
            });
        }
        if data.is_empty() {
            return Ok(());
        }
        let state = self.state()?;
        state.set_copy_write_buffer(self.id);
        state.execute(NativeCall::BufferSubData {
            target: glow::COPY_WRITE_BUFFER,
            offset,
            data: Cow::Borrowed(data),
        });
        Ok(())
    }
}

impl Drop for GlBuffer {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.forget_buffer(self.id);
            state.execute(NativeCall::DeleteBuffer(self.id));
        }
    }
}
