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

//! Render targets (framebuffers). A render target binds a set of color textures and an optional
//! depth texture together. The default render target is the window surface and owns nothing.

use crate::gpu_texture::GpuTexture;
use std::{any::Any, rc::Rc};

#[derive(Copy, Clone, PartialOrd, PartialEq, Hash, Debug, Eq)]
pub enum AttachmentKind {
    Color,
    Depth,
    DepthStencil,
}

#[derive(Clone)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub texture: Rc<dyn GpuTexture>,
}

impl Attachment {
    pub fn color(texture: Rc<dyn GpuTexture>) -> Self {
        Self {
            kind: AttachmentKind::Color,
            texture,
        }
    }

    pub fn depth(texture: Rc<dyn GpuTexture>) -> Self {
        Self {
            kind: AttachmentKind::Depth,
            texture,
        }
    }

    pub fn depth_stencil(texture: Rc<dyn GpuTexture>) -> Self {
        Self {
            kind: AttachmentKind::DepthStencil,
            texture,
        }
    }
}

pub trait RenderTarget: Any {
    fn as_any(&self) -> &dyn Any;

    fn color_attachments(&self) -> &[Attachment];

    fn depth_attachment(&self) -> Option<&Attachment>;

    /// Size in pixels. For texture-backed targets it is the size of the first attachment, for
    /// the default target it is the current frame size.
    fn size(&self) -> (u32, u32);

    fn is_default(&self) -> bool;

    /// Whether the target has a depth buffer that could be written by a depth blit. The default
    /// target is assumed to always have one.
    fn has_depth(&self) -> bool {
        self.is_default() || self.depth_attachment().is_some()
    }
}
