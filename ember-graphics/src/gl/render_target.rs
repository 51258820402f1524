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
    core::err,
    error::FrameworkError,
    gl::{native::NativeCall, state::StateTracker, texture::GlTexture, GlName},
    gpu_texture::{GpuTexture, GpuTextureKind},
    render_target::{Attachment, AttachmentKind, RenderTarget},
};
use std::{
    any::Any,
    cell::Cell,
    rc::{Rc, Weak},
};

pub struct GlRenderTarget {
    state: Weak<StateTracker>,
    fbo: GlName,
    depth_attachment: Option<Attachment>,
    color_attachments: Vec<Attachment>,
    /// Size of the window surface, used by the default target only.
    frame_size: Cell<(u32, u32)>,
}

fn gl_texture(attachment: &Attachment) -> Result<&GlTexture, FrameworkError> {
    attachment
        .texture
        .as_any()
        .downcast_ref::<GlTexture>()
        .ok_or(FrameworkError::ForeignResource("texture"))
}

impl GlRenderTarget {
    pub fn backbuffer(state: &Rc<StateTracker>, frame_size: (u32, u32)) -> Self {
        Self {
            state: Rc::downgrade(state),
            fbo: 0,
            depth_attachment: None,
            color_attachments: Default::default(),
            frame_size: Cell::new(frame_size),
        }
    }

    pub fn new(
        state: &Rc<StateTracker>,
        depth_attachment: Option<Attachment>,
        color_attachments: Vec<Attachment>,
    ) -> Result<Self, FrameworkError> {
        let fbo = state.api().create_framebuffer()?;

        state.push_framebuffer(fbo);

        let result = Self::attach(state, depth_attachment.as_ref(), &color_attachments);
        let status = state.api().check_framebuffer_status(glow::FRAMEBUFFER);

        state.pop_framebuffer()?;

        if let Err(err) = result {
            state.execute(NativeCall::DeleteFramebuffer(fbo));
            return Err(err);
        }

        if status != glow::FRAMEBUFFER_COMPLETE {
            err!(
                "Failed to construct framebuffer, status: {}",
                framebuffer_status_name(status)
            );
            state.forget_framebuffer(fbo);
            state.execute(NativeCall::DeleteFramebuffer(fbo));
            return Err(FrameworkError::FailedToConstructFBO(status));
        }

        Ok(Self {
            state: Rc::downgrade(state),
            fbo,
            depth_attachment,
            color_attachments,
            frame_size: Cell::new((0, 0)),
        })
    }

    fn attach(
        state: &StateTracker,
        depth_attachment: Option<&Attachment>,
        color_attachments: &[Attachment],
    ) -> Result<(), FrameworkError> {
        let attach = |attachment_point: u32, attachment: &Attachment| {
            let texture = gl_texture(attachment)?;
            let texture_target = match texture.kind() {
                GpuTextureKind::Rectangle { .. } => glow::TEXTURE_2D,
                // Cube maps are attached face by face, the first face is the default.
                GpuTextureKind::Cube { .. } => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
            };
            state.execute(NativeCall::FramebufferTexture2D {
                target: glow::FRAMEBUFFER,
                attachment: attachment_point,
                texture_target,
                texture: texture.id,
                level: 0,
            });
            Ok::<_, FrameworkError>(())
        };

        if let Some(depth_attachment) = depth_attachment {
            let attachment_point = match depth_attachment.kind {
                AttachmentKind::Color => {
                    return Err(FrameworkError::Custom(
                        "color attachment passed as depth attachment".to_owned(),
                    ))
                }
                AttachmentKind::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
                AttachmentKind::Depth => glow::DEPTH_ATTACHMENT,
            };
            attach(attachment_point, depth_attachment)?;
        }

        let mut color_buffers = Vec::new();
        for (i, color_attachment) in color_attachments.iter().enumerate() {
            if color_attachment.kind != AttachmentKind::Color {
                return Err(FrameworkError::Custom(
                    "depth attachment passed as color attachment".to_owned(),
                ));
            }
            let attachment_point = glow::COLOR_ATTACHMENT0 + i as u32;
            attach(attachment_point, color_attachment)?;
            color_buffers.push(attachment_point);
        }

        if color_buffers.is_empty() {
            state.execute(NativeCall::DrawBuffers(vec![glow::NONE]));
            state.execute(NativeCall::ReadBuffer(glow::NONE));
        } else {
            state.execute(NativeCall::DrawBuffers(color_buffers));
        }

        Ok(())
    }

    pub fn id(&self) -> GlName {
        self.fbo
    }

    pub fn set_frame_size(&self, size: (u32, u32)) {
        self.frame_size.set(size);
    }
}

fn framebuffer_status_name(status: u32) -> String {
    match status {
        glow::FRAMEBUFFER_UNDEFINED => "GL_FRAMEBUFFER_UNDEFINED".to_owned(),
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => {
            "GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT".to_owned()
        }
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT".to_owned()
        }
        glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => {
            "GL_FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER".to_owned()
        }
        glow::FRAMEBUFFER_UNSUPPORTED => "GL_FRAMEBUFFER_UNSUPPORTED".to_owned(),
        glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => {
            "GL_FRAMEBUFFER_INCOMPLETE_MULTISAMPLE".to_owned()
        }
        _ => format!("{status:#x}"),
    }
}

impl RenderTarget for GlRenderTarget {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn color_attachments(&self) -> &[Attachment] {
        &self.color_attachments
    }

    fn depth_attachment(&self) -> Option<&Attachment> {
        self.depth_attachment.as_ref()
    }

    fn size(&self) -> (u32, u32) {
        if self.fbo == 0 {
            return self.frame_size.get();
        }
        self.color_attachments
            .first()
            .or(self.depth_attachment.as_ref())
            .map(|a| a.texture.size())
            .unwrap_or_default()
    }

    fn is_default(&self) -> bool {
        self.fbo == 0
    }
}

impl Drop for GlRenderTarget {
    fn drop(&mut self) {
        if self.fbo != 0 {
            if let Some(state) = self.state.upgrade() {
                state.forget_framebuffer(self.fbo);
                state.execute(NativeCall::DeleteFramebuffer(self.fbo));
            }
        }
    }
}
