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

//! GBuffer Layout:
//!
//! RT0: RGBA32F - World space position (xyz), coverage flag (w)
//! RT1: RGBA16F - World space normal (xyz)
//! RT2: RGBA8 - Albedo (xyz)
//! Depth: D24S8
//!
//! The buffer only ever grows, so it may be larger than the target it is used for. Shaders that
//! read it must scale `gl_FragCoord` by `1 / size` instead of the viewport size.

use crate::{
    core::info,
    graphics::{
        error::FrameworkError,
        gpu_texture::{GpuTexture, PixelKind},
        render_target::{Attachment, RenderTarget},
        server::GraphicsServer,
    },
};
use std::rc::Rc;

pub struct GBuffer {
    render_target: Rc<dyn RenderTarget>,
    width: u32,
    height: u32,
    generation: u64,
}

fn make_render_target(
    server: &dyn GraphicsServer,
    width: u32,
    height: u32,
) -> Result<Rc<dyn RenderTarget>, FrameworkError> {
    let depth_stencil = server.create_2d_render_target(PixelKind::D24S8, width, height)?;
    let position = server.create_2d_render_target(PixelKind::RGBA32F, width, height)?;
    let normal = server.create_2d_render_target(PixelKind::RGBA16F, width, height)?;
    let albedo = server.create_2d_render_target(PixelKind::RGBA8, width, height)?;

    server.create_render_target(
        Some(Attachment::depth_stencil(depth_stencil)),
        vec![
            Attachment::color(position),
            Attachment::color(normal),
            Attachment::color(albedo),
        ],
    )
}

impl GBuffer {
    pub fn new(
        server: &dyn GraphicsServer,
        width: u32,
        height: u32,
    ) -> Result<Self, FrameworkError> {
        let width = width.max(1);
        let height = height.max(1);
        Ok(Self {
            render_target: make_render_target(server, width, height)?,
            width,
            height,
            generation: 0,
        })
    }

    /// Makes sure the buffer covers at least `width x height` pixels. Never shrinks: each
    /// dimension becomes the maximum of the current and the requested one. Returns `true` if the
    /// attachments were reallocated, every texture obtained before that is stale then.
    pub fn ensure_size(
        &mut self,
        server: &dyn GraphicsServer,
        width: u32,
        height: u32,
    ) -> Result<bool, FrameworkError> {
        if width <= self.width && height <= self.height {
            return Ok(false);
        }

        let new_width = self.width.max(width);
        let new_height = self.height.max(height);
        self.render_target = make_render_target(server, new_width, new_height)?;

        info!(
            "G-buffer was reallocated: {}x{} -> {}x{}",
            self.width, self.height, new_width, new_height
        );

        self.width = new_width;
        self.height = new_height;
        self.generation += 1;

        Ok(true)
    }

    pub fn render_target(&self) -> &Rc<dyn RenderTarget> {
        &self.render_target
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Amount of reallocations happened so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn position_texture(&self) -> Rc<dyn GpuTexture> {
        self.render_target.color_attachments()[0].texture.clone()
    }

    pub fn normal_texture(&self) -> Rc<dyn GpuTexture> {
        self.render_target.color_attachments()[1].texture.clone()
    }

    pub fn albedo_texture(&self) -> Rc<dyn GpuTexture> {
        self.render_target.color_attachments()[2].texture.clone()
    }

    pub fn depth_texture(&self) -> Option<Rc<dyn GpuTexture>> {
        self.render_target
            .depth_attachment()
            .map(|attachment| attachment.texture.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::gl::server::GlGraphicsServer;

    #[test]
    fn test_growth_is_monotonic_and_idempotent() {
        let (server, _) = GlGraphicsServer::headless(100, 100).unwrap();
        let mut gbuffer = GBuffer::new(&*server, 100, 100).unwrap();
        let albedo = gbuffer.albedo_texture();

        assert!(!gbuffer.ensure_size(&*server, 100, 100).unwrap());
        assert!(!gbuffer.ensure_size(&*server, 50, 80).unwrap());
        assert_eq!(gbuffer.size(), (100, 100));
        assert_eq!(gbuffer.generation(), 0);
        assert!(Rc::ptr_eq(&albedo, &gbuffer.albedo_texture()));

        assert!(gbuffer.ensure_size(&*server, 120, 90).unwrap());
        assert_eq!(gbuffer.size(), (120, 100));
        assert_eq!(gbuffer.generation(), 1);
        assert!(!Rc::ptr_eq(&albedo, &gbuffer.albedo_texture()));
        assert_eq!(gbuffer.albedo_texture().size(), (120, 100));
        assert_eq!(gbuffer.render_target().size(), (120, 100));

        // Smaller again, nothing happens.
        assert!(!gbuffer.ensure_size(&*server, 10, 10).unwrap());
        assert_eq!(gbuffer.generation(), 1);
    }

    #[test]
    fn test_layout() {
        let (server, _) = GlGraphicsServer::headless(8, 8).unwrap();
        let gbuffer = GBuffer::new(&*server, 8, 4).unwrap();
        assert_eq!(gbuffer.position_texture().pixel_kind(), PixelKind::RGBA32F);
        assert_eq!(gbuffer.normal_texture().pixel_kind(), PixelKind::RGBA16F);
        assert_eq!(gbuffer.albedo_texture().pixel_kind(), PixelKind::RGBA8);
        assert_eq!(
            gbuffer.depth_texture().map(|t| t.pixel_kind()),
            Some(PixelKind::D24S8)
        );
    }
}
