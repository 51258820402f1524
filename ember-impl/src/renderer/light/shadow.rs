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
    core::algebra::{Matrix4, Point3, Vector3},
    graphics::{
        error::FrameworkError,
        gpu_texture::{
            GpuTexture, GpuTextureDescriptor, GpuTextureKind, MagnificationFilter,
            MinificationFilter, PixelKind, WrapMode,
        },
        render_target::{Attachment, RenderTarget},
        server::GraphicsServer,
        CompareFunc,
    },
    renderer::settings::LightingSettings,
};
use std::rc::Rc;

/// Depth-only render target of a shadow casting directional light together with the
/// orthographic projection it was rendered with.
pub struct ShadowMap {
    render_target: Rc<dyn RenderTarget>,
    texture: Rc<dyn GpuTexture>,
    size: u32,
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
}

impl ShadowMap {
    pub fn new(server: &dyn GraphicsServer, size: u32) -> Result<Self, FrameworkError> {
        let size = size.max(1);
        let texture = server.create_texture(GpuTextureDescriptor {
            kind: GpuTextureKind::Rectangle {
                width: size,
                height: size,
            },
            pixel_kind: PixelKind::D32F,
            min_filter: MinificationFilter::Linear,
            mag_filter: MagnificationFilter::Linear,
            s_wrap_mode: WrapMode::ClampToEdge,
            t_wrap_mode: WrapMode::ClampToEdge,
            compare_mode: Some(CompareFunc::LessOrEqual),
            ..Default::default()
        })?;

        Ok(Self {
            render_target: server
                .create_render_target(Some(Attachment::depth(texture.clone())), Vec::new())?,
            texture,
            size,
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
        })
    }

    /// Recomputes the light matrices. The light looks along `direction` at `center` from half of
    /// the far plane distance away, so the box covers `center` in the middle of its depth range.
    pub fn update(
        &mut self,
        direction: &Vector3<f32>,
        center: &Vector3<f32>,
        settings: &LightingSettings,
    ) {
        let direction = direction
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::y());
        let up = if direction.y.abs() > 0.99 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let eye = center - direction.scale(settings.shadow_far * 0.5);

        self.view = Matrix4::look_at_rh(&Point3::from(eye), &Point3::from(*center), &up);
        let extent = settings.shadow_extent;
        self.projection = Matrix4::new_orthographic(
            -extent,
            extent,
            -extent,
            extent,
            settings.shadow_near,
            settings.shadow_far,
        );
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn render_target(&self) -> &Rc<dyn RenderTarget> {
        &self.render_target
    }

    pub fn texture(&self) -> &Rc<dyn GpuTexture> {
        &self.texture
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::gl::server::GlGraphicsServer;
    use approx::assert_relative_eq;

    #[test]
    fn test_light_space_projection() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let mut shadow_map = ShadowMap::new(&*server, 256).unwrap();
        assert_eq!(shadow_map.texture().size(), (256, 256));
        assert!(shadow_map.render_target().color_attachments().is_empty());

        let settings = LightingSettings::default();
        let center = Vector3::new(1.0, 0.0, 2.0);
        shadow_map.update(&Vector3::new(0.0, -2.0, 0.0), &center, &settings);

        let view_projection = shadow_map.view_projection();
        let center_ndc = view_projection.transform_point(&Point3::from(center));
        assert_relative_eq!(center_ndc.x, 0.0, epsilon = 1.0e-4);
        assert_relative_eq!(center_ndc.y, 0.0, epsilon = 1.0e-4);

        // Further along the light direction means deeper.
        let below = view_projection.transform_point(&Point3::new(1.0, -5.0, 2.0));
        assert!(below.z > center_ndc.z);

        // Points on the edge of the box land on the edge of the map.
        let side = view_projection
            .transform_point(&Point3::new(1.0 + settings.shadow_extent, 0.0, 2.0));
        assert_relative_eq!(side.x.abs(), 1.0, epsilon = 1.0e-4);
    }
}
