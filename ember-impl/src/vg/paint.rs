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

//! Paints, scissors and their conversion into the `PaintBlock` uniform block.

use crate::{
    core::color::Color,
    graphics::{BlendFactor, BlendFunc},
    renderer::RendererError,
    vg::texture::{ImageFlags, TextureRegistry},
};
use bytemuck::{Pod, Zeroable};

/// Size of the std140 `PaintBlock`.
pub const PAINT_BLOCK_SIZE: usize = std::mem::size_of::<FragUniforms>();

pub const SHADER_GRADIENT: i32 = 0;
pub const SHADER_IMAGE: i32 = 1;
/// Writes nothing useful to the color buffer, used by passes that only touch the stencil.
pub const SHADER_STENCIL: i32 = 2;
pub const SHADER_TRIANGLES: i32 = 3;

/// 2x3 affine transform stored column-major as `[a, b, c, d, e, f]`, mapping a point to
/// `(a * x + c * y + e, b * x + d * y + f)`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Transform2D(pub [f32; 6]);

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    pub const fn identity() -> Self {
        Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    }

    pub const fn translate(x: f32, y: f32) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, x, y])
    }

    pub const fn scale(x: f32, y: f32) -> Self {
        Self([x, 0.0, 0.0, y, 0.0, 0.0])
    }

    pub fn rotate(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self([cos, sin, -sin, cos, 0.0, 0.0])
    }

    /// Appends `other`: the result applies `self` first and `other` after it.
    pub fn multiply(&mut self, other: &Transform2D) -> &mut Self {
        let t = &mut self.0;
        let s = &other.0;
        let t0 = t[0] * s[0] + t[1] * s[2];
        let t2 = t[2] * s[0] + t[3] * s[2];
        let t4 = t[4] * s[0] + t[5] * s[2] + s[4];
        t[1] = t[0] * s[1] + t[1] * s[3];
        t[3] = t[2] * s[1] + t[3] * s[3];
        t[5] = t[4] * s[1] + t[5] * s[3] + s[5];
        t[0] = t0;
        t[2] = t2;
        t[4] = t4;
        self
    }

    /// Inverse transform. Degenerate transforms produce the identity.
    pub fn inverse(&self) -> Transform2D {
        let t = self.0.map(|v| v as f64);
        let det = t[0] * t[3] - t[2] * t[1];
        if det.abs() < 1e-6 {
            return Self::identity();
        }
        let inv_det = 1.0 / det;
        Self(
            [
                t[3] * inv_det,
                -t[1] * inv_det,
                -t[2] * inv_det,
                t[0] * inv_det,
                (t[2] * t[5] - t[3] * t[4]) * inv_det,
                (t[1] * t[4] - t[0] * t[5]) * inv_det,
            ]
            .map(|v| v as f32),
        )
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let t = &self.0;
        (x * t[0] + y * t[2] + t[4], x * t[1] + y * t[3] + t[5])
    }

    /// Three std140 `vec4` columns of the equivalent 3x3 matrix.
    pub fn to_mat3x4(&self) -> [f32; 12] {
        let t = &self.0;
        [
            t[0], t[1], 0.0, 0.0, t[2], t[3], 0.0, 0.0, t[4], t[5], 1.0, 0.0,
        ]
    }
}

/// Gradient or image fill. Solid colors are gradients with equal end colors.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Paint {
    pub xform: Transform2D,
    pub extent: [f32; 2],
    pub radius: f32,
    pub feather: f32,
    pub inner_color: Color,
    pub outer_color: Color,
    /// Texture id, `0` for gradients.
    pub image: i32,
}

impl Paint {
    pub fn color(color: Color) -> Self {
        Self {
            xform: Transform2D::identity(),
            extent: [0.0; 2],
            radius: 0.0,
            feather: 1.0,
            inner_color: color,
            outer_color: color,
            image: 0,
        }
    }

    pub fn linear_gradient(
        start: (f32, f32),
        end: (f32, f32),
        inner_color: Color,
        outer_color: Color,
    ) -> Self {
        const LARGE: f32 = 1e5;
        let (mut dx, mut dy) = (end.0 - start.0, end.1 - start.1);
        let d = (dx * dx + dy * dy).sqrt();
        if d > 0.0001 {
            dx /= d;
            dy /= d;
        } else {
            dx = 0.0;
            dy = 1.0;
        }
        Self {
            xform: Transform2D([
                dy,
                -dx,
                dx,
                dy,
                start.0 - dx * LARGE,
                start.1 - dy * LARGE,
            ]),
            extent: [LARGE, LARGE + d * 0.5],
            radius: 0.0,
            feather: d.max(1.0),
            inner_color,
            outer_color,
            image: 0,
        }
    }

    pub fn radial_gradient(
        center: (f32, f32),
        inner_radius: f32,
        outer_radius: f32,
        inner_color: Color,
        outer_color: Color,
    ) -> Self {
        let r = (inner_radius + outer_radius) * 0.5;
        Self {
            xform: Transform2D::translate(center.0, center.1),
            extent: [r, r],
            radius: r,
            feather: (outer_radius - inner_radius).max(1.0),
            inner_color,
            outer_color,
            image: 0,
        }
    }

    /// Repeats the image with the top-left corner at `origin`, stretched to `size`.
    pub fn image_pattern(
        origin: (f32, f32),
        size: (f32, f32),
        angle: f32,
        image: i32,
        alpha: u8,
    ) -> Self {
        let mut xform = Transform2D::rotate(angle);
        xform.0[4] = origin.0;
        xform.0[5] = origin.1;
        let tint = Color::WHITE.with_new_alpha(alpha);
        Self {
            xform,
            extent: [size.0, size.1],
            radius: 0.0,
            feather: 0.0,
            inner_color: tint,
            outer_color: tint,
            image,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Scissor {
    pub xform: Transform2D,
    /// Half-size of the scissor rectangle. Negative extent disables scissoring.
    pub extent: [f32; 2],
}

impl Default for Scissor {
    fn default() -> Self {
        Self::none()
    }
}

impl Scissor {
    pub const fn none() -> Self {
        Self {
            xform: Transform2D::identity(),
            extent: [-1.0, -1.0],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.extent[0] >= -0.5 && self.extent[1] >= -0.5
    }
}

/// Contents of the `PaintBlock`, laid out exactly like the std140 block.
#[derive(Copy, Clone, PartialEq, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct FragUniforms {
    pub scissor_mat: [f32; 12],
    pub paint_mat: [f32; 12],
    pub inner_color: [f32; 4],
    pub outer_color: [f32; 4],
    pub scissor_ext: [f32; 2],
    pub scissor_scale: [f32; 2],
    pub extent: [f32; 2],
    pub radius: f32,
    pub feather: f32,
    pub stroke_mult: f32,
    pub stroke_thr: f32,
    pub tex_type: i32,
    pub kind: i32,
}

impl FragUniforms {
    /// Uniforms of a pass that only writes to the stencil buffer.
    pub fn stencil_only() -> Self {
        Self {
            stroke_thr: -1.0,
            kind: SHADER_STENCIL,
            ..Default::default()
        }
    }
}

/// Porter-Duff composite operations.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum CompositeOperation {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    Atop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
}

impl From<CompositeOperation> for BlendFunc {
    fn from(op: CompositeOperation) -> Self {
        use BlendFactor::*;
        let (src, dst) = match op {
            CompositeOperation::SourceOver => (One, OneMinusSrcAlpha),
            CompositeOperation::SourceIn => (DstAlpha, Zero),
            CompositeOperation::SourceOut => (OneMinusDstAlpha, Zero),
            CompositeOperation::Atop => (DstAlpha, OneMinusSrcAlpha),
            CompositeOperation::DestinationOver => (OneMinusDstAlpha, One),
            CompositeOperation::DestinationIn => (Zero, SrcAlpha),
            CompositeOperation::DestinationOut => (Zero, OneMinusSrcAlpha),
            CompositeOperation::DestinationAtop => (OneMinusDstAlpha, SrcAlpha),
            CompositeOperation::Lighter => (One, One),
            CompositeOperation::Copy => (One, Zero),
            CompositeOperation::Xor => (OneMinusDstAlpha, OneMinusSrcAlpha),
        };
        BlendFunc::new(src, dst)
    }
}

fn to_array(v: crate::core::algebra::Vector4<f32>) -> [f32; 4] {
    [v.x, v.y, v.z, v.w]
}

/// Builds the paint block of a draw. Fails if the paint references a texture that does not
/// exist.
pub fn convert_paint(
    paint: &Paint,
    scissor: &Scissor,
    width: f32,
    fringe: f32,
    stroke_thr: f32,
    textures: &TextureRegistry,
) -> Result<FragUniforms, RendererError> {
    let mut frag = FragUniforms {
        inner_color: to_array(paint.inner_color.premultiplied()),
        outer_color: to_array(paint.outer_color.premultiplied()),
        extent: paint.extent,
        stroke_mult: (width * 0.5 + fringe * 0.5) / fringe,
        stroke_thr,
        ..Default::default()
    };

    if scissor.is_enabled() {
        let x = &scissor.xform.0;
        frag.scissor_mat = scissor.xform.inverse().to_mat3x4();
        frag.scissor_ext = scissor.extent;
        frag.scissor_scale = [
            (x[0] * x[0] + x[2] * x[2]).sqrt() / fringe,
            (x[1] * x[1] + x[3] * x[3]).sqrt() / fringe,
        ];
    } else {
        frag.scissor_ext = [1.0, 1.0];
        frag.scissor_scale = [1.0, 1.0];
    }

    let inverse = if paint.image != 0 {
        let texture = textures.get(paint.image)?;
        frag.kind = SHADER_IMAGE;
        frag.tex_type = texture.shader_tex_type();
        if texture.flags.contains(ImageFlags::FLIP_Y) {
            let half_height = frag.extent[1] * 0.5;
            let mut xform = Transform2D::translate(0.0, -half_height);
            xform
                .multiply(&Transform2D::scale(1.0, -1.0))
                .multiply(&Transform2D::translate(0.0, half_height))
                .multiply(&paint.xform);
            xform.inverse()
        } else {
            paint.xform.inverse()
        }
    } else {
        frag.kind = SHADER_GRADIENT;
        frag.radius = paint.radius;
        frag.feather = paint.feather;
        paint.xform.inverse()
    };
    frag.paint_mat = inverse.to_mat3x4();

    Ok(frag)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        graphics::gl::server::GlGraphicsServer,
        vg::texture::VgTextureKind,
    };
    use approx::assert_relative_eq;

    #[test]
    fn test_block_size() {
        assert_eq!(PAINT_BLOCK_SIZE, 176);
    }

    #[test]
    fn test_transform_inverse() {
        let mut t = Transform2D::rotate(0.3);
        t.multiply(&Transform2D::scale(2.0, 3.0))
            .multiply(&Transform2D::translate(5.0, -1.0));
        let (x, y) = t.transform_point(1.5, 2.5);
        let (bx, by) = t.inverse().transform_point(x, y);
        assert_relative_eq!(bx, 1.5, epsilon = 1e-4);
        assert_relative_eq!(by, 2.5, epsilon = 1e-4);

        assert_eq!(
            Transform2D::scale(0.0, 1.0).inverse(),
            Transform2D::identity()
        );
    }

    #[test]
    fn test_multiply_order() {
        let mut t = Transform2D::scale(2.0, 2.0);
        t.multiply(&Transform2D::translate(1.0, 0.0));
        // Scaled first, then translated.
        assert_eq!(t.transform_point(1.0, 1.0), (3.0, 2.0));
    }

    #[test]
    fn test_convert_color_paint() {
        let textures = TextureRegistry::default();
        let scissor = Scissor {
            xform: Transform2D([3.0, 4.0, 0.0, 2.0, 10.0, 10.0]),
            extent: [5.0, 5.0],
        };
        let frag = convert_paint(
            &Paint::color(Color::from_rgba(255, 0, 0, 0)),
            &scissor,
            3.0,
            0.5,
            -1.0,
            &textures,
        )
        .unwrap();
        assert_eq!(frag.kind, SHADER_GRADIENT);
        assert_eq!(frag.inner_color, [0.0; 4]);
        assert_relative_eq!(frag.stroke_mult, (1.5 + 0.25) / 0.5);
        assert_relative_eq!(frag.scissor_scale[0], 6.0);
        assert_relative_eq!(frag.scissor_scale[1], (16.0f32 + 4.0).sqrt() / 0.5);
        assert_eq!(frag.scissor_ext, [5.0, 5.0]);
        assert_eq!(frag.stroke_thr, -1.0);

        let unscissored = convert_paint(
            &Paint::color(Color::WHITE),
            &Scissor::none(),
            1.0,
            1.0,
            -1.0,
            &textures,
        )
        .unwrap();
        assert_eq!(unscissored.scissor_mat, [0.0; 12]);
        assert_eq!(unscissored.scissor_ext, [1.0, 1.0]);
        assert_eq!(unscissored.inner_color, [1.0; 4]);
    }

    #[test]
    fn test_convert_image_paint() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let mut textures = TextureRegistry::default();
        let id = textures
            .create(
                &*server,
                VgTextureKind::Rgba,
                2,
                2,
                ImageFlags::FLIP_Y,
                None,
            )
            .unwrap();
        let paint = Paint::image_pattern((0.0, 0.0), (2.0, 4.0), 0.0, id, 255);
        let frag = convert_paint(&paint, &Scissor::none(), 1.0, 1.0, -1.0, &textures).unwrap();
        assert_eq!(frag.kind, SHADER_IMAGE);
        assert_eq!(frag.tex_type, 1);
        // The flipped paint maps the top edge to the bottom one.
        let m = frag.paint_mat;
        let flipped = Transform2D([m[0], m[1], m[4], m[5], m[8], m[9]]);
        assert_eq!(flipped.transform_point(0.0, 0.0), (0.0, 4.0));

        assert!(matches!(
            convert_paint(
                &Paint::image_pattern((0.0, 0.0), (1.0, 1.0), 0.0, 42, 255),
                &Scissor::none(),
                1.0,
                1.0,
                -1.0,
                &textures,
            ),
            Err(RendererError::TextureNotFound(42))
        ));
    }

    #[test]
    fn test_composite_operation() {
        assert_eq!(
            BlendFunc::from(CompositeOperation::SourceOver),
            BlendFunc::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha)
        );
        assert_eq!(
            BlendFunc::from(CompositeOperation::Copy),
            BlendFunc::new(BlendFactor::One, BlendFactor::Zero)
        );
    }
}
