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

//! Light sources of the deferred renderer.

use crate::{
    core::{
        algebra::{Matrix4, Vector3, Vector4},
        color::Color,
    },
    graphics::uniform::StaticUniformBuffer,
    renderer::settings::LightingSettings,
};
use shadow::ShadowMap;
use strum_macros::{AsRefStr, EnumIter};

pub mod shadow;

/// Size of the std140 `LightBlock` record, see [`Light::write_block`].
pub const LIGHT_BLOCK_SIZE: usize = 192;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, AsRefStr, EnumIter)]
pub enum LightKind {
    /// Infinitely distant light that shines in one direction, like the sun. The only kind that
    /// can cast shadows.
    Directional,
    /// Omnidirectional light with a limited radius of influence.
    Point,
    /// Constant light added to every lit pixel.
    Ambient,
}

impl LightKind {
    /// Identifier of the kind used by the light shader.
    pub fn shader_id(self) -> i32 {
        match self {
            LightKind::Directional => 0,
            LightKind::Point => 1,
            LightKind::Ambient => 2,
        }
    }

    /// Whether the light is drawn with a bounded proxy sphere instead of a full-screen triangle.
    pub fn has_volume(self) -> bool {
        self == LightKind::Point
    }
}

pub struct Light {
    kind: LightKind,
    color: Color,
    intensity: f32,
    position: Vector3<f32>,
    direction: Vector3<f32>,
    shadow_map: Option<ShadowMap>,
}

impl Light {
    pub(crate) fn new(kind: LightKind, shadow_map: Option<ShadowMap>) -> Self {
        Self {
            kind,
            color: Color::WHITE,
            intensity: 1.0,
            position: Vector3::default(),
            direction: -Vector3::y(),
            shadow_map,
        }
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) -> &mut Self {
        self.intensity = intensity.max(0.0);
        self
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) -> &mut Self {
        self.position = position;
        self
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Sets the direction the light shines in. Zero vectors are ignored.
    pub fn set_direction(&mut self, direction: Vector3<f32>) -> &mut Self {
        if let Some(direction) = direction.try_normalize(f32::EPSILON) {
            self.direction = direction;
        }
        self
    }

    pub fn casts_shadows(&self) -> bool {
        self.shadow_map.is_some()
    }

    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref()
    }

    pub(crate) fn shadow_map_mut(&mut self) -> Option<&mut ShadowMap> {
        self.shadow_map.as_mut()
    }

    pub(crate) fn set_shadow_map(&mut self, shadow_map: ShadowMap) {
        self.shadow_map = Some(shadow_map);
    }

    /// Linear color multiplied by intensity.
    pub fn radiance(&self) -> Vector3<f32> {
        self.color.as_frgb().scale(self.intensity)
    }

    /// Distance at which the brightest channel of the light falls below `cutoff`, given the
    /// `1 / (1 + d^2)` attenuation of the light shader.
    pub fn influence_radius(&self, cutoff: f32) -> f32 {
        let radiance = self.radiance().max();
        (radiance / cutoff.max(f32::EPSILON) - 1.0).max(0.0).sqrt()
    }

    /// Radius of the proxy sphere, slightly larger than the influence radius since the sphere
    /// mesh is a polygonal approximation.
    pub fn volume_radius(&self, cutoff: f32, scale: f32) -> f32 {
        self.influence_radius(cutoff) * scale
    }

    /// Model matrix of the proxy sphere of a point light.
    pub fn volume_matrix(&self, settings: &LightingSettings) -> Matrix4<f32> {
        let radius = self.volume_radius(settings.light_cutoff, settings.volume_scale);
        Matrix4::new_translation(&self.position) * Matrix4::new_scaling(radius)
    }

    /// Writes the std140 `LightBlock` of the light.
    pub(crate) fn write_block(
        &self,
        settings: &LightingSettings,
    ) -> StaticUniformBuffer<LIGHT_BLOCK_SIZE> {
        let radiance = self.radiance();
        let light_view_projection = self
            .shadow_map
            .as_ref()
            .map(|shadow_map| shadow_map.view_projection())
            .unwrap_or_else(Matrix4::identity);

        StaticUniformBuffer::new()
            .with(&self.volume_matrix(settings))
            .with(&Vector4::new(radiance.x, radiance.y, radiance.z, 1.0))
            .with(&Vector4::new(
                self.position.x,
                self.position.y,
                self.position.z,
                self.influence_radius(settings.light_cutoff),
            ))
            .with(&Vector4::new(
                self.direction.x,
                self.direction.y,
                self.direction.z,
                0.0,
            ))
            .with(&light_view_projection)
            .with(&self.kind.shader_id())
            .with(&(self.casts_shadows() as i32))
            .with(&settings.shadow_bias)
    }
}

/// Lambertian diffuse term of a directional light, the same thing the light shader computes for
/// every pixel. `light_direction` is the direction the light travels in.
pub fn lambert(
    albedo: Vector3<f32>,
    normal: Vector3<f32>,
    light_direction: Vector3<f32>,
    light_color: Vector3<f32>,
) -> Vector3<f32> {
    let n_dot_l = normal.dot(&-light_direction).max(0.0);
    albedo.component_mul(&light_color).scale(n_dot_l)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_radius_cutoff() {
        let settings = LightingSettings::default();
        let mut light = Light::new(LightKind::Point, None);
        light.set_intensity(1.0);
        assert_relative_eq!(
            light.volume_radius(settings.light_cutoff, settings.volume_scale),
            (1.0f32 / 0.01 - 1.0).sqrt() * 1.2,
            epsilon = 1.0e-4
        );

        light.set_intensity(10.0);
        let radius = light.influence_radius(0.01);
        light.set_intensity(20.0);
        let doubled = light.influence_radius(0.01);
        assert_relative_eq!(doubled / radius, 2.0f32.sqrt(), epsilon = 1.0e-3);

        // Too dark to reach the cutoff at all.
        light.set_intensity(0.001);
        assert_eq!(light.influence_radius(0.01), 0.0);
    }

    #[test]
    fn test_lambert() {
        let albedo = Vector3::new(1.0, 0.5, 0.25);
        let up = Vector3::y();
        let white = Vector3::repeat(1.0);

        assert_eq!(lambert(albedo, up, -Vector3::y(), white), albedo);
        assert_eq!(lambert(albedo, up, Vector3::y(), white), Vector3::zeros());
        assert_eq!(lambert(albedo, up, Vector3::x(), white), Vector3::zeros());

        let oblique = lambert(
            albedo,
            up,
            Vector3::new(1.0, -1.0, 0.0).normalize(),
            Vector3::new(2.0, 2.0, 2.0),
        );
        assert_relative_eq!(
            oblique,
            albedo.scale(2.0 * std::f32::consts::FRAC_1_SQRT_2),
            epsilon = 1.0e-5
        );
    }

    #[test]
    fn test_block_layout() {
        let settings = LightingSettings::default();
        let mut light = Light::new(LightKind::Point, None);
        light
            .set_color(Color::opaque(255, 0, 0))
            .set_intensity(2.0)
            .set_position(Vector3::new(1.0, 2.0, 3.0));
        let block = light.write_block(&settings);
        let bytes = block.bytes();
        assert_eq!(bytes.len(), LIGHT_BLOCK_SIZE - 4);

        let float_at = |i: usize| bytemuck::pod_read_unaligned::<f32>(&bytes[i * 4..i * 4 + 4]);
        let int_at = |i: usize| bytemuck::pod_read_unaligned::<i32>(&bytes[i * 4..i * 4 + 4]);
        // Color right after the volume matrix.
        assert_eq!(
            [float_at(16), float_at(17), float_at(18), float_at(19)],
            [2.0, 0.0, 0.0, 1.0]
        );
        assert_eq!([float_at(20), float_at(21), float_at(22)], [1.0, 2.0, 3.0]);
        assert_eq!([int_at(44), int_at(45)], [1, 0]);
    }

    #[test]
    fn test_direction_is_normalized() {
        let mut light = Light::new(LightKind::Directional, None);
        light.set_direction(Vector3::new(0.0, 0.0, -5.0));
        assert_eq!(light.direction(), -Vector3::z());
        light.set_direction(Vector3::zeros());
        assert_eq!(light.direction(), -Vector3::z());
    }
}
