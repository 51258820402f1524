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

//! Scene-side data: the camera the renderer draws from and imported models.

use crate::core::algebra::{Matrix4, Point3, Vector3};

pub mod model;

/// A camera described by its position and view/projection matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    position: Vector3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector3::default(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        }
    }
}

impl Camera {
    pub fn new(position: Vector3<f32>, view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        Self {
            position,
            view,
            projection,
        }
    }

    /// Right-handed perspective camera at `eye` looking at `target`.
    pub fn look_at(
        eye: Vector3<f32>,
        target: Vector3<f32>,
        up: Vector3<f32>,
        aspect: f32,
        fov_y: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Self {
            position: eye,
            view: Matrix4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up),
            projection: Matrix4::new_perspective(aspect.max(f32::EPSILON), fov_y, z_near, z_far),
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// Inverse of the view-projection matrix, identity if it is singular.
    pub fn inv_view_projection(&self) -> Matrix4<f32> {
        self.view_projection()
            .try_inverse()
            .unwrap_or_else(Matrix4::identity)
    }

    /// Point the shadow box of directional lights is centered at.
    pub fn focus_point(&self, distance: f32) -> Vector3<f32> {
        // Third row of the view matrix is the backward axis in world space.
        let backward = Vector3::new(self.view[(2, 0)], self.view[(2, 1)], self.view[(2, 2)]);
        self.position - backward.scale(distance)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_at() {
        let camera = Camera::look_at(
            Vector3::new(0.0, 0.0, 5.0),
            Vector3::zeros(),
            Vector3::y(),
            1.0,
            std::f32::consts::FRAC_PI_2,
            0.1,
            100.0,
        );
        let target = camera
            .view_projection()
            .transform_point(&Point3::origin());
        assert_relative_eq!(target.x, 0.0, epsilon = 1.0e-5);
        assert_relative_eq!(target.y, 0.0, epsilon = 1.0e-5);
        assert!(target.z > -1.0 && target.z < 1.0);

        assert_relative_eq!(camera.focus_point(5.0), Vector3::zeros(), epsilon = 1.0e-5);
    }
}
