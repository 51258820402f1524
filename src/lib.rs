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

//! Ember is a thin rendering engine: a graphics abstraction layer with a single OpenGL 3.3
//! backend, a deferred renderer with shadows, a model scene graph and a NanoVG-compatible vector
//! graphics backend.
//!
//! The engine does not own a window. The application creates a GL context, wraps it into a
//! [`graphics::gl::server::GlGraphicsServer`] and drives [`renderer::Renderer`] once per frame.

#![warn(missing_docs)]

pub use ember_core as core;
pub use ember_graphics as graphics;
pub use ember_impl::{renderer, scene, vg};

#[cfg(test)]
mod test {
    use crate::{
        core::{
            algebra::{Matrix4, Vector3},
            color::Color,
        },
        graphics::{gl::server::GlGraphicsServer, server::GraphicsServer},
        renderer::{
            light::LightKind, loader::EmbeddedFileLoader, settings::RendererSettings, Renderer,
        },
        scene::{
            model::{MaterialData, MeshData, Model, ModelData, ModelVertex, NodeData},
            Camera,
        },
        vg::{CompositeOperation, Paint, Scissor, VgPath, VgVertex},
    };

    fn plane() -> ModelData {
        let vertex = |x: f32, z: f32| ModelVertex {
            position: [x, 0.0, z],
            normal: [0.0, 1.0, 0.0],
            tex_coord: [x, z],
        };
        ModelData {
            vertices: vec![
                vertex(-1.0, -1.0),
                vertex(1.0, -1.0),
                vertex(1.0, 1.0),
                vertex(-1.0, 1.0),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
            meshes: vec![MeshData {
                material: 0,
                first_index: 0,
                index_count: 6,
                base_vertex: 0,
            }],
            materials: vec![MaterialData {
                base_color: Color::WHITE,
                albedo_texture: None,
            }],
            textures: Vec::new(),
            root: NodeData {
                name: "Plane".to_owned(),
                transform: Matrix4::identity(),
                meshes: vec![0],
                children: Vec::new(),
            },
        }
    }

    #[test]
    fn test_complete_frame() {
        let (server, _) = GlGraphicsServer::headless(64, 64).unwrap();
        let mut settings = RendererSettings::default();
        settings.lighting.shadow_map_size = 16;
        let mut renderer =
            Renderer::new(server.clone(), settings, &EmbeddedFileLoader, (64, 64)).unwrap();
        let model = Model::new(&*server, plane()).unwrap();

        renderer
            .lighting
            .add_light(&*server, LightKind::Directional, true)
            .unwrap();
        let lamp = renderer
            .lighting
            .add_light(&*server, LightKind::Point, false)
            .unwrap();
        renderer
            .lighting
            .light_mut(lamp)
            .unwrap()
            .set_position(Vector3::new(0.0, 1.0, 0.0))
            .set_color(Color::opaque(255, 200, 120));

        let camera = Camera::look_at(
            Vector3::new(0.0, 2.0, 4.0),
            Vector3::zeros(),
            Vector3::y(),
            1.0,
            1.0,
            0.1,
            50.0,
        );
        let identity = Matrix4::identity();

        let mut cmd = renderer.begin_frame();
        let shadow_casters = renderer
            .lighting
            .render_shadow_maps(&*server, &mut cmd, &camera, |cmd, pipeline| {
                model.render(cmd, pipeline, &identity).map(|_| ())
            })
            .unwrap();
        assert_eq!(shadow_casters, 1);

        renderer
            .lighting
            .begin_light_pass(&*server, &mut cmd, server.back_buffer(), &camera)
            .unwrap();
        let geometry = renderer.lighting.geometry_pipeline().clone();
        assert_eq!(model.render(&mut cmd, &geometry, &identity).unwrap(), 1);
        renderer.lighting.end_light_pass(&mut cmd).unwrap();

        renderer.vector.viewport(64.0, 64.0, 1.0);
        let rect = |x: f32, y: f32| VgVertex::new(x, y, 0.5, 1.0);
        renderer
            .vector
            .render_fill(
                &Paint::color(Color::GREEN),
                CompositeOperation::SourceOver,
                &Scissor::none(),
                1.0,
                [4.0, 4.0, 20.0, 12.0],
                &[VgPath {
                    fill: vec![rect(4.0, 4.0), rect(20.0, 4.0), rect(20.0, 12.0), rect(4.0, 12.0)],
                    stroke: vec![rect(4.0, 4.0), rect(20.0, 4.0), rect(20.0, 12.0)],
                    convex: true,
                }],
            )
            .unwrap();
        assert_eq!(renderer.vector.render_flush(&*server, &mut cmd).unwrap(), 2);

        // Shadow caster, geometry, two lights and the vector fill with its fringe.
        let statistics = renderer.end_frame(&mut cmd).unwrap();
        assert_eq!(statistics.draw_calls, 6);
        assert!(cmd.is_empty());
    }
}
