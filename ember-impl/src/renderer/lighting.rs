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

//! Deferred lighting. A frame goes through three stages:
//!
//! 1. [`LightingManager::begin_light_pass`] redirects rendering into the G-buffer and binds the
//!    geometry pipeline. The caller draws opaque geometry.
//! 2. [`LightingManager::end_light_pass`] restores the previous render target and accumulates
//!    every light over it by drawing a proxy: a sphere for point lights, a full-screen triangle
//!    for everything else. The depth of the G-buffer is copied back afterwards.
//! 3. Shadow maps are rendered separately with [`LightingManager::render_shadow_maps`] before the
//!    light pass starts.

use crate::{
    core::{
        algebra::{Vector2, Vector3},
        color::Color,
        info,
        math::Rect,
        pool::{Handle, Pool},
        warn,
    },
    graphics::{
        buffer::{Buffer, BufferKind, BufferUsage},
        command::{ClearValues, CommandBuffer},
        descriptor::{DescriptorSet, ParameterValue, Semantic},
        gpu_program::GpuProgram,
        gpu_texture::{GpuTexture, GpuTextureDescriptor, GpuTextureKind, PixelKind},
        pipeline::{PipelineDescriptor, PipelineState},
        render_target::RenderTarget,
        server::GraphicsServer,
        uniform::{AlignedUniformArray, StaticUniformBuffer},
        vertex_array::VertexArrayObject,
        BlendFactor, BlendFunc, BlendParameters, ColorMask, CompareFunc, CullFace,
        DrawParameters, PrimitiveTopology,
    },
    renderer::{
        gbuffer::GBuffer,
        light::{shadow::ShadowMap, Light, LightKind, LIGHT_BLOCK_SIZE},
        loader::{load_program, FileLoader},
        primitives,
        settings::LightingSettings,
        RendererError,
    },
    scene::Camera,
};
use std::rc::Rc;
use strum_macros::AsRefStr;

/// Size of the std140 `FrameBlock` shared by all lights of a frame.
pub const FRAME_BLOCK_SIZE: usize = 96;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, AsRefStr)]
pub enum LightPassState {
    Idle,
    GeometryPass,
    LightingPass,
}

pub struct LightingManager {
    lights: Pool<Light>,
    gbuffer: GBuffer,
    state: LightPassState,
    settings: LightingSettings,
    camera: Camera,
    target: Option<Rc<dyn RenderTarget>>,
    geometry_pipeline: Rc<PipelineState>,
    shadow_pipeline: Rc<PipelineState>,
    volume_pipeline: Rc<PipelineState>,
    fullscreen_pipeline: Rc<PipelineState>,
    sphere: Rc<dyn VertexArrayObject>,
    fullscreen_triangle: Rc<dyn VertexArrayObject>,
    // Bound instead of a real shadow map for lights without shadows, so the shadow sampler never
    // shares a texture unit with a sampler of another type.
    dummy_shadow_map: Rc<dyn GpuTexture>,
    light_data: AlignedUniformArray,
    light_buffer: Rc<dyn Buffer>,
    light_order: Vec<Handle<Light>>,
}

fn light_pipeline(
    server: &dyn GraphicsServer,
    program: Rc<dyn GpuProgram>,
    cull_face: Option<CullFace>,
) -> Result<Rc<PipelineState>, RendererError> {
    Ok(server.create_pipeline_state(PipelineDescriptor {
        program,
        parameters: DrawParameters {
            cull_face,
            color_write: ColorMask::all(true),
            depth_write: false,
            depth_test: None,
            blend: Some(BlendParameters {
                func: BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::One),
                ..Default::default()
            }),
            ..Default::default()
        },
        topology: PrimitiveTopology::Triangles,
    })?)
}

impl LightingManager {
    pub fn new(
        server: &dyn GraphicsServer,
        loader: &dyn FileLoader,
        settings: LightingSettings,
        frame_size: (u32, u32),
    ) -> Result<Self, RendererError> {
        let geometry_pipeline = server.create_pipeline_state(PipelineDescriptor {
            program: load_program(server, loader, "gbuffer")?,
            parameters: DrawParameters {
                cull_face: Some(CullFace::Back),
                color_write: ColorMask::all(true),
                depth_write: true,
                depth_test: Some(CompareFunc::Less),
                ..Default::default()
            },
            topology: PrimitiveTopology::Triangles,
        })?;

        let shadow_pipeline = server.create_pipeline_state(PipelineDescriptor {
            program: load_program(server, loader, "shadow")?,
            parameters: DrawParameters {
                cull_face: Some(CullFace::Back),
                color_write: ColorMask::all(false),
                depth_write: true,
                depth_test: Some(CompareFunc::Less),
                ..Default::default()
            },
            topology: PrimitiveTopology::Triangles,
        })?;

        let light_program = load_program(server, loader, "light")?;
        // Front faces are culled so the volume stays visible when the camera is inside it.
        let volume_pipeline = light_pipeline(server, light_program.clone(), Some(CullFace::Front))?;
        let fullscreen_pipeline = light_pipeline(server, light_program, None)?;

        let dummy_shadow_map = server.create_texture(GpuTextureDescriptor {
            kind: GpuTextureKind::Rectangle {
                width: 1,
                height: 1,
            },
            pixel_kind: PixelKind::D32F,
            compare_mode: Some(CompareFunc::LessOrEqual),
            data: Some(bytemuck::bytes_of(&1.0f32)),
            ..Default::default()
        })?;

        let alignment = server.limits().uniform_buffer_offset_alignment;

        Ok(Self {
            lights: Pool::new(),
            gbuffer: GBuffer::new(server, frame_size.0, frame_size.1)?,
            state: LightPassState::Idle,
            settings,
            camera: Camera::default(),
            target: None,
            geometry_pipeline,
            shadow_pipeline,
            volume_pipeline,
            fullscreen_pipeline,
            sphere: primitives::create_sphere(server, 16, 8)?,
            fullscreen_triangle: primitives::create_fullscreen_triangle(server)?,
            dummy_shadow_map,
            light_data: AlignedUniformArray::new(alignment, FRAME_BLOCK_SIZE, LIGHT_BLOCK_SIZE),
            light_buffer: server.create_buffer(0, BufferKind::Uniform, BufferUsage::DynamicDraw)?,
            light_order: Vec::new(),
        })
    }

    /// Creates a new light. Only directional lights can cast shadows, the flag is ignored for
    /// other kinds.
    pub fn add_light(
        &mut self,
        server: &dyn GraphicsServer,
        kind: LightKind,
        shadows: bool,
    ) -> Result<Handle<Light>, RendererError> {
        let shadow_map = if shadows {
            if kind == LightKind::Directional {
                Some(ShadowMap::new(server, self.settings.shadow_map_size)?)
            } else {
                warn!(
                    "{} lights cannot cast shadows, the light was created without them.",
                    kind.as_ref()
                );
                None
            }
        } else {
            None
        };

        Ok(self.lights.spawn(Light::new(kind, shadow_map)))
    }

    pub fn remove_light(&mut self, handle: Handle<Light>) -> Result<Light, RendererError> {
        let light = self
            .lights
            .try_free(handle)
            .ok_or(RendererError::InvalidLightHandle(handle))?;
        info!("{} light {handle} was removed.", light.kind().as_ref());
        Ok(light)
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
        self.light_order.clear();
    }

    pub fn light(&self, handle: Handle<Light>) -> Result<&Light, RendererError> {
        self.lights
            .try_borrow(handle)
            .ok_or(RendererError::InvalidLightHandle(handle))
    }

    pub fn light_mut(&mut self, handle: Handle<Light>) -> Result<&mut Light, RendererError> {
        self.lights
            .try_borrow_mut(handle)
            .ok_or(RendererError::InvalidLightHandle(handle))
    }

    pub fn light_count(&self) -> usize {
        self.lights.alive_count()
    }

    pub fn lights(&self) -> impl Iterator<Item = (Handle<Light>, &Light)> {
        self.lights.pair_iter()
    }

    pub fn state(&self) -> LightPassState {
        self.state
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// Pipeline of the geometry pass, the one bound by [`Self::begin_light_pass`].
    pub fn geometry_pipeline(&self) -> &Rc<PipelineState> {
        &self.geometry_pipeline
    }

    pub fn settings(&self) -> &LightingSettings {
        &self.settings
    }

    /// Applies new settings. Shadow maps of a different size are recreated on the next shadow
    /// pass.
    pub fn set_settings(&mut self, settings: LightingSettings) {
        self.settings = settings;
    }

    fn check_state(&self, expected: LightPassState) -> Result<(), RendererError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RendererError::InvalidLightPassState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Starts the geometry pass. `target` must be the render target that is active at the
    /// moment of the call: it receives the lit image in [`Self::end_light_pass`].
    pub fn begin_light_pass(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
        target: Rc<dyn RenderTarget>,
        camera: &Camera,
    ) -> Result<(), RendererError> {
        self.check_state(LightPassState::Idle)?;

        let (width, height) = target.size();
        self.gbuffer.ensure_size(server, width, height)?;

        cmd.push_render_target(self.gbuffer.render_target().clone());
        cmd.set_viewport(Rect::new(
            0,
            0,
            width.max(1) as i32,
            height.max(1) as i32,
        ));
        cmd.clear(ClearValues {
            color: Some(Color::TRANSPARENT),
            depth: Some(1.0),
            stencil: Some(0),
        });

        cmd.bind_pipeline(self.geometry_pipeline.clone());
        cmd.bind_descriptor_set(
            0,
            Rc::new(DescriptorSet::new().with(
                Semantic::ViewProjectionMatrix,
                ParameterValue::Matrix4(camera.view_projection()),
            )),
        )?;

        self.camera = camera.clone();
        self.target = Some(target);
        self.state = LightPassState::GeometryPass;

        Ok(())
    }

    /// Writes the frame block and a light block for every light into one uniform buffer.
    /// Returns the handles of the lights in the order of their blocks.
    pub fn update_light_data(&mut self) -> Result<&[Handle<Light>], RendererError> {
        let (width, height) = self.gbuffer.size();
        let frame_block = StaticUniformBuffer::<FRAME_BLOCK_SIZE>::new()
            .with(&self.camera.view_projection())
            .with(&self.camera.position())
            .with(&Vector2::new(1.0 / width as f32, 1.0 / height as f32))
            .finish();

        self.light_data.clear();
        self.light_data.set_header(&frame_block)?;
        self.light_order.clear();
        for (handle, light) in self.lights.pair_iter() {
            self.light_data
                .push(light.write_block(&self.settings).bytes())?;
            self.light_order.push(handle);
        }

        self.light_buffer.write_data(self.light_data.bytes())?;

        Ok(&self.light_order)
    }

    /// Finishes the geometry pass and accumulates all lights over the render target that was
    /// active before [`Self::begin_light_pass`].
    pub fn end_light_pass(&mut self, cmd: &mut CommandBuffer) -> Result<(), RendererError> {
        self.check_state(LightPassState::GeometryPass)?;
        self.state = LightPassState::LightingPass;

        let result = self.accumulate_lights(cmd);

        self.state = LightPassState::Idle;
        self.target = None;

        result
    }

    fn accumulate_lights(&mut self, cmd: &mut CommandBuffer) -> Result<(), RendererError> {
        cmd.pop_render_target();
        cmd.clear(ClearValues {
            color: Some(Color::BLACK),
            depth: Some(1.0),
            stencil: None,
        });

        self.update_light_data()?;

        let frame_set = Rc::new(
            DescriptorSet::new()
                .with(
                    Semantic::FrameBlock,
                    ParameterValue::UniformBlock {
                        buffer: self.light_buffer.clone(),
                        offset: 0,
                        size: FRAME_BLOCK_SIZE,
                    },
                )
                .with(
                    Semantic::PositionTexture,
                    ParameterValue::Texture(self.gbuffer.position_texture()),
                )
                .with(
                    Semantic::NormalTexture,
                    ParameterValue::Texture(self.gbuffer.normal_texture()),
                )
                .with(
                    Semantic::AlbedoTexture,
                    ParameterValue::Texture(self.gbuffer.albedo_texture()),
                ),
        );
        cmd.bind_descriptor_set(0, frame_set)?;

        for (index, handle) in self.light_order.iter().enumerate() {
            let Some(light) = self.lights.try_borrow(*handle) else {
                continue;
            };

            let shadow_map = light
                .shadow_map()
                .map(|shadow_map| shadow_map.texture().clone())
                .unwrap_or_else(|| self.dummy_shadow_map.clone());
            let light_set = DescriptorSet::new()
                .with(
                    Semantic::LightBlock,
                    ParameterValue::UniformBlock {
                        buffer: self.light_buffer.clone(),
                        offset: self.light_data.offset(index),
                        size: LIGHT_BLOCK_SIZE,
                    },
                )
                .with(Semantic::ShadowMap, ParameterValue::Texture(shadow_map));
            cmd.bind_descriptor_set(1, Rc::new(light_set))?;

            if light.kind().has_volume() {
                cmd.bind_pipeline(self.volume_pipeline.clone());
                cmd.bind_vertex_array_object(self.sphere.clone());
                cmd.draw_indexed(0, self.sphere.index_count(), 0)?;
            } else {
                cmd.bind_pipeline(self.fullscreen_pipeline.clone());
                cmd.bind_vertex_array_object(self.fullscreen_triangle.clone());
                cmd.draw(0, 3)?;
            }
        }

        cmd.unbind_descriptor_set(1);

        if let Some(target) = self.target.as_ref() {
            if target.has_depth() {
                cmd.blit_depth(self.gbuffer.render_target().clone(), target.clone());
            }
        }

        Ok(())
    }

    /// Renders the shadow maps of every shadow casting light. `draw` must issue the draw calls
    /// of all shadow casters; it gets the depth-only pipeline to draw with, the light matrix is
    /// already bound to descriptor slot 0.
    pub fn render_shadow_maps<F>(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
        camera: &Camera,
        mut draw: F,
    ) -> Result<usize, RendererError>
    where
        F: FnMut(&mut CommandBuffer, &Rc<PipelineState>) -> Result<(), RendererError>,
    {
        self.check_state(LightPassState::Idle)?;

        let center = camera.focus_point(self.settings.shadow_extent * 0.5);
        let mut count = 0;
        for light in self.lights.iter_mut() {
            if light.casts_shadows() {
                render_light_shadow(
                    server,
                    cmd,
                    light,
                    &self.shadow_pipeline,
                    &self.settings,
                    &center,
                    &mut draw,
                )?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Renders the shadow map of a single light.
    pub fn render_shadow_map<F>(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
        handle: Handle<Light>,
        camera: &Camera,
        mut draw: F,
    ) -> Result<(), RendererError>
    where
        F: FnMut(&mut CommandBuffer, &Rc<PipelineState>) -> Result<(), RendererError>,
    {
        self.check_state(LightPassState::Idle)?;

        let center = camera.focus_point(self.settings.shadow_extent * 0.5);
        let light = self
            .lights
            .try_borrow_mut(handle)
            .ok_or(RendererError::InvalidLightHandle(handle))?;
        if !light.casts_shadows() {
            return Err(RendererError::NotShadowCaster(handle));
        }
        render_light_shadow(
            server,
            cmd,
            light,
            &self.shadow_pipeline,
            &self.settings,
            &center,
            &mut draw,
        )
    }
}

fn render_light_shadow<F>(
    server: &dyn GraphicsServer,
    cmd: &mut CommandBuffer,
    light: &mut Light,
    pipeline: &Rc<PipelineState>,
    settings: &LightingSettings,
    center: &Vector3<f32>,
    draw: &mut F,
) -> Result<(), RendererError>
where
    F: FnMut(&mut CommandBuffer, &Rc<PipelineState>) -> Result<(), RendererError>,
{
    let direction = light.direction();

    let needs_resize = light
        .shadow_map()
        .is_some_and(|shadow_map| shadow_map.size() != settings.shadow_map_size.max(1));
    if needs_resize {
        light.set_shadow_map(ShadowMap::new(server, settings.shadow_map_size)?);
    }

    let Some(shadow_map) = light.shadow_map_mut() else {
        return Ok(());
    };
    shadow_map.update(&direction, center, settings);

    cmd.push_render_target(shadow_map.render_target().clone());
    cmd.clear(ClearValues {
        depth: Some(1.0),
        ..Default::default()
    });
    cmd.bind_pipeline(pipeline.clone());
    cmd.bind_descriptor_set(
        0,
        Rc::new(DescriptorSet::new().with(
            Semantic::ViewProjectionMatrix,
            ParameterValue::Matrix4(shadow_map.view_projection()),
        )),
    )?;

    let result = draw(cmd, pipeline);
    cmd.pop_render_target();
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        graphics::gl::{native::NativeCall, recorder::CallRecorder, server::GlGraphicsServer},
        graphics::{command::Command, render_target::Attachment},
        renderer::loader::EmbeddedFileLoader,
    };

    fn manager(
        width: u32,
        height: u32,
    ) -> (Rc<GlGraphicsServer>, Rc<CallRecorder>, LightingManager) {
        let (server, recorder) = GlGraphicsServer::headless(width, height).unwrap();
        let manager = LightingManager::new(
            &*server,
            &EmbeddedFileLoader,
            LightingSettings {
                shadow_map_size: 64,
                ..Default::default()
            },
            (width, height),
        )
        .unwrap();
        (server, recorder, manager)
    }

    fn camera() -> Camera {
        Camera::look_at(
            Vector3::new(0.0, 5.0, 5.0),
            Vector3::zeros(),
            Vector3::y(),
            4.0 / 3.0,
            1.0,
            0.1,
            100.0,
        )
    }

    fn draws(recorder: &CallRecorder) -> (usize, usize) {
        let arrays = recorder.count(|c| matches!(c, NativeCall::DrawArrays { .. }));
        let elements = recorder.count(|c| matches!(c, NativeCall::DrawElements { .. }));
        (arrays, elements)
    }

    #[test]
    fn test_full_frame() {
        let (server, recorder, mut manager) = manager(320, 240);
        let sun = manager
            .add_light(&*server, LightKind::Directional, false)
            .unwrap();
        manager
            .light_mut(sun)
            .unwrap()
            .set_direction(Vector3::new(0.0, -1.0, -1.0));
        let lamp = manager.add_light(&*server, LightKind::Point, false).unwrap();
        manager
            .light_mut(lamp)
            .unwrap()
            .set_position(Vector3::new(1.0, 1.0, 0.0))
            .set_intensity(4.0);

        recorder.clear();
        let mut cmd = server.create_command_buffer();
        manager
            .begin_light_pass(&*server, &mut cmd, server.back_buffer(), &camera())
            .unwrap();
        assert_eq!(manager.state(), LightPassState::GeometryPass);
        manager.end_light_pass(&mut cmd).unwrap();
        assert_eq!(manager.state(), LightPassState::Idle);
        assert_eq!(cmd.draw_count(), 2);

        let stats = server.submit(&mut cmd).unwrap();
        assert_eq!(stats.draw_calls, 2);
        // One full-screen triangle and one sphere.
        assert_eq!(draws(&recorder), (1, 1));
        assert_eq!(
            recorder.count(|c| matches!(c, NativeCall::BlitFramebuffer { .. })),
            1
        );
        // All light data goes to the GPU in a single upload.
        assert_eq!(
            recorder.count(|c| matches!(
                c,
                NativeCall::BufferData { .. } | NativeCall::BufferSubData { .. }
            )),
            1
        );
    }

    #[test]
    fn test_light_data_layout() {
        let (server, _, mut manager) = manager(100, 50);
        manager.add_light(&*server, LightKind::Ambient, false).unwrap();
        manager.add_light(&*server, LightKind::Point, false).unwrap();

        let mut cmd = server.create_command_buffer();
        manager
            .begin_light_pass(&*server, &mut cmd, server.back_buffer(), &camera())
            .unwrap();
        assert_eq!(manager.update_light_data().unwrap().len(), 2);

        let bytes = manager.light_data.bytes();
        let read = |offset: usize| bytemuck::pod_read_unaligned::<f32>(&bytes[offset..offset + 4]);
        // fragCoordScale follows the camera position.
        assert_eq!(read(80), 1.0 / 100.0);
        assert_eq!(read(84), 1.0 / 50.0);
        assert_eq!(
            manager.light_data.offset(1) - manager.light_data.offset(0),
            manager.light_data.stride()
        );
    }

    #[test]
    fn test_pass_state_is_checked() {
        let (server, _, mut manager) = manager(64, 64);
        let mut cmd = server.create_command_buffer();
        assert!(matches!(
            manager.end_light_pass(&mut cmd),
            Err(RendererError::InvalidLightPassState {
                expected: LightPassState::GeometryPass,
                actual: LightPassState::Idle
            })
        ));
        manager
            .begin_light_pass(&*server, &mut cmd, server.back_buffer(), &camera())
            .unwrap();
        assert!(matches!(
            manager.begin_light_pass(&*server, &mut cmd, server.back_buffer(), &camera()),
            Err(RendererError::InvalidLightPassState { .. })
        ));
        assert!(manager
            .render_shadow_maps(&*server, &mut cmd, &camera(), |_, _| Ok(()))
            .is_err());
        manager.end_light_pass(&mut cmd).unwrap();
        assert!(server.submit(&mut cmd).is_ok());
    }

    #[test]
    fn test_gbuffer_grows_with_target() {
        let (server, _, mut manager) = manager(64, 64);
        let target = server
            .create_render_target(
                None,
                vec![Attachment::color(
                    server
                        .create_2d_render_target(PixelKind::RGBA8, 128, 32)
                        .unwrap(),
                )],
            )
            .unwrap();
        let mut cmd = server.create_command_buffer();
        manager
            .begin_light_pass(&*server, &mut cmd, target, &camera())
            .unwrap();
        manager.end_light_pass(&mut cmd).unwrap();
        assert_eq!(manager.gbuffer().size(), (128, 64));
        assert_eq!(manager.gbuffer().generation(), 1);
        // The target has no depth buffer, nothing to blit into.
        assert!(!cmd
            .commands()
            .iter()
            .any(|c| matches!(c, Command::BlitDepth { .. })));
    }

    #[test]
    fn test_shadows() {
        let (server, recorder, mut manager) = manager(64, 64);
        let sun = manager
            .add_light(&*server, LightKind::Directional, true)
            .unwrap();
        let lamp = manager.add_light(&*server, LightKind::Point, true).unwrap();
        assert!(manager.light(sun).unwrap().casts_shadows());
        assert!(!manager.light(lamp).unwrap().casts_shadows());

        let mut cmd = server.create_command_buffer();
        assert!(matches!(
            manager.render_shadow_map(&*server, &mut cmd, lamp, &camera(), |_, _| Ok(())),
            Err(RendererError::NotShadowCaster(handle)) if handle == lamp
        ));

        let mut calls = 0;
        let rendered = manager
            .render_shadow_maps(&*server, &mut cmd, &camera(), |cmd, pipeline| {
                calls += 1;
                assert!(!pipeline.parameters().color_write.red);
                assert!(matches!(
                    cmd.commands().last(),
                    Some(Command::Clear(_))
                ));
                Ok(())
            })
            .unwrap();
        assert_eq!((rendered, calls), (1, 1));

        // A new size in the settings recreates the map on the next pass.
        manager.set_settings(LightingSettings {
            shadow_map_size: 32,
            ..Default::default()
        });
        manager
            .render_shadow_map(&*server, &mut cmd, sun, &camera(), |_, _| Ok(()))
            .unwrap();
        assert_eq!(
            manager
                .light(sun)
                .unwrap()
                .shadow_map()
                .map(|shadow_map| shadow_map.size()),
            Some(32)
        );

        recorder.clear();
        server.submit(&mut cmd).unwrap();
        let depth_clears =
            recorder.count(|c| matches!(c, NativeCall::Clear(mask) if *mask == glow::DEPTH_BUFFER_BIT));
        assert_eq!(depth_clears, 2);
    }

    #[test]
    fn test_removed_light_is_invalid() {
        let (server, _, mut manager) = manager(64, 64);
        let light = manager.add_light(&*server, LightKind::Point, false).unwrap();
        assert_eq!(manager.light_count(), 1);
        manager.remove_light(light).unwrap();
        assert!(matches!(
            manager.light(light),
            Err(RendererError::InvalidLightHandle(_))
        ));
        assert!(manager.remove_light(light).is_err());

        manager.add_light(&*server, LightKind::Ambient, false).unwrap();
        manager.clear_lights();
        assert_eq!(manager.light_count(), 0);
    }
}
