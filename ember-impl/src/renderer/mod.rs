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

//! Renderer is a "workhorse" of the engine: it owns the deferred lighting pipeline, the vector
//! graphics backend and the GPU profiler, and drives the graphics server once per frame.
//!
//! A typical frame:
//!
//! ```text
//! let mut cmd = renderer.begin_frame();
//! renderer.lighting.render_shadow_maps(..)?;
//! renderer.lighting.begin_light_pass(..)?;
//! model.render(&mut cmd, renderer.lighting.geometry_pipeline(), root)?;
//! renderer.lighting.end_light_pass(&mut cmd)?;
//! renderer.vector.render_flush(&*server, &mut cmd)?;
//! renderer.end_frame(&mut cmd)?;
//! ```

use crate::{
    core::pool::Handle,
    graphics::{
        command::CommandBuffer, error::FrameworkError, server::GraphicsServer,
        stats::DrawStatistics,
    },
    renderer::{
        light::Light,
        lighting::{LightPassState, LightingManager},
        loader::FileLoader,
        profiler::GpuProfiler,
        settings::RendererSettings,
    },
    vg::VectorRenderer,
};
use std::rc::Rc;

pub mod gbuffer;
pub mod light;
pub mod lighting;
pub mod loader;
pub mod primitives;
pub mod profiler;
pub mod settings;

/// Errors of the renderer layer.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// An error of the graphics server.
    #[error(transparent)]
    Framework(#[from] FrameworkError),
    /// The file loader returned nothing for a shader file.
    #[error("Unable to load shader source {0}")]
    ShaderSourceNotFound(String),
    #[error("Light handle {0} does not point to a living light")]
    InvalidLightHandle(Handle<Light>),
    #[error("Light {0} does not cast shadows")]
    NotShadowCaster(Handle<Light>),
    #[error("Light pass is in {actual:?} state, but {expected:?} was expected")]
    InvalidLightPassState {
        expected: LightPassState,
        actual: LightPassState,
    },
    /// An image paint or a texture operation referenced an unknown texture id.
    #[error("Texture {0} does not exist")]
    TextureNotFound(i32),
    #[error("Unsupported amount of texture channels: {0}")]
    UnsupportedChannelCount(u8),
    /// Imported model data references something out of range.
    #[error("Invalid model data: {0}")]
    InvalidModelData(String),
    #[error("Profiler scope {open} is still open, unable to begin {requested}")]
    ProfilerScopeAlreadyOpen { open: String, requested: String },
    #[error("There is no open profiler scope")]
    NoOpenProfilerScope,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    RonSerialize(#[from] ron::Error),
    #[error(transparent)]
    RonDeserialize(#[from] ron::error::SpannedError),
}

/// Owns every rendering subsystem and the graphics server they share.
pub struct Renderer {
    server: Rc<dyn GraphicsServer>,
    settings: RendererSettings,
    pub lighting: LightingManager,
    pub vector: VectorRenderer,
    pub profiler: GpuProfiler,
    statistics: DrawStatistics,
}

impl Renderer {
    pub fn new(
        server: Rc<dyn GraphicsServer>,
        settings: RendererSettings,
        loader: &dyn FileLoader,
        frame_size: (u32, u32),
    ) -> Result<Self, RendererError> {
        server.set_frame_size(frame_size);
        Ok(Self {
            lighting: LightingManager::new(
                &*server,
                loader,
                settings.lighting.clone(),
                frame_size,
            )?,
            vector: VectorRenderer::new(&*server, loader, settings.vector.clone())?,
            profiler: GpuProfiler::new(settings.profiler.enabled),
            server,
            settings,
            statistics: Default::default(),
        })
    }

    pub fn server(&self) -> &Rc<dyn GraphicsServer> {
        &self.server
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: RendererSettings) {
        self.lighting.set_settings(settings.lighting.clone());
        self.vector.set_settings(settings.vector.clone());
        self.profiler.set_enabled(settings.profiler.enabled);
        self.settings = settings;
    }

    pub fn set_frame_size(&mut self, new_size: (u32, u32)) {
        self.server.set_frame_size(new_size);
    }

    /// Statistics of the last finished frame.
    pub fn statistics(&self) -> DrawStatistics {
        self.statistics
    }

    pub fn begin_frame(&mut self) -> CommandBuffer {
        self.server.create_command_buffer()
    }

    /// Submits everything recorded during the frame, collects finished GPU timings and presents
    /// the back buffer.
    pub fn end_frame(&mut self, cmd: &mut CommandBuffer) -> Result<DrawStatistics, RendererError> {
        self.statistics = self.server.submit(cmd)?;
        self.profiler.poll();
        self.server.present_next_frame()?;
        Ok(self.statistics)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::algebra::Vector3,
        graphics::gl::server::GlGraphicsServer,
        renderer::{light::LightKind, loader::EmbeddedFileLoader},
        scene::Camera,
    };

    #[test]
    fn test_frame() {
        let (server, _) = GlGraphicsServer::headless(64, 64).unwrap();
        let server: Rc<dyn GraphicsServer> = server;
        let mut settings = RendererSettings::default();
        settings.profiler.enabled = true;
        settings.lighting.shadow_map_size = 16;
        let mut renderer =
            Renderer::new(server.clone(), settings, &EmbeddedFileLoader, (64, 64)).unwrap();
        renderer
            .lighting
            .add_light(&*server, LightKind::Ambient, false)
            .unwrap();

        let camera = Camera::look_at(
            Vector3::new(0.0, 0.0, 3.0),
            Vector3::zeros(),
            Vector3::y(),
            1.0,
            1.0,
            0.1,
            10.0,
        );

        let mut cmd = renderer.begin_frame();
        renderer
            .profiler
            .begin(&*server, &mut cmd, "Lighting")
            .unwrap();
        renderer
            .lighting
            .begin_light_pass(&*server, &mut cmd, server.back_buffer(), &camera)
            .unwrap();
        renderer.lighting.end_light_pass(&mut cmd).unwrap();
        renderer.profiler.end(&mut cmd).unwrap();

        let statistics = renderer.end_frame(&mut cmd).unwrap();
        assert_eq!(statistics.draw_calls, 1);
        assert_eq!(renderer.statistics(), statistics);
        assert!(renderer.profiler.result("Lighting").is_some());
    }

    #[test]
    fn test_unbalanced_frame_fails() {
        let (server, _) = GlGraphicsServer::headless(32, 32).unwrap();
        let mut renderer = Renderer::new(
            server.clone(),
            RendererSettings::default(),
            &EmbeddedFileLoader,
            (32, 32),
        )
        .unwrap();
        let mut cmd = renderer.begin_frame();
        cmd.push_render_target(server.back_buffer());
        assert!(renderer.end_frame(&mut cmd).is_err());

        // Only the unbalanced frame is lost.
        let mut cmd = renderer.begin_frame();
        assert!(renderer.end_frame(&mut cmd).is_ok());
        let mut cmd = renderer.begin_frame();
        cmd.push_render_target(server.back_buffer());
        cmd.pop_render_target();
        assert!(renderer.end_frame(&mut cmd).is_ok());
    }
}
