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
    buffer::{Buffer, BufferKind, BufferUsage},
    command::{CommandBuffer, MAX_PUSH_CONSTANTS_SIZE},
    core::info,
    error::FrameworkError,
    gl::{
        buffer::GlBuffer,
        executor::{self, PushedRenderTarget},
        native::{NativeApi, NativeCall},
        program::GlProgram,
        query::GlQuery,
        recorder::CallRecorder,
        render_target::GlRenderTarget,
        state::StateTracker,
        texture::GlTexture,
        vertex_array::GlVertexArray,
    },
    gpu_program::GpuProgram,
    gpu_texture::{GpuTexture, GpuTextureDescriptor},
    pipeline::{PipelineDescriptor, PipelineState},
    query::Query,
    render_target::{Attachment, RenderTarget},
    server::{GraphicsServer, ServerCapabilities},
    stats::{DrawStatistics, PipelineStatistics},
    vertex_array::{VertexArrayDescriptor, VertexArrayObject},
    CompareFunc,
};
use std::{any::Any, cell::RefCell, rc::Rc};

/// Swaps the window surface buffers. Provided by the windowing layer.
pub type Presenter = Box<dyn FnMut() -> Result<(), FrameworkError>>;

pub struct GlGraphicsServer {
    pub(crate) state: Rc<StateTracker>,
    back_buffer: Rc<GlRenderTarget>,
    pub(crate) render_target_stack: RefCell<Vec<PushedRenderTarget>>,
    pub(crate) push_constants_buffer: GlBuffer,
    capabilities: ServerCapabilities,
    presenter: RefCell<Option<Presenter>>,
}

impl GlGraphicsServer {
    /// Creates a server on top of a context that is already current on the calling thread.
    pub fn new(api: Rc<dyn NativeApi>, frame_size: (u32, u32)) -> Result<Rc<Self>, FrameworkError> {
        let capabilities = ServerCapabilities {
            max_uniform_block_size: api.get_parameter_i32(glow::MAX_UNIFORM_BLOCK_SIZE).max(0)
                as usize,
            uniform_buffer_offset_alignment: api
                .get_parameter_i32(glow::UNIFORM_BUFFER_OFFSET_ALIGNMENT)
                .max(1) as usize,
            max_texture_size: api.get_parameter_i32(glow::MAX_TEXTURE_SIZE).max(0) as usize,
            max_color_attachments: api.get_parameter_i32(glow::MAX_COLOR_ATTACHMENTS).max(0)
                as usize,
        };

        let state = Rc::new(StateTracker::new(api));

        // The context starts with the default framebuffer bound.
        state.set_framebuffer(0);
        state.set_depth_func(CompareFunc::default());
        state.execute(NativeCall::Enable(glow::TEXTURE_CUBE_MAP_SEAMLESS));

        let push_constants_buffer = GlBuffer::new(
            &state,
            MAX_PUSH_CONSTANTS_SIZE,
            BufferKind::Uniform,
            BufferUsage::StreamDraw,
        )?;

        info!(
            "Graphics server initialized. Frame size: {}x{}, {:?}",
            frame_size.0, frame_size.1, capabilities
        );

        Ok(Rc::new(Self {
            back_buffer: Rc::new(GlRenderTarget::backbuffer(&state, frame_size)),
            state,
            render_target_stack: Default::default(),
            push_constants_buffer,
            capabilities,
            presenter: Default::default(),
        }))
    }

    /// Creates a server that records native calls instead of talking to a driver. The recorder is
    /// returned alongside for inspection.
    pub fn headless(
        width: u32,
        height: u32,
    ) -> Result<(Rc<Self>, Rc<CallRecorder>), FrameworkError> {
        let recorder = Rc::new(CallRecorder::new());
        let server = Self::new(recorder.clone(), (width, height))?;
        Ok((server, recorder))
    }

    pub fn set_presenter(&self, presenter: Presenter) {
        *self.presenter.borrow_mut() = Some(presenter);
    }

    pub fn state(&self) -> &Rc<StateTracker> {
        &self.state
    }

    /// The render target draws currently go to.
    pub fn current_render_target(&self) -> Rc<dyn RenderTarget> {
        self.render_target_stack
            .borrow()
            .last()
            .map(|pushed| pushed.target.clone())
            .unwrap_or_else(|| self.back_buffer.clone())
    }

    /// Drops every pushed render target and binds the back buffer with its full viewport.
    pub(crate) fn reset_render_target_stack(&self) {
        self.render_target_stack.borrow_mut().clear();
        self.state.reset_framebuffer_stack(self.back_buffer.id());
        self.state
            .set_viewport(executor::full_viewport(&*self.back_buffer));
    }
}

impl GraphicsServer for GlGraphicsServer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn create_buffer(
        &self,
        size: usize,
        buffer_kind: BufferKind,
        buffer_usage: BufferUsage,
    ) -> Result<Rc<dyn Buffer>, FrameworkError> {
        Ok(Rc::new(GlBuffer::new(
            &self.state,
            size,
            buffer_kind,
            buffer_usage,
        )?))
    }

    fn create_texture(
        &self,
        desc: GpuTextureDescriptor,
    ) -> Result<Rc<dyn GpuTexture>, FrameworkError> {
        Ok(Rc::new(GlTexture::new(&self.state, desc)?))
    }

    fn create_render_target(
        &self,
        depth_attachment: Option<Attachment>,
        color_attachments: Vec<Attachment>,
    ) -> Result<Rc<dyn RenderTarget>, FrameworkError> {
        Ok(Rc::new(GlRenderTarget::new(
            &self.state,
            depth_attachment,
            color_attachments,
        )?))
    }

    fn back_buffer(&self) -> Rc<dyn RenderTarget> {
        self.back_buffer.clone()
    }

    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Rc<dyn GpuProgram>, FrameworkError> {
        Ok(Rc::new(GlProgram::from_source(
            &self.state,
            name,
            vertex_source,
            fragment_source,
        )?))
    }

    fn create_pipeline_state(
        &self,
        desc: PipelineDescriptor,
    ) -> Result<Rc<PipelineState>, FrameworkError> {
        if desc.program.as_any().downcast_ref::<GlProgram>().is_none() {
            return Err(FrameworkError::ForeignResource("program"));
        }
        Ok(Rc::new(PipelineState::new(desc)))
    }

    fn create_vertex_array_object(
        &self,
        desc: VertexArrayDescriptor,
    ) -> Result<Rc<dyn VertexArrayObject>, FrameworkError> {
        Ok(Rc::new(GlVertexArray::new(&self.state, desc)?))
    }

    fn create_query(&self) -> Result<Rc<dyn Query>, FrameworkError> {
        Ok(Rc::new(GlQuery::new(&self.state)?))
    }

    fn submit(&self, command_buffer: &mut CommandBuffer) -> Result<DrawStatistics, FrameworkError> {
        executor::execute_commands(self, command_buffer.take_commands())
    }

    fn present_next_frame(&self) -> Result<(), FrameworkError> {
        let depth = self.render_target_stack.borrow().len();
        if depth != 0 {
            // Only this frame is lost, the next one starts from the back buffer.
            self.reset_render_target_stack();
            return Err(FrameworkError::UnbalancedRenderTargetStack(depth));
        }

        self.state.execute(NativeCall::Flush);
        self.state.reset_pipeline_statistics();

        if let Some(presenter) = self.presenter.borrow_mut().as_mut() {
            presenter()?;
        }

        Ok(())
    }

    fn set_frame_size(&self, new_size: (u32, u32)) {
        self.back_buffer.set_frame_size(new_size);
    }

    fn limits(&self) -> ServerCapabilities {
        self.capabilities
    }

    fn pipeline_statistics(&self) -> PipelineStatistics {
        self.state.pipeline_statistics()
    }

    fn invalidate_state_cache(&self) {
        self.state.mark_dirty();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::{algebra::Matrix4, color::Color, math::Rect},
        command::{ClearValues, DrawRange},
        descriptor::{DescriptorSet, ParameterValue, Semantic},
        gpu_texture::{GpuTextureKind, PixelKind},
        query::{QueryKind, QueryResult},
        vertex_array::{AttributeDefinition, IndexKind, VertexLayout},
        DrawParameters, PrimitiveTopology,
    };
    use std::time::Duration;

    const VERTEX_SHADER: &str = r"
        layout(location = 0) in vec3 vertexPosition;
        layout(std140) uniform PushConstants { mat4 worldMatrix; };
        uniform mat4 viewProjectionMatrix;
        void main() { gl_Position = viewProjectionMatrix * worldMatrix * vec4(vertexPosition, 1.0); }
    ";

    const FRAGMENT_SHADER: &str = r"
        out vec4 fragColor;
        void main() { fragColor = vec4(1.0); }
    ";

    struct Scene {
        server: Rc<GlGraphicsServer>,
        recorder: Rc<CallRecorder>,
        pipeline: Rc<PipelineState>,
        vertex_array: Rc<dyn VertexArrayObject>,
    }

    fn scene(with_indices: bool) -> Scene {
        let (server, recorder) = GlGraphicsServer::headless(320, 240).unwrap();
        let program = server
            .create_program("Test", VERTEX_SHADER, FRAGMENT_SHADER)
            .unwrap();
        let pipeline = server
            .create_pipeline_state(PipelineDescriptor {
                program,
                parameters: DrawParameters {
                    depth_test: Some(CompareFunc::Less),
                    depth_write: true,
                    ..Default::default()
                },
                topology: PrimitiveTopology::Triangles,
            })
            .unwrap();
        let vertex_buffer = server
            .create_buffer(0, BufferKind::Vertex, BufferUsage::StaticDraw)
            .unwrap();
        vertex_buffer
            .write_data(bytemuck::cast_slice(&[0.0f32; 12]))
            .unwrap();
        let index_buffer = with_indices.then(|| {
            let buffer = server
                .create_buffer(0, BufferKind::Index, BufferUsage::StaticDraw)
                .unwrap();
            buffer
                .write_data(bytemuck::cast_slice(&[0u32, 1, 2, 2, 3, 0]))
                .unwrap();
            buffer
        });
        let vertex_array = server
            .create_vertex_array_object(VertexArrayDescriptor {
                layout: VertexLayout::new(vec![AttributeDefinition::float(0, 3)]),
                vertex_buffer,
                index_buffer,
                index_kind: IndexKind::U32,
            })
            .unwrap();
        Scene {
            server,
            recorder,
            pipeline,
            vertex_array,
        }
    }

    fn count_draws(recorder: &CallRecorder) -> usize {
        recorder.count(|c| {
            matches!(
                c,
                NativeCall::DrawArrays { .. }
                    | NativeCall::DrawArraysInstanced { .. }
                    | NativeCall::DrawElements { .. }
                    | NativeCall::DrawElementsBaseVertex { .. }
            )
        })
    }

    #[test]
    fn test_record_time_validation() {
        let scene = scene(false);
        let mut cmd = CommandBuffer::new();
        assert!(matches!(cmd.draw(0, 3), Err(FrameworkError::NoPipelineBound)));
        cmd.bind_pipeline(scene.pipeline.clone());
        assert!(matches!(
            cmd.draw(0, 3),
            Err(FrameworkError::NoVertexArrayBound)
        ));
        cmd.bind_vertex_array_object(scene.vertex_array.clone());
        assert!(matches!(
            cmd.draw_indexed(0, 3, 0),
            Err(FrameworkError::MissingIndexBuffer)
        ));
        assert!(matches!(
            cmd.draw(2, 3),
            Err(FrameworkError::InvalidElementRange {
                start: 2,
                end: 5,
                total: 4
            })
        ));
        assert!(matches!(
            cmd.push_constants(&[0; MAX_PUSH_CONSTANTS_SIZE + 1]),
            Err(FrameworkError::PushConstantsOverflow { .. })
        ));
        assert!(matches!(
            cmd.bind_descriptor_set(4, Rc::new(DescriptorSet::new())),
            Err(FrameworkError::InvalidDescriptorSlot { slot: 4, max: 4 })
        ));
        assert!(cmd.draw(1, 3).is_ok());
        assert_eq!(cmd.draw_count(), 1);
    }

    #[test]
    fn test_hostile_draw_ranges() {
        let scene = scene(true);
        let mut cmd = CommandBuffer::new();
        cmd.bind_pipeline(scene.pipeline.clone());
        cmd.bind_vertex_array_object(scene.vertex_array.clone());
        assert!(matches!(
            cmd.draw(usize::MAX, 2),
            Err(FrameworkError::InvalidElementRange {
                start: usize::MAX,
                end: usize::MAX,
                total: 4
            })
        ));
        assert!(matches!(
            cmd.draw_indexed(1, usize::MAX, 0),
            Err(FrameworkError::InvalidElementRange { total: 6, .. })
        ));
        assert!(matches!(
            cmd.draw_indexed(0, 6, 4),
            Err(FrameworkError::InvalidBaseVertex {
                base_vertex: 4,
                vertex_count: 4
            })
        ));
        assert!(matches!(
            cmd.draw_indexed(0, 6, -1),
            Err(FrameworkError::InvalidBaseVertex { .. })
        ));
        assert!(cmd.draw_indexed(0, 6, 0).is_ok());
        assert_eq!(cmd.draw_count(), 1);
    }

    #[test]
    fn test_push_constants_go_to_reserved_block() {
        let scene = scene(false);
        let mut cmd = CommandBuffer::new();
        cmd.bind_pipeline(scene.pipeline.clone());
        cmd.bind_vertex_array_object(scene.vertex_array.clone());
        cmd.push_constants(bytemuck::cast_slice(Matrix4::<f32>::identity().as_slice()))
            .unwrap();
        cmd.draw(0, 3).unwrap();

        scene.recorder.clear();
        let stats = scene.server.submit(&mut cmd).unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.triangles, 1);
        assert!(cmd.is_empty());

        let push_constants_id = scene.server.push_constants_buffer.id;
        assert_eq!(
            scene.recorder.count(|c| matches!(
                c,
                NativeCall::BindBufferRange { index: 0, buffer, .. } if *buffer == push_constants_id
            )),
            1
        );
        assert_eq!(
            scene.recorder.count(
                |c| matches!(c, NativeCall::BufferSubData { data, .. } if data.len() == 64)
            ),
            1
        );
        assert_eq!(count_draws(&scene.recorder), 1);
    }

    #[test]
    fn test_inactive_uniforms_are_skipped() {
        let scene = scene(false);
        let texture = scene
            .server
            .create_2d_render_target(PixelKind::RGBA8, 4, 4)
            .unwrap();
        let set = DescriptorSet::new()
            .with(
                Semantic::ViewProjectionMatrix,
                ParameterValue::Matrix4(Matrix4::identity()),
            )
            .with(Semantic::AlbedoTexture, ParameterValue::Texture(texture))
            .with(
                Semantic::CameraPosition,
                ParameterValue::Vector3(Default::default()),
            );

        let mut cmd = CommandBuffer::new();
        cmd.bind_pipeline(scene.pipeline.clone());
        cmd.bind_vertex_array_object(scene.vertex_array.clone());
        cmd.bind_descriptor_set(0, Rc::new(set)).unwrap();
        cmd.draw(0, 3).unwrap();

        scene.recorder.clear();
        scene.server.submit(&mut cmd).unwrap();
        assert_eq!(
            scene
                .recorder
                .count(|c| matches!(c, NativeCall::UniformMatrix4F32 { .. })),
            1
        );
        assert_eq!(
            scene
                .recorder
                .count(|c| matches!(c, NativeCall::BindTexture { .. })),
            0
        );
        assert_eq!(
            scene
                .recorder
                .count(|c| matches!(c, NativeCall::Uniform3F32 { .. })),
            0
        );
    }

    #[test]
    fn test_identical_draws_change_no_state() {
        let scene = scene(true);
        let mut cmd = CommandBuffer::new();
        cmd.bind_pipeline(scene.pipeline.clone());
        cmd.bind_vertex_array_object(scene.vertex_array.clone());
        cmd.draw_indexed(0, 6, 0).unwrap();
        scene.server.submit(&mut cmd).unwrap();

        scene.recorder.clear();
        cmd.draw_indexed(0, 6, 0).unwrap();
        cmd.draw_indexed(3, 3, 1).unwrap();
        let stats = scene.server.submit(&mut cmd).unwrap();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(scene.recorder.state_change_count(), 0);
        assert_eq!(
            scene.recorder.calls(),
            vec![
                NativeCall::DrawElements {
                    mode: glow::TRIANGLES,
                    count: 6,
                    element_type: glow::UNSIGNED_INT,
                    offset: 0
                },
                NativeCall::DrawElementsBaseVertex {
                    mode: glow::TRIANGLES,
                    count: 3,
                    element_type: glow::UNSIGNED_INT,
                    offset: 12,
                    base_vertex: 1
                },
            ]
        );
    }

    #[test]
    fn test_incomplete_framebuffer_is_an_error() {
        let (server, recorder) = GlGraphicsServer::headless(64, 64).unwrap();
        let texture = server
            .create_2d_render_target(PixelKind::RGBA8, 64, 64)
            .unwrap();
        recorder.set_framebuffer_status(glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
        assert!(matches!(
            server.create_render_target(None, vec![Attachment::color(texture)]),
            Err(FrameworkError::FailedToConstructFBO(
                glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            ))
        ));
        assert_eq!(server.state().framebuffer_stack_depth(), 0);
    }

    #[test]
    fn test_render_target_stack() {
        let (server, recorder) = GlGraphicsServer::headless(64, 64).unwrap();
        let color = server
            .create_2d_render_target(PixelKind::RGBA8, 32, 16)
            .unwrap();
        let target = server
            .create_render_target(None, vec![Attachment::color(color)])
            .unwrap();
        assert_eq!(target.size(), (32, 16));

        let mut cmd = CommandBuffer::new();
        cmd.push_render_target(target.clone());
        cmd.clear(ClearValues {
            color: Some(Color::BLACK),
            depth: None,
            stencil: None,
        });
        server.submit(&mut cmd).unwrap();
        assert!(recorder
            .calls()
            .contains(&NativeCall::Clear(glow::COLOR_BUFFER_BIT)));

        recorder.clear();
        cmd.pop_render_target();
        server.submit(&mut cmd).unwrap();
        assert_eq!(server.state().current_framebuffers(), (0, 0));
        assert!(recorder.calls().contains(&NativeCall::Viewport {
            x: 0,
            y: 0,
            width: 64,
            height: 64
        }));
        assert!(server.present_next_frame().is_ok());

        cmd.pop_render_target();
        assert!(matches!(
            server.submit(&mut cmd),
            Err(FrameworkError::RenderTargetStackUnderflow)
        ));
    }

    #[test]
    fn test_unbalanced_frame_is_unwound() {
        let (server, _) = GlGraphicsServer::headless(64, 64).unwrap();
        let color = server
            .create_2d_render_target(PixelKind::RGBA8, 32, 16)
            .unwrap();
        let target = server
            .create_render_target(None, vec![Attachment::color(color)])
            .unwrap();

        let mut cmd = CommandBuffer::new();
        cmd.push_render_target(target.clone());
        cmd.push_render_target(target.clone());
        server.submit(&mut cmd).unwrap();
        assert!(matches!(
            server.present_next_frame(),
            Err(FrameworkError::UnbalancedRenderTargetStack(2))
        ));
        assert_eq!(server.state().framebuffer_stack_depth(), 0);
        assert_eq!(server.state().current_framebuffers(), (0, 0));
        assert_eq!(
            server.state().current_viewport(),
            Some(Rect::new(0, 0, 64, 64))
        );
        assert_eq!(server.current_render_target().size(), (64, 64));
        assert!(server.present_next_frame().is_ok());

        // A failed submission drops the targets it pushed before the failure.
        let query = server.create_query().unwrap();
        cmd.push_render_target(target);
        cmd.begin_query(query.clone(), QueryKind::TimeElapsed);
        cmd.begin_query(query, QueryKind::TimeElapsed);
        assert!(matches!(
            server.submit(&mut cmd),
            Err(FrameworkError::QueryMisuse(_))
        ));
        assert_eq!(server.state().framebuffer_stack_depth(), 0);
        assert_eq!(server.state().current_framebuffers(), (0, 0));
        cmd.push_render_target(server.back_buffer());
        assert!(server.submit(&mut cmd).is_ok());
        cmd.pop_render_target();
        server.submit(&mut cmd).unwrap();
        assert!(server.present_next_frame().is_ok());
    }

    #[test]
    fn test_query_polling() {
        let (server, recorder) = GlGraphicsServer::headless(64, 64).unwrap();
        let query = server.create_query().unwrap();
        let mut cmd = CommandBuffer::new();
        cmd.begin_query(query.clone(), QueryKind::TimeElapsed);
        cmd.end_query(query.clone());
        assert!(query.try_get_result().is_none());

        recorder.set_query_value(1_000);
        server.submit(&mut cmd).unwrap();
        assert_eq!(
            query.try_get_result(),
            Some(QueryResult::TimeElapsed(Duration::from_micros(1)))
        );
        assert_eq!(query.try_get_result(), None);
        assert!(matches!(
            query.end(),
            Err(FrameworkError::QueryMisuse(_))
        ));
    }

    #[test]
    fn test_texture_upload_validation() {
        let (server, _) = GlGraphicsServer::headless(64, 64).unwrap();
        let result = server.create_texture(GpuTextureDescriptor {
            kind: GpuTextureKind::Rectangle {
                width: 2,
                height: 2,
            },
            data: Some(&[0; 3]),
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(FrameworkError::InvalidTextureData { .. })
        ));

        let texture = server
            .create_2d_render_target(PixelKind::R8, 4, 4)
            .unwrap();
        assert!(texture.set_region(2, 2, 2, 2, &[1; 4]).is_ok());
        assert!(matches!(
            texture.set_region(3, 3, 2, 2, &[1; 4]),
            Err(FrameworkError::InvalidTextureRegion { .. })
        ));
    }

    #[test]
    fn test_instanced_draw_statistics() {
        let scene = scene(false);
        let mut cmd = CommandBuffer::new();
        cmd.bind_pipeline(scene.pipeline.clone());
        cmd.bind_vertex_array_object(scene.vertex_array.clone());
        cmd.draw_instanced(0, 3, 10).unwrap();
        assert!(matches!(
            cmd.commands()[0],
            crate::command::Command::Draw(ref draw) if draw.range == DrawRange {
                first: 0,
                count: 3,
                indexed: false,
                base_vertex: 0,
                instances: 10
            }
        ));
        let stats = scene.server.submit(&mut cmd).unwrap();
        assert_eq!(stats.triangles, 10);
    }
}
