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

//! Backend of an immediate-mode vector graphics library (NanoVG callback surface).
//!
//! Fills, strokes and triangle soups are only recorded into a [`FrameBatch`] while the frame is
//! built. [`VectorRenderer::render_flush`] uploads the whole frame with one vertex buffer write
//! and one uniform buffer write and then records the draw calls. Concave and self-intersecting
//! fills are resolved with the stencil buffer: the fill fans write the winding number of every
//! pixel, then a bounding quad covers the pixels with non-zero winding and resets the stencil to
//! zero on the way.

use crate::{
    core::{algebra::Vector2, fxhash::FxHashMap},
    graphics::{
        buffer::{Buffer, BufferKind, BufferUsage},
        command::CommandBuffer,
        descriptor::{DescriptorSet, ParameterValue, Semantic},
        gpu_program::GpuProgram,
        gpu_texture::{GpuTexture, GpuTextureDescriptor, GpuTextureKind, PixelKind},
        pipeline::{PipelineDescriptor, PipelineState},
        server::GraphicsServer,
        vertex_array::{AttributeDefinition, VertexArrayDescriptor, VertexArrayObject, VertexLayout},
        BlendFunc, BlendParameters, ColorMask, CompareFunc, CullFace, DrawParameters,
        PrimitiveTopology, StencilAction, StencilFunc, StencilOp,
    },
    renderer::{
        loader::{load_program, FileLoader},
        settings::VectorSettings,
        RendererError,
    },
};
use std::{ops::Range, rc::Rc};

pub mod batch;
pub mod paint;
pub mod texture;

pub use batch::{CallKind, DrawCallRecord, FrameBatch, VgPath, VgVertex};
pub use paint::{convert_paint, CompositeOperation, FragUniforms, Paint, Scissor, Transform2D};
pub use texture::{ImageFlags, VgTextureKind};

use paint::{PAINT_BLOCK_SIZE, SHADER_TRIANGLES};
use texture::TextureRegistry;

/// Fixed-function configuration of every pass the vector renderer draws with.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum VgPass {
    /// Writes the winding number of fill fans to the stencil buffer.
    FillStencil,
    /// Anti-aliased fringe of a fill, drawn outside of the filled area only.
    FillFringe,
    /// Bounding quad of a fill, covers non-zero winding pixels and resets them.
    FillCover,
    ConvexFan,
    /// Triangle strips without any stencil work.
    Strip,
    StrokeBase,
    StrokeFringe,
    StrokeClear,
    Triangles,
}

impl VgPass {
    fn topology(self) -> PrimitiveTopology {
        match self {
            VgPass::FillStencil | VgPass::ConvexFan => PrimitiveTopology::TriangleFan,
            VgPass::Triangles => PrimitiveTopology::Triangles,
            _ => PrimitiveTopology::TriangleStrip,
        }
    }

    fn draw_parameters(self, blend: BlendFunc) -> DrawParameters {
        let stencil = |func| {
            Some(StencilFunc {
                func,
                ref_value: 0,
                mask: 0xff,
            })
        };
        let op = |zpass| StencilOp {
            fail: StencilAction::Keep,
            zfail: StencilAction::Keep,
            zpass,
            write_mask: 0xff,
        };

        let mut parameters = DrawParameters {
            cull_face: Some(CullFace::Back),
            color_write: ColorMask::all(true),
            depth_write: false,
            depth_test: None,
            blend: Some(BlendParameters {
                func: blend,
                ..Default::default()
            }),
            stencil_op: op(StencilAction::Keep),
            ..Default::default()
        };

        match self {
            VgPass::FillStencil => {
                parameters.cull_face = None;
                parameters.color_write = ColorMask::all(false);
                parameters.blend = None;
                parameters.stencil_test = stencil(CompareFunc::Always);
                parameters.stencil_op = op(StencilAction::IncrWrap);
                parameters.back_stencil_op = Some(op(StencilAction::DecrWrap));
            }
            VgPass::FillFringe | VgPass::StrokeFringe => {
                parameters.stencil_test = stencil(CompareFunc::Equal);
            }
            VgPass::FillCover => {
                parameters.stencil_test = stencil(CompareFunc::NotEqual);
                parameters.stencil_op = StencilOp {
                    write_mask: 0xff,
                    ..StencilOp::uniform(StencilAction::Zero)
                };
            }
            VgPass::StrokeBase => {
                parameters.stencil_test = stencil(CompareFunc::Equal);
                parameters.stencil_op = op(StencilAction::Incr);
            }
            VgPass::StrokeClear => {
                parameters.color_write = ColorMask::all(false);
                parameters.blend = None;
                parameters.stencil_test = stencil(CompareFunc::Always);
                parameters.stencil_op = StencilOp {
                    write_mask: 0xff,
                    ..StencilOp::uniform(StencilAction::Zero)
                };
            }
            VgPass::ConvexFan | VgPass::Strip | VgPass::Triangles => (),
        }

        parameters
    }
}

impl VgPass {
    /// Passes with color writes off produce the same pipeline for every blend function.
    fn writes_color(self) -> bool {
        !matches!(self, VgPass::FillStencil | VgPass::StrokeClear)
    }
}

/// Pipelines of the vector program, one per pass and blend function.
struct PipelineCache {
    program: Rc<dyn GpuProgram>,
    pipelines: FxHashMap<(VgPass, Option<BlendFunc>), Rc<PipelineState>>,
}

impl PipelineCache {
    fn bind(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
        pass: VgPass,
        blend: BlendFunc,
    ) -> Result<(), RendererError> {
        let key = (pass, pass.writes_color().then_some(blend));
        let pipeline = match self.pipelines.get(&key) {
            Some(pipeline) => pipeline.clone(),
            None => {
                let pipeline = server.create_pipeline_state(PipelineDescriptor {
                    program: self.program.clone(),
                    parameters: pass.draw_parameters(blend),
                    topology: pass.topology(),
                })?;
                self.pipelines.insert(key, pipeline.clone());
                pipeline
            }
        };
        cmd.bind_pipeline(pipeline);
        Ok(())
    }
}

pub struct VectorRenderer {
    settings: VectorSettings,
    pipelines: PipelineCache,
    vertex_buffer: Rc<dyn Buffer>,
    vertex_array: Rc<dyn VertexArrayObject>,
    uniform_buffer: Rc<dyn Buffer>,
    // Bound when a draw has no image, the sampler must always have a texture.
    dummy_texture: Rc<dyn GpuTexture>,
    textures: TextureRegistry,
    batch: FrameBatch,
    view_size: Vector2<f32>,
    device_pixel_ratio: f32,
}

impl VectorRenderer {
    pub fn new(
        server: &dyn GraphicsServer,
        loader: &dyn FileLoader,
        settings: VectorSettings,
    ) -> Result<Self, RendererError> {
        let program = load_program(server, loader, "vg")?;

        let vertex_buffer = server.create_buffer(0, BufferKind::Vertex, BufferUsage::StreamDraw)?;
        let vertex_array = server.create_vertex_array_object(VertexArrayDescriptor {
            layout: VertexLayout::new(vec![
                AttributeDefinition::float(0, 2),
                AttributeDefinition::float(1, 2),
            ]),
            vertex_buffer: vertex_buffer.clone(),
            index_buffer: None,
            index_kind: Default::default(),
        })?;

        let dummy_texture = server.create_texture(GpuTextureDescriptor {
            kind: GpuTextureKind::Rectangle {
                width: 1,
                height: 1,
            },
            pixel_kind: PixelKind::RGBA8,
            data: Some(&[255; 4]),
            ..Default::default()
        })?;

        Ok(Self {
            settings,
            pipelines: PipelineCache {
                program,
                pipelines: Default::default(),
            },
            vertex_buffer,
            vertex_array,
            uniform_buffer: server.create_buffer(
                0,
                BufferKind::Uniform,
                BufferUsage::StreamDraw,
            )?,
            dummy_texture,
            textures: Default::default(),
            batch: FrameBatch::new(server.limits().uniform_buffer_offset_alignment),
            view_size: Vector2::new(1.0, 1.0),
            device_pixel_ratio: 1.0,
        })
    }

    pub fn settings(&self) -> &VectorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: VectorSettings) {
        self.settings = settings;
    }

    /// Draws recorded so far, not yet flushed.
    pub fn batch(&self) -> &FrameBatch {
        &self.batch
    }

    /// Sets the size of the frame in logical pixels. Called at the beginning of every frame.
    pub fn viewport(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        self.view_size = Vector2::new(width, height);
        self.device_pixel_ratio = device_pixel_ratio;
    }

    pub fn view_size(&self) -> Vector2<f32> {
        self.view_size
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    pub fn create_texture(
        &mut self,
        server: &dyn GraphicsServer,
        kind: VgTextureKind,
        width: u32,
        height: u32,
        flags: ImageFlags,
        data: Option<&[u8]>,
    ) -> Result<i32, RendererError> {
        self.textures
            .create(server, kind, width, height, flags, data)
    }

    pub fn update_texture(
        &mut self,
        id: i32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), RendererError> {
        self.textures.update(id, x, y, width, height, data)
    }

    /// Deletes the texture. Draws that are already recorded keep the texture alive until the
    /// flush, new draws with the id fail with [`RendererError::TextureNotFound`].
    pub fn delete_texture(&mut self, id: i32) -> Result<(), RendererError> {
        self.textures.delete(id)
    }

    pub fn texture_size(&self, id: i32) -> Result<(u32, u32), RendererError> {
        self.textures.size(id)
    }

    /// Records a fill of one or more contours. `bounds` is `[min_x, min_y, max_x, max_y]` of all
    /// contours together.
    pub fn render_fill(
        &mut self,
        paint: &Paint,
        op: impl Into<BlendFunc>,
        scissor: &Scissor,
        fringe: f32,
        bounds: [f32; 4],
        paths: &[VgPath],
    ) -> Result<(), RendererError> {
        let blend = op.into();
        let mark = self.batch.mark();
        let result = self.record_fill(paint, blend, scissor, fringe, bounds, paths);
        if result.is_err() {
            self.batch.rollback(mark);
        }
        result
    }

    fn record_fill(
        &mut self,
        paint: &Paint,
        blend: BlendFunc,
        scissor: &Scissor,
        fringe: f32,
        bounds: [f32; 4],
        paths: &[VgPath],
    ) -> Result<(), RendererError> {
        let paint_uniforms = convert_paint(paint, scissor, fringe, fringe, -1.0, &self.textures)?;
        let texture = self.paint_texture(paint)?;

        let convex = matches!(paths, [path] if path.convex);
        let path_range = self.batch.push_paths(paths);

        let (kind, triangles, uniform) = if convex {
            let uniform = self.batch.push_uniform(&paint_uniforms)?;
            (CallKind::ConvexFill, 0..0, uniform)
        } else {
            let [x0, y0, x1, y1] = bounds;
            let quad = self.batch.push_vertices(&[
                VgVertex::new(x1, y1, 0.5, 1.0),
                VgVertex::new(x1, y0, 0.5, 1.0),
                VgVertex::new(x0, y1, 0.5, 1.0),
                VgVertex::new(x0, y0, 0.5, 1.0),
            ]);
            let uniform = self.batch.push_uniform(&FragUniforms::stencil_only())?;
            self.batch.push_uniform(&paint_uniforms)?;
            (CallKind::Fill, quad, uniform)
        };

        self.batch.calls.push(DrawCallRecord {
            kind,
            image: paint.image,
            texture,
            paths: path_range,
            triangles,
            uniform,
            blend,
        });

        Ok(())
    }

    /// Records a stroke. Every path contributes its stroke strip only.
    pub fn render_stroke(
        &mut self,
        paint: &Paint,
        op: impl Into<BlendFunc>,
        scissor: &Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: &[VgPath],
    ) -> Result<(), RendererError> {
        let blend = op.into();
        let mark = self.batch.mark();
        let result = self.record_stroke(paint, blend, scissor, fringe, stroke_width, paths);
        if result.is_err() {
            self.batch.rollback(mark);
        }
        result
    }

    fn record_stroke(
        &mut self,
        paint: &Paint,
        blend: BlendFunc,
        scissor: &Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: &[VgPath],
    ) -> Result<(), RendererError> {
        let anti_aliased =
            convert_paint(paint, scissor, stroke_width, fringe, -1.0, &self.textures)?;
        let base = if self.settings.stencil_strokes {
            Some(convert_paint(
                paint,
                scissor,
                stroke_width,
                fringe,
                1.0 - 0.5 / 255.0,
                &self.textures,
            )?)
        } else {
            None
        };

        let texture = self.paint_texture(paint)?;
        let path_range = self.batch.push_paths(paths);
        let uniform = self.batch.push_uniform(&anti_aliased)?;
        if let Some(base) = base {
            self.batch.push_uniform(&base)?;
        }

        self.batch.calls.push(DrawCallRecord {
            kind: CallKind::Stroke,
            image: paint.image,
            texture,
            paths: path_range,
            triangles: 0..0,
            uniform,
            blend,
        });

        Ok(())
    }

    /// Records a plain triangle list, used for text.
    pub fn render_triangles(
        &mut self,
        paint: &Paint,
        op: impl Into<BlendFunc>,
        scissor: &Scissor,
        vertices: &[VgVertex],
        fringe: f32,
    ) -> Result<(), RendererError> {
        let mut uniforms = convert_paint(paint, scissor, 1.0, fringe, -1.0, &self.textures)?;
        uniforms.kind = SHADER_TRIANGLES;
        let texture = self.paint_texture(paint)?;

        let mark = self.batch.mark();
        let triangles = self.batch.push_vertices(vertices);
        let uniform = match self.batch.push_uniform(&uniforms) {
            Ok(uniform) => uniform,
            Err(err) => {
                self.batch.rollback(mark);
                return Err(err.into());
            }
        };

        self.batch.calls.push(DrawCallRecord {
            kind: CallKind::Triangles,
            image: paint.image,
            texture,
            paths: 0..0,
            triangles,
            uniform,
            blend: op.into(),
        });

        Ok(())
    }

    fn paint_texture(&self, paint: &Paint) -> Result<Option<Rc<dyn GpuTexture>>, RendererError> {
        if paint.image == 0 {
            Ok(None)
        } else {
            Ok(Some(self.textures.get(paint.image)?.texture.clone()))
        }
    }

    /// Drops everything recorded since the last flush.
    pub fn render_cancel(&mut self) {
        self.batch.clear();
    }

    /// Uploads the recorded frame and records its draw calls into `cmd`. The batch is empty
    /// afterwards, even if an error occurred. Returns the amount of recorded draw calls.
    ///
    /// Vertex and uniform data are written immediately, so `cmd` must be submitted before the
    /// next flush.
    pub fn render_flush(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
    ) -> Result<usize, RendererError> {
        if self.batch.is_empty() {
            self.batch.clear();
            return Ok(0);
        }

        let result = self.record_frame(server, cmd);
        self.batch.clear();
        result
    }

    fn record_frame(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
    ) -> Result<usize, RendererError> {
        let draw_count = cmd.draw_count();

        self.vertex_buffer
            .write_data(bytemuck::cast_slice(&self.batch.vertices))?;
        self.uniform_buffer.write_data(self.batch.uniforms.bytes())?;

        cmd.bind_vertex_array_object(self.vertex_array.clone());
        cmd.bind_descriptor_set(
            0,
            Rc::new(DescriptorSet::new().with(
                Semantic::ViewSize,
                ParameterValue::Vector2(self.view_size),
            )),
        )?;

        let calls = std::mem::take(&mut self.batch.calls);
        let result = calls
            .iter()
            .try_for_each(|call| self.record_call(server, cmd, call));
        self.batch.calls = calls;
        result?;

        cmd.unbind_descriptor_set(1);

        Ok(cmd.draw_count() - draw_count)
    }

    fn record_call(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
        call: &DrawCallRecord,
    ) -> Result<(), RendererError> {
        let texture = call
            .texture
            .clone()
            .unwrap_or_else(|| self.dummy_texture.clone());

        let paths = &self.batch.paths[call.paths.clone()];
        let antialias = self.settings.antialias;
        let stencil_strokes = self.settings.stencil_strokes;

        match call.kind {
            CallKind::Fill => {
                self.bind_paint(cmd, call.uniform, &texture)?;
                self.pipelines.bind(server, cmd, VgPass::FillStencil, call.blend)?;
                draw_ranges(cmd, paths.iter().map(|p| &p.fill))?;

                self.bind_paint(cmd, call.uniform + 1, &texture)?;
                if antialias {
                    self.pipelines.bind(server, cmd, VgPass::FillFringe, call.blend)?;
                    draw_ranges(cmd, paths.iter().map(|p| &p.stroke))?;
                }

                self.pipelines.bind(server, cmd, VgPass::FillCover, call.blend)?;
                draw_ranges(cmd, std::iter::once(&call.triangles))?;
            }
            CallKind::ConvexFill => {
                self.bind_paint(cmd, call.uniform, &texture)?;
                self.pipelines.bind(server, cmd, VgPass::ConvexFan, call.blend)?;
                draw_ranges(cmd, paths.iter().map(|p| &p.fill))?;
                self.pipelines.bind(server, cmd, VgPass::Strip, call.blend)?;
                draw_ranges(cmd, paths.iter().map(|p| &p.stroke))?;
            }
            CallKind::Stroke if stencil_strokes => {
                // Base pass with the hard threshold, overlapping segments are drawn once.
                self.bind_paint(cmd, call.uniform + 1, &texture)?;
                self.pipelines.bind(server, cmd, VgPass::StrokeBase, call.blend)?;
                draw_ranges(cmd, paths.iter().map(|p| &p.stroke))?;

                self.bind_paint(cmd, call.uniform, &texture)?;
                self.pipelines.bind(server, cmd, VgPass::StrokeFringe, call.blend)?;
                draw_ranges(cmd, paths.iter().map(|p| &p.stroke))?;

                self.pipelines.bind(server, cmd, VgPass::StrokeClear, call.blend)?;
                draw_ranges(cmd, paths.iter().map(|p| &p.stroke))?;
            }
            CallKind::Stroke => {
                self.bind_paint(cmd, call.uniform, &texture)?;
                self.pipelines.bind(server, cmd, VgPass::Strip, call.blend)?;
                draw_ranges(cmd, paths.iter().map(|p| &p.stroke))?;
            }
            CallKind::Triangles => {
                self.bind_paint(cmd, call.uniform, &texture)?;
                self.pipelines.bind(server, cmd, VgPass::Triangles, call.blend)?;
                draw_ranges(cmd, std::iter::once(&call.triangles))?;
            }
        }

        Ok(())
    }

    fn bind_paint(
        &self,
        cmd: &mut CommandBuffer,
        uniform: usize,
        texture: &Rc<dyn GpuTexture>,
    ) -> Result<(), RendererError> {
        let set = DescriptorSet::new()
            .with(
                Semantic::PaintBlock,
                ParameterValue::UniformBlock {
                    buffer: self.uniform_buffer.clone(),
                    offset: self.batch.uniforms.offset(uniform),
                    size: PAINT_BLOCK_SIZE,
                },
            )
            .with(Semantic::ImageTexture, ParameterValue::Texture(texture.clone()));
        cmd.bind_descriptor_set(1, Rc::new(set))?;
        Ok(())
    }

    /// Amount of distinct pipelines created so far.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.pipelines.len()
    }
}

fn draw_ranges<'a>(
    cmd: &mut CommandBuffer,
    ranges: impl Iterator<Item = &'a Range<usize>>,
) -> Result<(), RendererError> {
    for range in ranges {
        if !range.is_empty() {
            cmd.draw(range.start, range.len())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::color::Color,
        graphics::gl::{native::NativeCall, server::GlGraphicsServer},
        renderer::loader::EmbeddedFileLoader,
    };

    fn renderer(settings: VectorSettings) -> (Rc<GlGraphicsServer>, VectorRenderer) {
        let (server, _) = GlGraphicsServer::headless(64, 64).unwrap();
        let mut renderer = VectorRenderer::new(&*server, &EmbeddedFileLoader, settings).unwrap();
        renderer.viewport(64.0, 64.0, 1.0);
        (server, renderer)
    }

    fn vertices(count: usize) -> Vec<VgVertex> {
        (0..count)
            .map(|i| VgVertex::new(i as f32, (i * i) as f32, 0.5, 1.0))
            .collect()
    }

    fn concave() -> Vec<VgPath> {
        vec![
            VgPath {
                fill: vertices(6),
                stroke: vertices(14),
                convex: false,
            },
            VgPath {
                fill: vertices(4),
                stroke: vertices(10),
                convex: false,
            },
        ]
    }

    fn red() -> Paint {
        Paint::color(Color::RED)
    }

    #[test]
    fn test_flush_resets_batch() {
        let (server, mut vg) = renderer(Default::default());
        vg.render_fill(
            &red(),
            CompositeOperation::SourceOver,
            &Scissor::none(),
            1.0,
            [0.0, 0.0, 10.0, 10.0],
            &concave(),
        )
        .unwrap();
        assert_eq!(vg.batch().path_count(), 2);
        assert_eq!(vg.batch().vertex_count(), 6 + 14 + 4 + 10 + 4);
        assert_eq!(vg.batch().uniform_count(), 2);
        assert_eq!(vg.batch().call_count(), 1);

        let mut cmd = server.create_command_buffer();
        // Stencil pass per path, fringe per path, one cover quad.
        assert_eq!(vg.render_flush(&*server, &mut cmd).unwrap(), 5);
        let batch = vg.batch();
        assert_eq!(
            (
                batch.vertex_count(),
                batch.path_count(),
                batch.uniform_count(),
                batch.call_count()
            ),
            (0, 0, 0, 0)
        );
        server.submit(&mut cmd).unwrap();
    }

    #[test]
    fn test_cancel_issues_nothing() {
        let (server, mut vg) = renderer(Default::default());
        vg.render_fill(
            &red(),
            CompositeOperation::SourceOver,
            &Scissor::none(),
            1.0,
            [0.0, 0.0, 10.0, 10.0],
            &concave(),
        )
        .unwrap();
        vg.render_cancel();
        let batch = vg.batch();
        assert_eq!(
            (
                batch.vertex_count(),
                batch.path_count(),
                batch.uniform_count(),
                batch.call_count()
            ),
            (0, 0, 0, 0)
        );

        let mut cmd = server.create_command_buffer();
        assert_eq!(vg.render_flush(&*server, &mut cmd).unwrap(), 0);
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_fill_stencil_winding() {
        let (server, recorder) = GlGraphicsServer::headless(64, 64).unwrap();
        let mut vg = VectorRenderer::new(&*server, &EmbeddedFileLoader, Default::default()).unwrap();
        vg.render_fill(
            &red(),
            CompositeOperation::SourceOver,
            &Scissor::none(),
            1.0,
            [0.0, 0.0, 10.0, 10.0],
            &concave(),
        )
        .unwrap();
        let mut cmd = server.create_command_buffer();
        vg.render_flush(&*server, &mut cmd).unwrap();
        recorder.clear();
        server.submit(&mut cmd).unwrap();

        let front_incr = recorder.count(|c| {
            matches!(
                c,
                NativeCall::StencilOpSeparate {
                    face: glow::FRONT,
                    zpass: glow::INCR_WRAP,
                    ..
                }
            )
        });
        let back_decr = recorder.count(|c| {
            matches!(
                c,
                NativeCall::StencilOpSeparate {
                    face: glow::BACK,
                    zpass: glow::DECR_WRAP,
                    ..
                }
            )
        });
        assert_eq!((front_incr, back_decr), (1, 1));
        assert_eq!(
            recorder.count(|c| matches!(
                c,
                NativeCall::DrawArrays {
                    mode: glow::TRIANGLE_FAN,
                    ..
                }
            )),
            2
        );
    }

    #[test]
    fn test_convex_fill_skips_stencil() {
        let (server, mut vg) = renderer(Default::default());
        let path = VgPath {
            fill: vertices(4),
            stroke: vertices(10),
            convex: true,
        };
        vg.render_fill(
            &red(),
            CompositeOperation::SourceOver,
            &Scissor::none(),
            1.0,
            [0.0, 0.0, 10.0, 10.0],
            &[path],
        )
        .unwrap();
        assert_eq!(vg.batch().uniform_count(), 1);
        assert_eq!(vg.batch().calls()[0].kind, CallKind::ConvexFill);
        assert_eq!(vg.batch().calls()[0].triangles, 0..0);

        let mut cmd = server.create_command_buffer();
        assert_eq!(vg.render_flush(&*server, &mut cmd).unwrap(), 2);
        assert_eq!(vg.pipeline_count(), 2);
    }

    #[test]
    fn test_stroke_passes() {
        let (server, mut vg) = renderer(Default::default());
        let path = VgPath {
            fill: Vec::new(),
            stroke: vertices(8),
            convex: false,
        };
        vg.render_stroke(
            &red(),
            CompositeOperation::SourceOver,
            &Scissor::none(),
            1.0,
            2.0,
            std::slice::from_ref(&path),
        )
        .unwrap();
        assert_eq!(vg.batch().uniform_count(), 2);
        let mut cmd = server.create_command_buffer();
        assert_eq!(vg.render_flush(&*server, &mut cmd).unwrap(), 3);

        vg.set_settings(VectorSettings {
            antialias: true,
            stencil_strokes: false,
        });
        vg.render_stroke(
            &red(),
            CompositeOperation::Lighter,
            &Scissor::none(),
            1.0,
            2.0,
            &[path],
        )
        .unwrap();
        assert_eq!(vg.batch().uniform_count(), 1);
        let mut cmd = server.create_command_buffer();
        assert_eq!(vg.render_flush(&*server, &mut cmd).unwrap(), 1);
    }

    #[test]
    fn test_stencil_only_passes_share_pipelines() {
        let (server, mut vg) = renderer(Default::default());
        for op in [CompositeOperation::SourceOver, CompositeOperation::Lighter] {
            vg.render_fill(
                &red(),
                op,
                &Scissor::none(),
                1.0,
                [0.0, 0.0, 10.0, 10.0],
                &concave(),
            )
            .unwrap();
        }
        let mut cmd = server.create_command_buffer();
        assert_eq!(vg.render_flush(&*server, &mut cmd).unwrap(), 10);
        // One stencil pipeline, fringe and cover for each blend function.
        assert_eq!(vg.pipeline_count(), 5);
    }

    #[test]
    fn test_texture_deleted_before_flush() {
        let (server, mut vg) = renderer(Default::default());
        let image = vg
            .create_texture(&*server, VgTextureKind::Rgba, 4, 4, ImageFlags::empty(), None)
            .unwrap();
        let texture = vg.textures.get(image).unwrap().texture.clone();
        let paint = Paint::image_pattern((0.0, 0.0), (4.0, 4.0), 0.0, image, 255);
        vg.render_triangles(
            &paint,
            CompositeOperation::SourceOver,
            &Scissor::none(),
            &vertices(3),
            1.0,
        )
        .unwrap();

        vg.delete_texture(image).unwrap();
        assert!(vg.texture_size(image).is_err());
        // Test handle and the recorded draw.
        assert_eq!(Rc::strong_count(&texture), 2);

        let mut cmd = server.create_command_buffer();
        assert_eq!(vg.render_flush(&*server, &mut cmd).unwrap(), 1);
        server.submit(&mut cmd).unwrap();
        assert_eq!(Rc::strong_count(&texture), 1);
    }

    #[test]
    fn test_dead_texture_rolls_back() {
        let (server, mut vg) = renderer(Default::default());
        vg.render_triangles(
            &red(),
            CompositeOperation::SourceOver,
            &Scissor::none(),
            &vertices(3),
            1.0,
        )
        .unwrap();

        let image = vg
            .create_texture(&*server, VgTextureKind::Alpha, 8, 8, ImageFlags::empty(), None)
            .unwrap();
        assert_eq!(vg.texture_size(image).unwrap(), (8, 8));
        vg.delete_texture(image).unwrap();

        let paint = Paint::image_pattern((0.0, 0.0), (8.0, 8.0), 0.0, image, 255);
        let result = vg.render_fill(
            &paint,
            CompositeOperation::SourceOver,
            &Scissor::none(),
            1.0,
            [0.0, 0.0, 10.0, 10.0],
            &concave(),
        );
        assert!(matches!(result, Err(RendererError::TextureNotFound(id)) if id == image));
        assert!(vg.update_texture(image, 0, 0, 1, 1, &[0]).is_err());

        // Only the triangles survive.
        let batch = vg.batch();
        assert_eq!(batch.call_count(), 1);
        assert_eq!(batch.vertex_count(), 3);
        assert_eq!(batch.uniform_count(), 1);
        assert_eq!(batch.path_count(), 0);
    }
}
