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

//! Replays recorded commands against the state tracker.

use crate::{
    buffer::Buffer,
    command::{ClearValues, Command, DrawCall, MAX_PUSH_CONSTANTS_SIZE},
    core::math::Rect,
    descriptor::{ParameterValue, Semantic, PUSH_CONSTANTS_BINDING},
    error::FrameworkError,
    gl::{
        native::NativeCall,
        program::GlProgram,
        render_target::GlRenderTarget,
        server::GlGraphicsServer,
        state::StateTracker,
        texture::GlTexture,
        vertex_array::{gl_buffer, GlVertexArray},
        ToGlConstant,
    },
    query::Query,
    render_target::RenderTarget,
    stats::DrawStatistics,
    vertex_array::VertexArrayObject,
    ColorMask,
};
use std::rc::Rc;

/// A render target on the binding stack together with the viewport that was active before it
/// was pushed.
pub(crate) struct PushedRenderTarget {
    pub target: Rc<dyn RenderTarget>,
    pub previous_viewport: Option<Rect<i32>>,
}

fn framebuffer_of(render_target: &dyn RenderTarget) -> Result<&GlRenderTarget, FrameworkError> {
    render_target
        .as_any()
        .downcast_ref::<GlRenderTarget>()
        .ok_or(FrameworkError::ForeignResource("render target"))
}

pub(crate) fn full_viewport(render_target: &dyn RenderTarget) -> Rect<i32> {
    let (width, height) = render_target.size();
    Rect::new(0, 0, width as i32, height as i32)
}

/// Replays the commands in order. A failed command aborts the rest of the frame, so the render
/// target stack is unwound to the back buffer before the error is returned.
pub(crate) fn execute_commands(
    server: &GlGraphicsServer,
    commands: Vec<Command>,
) -> Result<DrawStatistics, FrameworkError> {
    let result = replay(server, commands);
    if result.is_err() {
        server.reset_render_target_stack();
    }
    result
}

fn replay(
    server: &GlGraphicsServer,
    commands: Vec<Command>,
) -> Result<DrawStatistics, FrameworkError> {
    let state = &*server.state;
    let mut statistics = DrawStatistics::default();

    for command in commands {
        match command {
            Command::PushRenderTarget(target) => {
                let framebuffer = framebuffer_of(&*target)?.id();
                let previous_viewport = state.current_viewport();
                state.push_framebuffer(framebuffer);
                state.set_viewport(full_viewport(&*target));
                server
                    .render_target_stack
                    .borrow_mut()
                    .push(PushedRenderTarget {
                        target,
                        previous_viewport,
                    });
            }
            Command::PopRenderTarget => {
                state.pop_framebuffer()?;
                let popped = server.render_target_stack.borrow_mut().pop();
                let viewport = match popped.and_then(|p| p.previous_viewport) {
                    Some(viewport) => viewport,
                    None => full_viewport(&*server.current_render_target()),
                };
                state.set_viewport(viewport);
            }
            Command::SetViewport(viewport) => state.set_viewport(viewport),
            Command::Clear(values) => clear(state, values),
            Command::Draw(draw) => statistics += draw_call(server, &draw)?,
            Command::BlitDepth { source, dest } => {
                let source_framebuffer = framebuffer_of(&*source)?.id();
                let dest_framebuffer = framebuffer_of(&*dest)?.id();
                let (source_width, source_height) = source.size();
                let (dest_width, dest_height) = dest.size();
                let width = source_width.min(dest_width) as i32;
                let height = source_height.min(dest_height) as i32;

                state.set_scissor_test(false);
                state.set_read_framebuffer(source_framebuffer);
                state.set_draw_framebuffer(dest_framebuffer);
                state.execute(NativeCall::BlitFramebuffer {
                    src: [0, 0, width, height],
                    dst: [0, 0, width, height],
                    mask: glow::DEPTH_BUFFER_BIT,
                    filter: glow::NEAREST,
                });

                let current = server.current_render_target();
                state.set_framebuffer(framebuffer_of(&*current)?.id());
            }
            Command::BeginQuery { query, kind } => query.begin(kind)?,
            Command::EndQuery(query) => query.end()?,
        }
    }

    Ok(statistics)
}

fn clear(state: &StateTracker, values: ClearValues) {
    let mut mask = 0;

    state.set_scissor_test(false);

    if let Some(color) = values.color {
        state.set_color_write(ColorMask::all(true));
        state.set_clear_color(color);
        mask |= glow::COLOR_BUFFER_BIT;
    }
    if let Some(depth) = values.depth {
        state.set_depth_write(true);
        state.set_clear_depth(depth);
        mask |= glow::DEPTH_BUFFER_BIT;
    }
    if let Some(stencil) = values.stencil {
        state.set_stencil_mask(0xFFFF_FFFF);
        state.set_clear_stencil(stencil);
        mask |= glow::STENCIL_BUFFER_BIT;
    }

    if mask != 0 {
        state.execute(NativeCall::Clear(mask));
    }
}

fn bind_parameter(
    state: &StateTracker,
    program: &GlProgram,
    semantic: Semantic,
    value: &ParameterValue,
    texture_unit: &mut u32,
) -> Result<(), FrameworkError> {
    if let ParameterValue::UniformBlock {
        buffer,
        offset,
        size,
    } = value
    {
        let Some(binding) = program.block_binding(semantic.uniform_name()) else {
            return Ok(());
        };
        state.set_uniform_buffer_range(binding, gl_buffer(buffer)?.id, *offset, *size)?;
        return Ok(());
    }

    let Some(location) = program.semantic_location(semantic) else {
        return Ok(());
    };

    let call = match value {
        ParameterValue::Matrix4(v) => {
            let mut value = [0.0; 16];
            value.copy_from_slice(v.as_slice());
            NativeCall::UniformMatrix4F32 { location, value }
        }
        ParameterValue::Vector2(v) => NativeCall::Uniform2F32 {
            location,
            value: (*v).into(),
        },
        ParameterValue::Vector3(v) => NativeCall::Uniform3F32 {
            location,
            value: (*v).into(),
        },
        ParameterValue::Vector4(v) => NativeCall::Uniform4F32 {
            location,
            value: (*v).into(),
        },
        ParameterValue::Float(v) => NativeCall::Uniform1F32 { location, value: *v },
        ParameterValue::Int(v) => NativeCall::Uniform1I32 { location, value: *v },
        ParameterValue::Texture(texture) => {
            let texture = texture
                .as_any()
                .downcast_ref::<GlTexture>()
                .ok_or(FrameworkError::ForeignResource("texture"))?;
            let unit = *texture_unit;
            state.set_texture(unit, texture.target(), texture.id)?;
            *texture_unit += 1;
            NativeCall::Uniform1I32 {
                location,
                value: unit as i32,
            }
        }
        ParameterValue::UniformBlock { .. } => return Ok(()),
    };

    state.execute(call);

    Ok(())
}

fn draw_call(server: &GlGraphicsServer, draw: &DrawCall) -> Result<DrawStatistics, FrameworkError> {
    let state = &*server.state;

    let program = draw
        .pipeline
        .program()
        .as_any()
        .downcast_ref::<GlProgram>()
        .ok_or(FrameworkError::ForeignResource("program"))?;
    let vertex_array = draw
        .vertex_array
        .as_any()
        .downcast_ref::<GlVertexArray>()
        .ok_or(FrameworkError::ForeignResource("vertex array"))?;

    state.set_program(program.id);
    state.apply_draw_parameters(draw.pipeline.parameters());
    state.set_vertex_array_object(vertex_array.id);

    let mut texture_unit = 0;
    for set in draw.descriptor_sets.iter().flatten() {
        for (semantic, value) in set.values() {
            bind_parameter(state, program, semantic, value, &mut texture_unit)?;
        }
    }

    if !draw.push_constants.is_empty() && program.has_push_constants() {
        server
            .push_constants_buffer
            .write_data_at(0, &draw.push_constants)?;
        state.set_uniform_buffer_range(
            PUSH_CONSTANTS_BINDING,
            server.push_constants_buffer.id,
            0,
            MAX_PUSH_CONSTANTS_SIZE,
        )?;
    }

    let range = draw.range;
    let mode = draw.topology.into_gl();
    if range.indexed {
        let index_kind = vertex_array.index_kind();
        let offset = (range.first * index_kind.size()) as i32;
        let element_type = index_kind.into_gl();
        state.execute(if range.base_vertex != 0 {
            NativeCall::DrawElementsBaseVertex {
                mode,
                count: range.count as i32,
                element_type,
                offset,
                base_vertex: range.base_vertex,
            }
        } else {
            NativeCall::DrawElements {
                mode,
                count: range.count as i32,
                element_type,
                offset,
            }
        });
    } else if range.instances > 1 {
        state.execute(NativeCall::DrawArraysInstanced {
            mode,
            first: range.first as i32,
            count: range.count as i32,
            instances: range.instances as i32,
        });
    } else {
        state.execute(NativeCall::DrawArrays {
            mode,
            first: range.first as i32,
            count: range.count as i32,
        });
    }

    Ok(DrawStatistics {
        draw_calls: 1,
        triangles: draw.topology.triangle_count(range.count) * range.instances.max(1),
    })
}
