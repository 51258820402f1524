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

//! The boundary between the backend and the driver. Every void GL call the backend makes is a
//! [`NativeCall`] value executed through [`NativeApi::execute`], so the very same backend code
//! runs against a real `glow::Context` or against a recorder.

use crate::{error::FrameworkError, gl::GlName};
use glow::HasContext;
use std::{borrow::Cow, num::NonZeroU32};

#[derive(Clone, Debug, PartialEq)]
pub enum NativeCall<'a> {
    Enable(u32),
    Disable(u32),
    DepthMask(bool),
    DepthFunc(u32),
    ColorMask {
        red: bool,
        green: bool,
        blue: bool,
        alpha: bool,
    },
    StencilFunc {
        func: u32,
        ref_value: i32,
        mask: u32,
    },
    StencilOpSeparate {
        face: u32,
        fail: u32,
        zfail: u32,
        zpass: u32,
    },
    StencilMask(u32),
    CullFace(u32),
    BlendFuncSeparate {
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    },
    BlendEquationSeparate {
        rgb: u32,
        alpha: u32,
    },
    Scissor {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    Viewport {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(u32),
    BindFramebuffer {
        target: u32,
        framebuffer: GlName,
    },
    DrawBuffers(Vec<u32>),
    ReadBuffer(u32),
    FramebufferTexture2D {
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: GlName,
        level: i32,
    },
    BlitFramebuffer {
        src: [i32; 4],
        dst: [i32; 4],
        mask: u32,
        filter: u32,
    },
    BindBuffer {
        target: u32,
        buffer: GlName,
    },
    BindBufferRange {
        target: u32,
        index: u32,
        buffer: GlName,
        offset: i32,
        size: i32,
    },
    BufferData {
        target: u32,
        size: usize,
        data: Option<Cow<'a, [u8]>>,
        usage: u32,
    },
    BufferSubData {
        target: u32,
        offset: usize,
        data: Cow<'a, [u8]>,
    },
    BindVertexArray(GlName),
    EnableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    VertexAttribDivisor {
        index: u32,
        divisor: u32,
    },
    UseProgram(GlName),
    UniformBlockBinding {
        program: GlName,
        index: u32,
        binding: u32,
    },
    Uniform1I32 {
        location: u32,
        value: i32,
    },
    Uniform1F32 {
        location: u32,
        value: f32,
    },
    Uniform2F32 {
        location: u32,
        value: [f32; 2],
    },
    Uniform3F32 {
        location: u32,
        value: [f32; 3],
    },
    Uniform4F32 {
        location: u32,
        value: [f32; 4],
    },
    UniformMatrix4F32 {
        location: u32,
        value: [f32; 16],
    },
    ActiveTexture(u32),
    BindTexture {
        target: u32,
        texture: GlName,
    },
    TexParameterI32 {
        target: u32,
        parameter: u32,
        value: i32,
    },
    PixelStoreI32 {
        parameter: u32,
        value: i32,
    },
    TexImage2D {
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        data_type: u32,
        data: Option<Cow<'a, [u8]>>,
    },
    TexSubImage2D {
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        data_type: u32,
        data: Cow<'a, [u8]>,
    },
    GenerateMipmap(u32),
    DrawArrays {
        mode: u32,
        first: i32,
        count: i32,
    },
    DrawArraysInstanced {
        mode: u32,
        first: i32,
        count: i32,
        instances: i32,
    },
    DrawElements {
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
    },
    DrawElementsBaseVertex {
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        base_vertex: i32,
    },
    BeginQuery {
        target: u32,
        query: GlName,
    },
    EndQuery(u32),
    DeleteBuffer(GlName),
    DeleteTexture(GlName),
    DeleteFramebuffer(GlName),
    DeleteVertexArray(GlName),
    DeleteProgram(GlName),
    DeleteQuery(GlName),
    Flush,
    Finish,
}

impl NativeCall<'_> {
    /// Detaches the call from borrowed data.
    pub fn into_owned(self) -> NativeCall<'static> {
        fn own(data: Cow<'_, [u8]>) -> Cow<'static, [u8]> {
            Cow::Owned(data.into_owned())
        }

        match self {
            NativeCall::BufferData {
                target,
                size,
                data,
                usage,
            } => NativeCall::BufferData {
                target,
                size,
                data: data.map(own),
                usage,
            },
            NativeCall::BufferSubData {
                target,
                offset,
                data,
            } => NativeCall::BufferSubData {
                target,
                offset,
                data: own(data),
            },
            NativeCall::TexImage2D {
                target,
                level,
                internal_format,
                width,
                height,
                format,
                data_type,
                data,
            } => NativeCall::TexImage2D {
                target,
                level,
                internal_format,
                width,
                height,
                format,
                data_type,
                data: data.map(own),
            },
            NativeCall::TexSubImage2D {
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                data_type,
                data,
            } => NativeCall::TexSubImage2D {
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                data_type,
                data: own(data),
            },
            NativeCall::Enable(v) => NativeCall::Enable(v),
            NativeCall::Disable(v) => NativeCall::Disable(v),
            NativeCall::DepthMask(v) => NativeCall::DepthMask(v),
            NativeCall::DepthFunc(v) => NativeCall::DepthFunc(v),
            NativeCall::ColorMask {
                red,
                green,
                blue,
                alpha,
            } => NativeCall::ColorMask {
                red,
                green,
                blue,
                alpha,
            },
            NativeCall::StencilFunc {
                func,
                ref_value,
                mask,
            } => NativeCall::StencilFunc {
                func,
                ref_value,
                mask,
            },
            NativeCall::StencilOpSeparate {
                face,
                fail,
                zfail,
                zpass,
            } => NativeCall::StencilOpSeparate {
                face,
                fail,
                zfail,
                zpass,
            },
            NativeCall::StencilMask(v) => NativeCall::StencilMask(v),
            NativeCall::CullFace(v) => NativeCall::CullFace(v),
            NativeCall::BlendFuncSeparate {
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            } => NativeCall::BlendFuncSeparate {
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            },
            NativeCall::BlendEquationSeparate { rgb, alpha } => {
                NativeCall::BlendEquationSeparate { rgb, alpha }
            }
            NativeCall::Scissor {
                x,
                y,
                width,
                height,
            } => NativeCall::Scissor {
                x,
                y,
                width,
                height,
            },
            NativeCall::Viewport {
                x,
                y,
                width,
                height,
            } => NativeCall::Viewport {
                x,
                y,
                width,
                height,
            },
            NativeCall::ClearColor(v) => NativeCall::ClearColor(v),
            NativeCall::ClearDepth(v) => NativeCall::ClearDepth(v),
            NativeCall::ClearStencil(v) => NativeCall::ClearStencil(v),
            NativeCall::Clear(v) => NativeCall::Clear(v),
            NativeCall::BindFramebuffer {
                target,
                framebuffer,
            } => NativeCall::BindFramebuffer {
                target,
                framebuffer,
            },
            NativeCall::DrawBuffers(v) => NativeCall::DrawBuffers(v),
            NativeCall::ReadBuffer(v) => NativeCall::ReadBuffer(v),
            NativeCall::FramebufferTexture2D {
                target,
                attachment,
                texture_target,
                texture,
                level,
            } => NativeCall::FramebufferTexture2D {
                target,
                attachment,
                texture_target,
                texture,
                level,
            },
            NativeCall::BlitFramebuffer {
                src,
                dst,
                mask,
                filter,
            } => NativeCall::BlitFramebuffer {
                src,
                dst,
                mask,
                filter,
            },
            NativeCall::BindBuffer { target, buffer } => NativeCall::BindBuffer { target, buffer },
            NativeCall::BindBufferRange {
                target,
                index,
                buffer,
                offset,
                size,
            } => NativeCall::BindBufferRange {
                target,
                index,
                buffer,
                offset,
                size,
            },
            NativeCall::BindVertexArray(v) => NativeCall::BindVertexArray(v),
            NativeCall::EnableVertexAttribArray(v) => NativeCall::EnableVertexAttribArray(v),
            NativeCall::VertexAttribPointer {
                index,
                size,
                data_type,
                normalized,
                stride,
                offset,
            } => NativeCall::VertexAttribPointer {
                index,
                size,
                data_type,
                normalized,
                stride,
                offset,
            },
            NativeCall::VertexAttribDivisor { index, divisor } => {
                NativeCall::VertexAttribDivisor { index, divisor }
            }
            NativeCall::UseProgram(v) => NativeCall::UseProgram(v),
            NativeCall::UniformBlockBinding {
                program,
                index,
                binding,
            } => NativeCall::UniformBlockBinding {
                program,
                index,
                binding,
            },
            NativeCall::Uniform1I32 { location, value } => {
                NativeCall::Uniform1I32 { location, value }
            }
            NativeCall::Uniform1F32 { location, value } => {
                NativeCall::Uniform1F32 { location, value }
            }
            NativeCall::Uniform2F32 { location, value } => {
                NativeCall::Uniform2F32 { location, value }
            }
            NativeCall::Uniform3F32 { location, value } => {
                NativeCall::Uniform3F32 { location, value }
            }
            NativeCall::Uniform4F32 { location, value } => {
                NativeCall::Uniform4F32 { location, value }
            }
            NativeCall::UniformMatrix4F32 { location, value } => {
                NativeCall::UniformMatrix4F32 { location, value }
            }
            NativeCall::ActiveTexture(v) => NativeCall::ActiveTexture(v),
            NativeCall::BindTexture { target, texture } => {
                NativeCall::BindTexture { target, texture }
            }
            NativeCall::TexParameterI32 {
                target,
                parameter,
                value,
            } => NativeCall::TexParameterI32 {
                target,
                parameter,
                value,
            },
            NativeCall::PixelStoreI32 { parameter, value } => {
                NativeCall::PixelStoreI32 { parameter, value }
            }
            NativeCall::GenerateMipmap(v) => NativeCall::GenerateMipmap(v),
            NativeCall::DrawArrays { mode, first, count } => {
                NativeCall::DrawArrays { mode, first, count }
            }
            NativeCall::DrawArraysInstanced {
                mode,
                first,
                count,
                instances,
            } => NativeCall::DrawArraysInstanced {
                mode,
                first,
                count,
                instances,
            },
            NativeCall::DrawElements {
                mode,
                count,
                element_type,
                offset,
            } => NativeCall::DrawElements {
                mode,
                count,
                element_type,
                offset,
            },
            NativeCall::DrawElementsBaseVertex {
                mode,
                count,
                element_type,
                offset,
                base_vertex,
            } => NativeCall::DrawElementsBaseVertex {
                mode,
                count,
                element_type,
                offset,
                base_vertex,
            },
            NativeCall::BeginQuery { target, query } => NativeCall::BeginQuery { target, query },
            NativeCall::EndQuery(v) => NativeCall::EndQuery(v),
            NativeCall::DeleteBuffer(v) => NativeCall::DeleteBuffer(v),
            NativeCall::DeleteTexture(v) => NativeCall::DeleteTexture(v),
            NativeCall::DeleteFramebuffer(v) => NativeCall::DeleteFramebuffer(v),
            NativeCall::DeleteVertexArray(v) => NativeCall::DeleteVertexArray(v),
            NativeCall::DeleteProgram(v) => NativeCall::DeleteProgram(v),
            NativeCall::DeleteQuery(v) => NativeCall::DeleteQuery(v),
            NativeCall::Flush => NativeCall::Flush,
            NativeCall::Finish => NativeCall::Finish,
        }
    }

    /// Checks whether the call changes pipeline state (as opposed to creating, drawing or
    /// uploading data).
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            NativeCall::Enable(_)
                | NativeCall::Disable(_)
                | NativeCall::DepthMask(_)
                | NativeCall::DepthFunc(_)
                | NativeCall::ColorMask { .. }
                | NativeCall::StencilFunc { .. }
                | NativeCall::StencilOpSeparate { .. }
                | NativeCall::StencilMask(_)
                | NativeCall::CullFace(_)
                | NativeCall::BlendFuncSeparate { .. }
                | NativeCall::BlendEquationSeparate { .. }
                | NativeCall::Scissor { .. }
                | NativeCall::Viewport { .. }
                | NativeCall::ClearColor(_)
                | NativeCall::ClearDepth(_)
                | NativeCall::ClearStencil(_)
                | NativeCall::BindFramebuffer { .. }
                | NativeCall::BindBuffer { .. }
                | NativeCall::BindBufferRange { .. }
                | NativeCall::BindVertexArray(_)
                | NativeCall::UseProgram(_)
                | NativeCall::ActiveTexture(_)
                | NativeCall::BindTexture { .. }
        )
    }
}

/// Everything the backend needs from a GL implementation.
pub trait NativeApi {
    fn execute(&self, call: NativeCall<'_>);

    fn create_buffer(&self) -> Result<GlName, FrameworkError>;

    fn create_texture(&self) -> Result<GlName, FrameworkError>;

    fn create_framebuffer(&self) -> Result<GlName, FrameworkError>;

    fn create_vertex_array(&self) -> Result<GlName, FrameworkError>;

    fn create_query(&self) -> Result<GlName, FrameworkError>;

    /// Compiles both shaders and links them into a program.
    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<GlName, FrameworkError>;

    fn uniform_location(&self, program: GlName, name: &str) -> Option<u32>;

    fn uniform_block_index(&self, program: GlName, name: &str) -> Option<u32>;

    fn check_framebuffer_status(&self, target: u32) -> u32;

    fn query_result_available(&self, query: GlName) -> bool;

    fn query_result(&self, query: GlName) -> u32;

    fn get_parameter_i32(&self, parameter: u32) -> i32;
}

fn name(name: GlName) -> Option<NonZeroU32> {
    NonZeroU32::new(name)
}

fn buffer(id: GlName) -> Option<glow::NativeBuffer> {
    name(id).map(glow::NativeBuffer)
}

fn texture(id: GlName) -> Option<glow::NativeTexture> {
    name(id).map(glow::NativeTexture)
}

fn framebuffer(id: GlName) -> Option<glow::NativeFramebuffer> {
    name(id).map(glow::NativeFramebuffer)
}

fn vertex_array(id: GlName) -> Option<glow::NativeVertexArray> {
    name(id).map(glow::NativeVertexArray)
}

fn program(id: GlName) -> Option<glow::NativeProgram> {
    name(id).map(glow::NativeProgram)
}

fn query(id: GlName) -> Option<glow::NativeQuery> {
    name(id).map(glow::NativeQuery)
}

fn location(location: u32) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(location)
}

impl NativeApi for glow::Context {
    fn execute(&self, call: NativeCall<'_>) {
        unsafe {
            match call {
                NativeCall::Enable(cap) => self.enable(cap),
                NativeCall::Disable(cap) => self.disable(cap),
                NativeCall::DepthMask(flag) => self.depth_mask(flag),
                NativeCall::DepthFunc(func) => self.depth_func(func),
                NativeCall::ColorMask {
                    red,
                    green,
                    blue,
                    alpha,
                } => self.color_mask(red, green, blue, alpha),
                NativeCall::StencilFunc {
                    func,
                    ref_value,
                    mask,
                } => self.stencil_func(func, ref_value, mask),
                NativeCall::StencilOpSeparate {
                    face,
                    fail,
                    zfail,
                    zpass,
                } => self.stencil_op_separate(face, fail, zfail, zpass),
                NativeCall::StencilMask(mask) => self.stencil_mask(mask),
                NativeCall::CullFace(face) => self.cull_face(face),
                NativeCall::BlendFuncSeparate {
                    src_rgb,
                    dst_rgb,
                    src_alpha,
                    dst_alpha,
                } => self.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha),
                NativeCall::BlendEquationSeparate { rgb, alpha } => {
                    self.blend_equation_separate(rgb, alpha)
                }
                NativeCall::Scissor {
                    x,
                    y,
                    width,
                    height,
                } => self.scissor(x, y, width, height),
                NativeCall::Viewport {
                    x,
                    y,
                    width,
                    height,
                } => self.viewport(x, y, width, height),
                NativeCall::ClearColor([r, g, b, a]) => self.clear_color(r, g, b, a),
                NativeCall::ClearDepth(depth) => self.clear_depth_f32(depth),
                NativeCall::ClearStencil(stencil) => self.clear_stencil(stencil),
                NativeCall::Clear(mask) => self.clear(mask),
                NativeCall::BindFramebuffer {
                    target,
                    framebuffer: fbo,
                } => self.bind_framebuffer(target, framebuffer(fbo)),
                NativeCall::DrawBuffers(buffers) => self.draw_buffers(&buffers),
                NativeCall::ReadBuffer(src) => self.read_buffer(src),
                NativeCall::FramebufferTexture2D {
                    target,
                    attachment,
                    texture_target,
                    texture: tex,
                    level,
                } => self.framebuffer_texture_2d(
                    target,
                    attachment,
                    texture_target,
                    texture(tex),
                    level,
                ),
                NativeCall::BlitFramebuffer {
                    src,
                    dst,
                    mask,
                    filter,
                } => self.blit_framebuffer(
                    src[0], src[1], src[2], src[3], dst[0], dst[1], dst[2], dst[3], mask, filter,
                ),
                NativeCall::BindBuffer { target, buffer: id } => {
                    self.bind_buffer(target, buffer(id))
                }
                NativeCall::BindBufferRange {
                    target,
                    index,
                    buffer: id,
                    offset,
                    size,
                } => self.bind_buffer_range(target, index, buffer(id), offset, size),
                NativeCall::BufferData {
                    target,
                    size,
                    data,
                    usage,
                } => match data {
                    Some(data) => self.buffer_data_u8_slice(target, &data, usage),
                    None => self.buffer_data_size(target, size as i32, usage),
                },
                NativeCall::BufferSubData {
                    target,
                    offset,
                    data,
                } => self.buffer_sub_data_u8_slice(target, offset as i32, &data),
                NativeCall::BindVertexArray(id) => self.bind_vertex_array(vertex_array(id)),
                NativeCall::EnableVertexAttribArray(index) => {
                    self.enable_vertex_attrib_array(index)
                }
                NativeCall::VertexAttribPointer {
                    index,
                    size,
                    data_type,
                    normalized,
                    stride,
                    offset,
                } => self
                    .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset),
                NativeCall::VertexAttribDivisor { index, divisor } => {
                    self.vertex_attrib_divisor(index, divisor)
                }
                NativeCall::UseProgram(id) => self.use_program(program(id)),
                NativeCall::UniformBlockBinding {
                    program: id,
                    index,
                    binding,
                } => {
                    if let Some(program) = program(id) {
                        self.uniform_block_binding(program, index, binding)
                    }
                }
                NativeCall::Uniform1I32 {
                    location: l,
                    value,
                } => self.uniform_1_i32(Some(&location(l)), value),
                NativeCall::Uniform1F32 {
                    location: l,
                    value,
                } => self.uniform_1_f32(Some(&location(l)), value),
                NativeCall::Uniform2F32 {
                    location: l,
                    value,
                } => self.uniform_2_f32(Some(&location(l)), value[0], value[1]),
                NativeCall::Uniform3F32 {
                    location: l,
                    value,
                } => self.uniform_3_f32(Some(&location(l)), value[0], value[1], value[2]),
                NativeCall::Uniform4F32 {
                    location: l,
                    value,
                } => self.uniform_4_f32(Some(&location(l)), value[0], value[1], value[2], value[3]),
                NativeCall::UniformMatrix4F32 {
                    location: l,
                    value,
                } => self.uniform_matrix_4_f32_slice(Some(&location(l)), false, &value),
                NativeCall::ActiveTexture(unit) => self.active_texture(glow::TEXTURE0 + unit),
                NativeCall::BindTexture {
                    target,
                    texture: id,
                } => self.bind_texture(target, texture(id)),
                NativeCall::TexParameterI32 {
                    target,
                    parameter,
                    value,
                } => self.tex_parameter_i32(target, parameter, value),
                NativeCall::PixelStoreI32 { parameter, value } => {
                    self.pixel_store_i32(parameter, value)
                }
                NativeCall::TexImage2D {
                    target,
                    level,
                    internal_format,
                    width,
                    height,
                    format,
                    data_type,
                    data,
                } => self.tex_image_2d(
                    target,
                    level,
                    internal_format,
                    width,
                    height,
                    0,
                    format,
                    data_type,
                    data.as_deref(),
                ),
                NativeCall::TexSubImage2D {
                    target,
                    level,
                    x,
                    y,
                    width,
                    height,
                    format,
                    data_type,
                    data,
                } => self.tex_sub_image_2d(
                    target,
                    level,
                    x,
                    y,
                    width,
                    height,
                    format,
                    data_type,
                    glow::PixelUnpackData::Slice(&data),
                ),
                NativeCall::GenerateMipmap(target) => self.generate_mipmap(target),
                NativeCall::DrawArrays { mode, first, count } => {
                    self.draw_arrays(mode, first, count)
                }
                NativeCall::DrawArraysInstanced {
                    mode,
                    first,
                    count,
                    instances,
                } => self.draw_arrays_instanced(mode, first, count, instances),
                NativeCall::DrawElements {
                    mode,
                    count,
                    element_type,
                    offset,
                } => self.draw_elements(mode, count, element_type, offset),
                NativeCall::DrawElementsBaseVertex {
                    mode,
                    count,
                    element_type,
                    offset,
                    base_vertex,
                } => self.draw_elements_base_vertex(mode, count, element_type, offset, base_vertex),
                NativeCall::BeginQuery { target, query: id } => {
                    if let Some(query) = query(id) {
                        self.begin_query(target, query)
                    }
                }
                NativeCall::EndQuery(target) => self.end_query(target),
                NativeCall::DeleteBuffer(id) => {
                    if let Some(buffer) = buffer(id) {
                        self.delete_buffer(buffer)
                    }
                }
                NativeCall::DeleteTexture(id) => {
                    if let Some(texture) = texture(id) {
                        self.delete_texture(texture)
                    }
                }
                NativeCall::DeleteFramebuffer(id) => {
                    if let Some(framebuffer) = framebuffer(id) {
                        self.delete_framebuffer(framebuffer)
                    }
                }
                NativeCall::DeleteVertexArray(id) => {
                    if let Some(vertex_array) = vertex_array(id) {
                        self.delete_vertex_array(vertex_array)
                    }
                }
                NativeCall::DeleteProgram(id) => {
                    if let Some(program) = program(id) {
                        self.delete_program(program)
                    }
                }
                NativeCall::DeleteQuery(id) => {
                    if let Some(query) = query(id) {
                        self.delete_query(query)
                    }
                }
                NativeCall::Flush => self.flush(),
                NativeCall::Finish => self.finish(),
            }
        }
    }

    fn create_buffer(&self) -> Result<GlName, FrameworkError> {
        unsafe { Ok(HasContext::create_buffer(self)?.0.get()) }
    }

    fn create_texture(&self) -> Result<GlName, FrameworkError> {
        unsafe { Ok(HasContext::create_texture(self)?.0.get()) }
    }

    fn create_framebuffer(&self) -> Result<GlName, FrameworkError> {
        unsafe { Ok(HasContext::create_framebuffer(self)?.0.get()) }
    }

    fn create_vertex_array(&self) -> Result<GlName, FrameworkError> {
        unsafe { Ok(HasContext::create_vertex_array(self)?.0.get()) }
    }

    fn create_query(&self) -> Result<GlName, FrameworkError> {
        unsafe { Ok(HasContext::create_query(self)?.0.get()) }
    }

    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<GlName, FrameworkError> {
        unsafe {
            let vertex_shader = create_shader(
                self,
                format!("{name}_VertexShader"),
                glow::VERTEX_SHADER,
                vertex_source,
            )?;
            let fragment_shader = create_shader(
                self,
                format!("{name}_FragmentShader"),
                glow::FRAGMENT_SHADER,
                fragment_source,
            )?;
            let program = HasContext::create_program(self)?;
            self.attach_shader(program, vertex_shader);
            self.delete_shader(vertex_shader);
            self.attach_shader(program, fragment_shader);
            self.delete_shader(fragment_shader);
            self.link_program(program);
            let status = self.get_program_link_status(program);
            let link_message = self.get_program_info_log(program);

            if !status {
                self.delete_program(program);
                Err(FrameworkError::ShaderLinkingFailed {
                    shader_name: name.to_owned(),
                    error_message: link_message,
                })
            } else {
                let msg = if link_message.is_empty()
                    || link_message.chars().all(|c| c.is_whitespace())
                {
                    format!("Shader {name} linked successfully!")
                } else {
                    format!("Shader {name} linked successfully!\nAdditional info: {link_message}")
                };

                ember_core::log::Log::info(msg);

                Ok(program.0.get())
            }
        }
    }

    fn uniform_location(&self, program_id: GlName, name: &str) -> Option<u32> {
        let program = program(program_id)?;
        unsafe { self.get_uniform_location(program, name).map(|l| l.0) }
    }

    fn uniform_block_index(&self, program_id: GlName, name: &str) -> Option<u32> {
        let program = program(program_id)?;
        unsafe { self.get_uniform_block_index(program, name) }
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { HasContext::check_framebuffer_status(self, target) }
    }

    fn query_result_available(&self, id: GlName) -> bool {
        query(id).is_some_and(|q| unsafe {
            self.get_query_parameter_u32(q, glow::QUERY_RESULT_AVAILABLE) > 0
        })
    }

    fn query_result(&self, id: GlName) -> u32 {
        query(id).map_or(0, |q| unsafe {
            self.get_query_parameter_u32(q, glow::QUERY_RESULT)
        })
    }

    fn get_parameter_i32(&self, parameter: u32) -> i32 {
        unsafe { HasContext::get_parameter_i32(self, parameter) }
    }
}

unsafe fn create_shader(
    gl: &glow::Context,
    name: String,
    actual_type: u32,
    source: &str,
) -> Result<glow::Shader, FrameworkError> {
    let shader = gl.create_shader(actual_type)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    let status = gl.get_shader_compile_status(shader);
    let compilation_message = gl.get_shader_info_log(shader);

    if !status {
        ember_core::err!("Failed to compile {name} shader: {compilation_message}");
        gl.delete_shader(shader);
        Err(FrameworkError::ShaderCompilationFailed {
            shader_name: name,
            error_message: compilation_message,
        })
    } else {
        let msg = if compilation_message.is_empty()
            || compilation_message.chars().all(|c| c.is_whitespace())
        {
            format!("Shader {name} compiled successfully!")
        } else {
            format!("Shader {name} compiled successfully!\nAdditional info: {compilation_message}")
        };

        ember_core::log::Log::info(msg);

        Ok(shader)
    }
}
