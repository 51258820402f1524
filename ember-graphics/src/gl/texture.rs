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
    error::FrameworkError,
    gl::{native::NativeCall, state::StateTracker, GlName, ToGlConstant},
    gpu_texture::{
        image_size_bytes, validate_texture_data, validate_texture_region, GpuTexture,
        GpuTextureDescriptor, GpuTextureKind, MagnificationFilter, MinificationFilter, PixelKind,
        WrapMode,
    },
};
use std::{
    any::Any,
    borrow::Cow,
    cell::Cell,
    rc::{Rc, Weak},
};

/// Unit used for uploads and parameter changes. Draws reassign units anyway.
const UPLOAD_UNIT: u32 = 0;

/// Length of the full mip chain of a texture.
fn max_mip_count(kind: GpuTextureKind) -> usize {
    let (width, height) = kind.size();
    (u32::BITS - width.max(height).max(1).leading_zeros()) as usize
}

impl ToGlConstant for MinificationFilter {
    fn into_gl(self) -> u32 {
        match self {
            Self::Nearest => glow::NEAREST,
            Self::NearestMipMapNearest => glow::NEAREST_MIPMAP_NEAREST,
            Self::NearestMipMapLinear => glow::NEAREST_MIPMAP_LINEAR,
            Self::Linear => glow::LINEAR,
            Self::LinearMipMapNearest => glow::LINEAR_MIPMAP_NEAREST,
            Self::LinearMipMapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }
    }
}

impl ToGlConstant for MagnificationFilter {
    fn into_gl(self) -> u32 {
        match self {
            Self::Nearest => glow::NEAREST,
            Self::Linear => glow::LINEAR,
        }
    }
}

impl ToGlConstant for WrapMode {
    fn into_gl(self) -> u32 {
        match self {
            Self::Repeat => glow::REPEAT,
            Self::ClampToEdge => glow::CLAMP_TO_EDGE,
            Self::MirroredRepeat => glow::MIRRORED_REPEAT,
        }
    }
}

impl ToGlConstant for GpuTextureKind {
    fn into_gl(self) -> u32 {
        match self {
            Self::Rectangle { .. } => glow::TEXTURE_2D,
            Self::Cube { .. } => glow::TEXTURE_CUBE_MAP,
        }
    }
}

pub(crate) struct PixelDescriptor {
    pub data_type: u32,
    pub format: u32,
    pub internal_format: u32,
}

pub(crate) fn pixel_descriptor(pixel_kind: PixelKind) -> PixelDescriptor {
    let (data_type, format, internal_format) = match pixel_kind {
        PixelKind::R8 => (glow::UNSIGNED_BYTE, glow::RED, glow::R8),
        PixelKind::RG8 => (glow::UNSIGNED_BYTE, glow::RG, glow::RG8),
        PixelKind::RGBA8 => (glow::UNSIGNED_BYTE, glow::RGBA, glow::RGBA8),
        PixelKind::SRGBA8 => (glow::UNSIGNED_BYTE, glow::RGBA, glow::SRGB8_ALPHA8),
        PixelKind::R32F => (glow::FLOAT, glow::RED, glow::R32F),
        PixelKind::RGBA16F => (glow::HALF_FLOAT, glow::RGBA, glow::RGBA16F),
        PixelKind::RGBA32F => (glow::FLOAT, glow::RGBA, glow::RGBA32F),
        PixelKind::D32F => (glow::FLOAT, glow::DEPTH_COMPONENT, glow::DEPTH_COMPONENT32F),
        PixelKind::D24S8 => (
            glow::UNSIGNED_INT_24_8,
            glow::DEPTH_STENCIL,
            glow::DEPTH24_STENCIL8,
        ),
    };
    PixelDescriptor {
        data_type,
        format,
        internal_format,
    }
}

pub struct GlTexture {
    state: Weak<StateTracker>,
    pub id: GlName,
    kind: Cell<GpuTextureKind>,
    pixel_kind: Cell<PixelKind>,
    mip_count: Cell<usize>,
}

impl GlTexture {
    pub fn new(
        state: &Rc<StateTracker>,
        desc: GpuTextureDescriptor,
    ) -> Result<Self, FrameworkError> {
        let mip_count = desc.mip_count.clamp(1, max_mip_count(desc.kind));
        validate_texture_data(desc.kind, desc.pixel_kind, mip_count, desc.data)?;

        let id = state.api().create_texture()?;
        let texture = Self {
            state: Rc::downgrade(state),
            id,
            kind: Cell::new(desc.kind),
            pixel_kind: Cell::new(desc.pixel_kind),
            mip_count: Cell::new(mip_count),
        };

        let target = desc.kind.into_gl();
        state.set_texture(UPLOAD_UNIT, target, id)?;
        let mut parameters = vec![
            (glow::TEXTURE_MIN_FILTER, desc.min_filter.into_gl()),
            (glow::TEXTURE_MAG_FILTER, desc.mag_filter.into_gl()),
            (glow::TEXTURE_WRAP_S, desc.s_wrap_mode.into_gl()),
            (glow::TEXTURE_WRAP_T, desc.t_wrap_mode.into_gl()),
        ];
        if let GpuTextureKind::Cube { .. } = desc.kind {
            parameters.push((glow::TEXTURE_WRAP_R, glow::CLAMP_TO_EDGE));
        }
        if let Some(compare_func) = desc.compare_mode {
            parameters.push((glow::TEXTURE_COMPARE_MODE, glow::COMPARE_REF_TO_TEXTURE));
            parameters.push((glow::TEXTURE_COMPARE_FUNC, compare_func.into_gl()));
        }
        for (parameter, value) in parameters {
            state.execute(NativeCall::TexParameterI32 {
                target,
                parameter,
                value: value as i32,
            });
        }

        texture.upload(state, desc.data)?;

        Ok(texture)
    }

    pub fn target(&self) -> u32 {
        self.kind.get().into_gl()
    }

    fn state(&self) -> Result<Rc<StateTracker>, FrameworkError> {
        self.state
            .upgrade()
            .ok_or_else(|| FrameworkError::Custom("graphics server was destroyed".to_owned()))
    }

    fn upload(&self, state: &StateTracker, data: Option<&[u8]>) -> Result<(), FrameworkError> {
        let kind = self.kind.get();
        let pixel_kind = self.pixel_kind.get();
        let mip_count = self.mip_count.get();
        let target = kind.into_gl();
        let pixel_info = pixel_descriptor(pixel_kind);

        state.set_texture(UPLOAD_UNIT, target, self.id)?;
        state.execute(NativeCall::PixelStoreI32 {
            parameter: glow::UNPACK_ALIGNMENT,
            value: pixel_kind.unpack_alignment(),
        });
        state.execute(NativeCall::TexParameterI32 {
            target,
            parameter: glow::TEXTURE_MAX_LEVEL,
            value: mip_count as i32 - 1,
        });

        let (face_targets, face_count) = match kind {
            GpuTextureKind::Rectangle { .. } => (glow::TEXTURE_2D..glow::TEXTURE_2D + 1, 1),
            GpuTextureKind::Cube { .. } => (
                glow::TEXTURE_CUBE_MAP_POSITIVE_X..glow::TEXTURE_CUBE_MAP_POSITIVE_X + 6,
                6,
            ),
        };
        let face_size = image_size_bytes(kind, pixel_kind, mip_count) / face_count;

        let (width, height) = kind.size();
        for (face, face_target) in face_targets.enumerate() {
            let mut mip_offset = face * face_size;
            for mip in 0..mip_count {
                let level_width = (width >> mip).max(1);
                let level_height = (height >> mip).max(1);
                let level_size =
                    level_width as usize * level_height as usize * pixel_kind.size_in_bytes();
                let level_data =
                    data.map(|data| Cow::Borrowed(&data[mip_offset..mip_offset + level_size]));
                state.execute(NativeCall::TexImage2D {
                    target: face_target,
                    level: mip as i32,
                    internal_format: pixel_info.internal_format as i32,
                    width: level_width as i32,
                    height: level_height as i32,
                    format: pixel_info.format,
                    data_type: pixel_info.data_type,
                    data: level_data,
                });
                mip_offset += level_size;
            }
        }

        Ok(())
    }
}

impl GpuTexture for GlTexture {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> GpuTextureKind {
        self.kind.get()
    }

    fn pixel_kind(&self) -> PixelKind {
        self.pixel_kind.get()
    }

    fn mip_count(&self) -> usize {
        self.mip_count.get()
    }

    fn set_data(
        &self,
        kind: GpuTextureKind,
        pixel_kind: PixelKind,
        mip_count: usize,
        data: Option<&[u8]>,
    ) -> Result<(), FrameworkError> {
        let mip_count = mip_count.clamp(1, max_mip_count(kind));
        validate_texture_data(kind, pixel_kind, mip_count, data)?;
        if kind.into_gl() != self.target() {
            return Err(FrameworkError::Custom(
                "texture kind cannot change its target".to_owned(),
            ));
        }
        self.kind.set(kind);
        self.pixel_kind.set(pixel_kind);
        self.mip_count.set(mip_count);
        self.upload(&*self.state()?, data)
    }

    fn set_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), FrameworkError> {
        if let GpuTextureKind::Cube { .. } = self.kind.get() {
            return Err(FrameworkError::Custom(
                "region updates are supported for rectangle textures only".to_owned(),
            ));
        }
        let pixel_kind = self.pixel_kind.get();
        validate_texture_region(self.size(), pixel_kind, (x, y, width, height), data)?;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let state = self.state()?;
        let pixel_info = pixel_descriptor(pixel_kind);
        state.set_texture(UPLOAD_UNIT, self.target(), self.id)?;
        state.execute(NativeCall::PixelStoreI32 {
            parameter: glow::UNPACK_ALIGNMENT,
            value: pixel_kind.unpack_alignment(),
        });
        state.execute(NativeCall::TexSubImage2D {
            target: glow::TEXTURE_2D,
            level: 0,
            x: x as i32,
            y: y as i32,
            width: width as i32,
            height: height as i32,
            format: pixel_info.format,
            data_type: pixel_info.data_type,
            data: Cow::Borrowed(data),
        });
        Ok(())
    }

    fn generate_mipmaps(&self) -> Result<(), FrameworkError> {
        let state = self.state()?;
        let kind = self.kind.get();
        let target = self.target();
        let mip_count = max_mip_count(kind);
        state.set_texture(UPLOAD_UNIT, target, self.id)?;
        state.execute(NativeCall::TexParameterI32 {
            target,
            parameter: glow::TEXTURE_MAX_LEVEL,
            value: mip_count as i32 - 1,
        });
        state.execute(NativeCall::GenerateMipmap(target));
        self.mip_count.set(mip_count);
        Ok(())
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.forget_texture(self.id);
            state.execute(NativeCall::DeleteTexture(self.id));
        }
    }
}
