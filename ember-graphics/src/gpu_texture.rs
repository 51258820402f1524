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

use crate::{error::FrameworkError, CompareFunc};
use std::any::Any;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GpuTextureKind {
    Rectangle { width: u32, height: u32 },
    Cube { size: u32 },
}

impl GpuTextureKind {
    /// Size of the first mip level.
    pub fn size(self) -> (u32, u32) {
        match self {
            GpuTextureKind::Rectangle { width, height } => (width, height),
            GpuTextureKind::Cube { size } => (size, size),
        }
    }

    fn face_count(self) -> usize {
        match self {
            GpuTextureKind::Rectangle { .. } => 1,
            GpuTextureKind::Cube { .. } => 6,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PixelKind {
    R8,
    RG8,
    RGBA8,
    SRGBA8,
    R32F,
    RGBA16F,
    RGBA32F,
    D32F,
    D24S8,
}

impl PixelKind {
    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::R8 => 1,
            Self::RG8 => 2,
            Self::RGBA8 | Self::SRGBA8 | Self::R32F | Self::D32F | Self::D24S8 => 4,
            Self::RGBA16F => 8,
            Self::RGBA32F => 16,
        }
    }

    pub fn unpack_alignment(self) -> i32 {
        match self {
            Self::R8 => 1,
            Self::RG8 => 2,
            _ => 4,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(self, Self::D32F | Self::D24S8)
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, Self::D24S8)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum MinificationFilter {
    Nearest,
    NearestMipMapNearest,
    NearestMipMapLinear,
    #[default]
    Linear,
    LinearMipMapNearest,
    LinearMipMapLinear,
}

impl MinificationFilter {
    pub fn is_mipmapped(self) -> bool {
        !matches!(self, Self::Nearest | Self::Linear)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum MagnificationFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Returns the amount of bytes a mip chain of the given texture occupies.
pub fn image_size_bytes(kind: GpuTextureKind, pixel_kind: PixelKind, mip_count: usize) -> usize {
    let (width, height) = kind.size();
    let mut total = 0;
    for mip in 0..mip_count.max(1) {
        let w = (width >> mip).max(1) as usize;
        let h = (height >> mip).max(1) as usize;
        total += w * h * pixel_kind.size_in_bytes();
        if width >> mip <= 1 && height >> mip <= 1 {
            break;
        }
    }
    total * kind.face_count()
}

pub struct GpuTextureDescriptor<'a> {
    pub kind: GpuTextureKind,
    pub pixel_kind: PixelKind,
    pub min_filter: MinificationFilter,
    pub mag_filter: MagnificationFilter,
    pub s_wrap_mode: WrapMode,
    pub t_wrap_mode: WrapMode,
    pub mip_count: usize,
    /// Enables hardware depth comparison when the texture is sampled with a shadow sampler.
    pub compare_mode: Option<CompareFunc>,
    pub data: Option<&'a [u8]>,
}

impl Default for GpuTextureDescriptor<'_> {
    fn default() -> Self {
        Self {
            kind: GpuTextureKind::Rectangle {
                width: 1,
                height: 1,
            },
            pixel_kind: PixelKind::RGBA8,
            min_filter: Default::default(),
            mag_filter: Default::default(),
            s_wrap_mode: Default::default(),
            t_wrap_mode: Default::default(),
            mip_count: 1,
            compare_mode: None,
            data: None,
        }
    }
}

/// Backend-agnostic GPU texture.
pub trait GpuTexture: Any {
    fn as_any(&self) -> &dyn Any;

    fn kind(&self) -> GpuTextureKind;

    fn pixel_kind(&self) -> PixelKind;

    fn mip_count(&self) -> usize;

    /// Reallocates the texture storage and optionally fills it with data. `None` data leaves the
    /// content undefined, which is fine for render targets.
    fn set_data(
        &self,
        kind: GpuTextureKind,
        pixel_kind: PixelKind,
        mip_count: usize,
        data: Option<&[u8]>,
    ) -> Result<(), FrameworkError>;

    /// Overwrites a rectangular region of the first mip level of a rectangle texture.
    fn set_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), FrameworkError>;

    /// Fills every mip level below the first one from the first level and extends the mip chain
    /// to its full length.
    fn generate_mipmaps(&self) -> Result<(), FrameworkError>;

    fn size(&self) -> (u32, u32) {
        self.kind().size()
    }
}

/// Checks that the data has exactly the size required for the given texture parameters.
pub fn validate_texture_data(
    kind: GpuTextureKind,
    pixel_kind: PixelKind,
    mip_count: usize,
    data: Option<&[u8]>,
) -> Result<(), FrameworkError> {
    if let Some(data) = data {
        let expected_data_size = image_size_bytes(kind, pixel_kind, mip_count);
        if data.len() != expected_data_size {
            return Err(FrameworkError::InvalidTextureData {
                expected_data_size,
                actual_data_size: data.len(),
            });
        }
    }
    Ok(())
}

/// Checks that the region lies inside the texture and the data covers the region exactly.
pub fn validate_texture_region(
    texture_size: (u32, u32),
    pixel_kind: PixelKind,
    (x, y, width, height): (u32, u32, u32, u32),
    data: &[u8],
) -> Result<(), FrameworkError> {
    if x.saturating_add(width) > texture_size.0 || y.saturating_add(height) > texture_size.1 {
        return Err(FrameworkError::InvalidTextureRegion {
            x,
            y,
            width,
            height,
        });
    }
    let expected_data_size = width as usize * height as usize * pixel_kind.size_in_bytes();
    if data.len() != expected_data_size {
        return Err(FrameworkError::InvalidTextureData {
            expected_data_size,
            actual_data_size: data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_image_size() {
        let kind = GpuTextureKind::Rectangle {
            width: 4,
            height: 2,
        };
        assert_eq!(image_size_bytes(kind, PixelKind::RGBA8, 1), 32);
        // 4x2 + 2x1 + 1x1
        assert_eq!(image_size_bytes(kind, PixelKind::R8, 8), 11);
        assert_eq!(
            image_size_bytes(GpuTextureKind::Cube { size: 2 }, PixelKind::R8, 1),
            24
        );
    }

    #[test]
    fn test_validation() {
        let kind = GpuTextureKind::Rectangle {
            width: 2,
            height: 2,
        };
        assert!(validate_texture_data(kind, PixelKind::RGBA8, 1, Some(&[0; 16])).is_ok());
        assert!(matches!(
            validate_texture_data(kind, PixelKind::RGBA8, 1, Some(&[0; 15])),
            Err(FrameworkError::InvalidTextureData {
                expected_data_size: 16,
                actual_data_size: 15
            })
        ));
        assert!(validate_texture_data(kind, PixelKind::RGBA8, 1, None).is_ok());
        assert!(matches!(
            validate_texture_region((2, 2), PixelKind::R8, (1, 1, 2, 1), &[0; 2]),
            Err(FrameworkError::InvalidTextureRegion { .. })
        ));
        assert!(validate_texture_region((2, 2), PixelKind::R8, (1, 0, 1, 2), &[0; 2]).is_ok());
    }
}
