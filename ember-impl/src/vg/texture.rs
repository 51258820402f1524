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

//! Textures of the vector renderer, addressed by integer ids. Id `0` means "no image".

use crate::{
    core::fxhash::FxHashMap,
    graphics::{
        gpu_texture::{
            GpuTexture, GpuTextureDescriptor, GpuTextureKind, MagnificationFilter,
            MinificationFilter, PixelKind, WrapMode,
        },
        server::GraphicsServer,
    },
    renderer::RendererError,
};
use bitflags::bitflags;
use std::rc::Rc;

bitflags! {
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
    pub struct ImageFlags: u32 {
        const GENERATE_MIPMAPS = 1;
        const REPEAT_X = 1 << 1;
        const REPEAT_Y = 1 << 2;
        /// Flips the image vertically when it is used as a paint.
        const FLIP_Y = 1 << 3;
        /// The pixels already have their color multiplied by alpha.
        const PREMULTIPLIED = 1 << 4;
        const NEAREST = 1 << 5;
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum VgTextureKind {
    /// Single channel coverage, used for font atlases.
    Alpha,
    Rgba,
}

impl VgTextureKind {
    fn pixel_kind(self) -> PixelKind {
        match self {
            VgTextureKind::Alpha => PixelKind::R8,
            VgTextureKind::Rgba => PixelKind::RGBA8,
        }
    }
}

pub struct VgTexture {
    pub(crate) texture: Rc<dyn GpuTexture>,
    pub(crate) kind: VgTextureKind,
    pub(crate) flags: ImageFlags,
}

impl VgTexture {
    /// Value of `texType` in the paint block.
    pub(crate) fn shader_tex_type(&self) -> i32 {
        match self.kind {
            VgTextureKind::Rgba if self.flags.contains(ImageFlags::PREMULTIPLIED) => 0,
            VgTextureKind::Rgba => 1,
            VgTextureKind::Alpha => 2,
        }
    }
}

#[derive(Default)]
pub struct TextureRegistry {
    textures: FxHashMap<i32, VgTexture>,
    next_id: i32,
}

impl TextureRegistry {
    pub fn create(
        &mut self,
        server: &dyn GraphicsServer,
        kind: VgTextureKind,
        width: u32,
        height: u32,
        flags: ImageFlags,
        data: Option<&[u8]>,
    ) -> Result<i32, RendererError> {
        let mipmaps = flags.contains(ImageFlags::GENERATE_MIPMAPS);
        let nearest = flags.contains(ImageFlags::NEAREST);
        let min_filter = match (mipmaps, nearest) {
            (true, true) => MinificationFilter::NearestMipMapNearest,
            (true, false) => MinificationFilter::LinearMipMapLinear,
            (false, true) => MinificationFilter::Nearest,
            (false, false) => MinificationFilter::Linear,
        };
        let wrap = |repeat: bool| {
            if repeat {
                WrapMode::Repeat
            } else {
                WrapMode::ClampToEdge
            }
        };

        let texture = server.create_texture(GpuTextureDescriptor {
            kind: GpuTextureKind::Rectangle {
                width: width.max(1),
                height: height.max(1),
            },
            pixel_kind: kind.pixel_kind(),
            min_filter,
            mag_filter: if nearest {
                MagnificationFilter::Nearest
            } else {
                MagnificationFilter::Linear
            },
            s_wrap_mode: wrap(flags.contains(ImageFlags::REPEAT_X)),
            t_wrap_mode: wrap(flags.contains(ImageFlags::REPEAT_Y)),
            data,
            ..Default::default()
        })?;
        if mipmaps && data.is_some() {
            texture.generate_mipmaps()?;
        }

        self.next_id += 1;
        let id = self.next_id;
        self.textures.insert(
            id,
            VgTexture {
                texture,
                kind,
                flags,
            },
        );
        Ok(id)
    }

    /// Replaces a region of the texture with `data`, which holds exactly `width * height` pixels.
    pub fn update(
        &mut self,
        id: i32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), RendererError> {
        let texture = self.get(id)?;
        texture.texture.set_region(x, y, width, height, data)?;
        if texture.flags.contains(ImageFlags::GENERATE_MIPMAPS) {
            texture.texture.generate_mipmaps()?;
        }
        Ok(())
    }

    pub fn delete(&mut self, id: i32) -> Result<(), RendererError> {
        self.textures
            .remove(&id)
            .map(|_| ())
            .ok_or(RendererError::TextureNotFound(id))
    }

    pub fn get(&self, id: i32) -> Result<&VgTexture, RendererError> {
        self.textures
            .get(&id)
            .ok_or(RendererError::TextureNotFound(id))
    }

    pub fn size(&self, id: i32) -> Result<(u32, u32), RendererError> {
        Ok(self.get(id)?.texture.size())
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::gl::server::GlGraphicsServer;

    #[test]
    fn test_texture_lifecycle() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let mut registry = TextureRegistry::default();
        let font = registry
            .create(
                &*server,
                VgTextureKind::Alpha,
                4,
                2,
                ImageFlags::empty(),
                Some(&[0; 8]),
            )
            .unwrap();
        let image = registry
            .create(
                &*server,
                VgTextureKind::Rgba,
                2,
                2,
                ImageFlags::GENERATE_MIPMAPS | ImageFlags::PREMULTIPLIED,
                None,
            )
            .unwrap();
        assert_eq!((font, image), (1, 2));
        assert_eq!(registry.size(font).unwrap(), (4, 2));
        assert_eq!(registry.get(font).unwrap().shader_tex_type(), 2);
        assert_eq!(registry.get(image).unwrap().shader_tex_type(), 0);

        registry.update(font, 1, 0, 2, 2, &[255; 4]).unwrap();
        registry.update(image, 0, 0, 1, 1, &[255; 4]).unwrap();
        assert!(registry.get(image).unwrap().texture.mip_count() > 1);
        assert!(registry.update(font, 3, 0, 2, 2, &[255; 4]).is_err());

        registry.delete(font).unwrap();
        assert!(matches!(
            registry.size(font),
            Err(RendererError::TextureNotFound(1))
        ));
        assert!(registry.delete(font).is_err());
        // Ids are never reused.
        let next = registry
            .create(&*server, VgTextureKind::Rgba, 1, 1, ImageFlags::empty(), None)
            .unwrap();
        assert_eq!(next, 3);
        assert_eq!(registry.len(), 2);
    }
}
