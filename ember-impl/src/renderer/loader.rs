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

//! Sources of shader text and other files the renderer reads at runtime.

use crate::{
    core::warn,
    graphics::{gpu_program::GpuProgram, server::GraphicsServer},
    renderer::RendererError,
};
use std::{path::PathBuf, rc::Rc};

/// Provides file contents by name.
pub trait FileLoader {
    /// Returns the contents of the file, or an empty vector if the file could not be read.
    fn file_contents(&self, name: &str) -> Vec<u8>;
}

/// Reads files relative to a root directory.
pub struct FsFileLoader {
    root: PathBuf,
}

impl FsFileLoader {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl FileLoader for FsFileLoader {
    fn file_contents(&self, name: &str) -> Vec<u8> {
        let path = self.root.join(name);
        match std::fs::read(&path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!("Unable to read {}. Reason: {err}", path.display());
                Vec::new()
            }
        }
    }
}

static EMBEDDED_FILES: &[(&str, &str)] = &[
    ("gbuffer_vs.glsl", include_str!("shaders/gbuffer_vs.glsl")),
    ("gbuffer_fs.glsl", include_str!("shaders/gbuffer_fs.glsl")),
    ("shadow_vs.glsl", include_str!("shaders/shadow_vs.glsl")),
    ("shadow_fs.glsl", include_str!("shaders/shadow_fs.glsl")),
    ("light_vs.glsl", include_str!("shaders/light_vs.glsl")),
    ("light_fs.glsl", include_str!("shaders/light_fs.glsl")),
    ("vg_vs.glsl", include_str!("shaders/vg_vs.glsl")),
    ("vg_fs.glsl", include_str!("shaders/vg_fs.glsl")),
];

/// Serves the built-in shaders compiled into the binary.
#[derive(Default, Copy, Clone, Debug)]
pub struct EmbeddedFileLoader;

impl FileLoader for EmbeddedFileLoader {
    fn file_contents(&self, name: &str) -> Vec<u8> {
        EMBEDDED_FILES
            .iter()
            .find(|(file_name, _)| *file_name == name)
            .map(|(_, contents)| contents.as_bytes().to_vec())
            .unwrap_or_default()
    }
}

/// Tries the loaders in order and returns the first non-empty result. Allows overriding some of
/// the built-in shaders from disk.
pub struct ChainFileLoader {
    loaders: Vec<Box<dyn FileLoader>>,
}

impl ChainFileLoader {
    pub fn new(loaders: Vec<Box<dyn FileLoader>>) -> Self {
        Self { loaders }
    }
}

impl FileLoader for ChainFileLoader {
    fn file_contents(&self, name: &str) -> Vec<u8> {
        self.loaders
            .iter()
            .map(|loader| loader.file_contents(name))
            .find(|contents| !contents.is_empty())
            .unwrap_or_default()
    }
}

fn shader_source(loader: &dyn FileLoader, file_name: String) -> Result<String, RendererError> {
    let contents = loader.file_contents(&file_name);
    if contents.is_empty() {
        return Err(RendererError::ShaderSourceNotFound(file_name));
    }
    String::from_utf8(contents).map_err(|_| RendererError::ShaderSourceNotFound(file_name))
}

/// Loads `{name}_vs.glsl` and `{name}_fs.glsl` and links them into a program.
pub fn load_program(
    server: &dyn GraphicsServer,
    loader: &dyn FileLoader,
    name: &str,
) -> Result<Rc<dyn GpuProgram>, RendererError> {
    let vertex_source = shader_source(loader, format!("{name}_vs.glsl"))?;
    let fragment_source = shader_source(loader, format!("{name}_fs.glsl"))?;
    Ok(server.create_program(name, &vertex_source, &fragment_source)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::gl::server::GlGraphicsServer;

    struct MapLoader(&'static str, &'static str);

    impl FileLoader for MapLoader {
        fn file_contents(&self, name: &str) -> Vec<u8> {
            if name == self.0 {
                self.1.as_bytes().to_vec()
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn test_embedded_shaders_link() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        for name in ["gbuffer", "shadow", "light", "vg"] {
            let program = load_program(&*server, &EmbeddedFileLoader, name).unwrap();
            assert_eq!(program.name(), name);
        }
    }

    #[test]
    fn test_missing_source() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        assert!(matches!(
            load_program(&*server, &EmbeddedFileLoader, "missing"),
            Err(RendererError::ShaderSourceNotFound(name)) if name == "missing_vs.glsl"
        ));
        assert!(EmbeddedFileLoader.file_contents("missing").is_empty());
        assert!(FsFileLoader::new("definitely/not/here")
            .file_contents("file.glsl")
            .is_empty());
    }

    #[test]
    fn test_chain_prefers_first_non_empty() {
        let loader = ChainFileLoader::new(vec![
            Box::new(MapLoader("light_fs.glsl", "override")),
            Box::new(EmbeddedFileLoader),
        ]);
        assert_eq!(loader.file_contents("light_fs.glsl"), b"override");
        assert!(!loader.file_contents("light_vs.glsl").is_empty());
    }
}
