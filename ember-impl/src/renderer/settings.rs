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

//! Renderer settings. Persisted in RON format.

use crate::{core::info, renderer::RendererError};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};

/// Parameters of the deferred lighting pipeline.
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(default)]
pub struct LightingSettings {
    /// Light intensity below which a point light is considered to have no effect. Defines the
    /// radius of the light volume.
    pub light_cutoff: f32,
    /// Scale applied to the influence radius of a point light to get the radius of its proxy
    /// sphere. The sphere is a polygonal approximation, so it must be a bit larger.
    pub volume_scale: f32,
    /// Width and height of every shadow map in pixels.
    pub shadow_map_size: u32,
    /// Half-size of the orthographic shadow projection box.
    pub shadow_extent: f32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    /// Depth bias used when sampling shadow maps.
    pub shadow_bias: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            light_cutoff: 0.01,
            volume_scale: 1.2,
            shadow_map_size: 2048,
            shadow_extent: 20.0,
            shadow_near: 0.1,
            shadow_far: 100.0,
            shadow_bias: 0.0025,
        }
    }
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(default)]
pub struct VectorSettings {
    /// Draws anti-aliased fringes of fills.
    pub antialias: bool,
    /// Uses the stencil buffer to avoid double blending of overlapping stroke segments.
    pub stencil_strokes: bool,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            antialias: true,
            stencil_strokes: true,
        }
    }
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug, Default)]
#[serde(default)]
pub struct ProfilerSettings {
    pub enabled: bool,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug, Default)]
#[serde(default)]
pub struct RendererSettings {
    pub lighting: LightingSettings,
    pub vector: VectorSettings,
    pub profiler: ProfilerSettings,
}

impl RendererSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RendererError> {
        let file = File::open(path.as_ref())?;
        let settings = ron::de::from_reader(file)?;
        info!(
            "Renderer settings were loaded from {}",
            path.as_ref().display()
        );
        Ok(settings)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RendererError> {
        let file = File::create(path.as_ref())?;
        ron::ser::to_writer_pretty(file, self, PrettyConfig::default())?;
        info!("Renderer settings were saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_save_load() {
        let path = std::env::temp_dir().join(format!(
            "ember_renderer_settings_{}.ron",
            std::process::id()
        ));
        let mut settings = RendererSettings::default();
        settings.lighting.shadow_map_size = 512;
        settings.vector.stencil_strokes = false;
        settings.save(&path).unwrap();
        let loaded = RendererSettings::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: RendererSettings =
            ron::from_str("(lighting: (light_cutoff: 0.05))").unwrap();
        assert_eq!(settings.lighting.light_cutoff, 0.05);
        assert_eq!(settings.lighting.volume_scale, 1.2);
        assert!(settings.vector.antialias);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            RendererSettings::load("definitely/not/here.ron"),
            Err(RendererError::Io(_))
        ));
    }
}
