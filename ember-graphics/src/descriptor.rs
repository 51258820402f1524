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

//! Descriptor sets: named draw-time parameters resolved against the active program by semantic.

use crate::{
    buffer::Buffer,
    core::algebra::{Matrix4, Vector2, Vector3, Vector4},
    gpu_texture::GpuTexture,
};
use fxhash::FxHashMap;
use std::{fmt::Debug, rc::Rc};
use strum_macros::{AsRefStr, EnumIter};

/// Name of the uniform block that receives push constant data.
pub const PUSH_CONSTANTS_BLOCK: &str = "PushConstants";
/// Binding point of the push constant block.
pub const PUSH_CONSTANTS_BINDING: u32 = 0;

/// Meaning of a parameter. Every semantic maps to exactly one uniform (or uniform block) name in
/// shader code.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, AsRefStr, EnumIter)]
pub enum Semantic {
    ModelMatrix,
    ViewMatrix,
    ProjectionMatrix,
    ViewProjectionMatrix,
    InvViewProjectionMatrix,
    LightViewProjectionMatrix,
    PositionTexture,
    NormalTexture,
    AlbedoTexture,
    DiffuseColor,
    ShadowMap,
    ImageTexture,
    CameraPosition,
    ViewSize,
    FragCoordScale,
    FrameBlock,
    LightBlock,
    PaintBlock,
}

impl Semantic {
    pub fn uniform_name(self) -> &'static str {
        match self {
            Semantic::ModelMatrix => "modelMatrix",
            Semantic::ViewMatrix => "viewMatrix",
            Semantic::ProjectionMatrix => "projectionMatrix",
            Semantic::ViewProjectionMatrix => "viewProjectionMatrix",
            Semantic::InvViewProjectionMatrix => "invViewProjectionMatrix",
            Semantic::LightViewProjectionMatrix => "lightViewProjectionMatrix",
            Semantic::PositionTexture => "positionTexture",
            Semantic::NormalTexture => "normalTexture",
            Semantic::AlbedoTexture => "albedoTexture",
            Semantic::DiffuseColor => "diffuseColor",
            Semantic::ShadowMap => "shadowMap",
            Semantic::ImageTexture => "imageTexture",
            Semantic::CameraPosition => "cameraPosition",
            Semantic::ViewSize => "viewSize",
            Semantic::FragCoordScale => "fragCoordScale",
            Semantic::FrameBlock => "FrameBlock",
            Semantic::LightBlock => "LightBlock",
            Semantic::PaintBlock => "PaintBlock",
        }
    }

    /// Fixed binding point of uniform block semantics, `None` for plain uniforms.
    pub fn block_binding(self) -> Option<u32> {
        match self {
            Semantic::FrameBlock => Some(1),
            Semantic::LightBlock => Some(2),
            Semantic::PaintBlock => Some(3),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub enum ParameterValue {
    Matrix4(Matrix4<f32>),
    Vector2(Vector2<f32>),
    Vector3(Vector3<f32>),
    Vector4(Vector4<f32>),
    Float(f32),
    Int(i32),
    Texture(Rc<dyn GpuTexture>),
    /// A sub-range of a uniform buffer, bound with `glBindBufferRange`-like semantics.
    UniformBlock {
        buffer: Rc<dyn Buffer>,
        offset: usize,
        size: usize,
    },
}

impl Debug for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matrix4(v) => write!(f, "Matrix4({v:?})"),
            Self::Vector2(v) => write!(f, "Vector2({v:?})"),
            Self::Vector3(v) => write!(f, "Vector3({v:?})"),
            Self::Vector4(v) => write!(f, "Vector4({v:?})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Texture(t) => write!(f, "Texture({:?})", t.size()),
            Self::UniformBlock { offset, size, .. } => {
                write!(f, "UniformBlock(offset: {offset}, size: {size})")
            }
        }
    }
}

/// A set of parameters keyed by semantic. Setting a semantic twice keeps the last value only.
#[derive(Default, Clone, Debug)]
pub struct DescriptorSet {
    values: FxHashMap<Semantic, ParameterValue>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, semantic: Semantic, value: ParameterValue) -> Self {
        self.set(semantic, value);
        self
    }

    pub fn set(&mut self, semantic: Semantic, value: ParameterValue) -> &mut Self {
        self.values.insert(semantic, value);
        self
    }

    pub fn get(&self, semantic: Semantic) -> Option<&ParameterValue> {
        self.values.get(&semantic)
    }

    pub fn remove(&mut self, semantic: Semantic) -> Option<ParameterValue> {
        self.values.remove(&semantic)
    }

    /// Iterates over all values. The order is unspecified.
    pub fn values(&self) -> impl Iterator<Item = (Semantic, &ParameterValue)> {
        self.values.iter().map(|(s, v)| (*s, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{DescriptorSet, ParameterValue, Semantic};
    use crate::core::algebra::Matrix4;
    use strum::IntoEnumIterator;

    #[test]
    fn test_last_write_wins() {
        let mut set = DescriptorSet::new();
        set.set(Semantic::ModelMatrix, ParameterValue::Float(1.0))
            .set(Semantic::ViewSize, ParameterValue::Int(2))
            .set(
                Semantic::ModelMatrix,
                ParameterValue::Matrix4(Matrix4::identity()),
            );
        assert_eq!(set.len(), 2);
        assert!(matches!(
            set.get(Semantic::ModelMatrix),
            Some(ParameterValue::Matrix4(m)) if *m == Matrix4::identity()
        ));
        assert!(set.remove(Semantic::ViewSize).is_some());
        assert_eq!(set.values().count(), 1);
    }

    #[test]
    fn test_block_bindings_are_unique() {
        let mut bindings = Semantic::iter()
            .filter_map(|s| s.block_binding())
            .collect::<Vec<_>>();
        bindings.push(super::PUSH_CONSTANTS_BINDING);
        let count = bindings.len();
        bindings.sort();
        bindings.dedup();
        assert_eq!(bindings.len(), count);
    }
}
