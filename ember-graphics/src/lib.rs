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

//! Graphics API abstraction layer. Everything above the `gl` module is backend-agnostic: buffers,
//! textures, render targets, vertex arrays, programs, pipelines, descriptor sets and command
//! buffers. The only backend is OpenGL 3.3 core, see [`gl::server::GlGraphicsServer`].

pub use ember_core as core;

use crate::core::math::Rect;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString, VariantNames};

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod error;
pub mod gl;
pub mod gpu_program;
pub mod gpu_texture;
pub mod pipeline;
pub mod query;
pub mod render_target;
pub mod server;
pub mod stats;
pub mod uniform;
pub mod vertex_array;

#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Eq,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Debug,
    Default,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum CompareFunc {
    /// Never passes.
    Never,

    /// Passes if the incoming value is less than the stored value.
    Less,

    /// Passes if the incoming value is equal to the stored value.
    Equal,

    /// Passes if the incoming value is less than or equal to the stored value.
    #[default]
    LessOrEqual,

    /// Passes if the incoming value is greater than the stored value.
    Greater,

    /// Passes if the incoming value is not equal to the stored value.
    NotEqual,

    /// Passes if the incoming value is greater than or equal to the stored value.
    GreaterOrEqual,

    /// Always passes.
    Always,
}

#[derive(
    Copy,
    Clone,
    Hash,
    PartialOrd,
    PartialEq,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Debug,
    Default,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum BlendFactor {
    #[default]
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

#[derive(
    Copy, Clone, Hash, PartialOrd, PartialEq, Eq, Ord, Serialize, Deserialize, Debug, Default,
)]
pub enum BlendMode {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(
    Copy, Clone, Default, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize, Debug,
)]
pub struct BlendEquation {
    pub rgb: BlendMode,
    pub alpha: BlendMode,
}

#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct BlendFunc {
    pub sfactor: BlendFactor,
    pub dfactor: BlendFactor,
    pub alpha_sfactor: BlendFactor,
    pub alpha_dfactor: BlendFactor,
}

impl BlendFunc {
    pub fn new(sfactor: BlendFactor, dfactor: BlendFactor) -> Self {
        Self {
            sfactor,
            dfactor,
            alpha_sfactor: sfactor,
            alpha_dfactor: dfactor,
        }
    }

    pub fn new_separate(
        sfactor: BlendFactor,
        dfactor: BlendFactor,
        alpha_sfactor: BlendFactor,
        alpha_dfactor: BlendFactor,
    ) -> Self {
        Self {
            sfactor,
            dfactor,
            alpha_sfactor,
            alpha_dfactor,
        }
    }
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self {
            sfactor: BlendFactor::One,
            dfactor: BlendFactor::Zero,
            alpha_sfactor: BlendFactor::One,
            alpha_dfactor: BlendFactor::Zero,
        }
    }
}

#[derive(
    Copy, Clone, Default, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize, Debug,
)]
pub struct BlendParameters {
    pub func: BlendFunc,
    pub equation: BlendEquation,
}

#[derive(Copy, Clone, PartialOrd, PartialEq, Hash, Debug, Serialize, Deserialize, Eq)]
pub struct ColorMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}

impl Default for ColorMask {
    fn default() -> Self {
        Self {
            red: true,
            green: true,
            blue: true,
            alpha: true,
        }
    }
}

impl ColorMask {
    pub fn all(value: bool) -> Self {
        Self {
            red: value,
            green: value,
            blue: value,
            alpha: value,
        }
    }
}

#[derive(Copy, Clone, PartialOrd, PartialEq, Hash, Debug, Serialize, Deserialize, Eq)]
pub struct StencilFunc {
    pub func: CompareFunc,
    pub ref_value: u32,
    pub mask: u32,
}

impl Default for StencilFunc {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            ref_value: 0,
            mask: 0xFFFF_FFFF,
        }
    }
}

#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Hash,
    Debug,
    Default,
    Serialize,
    Deserialize,
    Eq,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum StencilAction {
    /// Keeps the current value.
    #[default]
    Keep,

    /// Sets the stencil buffer value to 0.
    Zero,

    /// Sets the stencil buffer value to ref value.
    Replace,

    /// Increments the current stencil buffer value.
    /// Clamps to the maximum representable unsigned value.
    Incr,

    /// Increments the current stencil buffer value.
    /// Wraps stencil buffer value to zero when incrementing the maximum representable
    /// unsigned value.
    IncrWrap,

    /// Decrements the current stencil buffer value.
    /// Clamps to 0.
    Decr,

    /// Decrements the current stencil buffer value.
    /// Wraps stencil buffer value to the maximum representable unsigned value when
    /// decrementing a stencil buffer value of zero.
    DecrWrap,

    /// Bitwise inverts the current stencil buffer value.
    Invert,
}

#[derive(Copy, Clone, PartialOrd, PartialEq, Hash, Debug, Serialize, Deserialize, Eq)]
pub struct StencilOp {
    pub fail: StencilAction,
    pub zfail: StencilAction,
    pub zpass: StencilAction,
    pub write_mask: u32,
}

impl Default for StencilOp {
    fn default() -> Self {
        Self {
            fail: Default::default(),
            zfail: Default::default(),
            zpass: Default::default(),
            write_mask: 0xFFFF_FFFF,
        }
    }
}

impl StencilOp {
    /// Applies the same action to every outcome of the stencil and depth tests.
    pub fn uniform(action: StencilAction) -> Self {
        Self {
            fail: action,
            zfail: action,
            zpass: action,
            ..Default::default()
        }
    }
}

#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Hash,
    Debug,
    Default,
    Serialize,
    Deserialize,
    Eq,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum CullFace {
    #[default]
    Back,
    Front,
}

/// Scissor region in window coordinates.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ScissorBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<Rect<i32>> for ScissorBox {
    fn from(rect: Rect<i32>) -> Self {
        Self {
            x: rect.x(),
            y: rect.y(),
            width: rect.w(),
            height: rect.h(),
        }
    }
}

/// Describes how the vertices of a draw call are assembled into primitives.
#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Hash,
    Debug,
    Default,
    Serialize,
    Deserialize,
    Eq,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum PrimitiveTopology {
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    Points,
}

impl PrimitiveTopology {
    /// Amount of triangles produced by `count` vertices.
    pub fn triangle_count(self, count: usize) -> usize {
        match self {
            PrimitiveTopology::Triangles => count / 3,
            PrimitiveTopology::TriangleStrip | PrimitiveTopology::TriangleFan => {
                count.saturating_sub(2)
            }
            PrimitiveTopology::Lines | PrimitiveTopology::Points => 0,
        }
    }
}

/// Fixed-function state of a pipeline. Applied through the state tracker right before a draw, so
/// only the pieces that differ from the current GPU state cost a native call.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone, Eq, Hash)]
pub struct DrawParameters {
    pub cull_face: Option<CullFace>,
    pub color_write: ColorMask,
    pub depth_write: bool,
    pub stencil_test: Option<StencilFunc>,
    pub depth_test: Option<CompareFunc>,
    pub blend: Option<BlendParameters>,
    /// Stencil operation for front faces, or for both faces if `back_stencil_op` is `None`.
    pub stencil_op: StencilOp,
    pub back_stencil_op: Option<StencilOp>,
    pub scissor_box: Option<ScissorBox>,
}

#[cfg(test)]
mod test {
    use crate::{CompareFunc, PrimitiveTopology, StencilAction};
    use std::str::FromStr;

    #[test]
    fn test_triangle_count() {
        assert_eq!(PrimitiveTopology::Triangles.triangle_count(9), 3);
        assert_eq!(PrimitiveTopology::TriangleFan.triangle_count(6), 4);
        assert_eq!(PrimitiveTopology::TriangleStrip.triangle_count(1), 0);
        assert_eq!(PrimitiveTopology::Lines.triangle_count(4), 0);
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(CompareFunc::from_str("NotEqual"), Ok(CompareFunc::NotEqual));
        assert_eq!(StencilAction::IncrWrap.as_ref(), "IncrWrap");
    }
}
