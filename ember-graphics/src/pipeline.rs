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

//! Immutable pipeline state objects.

use crate::{gpu_program::GpuProgram, DrawParameters, PrimitiveTopology};
use std::{fmt::Debug, rc::Rc};

pub struct PipelineDescriptor {
    pub program: Rc<dyn GpuProgram>,
    pub parameters: DrawParameters,
    pub topology: PrimitiveTopology,
}

/// A program together with the fixed-function state it is drawn with. Pipelines never change
/// after creation, so they are shared freely between draw calls.
pub struct PipelineState {
    program: Rc<dyn GpuProgram>,
    parameters: DrawParameters,
    topology: PrimitiveTopology,
}

impl Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineState")
            .field("program", &self.program.name())
            .field("parameters", &self.parameters)
            .field("topology", &self.topology)
            .finish()
    }
}

impl PipelineState {
    pub fn new(desc: PipelineDescriptor) -> Self {
        Self {
            program: desc.program,
            parameters: desc.parameters,
            topology: desc.topology,
        }
    }

    pub fn program(&self) -> &Rc<dyn GpuProgram> {
        &self.program
    }

    pub fn parameters(&self) -> &DrawParameters {
        &self.parameters
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }
}
