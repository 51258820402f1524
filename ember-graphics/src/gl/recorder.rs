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

//! A [`NativeApi`] implementation that needs no GPU. It records every call, hands out fresh
//! object names and answers reflection queries by scanning shader sources, which makes the whole
//! backend runnable (and testable) in a headless environment.

use crate::{
    error::FrameworkError,
    gl::{
        native::{NativeApi, NativeCall},
        GlName,
    },
};
use fxhash::{FxHashMap, FxHashSet};
use regex::Regex;
use std::{
    cell::{Cell, RefCell},
    sync::LazyLock,
};

static UNIFORM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"uniform\s+(\w+)\s*\{").unwrap());
static UNIFORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"uniform\s+\w+\s+(\w+)\s*[;\[]").unwrap());

#[derive(Default, Debug)]
struct ProgramReflection {
    uniforms: FxHashMap<String, u32>,
    blocks: FxHashMap<String, u32>,
}

impl ProgramReflection {
    fn scan(sources: &[&str]) -> Self {
        let mut reflection = Self::default();
        for source in sources {
            for capture in UNIFORM_BLOCK.captures_iter(source) {
                let next = reflection.blocks.len() as u32;
                reflection
                    .blocks
                    .entry(capture[1].to_owned())
                    .or_insert(next);
            }
            for capture in UNIFORM.captures_iter(source) {
                let next = reflection.uniforms.len() as u32;
                reflection
                    .uniforms
                    .entry(capture[1].to_owned())
                    .or_insert(next);
            }
        }
        reflection
    }
}

pub struct CallRecorder {
    calls: RefCell<Vec<NativeCall<'static>>>,
    next_name: Cell<GlName>,
    programs: RefCell<FxHashMap<GlName, ProgramReflection>>,
    running_queries: RefCell<FxHashMap<u32, GlName>>,
    finished_queries: RefCell<FxHashSet<GlName>>,
    query_value: Cell<u32>,
    framebuffer_status: Cell<u32>,
    parameters: RefCell<FxHashMap<u32, i32>>,
}

impl Default for CallRecorder {
    fn default() -> Self {
        let mut parameters = FxHashMap::default();
        parameters.insert(glow::UNIFORM_BUFFER_OFFSET_ALIGNMENT, 256);
        parameters.insert(glow::MAX_UNIFORM_BLOCK_SIZE, 65536);
        parameters.insert(glow::MAX_TEXTURE_SIZE, 16384);
        parameters.insert(glow::MAX_COLOR_ATTACHMENTS, 8);

        Self {
            calls: Default::default(),
            next_name: Cell::new(1),
            programs: Default::default(),
            running_queries: Default::default(),
            finished_queries: Default::default(),
            query_value: Cell::new(0),
            framebuffer_status: Cell::new(glow::FRAMEBUFFER_COMPLETE),
            parameters: RefCell::new(parameters),
        }
    }
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every call recorded so far.
    pub fn calls(&self) -> Vec<NativeCall<'static>> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Counts recorded calls that satisfy the predicate.
    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| predicate(c)).count()
    }

    /// Amount of recorded calls that change pipeline state.
    pub fn state_change_count(&self) -> usize {
        self.count(|c| c.is_state_change())
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Makes every following framebuffer completeness check report the given status.
    pub fn set_framebuffer_status(&self, status: u32) {
        self.framebuffer_status.set(status);
    }

    /// Sets the value reported by finished queries.
    pub fn set_query_value(&self, value: u32) {
        self.query_value.set(value);
    }

    pub fn set_parameter(&self, parameter: u32, value: i32) {
        self.parameters.borrow_mut().insert(parameter, value);
    }

    fn fresh_name(&self) -> GlName {
        let name = self.next_name.get();
        self.next_name.set(name + 1);
        name
    }
}

impl NativeApi for CallRecorder {
    fn execute(&self, call: NativeCall<'_>) {
        match call {
            NativeCall::BeginQuery { target, query } => {
                self.finished_queries.borrow_mut().remove(&query);
                self.running_queries.borrow_mut().insert(target, query);
            }
            NativeCall::EndQuery(target) => {
                if let Some(query) = self.running_queries.borrow_mut().remove(&target) {
                    self.finished_queries.borrow_mut().insert(query);
                }
            }
            NativeCall::DeleteProgram(program) => {
                self.programs.borrow_mut().remove(&program);
            }
            _ => (),
        }
        self.calls.borrow_mut().push(call.into_owned());
    }

    fn create_buffer(&self) -> Result<GlName, FrameworkError> {
        Ok(self.fresh_name())
    }

    fn create_texture(&self) -> Result<GlName, FrameworkError> {
        Ok(self.fresh_name())
    }

    fn create_framebuffer(&self) -> Result<GlName, FrameworkError> {
        Ok(self.fresh_name())
    }

    fn create_vertex_array(&self) -> Result<GlName, FrameworkError> {
        Ok(self.fresh_name())
    }

    fn create_query(&self) -> Result<GlName, FrameworkError> {
        Ok(self.fresh_name())
    }

    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<GlName, FrameworkError> {
        for (stage, source) in [("Vertex", vertex_source), ("Fragment", fragment_source)] {
            if !source.contains("void main") {
                return Err(FrameworkError::ShaderCompilationFailed {
                    shader_name: format!("{name}_{stage}Shader"),
                    error_message: "no entry point".to_owned(),
                });
            }
        }
        let program = self.fresh_name();
        self.programs.borrow_mut().insert(
            program,
            ProgramReflection::scan(&[vertex_source, fragment_source]),
        );
        Ok(program)
    }

    fn uniform_location(&self, program: GlName, name: &str) -> Option<u32> {
        self.programs
            .borrow()
            .get(&program)
            .and_then(|p| p.uniforms.get(name).copied())
    }

    fn uniform_block_index(&self, program: GlName, name: &str) -> Option<u32> {
        self.programs
            .borrow()
            .get(&program)
            .and_then(|p| p.blocks.get(name).copied())
    }

    fn check_framebuffer_status(&self, _target: u32) -> u32 {
        self.framebuffer_status.get()
    }

    fn query_result_available(&self, query: GlName) -> bool {
        self.finished_queries.borrow().contains(&query)
    }

    fn query_result(&self, query: GlName) -> u32 {
        if self.finished_queries.borrow().contains(&query) {
            self.query_value.get()
        } else {
            0
        }
    }

    fn get_parameter_i32(&self, parameter: u32) -> i32 {
        self.parameters
            .borrow()
            .get(&parameter)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reflection() {
        let recorder = CallRecorder::new();
        let program = recorder
            .create_program(
                "Test",
                "uniform mat4 worldViewProjection;\nvoid main() {}",
                "uniform sampler2D diffuseTexture;\nlayout(std140) uniform LightBlock { vec4 color; };\nuniform vec4 colors[4];\nvoid main() {}",
            )
            .unwrap();
        assert!(recorder
            .uniform_location(program, "worldViewProjection")
            .is_some());
        assert!(recorder.uniform_location(program, "diffuseTexture").is_some());
        assert!(recorder.uniform_location(program, "colors").is_some());
        assert!(recorder.uniform_location(program, "missing").is_none());
        assert_eq!(recorder.uniform_block_index(program, "LightBlock"), Some(0));
        assert!(recorder.create_program("Bad", "", "void main() {}").is_err());
    }

    #[test]
    fn test_query_becomes_available_after_end() {
        let recorder = CallRecorder::new();
        let query = recorder.create_query().unwrap();
        recorder.set_query_value(42);
        recorder.execute(NativeCall::BeginQuery {
            target: glow::TIME_ELAPSED,
            query,
        });
        assert!(!recorder.query_result_available(query));
        recorder.execute(NativeCall::EndQuery(glow::TIME_ELAPSED));
        assert!(recorder.query_result_available(query));
        assert_eq!(recorder.query_result(query), 42);
    }
}
