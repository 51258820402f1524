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
    descriptor::{Semantic, PUSH_CONSTANTS_BINDING, PUSH_CONSTANTS_BLOCK},
    error::FrameworkError,
    gl::{native::NativeCall, state::StateTracker, GlName},
    gpu_program::GpuProgram,
};
use fxhash::FxHashMap;
use std::{
    any::Any,
    cell::RefCell,
    rc::{Rc, Weak},
};
use strum::IntoEnumIterator;

pub struct GlProgram {
    state: Weak<StateTracker>,
    pub id: GlName,
    name: String,
    semantic_locations: FxHashMap<Semantic, u32>,
    blocks: FxHashMap<String, u32>,
    /// Lazily filled cache of lookups by arbitrary name, misses included.
    locations: RefCell<FxHashMap<String, Option<u32>>>,
}

impl GlProgram {
    pub fn from_source(
        state: &Rc<StateTracker>,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, FrameworkError> {
        let api = state.api();
        let id = api.create_program(name, vertex_source, fragment_source)?;

        let mut semantic_locations = FxHashMap::default();
        let mut blocks = FxHashMap::default();

        let mut bind_block = |block_name: &str, binding: u32| {
            if let Some(index) = api.uniform_block_index(id, block_name) {
                state.execute(NativeCall::UniformBlockBinding {
                    program: id,
                    index,
                    binding,
                });
                blocks.insert(block_name.to_owned(), binding);
            }
        };

        bind_block(PUSH_CONSTANTS_BLOCK, PUSH_CONSTANTS_BINDING);

        for semantic in Semantic::iter() {
            if let Some(binding) = semantic.block_binding() {
                bind_block(semantic.uniform_name(), binding);
            } else if let Some(location) = api.uniform_location(id, semantic.uniform_name()) {
                semantic_locations.insert(semantic, location);
            }
        }

        Ok(Self {
            state: Rc::downgrade(state),
            id,
            name: name.to_owned(),
            semantic_locations,
            blocks,
            locations: Default::default(),
        })
    }

    /// Location of the uniform that receives values of the given semantic, `None` if the program
    /// does not use it.
    pub fn semantic_location(&self, semantic: Semantic) -> Option<u32> {
        self.semantic_locations.get(&semantic).copied()
    }

    pub fn uniform_location(&self, name: &str) -> Option<u32> {
        if let Some(location) = self.locations.borrow().get(name) {
            return *location;
        }
        let location = self
            .state
            .upgrade()
            .and_then(|state| state.api().uniform_location(self.id, name));
        self.locations.borrow_mut().insert(name.to_owned(), location);
        location
    }

    /// Binding point of a uniform block, `None` if the block is not active.
    pub fn block_binding(&self, name: &str) -> Option<u32> {
        self.blocks.get(name).copied()
    }

    pub fn has_push_constants(&self) -> bool {
        self.blocks.contains_key(PUSH_CONSTANTS_BLOCK)
    }
}

impl GpuProgram for GlProgram {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn has_uniform(&self, name: &str) -> bool {
        self.uniform_location(name).is_some()
    }

    fn has_uniform_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }
}

impl Drop for GlProgram {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.forget_program(self.id);
            state.execute(NativeCall::DeleteProgram(self.id));
        }
    }
}
