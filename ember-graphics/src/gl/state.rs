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

//! Deduplication of pipeline state changes. The tracker keeps the last value written for every
//! piece of state and issues a native call only when a requested value differs from it.

use crate::{
    core::{color::Color, math::Rect},
    error::FrameworkError,
    gl::{
        native::{NativeApi, NativeCall},
        GlName, ToGlConstant,
    },
    stats::PipelineStatistics,
    BlendEquation, BlendFunc, ColorMask, CompareFunc, CullFace, DrawParameters, ScissorBox,
    StencilAction, StencilFunc, StencilOp,
};
use std::{cell::RefCell, rc::Rc};

pub const MAX_TEXTURE_UNITS: usize = 32;
pub const MAX_UNIFORM_BUFFER_BINDINGS: usize = 16;

/// The last known value of one piece of GPU state. A dirty slot accepts any value.
#[derive(Copy, Clone, Debug)]
pub struct StateCache<T> {
    value: Option<T>,
}

impl<T> Default for StateCache<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: PartialEq + Copy> StateCache<T> {
    /// Returns `true` if the slot was dirty or held a different value. The caller must issue the
    /// native call exactly when this returns `true`.
    pub fn set_if_changed(&mut self, value: T) -> bool {
        if self.value == Some(value) {
            false
        } else {
            self.value = Some(value);
            true
        }
    }

    pub fn get(&self) -> Option<T> {
        self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.value.is_none()
    }

    pub fn mark_dirty(&mut self) {
        self.value = None;
    }

    /// Marks the slot dirty if it holds a value matching the predicate.
    fn forget_if(&mut self, predicate: impl FnOnce(T) -> bool) {
        if self.value.is_some_and(predicate) {
            self.value = None;
        }
    }
}

type StencilActions = (StencilAction, StencilAction, StencilAction);

fn stencil_actions(op: &StencilOp) -> StencilActions {
    (op.fail, op.zfail, op.zpass)
}

#[derive(Default)]
struct InnerState {
    blend: StateCache<bool>,
    blend_func: StateCache<BlendFunc>,
    blend_equation: StateCache<BlendEquation>,

    depth_test: StateCache<bool>,
    depth_write: StateCache<bool>,
    depth_func: StateCache<CompareFunc>,

    color_write: StateCache<ColorMask>,

    stencil_test: StateCache<bool>,
    stencil_func: StateCache<StencilFunc>,
    front_stencil_op: StateCache<StencilActions>,
    back_stencil_op: StateCache<StencilActions>,
    stencil_mask: StateCache<u32>,

    culling: StateCache<bool>,
    cull_face: StateCache<CullFace>,

    scissor_test: StateCache<bool>,
    scissor_box: StateCache<ScissorBox>,
    viewport: StateCache<Rect<i32>>,

    clear_color: StateCache<Color>,
    clear_stencil: StateCache<i32>,
    clear_depth: StateCache<f32>,

    read_framebuffer: StateCache<GlName>,
    draw_framebuffer: StateCache<GlName>,
    framebuffer_stack: Vec<(GlName, GlName)>,

    program: StateCache<GlName>,
    vao: StateCache<GlName>,
    vbo: StateCache<GlName>,
    copy_write_buffer: StateCache<GlName>,
    uniform_buffer_ranges: [StateCache<(GlName, usize, usize)>; MAX_UNIFORM_BUFFER_BINDINGS],

    active_texture_unit: StateCache<u32>,
    texture_units: [StateCache<(u32, GlName)>; MAX_TEXTURE_UNITS],

    frame_statistics: PipelineStatistics,
}

/// Owns the native API of one context. Not shareable between threads.
pub struct StateTracker {
    api: Rc<dyn NativeApi>,
    state: RefCell<InnerState>,
}

impl StateTracker {
    pub fn new(api: Rc<dyn NativeApi>) -> Self {
        Self {
            api,
            state: Default::default(),
        }
    }

    pub fn api(&self) -> &Rc<dyn NativeApi> {
        &self.api
    }

    /// Issues a call that does not affect cached state (draws, uploads, deletions).
    pub fn execute(&self, call: NativeCall<'_>) {
        self.api.execute(call)
    }

    fn toggle(&self, capability: u32, enabled: bool) {
        self.api.execute(if enabled {
            NativeCall::Enable(capability)
        } else {
            NativeCall::Disable(capability)
        })
    }

    pub fn set_framebuffer(&self, framebuffer: GlName) {
        let mut state = self.state.borrow_mut();
        let read_changed = state.read_framebuffer.set_if_changed(framebuffer);
        let draw_changed = state.draw_framebuffer.set_if_changed(framebuffer);
        if read_changed || draw_changed {
            state.frame_statistics.framebuffer_binding_changes += 1;
            self.api.execute(NativeCall::BindFramebuffer {
                target: glow::FRAMEBUFFER,
                framebuffer,
            });
        }
    }

    pub fn set_read_framebuffer(&self, framebuffer: GlName) {
        let mut state = self.state.borrow_mut();
        if state.read_framebuffer.set_if_changed(framebuffer) {
            state.frame_statistics.framebuffer_binding_changes += 1;
            self.api.execute(NativeCall::BindFramebuffer {
                target: glow::READ_FRAMEBUFFER,
                framebuffer,
            });
        }
    }

    pub fn set_draw_framebuffer(&self, framebuffer: GlName) {
        let mut state = self.state.borrow_mut();
        if state.draw_framebuffer.set_if_changed(framebuffer) {
            state.frame_statistics.framebuffer_binding_changes += 1;
            self.api.execute(NativeCall::BindFramebuffer {
                target: glow::DRAW_FRAMEBUFFER,
                framebuffer,
            });
        }
    }

    /// Currently bound (read, draw) framebuffers. Unknown bindings are reported as the default
    /// framebuffer.
    pub fn current_framebuffers(&self) -> (GlName, GlName) {
        let state = self.state.borrow();
        (
            state.read_framebuffer.get().unwrap_or(0),
            state.draw_framebuffer.get().unwrap_or(0),
        )
    }

    /// Saves the current (read, draw) pair and binds the framebuffer for both.
    pub fn push_framebuffer(&self, framebuffer: GlName) {
        let current = self.current_framebuffers();
        self.state.borrow_mut().framebuffer_stack.push(current);
        self.set_framebuffer(framebuffer);
    }

    /// Restores the exact pair that was bound before the matching push.
    pub fn pop_framebuffer(&self) -> Result<(), FrameworkError> {
        let (read, draw) = self
            .state
            .borrow_mut()
            .framebuffer_stack
            .pop()
            .ok_or(FrameworkError::RenderTargetStackUnderflow)?;
        if read == draw {
            self.set_framebuffer(read);
        } else {
            self.set_read_framebuffer(read);
            self.set_draw_framebuffer(draw);
        }
        Ok(())
    }

    /// Forgets every saved pair and binds `framebuffer` for both targets.
    pub fn reset_framebuffer_stack(&self, framebuffer: GlName) {
        self.state.borrow_mut().framebuffer_stack.clear();
        self.set_framebuffer(framebuffer);
    }

    pub fn framebuffer_stack_depth(&self) -> usize {
        self.state.borrow().framebuffer_stack.len()
    }

    pub fn set_viewport(&self, viewport: Rect<i32>) {
        let mut state = self.state.borrow_mut();
        if state.viewport.set_if_changed(viewport) {
            self.api.execute(NativeCall::Viewport {
                x: viewport.x(),
                y: viewport.y(),
                width: viewport.w(),
                height: viewport.h(),
            });
        }
    }

    pub fn current_viewport(&self) -> Option<Rect<i32>> {
        self.state.borrow().viewport.get()
    }

    pub fn set_blend(&self, blend: bool) {
        let mut state = self.state.borrow_mut();
        if state.blend.set_if_changed(blend) {
            state.frame_statistics.blend_state_changes += 1;
            self.toggle(glow::BLEND, blend);
        }
    }

    pub fn set_blend_func(&self, func: BlendFunc) {
        let mut state = self.state.borrow_mut();
        if state.blend_func.set_if_changed(func) {
            state.frame_statistics.blend_state_changes += 1;
            self.api.execute(NativeCall::BlendFuncSeparate {
                src_rgb: func.sfactor.into_gl(),
                dst_rgb: func.dfactor.into_gl(),
                src_alpha: func.alpha_sfactor.into_gl(),
                dst_alpha: func.alpha_dfactor.into_gl(),
            });
        }
    }

    pub fn set_blend_equation(&self, equation: BlendEquation) {
        let mut state = self.state.borrow_mut();
        if state.blend_equation.set_if_changed(equation) {
            state.frame_statistics.blend_state_changes += 1;
            self.api.execute(NativeCall::BlendEquationSeparate {
                rgb: equation.rgb.into_gl(),
                alpha: equation.alpha.into_gl(),
            });
        }
    }

    pub fn set_depth_test(&self, depth_test: bool) {
        let mut state = self.state.borrow_mut();
        if state.depth_test.set_if_changed(depth_test) {
            state.frame_statistics.depth_stencil_state_changes += 1;
            self.toggle(glow::DEPTH_TEST, depth_test);
        }
    }

    pub fn set_depth_write(&self, depth_write: bool) {
        let mut state = self.state.borrow_mut();
        if state.depth_write.set_if_changed(depth_write) {
            state.frame_statistics.depth_stencil_state_changes += 1;
            self.api.execute(NativeCall::DepthMask(depth_write));
        }
    }

    pub fn set_depth_func(&self, depth_func: CompareFunc) {
        let mut state = self.state.borrow_mut();
        if state.depth_func.set_if_changed(depth_func) {
            state.frame_statistics.depth_stencil_state_changes += 1;
            self.api.execute(NativeCall::DepthFunc(depth_func.into_gl()));
        }
    }

    pub fn set_color_write(&self, color_write: ColorMask) {
        let mut state = self.state.borrow_mut();
        if state.color_write.set_if_changed(color_write) {
            self.api.execute(NativeCall::ColorMask {
                red: color_write.red,
                green: color_write.green,
                blue: color_write.blue,
                alpha: color_write.alpha,
            });
        }
    }

    pub fn set_stencil_test(&self, stencil_test: bool) {
        let mut state = self.state.borrow_mut();
        if state.stencil_test.set_if_changed(stencil_test) {
            state.frame_statistics.depth_stencil_state_changes += 1;
            self.toggle(glow::STENCIL_TEST, stencil_test);
        }
    }

    pub fn set_stencil_func(&self, func: StencilFunc) {
        let mut state = self.state.borrow_mut();
        if state.stencil_func.set_if_changed(func) {
            state.frame_statistics.depth_stencil_state_changes += 1;
            self.api.execute(NativeCall::StencilFunc {
                func: func.func.into_gl(),
                ref_value: func.ref_value as i32,
                mask: func.mask,
            });
        }
    }

    /// Sets stencil operations for front and back faces. When both faces change to the same
    /// operations, a single call covers them.
    pub fn set_stencil_op(&self, front: StencilOp, back: StencilOp) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let front_actions = stencil_actions(&front);
        let back_actions = stencil_actions(&back);
        let front_changed = state.front_stencil_op.set_if_changed(front_actions);
        let back_changed = state.back_stencil_op.set_if_changed(back_actions);

        let mut emit = |face: u32, (fail, zfail, zpass): StencilActions| {
            state.frame_statistics.depth_stencil_state_changes += 1;
            self.api.execute(NativeCall::StencilOpSeparate {
                face,
                fail: fail.into_gl(),
                zfail: zfail.into_gl(),
                zpass: zpass.into_gl(),
            });
        };

        match (front_changed, back_changed) {
            (true, true) if front_actions == back_actions => {
                emit(glow::FRONT_AND_BACK, front_actions)
            }
            _ => {
                if front_changed {
                    emit(glow::FRONT, front_actions);
                }
                if back_changed {
                    emit(glow::BACK, back_actions);
                }
            }
        }

        drop(guard);

        self.set_stencil_mask(front.write_mask);
    }

    pub fn set_stencil_mask(&self, stencil_mask: u32) {
        let mut state = self.state.borrow_mut();
        if state.stencil_mask.set_if_changed(stencil_mask) {
            state.frame_statistics.depth_stencil_state_changes += 1;
            self.api.execute(NativeCall::StencilMask(stencil_mask));
        }
    }

    pub fn set_culling(&self, culling: bool) {
        let mut state = self.state.borrow_mut();
        if state.culling.set_if_changed(culling) {
            self.toggle(glow::CULL_FACE, culling);
        }
    }

    pub fn set_cull_face(&self, cull_face: CullFace) {
        let mut state = self.state.borrow_mut();
        if state.cull_face.set_if_changed(cull_face) {
            self.api.execute(NativeCall::CullFace(cull_face.into_gl()));
        }
    }

    pub fn set_scissor_test(&self, scissor_test: bool) {
        let mut state = self.state.borrow_mut();
        if state.scissor_test.set_if_changed(scissor_test) {
            self.toggle(glow::SCISSOR_TEST, scissor_test);
        }
    }

    pub fn set_scissor_box(&self, scissor_box: ScissorBox) {
        let mut state = self.state.borrow_mut();
        if state.scissor_box.set_if_changed(scissor_box) {
            self.api.execute(NativeCall::Scissor {
                x: scissor_box.x,
                y: scissor_box.y,
                width: scissor_box.width,
                height: scissor_box.height,
            });
        }
    }

    pub fn set_clear_color(&self, color: Color) {
        let mut state = self.state.borrow_mut();
        if state.clear_color.set_if_changed(color) {
            self.api.execute(NativeCall::ClearColor(color.as_frgba().into()));
        }
    }

    pub fn set_clear_depth(&self, depth: f32) {
        let mut state = self.state.borrow_mut();
        if state.clear_depth.set_if_changed(depth) {
            self.api.execute(NativeCall::ClearDepth(depth));
        }
    }

    pub fn set_clear_stencil(&self, stencil: i32) {
        let mut state = self.state.borrow_mut();
        if state.clear_stencil.set_if_changed(stencil) {
            self.api.execute(NativeCall::ClearStencil(stencil));
        }
    }

    pub fn set_program(&self, program: GlName) {
        let mut state = self.state.borrow_mut();
        if state.program.set_if_changed(program) {
            state.frame_statistics.program_binding_changes += 1;
            self.api.execute(NativeCall::UseProgram(program));
        }
    }

    pub fn set_vertex_array_object(&self, vao: GlName) {
        let mut state = self.state.borrow_mut();
        if state.vao.set_if_changed(vao) {
            state.frame_statistics.vao_binding_changes += 1;
            self.api.execute(NativeCall::BindVertexArray(vao));
        }
    }

    pub fn set_vertex_buffer_object(&self, vbo: GlName) {
        let mut state = self.state.borrow_mut();
        if state.vbo.set_if_changed(vbo) {
            state.frame_statistics.vbo_binding_changes += 1;
            self.api.execute(NativeCall::BindBuffer {
                target: glow::ARRAY_BUFFER,
                buffer: vbo,
            });
        }
    }

    /// Binds a buffer to the target used for data uploads. Uploads never touch the array or
    /// element bindings, so they do not disturb vertex array state.
    pub fn set_copy_write_buffer(&self, buffer: GlName) {
        let mut state = self.state.borrow_mut();
        if state.copy_write_buffer.set_if_changed(buffer) {
            self.api.execute(NativeCall::BindBuffer {
                target: glow::COPY_WRITE_BUFFER,
                buffer,
            });
        }
    }

    pub fn set_uniform_buffer_range(
        &self,
        binding: u32,
        buffer: GlName,
        offset: usize,
        size: usize,
    ) -> Result<(), FrameworkError> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let slot = state
            .uniform_buffer_ranges
            .get_mut(binding as usize)
            .ok_or(FrameworkError::BindingOutOfRange {
                kind: "Uniform buffer",
                index: binding,
                max: MAX_UNIFORM_BUFFER_BINDINGS,
            })?;
        if slot.set_if_changed((buffer, offset, size)) {
            state.frame_statistics.uniform_buffer_binding_changes += 1;
            self.api.execute(NativeCall::BindBufferRange {
                target: glow::UNIFORM_BUFFER,
                index: binding,
                buffer,
                offset: offset as i32,
                size: size as i32,
            });
        }
        Ok(())
    }

    pub fn set_active_texture_unit(&self, unit: u32) {
        let mut state = self.state.borrow_mut();
        if state.active_texture_unit.set_if_changed(unit) {
            self.api.execute(NativeCall::ActiveTexture(unit));
        }
    }

    /// Binds a texture to the given unit. The active unit is switched only when the binding of
    /// the unit actually changes.
    pub fn set_texture(
        &self,
        unit: u32,
        target: u32,
        texture: GlName,
    ) -> Result<(), FrameworkError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let slot = state
            .texture_units
            .get_mut(unit as usize)
            .ok_or(FrameworkError::BindingOutOfRange {
                kind: "Texture unit",
                index: unit,
                max: MAX_TEXTURE_UNITS,
            })?;
        if slot.set_if_changed((target, texture)) {
            state.frame_statistics.texture_binding_changes += 1;
            if state.active_texture_unit.set_if_changed(unit) {
                self.api.execute(NativeCall::ActiveTexture(unit));
            }
            self.api.execute(NativeCall::BindTexture { target, texture });
        }
        Ok(())
    }

    pub fn apply_draw_parameters(&self, draw_params: &DrawParameters) {
        let DrawParameters {
            cull_face,
            color_write,
            depth_write,
            stencil_test,
            depth_test,
            blend,
            stencil_op,
            back_stencil_op,
            scissor_box,
        } = draw_params;

        if let Some(ref blend_params) = blend {
            self.set_blend_func(blend_params.func);
            self.set_blend_equation(blend_params.equation);
            self.set_blend(true);
        } else {
            self.set_blend(false);
        }

        if let Some(depth_func) = depth_test {
            self.set_depth_func(*depth_func);
            self.set_depth_test(true);
        } else {
            self.set_depth_test(false);
        }
        self.set_depth_write(*depth_write);

        self.set_color_write(*color_write);

        if let Some(stencil_func) = stencil_test {
            self.set_stencil_test(true);
            self.set_stencil_func(*stencil_func);
        } else {
            self.set_stencil_test(false);
        }

        self.set_stencil_op(*stencil_op, back_stencil_op.unwrap_or(*stencil_op));

        if let Some(cull_face) = cull_face {
            self.set_cull_face(*cull_face);
            self.set_culling(true);
        } else {
            self.set_culling(false);
        }

        if let Some(scissor_box) = scissor_box {
            self.set_scissor_test(true);
            self.set_scissor_box(*scissor_box);
        } else {
            self.set_scissor_test(false);
        }
    }

    /// Forgets every cached value, so the next change of every kind of state is re-emitted.
    /// The framebuffer stack is kept.
    pub fn mark_dirty(&self) {
        let mut state = self.state.borrow_mut();
        let stack = std::mem::take(&mut state.framebuffer_stack);
        let frame_statistics = state.frame_statistics;
        *state = InnerState {
            framebuffer_stack: stack,
            frame_statistics,
            ..Default::default()
        };
    }

    /// Forgets object bindings only (program, vertex array, buffers, textures).
    pub fn invalidate_resource_bindings(&self) {
        let mut state = self.state.borrow_mut();
        state.program.mark_dirty();
        state.vao.mark_dirty();
        state.vbo.mark_dirty();
        state.copy_write_buffer.mark_dirty();
        state.active_texture_unit.mark_dirty();
        for unit in state.texture_units.iter_mut() {
            unit.mark_dirty();
        }
        for range in state.uniform_buffer_ranges.iter_mut() {
            range.mark_dirty();
        }
    }

    /// Must be called when a buffer is deleted, the driver resets its bindings and the name may
    /// be reused.
    pub fn forget_buffer(&self, buffer: GlName) {
        let mut state = self.state.borrow_mut();
        state.vbo.forget_if(|b| b == buffer);
        state.copy_write_buffer.forget_if(|b| b == buffer);
        for range in state.uniform_buffer_ranges.iter_mut() {
            range.forget_if(|(b, _, _)| b == buffer);
        }
    }

    pub fn forget_texture(&self, texture: GlName) {
        let mut state = self.state.borrow_mut();
        for unit in state.texture_units.iter_mut() {
            unit.forget_if(|(_, t)| t == texture);
        }
    }

    pub fn forget_framebuffer(&self, framebuffer: GlName) {
        let mut state = self.state.borrow_mut();
        state.read_framebuffer.forget_if(|f| f == framebuffer);
        state.draw_framebuffer.forget_if(|f| f == framebuffer);
    }

    pub fn forget_vertex_array(&self, vao: GlName) {
        self.state.borrow_mut().vao.forget_if(|v| v == vao);
    }

    pub fn forget_program(&self, program: GlName) {
        self.state.borrow_mut().program.forget_if(|p| p == program);
    }

    pub fn pipeline_statistics(&self) -> PipelineStatistics {
        self.state.borrow().frame_statistics
    }

    pub fn reset_pipeline_statistics(&self) {
        self.state.borrow_mut().frame_statistics = Default::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{gl::recorder::CallRecorder, BlendFactor, BlendParameters};

    fn tracker() -> (StateTracker, Rc<CallRecorder>) {
        let recorder = Rc::new(CallRecorder::new());
        (StateTracker::new(recorder.clone()), recorder)
    }

    #[test]
    fn test_cache_gate() {
        let mut cache = StateCache::default();
        assert!(cache.is_dirty());
        assert!(cache.set_if_changed(1));
        assert!(!cache.set_if_changed(1));
        assert!(cache.set_if_changed(2));
        cache.mark_dirty();
        assert!(cache.set_if_changed(2));
    }

    #[test]
    fn test_same_value_emits_once() {
        let (tracker, recorder) = tracker();
        tracker.set_program(5);
        tracker.set_program(5);
        tracker.set_blend(true);
        tracker.set_blend(true);
        tracker.set_depth_func(CompareFunc::Less);
        tracker.set_depth_func(CompareFunc::Less);
        assert_eq!(recorder.call_count(), 3);
    }

    #[test]
    fn test_distinct_values_interleaved() {
        let (tracker, recorder) = tracker();
        for i in 1..=10 {
            tracker.set_program(i);
            tracker.set_vertex_array_object(100);
            tracker.set_depth_write(i % 2 == 0);
        }
        assert_eq!(
            recorder.count(|c| matches!(c, NativeCall::UseProgram(_))),
            10
        );
        assert_eq!(
            recorder.count(|c| matches!(c, NativeCall::BindVertexArray(_))),
            1
        );
        assert_eq!(recorder.count(|c| matches!(c, NativeCall::DepthMask(_))), 10);
    }

    #[test]
    fn test_mark_dirty_reemits() {
        let (tracker, recorder) = tracker();
        tracker.set_culling(true);
        tracker.mark_dirty();
        tracker.set_culling(true);
        assert_eq!(recorder.count(|c| *c == NativeCall::Enable(glow::CULL_FACE)), 2);
    }

    #[test]
    fn test_texture_units() {
        let (tracker, recorder) = tracker();
        tracker.set_texture(0, glow::TEXTURE_2D, 7).unwrap();
        tracker.set_texture(1, glow::TEXTURE_2D, 8).unwrap();
        // Both units already hold these textures.
        tracker.set_texture(0, glow::TEXTURE_2D, 7).unwrap();
        tracker.set_texture(1, glow::TEXTURE_2D, 8).unwrap();
        // Target change at the same unit and handle must rebind.
        tracker.set_texture(1, glow::TEXTURE_CUBE_MAP, 8).unwrap();
        assert_eq!(
            recorder.count(|c| matches!(c, NativeCall::BindTexture { .. })),
            3
        );
        assert_eq!(
            recorder.calls(),
            vec![
                NativeCall::ActiveTexture(0),
                NativeCall::BindTexture {
                    target: glow::TEXTURE_2D,
                    texture: 7
                },
                NativeCall::ActiveTexture(1),
                NativeCall::BindTexture {
                    target: glow::TEXTURE_2D,
                    texture: 8
                },
                NativeCall::BindTexture {
                    target: glow::TEXTURE_CUBE_MAP,
                    texture: 8
                },
            ]
        );
    }

    #[test]
    fn test_framebuffer_stack_balance() {
        let (tracker, _) = tracker();
        tracker.set_framebuffer(3);
        tracker.push_framebuffer(4);
        tracker.push_framebuffer(5);
        tracker.set_read_framebuffer(6);
        assert_eq!(tracker.current_framebuffers(), (6, 5));
        tracker.pop_framebuffer().unwrap();
        assert_eq!(tracker.current_framebuffers(), (4, 4));
        tracker.pop_framebuffer().unwrap();
        assert_eq!(tracker.current_framebuffers(), (3, 3));
        assert!(matches!(
            tracker.pop_framebuffer(),
            Err(FrameworkError::RenderTargetStackUnderflow)
        ));
        assert_eq!(tracker.framebuffer_stack_depth(), 0);

        tracker.push_framebuffer(7);
        tracker.push_framebuffer(8);
        tracker.reset_framebuffer_stack(0);
        assert_eq!(tracker.framebuffer_stack_depth(), 0);
        assert_eq!(tracker.current_framebuffers(), (0, 0));
    }

    #[test]
    fn test_separate_stencil_ops() {
        let (tracker, recorder) = tracker();
        let front = StencilOp::uniform(StencilAction::IncrWrap);
        let back = StencilOp::uniform(StencilAction::DecrWrap);
        tracker.set_stencil_op(front, back);
        tracker.set_stencil_op(front, back);
        assert_eq!(
            recorder.calls(),
            vec![
                NativeCall::StencilOpSeparate {
                    face: glow::FRONT,
                    fail: glow::INCR_WRAP,
                    zfail: glow::INCR_WRAP,
                    zpass: glow::INCR_WRAP,
                },
                NativeCall::StencilOpSeparate {
                    face: glow::BACK,
                    fail: glow::DECR_WRAP,
                    zfail: glow::DECR_WRAP,
                    zpass: glow::DECR_WRAP,
                },
                NativeCall::StencilMask(0xFFFF_FFFF),
            ]
        );

        recorder.clear();
        let zero = StencilOp::uniform(StencilAction::Zero);
        tracker.set_stencil_op(zero, zero);
        assert_eq!(
            recorder.count(|c| matches!(
                c,
                NativeCall::StencilOpSeparate {
                    face: glow::FRONT_AND_BACK,
                    ..
                }
            )),
            1
        );
    }

    #[test]
    fn test_apply_draw_parameters_twice() {
        let (tracker, recorder) = tracker();
        let params = DrawParameters {
            cull_face: Some(CullFace::Front),
            depth_test: Some(CompareFunc::LessOrEqual),
            blend: Some(BlendParameters {
                func: BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::One),
                ..Default::default()
            }),
            ..Default::default()
        };
        tracker.apply_draw_parameters(&params);
        let first = recorder.call_count();
        assert!(first > 0);
        tracker.apply_draw_parameters(&params);
        assert_eq!(recorder.call_count(), first);
        assert!(tracker.pipeline_statistics().blend_state_changes >= 3);
    }

    #[test]
    fn test_forget_deleted_buffer() {
        let (tracker, recorder) = tracker();
        tracker.set_uniform_buffer_range(2, 9, 0, 64).unwrap();
        tracker.forget_buffer(9);
        tracker.set_uniform_buffer_range(2, 9, 0, 64).unwrap();
        assert_eq!(
            recorder.count(|c| matches!(c, NativeCall::BindBufferRange { index: 2, .. })),
            2
        );
    }

    #[test]
    fn test_binding_limits() {
        let (tracker, recorder) = tracker();
        assert!(matches!(
            tracker.set_texture(MAX_TEXTURE_UNITS as u32, glow::TEXTURE_2D, 3),
            Err(FrameworkError::BindingOutOfRange {
                kind: "Texture unit",
                ..
            })
        ));
        assert!(matches!(
            tracker.set_uniform_buffer_range(MAX_UNIFORM_BUFFER_BINDINGS as u32, 9, 0, 64),
            Err(FrameworkError::BindingOutOfRange { max: 16, .. })
        ));
        assert_eq!(recorder.call_count(), 0);
    }
}
