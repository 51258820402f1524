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
    error::FrameworkError,
    gl::{native::NativeCall, state::StateTracker, GlName, ToGlConstant},
    query::{Query, QueryKind, QueryResult},
};
use std::{
    any::Any,
    cell::Cell,
    rc::{Rc, Weak},
    time::Duration,
};

impl ToGlConstant for QueryKind {
    fn into_gl(self) -> u32 {
        match self {
            QueryKind::SamplesPassed => glow::SAMPLES_PASSED,
            QueryKind::AnySamplesPassed => glow::ANY_SAMPLES_PASSED,
            QueryKind::TimeElapsed => glow::TIME_ELAPSED,
        }
    }
}

pub struct GlQuery {
    state: Weak<StateTracker>,
    id: GlName,
    active: Cell<Option<QueryKind>>,
    /// Kind of the query that has ended but whose result was not fetched yet.
    pending: Cell<Option<QueryKind>>,
}

impl GlQuery {
    pub fn new(state: &Rc<StateTracker>) -> Result<Self, FrameworkError> {
        Ok(Self {
            state: Rc::downgrade(state),
            id: state.api().create_query()?,
            active: Default::default(),
            pending: Default::default(),
        })
    }

    fn state(&self) -> Result<Rc<StateTracker>, FrameworkError> {
        self.state
            .upgrade()
            .ok_or_else(|| FrameworkError::Custom("graphics server was destroyed".to_owned()))
    }
}

impl Query for GlQuery {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn begin(&self, kind: QueryKind) -> Result<(), FrameworkError> {
        if self.active.get().is_some() {
            return Err(FrameworkError::QueryMisuse("query is already active"));
        }
        self.state()?.execute(NativeCall::BeginQuery {
            target: kind.into_gl(),
            query: self.id,
        });
        self.active.set(Some(kind));
        self.pending.set(None);
        Ok(())
    }

    fn end(&self) -> Result<(), FrameworkError> {
        let kind = self
            .active
            .take()
            .ok_or(FrameworkError::QueryMisuse("query was not started"))?;
        self.state()?.execute(NativeCall::EndQuery(kind.into_gl()));
        self.pending.set(Some(kind));
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.get().is_some()
    }

    fn try_get_result(&self) -> Option<QueryResult> {
        let kind = self.pending.get()?;
        let state = self.state.upgrade()?;
        let api = state.api();
        if !api.query_result_available(self.id) {
            return None;
        }
        let value = api.query_result(self.id);
        self.pending.set(None);
        Some(match kind {
            QueryKind::SamplesPassed => QueryResult::SamplesPassed(value),
            QueryKind::AnySamplesPassed => QueryResult::AnySamplesPassed(value > 0),
            QueryKind::TimeElapsed => QueryResult::TimeElapsed(Duration::from_nanos(value as u64)),
        })
    }
}

impl Drop for GlQuery {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.execute(NativeCall::DeleteQuery(self.id));
        }
    }
}
