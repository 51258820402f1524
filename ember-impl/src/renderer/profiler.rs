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

//! GPU timings of named render scopes, measured with `TimeElapsed` queries.
//!
//! Reading a query result never blocks: [`GpuProfiler::poll`] only collects the results the GPU
//! has already produced and leaves the rest in flight for the next frame. Queries are recycled
//! through a free list once their result was consumed.

use crate::{
    core::fxhash::FxHashMap,
    graphics::{
        command::CommandBuffer,
        query::{Query, QueryKind, QueryResult},
        server::GraphicsServer,
    },
    renderer::RendererError,
};
use std::{rc::Rc, time::Duration};

struct Scope {
    name: String,
    query: Rc<dyn Query>,
}

#[derive(Default)]
pub struct GpuProfiler {
    enabled: bool,
    free: Vec<Rc<dyn Query>>,
    open: Option<Scope>,
    in_flight: Vec<Scope>,
    results: FxHashMap<String, Duration>,
}

impl GpuProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Opens a named scope. Scopes do not nest, since `TimeElapsed` queries cannot overlap.
    pub fn begin(
        &mut self,
        server: &dyn GraphicsServer,
        cmd: &mut CommandBuffer,
        name: &str,
    ) -> Result<(), RendererError> {
        if !self.enabled {
            return Ok(());
        }

        if let Some(open) = self.open.as_ref() {
            return Err(RendererError::ProfilerScopeAlreadyOpen {
                open: open.name.clone(),
                requested: name.to_owned(),
            });
        }

        let query = match self.free.pop() {
            Some(query) => query,
            None => server.create_query()?,
        };
        cmd.begin_query(query.clone(), QueryKind::TimeElapsed);
        self.open = Some(Scope {
            name: name.to_owned(),
            query,
        });

        Ok(())
    }

    /// Closes the scope opened by [`Self::begin`].
    pub fn end(&mut self, cmd: &mut CommandBuffer) -> Result<(), RendererError> {
        if !self.enabled {
            return Ok(());
        }

        let scope = self.open.take().ok_or(RendererError::NoOpenProfilerScope)?;
        cmd.end_query(scope.query.clone());
        self.in_flight.push(scope);

        Ok(())
    }

    /// Collects every available result. Returns the amount of results collected.
    pub fn poll(&mut self) -> usize {
        let mut collected = 0;
        let mut index = 0;
        while index < self.in_flight.len() {
            match self.in_flight[index].query.try_get_result() {
                Some(QueryResult::TimeElapsed(time)) => {
                    let scope = self.in_flight.swap_remove(index);
                    self.results.insert(scope.name, time);
                    self.free.push(scope.query);
                    collected += 1;
                }
                // Not a timer query result, the query is still usable.
                Some(_) => {
                    let scope = self.in_flight.swap_remove(index);
                    self.free.push(scope.query);
                }
                None => index += 1,
            }
        }
        collected
    }

    /// The last measured time of the scope.
    pub fn result(&self, name: &str) -> Option<Duration> {
        self.results.get(name).copied()
    }

    pub fn results(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.results.iter().map(|(name, time)| (name.as_str(), *time))
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::gl::server::GlGraphicsServer;

    #[test]
    fn test_queries_are_recycled() {
        let (server, recorder) = GlGraphicsServer::headless(16, 16).unwrap();
        recorder.set_query_value(1_500_000);
        let mut profiler = GpuProfiler::new(true);
        let mut cmd = server.create_command_buffer();

        profiler.begin(&*server, &mut cmd, "Lighting").unwrap();
        profiler.end(&mut cmd).unwrap();
        profiler.begin(&*server, &mut cmd, "UI").unwrap();
        profiler.end(&mut cmd).unwrap();
        assert_eq!(profiler.in_flight_count(), 2);

        // Nothing was executed yet, so nothing is available.
        assert_eq!(profiler.poll(), 0);
        assert_eq!(profiler.result("Lighting"), None);

        server.submit(&mut cmd).unwrap();
        assert_eq!(profiler.poll(), 2);
        assert_eq!(profiler.in_flight_count(), 0);
        assert_eq!(profiler.free_count(), 2);
        assert_eq!(
            profiler.result("Lighting"),
            Some(Duration::from_nanos(1_500_000))
        );

        // Free queries are reused instead of creating new ones.
        profiler.begin(&*server, &mut cmd, "Lighting").unwrap();
        assert_eq!(profiler.free_count(), 1);
        profiler.end(&mut cmd).unwrap();
        server.submit(&mut cmd).unwrap();
        profiler.poll();
        assert_eq!(profiler.free_count(), 2);
    }

    #[test]
    fn test_scope_misuse() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let mut profiler = GpuProfiler::new(true);
        let mut cmd = server.create_command_buffer();
        assert!(matches!(
            profiler.end(&mut cmd),
            Err(RendererError::NoOpenProfilerScope)
        ));
        profiler.begin(&*server, &mut cmd, "A").unwrap();
        assert!(matches!(
            profiler.begin(&*server, &mut cmd, "B"),
            Err(RendererError::ProfilerScopeAlreadyOpen { open, requested })
                if open == "A" && requested == "B"
        ));
    }

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let (server, _) = GlGraphicsServer::headless(16, 16).unwrap();
        let mut profiler = GpuProfiler::new(false);
        let mut cmd = server.create_command_buffer();
        profiler.begin(&*server, &mut cmd, "A").unwrap();
        profiler.end(&mut cmd).unwrap();
        assert!(cmd.is_empty());
        assert_eq!(profiler.in_flight_count(), 0);
    }
}
