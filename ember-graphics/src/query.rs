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

//! GPU queries. Results are fetched without blocking: [`Query::try_get_result`] returns `None`
//! until the GPU has actually produced the value.

use crate::error::FrameworkError;
use std::{any::Any, time::Duration};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum QueryKind {
    SamplesPassed,
    AnySamplesPassed,
    TimeElapsed,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum QueryResult {
    SamplesPassed(u32),
    AnySamplesPassed(bool),
    TimeElapsed(Duration),
}

pub trait Query: Any {
    fn as_any(&self) -> &dyn Any;

    /// Starts the query. Beginning a query that is already active is an error.
    fn begin(&self, kind: QueryKind) -> Result<(), FrameworkError>;

    /// Ends the active query. Ending a query that was never started is an error.
    fn end(&self) -> Result<(), FrameworkError>;

    fn is_active(&self) -> bool;

    /// Polls the result of the last finished query.
    fn try_get_result(&self) -> Option<QueryResult>;
}
