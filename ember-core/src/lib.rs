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

//! Core data structures and algorithms shared by every crate of the renderer.

#![warn(missing_docs)]

pub use arrayvec;
pub use bytemuck;
pub use fxhash;
pub use nalgebra as algebra;
pub use parking_lot;

pub mod color;
pub mod log;
pub mod math;
pub mod pool;

use bytemuck::Pod;

/// Views a plain-old-data value as a slice of bytes.
#[inline]
pub fn value_as_u8_slice<T: Pod>(v: &T) -> &[u8] {
    bytemuck::bytes_of(v)
}

/// Views a slice of plain-old-data values as a slice of bytes.
#[inline]
pub fn array_as_u8_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Unwraps an `Option`, or `continue`s the enclosing loop on `None`.
#[macro_export]
macro_rules! some_or_continue {
    ($expr:expr) => {
        match $expr {
            Some(value) => value,
            None => continue,
        }
    };
}

/// Unwraps an `Option`, or returns from the enclosing function on `None`.
#[macro_export]
macro_rules! some_or_return {
    ($expr:expr) => {
        match $expr {
            Some(value) => value,
            None => return,
        }
    };
    ($expr:expr, $default:expr) => {
        match $expr {
            Some(value) => value,
            None => return $default,
        }
    };
}

#[cfg(test)]
mod test {
    use crate::{algebra::Matrix4, array_as_u8_slice, value_as_u8_slice};

    #[test]
    fn test_byte_views() {
        assert_eq!(value_as_u8_slice(&1.0f32).len(), 4);
        assert_eq!(value_as_u8_slice(&Matrix4::<f32>::identity()).len(), 64);
        assert_eq!(array_as_u8_slice(&[1u32, 2, 3]).len(), 12);
    }

    #[test]
    fn test_some_or_continue() {
        let mut sum = 0;
        for value in [Some(1), None, Some(3)] {
            sum += some_or_continue!(value);
        }
        assert_eq!(sum, 4);
    }
}
