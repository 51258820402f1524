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

//! Small math helpers shared between the graphics layers.

use crate::algebra::{Scalar, Vector2};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Axis-aligned rectangle defined by its top-left corner and size.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect<T: Scalar> {
    /// Top-left corner.
    pub position: Vector2<T>,
    /// Width and height.
    pub size: Vector2<T>,
}

impl<T> Rect<T>
where
    T: Scalar + Copy + PartialOrd + Add<Output = T> + Sub<Output = T>,
{
    /// Creates a new rectangle.
    #[inline]
    pub fn new(x: T, y: T, w: T, h: T) -> Self {
        Self {
            position: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }

    /// Left edge.
    #[inline]
    pub fn x(&self) -> T {
        self.position.x
    }

    /// Top edge.
    #[inline]
    pub fn y(&self) -> T {
        self.position.y
    }

    #[inline]
    #[allow(missing_docs)]
    pub fn w(&self) -> T {
        self.size.x
    }

    #[inline]
    #[allow(missing_docs)]
    pub fn h(&self) -> T {
        self.size.y
    }

    /// Checks if the point lies inside the rectangle (edges included).
    #[inline]
    pub fn contains(&self, pt: Vector2<T>) -> bool {
        pt.x >= self.position.x
            && pt.x <= self.position.x + self.size.x
            && pt.y >= self.position.y
            && pt.y <= self.position.y + self.size.y
    }
}

/// Rounds `value` up to the nearest multiple of `alignment`. Zero alignment leaves the value
/// untouched.
#[inline]
pub fn align_up(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod test {
    use super::{align_up, Rect};
    use crate::algebra::Vector2;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(13, 0), 13);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(0, 0, 10, 5);
        assert!(rect.contains(Vector2::new(10, 5)));
        assert!(!rect.contains(Vector2::new(11, 5)));
    }
}
