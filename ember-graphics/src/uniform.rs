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

//! Uniform data writers. [`UniformBuffer`] lays out values using std140 rules, while
//! [`AlignedUniformArray`] packs many such records into one buffer so they can be bound by
//! (buffer, offset, size) ranges.

use crate::{
    core::{
        algebra::{Matrix4, Vector2, Vector3, Vector4},
        arrayvec::ArrayVec,
        math::align_up,
        value_as_u8_slice,
    },
    error::FrameworkError,
};
use bytemuck::Pod;

pub trait ByteStorage: Default {
    fn bytes(&self) -> &[u8];
    fn bytes_count(&self) -> usize;
    fn write_bytes(&mut self, bytes: &[u8]);
}

impl<const N: usize> ByteStorage for ArrayVec<u8, N> {
    fn bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn bytes_count(&self) -> usize {
        self.len()
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        // Static buffers are sized for their content at compile time.
        self.try_extend_from_slice(bytes)
            .expect("static uniform buffer overflow")
    }
}

impl ByteStorage for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn bytes_count(&self) -> usize {
        self.len()
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes)
    }
}

#[derive(Default)]
pub struct UniformBuffer<S: ByteStorage> {
    storage: S,
}

pub type StaticUniformBuffer<const N: usize> = UniformBuffer<ArrayVec<u8, N>>;
pub type DynamicUniformBuffer = UniformBuffer<Vec<u8>>;

pub trait AlignmentProvider: Pod {
    const ALIGNMENT: usize;
}

macro_rules! define_alignment {
    ($inner_type:ty = $alignment:expr) => {
        impl AlignmentProvider for $inner_type {
            const ALIGNMENT: usize = $alignment;
        }
    };
}

define_alignment!(u32 = 4);
define_alignment!(i32 = 4);
define_alignment!(f32 = 4);
define_alignment!(Vector2<f32> = 8);
define_alignment!(Vector3<f32> = 16);
define_alignment!(Vector4<f32> = 16);
define_alignment!(Matrix4<f32> = 16);
define_alignment!([f32; 2] = 8);
define_alignment!([f32; 3] = 16);
define_alignment!([f32; 4] = 16);

impl<S> UniformBuffer<S>
where
    S: ByteStorage,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.storage.bytes_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_padding(&mut self, alignment: usize) {
        let bytes_count = self.storage.bytes_count();
        let remainder = bytes_count % alignment;
        if remainder > 0 {
            let padding = alignment - remainder;
            for _ in 0..padding {
                self.storage.write_bytes(&[0]);
            }
        }
    }

    fn push_raw<T>(&mut self, value: &T)
    where
        T: Pod,
    {
        self.storage.write_bytes(value_as_u8_slice(value))
    }

    pub fn push<T>(&mut self, value: &T) -> &mut Self
    where
        T: AlignmentProvider,
    {
        self.push_padding(T::ALIGNMENT);
        self.push_raw(value);
        self
    }

    pub fn with<T>(mut self, value: &T) -> Self
    where
        T: AlignmentProvider,
    {
        self.push(value);
        self
    }

    /// Pushes an array, every element of which occupies at least 16 bytes (std140 array stride).
    pub fn push_slice<T>(&mut self, slice: &[T]) -> &mut Self
    where
        T: AlignmentProvider,
    {
        for item in slice {
            self.push_padding(16);
            self.push_raw(item);
        }
        self.push_padding(16);
        self
    }

    pub fn with_slice<T>(mut self, slice: &[T]) -> Self
    where
        T: AlignmentProvider,
    {
        self.push_slice(slice);
        self
    }

    /// Pads the data to a multiple of 16 bytes, as required for the size of a std140 block.
    pub fn finish(mut self) -> S {
        self.push_padding(16);
        self.storage
    }

    pub fn bytes(&self) -> &[u8] {
        self.storage.bytes()
    }
}

/// A packed array of fixed-size records preceded by an optional fixed-size header. Every record
/// (and the first one right after the header) starts at an offset aligned to the uniform buffer
/// offset alignment of the device, so each of them could be bound as a separate uniform block.
#[derive(Debug, Clone)]
pub struct AlignedUniformArray {
    alignment: usize,
    header_size: usize,
    element_size: usize,
    len: usize,
    data: Vec<u8>,
}

impl AlignedUniformArray {
    pub fn new(alignment: usize, header_size: usize, element_size: usize) -> Self {
        Self {
            alignment,
            header_size,
            element_size,
            len: 0,
            data: vec![0; align_up(header_size, alignment)],
        }
    }

    /// Distance in bytes between two adjacent elements.
    pub fn stride(&self) -> usize {
        align_up(self.element_size, self.alignment)
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Offset of `index`-th element from the start of the buffer.
    pub fn offset(&self, index: usize) -> usize {
        align_up(self.header_size, self.alignment) + index * self.stride()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Changes the element count. Already written data of the surviving elements is preserved,
    /// new elements are zeroed.
    pub fn resize(&mut self, len: usize) {
        self.len = len;
        let size = self.offset(len);
        self.data.resize(size, 0);
    }

    /// Removes all elements, keeps the header.
    pub fn clear(&mut self) {
        self.resize(0);
    }

    pub fn set_header(&mut self, bytes: &[u8]) -> Result<(), FrameworkError> {
        if bytes.len() > self.header_size {
            return Err(FrameworkError::UniformArrayElementSize {
                expected: self.header_size,
                actual: bytes.len(),
            });
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn set_element(&mut self, index: usize, bytes: &[u8]) -> Result<(), FrameworkError> {
        if index >= self.len {
            return Err(FrameworkError::UniformArrayIndexOutOfRange {
                index,
                len: self.len,
            });
        }
        if bytes.len() > self.element_size {
            return Err(FrameworkError::UniformArrayElementSize {
                expected: self.element_size,
                actual: bytes.len(),
            });
        }
        let offset = self.offset(index);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Appends a new element and returns its index.
    pub fn push(&mut self, bytes: &[u8]) -> Result<usize, FrameworkError> {
        let index = self.len;
        self.resize(index + 1);
        if let Err(err) = self.set_element(index, bytes) {
            self.resize(index);
            return Err(err);
        }
        Ok(index)
    }

    pub fn element(&self, index: usize) -> Result<&[u8], FrameworkError> {
        if index >= self.len {
            return Err(FrameworkError::UniformArrayIndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let offset = self.offset(index);
        Ok(&self.data[offset..offset + self.element_size])
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod test {
    use super::{AlignedUniformArray, DynamicUniformBuffer, StaticUniformBuffer};
    use crate::{
        core::{
            algebra::{Matrix3, Matrix4, Vector3, Vector4},
            math::align_up,
        },
        error::FrameworkError,
    };

    #[test]
    fn test_uniform_buffer() {
        let mut buffer = DynamicUniformBuffer::default();
        buffer.push(&123.321f32);
        assert_eq!(buffer.len(), 4);
        buffer.push(&Vector3::new(1.0f32, 2.0, 3.0));
        assert_eq!(buffer.len(), 28);
        buffer.push(&Vector4::new(1.0f32, 2.0, 3.0, 4.0));
        assert_eq!(buffer.len(), 48);
        buffer.push_slice(Matrix3::<f32>::default().as_slice());
        assert_eq!(buffer.len(), 48 + 9 * 16);
    }

    #[test]
    fn test_static_uniform_buffer() {
        let bytes = StaticUniformBuffer::<256>::new()
            .with(&Matrix4::<f32>::identity())
            .with(&1.0f32)
            .finish();
        assert_eq!(bytes.len(), 80);
    }

    #[test]
    fn test_aligned_offsets() {
        for alignment in [1, 4, 16, 64, 256] {
            for header in [0, 1, 16, 100] {
                for element in [4, 16, 176, 300] {
                    let array = AlignedUniformArray::new(alignment, header, element);
                    assert_eq!(array.offset(0), align_up(header, alignment));
                    for i in 0..8 {
                        assert_eq!(
                            array.offset(i + 1) - array.offset(i),
                            align_up(element, alignment)
                        );
                        assert_eq!(array.offset(i) % alignment, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_resize_preserves_prefix() {
        let mut array = AlignedUniformArray::new(256, 16, 32);
        array.set_header(&[7; 16]).unwrap();
        assert_eq!(array.push(&[1; 32]).unwrap(), 0);
        assert_eq!(array.push(&[2; 32]).unwrap(), 1);
        array.resize(5);
        assert_eq!(array.element(0).unwrap(), &[1; 32]);
        assert_eq!(array.element(1).unwrap(), &[2; 32]);
        assert_eq!(array.element(4).unwrap(), &[0; 32]);
        assert_eq!(&array.bytes()[..16], &[7; 16]);
        assert_eq!(array.bytes().len(), 256 + 5 * 256);
    }

    #[test]
    fn test_out_of_range() {
        let mut array = AlignedUniformArray::new(16, 0, 16);
        array.resize(2);
        assert!(matches!(
            array.set_element(2, &[0; 4]),
            Err(FrameworkError::UniformArrayIndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(array.element(3).is_err());
        assert!(matches!(
            array.push(&[0; 17]),
            Err(FrameworkError::UniformArrayElementSize { .. })
        ));
        assert_eq!(array.len(), 2);
    }
}
