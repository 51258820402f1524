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

use crate::buffer::Buffer;
use std::{any::Any, rc::Rc};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AttributeKind {
    Float,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
}

impl AttributeKind {
    pub fn size(self) -> usize {
        match self {
            AttributeKind::Float | AttributeKind::UnsignedInt => 4,
            AttributeKind::UnsignedByte => 1,
            AttributeKind::UnsignedShort => 2,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct AttributeDefinition {
    pub location: u32,
    pub kind: AttributeKind,
    pub component_count: usize,
    pub normalized: bool,
    pub divisor: u32,
}

impl AttributeDefinition {
    pub fn float(location: u32, component_count: usize) -> Self {
        Self {
            location,
            kind: AttributeKind::Float,
            component_count,
            normalized: false,
            divisor: 0,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.kind.size() * self.component_count
    }
}

/// Interleaved vertex layout. Attributes are tightly packed in declaration order.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct VertexLayout {
    pub stride: usize,
    pub attributes: Vec<AttributeDefinition>,
}

impl VertexLayout {
    pub fn new(attributes: Vec<AttributeDefinition>) -> Self {
        Self {
            stride: attributes.iter().map(|a| a.size_in_bytes()).sum(),
            attributes,
        }
    }

    /// Byte offset of every attribute inside a vertex.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, &AttributeDefinition)> {
        self.attributes.iter().scan(0, |offset, attribute| {
            let current = *offset;
            *offset += attribute.size_in_bytes();
            Some((current, attribute))
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum IndexKind {
    U16,
    #[default]
    U32,
}

impl IndexKind {
    pub fn size(self) -> usize {
        match self {
            IndexKind::U16 => 2,
            IndexKind::U32 => 4,
        }
    }
}

pub struct VertexArrayDescriptor {
    pub layout: VertexLayout,
    pub vertex_buffer: Rc<dyn Buffer>,
    pub index_buffer: Option<Rc<dyn Buffer>>,
    pub index_kind: IndexKind,
}

pub trait VertexArrayObject: Any {
    fn as_any(&self) -> &dyn Any;

    fn vertex_buffer(&self) -> &Rc<dyn Buffer>;

    fn index_buffer(&self) -> Option<&Rc<dyn Buffer>>;

    fn layout(&self) -> &VertexLayout;

    fn index_kind(&self) -> IndexKind;

    /// Amount of whole vertices the vertex buffer currently holds.
    fn vertex_count(&self) -> usize {
        let stride = self.layout().stride;
        if stride == 0 {
            0
        } else {
            self.vertex_buffer().size() / stride
        }
    }

    /// Amount of indices the index buffer currently holds, zero if there is no index buffer.
    fn index_count(&self) -> usize {
        self.index_buffer()
            .map_or(0, |b| b.size() / self.index_kind().size())
    }
}

#[cfg(test)]
mod test {
    use super::{AttributeDefinition, AttributeKind, VertexLayout};

    #[test]
    fn test_layout_offsets() {
        let layout = VertexLayout::new(vec![
            AttributeDefinition::float(0, 3),
            AttributeDefinition {
                location: 1,
                kind: AttributeKind::UnsignedByte,
                component_count: 4,
                normalized: true,
                divisor: 0,
            },
            AttributeDefinition::float(2, 2),
        ]);
        assert_eq!(layout.stride, 24);
        let offsets = layout.offsets().map(|(o, _)| o).collect::<Vec<_>>();
        assert_eq!(offsets, vec![0, 12, 16]);
    }
}
