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

//! A generational arena - a contiguous growable array type which allows removing
//! from the middle without shifting and therefore without invalidating other indices.
//!
//! Pool is a contiguous block of memory with fixed-size entries, each entry can be
//! either vacant or occupied. When you put an object into the pool you get a handle
//! to that object. You can use that handle later on to borrow a reference to an object.
//! A handle can point to some object or be invalid, this may look similar to raw
//! pointers, but there is two major differences:
//!
//! 1) We can check if a handle is valid before accessing the object it might point to.
//! 2) We can ensure the handle we're using is still valid for an object it points to
//!    to make sure it hasn't been replaced with a different object on the same position.
//!    Each handle stores a special field called generation which is shared across the
//!    entry and the handle, so the handle is valid if these fields are the same on both
//!    the entry and the handle.

use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
};

const INVALID_GENERATION: u32 = 0;

/// Handle is some sort of non-owning reference to content in a pool. It stores
/// index of object and additional information that allows to ensure that handle
/// is still valid (points to the same object as when handle was created).
pub struct Handle<T> {
    index: u32,
    generation: u32,
    type_marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Handle<T>) -> bool {
        self.generation == other.generation && self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<T> Debug for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Idx: {}; Gen: {}]", self.index, self.generation)
    }
}

impl<T> Display for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

impl<T> Handle<T> {
    /// A handle that never points to anything.
    pub const NONE: Handle<T> = Handle {
        index: 0,
        generation: INVALID_GENERATION,
        type_marker: PhantomData,
    };

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn is_none(self) -> bool {
        self.index == 0 && self.generation == INVALID_GENERATION
    }

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Creates a handle from raw parts.
    #[inline(always)]
    pub fn new(index: u32, generation: u32) -> Self {
        Handle {
            index,
            generation,
            type_marker: PhantomData,
        }
    }
}

#[derive(Debug)]
struct PoolRecord<T> {
    // Generation number, used to keep info about lifetime. The handle is valid
    // only if record it points to is of the same generation as the pool record.
    // Notes: Zero is unknown generation used for None handles.
    generation: u32,
    payload: Option<T>,
}

/// See module docs.
#[derive(Debug)]
pub struct Pool<T> {
    records: Vec<PoolRecord<T>>,
    free_stack: Vec<u32>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    /// Creates a new empty pool.
    #[inline]
    pub fn new() -> Self {
        Pool {
            records: Vec::new(),
            free_stack: Vec::new(),
        }
    }

    /// Puts an object into the pool and returns a handle to it. Vacant entries are reused.
    #[inline]
    #[must_use]
    pub fn spawn(&mut self, payload: T) -> Handle<T> {
        if let Some(free_index) = self.free_stack.pop() {
            let record = &mut self.records[free_index as usize];
            debug_assert!(record.payload.is_none());
            record.generation += 1;
            record.payload = Some(payload);
            Handle::new(free_index, record.generation)
        } else {
            let index = self.records.len() as u32;
            self.records.push(PoolRecord {
                generation: 1,
                payload: Some(payload),
            });
            Handle::new(index, 1)
        }
    }

    /// Borrows shared reference to an object by its handle. Returns `None` if the handle is
    /// stale or out of bounds.
    #[inline]
    pub fn try_borrow(&self, handle: Handle<T>) -> Option<&T> {
        self.records
            .get(handle.index as usize)
            .filter(|r| r.generation == handle.generation)
            .and_then(|r| r.payload.as_ref())
    }

    /// Same as [`Self::try_borrow`], but returns mutable reference.
    #[inline]
    pub fn try_borrow_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.records
            .get_mut(handle.index as usize)
            .filter(|r| r.generation == handle.generation)
            .and_then(|r| r.payload.as_mut())
    }

    /// Moves an object out of the pool. The handle (and all copies of it) become invalid.
    #[inline]
    pub fn try_free(&mut self, handle: Handle<T>) -> Option<T> {
        let record = self
            .records
            .get_mut(handle.index as usize)
            .filter(|r| r.generation == handle.generation)?;
        let payload = record.payload.take();
        if payload.is_some() {
            self.free_stack.push(handle.index);
        }
        payload
    }

    /// Checks if the handle points to a live object.
    #[inline]
    pub fn is_valid_handle(&self, handle: Handle<T>) -> bool {
        self.try_borrow(handle).is_some()
    }

    /// Destroys every object in the pool. Generations are kept, so old handles stay invalid.
    #[inline]
    pub fn clear(&mut self) {
        for (index, record) in self.records.iter_mut().enumerate() {
            if record.payload.take().is_some() {
                self.free_stack.push(index as u32);
            }
        }
    }

    /// Returns the number of live objects.
    #[inline]
    pub fn alive_count(&self) -> usize {
        self.records.iter().filter(|r| r.payload.is_some()).count()
    }

    /// Iterates over live objects.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter().filter_map(|r| r.payload.as_ref())
    }

    /// Iterates over live objects, mutably.
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.records.iter_mut().filter_map(|r| r.payload.as_mut())
    }

    /// Iterates over pairs of (handle, object) of live objects.
    #[inline]
    pub fn pair_iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.records.iter().enumerate().filter_map(|(i, r)| {
            r.payload
                .as_ref()
                .map(|p| (Handle::new(i as u32, r.generation), p))
        })
    }
}

#[cfg(test)]
mod test {
    use super::{Handle, Pool};

    #[test]
    fn test_pool_reuse_invalidates_old_handles() {
        let mut pool = Pool::new();
        let a = pool.spawn(1);
        let b = pool.spawn(2);
        assert_eq!(pool.try_free(a), Some(1));
        assert!(!pool.is_valid_handle(a));

        let c = pool.spawn(3);
        assert_eq!(c.index(), a.index());
        assert_ne!(c, a);
        assert_eq!(pool.try_borrow(a), None);
        assert_eq!(pool.try_borrow(c), Some(&3));
        assert_eq!(pool.try_borrow(b), Some(&2));
        assert_eq!(pool.alive_count(), 2);
    }

    #[test]
    fn test_pool_clear() {
        let mut pool = Pool::new();
        let handles = (0..4).map(|i| pool.spawn(i)).collect::<Vec<_>>();
        pool.clear();
        assert_eq!(pool.alive_count(), 0);
        assert!(handles.iter().all(|h| !pool.is_valid_handle(*h)));
        assert_eq!(pool.try_free(handles[0]), None);
        assert!(Handle::<i32>::NONE.is_none());
    }
}
