//! Bounds checked windows into a shared byte buffer.
//!
//! A [`View`] never owns its storage. All sub-slicing produces new views over the same bytes,
//! which allows the headers of all layers of a packet to alias one captured buffer. The
//! position of a view within its storage is described by a [`Span`], the plain index pair that
//! the packet tree keeps in place of a borrowed view.
use core::ops::Range;
use byteorder::ByteOrder;

use super::{Error, Result};

/// The location of a view within its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// The first byte of the view.
    pub offset: usize,
    /// The number of bytes in the view.
    pub len: usize,
}

impl Span {
    /// Create a span from an offset and length.
    pub const fn new(offset: usize, len: usize) -> Self {
        Span { offset, len }
    }

    /// The index one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The span as an index range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// A sub-span relative to the start of this span.
    ///
    /// Fails with `OutOfBounds` if the sub-span would end after this span.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Span> {
        let end = offset.checked_add(len).ok_or(Error::OutOfBounds)?;
        if end > self.len {
            return Err(Error::OutOfBounds);
        }

        Ok(Span::new(self.offset + offset, len))
    }

    /// The remainder of this span after `offset` bytes.
    pub fn tail(&self, offset: usize) -> Result<Span> {
        if offset > self.len {
            return Err(Error::OutOfBounds);
        }

        Ok(Span::new(self.offset + offset, self.len - offset))
    }
}

/// A read-only window into shared storage.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    storage: &'a [u8],
    span: Span,
}

/// A mutable window into storage.
///
/// Writes go directly to the underlying buffer.
#[derive(Debug)]
pub struct ViewMut<'a> {
    storage: &'a mut [u8],
    span: Span,
}

impl<'a> View<'a> {
    /// A view of the whole storage.
    pub fn new(storage: &'a [u8]) -> Self {
        View { storage, span: Span::new(0, storage.len()) }
    }

    /// A view of the bytes described by `span`.
    pub fn with_span(storage: &'a [u8], span: Span) -> Result<Self> {
        if span.offset.checked_add(span.len).map_or(true, |end| end > storage.len()) {
            return Err(Error::OutOfBounds);
        }

        Ok(View { storage, span })
    }

    /// Narrow the view to `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        Ok(View { storage: self.storage, span: self.span.slice(offset, len)? })
    }

    /// The remainder of the view after `offset` bytes.
    pub fn tail(&self, offset: usize) -> Result<Self> {
        Ok(View { storage: self.storage, span: self.span.tail(offset)? })
    }

    /// The location of this view within its storage.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn len(&self) -> usize {
        self.span.len
    }

    pub fn is_empty(&self) -> bool {
        self.span.len == 0
    }

    /// Check if the view ends exactly where its storage ends.
    ///
    /// An owned copy of such a view can be avoided by truncating the front of the storage.
    pub fn is_flush(&self) -> bool {
        self.span.end() == self.storage.len()
    }

    /// The bytes of this view.
    pub fn as_slice(&self) -> &'a [u8] {
        &self.storage[self.span.range()]
    }

    /// Copy the bytes of the view into a right-sized buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    pub fn read_u8(&self, at: usize) -> Result<u8> {
        Ok(self.field(at, 1)?[0])
    }

    pub fn read_u16<B: ByteOrder>(&self, at: usize) -> Result<u16> {
        Ok(B::read_u16(self.field(at, 2)?))
    }

    pub fn read_u32<B: ByteOrder>(&self, at: usize) -> Result<u32> {
        Ok(B::read_u32(self.field(at, 4)?))
    }

    fn field(&self, at: usize, len: usize) -> Result<&'a [u8]> {
        Ok(self.slice(at, len)?.as_slice())
    }
}

impl<'a> ViewMut<'a> {
    /// A mutable view of the whole storage.
    pub fn new(storage: &'a mut [u8]) -> Self {
        let span = Span::new(0, storage.len());
        ViewMut { storage, span }
    }

    /// A mutable view of the bytes described by `span`.
    pub fn with_span(storage: &'a mut [u8], span: Span) -> Result<Self> {
        View::with_span(storage, span)?;
        Ok(ViewMut { storage, span })
    }

    /// The bytes of this view, for as long as the storage is borrowed.
    pub fn into_mut_slice(self) -> &'a mut [u8] {
        &mut self.storage[self.span.range()]
    }

    pub fn write_u8(&mut self, at: usize, value: u8) -> Result<()> {
        self.field_mut(at, 1)?[0] = value;
        Ok(())
    }

    pub fn write_u16<B: ByteOrder>(&mut self, at: usize, value: u16) -> Result<()> {
        B::write_u16(self.field_mut(at, 2)?, value);
        Ok(())
    }

    pub fn write_u32<B: ByteOrder>(&mut self, at: usize, value: u32) -> Result<()> {
        B::write_u32(self.field_mut(at, 4)?, value);
        Ok(())
    }

    fn field_mut(&mut self, at: usize, len: usize) -> Result<&mut [u8]> {
        let span = self.span.slice(at, len)?;
        Ok(&mut self.storage[span.range()])
    }
}
