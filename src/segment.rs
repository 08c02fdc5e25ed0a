// SPDX-License-Identifier: Apache-2.0

mod chain;

pub(crate) use chain::Chain;

use std::cmp::min;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use all_asserts::debug_assert_le;
use crate::fragment::{Fragment, FragmentCell};

/// The size of an engine-owned memory block, in bytes. The reserve policy
/// rounds requests up to whole blocks, amortizing small appends.
pub const SIZE: usize = 8192;

pub(crate) type Block<const N: usize> = Box<[u8; N]>;
pub(crate) type SharedBlock<const N: usize> = Rc<Block<N>>;

/// Allocates a fresh block. Zeroed once here; recycled blocks skip this cost.
pub(crate) fn alloc_block<const N: usize>() -> Block<N> {
	vec![0; N].into_boxed_slice()
		.try_into()
		.expect("boxed slice length should match the block size")
}

/// A segment's backing store.
#[derive(Clone)]
enum Backing<'d, const N: usize> {
	/// An engine-owned block with spare capacity at either end. Splitting a
	/// segment shares the block between both halves; a shared block is
	/// read-only until one side drops.
	Block(SharedBlock<N>),
	/// A variable-size block, created when a linearized prefix exceeds [`N`].
	/// Read-only.
	Boxed(Rc<Box<[u8]>>),
	/// Externally-owned memory. Read-only; the cell fires the fragment's
	/// release hook when its last referencing half drops.
	Fragment(Rc<FragmentCell<'d>>),
}

/// One ownership unit in a buffer's chain: a window `off..off + len` into an
/// owned block, a boxed slab, or an externally-owned [`Fragment`]. Space
/// before the window is prepend capacity, space after it is append capacity;
/// both exist only on an exclusively-owned block.
#[derive(Clone)]
pub struct Seg<'d, const N: usize = SIZE> {
	buf: Backing<'d, N>,
	off: usize,
	len: usize,
}

impl<'d, const N: usize> Seg<'d, N> {
	/// Wraps a fragment in a read-only segment.
	pub(crate) fn from_fragment(fragment: Box<dyn Fragment + 'd>) -> Self {
		let len = fragment.data().len();
		Self {
			buf: Backing::Fragment(Rc::new(FragmentCell::new(fragment))),
			off: 0,
			len,
		}
	}

	/// Wraps an already-filled boxed slab in a read-only segment.
	pub(crate) fn boxed(data: Box<[u8]>) -> Self {
		let len = data.len();
		Self {
			buf: Backing::Boxed(Rc::new(data)),
			off: 0,
			len,
		}
	}
}

impl<'d, const N: usize> Seg<'d, N> {
	/// Returns the length of data contained in the segment.
	pub fn len(&self) -> usize { self.len }

	/// Returns `true` if the segment is empty.
	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Returns `true` if the segment is not empty.
	pub fn is_not_empty(&self) -> bool { !self.is_empty() }

	/// Returns `true` if the segment exclusively owns a writable block.
	pub fn is_writable(&self) -> bool {
		matches!(&self.buf, Backing::Block(block) if Rc::strong_count(block) == 1)
	}

	/// Returns `true` if the segment cannot be written: a fragment, a boxed
	/// slab, or a block shared with another segment.
	pub fn is_shared(&self) -> bool { !self.is_writable() }

	/// Returns the leading capacity available for prepending.
	pub fn lead(&self) -> usize {
		if self.is_writable() { self.off } else { 0 }
	}

	/// Returns the trailing capacity available for appending.
	pub fn limit(&self) -> usize {
		if self.is_writable() { N - self.off - self.len } else { 0 }
	}

	/// Returns `true` if no more bytes can be appended to the segment.
	pub fn is_full(&self) -> bool { self.limit() == 0 }

	/// Returns a slice of the contained data.
	pub fn data(&self) -> &[u8] {
		let range = self.off..self.off + self.len;
		match &self.buf {
			Backing::Block(block) => &block[range],
			Backing::Boxed(boxed) => &boxed[range],
			Backing::Fragment(cell) => &cell.data()[range],
		}
	}

	/// Consumes up to `count` bytes from the front, returning the number of
	/// bytes consumed.
	pub fn consume(&mut self, mut count: usize) -> usize {
		count = min(count, self.len);
		self.off += count;
		self.len -= count;
		count
	}

	/// Extends the window over `count` bytes written to the trailing capacity.
	pub fn grow(&mut self, count: usize) {
		debug_assert_le!(count, self.limit());
		self.len += count;
	}

	/// Copies as much of `data` as fits into the trailing capacity, returning
	/// the number of bytes written.
	pub fn push_slice(&mut self, data: &[u8]) -> usize {
		let count = min(self.limit(), data.len());
		if count > 0 {
			let start = self.off + self.len;
			let block = self.block_mut()
				.expect("segment with trailing capacity should be an exclusive block");
			block[start..start + count].copy_from_slice(&data[..count]);
			self.len += count;
		}
		count
	}

	/// Copies as many *trailing* bytes of `data` as fit into the leading
	/// capacity, returning the number of bytes written. Prepends fill a
	/// segment back-to-front so the remaining lead stays usable.
	pub fn push_front_slice(&mut self, data: &[u8]) -> usize {
		let count = min(self.lead(), data.len());
		if count > 0 {
			let end = self.off;
			let block = self.block_mut()
				.expect("segment with leading capacity should be an exclusive block");
			block[end - count..end].copy_from_slice(&data[data.len() - count..]);
			self.off -= count;
			self.len += count;
		}
		count
	}

	/// Moves an empty writable segment's window to the end of its block, so
	/// all capacity becomes leading capacity for prepends.
	pub(crate) fn align_end(&mut self) {
		debug_assert!(self.is_empty() && self.is_writable());
		self.off = N;
	}

	/// Returns a new segment sharing the first `count` bytes of this one. The
	/// backing store is reference-counted, not copied; a shared block is
	/// read-only on both sides until one drops.
	pub fn share_prefix(&self, count: usize) -> Self {
		debug_assert_le!(count, self.len);
		let mut shared = self.clone();
		shared.len = count;
		shared
	}

	/// Splits the first `count` bytes off into a new segment, leaving the
	/// remainder behind. Both halves keep the original backing reference; for
	/// a fragment, the release hook fires when the last half is consumed.
	pub fn split_front(&mut self, count: usize) -> Self {
		let head = self.share_prefix(count);
		self.consume(count);
		head
	}

	/// Returns a pointer to the start of the trailing capacity, for a reserve
	/// slice. The pointee block is heap-pinned, so the pointer survives the
	/// segment moving within its chain.
	pub(crate) fn writable_ptr(&mut self) -> *mut u8 {
		let start = self.off + self.len;
		let block = self.block_mut()
			.expect("reserved segment should be an exclusive block");
		block[start..].as_mut_ptr()
	}

	/// Recovers the block for pool reuse. `None` for fragments, boxed slabs,
	/// and blocks still shared with another segment.
	pub(crate) fn into_block(self) -> Option<Block<N>> {
		match self.buf {
			Backing::Block(block) => Rc::into_inner(block),
			_ => None,
		}
	}

	fn block_mut(&mut self) -> Option<&mut [u8; N]> {
		match &mut self.buf {
			Backing::Block(block) => Rc::get_mut(block).map(|block| &mut **block),
			_ => None,
		}
	}
}

impl<'d, const N: usize> From<Block<N>> for Seg<'d, N> {
	fn from(value: Block<N>) -> Self {
		Self {
			buf: Backing::Block(Rc::new(value)),
			off: 0,
			len: 0,
		}
	}
}

impl<const N: usize> Default for Seg<'_, N> {
	fn default() -> Self { alloc_block().into() }
}

impl<const N: usize> Debug for Seg<'_, N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let kind = match &self.buf {
			Backing::Block(_) => "block",
			Backing::Boxed(_) => "boxed",
			Backing::Fragment(_) => "fragment",
		};
		f.debug_struct("Seg")
			.field("backing", &kind)
			.field("off", &self.off)
			.field("len", &self.len)
			.finish()
	}
}
