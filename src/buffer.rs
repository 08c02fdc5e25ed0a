// SPDX-License-Identifier: Apache-2.0

mod io;

pub use io::*;

use std::cmp::min;
use std::fmt::{self, Debug, Formatter};
use std::mem;
use all_asserts::assert_le;
use itertools::Itertools;
use crate::fragment::Fragment;
use crate::pattern::Pattern;
use crate::pool::{pool, DefaultPoolContainer, Pool};
use crate::segment::{Chain, Seg, SIZE};
use crate::slice::RawSlice;

/// A segmented byte buffer which borrows and returns pool memory as needed.
///
/// A buffer owns one chain of segments and supports the full proxy
/// data-path operation set: append by copy ([`add`]), append by
/// reference ([`add_fragment`]), prepend, zero-copy moves between buffers,
/// reserve/commit for vectored reads, draining consumed bytes from the front,
/// linearizing a prefix, and searching across segment boundaries.
///
/// A buffer is single-owner, single-thread state: it carries no internal
/// synchronization, and the `Rc`-counted backing makes it `!Send`, so binding
/// an instance to one event-loop-driven connection is enforced by the type.
///
/// [`add`]: Buffer::add
/// [`add_fragment`]: Buffer::add_fragment
pub struct Buffer<
	'd,
	const N: usize = SIZE,
	P: Pool<N> = DefaultPoolContainer
> {
	chain: Chain<'d, N>,
	pool: P,
	/// Slices outstanding from the last `reserve`, cleared on `commit`.
	reserved: usize,
}

impl<const N: usize, P: Pool<N>> Default for Buffer<'_, N, P> {
	fn default() -> Self { Self::with_pool(P::get()) }
}

impl<'d> Buffer<'d> {
	/// Creates a new, empty buffer drawing from the thread-local default pool.
	pub fn new() -> Self {
		Self::with_pool(pool())
	}

	/// Creates a new buffer with capacity reserved for at least `capacity`
	/// bytes.
	pub fn with_capacity(capacity: usize) -> Self {
		let mut new = Self::new();
		new.claim_or_alloc(capacity);
		new
	}

	/// Creates a new buffer containing a copy of `data`.
	pub fn from_slice(data: &[u8]) -> Self {
		let mut new = Self::new();
		new.add(data);
		new
	}
}

impl<const N: usize, P: Pool<N>> Debug for Buffer<'_, N, P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Buffer")
			.field("chain", &self.chain)
			.field("reserved", &self.reserved)
			.finish_non_exhaustive()
	}
}

impl<'d, const N: usize, P: Pool<N>> Buffer<'d, N, P> {
	/// Creates a new, empty buffer drawing from `pool`.
	pub const fn with_pool(pool: P) -> Self {
		Self {
			chain: Chain::new(),
			pool,
			reserved: 0,
		}
	}

	/// Returns the number of bytes in the buffer.
	pub fn count(&self) -> usize { self.chain.count() }

	/// Returns `true` if the buffer is empty.
	pub fn is_empty(&self) -> bool { self.chain.is_empty() }

	/// Returns `true` if the buffer is not empty.
	pub fn is_not_empty(&self) -> bool { !self.is_empty() }

	/// Returns the number of bytes that can be written before more segments
	/// are claimed.
	pub fn limit(&self) -> usize { self.chain.limit() }

	/// Appends `data` to the buffer by copy.
	pub fn add(&mut self, mut data: &[u8]) {
		while !data.is_empty() {
			let written = self.chain.push_back_slice(data);
			if written == 0 {
				self.claim_or_alloc(data.len());
				continue
			}
			data = &data[written..];
		}
	}

	/// Copies the contents of `other` into this buffer. The source is not
	/// consumed. The source is necessarily a distinct instance; the borrow
	/// rules forbid passing the destination here.
	pub fn add_buffer(&mut self, other: &Buffer<'d, N, impl Pool<N>>) {
		for slice in other.chain.iter_slices() {
			self.add(slice);
		}
	}

	/// Appends externally-owned memory to the buffer by reference. The bytes
	/// are never copied; the fragment is released exactly once, after its full
	/// range has been drained or moved out of every buffer referencing it. An
	/// empty fragment is released immediately.
	pub fn add_fragment(&mut self, fragment: Box<dyn Fragment + 'd>) {
		let seg = Seg::from_fragment(fragment);
		if seg.is_not_empty() {
			self.chain.push_laden(seg);
		}
	}

	/// Copies `data` to the front of the buffer. Prepending no bytes is a
	/// no-op: no segment is allocated.
	pub fn prepend(&mut self, mut data: &[u8]) {
		while !data.is_empty() {
			let mut written = self.chain.push_front_slice(data);
			if written == 0 {
				let mut seg = self.claim_one();
				seg.align_end();
				written = seg.push_front_slice(data);
				debug_assert!(written > 0);
				self.chain.push_front(seg);
			}
			data = &data[..data.len() - written];
		}
	}

	/// Moves the entire contents of `other` to the front of this buffer.
	/// Segments are spliced, not copied; `other` is left empty.
	pub fn prepend_buffer(&mut self, other: &mut Buffer<'d, N, impl Pool<N>>) {
		let taken = other.chain.take_laden().collect_vec();
		for seg in taken.into_iter().rev() {
			self.chain.push_front(seg);
		}
	}

	/// Moves the entire contents of `other` to the end of this buffer.
	/// Segments are spliced, not copied; `other` is left empty.
	pub fn move_all_from(&mut self, other: &mut Buffer<'d, N, impl Pool<N>>) {
		for seg in other.chain.take_laden() {
			self.chain.push_laden(seg);
		}
	}

	/// Moves exactly `count` bytes from the front of `other` to the end of
	/// this buffer without copying. A segment on the boundary is split by
	/// sharing its backing store; for a fragment, both halves reference the
	/// same fragment and only the last half's consumption releases it.
	///
	/// # Panics
	///
	/// Panics if `count` exceeds the length of `other`.
	pub fn move_from(&mut self, other: &mut Buffer<'d, N, impl Pool<N>>, count: usize) {
		assert_le!(count, other.count(), "move count should not exceed the source length");

		let mut remaining = count;
		while remaining > 0 {
			let mut seg = other.chain
				.pop_front()
				.expect("move count is checked against the source length");
			if seg.len() <= remaining {
				remaining -= seg.len();
				self.chain.push_laden(seg);
			} else {
				let head = seg.split_front(remaining);
				remaining = 0;
				other.chain.push_front(seg);
				self.chain.push_laden(head);
			}
		}
	}

	/// Reserves writable capacity for at least `min_length` bytes at the end
	/// of the buffer, claiming or allocating segments as needed, and describes
	/// up to `out.len()` slices of it in `out`, returning the number filled.
	/// The region is uninitialized: the buffer's length does not change until
	/// [`commit`](Buffer::commit) reports what was actually written.
	///
	/// # Panics
	///
	/// Panics if `min_length` is zero. Allocation failure aborts; returning
	/// fewer slices than promised risks the caller writing past the reserved
	/// region.
	pub fn reserve(&mut self, min_length: usize, out: &mut [RawSlice]) -> usize {
		assert!(min_length > 0, "reserved space should be non-zero");

		let limit = self.chain.limit();
		if limit < min_length {
			self.claim_or_alloc(min_length - limit);
		}

		let mut remaining = min_length;
		let mut filled = 0;
		for seg in self.chain.iter_writable_mut() {
			if filled == out.len() || remaining == 0 {
				break
			}

			let len = min(seg.limit(), remaining);
			if len == 0 {
				continue
			}
			out[filled] = RawSlice::new(seg.writable_ptr(), len);
			remaining -= len;
			filled += 1;
		}
		assert!(
			filled > 0,
			"failure to reserve may result in the caller writing to unreserved memory"
		);
		self.reserved = filled;
		filled
	}

	/// Commits bytes written to slices returned by [`reserve`], in order,
	/// extending the buffer by each slice's final length. A caller that wrote
	/// fewer bytes than reserved truncates the affected slice first; capacity
	/// above a truncated slice is voided, and is only handed out again by a
	/// later reserve.
	///
	/// # Panics
	///
	/// Panics if more slices are committed than the last reserve returned.
	///
	/// [`reserve`]: Buffer::reserve
	pub fn commit(&mut self, slices: &[RawSlice]) {
		let reserved = mem::take(&mut self.reserved);
		assert_le!(
			slices.len(),
			reserved,
			"committed slices should not outnumber reserved slices"
		);
		self.chain.commit(slices);
	}

	/// Removes `size` bytes from the front of the buffer, recycling fully
	/// consumed segments and releasing fully consumed fragments.
	///
	/// # Panics
	///
	/// Panics if `size` exceeds the buffer length.
	pub fn drain(&mut self, mut size: usize) {
		assert_le!(size, self.count(), "drain size should not exceed the buffer length");

		while size > 0 {
			let mut seg = self.chain
				.pop_front()
				.expect("drain size is checked against the buffer length");
			if seg.len() <= size {
				size -= seg.len();
				let _ = self.pool.collect_one(seg);
			} else {
				seg.consume(size);
				size = 0;
				self.chain.push_front(seg);
			}
		}
	}

	/// Ensures the first `size` bytes of the buffer are contiguous, merging
	/// segments only if they are not already, and returns them as one slice,
	/// valid until the next mutating call.
	///
	/// # Panics
	///
	/// Panics if `size` exceeds the buffer length.
	pub fn linearize(&mut self, size: usize) -> &[u8] {
		assert_le!(size, self.count(), "linearized size should not exceed the buffer length");

		if size == 0 {
			return &[]
		}

		let front_len = self.chain
			.front()
			.expect("a non-empty buffer should have a front segment")
			.len();
		if front_len < size {
			self.merge_front(size);
		}

		&self.chain
			.front()
			.expect("a non-empty buffer should have a front segment")
			.data()[..size]
	}

	/// Finds `pattern` in the buffer at or after the byte position `start`,
	/// returning the position of the first match, counted from the start of
	/// the buffer. Matches may span segment boundaries; nothing is
	/// linearized. Returns `None` when absent, or when `start` is out of
	/// bounds.
	pub fn search(&self, pattern: impl Pattern, start: usize) -> Option<usize> {
		if start > self.count() {
			return None
		}

		let mut skip = start;
		let haystack = self.chain.iter_slices().filter_map(move |slice| {
			if skip >= slice.len() {
				skip -= slice.len();
				None
			} else {
				let trimmed = &slice[skip..];
				skip = 0;
				Some(trimmed)
			}
		});
		pattern.find_in(haystack).map(|found| start + found)
	}

	/// Fills `out` with up to `out.len()` read-only slices describing the
	/// current contents, for handing to a vectored write, returning the number
	/// filled. The slices are valid until the next mutating call; writing
	/// through them is undefined. Use [`raw_slice_count`] to size `out` for
	/// the whole buffer.
	///
	/// [`raw_slice_count`]: Buffer::raw_slice_count
	pub fn raw_slices(&self, out: &mut [RawSlice]) -> usize {
		let mut filled = 0;
		for slice in self.chain.iter_slices() {
			if filled == out.len() {
				break
			}
			out[filled] = RawSlice::new(slice.as_ptr() as *mut u8, slice.len());
			filled += 1;
		}
		filled
	}

	/// Returns the number of slices [`raw_slices`](Buffer::raw_slices) needs
	/// to describe the whole buffer.
	pub fn raw_slice_count(&self) -> usize { self.chain.len() }

	/// Copies the bytes at `start..start + dest.len()` into `dest`.
	///
	/// # Panics
	///
	/// Panics if the range extends past the buffer length.
	pub fn copy_out(&self, start: usize, dest: &mut [u8]) {
		assert_le!(
			start + dest.len(),
			self.count(),
			"copied range should lie within the buffer"
		);

		let mut skip = start;
		let mut copied = 0;
		for mut slice in self.chain.iter_slices() {
			if copied == dest.len() {
				break
			}
			if skip >= slice.len() {
				skip -= slice.len();
				continue
			}

			slice = &slice[skip..];
			skip = 0;
			let count = min(slice.len(), dest.len() - copied);
			dest[copied..copied + count].copy_from_slice(&slice[..count]);
			copied += count;
		}
	}

	/// Copies the entire buffer into a new `Vec`.
	pub fn to_vec(&self) -> Vec<u8> {
		let mut vec = Vec::with_capacity(self.count());
		for slice in self.chain.iter_slices() {
			vec.extend_from_slice(slice);
		}
		vec
	}

	/// Clears the buffer, recycling its segments and releasing any referenced
	/// fragments.
	pub fn clear(&mut self) {
		self.reserved = 0;
		let Self { chain, pool, .. } = self;
		let segments = chain.take_all().collect_vec();
		for seg in segments {
			// Fragment and shared segments drop outside the pool borrow.
			let _ = pool.collect_one(seg);
		}
	}

	/// Abandons an uncommitted reservation. The capacity stays in the chain as
	/// spares and is handed out again by a later reserve.
	fn cancel_reserve(&mut self) {
		self.reserved = 0;
	}

	fn claim_one(&mut self) -> Seg<'d, N> {
		self.pool.claim_one().unwrap_or_default()
	}

	fn claim_or_alloc(&mut self, count: usize) {
		let Self { chain, pool, .. } = self;
		let seg_count = count.div_ceil(N);
		if pool.claim_count(chain, seg_count).is_err() {
			chain.allocate(seg_count);
		}
	}

	/// Replaces the front segments covering `size` bytes with one merged
	/// segment: a claimed block when the prefix fits, a boxed slab otherwise.
	fn merge_front(&mut self, size: usize) {
		let merged = if size <= N {
			let mut merged = self.claim_one();
			self.take_front(size, |data| {
				let written = merged.push_slice(data);
				debug_assert_eq!(written, data.len());
			});
			merged
		} else {
			let mut bytes = Vec::with_capacity(size);
			self.take_front(size, |data| bytes.extend_from_slice(data));
			Seg::boxed(bytes.into_boxed_slice())
		};
		self.chain.push_front(merged);
	}

	/// Removes the first `size` bytes from the chain, feeding each removed
	/// slice to `sink`. Fully consumed segments are recycled; a fragment
	/// consumed here is released, since its memory is no longer referenced.
	fn take_front(&mut self, size: usize, mut sink: impl FnMut(&[u8])) {
		let mut remaining = size;
		while remaining > 0 {
			let mut seg = self.chain
				.pop_front()
				.expect("taken size is checked against the buffer length");
			if seg.len() <= remaining {
				remaining -= seg.len();
				sink(seg.data());
				let _ = self.pool.collect_one(seg);
			} else {
				sink(&seg.data()[..remaining]);
				seg.consume(remaining);
				remaining = 0;
				self.chain.push_front(seg);
			}
		}
	}
}

impl<const N: usize, P: Pool<N>> Drop for Buffer<'_, N, P> {
	fn drop(&mut self) {
		self.clear();
	}
}

impl<'d> From<&[u8]> for Buffer<'d> {
	fn from(value: &[u8]) -> Self {
		Self::from_slice(value)
	}
}

impl<'d> From<&str> for Buffer<'d> {
	fn from(value: &str) -> Self {
		Self::from_slice(value.as_bytes())
	}
}

impl<const N: usize, Pa: Pool<N>, Pb: Pool<N>> PartialEq<Buffer<'_, N, Pb>> for Buffer<'_, N, Pa> {
	fn eq(&self, other: &Buffer<'_, N, Pb>) -> bool {
		self.count() == other.count() &&
		self.chain
			.iter_slices()
			.flatten()
			.eq(other.chain.iter_slices().flatten())
	}
}

impl<const N: usize, P: Pool<N>> PartialEq<[u8]> for Buffer<'_, N, P> {
	fn eq(&self, mut other: &[u8]) -> bool {
		if self.count() != other.len() {
			return false
		}

		self.chain.iter_slices().all(move |slice| {
			let (cur, rest) = other.split_at(slice.len());
			other = rest;
			slice == cur
		})
	}
}

impl<const N: usize, P: Pool<N>> PartialEq<&[u8]> for Buffer<'_, N, P> {
	fn eq(&self, other: &&[u8]) -> bool { *self == **other }
}

impl<const N: usize, P: Pool<N>> PartialEq<Vec<u8>> for Buffer<'_, N, P> {
	fn eq(&self, other: &Vec<u8>) -> bool { self == &other[..] }
}
