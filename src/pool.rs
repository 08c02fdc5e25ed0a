// SPDX-License-Identifier: Apache-2.0

//! The segment pool. Blocks released by drained buffers are recycled here, so
//! the common small-append path stays allocation-free once the pool is warm.
//! The default pool is thread-local and guarded by a `RefCell`; each thread
//! recycles its own blocks.

use std::cell::{BorrowMutError, RefCell, RefMut};
use std::ops::DerefMut;
use std::rc::Rc;
use std::result;
use crate::segment::{alloc_block, Block, Seg, SIZE};

#[derive(Copy, Clone, Debug, thiserror::Error)]
#[error("failed to borrow the segment pool")]
pub struct PoolError;

pub type Result<T = ()> = result::Result<T, PoolError>;

impl From<BorrowMutError> for PoolError {
	fn from(_: BorrowMutError) -> Self { Self }
}

/// A shared handle to a segment pool.
pub trait Pool<const N: usize = SIZE>: Clone {
	type Pool: MutPool<N>;
	type Ref<'p>: DerefMut<Target = Self::Pool> where Self: 'p;

	/// Gets a shared handle to the pool.
	fn get() -> Self;

	/// Borrows the pool mutably, locking it for the duration of the borrow.
	fn try_borrow(&self) -> Result<Self::Ref<'_>>;

	/// Claims a single segment.
	fn claim_one<'d>(&self) -> Result<Seg<'d, N>> {
		Ok(self.try_borrow()?.claim_one())
	}

	/// Claims `count` segments into `target`.
	fn claim_count<'d>(&self, target: &mut impl Extend<Seg<'d, N>>, count: usize) -> Result {
		let mut pool = self.try_borrow()?;
		target.extend((0..count).map(|_| pool.claim_one()));
		Ok(())
	}

	/// Collects a single segment back into the pool. Segments not backed by an
	/// exclusive block are dropped instead; the drop happens *outside* the
	/// pool borrow, so a fragment's release hook may freely use the pool.
	fn collect_one(&self, segment: Seg<'_, N>) -> Result {
		if segment.is_shared() {
			return Ok(())
		}

		Ok(self.try_borrow()?.collect_one(segment))
	}

	/// Clears recycled blocks from the pool to free space.
	fn shed(&self) -> Result {
		Ok(self.try_borrow()?.shed())
	}
}

/// A mutably-borrowed pool, usually from a [`RefCell`].
pub trait MutPool<const N: usize = SIZE> {
	/// Claims a single segment.
	///
	/// Lifetime note: the returned segment must be valid for any lifetime, so
	/// all ownership of its backing store passes to the caller. The pool
	/// stores bare blocks and reconstructs segments from them.
	fn claim_one<'d>(&mut self) -> Seg<'d, N>;

	/// Collects a single segment back into the pool.
	fn collect_one(&mut self, segment: Seg<'_, N>);

	/// Clears recycled blocks from the pool to free space.
	fn shed(&mut self);
}

/// The default pool, a plain stack of recycled blocks.
#[derive(Default)]
pub struct DefaultPool(Vec<Block<SIZE>>);

impl MutPool for DefaultPool {
	fn claim_one<'d>(&mut self) -> Seg<'d> {
		self.0.pop().unwrap_or_else(alloc_block).into()
	}

	fn collect_one(&mut self, segment: Seg<'_>) {
		if let Some(block) = segment.into_block() {
			self.0.push(block);
		}
	}

	fn shed(&mut self) { self.0.clear() }
}

#[derive(Clone)]
pub struct DefaultPoolContainer(Rc<RefCell<DefaultPool>>);

impl Default for DefaultPoolContainer {
	fn default() -> Self {
		Self(Rc::new(DefaultPool::default().into()))
	}
}

impl Pool<SIZE> for DefaultPoolContainer {
	type Pool = DefaultPool;
	type Ref<'p> = RefMut<'p, DefaultPool>;

	fn get() -> Self { pool() }

	fn try_borrow(&self) -> Result<Self::Ref<'_>> {
		Ok(self.0.try_borrow_mut()?)
	}
}

/// Clones a handle to the thread-local default segment pool.
pub fn pool() -> DefaultPoolContainer {
	POOL.with(Clone::clone)
}

thread_local! {
	static POOL: DefaultPoolContainer = DefaultPoolContainer::default();
}
