// SPDX-License-Identifier: Apache-2.0

//! A segmented byte-buffer engine for high-throughput network IO. Every
//! socket read and write, and every data transform between them, flows
//! through a [`Buffer`]: bytes are appended by copy or referenced zero-copy
//! from caller-owned memory, moved between buffers by splicing segments, and
//! drained from the front as the peer consumes them.
//!
//! ## How it works
//!
//! Data lives in reusable chunks of memory called *segments*, arranged in a
//! chain with laden segments in front and empty spares at the back. When a
//! segment is fully drained it returns to a thread-local *pool*; writes claim
//! segments back from the pool, so the common append path allocates nothing
//! once the pool is warm.
//!
//! Segment memory is reference-counted. Moving part of a buffer into another
//! splits the boundary segment by sharing its block between both halves
//! rather than copying; a shared block is read-only until one side drops.
//! Externally-owned memory joins a chain the same way, wrapped in a
//! [`Fragment`] whose release hook fires exactly once, after the last
//! referencing half has been consumed.
//!
//! ## Vectored IO
//!
//! The buffer interoperates with non-blocking scatter/gather IO through
//! [`RawSlice`], a (pointer, length) pair laid out to match the platform's
//! `struct iovec`. [`Buffer::reserve`] exposes uninitialized tail capacity as
//! slices for a vectored read, [`Buffer::commit`] records how much of it was
//! actually filled, and [`Buffer::read`]/[`Buffer::write`] wrap the full
//! exchange with an [`IoHandle`]. The buffer never retries: a would-block
//! outcome is returned to the event loop that owns the connection.

mod buffer;
mod error;
mod fragment;
mod pattern;
pub mod pool;
mod segment;
mod slice;

pub use buffer::*;
pub use error::{Error, ErrorBox, ErrorKind, OperationKind, Result};
pub use fragment::{Fragment, SliceFragment};
pub use pattern::Pattern;
pub use segment::Seg;
pub use slice::RawSlice;

pub use segment::SIZE as SEGMENT_SIZE;
