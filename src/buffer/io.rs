// SPDX-License-Identifier: Apache-2.0

use arrayvec::ArrayVec;
use all_asserts::debug_assert_le;
use super::Buffer;
use crate::error::{OperationKind, Result};
use crate::pool::Pool;
use crate::slice::RawSlice;

/// A non-blocking vectored IO endpoint, typically a socket. The buffer hands
/// it [`RawSlice`]s and reconciles its chain with the byte count the handle
/// reports; retry-on-would-block belongs to the surrounding event loop, not
/// here.
pub trait IoHandle {
	/// Reads up to `max_length` bytes into `slices`, returning the number of
	/// bytes transferred. May transfer fewer bytes than requested. Zero is a
	/// legal result only when `max_length` is zero; "would block" is reported
	/// as an error.
	fn readv(&mut self, max_length: usize, slices: &mut [RawSlice]) -> Result<usize>;

	/// Writes bytes gathered from `slices`, returning the number of bytes
	/// transferred. Zero with no error is a legal would-block outcome.
	fn writev(&mut self, slices: &[RawSlice]) -> Result<usize>;
}

/// The slice count offered to one vectored read.
const READ_SLICES: usize = 2;
/// The slice count offered to one vectored write.
const WRITE_SLICES: usize = 16;

impl<'d, const N: usize, P: Pool<N>> Buffer<'d, N, P> {
	/// Reads up to `max_length` bytes from `io` into reserved capacity at the
	/// end of the buffer, committing exactly the number of bytes transferred.
	/// Reading zero bytes is a no-op success. The buffer is unchanged if the
	/// read fails.
	pub fn read(&mut self, io: &mut impl IoHandle, max_length: usize) -> Result<usize> {
		if max_length == 0 {
			return Ok(0)
		}

		let mut slices = [RawSlice::empty(); READ_SLICES];
		let filled = self.reserve(max_length, &mut slices);
		let slices = &mut slices[..filled];
		match io.readv(max_length, slices) {
			Ok(transferred) => {
				debug_assert_le!(transferred, max_length);
				let mut to_commit = transferred;
				let mut committed = 0;
				for slice in slices.iter_mut() {
					if to_commit == 0 {
						break
					}
					slice.truncate(to_commit);
					to_commit -= slice.len();
					committed += 1;
				}
				self.commit(&slices[..committed]);
				Ok(transferred)
			}
			Err(error) => {
				self.cancel_reserve();
				Err(error.with_operation(OperationKind::Read))
			}
		}
	}

	/// Writes the buffer's contents to `io`, draining exactly the number of
	/// bytes transferred. Zero bytes transferred is a legal would-block
	/// outcome and drains nothing. The buffer is unchanged if the write fails.
	pub fn write(&mut self, io: &mut impl IoHandle) -> Result<usize> {
		let mut slices = ArrayVec::<RawSlice, WRITE_SLICES>::new();
		for slice in self.chain.iter_slices().take(WRITE_SLICES) {
			slices.push(RawSlice::new(slice.as_ptr() as *mut u8, slice.len()));
		}

		match io.writev(&slices) {
			Ok(transferred) => {
				if transferred > 0 {
					self.drain(transferred);
				}
				Ok(transferred)
			}
			Err(error) => Err(error.with_operation(OperationKind::Write)),
		}
	}
}
