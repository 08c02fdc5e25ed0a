// SPDX-License-Identifier: Apache-2.0

use quickcheck_macros::quickcheck;
use strand::{Buffer, RawSlice, SliceFragment, SEGMENT_SIZE};

#[quickcheck]
fn round_trip(data: Vec<u8>) {
	let buffer = Buffer::from_slice(&data);
	assert_eq!(buffer.to_vec(), data);
	assert_eq!(buffer.count(), data.len());
}

#[quickcheck]
fn drain_monotonic(data: Vec<u8>, size: usize) {
	let size = if data.is_empty() { 0 } else { size % (data.len() + 1) };
	let mut buffer = Buffer::from_slice(&data);
	buffer.drain(size);
	assert_eq!(buffer.count(), data.len() - size);
	assert_eq!(buffer.to_vec(), &data[size..]);
}

#[quickcheck]
fn move_preserves_bytes(a: Vec<u8>, b: Vec<u8>) {
	let mut dst = Buffer::from_slice(&a);
	let mut src = Buffer::from_slice(&b);
	dst.move_all_from(&mut src);

	assert_eq!(src.count(), 0);
	assert_eq!(dst.count(), a.len() + b.len());
	let mut expected = a;
	expected.extend_from_slice(&b);
	assert_eq!(dst.to_vec(), expected);
}

#[quickcheck]
fn partial_move_splits(a: Vec<u8>, b: Vec<u8>, count: usize) {
	let count = if b.is_empty() { 0 } else { count % (b.len() + 1) };
	let mut dst = Buffer::from_slice(&a);
	let mut src = Buffer::from_slice(&b);
	dst.move_from(&mut src, count);

	assert_eq!(dst.count(), a.len() + count);
	assert_eq!(src.count(), b.len() - count);

	// Concatenating the destination's new suffix with the source's remainder
	// reconstructs the moved buffer's original contents.
	let mut reassembled = dst.to_vec()[a.len()..].to_vec();
	reassembled.extend_from_slice(&src.to_vec());
	assert_eq!(reassembled, b);
}

#[quickcheck]
fn prepend_then_read_back(a: Vec<u8>, b: Vec<u8>) {
	let mut buffer = Buffer::from_slice(&b);
	buffer.prepend(&a);

	let mut expected = a;
	expected.extend_from_slice(&b);
	assert_eq!(buffer.to_vec(), expected);
}

#[test]
fn drain_scenario() {
	let mut buffer = Buffer::new();
	buffer.add(b"hello ");
	buffer.add(b"world");
	buffer.drain(6);
	assert_eq!(buffer.to_vec(), b"world");
	assert_eq!(buffer.count(), 5);
}

#[test]
fn add_empty_is_noop() {
	let mut buffer = Buffer::new();
	buffer.add(b"");
	assert_eq!(buffer.count(), 0);
	assert_eq!(buffer.raw_slice_count(), 0);
}

#[test]
fn prepend_empty_is_noop() {
	let mut control = Buffer::new();
	control.add(b"data");

	let mut buffer = Buffer::new();
	buffer.prepend(b"");
	buffer.add(b"data");

	assert_eq!(buffer.count(), control.count());
	assert_eq!(buffer.raw_slice_count(), control.raw_slice_count());
	assert_eq!(buffer, control);
}

#[test]
fn add_buffer_copies_without_consuming() {
	let source = Buffer::from_slice(b"copied bytes");
	let mut dst = Buffer::from_slice(b"head ");
	dst.add_buffer(&source);

	assert_eq!(source.to_vec(), b"copied bytes");
	assert_eq!(dst.to_vec(), b"head copied bytes");
}

#[test]
fn prepend_buffer_splices() {
	let front = b"front".to_vec();
	let mut src = Buffer::new();
	src.add_fragment(Box::new(SliceFragment::new(&front, || {})));

	let mut dst = Buffer::from_slice(b" back");
	dst.prepend_buffer(&mut src);

	assert_eq!(src.count(), 0);
	assert_eq!(dst.to_vec(), b"front back");
}

#[test]
fn large_add_spans_segments() {
	let data: Vec<u8> = (0..3 * SEGMENT_SIZE + 17).map(|i| i as u8).collect();
	let buffer = Buffer::from_slice(&data);
	assert_eq!(buffer.count(), data.len());
	assert!(buffer.raw_slice_count() > 1);
	assert_eq!(buffer.to_vec(), data);
}

#[test]
fn large_prepend_spans_segments() {
	let data: Vec<u8> = (0..2 * SEGMENT_SIZE + 5).map(|i| (i % 251) as u8).collect();
	let mut buffer = Buffer::from_slice(b"tail");
	buffer.prepend(&data);

	let mut expected = data;
	expected.extend_from_slice(b"tail");
	assert_eq!(buffer.to_vec(), expected);
}

mod reserve {
	use super::*;
	use pretty_assertions::assert_eq;

	fn fill(slices: &mut [RawSlice], value: u8) -> usize {
		let mut written = 0;
		for slice in slices {
			let bytes = unsafe { slice.as_bytes_mut() };
			bytes.fill(value);
			written += bytes.len();
		}
		written
	}

	#[test]
	fn conservation() {
		let mut buffer = Buffer::new();
		let mut slices = [RawSlice::empty(); 4];
		let filled = buffer.reserve(1000, &mut slices);
		assert!(filled >= 1);

		let offered: usize = slices[..filled].iter().map(RawSlice::len).sum();
		assert_eq!(offered, 1000);
		assert_eq!(buffer.count(), 0);

		let written = fill(&mut slices[..filled], 7);
		buffer.commit(&slices[..filled]);
		assert_eq!(buffer.count(), written);
		assert_eq!(buffer.to_vec(), vec![7; written]);
	}

	#[test]
	fn truncated_commit_voids_the_rest() {
		let mut buffer = Buffer::new();
		let mut slices = [RawSlice::empty(); 2];
		let filled = buffer.reserve(100, &mut slices);
		assert_eq!(filled, 1);

		fill(&mut slices[..filled], 9);
		slices[0].truncate(60);
		buffer.commit(&slices[..filled]);
		assert_eq!(buffer.count(), 60);

		// The voided capacity is only handed out again by a later reserve.
		let filled = buffer.reserve(40, &mut slices);
		assert!(filled >= 1);
		fill(&mut slices[..filled], 3);
		buffer.commit(&slices[..filled]);
		assert_eq!(buffer.count(), 100);

		let mut expected = vec![9; 60];
		expected.extend_from_slice(&[3; 40]);
		assert_eq!(buffer.to_vec(), expected);
	}

	#[test]
	fn spans_two_slices() {
		let mut buffer = Buffer::new();
		buffer.add(&vec![1; SEGMENT_SIZE - 10]);

		let mut slices = [RawSlice::empty(); 2];
		let filled = buffer.reserve(100, &mut slices);
		assert_eq!(filled, 2);
		assert_eq!(slices[0].len(), 10);
		assert_eq!(slices[1].len(), 90);

		fill(&mut slices[..filled], 2);
		buffer.commit(&slices[..filled]);
		assert_eq!(buffer.count(), SEGMENT_SIZE + 90);
	}

	#[test]
	#[should_panic]
	fn commit_more_than_reserved() {
		let mut buffer = Buffer::new();
		let mut slices = [RawSlice::empty(); 2];
		let filled = buffer.reserve(10, &mut slices);
		assert_eq!(filled, 1);
		buffer.commit(&slices[..2]);
	}

	#[test]
	#[should_panic]
	fn reserve_nothing() {
		let mut buffer = Buffer::new();
		let mut slices = [RawSlice::empty(); 2];
		buffer.reserve(0, &mut slices);
	}
}

mod search {
	use super::*;

	#[test]
	fn across_segment_boundary() {
		let (ab, cd) = (b"ab".to_vec(), b"cd".to_vec());
		let mut buffer = Buffer::new();
		buffer.add_fragment(Box::new(SliceFragment::new(&ab, || {})));
		buffer.add_fragment(Box::new(SliceFragment::new(&cd, || {})));
		assert_eq!(buffer.raw_slice_count(), 2);

		assert_eq!(buffer.search(b"bc", 0), Some(1));
	}

	#[test]
	fn from_start_offset() {
		let buffer = Buffer::from_slice(b"abcabc");
		assert_eq!(buffer.search(b"abc", 0), Some(0));
		assert_eq!(buffer.search(b"abc", 1), Some(3));
		assert_eq!(buffer.search(b"abc", 4), None);
	}

	#[test]
	fn out_of_bounds_start() {
		let buffer = Buffer::from_slice(b"abc");
		assert_eq!(buffer.search(b"a", 4), None);
	}

	#[test]
	fn across_block_boundary() {
		let mut data = vec![0; SEGMENT_SIZE - 1];
		data.extend_from_slice(b"needle");
		let buffer = Buffer::from_slice(&data);
		assert!(buffer.raw_slice_count() > 1);
		assert_eq!(buffer.search(b"needle", 0), Some(SEGMENT_SIZE - 1));
	}

	#[test]
	fn single_byte() {
		let buffer = Buffer::from_slice(b"abc");
		assert_eq!(buffer.search(b'c', 0), Some(2));
		assert_eq!(buffer.search(b'x', 0), None);
	}
}

mod linearize {
	use super::*;

	#[test]
	fn contiguous_prefix_is_borrowed() {
		let mut buffer = Buffer::from_slice(b"contiguous");
		assert_eq!(buffer.linearize(5), b"conti");
		assert_eq!(buffer.count(), 10);
	}

	#[test]
	fn merges_across_segments() {
		let (ab, cd) = (b"ab".to_vec(), b"cd".to_vec());
		let mut buffer = Buffer::new();
		buffer.add_fragment(Box::new(SliceFragment::new(&ab, || {})));
		buffer.add_fragment(Box::new(SliceFragment::new(&cd, || {})));

		assert_eq!(buffer.linearize(3), b"abc");
		assert_eq!(buffer.count(), 4);
		assert_eq!(buffer.to_vec(), b"abcd");
	}

	#[test]
	fn larger_than_one_block() {
		let data: Vec<u8> = (0..2 * SEGMENT_SIZE).map(|i| (i % 127) as u8).collect();
		let mut buffer = Buffer::from_slice(&data);
		let size = SEGMENT_SIZE + 100;
		assert_eq!(buffer.linearize(size), &data[..size]);
		assert_eq!(buffer.count(), data.len());
		assert_eq!(buffer.to_vec(), data);
	}

	#[test]
	fn zero_is_empty() {
		let mut buffer = Buffer::from_slice(b"abc");
		assert_eq!(buffer.linearize(0), b"");
	}
}

mod copy_out {
	use super::*;

	#[test]
	fn sub_range() {
		let buffer = Buffer::from_slice(b"hello world");
		let mut out = [0; 5];
		buffer.copy_out(6, &mut out);
		assert_eq!(&out, b"world");
	}

	#[test]
	fn across_segments() {
		let (ab, cd) = (b"ab".to_vec(), b"cd".to_vec());
		let mut buffer = Buffer::new();
		buffer.add_fragment(Box::new(SliceFragment::new(&ab, || {})));
		buffer.add_fragment(Box::new(SliceFragment::new(&cd, || {})));

		let mut out = [0; 2];
		buffer.copy_out(1, &mut out);
		assert_eq!(&out, b"bc");
	}
}

mod raw_slices {
	use super::*;

	#[test]
	fn describe_contents() {
		let (ab, cd) = (b"ab".to_vec(), b"cd".to_vec());
		let mut buffer = Buffer::new();
		buffer.add_fragment(Box::new(SliceFragment::new(&ab, || {})));
		buffer.add_fragment(Box::new(SliceFragment::new(&cd, || {})));

		let mut slices = [RawSlice::empty(); 4];
		let filled = buffer.raw_slices(&mut slices);
		assert_eq!(filled, 2);
		assert_eq!(unsafe { slices[0].as_bytes() }, b"ab");
		assert_eq!(unsafe { slices[1].as_bytes() }, b"cd");
	}

	#[test]
	fn truncates_to_capacity() {
		let (ab, cd) = (b"ab".to_vec(), b"cd".to_vec());
		let mut buffer = Buffer::new();
		buffer.add_fragment(Box::new(SliceFragment::new(&ab, || {})));
		buffer.add_fragment(Box::new(SliceFragment::new(&cd, || {})));

		let mut slices = [RawSlice::empty(); 1];
		assert_eq!(buffer.raw_slices(&mut slices), 1);
		assert_eq!(buffer.raw_slice_count(), 2);
	}
}

#[test]
#[should_panic]
fn drain_more_than_length() {
	let mut buffer = Buffer::from_slice(b"abc");
	buffer.drain(4);
}

#[test]
fn with_capacity_reserves() {
	let buffer = Buffer::with_capacity(3 * SEGMENT_SIZE);
	assert_eq!(buffer.count(), 0);
	assert!(buffer.limit() >= 3 * SEGMENT_SIZE);
}

#[test]
fn small_appends_coalesce() {
	let mut buffer = Buffer::new();
	for _ in 0..100 {
		buffer.add(b"chunk");
	}
	assert_eq!(buffer.count(), 500);
	assert_eq!(buffer.raw_slice_count(), 1);
}
