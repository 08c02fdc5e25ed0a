// SPDX-License-Identifier: Apache-2.0

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use strand::{Buffer, RawSlice, SEGMENT_SIZE};

const COUNT: usize = 4 * SEGMENT_SIZE;

fn data() -> Vec<u8> {
	(0..COUNT).map(|i| (i % 251) as u8).collect()
}

fn add(c: &mut Criterion) {
	let data = data();
	c.bench_function("add", |b| b.iter(|| {
		let mut buf = Buffer::new();
		buf.add(black_box(&data));
		buf
	}));
}

fn add_small(c: &mut Criterion) {
	c.bench_function("add_small", |b| b.iter(|| {
		let mut buf = Buffer::new();
		for _ in 0..COUNT / 16 {
			buf.add(black_box(b"0123456789abcdef"));
		}
		buf
	}));
}

fn drain(c: &mut Criterion) {
	let data = data();
	let mut group = c.benchmark_group("drain");
	group.bench_function("whole segments", |b| b.iter_batched_ref(
		|| Buffer::from_slice(&data),
		|buf| {
			while buf.is_not_empty() {
				buf.drain(SEGMENT_SIZE.min(buf.count()));
			}
		},
		BatchSize::PerIteration,
	));
	group.bench_function("partial", |b| b.iter_batched_ref(
		|| Buffer::from_slice(&data),
		|buf| buf.drain(100),
		BatchSize::PerIteration,
	));
	group.finish();
}

fn move_between(c: &mut Criterion) {
	let data = data();
	c.bench_function("move_all_from", |b| b.iter_batched_ref(
		|| Buffer::from_slice(&data),
		|buf| {
			let mut dst = Buffer::new();
			dst.move_all_from(buf);
			dst
		},
		BatchSize::PerIteration,
	));
}

fn reserve_commit(c: &mut Criterion) {
	c.bench_function("reserve_commit", |b| b.iter_batched_ref(
		Buffer::new,
		|buf| {
			let mut slices = [RawSlice::empty(); 2];
			let filled = buf.reserve(1024, &mut slices);
			buf.commit(&slices[..filled]);
		},
		BatchSize::PerIteration,
	));
}

fn search(c: &mut Criterion) {
	let mut data = data();
	let at = data.len() - 6;
	data[at..].copy_from_slice(b"needle");
	let buffer = Buffer::from_slice(&data);

	let mut group = c.benchmark_group("search");
	group.bench_function("byte", |b| b.iter(|| buffer.search(black_box(b'\xfe'), 0)));
	group.bench_function("slice", |b| b.iter(|| buffer.search(black_box(b"needle"), 0)));
	group.finish();
}

criterion_group!(write, add, add_small, reserve_commit);
criterion_group!(read, drain, move_between, search);
criterion_main!(write, read);
