use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use slip_cells::{Avsl, ListHandle, OptionsBuilder, Reader};

fn avsl_with(initial_cells: usize, growth_delta: usize) -> Avsl {
    Avsl::new(
        OptionsBuilder::new()
            .initial_cells(initial_cells)
            .growth_delta(growth_delta)
            .build(),
    )
}

fn filled(avsl: &mut Avsl, len: i64) -> ListHandle {
    let list = avsl.new_list().unwrap();
    for value in 0..len {
        avsl.enqueue(list, value).unwrap();
    }
    list
}

/// Nested lists `depth` deep, each level holding `width` integers
fn nested(avsl: &mut Avsl, depth: usize, width: i64) -> ListHandle {
    let root = filled(avsl, width);
    let mut level = root;
    for _ in 0..depth {
        let inner = filled(avsl, width);
        avsl.push(level, inner).unwrap();
        avsl.delete_list(inner).unwrap();
        level = inner;
    }
    root
}

fn bench_allocator(c: &mut Criterion) {
    c.bench_function("enqueue_then_delete_1k", |b| {
        let mut avsl = avsl_with(2048, 256);
        b.iter(|| {
            let list = filled(&mut avsl, 1000);
            avsl.delete_list(black_box(list)).unwrap();
        })
    });

    c.bench_function("grow_from_empty_10k", |b| {
        b.iter_batched(
            || avsl_with(0, 512),
            |mut avsl| {
                let list = filled(&mut avsl, 10_000);
                black_box(avsl.stats());
                avsl.delete_list(list).unwrap();
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_list_ops(c: &mut Criterion) {
    c.bench_function("push_pop_1k", |b| {
        let mut avsl = avsl_with(2048, 256);
        let list = avsl.new_list().unwrap();
        b.iter(|| {
            for value in 0..1000 {
                avsl.push(list, value).unwrap();
            }
            for _ in 0..1000 {
                black_box(avsl.pop(list).unwrap());
            }
        })
    });

    c.bench_function("copy_and_compare_nested", |b| {
        let mut avsl = avsl_with(8192, 1024);
        let root = nested(&mut avsl, 16, 32);
        b.iter(|| {
            let copy = avsl.copy_list(root).unwrap();
            black_box(avsl.is_equal(root, copy).unwrap());
            avsl.delete_list(copy).unwrap();
        })
    });

    c.bench_function("reader_nested", |b| {
        let mut avsl = avsl_with(8192, 1024);
        let root = nested(&mut avsl, 16, 32);
        b.iter(|| {
            let mut reader = Reader::new(&mut avsl, root).unwrap();
            let mut count = 0;
            while reader.next_leaf(&mut avsl).unwrap().is_some() {
                count += 1;
            }
            reader.close(&mut avsl).unwrap();
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_allocator, bench_list_ops);
criterion_main!(benches);
