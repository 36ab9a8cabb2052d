use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use regexpr_runtime::bytecode::{ByteSet, OpcodeKind};
use regexpr_runtime::*;

fn pad_input_to_length_with(suffix: &str, pad_str: &str, len: usize) -> Vec<u8> {
    let suffix_len = suffix.len();

    if suffix_len > len {
        vec![]
    } else {
        pad_str
            .bytes()
            .cycle()
            .take(len - suffix_len)
            .chain(suffix.bytes())
            .collect()
    }
}

fn search_for_suffix(c: &mut Criterion, group_name: &str, pattern: CompiledPattern) {
    let mut group = c.benchmark_group(group_name);
    let input = "ab";
    let pad = "xy";

    (1..10)
        .map(|exponent| 2usize.pow(exponent))
        .map(|input_len| (pad_input_to_length_with(input, pad, input_len), input_len))
        .for_each(|(input, sample_size)| {
            group.throughput(Throughput::Elements(sample_size as u64));
            group.bench_with_input(
                BenchmarkId::new("input length of size", sample_size),
                &(input, sample_size),
                |b, (input, input_size)| {
                    let range = *input_size as isize;

                    b.iter(|| {
                        let res = search(&pattern, input, 0, range, None);
                        assert_eq!(Ok(Some(*input_size - 2)), res)
                    })
                },
            );
        })
}

fn literal_pattern() -> CompiledPattern {
    CompiledPattern::from_program(
        vec![
            OpcodeKind::Exact as u8,
            b'a',
            OpcodeKind::Exact as u8,
            b'b',
            OpcodeKind::End as u8,
        ],
        1,
        false,
    )
    .expect("valid program")
}

fn set_pattern() -> CompiledPattern {
    let mut set = ByteSet::new();
    set.insert_range(b'a', b'w');
    set.insert_range(b'A', b'W');
    set.insert_range(b'0', b'9');
    set.insert(b'_');

    let mut program = vec![];
    for _ in 0..2 {
        program.push(OpcodeKind::Set as u8);
        program.extend_from_slice(set.as_bits());
    }
    program.push(OpcodeKind::End as u8);

    CompiledPattern::from_program(program, 1, false).expect("valid program")
}

pub fn linear_input_size_comparison(c: &mut Criterion) {
    let mut pattern = literal_pattern();
    pattern.set_fastmap_enabled(false);

    search_for_suffix(c, "input length comparison", pattern)
}

pub fn linear_input_size_comparison_with_fastmap(c: &mut Criterion) {
    search_for_suffix(c, "input length comparison with fastmap", literal_pattern())
}

pub fn linear_input_size_comparison_against_set_match(c: &mut Criterion) {
    let mut pattern = set_pattern();
    pattern.set_fastmap_enabled(false);

    search_for_suffix(c, "input length comparison for set matching", pattern)
}

pub fn linear_input_size_comparison_against_set_match_with_fastmap(c: &mut Criterion) {
    search_for_suffix(
        c,
        "input length comparison for set matching with fastmap",
        set_pattern(),
    )
}

criterion_group!(
    benches,
    linear_input_size_comparison,
    linear_input_size_comparison_with_fastmap,
    linear_input_size_comparison_against_set_match,
    linear_input_size_comparison_against_set_match_with_fastmap
);
criterion_main!(benches);
