//! Benchmarks for dictionary construction (which builds the double-array
//! trie over the lexicon's surface forms) and for the common-prefix lookups
//! that trie serves during tokenization.
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use comugi_rs::{Dictionary, SystemDictionaryBuilder, Tokenizer};

const NUM_WORDS: usize = 20_000;

fn build_lexicon_csv() -> String {
    let mut csv = String::new();
    for i in 0..NUM_WORDS {
        csv.push_str(&format!("語{i:05},0,0,{},feature{i}\n", 100 + (i % 900) as i32));
    }
    csv.pop();
    csv
}

fn build_dictionary() -> Dictionary {
    let lexicon_csv = build_lexicon_csv();
    let matrix_def = "1 1\n0 0 0";
    let char_def = "DEFAULT 0 1 0";
    let unk_def = "DEFAULT,0,0,100,*";

    let dict_inner = SystemDictionaryBuilder::from_readers(
        lexicon_csv.as_bytes(),
        matrix_def.as_bytes(),
        char_def.as_bytes(),
        unk_def.as_bytes(),
    )
    .unwrap();
    Dictionary::from_inner(dict_inner)
}

fn bench_dictionary_build(c: &mut Criterion) {
    let lexicon_csv = build_lexicon_csv();
    let mut group = c.benchmark_group("DoubleArrayBuild");
    group.throughput(Throughput::Elements(NUM_WORDS as u64));
    group.sample_size(20);

    group.bench_function("system_dictionary_builder/from_readers", |b| {
        b.iter(|| {
            let matrix_def = "1 1\n0 0 0";
            let char_def = "DEFAULT 0 1 0";
            let unk_def = "DEFAULT,0,0,100,*";
            std::hint::black_box(
                SystemDictionaryBuilder::from_readers(
                    lexicon_csv.as_bytes(),
                    matrix_def.as_bytes(),
                    char_def.as_bytes(),
                    unk_def.as_bytes(),
                )
                .unwrap(),
            );
        })
    });
}

fn bench_common_prefix_lookup(c: &mut Criterion) {
    let dict = build_dictionary();
    let tokenizer = Tokenizer::new(dict);
    let mut worker = tokenizer.new_worker();

    let sentence: String = (0..200).map(|i| format!("語{:05}", i % NUM_WORDS)).collect();

    let mut group = c.benchmark_group("DoubleArrayLookup");
    group.throughput(Throughput::Elements(sentence.chars().count() as u64));
    group.sample_size(50);

    group.bench_function("worker/tokenize", |b| {
        b.iter(|| {
            worker.reset_sentence(&sentence);
            worker.tokenize();
            std::hint::black_box(worker.num_tokens());
        })
    });
}

criterion_group!(benches, bench_dictionary_build, bench_common_prefix_lookup);
criterion_main!(benches);
