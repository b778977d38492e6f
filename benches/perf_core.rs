use cpp_perf_audit::llm::{build_analysis_prompt, parse_findings};
use cpp_perf_audit::{compute_score, create_batches, BatchBudget, FileCategory, SourceFile};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn synthetic_files(file_count: usize) -> Vec<SourceFile> {
    (0..file_count)
        .map(|i| {
            let rel = format!("src/module_{:03}/file_{:05}.cpp", i % 120, i);
            // 40 to ~6000 bytes, so batches fill unevenly
            let lines = 1 + (i * 37) % 150;
            let content = "std::vector<int> v; v.push_back(42); // padding\n".repeat(lines);
            SourceFile::new(
                format!("/bench/{rel}"),
                rel,
                FileCategory::Implementation,
                content,
            )
        })
        .collect()
}

fn synthetic_response(finding_count: usize) -> String {
    let items: Vec<String> = (0..finding_count)
        .map(|i| {
            format!(
                r#"{{"severity":"{}","category":"memory","title":"Finding {i}","file":"src/file_{i}.cpp","line":{},"description":"Raw owning pointer escapes scope","codeSnippet":"int* p = new int;","fix":"Use std::unique_ptr","source":"C++ Core Guidelines R.11"}}"#,
                ["critical", "warning", "suggestion", "good"][i % 4],
                i * 3 + 1
            )
        })
        .collect();
    format!("Here are the findings:\n```json\n[{}]\n```", items.join(","))
}

fn bench_create_batches(c: &mut Criterion) {
    let files = synthetic_files(20_000);
    let max_chars = BatchBudget::default().max_chars();
    c.bench_function("create_batches_20k", |b| {
        b.iter(|| {
            let batches = create_batches(black_box(&files), max_chars);
            black_box(batches.len());
        });
    });
}

fn bench_build_prompt(c: &mut Criterion) {
    let files = synthetic_files(400);
    let batches = create_batches(&files, BatchBudget::default().max_chars());
    let batch = batches.first().copied().unwrap_or(&[]);
    let deps = ["Boost", "Threads", "fmt"];
    c.bench_function("build_analysis_prompt", |b| {
        b.iter(|| {
            let prompt = build_analysis_prompt(black_box(batch), "C++20", &deps);
            black_box(prompt.len());
        });
    });
}

fn bench_parse_and_score(c: &mut Criterion) {
    let response = synthetic_response(500);
    c.bench_function("parse_findings_500", |b| {
        b.iter(|| {
            let findings = parse_findings(black_box(&response));
            black_box(compute_score(&findings));
        });
    });
}

criterion_group!(
    perf_core,
    bench_create_batches,
    bench_build_prompt,
    bench_parse_and_score
);
criterion_main!(perf_core);
