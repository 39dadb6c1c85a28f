//! Benchmarks for pwalk
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;

fn benchmark_queue_operations(c: &mut Criterion) {
    use pwalk::walker::queue::{DirTask, WorkQueue};

    c.bench_function("queue_send_recv", |b| {
        let queue = WorkQueue::new();
        let sender = queue.sender();
        let receiver = queue.receiver();

        b.iter(|| {
            let task = DirTask::new(1, "/test/path".into(), 5);
            sender.send(task);
            let received = receiver.try_recv().unwrap();
            black_box(received);
        })
    });
}

fn benchmark_probe(c: &mut Criterion) {
    use pwalk::hardlink::HardlinkTracker;
    use pwalk::probe::probe;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.dat");
    fs::write(&path, vec![0u8; 4096]).unwrap();
    let tracker = HardlinkTracker::new();

    c.bench_function("probe_entry", |b| {
        b.iter(|| {
            let record = probe(&path, 1, 1, false, &tracker).unwrap();
            black_box(record);
        })
    });
}

fn benchmark_small_tree_scan(c: &mut Criterion) {
    use pwalk::{report, ScanRequest};

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir(&root).unwrap();
    for d in 0..10 {
        let sub = root.join(format!("d{}", d));
        fs::create_dir(&sub).unwrap();
        for f in 0..20 {
            fs::write(sub.join(format!("f{}.txt", f)), "payload").unwrap();
        }
    }

    c.bench_function("scan_200_files", |b| {
        b.iter(|| {
            let mut request = ScanRequest::new(&root);
            request.output = Some(dir.path().join("bench.csv"));
            request.max_threads = Some(4);
            let outcome = report(request).unwrap();
            black_box(outcome);
        })
    });
}

criterion_group!(
    benches,
    benchmark_queue_operations,
    benchmark_probe,
    benchmark_small_tree_scan
);
criterion_main!(benches);
