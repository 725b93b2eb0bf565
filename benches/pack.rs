//! Benchmarks for packing, lookup and request handling

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use http::{header, Request};
use imbed_rs::{pack, AssetServer, CompressionMethod, EmbeddedFs, FileSystem, PackOptions, ServerOptions};
use std::fs;
use std::io::Read;
use std::sync::Arc;
use tempfile::TempDir;

fn create_source(files: usize, file_size: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for i in 0..files {
        let sub = dir.path().join(format!("dir{}", i % 8));
        fs::create_dir_all(&sub).unwrap();
        let text = format!("/* asset {} */ .rule-{} {{ color: #{:06x}; }}\n", i, i, i * 97);
        let content: Vec<u8> = text.bytes().cycle().take(file_size).collect();
        fs::write(sub.join(format!("style{}.css", i)), content).unwrap();
    }
    dir
}

fn benchmark_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");
    let src = create_source(64, 16 * 1024);
    group.throughput(Throughput::Bytes(64 * 16 * 1024));

    for method in [CompressionMethod::None, CompressionMethod::Gzip, CompressionMethod::Zstd] {
        let options = PackOptions::new().compression(method);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{:?}", method)), &options, |b, options| {
            b.iter(|| black_box(pack(src.path(), options).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_open_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_read");
    let src = create_source(64, 16 * 1024);

    for method in [CompressionMethod::None, CompressionMethod::Gzip] {
        let (blob, index) = pack(src.path(), &PackOptions::new().compression(method)).unwrap();
        let fs_ = EmbeddedFs::new(index, blob);
        group.bench_function(format!("{:?}", method), |b| {
            let mut buf = Vec::with_capacity(16 * 1024);
            b.iter(|| {
                buf.clear();
                let mut file = fs_.open(black_box("dir3/style11.css")).unwrap();
                file.read_to_end(&mut buf).unwrap();
                black_box(buf.len());
            });
        });
    }

    group.finish();
}

fn benchmark_handle(c: &mut Criterion) {
    let src = create_source(256, 4 * 1024);
    let (blob, index) = pack(src.path(), &PackOptions::default()).unwrap();
    let server = AssetServer::new(Arc::new(EmbeddedFs::new(index, blob)), ServerOptions::default());

    c.bench_function("handle_gzip_passthrough", |b| {
        let req = Request::get("/dir5/style13.css")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(())
            .unwrap();
        b.iter(|| black_box(server.handle(&req)));
    });
}

criterion_group!(benches, benchmark_pack, benchmark_open_read, benchmark_handle);
criterion_main!(benches);
