//! 服务工厂的性能基准测试

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::future;
use svc_factory::definition::resolve;
use svc_factory::{Params, RawDefinition, ServiceFactory, StaticReader};
use tokio::runtime::Runtime;

/// 测试用的简单服务
struct SimpleService {
    endpoint: String,
}

/// 由一个根定义与 depth 层子定义组成的继承链
fn chain(depth: usize) -> Vec<RawDefinition> {
    let mut raw = vec![RawDefinition::new("svc_0", "simple").param("endpoint", "localhost")];
    for i in 1..=depth {
        raw.push(
            RawDefinition::child(format!("svc_{i}"), format!("svc_{}", i - 1))
                .param(format!("key_{i}"), i.to_string()),
        );
    }
    raw
}

fn build_factory(runtime: &Runtime, depth: usize) -> ServiceFactory {
    runtime
        .block_on(
            ServiceFactory::builder()
                .reader(StaticReader::new(chain(depth)))
                .constructor("simple", |params: &Params| {
                    Ok(SimpleService {
                        endpoint: params.get("endpoint").cloned().unwrap_or_default(),
                    })
                })
                .build(),
        )
        .unwrap()
}

/// 基准测试：记忆化与一次性获取
fn bench_lookup(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let factory = build_factory(&runtime, 4);

    let mut group = c.benchmark_group("lookup");

    group.bench_function("memoized", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let service = factory.get_as::<SimpleService>("svc_4").await.unwrap();
                black_box(service.endpoint.len())
            })
        });
    });

    group.bench_function("throwaway", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let instance = factory.get_throwaway("svc_4").await.unwrap();
                black_box(instance)
            })
        });
    });

    group.finish();
}

/// 基准测试：继承链解析
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for depth in [10, 100, 1000].iter() {
        let raw = chain(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &raw, |b, raw| {
            b.iter(|| black_box(resolve(raw).unwrap().len()));
        });
    }

    group.finish();
}

/// 基准测试：并发首次获取
fn bench_concurrent_first_access(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent_first_access");

    for concurrent_count in [10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrent_count),
            concurrent_count,
            |b, &concurrent_count| {
                b.iter(|| {
                    let factory = build_factory(&runtime, 4);
                    runtime.block_on(async {
                        let tasks = (0..concurrent_count).map(|_| factory.get("svc_4"));
                        black_box(future::join_all(tasks).await.len())
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_lookup, bench_resolution, bench_concurrent_first_access);
criterion_main!(benches);
