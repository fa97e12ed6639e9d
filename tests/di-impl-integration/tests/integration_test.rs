//! 依赖注入容器的并发集成测试

use di_abstractions::Capability;
use di_impl::{ServiceCollection, ServiceProvider};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// 构造时记录次数的服务
#[derive(Debug)]
struct Counted {
    serial: usize,
}

const SLOW_SINGLETON: Capability<Counted> = Capability::new("SlowSingleton");
const SLOW_SCOPED: Capability<Counted> = Capability::new("SlowScoped");
const OTHER_SINGLETON: Capability<Counted> = Capability::new("OtherSingleton");

fn counted_provider(constructions: Arc<AtomicUsize>) -> ServiceProvider {
    let singleton_counter = Arc::clone(&constructions);
    let scoped_counter = Arc::clone(&constructions);

    let mut services = ServiceCollection::new();
    services
        .add_singleton(&SLOW_SINGLETON, move |_| {
            // 放大首次构造的竞争窗口
            thread::sleep(Duration::from_millis(20));
            let serial = singleton_counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Counted { serial }))
        })
        .add_scoped(&SLOW_SCOPED, move |_| {
            thread::sleep(Duration::from_millis(5));
            let serial = scoped_counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Counted { serial }))
        })
        .add_singleton(&OTHER_SINGLETON, |_| Ok(Arc::new(Counted { serial: usize::MAX })));

    services.build().expect("服务提供者构建失败")
}

#[test]
fn concurrent_first_singleton_resolution_constructs_once_across_threads() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let provider = counted_provider(Arc::clone(&constructions));
    let workers = 16;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let provider = provider.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let scope = provider.open_scope();
                barrier.wait();
                scope.resolve(&SLOW_SINGLETON).map(|service| service.serial)
            })
        })
        .collect();

    let serials: HashSet<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("线程异常").expect("解析失败"))
        .collect();

    assert_eq!(serials.len(), 1);
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert_eq!(provider.stats().singleton_constructions, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_singleton_resolution_constructs_once_across_tasks() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let provider = counted_provider(Arc::clone(&constructions));

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let provider = provider.clone();
            tokio::task::spawn_blocking(move || {
                let scope = provider.open_scope();
                scope.resolve(&SLOW_SINGLETON).map(|service| service.serial)
            })
        })
        .collect();

    let mut serials = HashSet::new();
    for task in tasks {
        serials.insert(task.await.expect("任务异常").expect("解析失败"));
    }

    assert_eq!(serials.len(), 1);
    assert_eq!(constructions.load(Ordering::SeqCst), 1);

    let stats = provider.stats();
    assert_eq!(stats.scopes_opened, 32);
    assert_eq!(stats.scopes_released, 32);
}

#[test]
fn concurrent_resolution_within_one_scope_constructs_scoped_once() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let provider = counted_provider(Arc::clone(&constructions));
    let scope = provider.open_scope();
    let barrier = Barrier::new(8);

    let serials: HashSet<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    scope.resolve(&SLOW_SCOPED).map(|service| service.serial)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("线程异常").expect("解析失败"))
            .collect()
    });

    assert_eq!(serials.len(), 1);
    assert_eq!(provider.stats().scoped_constructions, 1);
}

#[test]
fn concurrent_scopes_never_share_scoped_instances() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let provider = counted_provider(Arc::clone(&constructions));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = provider.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let scope = provider.open_scope();
                barrier.wait();
                let first = scope.resolve(&SLOW_SCOPED).map(|service| service.serial);
                let second = scope.resolve(&SLOW_SCOPED).map(|service| service.serial);
                (first.expect("解析失败"), second.expect("解析失败"))
            })
        })
        .collect();

    let mut serials = HashSet::new();
    for handle in handles {
        let (first, second) = handle.join().expect("线程异常");
        assert_eq!(first, second);
        serials.insert(first);
    }

    assert_eq!(serials.len(), 8);
    assert_eq!(provider.stats().scoped_constructions, 8);
    assert_eq!(provider.stats().active_scopes(), 0);
}

#[test]
fn slow_singleton_does_not_block_unrelated_capabilities() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let provider = counted_provider(constructions);

    let slow = {
        let provider = provider.clone();
        thread::spawn(move || provider.resolve(&SLOW_SINGLETON).map(|service| service.serial))
    };

    let other = provider.resolve(&OTHER_SINGLETON).expect("解析失败");
    assert_eq!(other.serial, usize::MAX);
    assert!(slow.join().expect("线程异常").is_ok());
}
