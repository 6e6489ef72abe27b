//! Concurrent texture requests from several threads, resolved by pumping
//! a manual executor: one load per identity, missing files degrade to the
//! placeholder.

use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use ember_core::{
    Executor, Handle, LoadError, LoadMode, ManualExecutor, MemorySource, ResourceLoader,
    WorkerPool,
};
use ember_rendering::{Texture, TextureParams, MAGENTA};

const REQUESTERS: usize = 4;

fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_concurrent_requests_valid_and_missing() {
    let executor = Arc::new(ManualExecutor::new());
    let source = MemorySource::new().with_file("A.png", png(4, 4, [10, 20, 30, 255]));
    let loader = ResourceLoader::new(executor.clone(), Arc::new(source));

    let handles: Vec<(Handle<Texture>, Handle<Texture>)> = thread::scope(|scope| {
        let workers: Vec<_> = (0..REQUESTERS)
            .map(|_| {
                let loader = &loader;
                scope.spawn(move || {
                    let a = loader.load::<Texture>(TextureParams::color("A.png"), LoadMode::NonBlocking);
                    let b = loader.load::<Texture>(TextureParams::color("B.png"), LoadMode::NonBlocking);
                    (a, b)
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    // Nothing has run yet.
    assert_eq!(executor.queued(), 2);
    assert!(handles.iter().all(|(a, b)| !a.is_ready() && !b.is_ready()));

    executor.pump();

    let (a, b) = &handles[0];
    for (other_a, other_b) in &handles[1..] {
        assert!(Handle::ptr_eq(a, other_a));
        assert!(Handle::ptr_eq(b, other_b));
    }

    assert!(a.is_ready());
    assert!(a.is_valid());
    assert_eq!(a.wait().pixel(3, 3), Some([10, 20, 30, 255]));

    assert!(b.is_ready());
    assert!(!b.is_valid());
    assert!(matches!(b.error(), Some(LoadError::NotFound { .. })));
    assert_eq!(b.wait().pixel(0, 0), Some(MAGENTA));

    assert_eq!(executor.scheduled(), 2);
    let stats = loader.stats();
    assert_eq!(stats.scheduled, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
}

#[test]
fn test_concurrent_requests_on_worker_pool() {
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let source = MemorySource::new().with_file("A.png", png(2, 2, [0, 255, 0, 255]));
    let loader = ResourceLoader::new(pool.clone(), Arc::new(source));

    let handles: Vec<Handle<Texture>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..REQUESTERS)
            .map(|i| {
                let loader = &loader;
                let mode = if i % 2 == 0 {
                    LoadMode::NonBlocking
                } else {
                    LoadMode::Blocking
                };
                scope.spawn(move || loader.load::<Texture>(TextureParams::color("A.png"), mode))
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    pool.wait_idle();

    for handle in &handles {
        assert!(Handle::ptr_eq(handle, &handles[0]));
        assert!(handle.is_valid());
    }
    assert_eq!(loader.stats().scheduled, 1);
    assert_eq!(loader.stats().completed, 1);
}
