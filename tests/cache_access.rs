// tests/cache_access.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use pipetree::cache::{Cache, CacheRegistry, JsonFileCache, Location, MemoryCache};
use pipetree::errors::CacheError;
use pipetree::fs::{FileSystem, MockFileSystem};
use pipetree::types::ExecutionMode;

const RUN: ExecutionMode = ExecutionMode::Run;

fn memory(value: Option<Vec<i32>>) -> Cache<MemoryCache<Vec<i32>>> {
    let backend = match value {
        Some(v) => MemoryCache::with_value(v),
        None => MemoryCache::new(),
    };
    Cache::new(backend, Location::in_memory("exported/values"))
}

#[test]
fn concurrent_readers_do_not_block_each_other() {
    let cache = Arc::new(memory(Some(vec![1, 2, 3])));
    let barrier = Arc::new(Barrier::new(2));

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let access = cache.read(RUN).unwrap();
                // Both readers hold their access here at the same time.
                barrier.wait();
                access.get().len()
            })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.join().unwrap(), 3);
    }
}

#[test]
fn writer_waits_for_readers() {
    let cache = Arc::new(memory(Some(vec![1])));
    let wrote = Arc::new(AtomicBool::new(false));

    let reader = cache.read(RUN).unwrap();
    let writer = {
        let cache = Arc::clone(&cache);
        let wrote = Arc::clone(&wrote);
        thread::spawn(move || {
            let mut access = cache.write().unwrap();
            wrote.store(true, Ordering::SeqCst);
            access.set(vec![9]);
            access.finish().unwrap();
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!wrote.load(Ordering::SeqCst), "writer got in while a reader held the cache");
    assert_eq!(reader.get(), &vec![1]);
    drop(reader);

    writer.join().unwrap();
    assert!(wrote.load(Ordering::SeqCst));
    assert_eq!(cache.read(RUN).unwrap().get(), &vec![9]);
}

#[test]
fn read_write_is_visible_after_its_scope() {
    let fs = MockFileSystem::new();
    let path = std::path::PathBuf::from("/out/values.json");
    fs.add_file(&path, "[1, 2]");
    let cache = Cache::new(
        JsonFileCache::<Vec<i32>>::new(Arc::new(fs.clone()), Some(path.clone())),
        Location::new("exported/values.json", Some(path.clone())),
    );

    {
        let read = cache.read(RUN).unwrap();
        assert_eq!(read.get(), &vec![1, 2]);
    }
    {
        let mut rw = cache.read_write(RUN).unwrap();
        rw.get_mut().push(3);
    }

    // Pushed before release: both the file and a fresh read agree.
    let on_disk: Vec<i32> = serde_json::from_str(&fs.read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, vec![1, 2, 3]);
    assert_eq!(cache.read(RUN).unwrap().get(), &vec![1, 2, 3]);
}

#[test]
fn write_then_read_round_trips_without_pull_overwrite() {
    let fs = MockFileSystem::new();
    let path = std::path::PathBuf::from("/out/summary.json");
    fs.add_file(&path, "[0]");
    let cache = Cache::new(
        JsonFileCache::<Vec<i32>>::new(Arc::new(fs), Some(path.clone())),
        Location::new("exported/summary.json", Some(path)),
    );

    let mut write = cache.write().unwrap();
    write.set(vec![4, 5]);
    write.finish().unwrap();

    assert_eq!(cache.read(RUN).unwrap().get(), &vec![4, 5]);
}

#[test]
fn empty_cache_is_an_error_when_running_and_default_when_simulating() {
    let cache = memory(None);

    let err = cache.read(RUN).err().unwrap();
    assert!(matches!(err, CacheError::NoValue { .. }));

    let simulated = cache.read(ExecutionMode::Simulate).unwrap();
    assert!(simulated.get().is_empty());
}

#[test]
fn registry_flushes_every_cache() {
    let fs = MockFileSystem::new();
    let registry = CacheRegistry::new();

    let json = registry.register(
        JsonFileCache::<Vec<i32>>::new(Arc::new(fs.clone()), Some("/out/a.json".into())),
        Location::new("exported/a.json", Some("/out/a.json".into())),
    );
    registry.register(MemoryCache::with_value(1_u8), Location::in_memory("exported/b"));

    {
        let mut rw = json.read_write(ExecutionMode::Simulate).unwrap();
        rw.set(vec![7]);
    }
    assert_eq!(registry.len(), 2);
    let internal: Vec<_> = registry
        .locations()
        .iter()
        .map(|l| l.internal_path().to_path_buf())
        .collect();
    assert_eq!(
        internal,
        vec![
            std::path::PathBuf::from("exported/a.json"),
            std::path::PathBuf::from("exported/b")
        ]
    );
    assert_eq!(registry.postprocess_all().unwrap(), 2);
    assert!(fs.files().contains(&std::path::PathBuf::from("/out/a.json")));
}
