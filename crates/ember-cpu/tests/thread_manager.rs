use ember_cpu::{CpuKind, CpuThread, RunPhase, ThreadError, ThreadManager, RAW_SLOT_COUNT};
use ember_ids::IdRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Host worker loop for a test thread: poll the stop flag, acknowledge on
/// exit. `poll_interval` controls how sluggishly the "guest" yields.
fn spawn_worker(thread: Arc<CpuThread>, poll_interval: Duration) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        thread.mark_running();
        while !thread.stop_requested() {
            std::thread::sleep(poll_interval);
        }
        thread.mark_stopped();
    })
}

fn wait_until_running(thread: &CpuThread) {
    while thread.run_phase() != RunPhase::Running {
        std::thread::yield_now();
    }
}

#[test]
fn sixth_raw_thread_fails_then_freed_slot_is_reused() {
    let idm = Arc::new(IdRegistry::new());
    let manager = ThreadManager::new(idm);

    let mut raws = Vec::new();
    for i in 0..RAW_SLOT_COUNT {
        let t = manager.new_raw_thread(format!("raw{i}")).unwrap();
        assert_eq!(t.kind(), CpuKind::Raw(i as u8));
        raws.push(t);
    }

    assert_eq!(
        manager.new_raw_thread("one too many").unwrap_err(),
        ThreadError::NoFreeSlot
    );

    // Destroy the thread in slot 2; its slot must become reusable.
    let victim = raws.remove(2);
    assert!(manager.remove_thread(&victim));
    drop(victim);
    assert!(manager.get_raw_thread(2).is_none());

    let replacement = manager.new_raw_thread("replacement").unwrap();
    assert_eq!(replacement.kind(), CpuKind::Raw(2));
    assert!(Arc::ptr_eq(
        &manager.get_raw_thread(2).unwrap(),
        &replacement
    ));
}

#[test]
fn raw_slot_lookup_is_absence_not_error() {
    let idm = Arc::new(IdRegistry::new());
    let manager = ThreadManager::new(idm);

    assert!(manager.get_raw_thread(0).is_none(), "empty slot");
    assert!(manager.get_raw_thread(RAW_SLOT_COUNT).is_none(), "out of range");

    let t = manager.new_raw_thread_at(3, "unit3").unwrap();
    assert!(manager.get_raw_thread(3).is_some());

    assert_eq!(
        manager.new_raw_thread_at(3, "dup").unwrap_err(),
        ThreadError::SlotOccupied { index: 3 }
    );
    assert_eq!(
        manager.new_raw_thread_at(99, "far").unwrap_err(),
        ThreadError::SlotOutOfRange { index: 99 }
    );

    assert!(manager.remove_thread(&t));
    drop(t);
    assert!(manager.get_raw_thread(3).is_none(), "destroyed thread reads empty");
}

#[test]
fn get_all_threads_spans_raw_and_handle_addressed() {
    let idm = Arc::new(IdRegistry::new());
    let manager = ThreadManager::new(idm.clone());

    let main = manager.new_thread("main", CpuKind::Main).unwrap();
    let raw = manager.new_raw_thread("raw0").unwrap();
    let worker = manager.new_thread("w1", CpuKind::Worker).unwrap();

    // Unrelated kernel objects must not show up in the enumeration.
    idm.insert(String::from("event flag")).unwrap();

    let all = manager.get_all_threads();
    assert_eq!(all.len(), 3);
    for t in [&main, &raw, &worker] {
        assert!(
            all.iter().any(|x| Arc::ptr_eq(x, t)),
            "{} missing from enumeration",
            t.name()
        );
    }
}

#[test]
fn close_waits_for_slow_threads_and_empties_the_table() {
    let idm = Arc::new(IdRegistry::new());
    let manager = ThreadManager::new(idm.clone());

    let mut threads = Vec::new();
    let mut workers = Vec::new();
    for i in 0..3u64 {
        let t = manager.new_raw_thread(format!("raw{i}")).unwrap();
        // Staggered poll intervals; the slowest acknowledges a stop request
        // only every 50ms.
        workers.push(spawn_worker(t.clone(), Duration::from_millis(10 + 20 * i)));
        threads.push(t);
    }
    let main = manager.new_thread("main", CpuKind::Main).unwrap();
    workers.push(spawn_worker(main.clone(), Duration::from_millis(1)));
    threads.push(main);

    for t in &threads {
        wait_until_running(t);
    }

    manager.close();

    for t in &threads {
        assert!(t.is_stopped(), "{} not stopped after close", t.name());
    }
    assert!(manager.get_all_threads().is_empty());
    assert!(idm.get::<CpuThread>(threads[0].handle()).is_none());
    for i in 0..RAW_SLOT_COUNT {
        assert!(manager.get_raw_thread(i).is_none());
    }

    for w in workers {
        w.join().expect("worker panicked");
    }
}

#[test]
fn thread_deregistering_itself_during_close_is_harmless() {
    let idm = Arc::new(IdRegistry::new());
    let manager = Arc::new(ThreadManager::new(idm));

    let t = manager.new_raw_thread("self-exit").unwrap();
    let worker = {
        let manager = manager.clone();
        let t = t.clone();
        std::thread::spawn(move || {
            t.mark_running();
            while !t.stop_requested() {
                std::thread::yield_now();
            }
            // Exit path deregisters the thread itself before acknowledging.
            manager.remove_thread(&t);
            t.mark_stopped();
        })
    };
    wait_until_running(&t);

    manager.close();
    assert!(t.is_stopped());
    assert!(manager.get_all_threads().is_empty());
    worker.join().expect("worker panicked");
}
