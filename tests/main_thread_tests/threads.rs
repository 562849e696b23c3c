use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use native_bridge::events::{Event, EventKind, WindowEvent, on_global_event};
use native_bridge::native::RawPoint;
use native_bridge::{HitTest, Timer, Window, drain_events};
use native_bridge_testing::{FakeBackend, with_fake_backend};
use parking_lot::Mutex;

const THREADS: usize = 8;

/// Error channel text other than a lookup miss, which is the expected
/// outcome of a callback that loses the race against a release.
fn fault_text(fake: &FakeBackend) -> Option<String> {
    fake.last_error().filter(|text| !text.starts_with("no live "))
}

fn window_event(timestamp: u32, window_id: u32, event: WindowEvent) -> Event {
    Event::new(timestamp, EventKind::Window { window_id, event })
}

pub(crate) fn test_concurrent_dispose_releases_once() {
    with_fake_backend(|fake| {
        let window = Window::open("contended", 0, 0, 320, 240, 0).unwrap();
        let handle = window.handle().unwrap();
        let barrier = Arc::new(Barrier::new(THREADS + 1));
        let winners = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::new();
        for _ in 0..THREADS {
            let window = window.clone();
            let barrier = barrier.clone();
            let winners = winners.clone();
            workers.push(thread::spawn(move || {
                barrier.wait();
                if window.dispose() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        let dropped = window.clone();
        let finalizer = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                drop(dropped);
            })
        };
        drop(window);

        for worker in workers {
            worker.join().unwrap();
        }
        finalizer.join().unwrap();

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(fake.close_count(handle), 1);
        assert_eq!(fake.invalid_releases(), 0);
        assert!(Window::lookup(handle).is_none());
        assert_eq!(fake.live_objects(), 0);
    });
}

pub(crate) fn test_concurrent_finalizers_release_once() {
    with_fake_backend(|fake| {
        let window = Window::open("shared", 0, 0, 320, 240, 0).unwrap();
        let handle = window.handle().unwrap();
        let barrier = Arc::new(Barrier::new(THREADS));

        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let window = window.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    drop(window);
                })
            })
            .collect();
        drop(window);
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(fake.close_count(handle), 1);
        assert_eq!(fake.invalid_releases(), 0);
        assert_eq!(fake.live_objects(), 0);
    });
}

pub(crate) fn test_foreign_release_leaves_native_queue_to_owner() {
    with_fake_backend(|fake| {
        let stale = Window::open("A", 0, 0, 320, 240, 0).unwrap();
        let stale_handle = stale.handle().unwrap();
        let stale_id = stale.id().unwrap();
        let other = Window::open("B", 0, 0, 320, 240, 0).unwrap();
        let other_id = other.id().unwrap();

        let other_seen = Arc::new(Mutex::new(Vec::new()));
        let sink = other_seen.clone();
        other.on_event(move |_, event| sink.lock().push(event.clone())).unwrap();
        let global = Arc::new(Mutex::new(Vec::new()));
        let sink = global.clone();
        on_global_event(move |event| sink.lock().push(event.clone()));

        let focus = window_event(2, other_id, WindowEvent::FocusGained);
        let quit = Event::new(3, EventKind::Quit);
        fake.push_event(&window_event(1, stale_id, WindowEvent::Moved { x: 1, y: 1 }));
        fake.push_event(&focus);
        fake.push_event(&quit);

        thread::spawn(move || drop(stale)).join().unwrap();
        // Released on the worker, but the native queue was left alone.
        assert_eq!(fake.close_count(stale_handle), 1);
        assert_eq!(fake.queued_events(), 3);

        // The owner settles the retired route before an open can reissue the id.
        let fresh = Window::open("C", 0, 0, 320, 240, 0).unwrap();
        assert_eq!(fresh.handle().unwrap(), stale_handle);
        assert_eq!(fresh.id().unwrap(), stale_id);
        assert_eq!(fake.queued_events(), 0);

        let fresh_seen = Arc::new(Mutex::new(Vec::new()));
        let sink = fresh_seen.clone();
        fresh.on_event(move |_, event| sink.lock().push(event.clone())).unwrap();
        let moved = window_event(4, stale_id, WindowEvent::Moved { x: 2, y: 2 });
        fake.push_event(&moved);

        assert_eq!(drain_events().unwrap(), 3);
        assert_eq!(*fresh_seen.lock(), vec![moved]);
        assert_eq!(*other_seen.lock(), vec![focus]);
        assert_eq!(*global.lock(), vec![quit]);
    });
}

pub(crate) fn test_pump_settles_foreign_release() {
    with_fake_backend(|fake| {
        fake.set_next_object_id(7);
        let window = Window::open("finalized elsewhere", 0, 0, 320, 240, 0).unwrap();
        fake.push_event(&window_event(1, 7, WindowEvent::Exposed));
        fake.push_event(&Event::new(2, EventKind::Quit));

        thread::spawn(move || drop(window)).join().unwrap();
        assert_eq!(fake.queued_events(), 2);

        // Only the quit event is left once the owner settles the release.
        assert_eq!(drain_events().unwrap(), 1);
        assert_eq!(fake.queued_events(), 0);
    });
}

pub(crate) fn test_timer_expiry_races_dispose() {
    with_fake_backend(|fake| {
        let fired = Arc::new(AtomicUsize::new(0));
        let count = fired.clone();
        let timer = Timer::start(10, move |_, interval| {
            count.fetch_add(1, Ordering::SeqCst);
            interval
        })
        .unwrap();
        let id = timer.id().unwrap();

        let native = fake.clone();
        let worker = thread::spawn(move || {
            let mut expiries = 0;
            while native.fire_timer(id).is_some() {
                expiries += 1;
            }
            expiries
        });
        while fired.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        assert!(timer.dispose());
        let expiries = worker.join().unwrap();

        assert!(expiries >= 1);
        assert!(fired.load(Ordering::SeqCst) <= expiries);
        assert_eq!(fake.live_timers(), 0);
        assert_eq!(fault_text(fake), None);
    });
}

pub(crate) fn test_hit_test_races_dispose() {
    with_fake_backend(|fake| {
        let window = Window::open("racing", 0, 0, 320, 240, 0).unwrap();
        let handle = window.handle().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let count = calls.clone();
        window
            .set_hit_test(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
                HitTest::Draggable
            })
            .unwrap();

        let native = fake.clone();
        let worker = thread::spawn(move || {
            let mut answers = Vec::new();
            while let Some(answer) = native.hit_test(handle, RawPoint { x: 1, y: 1 }) {
                answers.push(answer);
            }
            answers
        });
        while calls.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        assert!(window.dispose());
        let answers = worker.join().unwrap();

        // Each answer is the handler's, or the neutral one once the window is gone.
        assert!(!answers.is_empty());
        assert!(answers.iter().all(|answer| {
            *answer == HitTest::Draggable.as_raw() || *answer == HitTest::Normal.as_raw()
        }));
        assert!(calls.load(Ordering::SeqCst) <= answers.len());
        assert!(!fake.has_hit_test(handle));
        assert_eq!(fake.invalid_releases(), 0);
        assert_eq!(fault_text(fake), None);
    });
}
