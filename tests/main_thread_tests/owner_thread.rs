use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use native_bridge::runtime::{get_runtime, is_initialized, is_owner_thread};
use native_bridge::{Error, Window, init, pump_events, run_on_owner_thread, shutdown};
use native_bridge_testing::{FakeBackend, with_fake_backend};

pub(crate) fn test_run_on_owner_thread_inline() {
    with_fake_backend(|_fake| {
        assert!(is_owner_thread());
        assert_eq!(run_on_owner_thread(|| 41 + 1), Ok(42));

        // A nested call from the owner thread runs inline as well.
        let nested = run_on_owner_thread(|| run_on_owner_thread(|| "inner"));
        assert_eq!(nested, Ok(Ok("inner")));
    });
}

pub(crate) fn test_foreign_thread_task_runs_during_pump() {
    with_fake_backend(|fake| {
        let owner = std::thread::current().id();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_on_owner = ran.clone();

        let worker = std::thread::spawn(move || {
            assert!(!is_owner_thread());
            run_on_owner_thread(move || {
                ran_on_owner.fetch_add(1, Ordering::SeqCst);
                let window = Window::open("from worker", 0, 0, 100, 100, 0)?;
                let id = window.id()?;
                window.dispose();
                Ok::<_, Error>((std::thread::current().id(), id))
            })
        });

        while !worker.is_finished() {
            pump_events().unwrap();
            std::thread::yield_now();
        }

        let (thread, id) = worker.join().unwrap().unwrap().unwrap();
        assert_eq!(thread, owner);
        assert_ne!(id, 0);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(fake.live_objects(), 0);
    });
}

pub(crate) fn test_install_twice_fails() {
    with_fake_backend(|_fake| {
        assert!(is_initialized());
        let first = get_runtime().unwrap();
        assert!(matches!(
            init(Arc::new(FakeBackend::new())),
            Err(Error::AlreadyInitialized)
        ));
        assert!(Arc::ptr_eq(&first, &get_runtime().unwrap()));
    });

    assert!(!is_initialized());
    assert_eq!(shutdown(), Err(Error::NotInitialized));
    assert_eq!(run_on_owner_thread(|| ()), Err(Error::NotInitialized));
    assert!(!is_owner_thread());
}

pub(crate) fn test_wrappers_outlive_runtime() {
    let (fake, window) = with_fake_backend(|fake| {
        let window = Window::open("survivor", 0, 0, 320, 240, 0).unwrap();
        (fake.clone(), window)
    });
    assert!(!is_initialized());

    // The wrapper keeps its backend: it can still be used and released.
    let handle = window.handle().unwrap();
    window.set_title("after shutdown").unwrap();
    assert_eq!(fake.window_title(handle).as_deref(), Some("after shutdown"));
    assert!(window.dispose());
    assert_eq!(fake.close_count(handle), 1);
    assert_eq!(fake.live_objects(), 0);

    assert!(matches!(
        Window::open("too late", 0, 0, 1, 1, 0),
        Err(Error::NotInitialized)
    ));
}
