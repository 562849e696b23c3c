use std::sync::Arc;

use native_bridge::events::{
    self, DemuxState, Event, EventKind, FingerPhase, RawEvent, WindowEvent, clear_touch_handler,
    on_device_added, on_global_event, on_touch, routes_complete,
};
use native_bridge::native::AudioSpec;
use native_bridge::runtime::BridgeBuilder;
use native_bridge::{AudioDevice, Error, GameController, Joystick, Window, drain_events, pump_events};
use native_bridge_testing::{FIRST_HANDLE, with_fake_backend, with_fake_backend_configured};
use parking_lot::Mutex;

fn window_event(timestamp: u32, window_id: u32, event: WindowEvent) -> Event {
    Event::new(timestamp, EventKind::Window { window_id, event })
}

/// A handler that records every event it sees.
fn recorder() -> (Arc<Mutex<Vec<Event>>>, impl Fn(&Event) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |event: &Event| sink.lock().push(event.clone()))
}

pub(crate) fn test_window_event_routes_by_id() {
    with_fake_backend(|fake| {
        assert!(routes_complete());

        fake.set_next_object_id(7);
        let window = Window::open("routed", 0, 0, 320, 240, 0).unwrap();
        assert_eq!(window.id().unwrap(), 7);

        let (seen, record) = recorder();
        let state_in_handler = Arc::new(Mutex::new(None));
        let state_sink = state_in_handler.clone();
        window
            .on_event(move |target, event| {
                assert_eq!(target.id().unwrap(), 7);
                *state_sink.lock() = Some(events::state());
                record(event);
            })
            .unwrap();

        let resized = window_event(1, 7, WindowEvent::Resized { width: 800, height: 600 });
        fake.push_event(&resized);
        fake.push_event(&window_event(2, 99, WindowEvent::Close));
        let text = Event::new(
            3,
            EventKind::TextInput {
                window_id: 7,
                text: "héllo".to_string(),
            },
        );
        fake.push_event(&text);

        assert_eq!(drain_events().unwrap(), 3);
        assert_eq!(*seen.lock(), vec![resized, text]);
        assert_eq!(*state_in_handler.lock(), Some(DemuxState::Draining));
        assert_eq!(events::state(), DemuxState::Idle);
        // Unrouted events are dropped without an error.
        assert_eq!(fake.last_error(), None);

        assert!(window.clear_event_handler());
        fake.push_event(&window_event(4, 7, WindowEvent::Shown));
        assert!(pump_events().unwrap());
        assert_eq!(seen.lock().len(), 2);
    });
}

pub(crate) fn test_pump_on_empty_queue() {
    with_fake_backend(|_fake| {
        assert!(!pump_events().unwrap());
        assert_eq!(drain_events().unwrap(), 0);
    });

    with_fake_backend_configured(BridgeBuilder::new().trace_unrouted_events(true), |fake| {
        fake.push_event(&window_event(1, 1234, WindowEvent::Exposed));
        fake.push_raw(RawEvent::new(0xdead, 2));
        assert!(pump_events().unwrap());
        assert!(pump_events().unwrap());
        assert!(!pump_events().unwrap());
    });
}

pub(crate) fn test_pump_without_runtime() {
    assert_eq!(pump_events(), Err(Error::NotInitialized));
    assert_eq!(drain_events(), Err(Error::NotInitialized));
    assert!(matches!(Window::open("x", 0, 0, 1, 1, 0), Err(Error::NotInitialized)));
}

pub(crate) fn test_global_and_device_added() {
    with_fake_backend(|fake| {
        let (global, record_global) = recorder();
        let (added, record_added) = recorder();
        on_global_event(record_global);
        on_device_added(record_added);

        let quit = Event::new(1, EventKind::Quit);
        let unknown = Event::new(2, EventKind::Unknown { tag: 0x8000 });
        let joy_added = Event::new(3, EventKind::JoyDeviceAdded { device_index: 0 });
        let audio_added = Event::new(
            4,
            EventKind::AudioDeviceAdded {
                index: 1,
                capture: true,
            },
        );
        for event in [&quit, &joy_added, &unknown, &audio_added] {
            fake.push_event(event);
        }

        assert_eq!(drain_events().unwrap(), 4);
        assert_eq!(*global.lock(), vec![quit.clone(), unknown]);
        assert_eq!(*added.lock(), vec![joy_added, audio_added]);

        assert!(events::clear_global_handler());
        fake.push_event(&quit);
        drain_events().unwrap();
        assert_eq!(global.lock().len(), 2);
    });

    // Shutting down drops process-wide handlers.
    with_fake_backend(|fake| {
        assert!(!events::clear_device_added_handler());
        fake.push_event(&Event::new(1, EventKind::ControllerDeviceAdded { device_index: 2 }));
        assert_eq!(drain_events().unwrap(), 1);
    });
}

pub(crate) fn test_joystick_and_controller_routes() {
    with_fake_backend(|fake| {
        fake.set_next_object_id(3);
        let joystick = Joystick::open(0).unwrap();
        fake.set_next_object_id(5);
        let controller = GameController::open(1).unwrap();

        let joystick_events = Arc::new(Mutex::new(Vec::new()));
        let sink = joystick_events.clone();
        joystick
            .on_event(move |_, event| sink.lock().push(event.clone()))
            .unwrap();
        let controller_events = Arc::new(Mutex::new(Vec::new()));
        let sink = controller_events.clone();
        controller
            .on_event(move |_, event| sink.lock().push(event.clone()))
            .unwrap();

        let button = Event::new(
            1,
            EventKind::JoyButton {
                which: 3,
                button: 2,
                pressed: true,
            },
        );
        let axis = Event::new(
            2,
            EventKind::ControllerAxis {
                which: 5,
                axis: 1,
                value: -16_000,
            },
        );
        let remapped = Event::new(3, EventKind::ControllerDeviceRemapped { which: 5 });
        // Instance ids are per family: joystick 5 is not controller 5.
        let stray = Event::new(
            4,
            EventKind::JoyAxis {
                which: 5,
                axis: 0,
                value: 1,
            },
        );
        for event in [&button, &axis, &stray, &remapped] {
            fake.push_event(event);
        }

        assert_eq!(drain_events().unwrap(), 4);
        assert_eq!(*joystick_events.lock(), vec![button]);
        assert_eq!(*controller_events.lock(), vec![axis, remapped]);
    });
}

pub(crate) fn test_touch_route() {
    with_fake_backend(|fake| {
        let (touches, record) = recorder();
        on_touch(42, record);

        let finger = |touch_id| {
            Event::new(
                1,
                EventKind::Finger {
                    phase: FingerPhase::Down,
                    touch_id,
                    finger_id: 1,
                    x: 0.25,
                    y: 0.5,
                    dx: 0.0,
                    dy: 0.0,
                    pressure: 1.0,
                    window_id: 0,
                },
            )
        };
        fake.push_event(&finger(42));
        fake.push_event(&finger(43));

        assert_eq!(drain_events().unwrap(), 2);
        assert_eq!(*touches.lock(), vec![finger(42)]);

        assert!(clear_touch_handler(42));
        assert!(!clear_touch_handler(42));
    });
}

pub(crate) fn test_audio_device_route() {
    with_fake_backend(|fake| {
        let device = AudioDevice::open(None, false, AudioSpec::default()).unwrap();
        let id = device.id().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        device
            .on_event(move |target, event| {
                sink.lock().push((target.id().unwrap(), event.clone()));
            })
            .unwrap();

        let removed = Event::new(
            1,
            EventKind::AudioDeviceRemoved {
                device: id,
                capture: false,
            },
        );
        fake.push_event(&removed);
        fake.push_event(&Event::new(
            2,
            EventKind::AudioDeviceRemoved {
                device: id + 100,
                capture: false,
            },
        ));

        assert_eq!(drain_events().unwrap(), 2);
        assert_eq!(*seen.lock(), vec![(id, removed)]);
    });
}

pub(crate) fn test_handler_disposing_its_window() {
    with_fake_backend(|fake| {
        fake.set_next_object_id(7);
        let closing = Window::open("closing", 0, 0, 320, 240, 0).unwrap();
        fake.set_next_object_id(8);
        let other = Window::open("other", 0, 0, 320, 240, 0).unwrap();

        let (closing_seen, record_closing) = recorder();
        closing
            .on_event(move |target, event| {
                record_closing(event);
                if event.kind == (EventKind::Window { window_id: 7, event: WindowEvent::Close }) {
                    target.dispose();
                }
            })
            .unwrap();
        let (other_seen, record_other) = recorder();
        other.on_event(move |_, event| record_other(event)).unwrap();

        let close = window_event(1, 7, WindowEvent::Close);
        let other_event = window_event(2, 8, WindowEvent::FocusGained);
        fake.push_event(&close);
        fake.push_event(&window_event(3, 7, WindowEvent::Exposed));
        fake.push_event(&other_event);
        fake.push_event(&window_event(4, 7, WindowEvent::Hidden));

        assert_eq!(drain_events().unwrap(), 2);
        assert!(closing.is_disposed());
        assert_eq!(*closing_seen.lock(), vec![close]);
        assert_eq!(*other_seen.lock(), vec![other_event]);
        assert_eq!(fake.invalid_releases(), 0);
    });
}

pub(crate) fn test_stale_event_not_delivered_to_recycled_handle() {
    with_fake_backend(|fake| {
        let first = Window::open("A", 0, 0, 320, 240, 0).unwrap();
        assert_eq!(first.handle().unwrap().as_raw(), FIRST_HANDLE);
        let id = first.id().unwrap();

        fake.push_event(&window_event(1, id, WindowEvent::Moved { x: 10, y: 10 }));
        first.dispose();

        let second = Window::open("B", 0, 0, 320, 240, 0).unwrap();
        assert_eq!(second.handle().unwrap().as_raw(), FIRST_HANDLE);
        assert_eq!(second.id().unwrap(), id);

        let (seen, record) = recorder();
        second.on_event(move |_, event| record(event)).unwrap();
        let fresh = window_event(2, id, WindowEvent::Moved { x: 20, y: 20 });
        fake.push_event(&fresh);

        drain_events().unwrap();
        assert_eq!(*seen.lock(), vec![fresh]);
    });
}

pub(crate) fn test_finalized_target_retires_route() {
    with_fake_backend(|fake| {
        fake.set_next_object_id(3);
        let joystick = Joystick::open(0).unwrap();
        joystick.on_event(|_, _| panic!("handler of a dropped joystick ran")).unwrap();

        fake.push_event(&Event::new(1, EventKind::JoyDeviceRemoved { which: 3 }));
        fake.push_event(&Event::new(2, EventKind::Quit));
        drop(joystick);

        assert_eq!(fake.queued_events(), 0);
        let (global, record) = recorder();
        on_global_event(record);
        assert_eq!(drain_events().unwrap(), 1);
        assert_eq!(global.lock().len(), 1);

        fake.set_next_object_id(3);
        let reopened = Joystick::open(0).unwrap();
        assert_eq!(Joystick::from_instance_id(3).unwrap(), reopened);
        assert_eq!(drain_events().unwrap(), 0);
    });
}
