use native_bridge::native::{AudioSpec, OpenRequest, TextureInfo};
use native_bridge::objects::{SystemCursor, live_counts};
use native_bridge::{
    AnyObject, AudioDevice, Cursor, Error, GameController, Haptic, IoStream, Joystick, NativeHandle,
    ObjectKind, Renderer, Texture, Timer, Window, open,
};
use native_bridge_testing::with_fake_backend;

const FORMAT_RGBA8888: u32 = 0x1646_2004;

fn assert_use_after_release<T: std::fmt::Debug>(result: native_bridge::Result<T>, kind: ObjectKind) {
    match result {
        Err(Error::UseAfterRelease { kind: reported }) => assert_eq!(reported, kind),
        other => panic!("expected use-after-release of {kind}, got {other:?}"),
    }
}

pub(crate) fn test_dispose_twice_releases_once() {
    with_fake_backend(|fake| {
        let window = Window::open("twice", 0, 0, 320, 240, 0).unwrap();
        let handle = window.handle().unwrap();
        let clone = window.clone();

        assert!(window.dispose());
        assert!(!window.dispose());
        assert!(!clone.dispose());
        drop(window);
        drop(clone);

        assert_eq!(fake.close_count(handle), 1);
        assert_eq!(fake.invalid_releases(), 0);
    });
}

pub(crate) fn test_finalize_releases_once() {
    with_fake_backend(|fake| {
        let joystick = Joystick::open(0).unwrap();
        let cursor = Cursor::system(SystemCursor::HAND).unwrap();
        let handles = [joystick.handle().unwrap(), cursor.handle().unwrap()];
        assert_eq!(cursor.system_id(), SystemCursor::HAND);

        drop(joystick);
        drop(cursor);

        for handle in handles {
            assert_eq!(fake.close_count(handle), 1);
        }
        assert_eq!(fake.live_objects(), 0);
        assert_eq!(fake.invalid_releases(), 0);
    });
}

pub(crate) fn test_use_after_release_makes_no_native_calls() {
    with_fake_backend(|fake| {
        let window = Window::open("released", 0, 0, 320, 240, 0).unwrap();
        let renderer = Renderer::create(&window, -1, 0).unwrap();
        let texture = Texture::create(&renderer, FORMAT_RGBA8888, 0, 16, 16).unwrap();
        let cursor = Cursor::system(SystemCursor::ARROW).unwrap();
        let joystick = Joystick::open(0).unwrap();
        let controller = GameController::open(1).unwrap();
        let haptic = Haptic::open(0).unwrap();
        let audio = AudioDevice::open(None, true, AudioSpec::default()).unwrap();
        let timer = Timer::start(1000, |_, interval| interval).unwrap();
        let stream = IoStream::new(std::io::Cursor::new(Vec::<u8>::new())).unwrap();

        window.dispose();
        cursor.dispose();
        joystick.dispose();
        controller.dispose();
        haptic.dispose();
        audio.dispose();
        timer.dispose();
        stream.dispose();

        // The renderer and texture went down with their window.
        assert!(renderer.is_disposed());
        assert!(texture.is_disposed());

        let calls = fake.native_calls();

        assert_use_after_release(window.set_title("gone"), ObjectKind::Window);
        assert_use_after_release(window.size(), ObjectKind::Window);
        assert_use_after_release(window.id(), ObjectKind::Window);
        assert_use_after_release(window.set_hit_test(|_, _| native_bridge::HitTest::Draggable), ObjectKind::Window);
        assert_use_after_release(window.on_event(|_, _| {}), ObjectKind::Window);
        assert_use_after_release(renderer.clear(), ObjectKind::Renderer);
        assert_use_after_release(renderer.present(), ObjectKind::Renderer);
        assert_use_after_release(renderer.set_draw_color(0, 0, 0, 255), ObjectKind::Renderer);
        assert_use_after_release(renderer.copy(&texture), ObjectKind::Texture);
        assert_use_after_release(texture.info(), ObjectKind::Texture);
        assert_use_after_release(cursor.activate(), ObjectKind::Cursor);
        assert_use_after_release(joystick.name(), ObjectKind::Joystick);
        assert_use_after_release(joystick.rumble(1, 1, 10), ObjectKind::Joystick);
        assert_use_after_release(controller.instance_id(), ObjectKind::GameController);
        assert_use_after_release(controller.rumble(1, 1, 10), ObjectKind::GameController);
        assert_use_after_release(haptic.rumble_init(), ObjectKind::Haptic);
        assert_use_after_release(haptic.rumble_play(0.5, 10), ObjectKind::Haptic);
        assert_use_after_release(audio.pause(), ObjectKind::AudioDevice);
        assert_use_after_release(audio.resume(), ObjectKind::AudioDevice);
        assert_use_after_release(timer.id(), ObjectKind::Timer);
        assert_use_after_release(stream.as_raw(), ObjectKind::IoStream);

        assert_eq!(fake.native_calls(), calls);
        assert!(Renderer::create(&window, -1, 0).unwrap_err().is_use_after_release());
        assert!(Texture::create(&renderer, FORMAT_RGBA8888, 0, 1, 1).unwrap_err().is_use_after_release());
        assert_eq!(fake.invalid_releases(), 0);
        assert_eq!(fake.live_timers(), 0);
        assert_eq!(fake.live_ios(), 0);
    });
}

pub(crate) fn test_construction_failure_registers_nothing() {
    with_fake_backend(|fake| {
        fake.fail_next_open("no display");
        let err = Window::open("nothing", 0, 0, 320, 240, 0).unwrap_err();
        assert_eq!(
            err,
            Error::ConstructionFailure {
                kind: ObjectKind::Window,
                message: "no display".to_string(),
            }
        );
        assert_eq!(err.to_string(), "failed to create window: no display");

        // An empty native message still fails, with a generic text.
        fake.fail_next_open("");
        match Joystick::open(3) {
            Err(Error::ConstructionFailure { kind, message }) => {
                assert_eq!(kind, ObjectKind::Joystick);
                assert!(!message.is_empty());
            }
            other => panic!("expected construction failure, got {other:?}"),
        }
    });
    for (kind, live) in live_counts() {
        assert_eq!(live, 0, "{kind} wrappers still registered");
    }
}

pub(crate) fn test_window_releases_renderers_first() {
    with_fake_backend(|fake| {
        let window = Window::open("owner", 0, 0, 320, 240, 0).unwrap();
        let renderer = Renderer::create(&window, -1, 0).unwrap();
        let texture = Texture::create(&renderer, FORMAT_RGBA8888, 0, 64, 64).unwrap();
        let window_handle = window.handle().unwrap();
        let renderer_handle = renderer.handle().unwrap();
        assert_eq!(window.renderer_count(), 1);
        assert_eq!(renderer.texture_count(), 1);
        assert!(renderer.window().same_object(&window));

        window.dispose();

        assert_eq!(
            fake.closes(),
            vec![
                (ObjectKind::Renderer, renderer_handle),
                (ObjectKind::Window, window_handle),
            ]
        );
        assert_eq!(fake.implicit_frees(), 1);
        assert!(renderer.is_disposed());
        assert!(texture.is_disposed());

        // Nothing is released a second time once the wrappers go away.
        drop(texture);
        drop(renderer);
        drop(window);
        assert_eq!(fake.closes().len(), 2);
        assert_eq!(fake.invalid_releases(), 0);
        assert_eq!(fake.live_objects(), 0);
    });
}

pub(crate) fn test_texture_disposed_before_renderer() {
    with_fake_backend(|fake| {
        let window = Window::open("textures", 0, 0, 320, 240, 0).unwrap();
        let renderer = Renderer::create(&window, -1, 0).unwrap();
        let kept = Texture::create(&renderer, FORMAT_RGBA8888, 0, 8, 8).unwrap();
        let disposed = Texture::create(&renderer, FORMAT_RGBA8888, 0, 8, 8).unwrap();
        assert_eq!(renderer.texture_count(), 2);

        assert!(disposed.dispose());
        assert_eq!(fake.closes_of(ObjectKind::Texture), 1);
        assert!(!kept.is_disposed());

        renderer.dispose();
        assert!(kept.is_disposed());
        assert_eq!(fake.closes_of(ObjectKind::Texture), 1);
        assert_eq!(fake.implicit_frees(), 1);
        assert!(!window.is_disposed());

        drop(kept);
        drop(disposed);
        window.dispose();
        assert_eq!(fake.invalid_releases(), 0);
        assert_eq!(fake.live_objects(), 0);
    });
}

pub(crate) fn test_texture_info_is_cached() {
    with_fake_backend(|_fake| {
        let window = Window::open("info", 0, 0, 320, 240, 0).unwrap();
        let renderer = Renderer::create(&window, -1, 0).unwrap();
        let texture = Texture::create(&renderer, FORMAT_RGBA8888, 2, 64, 32).unwrap();

        assert_eq!(
            texture.info().unwrap(),
            TextureInfo {
                format: FORMAT_RGBA8888,
                access: 2,
                width: 64,
                height: 32,
            }
        );
        assert!(texture.renderer().same_object(&renderer));

        texture.dispose();
        assert!(texture.info().unwrap_err().is_use_after_release());
    });
}

pub(crate) fn test_generic_open() {
    with_fake_backend(|fake| {
        let window = open(&OpenRequest::Window {
            title: c"generic",
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            flags: 0,
        })
        .unwrap();
        assert_eq!(window.kind(), ObjectKind::Window);
        let window_handle = window.handle().unwrap();
        assert_eq!(fake.window_title(window_handle).as_deref(), Some("generic"));

        let renderer = open(&OpenRequest::Renderer {
            window: window_handle,
            index: -1,
            flags: 0,
        })
        .unwrap();
        assert!(matches!(renderer, AnyObject::Renderer(_)));

        let missing = NativeHandle::from_raw(0xdead_0000);
        let err = open(&OpenRequest::Renderer {
            window: missing,
            index: -1,
            flags: 0,
        })
        .unwrap_err();
        assert!(matches!(err, Error::LookupMiss { kind: ObjectKind::Window, .. }));

        let audio = open(&OpenRequest::AudioDevice {
            device: None,
            capture: false,
            spec: AudioSpec::default(),
        })
        .unwrap();
        assert_eq!(audio.kind(), ObjectKind::AudioDevice);

        assert!(window.dispose());
        assert!(renderer.is_disposed());
        assert!(window.clone().into_window().unwrap().is_disposed());
        assert!(audio.dispose());
        assert_eq!(fake.live_objects(), 0);
    });
}

pub(crate) fn test_forwarded_calls_reach_native() {
    with_fake_backend(|fake| {
        let window = Window::open("before", 0, 0, 640, 480, 0).unwrap();
        let handle = window.handle().unwrap();

        window.set_title("after").unwrap();
        assert_eq!(fake.window_title(handle).as_deref(), Some("after"));
        assert_eq!(window.size().unwrap(), (640, 480));
        assert!(matches!(window.set_title("nul\0byte"), Err(Error::InvalidArgument(_))));

        let renderer = Renderer::create(&window, -1, 0).unwrap();
        let texture = Texture::create(&renderer, FORMAT_RGBA8888, 0, 4, 4).unwrap();
        renderer.set_draw_color(10, 20, 30, 255).unwrap();
        renderer.clear().unwrap();
        renderer.copy(&texture).unwrap();
        renderer.present().unwrap();

        let haptic = Haptic::open(0).unwrap();
        assert!(matches!(haptic.rumble_play(0.5, 100), Err(Error::InvalidArgument(_))));
        haptic.rumble_init().unwrap();
        haptic.rumble_play(2.0, 100).unwrap();

        let joystick = Joystick::open(0).unwrap();
        assert!(joystick.name().unwrap().is_some());
        joystick.rumble(0xffff, 0, 250).unwrap();

        let audio = AudioDevice::open(Some("speakers"), false, AudioSpec::default()).unwrap();
        assert!(!audio.is_capture());
        audio.resume().unwrap();
        audio.pause().unwrap();

        // set_title, size, draw color, clear, copy, present, rumble init and
        // play, name, rumble, resume, pause
        assert_eq!(fake.native_calls(), 12);
    });
}
