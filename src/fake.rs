//! A simulated native library.
//!
//! `FakeBackend` behaves like the real library where the bridge depends on
//! it: handles are recycled most-recently-freed first, destroying a renderer
//! frees its textures, a timer whose callback returns 0 is dropped, joystick,
//! controller and haptic opens are reference counted per device index, and
//! the error channel holds one message. It also counts every native call so tests
//! can check that released wrappers never reach it, and exposes "native-side"
//! helpers that invoke stored callbacks the way the library would.

use std::collections::{BTreeMap, VecDeque};
use std::ffi::{CString, c_int, c_void};

use native_bridge::events::{Event, RawEvent};
use native_bridge::native::{
    HitTestFn, LogOutputFn, NativeBackend, OpenRequest, RawIo, RawPoint, TextureInfo, TimerFn,
};
use native_bridge::{NativeHandle, ObjectKind};
use parking_lot::Mutex;

/// First pointer-like handle handed out.
pub const FIRST_HANDLE: usize = 0x1000;
const HANDLE_STRIDE: usize = 0x100;

#[derive(Clone, Copy, Debug)]
struct FakeObject {
    kind: ObjectKind,
    /// Window id, joystick instance id, or audio device id.
    id: u32,
    parent: Option<NativeHandle>,
    texture: TextureInfo,
    /// Device index of a reference-counted device open.
    device_index: Option<i32>,
    refs: u32,
}

#[derive(Clone, Copy)]
struct FakeTimer {
    callback: TimerFn,
    param: usize,
    interval: u32,
}

#[derive(Default)]
struct State {
    next_handle: usize,
    free_handles: Vec<usize>,
    next_instance_id: u32,
    next_audio_id: u32,
    free_audio_ids: Vec<u32>,
    next_timer_id: i32,
    free_timer_ids: Vec<i32>,
    objects: BTreeMap<NativeHandle, FakeObject>,
    events: VecDeque<RawEvent>,
    error: Option<String>,
    fail_next_open: Option<String>,
    reissue_next_open: Option<NativeHandle>,
    next_object_id: Option<u32>,
    log_output: Option<(LogOutputFn, usize)>,
    hit_tests: BTreeMap<NativeHandle, HitTestFn>,
    timers: BTreeMap<i32, FakeTimer>,
    ios: Vec<usize>,
    native_calls: usize,
    closes: Vec<(ObjectKind, NativeHandle)>,
    implicit_frees: usize,
    invalid_releases: usize,
    ios_freed: usize,
    window_titles: BTreeMap<NativeHandle, String>,
}

pub struct FakeBackend {
    state: Mutex<State>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_handle: FIRST_HANDLE,
                next_audio_id: 2,
                next_timer_id: 1,
                ..State::default()
            }),
        }
    }

    fn alloc_handle(state: &mut State) -> NativeHandle {
        let raw = state.free_handles.pop().unwrap_or_else(|| {
            let raw = state.next_handle;
            state.next_handle += HANDLE_STRIDE;
            raw
        });
        NativeHandle::from_raw(raw)
    }

    fn free_handle(state: &mut State, kind: ObjectKind, handle: NativeHandle) {
        if kind == ObjectKind::AudioDevice {
            state.free_audio_ids.push(handle.as_raw() as u32);
        } else {
            state.free_handles.push(handle.as_raw());
        }
    }

    // ---- test controls -------------------------------------------------

    /// Make the next open primitive fail with `message`.
    pub fn fail_next_open(&self, message: &str) {
        self.state.lock().fail_next_open = Some(message.to_string());
    }

    /// Make the next open primitive return `handle` without creating
    /// anything, like a library that hands out a handle it still owns.
    pub fn reissue_next_open(&self, handle: NativeHandle) {
        self.state.lock().reissue_next_open = Some(handle);
    }

    /// Give the next window, joystick or controller this id instead of the
    /// one the library would pick.
    pub fn set_next_object_id(&self, id: u32) {
        self.state.lock().next_object_id = Some(id);
    }

    /// Queue an event as the native library would.
    pub fn push_event(&self, event: &Event) {
        self.push_raw(RawEvent::encode(event));
    }

    pub fn push_raw(&self, raw: RawEvent) {
        self.state.lock().events.push_back(raw);
    }

    pub fn queued_events(&self) -> usize {
        self.state.lock().events.len()
    }

    /// The error channel's message, without clearing it.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    /// Forwarded calls that reached the library (title, size, render, rumble, ...).
    pub fn native_calls(&self) -> usize {
        self.state.lock().native_calls
    }

    /// How many times the destroy primitive ran for `handle`.
    pub fn close_count(&self, handle: NativeHandle) -> usize {
        self.state
            .lock()
            .closes
            .iter()
            .filter(|(_, closed)| *closed == handle)
            .count()
    }

    pub fn closes_of(&self, kind: ObjectKind) -> usize {
        self.state
            .lock()
            .closes
            .iter()
            .filter(|(closed_kind, _)| *closed_kind == kind)
            .count()
    }

    /// Every destroy call, in order.
    pub fn closes(&self) -> Vec<(ObjectKind, NativeHandle)> {
        self.state.lock().closes.clone()
    }

    /// Objects freed by their parent's destroy, not their own.
    pub fn implicit_frees(&self) -> usize {
        self.state.lock().implicit_frees
    }

    /// Destroy or remove calls for handles that were not alive: a double
    /// release as seen from the native side.
    pub fn invalid_releases(&self) -> usize {
        self.state.lock().invalid_releases
    }

    pub fn live_objects(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn is_alive(&self, handle: NativeHandle) -> bool {
        self.state.lock().objects.contains_key(&handle)
    }

    pub fn live_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    pub fn live_ios(&self) -> usize {
        self.state.lock().ios.len()
    }

    pub fn ios_freed(&self) -> usize {
        self.state.lock().ios_freed
    }

    pub fn window_title(&self, window: NativeHandle) -> Option<String> {
        self.state.lock().window_titles.get(&window).cloned()
    }

    pub fn has_log_output(&self) -> bool {
        self.state.lock().log_output.is_some()
    }

    pub fn has_hit_test(&self, window: NativeHandle) -> bool {
        self.state.lock().hit_tests.contains_key(&window)
    }

    // ---- native-side invocations ---------------------------------------

    /// Write a log line through the installed log output, if any.
    pub fn emit_log(&self, category: c_int, priority: c_int, message: &str) -> bool {
        let sink = self.state.lock().log_output;
        let Some((callback, userdata)) = sink else {
            return false;
        };
        let Ok(message) = CString::new(message) else {
            return false;
        };
        // SAFETY: the string outlives the call, as the library guarantees.
        unsafe { callback(userdata as *mut c_void, category, priority, message.as_ptr()) };
        true
    }

    /// Hit-test `window` at `point` through its registered callback.
    pub fn hit_test(&self, window: NativeHandle, point: RawPoint) -> Option<c_int> {
        let callback = self.state.lock().hit_tests.get(&window).copied()?;
        // SAFETY: the point lives for the duration of the call.
        Some(unsafe { callback(window.as_ptr(), &point, std::ptr::null_mut()) })
    }

    /// Expire timer `id` once. A returned 0 drops the timer, like the real
    /// library does.
    pub fn fire_timer(&self, id: i32) -> Option<u32> {
        let timer = self.state.lock().timers.get(&id).copied()?;
        // SAFETY: `param` is the value the timer was added with.
        let next = unsafe { (timer.callback)(timer.interval, timer.param as *mut c_void) };
        let mut state = self.state.lock();
        if next == 0 {
            if state.timers.remove(&id).is_some() {
                state.free_timer_ids.push(id);
            }
        } else if let Some(timer) = state.timers.get_mut(&id) {
            timer.interval = next;
        }
        Some(next)
    }

    /// Call a timer callback with an arbitrary context token, as a confused
    /// library would.
    pub fn fire_timer_with_param(&self, callback: TimerFn, param: usize) -> u32 {
        // SAFETY: the trampoline treats `param` as an opaque token.
        unsafe { callback(0, param as *mut c_void) }
    }

    pub fn timer_ids(&self) -> Vec<i32> {
        self.state.lock().timers.keys().copied().collect()
    }

    /// Read up to `count` elements of `size` bytes through the I/O object's
    /// read slot.
    pub fn io_read(&self, io: *mut RawIo, size: usize, count: usize) -> (usize, Vec<u8>) {
        let mut buf = vec![0u8; size.saturating_mul(count)];
        // SAFETY: `io` is a live object allocated by this backend.
        let Some(read) = (unsafe { (*io).read }) else {
            return (0, Vec::new());
        };
        // SAFETY: `buf` covers `size * count` bytes.
        let objects = unsafe { read(io, buf.as_mut_ptr().cast(), size, count) };
        buf.truncate(objects * size);
        (objects, buf)
    }

    pub fn io_write(&self, io: *mut RawIo, data: &[u8], size: usize) -> usize {
        let count = if size == 0 { 0 } else { data.len() / size };
        // SAFETY: `io` is a live object allocated by this backend.
        let Some(write) = (unsafe { (*io).write }) else {
            return 0;
        };
        // SAFETY: `data` covers `size * count` bytes.
        unsafe { write(io, data.as_ptr().cast(), size, count) }
    }

    pub fn io_seek(&self, io: *mut RawIo, offset: i64, whence: c_int) -> i64 {
        // SAFETY: `io` is a live object allocated by this backend.
        match unsafe { (*io).seek } {
            // SAFETY: as above.
            Some(seek) => unsafe { seek(io, offset, whence) },
            None => -1,
        }
    }

    pub fn io_size(&self, io: *mut RawIo) -> i64 {
        // SAFETY: `io` is a live object allocated by this backend.
        match unsafe { (*io).size } {
            // SAFETY: as above.
            Some(size) => unsafe { size(io) },
            None => -1,
        }
    }

    /// Close the I/O object through its close slot. The object is freed by
    /// the time this returns.
    pub fn io_close(&self, io: *mut RawIo) -> c_int {
        // SAFETY: `io` is a live object allocated by this backend.
        match unsafe { (*io).close } {
            // SAFETY: as above.
            Some(close) => unsafe { close(io) },
            None => -1,
        }
    }

    fn count_call(&self) {
        self.state.lock().native_calls += 1;
    }
}

impl NativeBackend for FakeBackend {
    fn open(&self, request: &OpenRequest<'_>) -> NativeHandle {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next_open.take() {
            state.error = Some(message);
            return NativeHandle::NULL;
        }
        if let Some(handle) = state.reissue_next_open.take() {
            return handle;
        }

        let kind = request.kind();
        let device_index = match *request {
            OpenRequest::Joystick { device_index }
            | OpenRequest::GameController { device_index }
            | OpenRequest::Haptic { device_index } => Some(device_index),
            _ => None,
        };
        if device_index.is_some() {
            let open = state
                .objects
                .iter_mut()
                .find(|(_, object)| object.kind == kind && object.device_index == device_index);
            if let Some((handle, object)) = open {
                object.refs += 1;
                return *handle;
            }
        }
        let (handle, id, parent) = match *request {
            OpenRequest::AudioDevice { .. } => {
                let id = state.free_audio_ids.pop().unwrap_or_else(|| {
                    let id = state.next_audio_id;
                    state.next_audio_id += 1;
                    id
                });
                (NativeHandle::from_id(id), id, None)
            }
            OpenRequest::Renderer { window, .. } => {
                if !state.objects.contains_key(&window) {
                    state.error = Some("invalid window".to_string());
                    return NativeHandle::NULL;
                }
                (Self::alloc_handle(&mut state), 0, Some(window))
            }
            OpenRequest::Texture { renderer, .. } => {
                if !state.objects.contains_key(&renderer) {
                    state.error = Some("invalid renderer".to_string());
                    return NativeHandle::NULL;
                }
                (Self::alloc_handle(&mut state), 0, Some(renderer))
            }
            OpenRequest::Joystick { .. } | OpenRequest::GameController { .. } => {
                let id = state.next_object_id.take().unwrap_or_else(|| {
                    let id = state.next_instance_id;
                    state.next_instance_id += 1;
                    id
                });
                (Self::alloc_handle(&mut state), id, None)
            }
            OpenRequest::Window { .. } => {
                let handle = Self::alloc_handle(&mut state);
                // Window ids follow the handle, so a recycled handle also
                // recycles its window id.
                let id = state
                    .next_object_id
                    .take()
                    .unwrap_or(handle.as_raw() as u32);
                (handle, id, None)
            }
            _ => (Self::alloc_handle(&mut state), 0, None),
        };

        let texture = match *request {
            OpenRequest::Texture {
                format,
                access,
                width,
                height,
                ..
            } => TextureInfo {
                format,
                access,
                width,
                height,
            },
            _ => TextureInfo::default(),
        };
        if let OpenRequest::Window { title, .. } = *request {
            state
                .window_titles
                .insert(handle, title.to_string_lossy().into_owned());
        }
        state.objects.insert(
            handle,
            FakeObject {
                kind,
                id,
                parent,
                texture,
                device_index,
                refs: 1,
            },
        );
        handle
    }

    fn close(&self, kind: ObjectKind, handle: NativeHandle) {
        let mut state = self.state.lock();
        state.closes.push((kind, handle));
        match state.objects.get(&handle) {
            Some(object) if object.kind == kind => {}
            _ => {
                state.invalid_releases += 1;
                return;
            }
        }
        if let Some(object) = state.objects.get_mut(&handle).filter(|object| object.refs > 1) {
            object.refs -= 1;
            return;
        }
        state.objects.remove(&handle);
        state.hit_tests.remove(&handle);
        state.window_titles.remove(&handle);
        Self::free_handle(&mut state, kind, handle);

        if kind == ObjectKind::Renderer {
            let textures: Vec<NativeHandle> = state
                .objects
                .iter()
                .filter(|(_, object)| object.parent == Some(handle))
                .map(|(texture, _)| *texture)
                .collect();
            for texture in textures {
                state.objects.remove(&texture);
                state.implicit_frees += 1;
                Self::free_handle(&mut state, ObjectKind::Texture, texture);
            }
        }
    }

    fn object_id(&self, _kind: ObjectKind, handle: NativeHandle) -> u32 {
        self.state
            .lock()
            .objects
            .get(&handle)
            .map(|object| object.id)
            .unwrap_or(0)
    }

    fn poll_event(&self) -> Option<RawEvent> {
        self.state.lock().events.pop_front()
    }

    fn set_error(&self, message: &str) {
        self.state.lock().error = Some(message.to_string());
    }

    fn take_error(&self) -> Option<String> {
        self.state.lock().error.take()
    }

    fn set_log_output(&self, callback: Option<LogOutputFn>, userdata: *mut c_void) {
        self.state.lock().log_output = callback.map(|callback| (callback, userdata as usize));
    }

    fn set_hit_test(&self, window: NativeHandle, callback: Option<HitTestFn>, _data: *mut c_void) -> c_int {
        let mut state = self.state.lock();
        if !state.objects.contains_key(&window) {
            state.error = Some("invalid window".to_string());
            return -1;
        }
        match callback {
            Some(callback) => state.hit_tests.insert(window, callback),
            None => state.hit_tests.remove(&window),
        };
        0
    }

    fn add_timer(&self, interval_ms: u32, callback: TimerFn, param: *mut c_void) -> i32 {
        let mut state = self.state.lock();
        let id = state.free_timer_ids.pop().unwrap_or_else(|| {
            let id = state.next_timer_id;
            state.next_timer_id += 1;
            id
        });
        state.timers.insert(
            id,
            FakeTimer {
                callback,
                param: param as usize,
                interval: interval_ms,
            },
        );
        id
    }

    fn remove_timer(&self, id: i32) -> bool {
        let mut state = self.state.lock();
        if state.timers.remove(&id).is_some() {
            state.free_timer_ids.push(id);
            true
        } else {
            state.invalid_releases += 1;
            false
        }
    }

    fn alloc_io(&self) -> *mut RawIo {
        let io = Box::into_raw(Box::new(RawIo::empty()));
        self.state.lock().ios.push(io as usize);
        io
    }

    fn free_io(&self, io: *mut RawIo) {
        let mut state = self.state.lock();
        let Some(position) = state.ios.iter().position(|live| *live == io as usize) else {
            state.invalid_releases += 1;
            return;
        };
        state.ios.swap_remove(position);
        state.ios_freed += 1;
        drop(state);
        // SAFETY: allocated by `alloc_io` and removed from the live list
        // above, so this is the only free.
        drop(unsafe { Box::from_raw(io) });
    }

    fn set_window_title(&self, window: NativeHandle, title: &std::ffi::CStr) {
        let mut state = self.state.lock();
        state.native_calls += 1;
        state
            .window_titles
            .insert(window, title.to_string_lossy().into_owned());
    }

    fn window_size(&self, _window: NativeHandle) -> (i32, i32) {
        self.count_call();
        (640, 480)
    }

    fn render_clear(&self, _renderer: NativeHandle) -> c_int {
        self.count_call();
        0
    }

    fn render_present(&self, _renderer: NativeHandle) {
        self.count_call();
    }

    fn set_render_draw_color(&self, _renderer: NativeHandle, _r: u8, _g: u8, _b: u8, _a: u8) -> c_int {
        self.count_call();
        0
    }

    fn render_copy(&self, _renderer: NativeHandle, texture: NativeHandle) -> c_int {
        let mut state = self.state.lock();
        state.native_calls += 1;
        if state.objects.contains_key(&texture) {
            0
        } else {
            state.error = Some("invalid texture".to_string());
            -1
        }
    }

    fn query_texture(&self, texture: NativeHandle) -> TextureInfo {
        self.state
            .lock()
            .objects
            .get(&texture)
            .map(|object| object.texture)
            .unwrap_or_default()
    }

    fn set_cursor(&self, _cursor: NativeHandle) {
        self.count_call();
    }

    fn device_name(&self, kind: ObjectKind, handle: NativeHandle) -> Option<String> {
        self.count_call();
        Some(format!("fake {kind} {handle}"))
    }

    fn rumble(
        &self,
        _kind: ObjectKind,
        _handle: NativeHandle,
        _low_frequency: u16,
        _high_frequency: u16,
        _duration_ms: u32,
    ) -> c_int {
        self.count_call();
        0
    }

    fn haptic_rumble_init(&self, _haptic: NativeHandle) -> c_int {
        self.count_call();
        0
    }

    fn haptic_rumble_play(&self, _haptic: NativeHandle, _strength: f32, _length_ms: u32) -> c_int {
        self.count_call();
        0
    }

    fn pause_audio_device(&self, _device: u32, _pause: bool) {
        self.count_call();
    }
}
