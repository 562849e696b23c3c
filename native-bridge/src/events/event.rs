//! Decoded events and their routing keys.

/// One decoded native event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Milliseconds since the native library was initialized.
    pub timestamp: u32,
    pub kind: EventKind,
}

impl Event {
    pub fn new(timestamp: u32, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    /// Where the demultiplexer delivers this event.
    pub fn route(&self) -> Route {
        use EventKind::*;

        match &self.kind {
            Quit | LocaleChanged | Unknown { .. } => Route::Global,
            Window { window_id, .. }
            | Key { window_id, .. }
            | TextInput { window_id, .. }
            | MouseMotion { window_id, .. }
            | MouseButton { window_id, .. }
            | MouseWheel { window_id, .. } => Route::Window(*window_id),
            JoyAxis { which, .. }
            | JoyHat { which, .. }
            | JoyButton { which, .. }
            | JoyDeviceRemoved { which } => Route::Joystick(*which as u32),
            ControllerAxis { which, .. }
            | ControllerButton { which, .. }
            | ControllerDeviceRemoved { which }
            | ControllerDeviceRemapped { which } => Route::Controller(*which as u32),
            JoyDeviceAdded { .. } | ControllerDeviceAdded { .. } | AudioDeviceAdded { .. } => {
                Route::DeviceAdded
            }
            Finger { touch_id, .. } => Route::Touch(*touch_id),
            AudioDeviceRemoved { device, .. } => Route::AudioDevice(*device),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    Quit,
    LocaleChanged,
    Window {
        window_id: u32,
        event: WindowEvent,
    },
    Key {
        window_id: u32,
        pressed: bool,
        repeat: bool,
        scancode: u32,
        keycode: i32,
        modifiers: u16,
    },
    TextInput {
        window_id: u32,
        text: String,
    },
    MouseMotion {
        window_id: u32,
        which: u32,
        state: u32,
        x: i32,
        y: i32,
        xrel: i32,
        yrel: i32,
    },
    MouseButton {
        window_id: u32,
        which: u32,
        button: u8,
        pressed: bool,
        clicks: u8,
        x: i32,
        y: i32,
    },
    MouseWheel {
        window_id: u32,
        which: u32,
        x: i32,
        y: i32,
        flipped: bool,
    },
    JoyAxis {
        which: i32,
        axis: u8,
        value: i16,
    },
    JoyHat {
        which: i32,
        hat: u8,
        value: u8,
    },
    JoyButton {
        which: i32,
        button: u8,
        pressed: bool,
    },
    /// Announces a device index, not an instance id: nothing is open for it yet.
    JoyDeviceAdded {
        device_index: i32,
    },
    JoyDeviceRemoved {
        which: i32,
    },
    ControllerAxis {
        which: i32,
        axis: u8,
        value: i16,
    },
    ControllerButton {
        which: i32,
        button: u8,
        pressed: bool,
    },
    ControllerDeviceAdded {
        device_index: i32,
    },
    ControllerDeviceRemoved {
        which: i32,
    },
    ControllerDeviceRemapped {
        which: i32,
    },
    Finger {
        phase: FingerPhase,
        touch_id: i64,
        finger_id: i64,
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        pressure: f32,
        window_id: u32,
    },
    AudioDeviceAdded {
        index: u32,
        capture: bool,
    },
    AudioDeviceRemoved {
        device: u32,
        capture: bool,
    },
    /// A tag this bridge does not decode. Delivered to the global handler.
    Unknown {
        tag: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FingerPhase {
    Down,
    Up,
    Motion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    Shown,
    Hidden,
    Exposed,
    Moved { x: i32, y: i32 },
    Resized { width: i32, height: i32 },
    SizeChanged { width: i32, height: i32 },
    Minimized,
    Maximized,
    Restored,
    Enter,
    Leave,
    FocusGained,
    FocusLost,
    Close,
    TakeFocus,
    HitTest,
    Other { code: u8, data1: i32, data2: i32 },
}

impl WindowEvent {
    pub fn from_raw(code: u8, data1: i32, data2: i32) -> Self {
        match code {
            1 => WindowEvent::Shown,
            2 => WindowEvent::Hidden,
            3 => WindowEvent::Exposed,
            4 => WindowEvent::Moved { x: data1, y: data2 },
            5 => WindowEvent::Resized {
                width: data1,
                height: data2,
            },
            6 => WindowEvent::SizeChanged {
                width: data1,
                height: data2,
            },
            7 => WindowEvent::Minimized,
            8 => WindowEvent::Maximized,
            9 => WindowEvent::Restored,
            10 => WindowEvent::Enter,
            11 => WindowEvent::Leave,
            12 => WindowEvent::FocusGained,
            13 => WindowEvent::FocusLost,
            14 => WindowEvent::Close,
            15 => WindowEvent::TakeFocus,
            16 => WindowEvent::HitTest,
            code => WindowEvent::Other { code, data1, data2 },
        }
    }

    pub fn to_raw(self) -> (u8, i32, i32) {
        match self {
            WindowEvent::Shown => (1, 0, 0),
            WindowEvent::Hidden => (2, 0, 0),
            WindowEvent::Exposed => (3, 0, 0),
            WindowEvent::Moved { x, y } => (4, x, y),
            WindowEvent::Resized { width, height } => (5, width, height),
            WindowEvent::SizeChanged { width, height } => (6, width, height),
            WindowEvent::Minimized => (7, 0, 0),
            WindowEvent::Maximized => (8, 0, 0),
            WindowEvent::Restored => (9, 0, 0),
            WindowEvent::Enter => (10, 0, 0),
            WindowEvent::Leave => (11, 0, 0),
            WindowEvent::FocusGained => (12, 0, 0),
            WindowEvent::FocusLost => (13, 0, 0),
            WindowEvent::Close => (14, 0, 0),
            WindowEvent::TakeFocus => (15, 0, 0),
            WindowEvent::HitTest => (16, 0, 0),
            WindowEvent::Other { code, data1, data2 } => (code, data1, data2),
        }
    }
}

/// Routing key of an event: the handler family plus the id that selects
/// one target within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Global,
    Window(u32),
    Joystick(u32),
    Controller(u32),
    Touch(i64),
    AudioDevice(u32),
    DeviceAdded,
}

impl Route {
    pub fn family(self) -> RouteFamily {
        match self {
            Route::Global => RouteFamily::Global,
            Route::Window(_) => RouteFamily::Window,
            Route::Joystick(_) => RouteFamily::Joystick,
            Route::Controller(_) => RouteFamily::Controller,
            Route::Touch(_) => RouteFamily::Touch,
            Route::AudioDevice(_) => RouteFamily::AudioDevice,
            Route::DeviceAdded => RouteFamily::DeviceAdded,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteFamily {
    Global,
    Window,
    Joystick,
    Controller,
    Touch,
    AudioDevice,
    DeviceAdded,
}
