//! The native event record and its decoding.
//!
//! The native queue hands out fixed-size records: a type tag, a timestamp and
//! a payload whose layout depends on the tag. Each record is decoded exactly
//! once, here, into an [`Event`]; nothing past this module looks at raw
//! payload bytes.
//!
//! Payload layout (all little-endian, C layout, no implicit padding):
//!
//! - window: `window_id: u32, event: u8, _: [u8; 3], data1: i32, data2: i32`
//! - key: `window_id: u32, state: u8, repeat: u8, _: [u8; 2], scancode: u32,
//!   keycode: i32, modifiers: u16, _: [u8; 2]`
//! - text input: `window_id: u32, text: [u8; 32]` (NUL-terminated UTF-8)
//! - joystick/controller axis: `which: i32, axis: u8, _: [u8; 3], value: i16, _: [u8; 2]`
//! - finger: `touch_id: i64, finger_id: i64, x, y, dx, dy, pressure: f32, window_id: u32`

use bytemuck::{Pod, Zeroable};

use super::event::{Event, EventKind, FingerPhase, WindowEvent};

/// Size of the payload area of a [`RawEvent`].
pub const RAW_PAYLOAD_LEN: usize = 48;

/// Type tags of native event records.
pub mod tags {
    pub const QUIT: u32 = 0x100;
    pub const LOCALE_CHANGED: u32 = 0x107;
    pub const WINDOW: u32 = 0x200;
    pub const KEY_DOWN: u32 = 0x300;
    pub const KEY_UP: u32 = 0x301;
    pub const TEXT_INPUT: u32 = 0x303;
    pub const MOUSE_MOTION: u32 = 0x400;
    pub const MOUSE_BUTTON_DOWN: u32 = 0x401;
    pub const MOUSE_BUTTON_UP: u32 = 0x402;
    pub const MOUSE_WHEEL: u32 = 0x403;
    pub const JOY_AXIS_MOTION: u32 = 0x600;
    pub const JOY_HAT_MOTION: u32 = 0x602;
    pub const JOY_BUTTON_DOWN: u32 = 0x603;
    pub const JOY_BUTTON_UP: u32 = 0x604;
    pub const JOY_DEVICE_ADDED: u32 = 0x605;
    pub const JOY_DEVICE_REMOVED: u32 = 0x606;
    pub const CONTROLLER_AXIS_MOTION: u32 = 0x650;
    pub const CONTROLLER_BUTTON_DOWN: u32 = 0x651;
    pub const CONTROLLER_BUTTON_UP: u32 = 0x652;
    pub const CONTROLLER_DEVICE_ADDED: u32 = 0x653;
    pub const CONTROLLER_DEVICE_REMOVED: u32 = 0x654;
    pub const CONTROLLER_DEVICE_REMAPPED: u32 = 0x655;
    pub const FINGER_DOWN: u32 = 0x700;
    pub const FINGER_UP: u32 = 0x701;
    pub const FINGER_MOTION: u32 = 0x702;
    pub const AUDIO_DEVICE_ADDED: u32 = 0x1100;
    pub const AUDIO_DEVICE_REMOVED: u32 = 0x1101;
}

/// One record as popped from the native event queue.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct RawEvent {
    pub kind: u32,
    pub timestamp: u32,
    pub payload: [u8; RAW_PAYLOAD_LEN],
}

impl RawEvent {
    pub fn new(kind: u32, timestamp: u32) -> Self {
        Self {
            kind,
            timestamp,
            payload: [0; RAW_PAYLOAD_LEN],
        }
    }

    fn with_payload<P: Pod>(kind: u32, timestamp: u32, payload: &P) -> Self {
        let mut raw = Self::new(kind, timestamp);
        let bytes = bytemuck::bytes_of(payload);
        raw.payload[..bytes.len()].copy_from_slice(bytes);
        raw
    }

    fn read<P: Pod>(&self) -> P {
        bytemuck::pod_read_unaligned(&self.payload[..std::mem::size_of::<P>()])
    }

    /// Decode the record into its tagged form.
    pub fn decode(&self) -> Event {
        use tags::*;

        let kind = match self.kind {
            QUIT => EventKind::Quit,
            LOCALE_CHANGED => EventKind::LocaleChanged,
            WINDOW => {
                let p: RawWindowEvent = self.read();
                EventKind::Window {
                    window_id: p.window_id,
                    event: WindowEvent::from_raw(p.event, p.data1, p.data2),
                }
            }
            KEY_DOWN | KEY_UP => {
                let p: RawKeyEvent = self.read();
                EventKind::Key {
                    window_id: p.window_id,
                    pressed: self.kind == KEY_DOWN,
                    repeat: p.repeat != 0,
                    scancode: p.scancode,
                    keycode: p.keycode,
                    modifiers: p.modifiers,
                }
            }
            TEXT_INPUT => {
                let p: RawTextInputEvent = self.read();
                let len = p.text.iter().position(|&b| b == 0).unwrap_or(p.text.len());
                EventKind::TextInput {
                    window_id: p.window_id,
                    text: String::from_utf8_lossy(&p.text[..len]).into_owned(),
                }
            }
            MOUSE_MOTION => {
                let p: RawMouseMotionEvent = self.read();
                EventKind::MouseMotion {
                    window_id: p.window_id,
                    which: p.which,
                    state: p.state,
                    x: p.x,
                    y: p.y,
                    xrel: p.xrel,
                    yrel: p.yrel,
                }
            }
            MOUSE_BUTTON_DOWN | MOUSE_BUTTON_UP => {
                let p: RawMouseButtonEvent = self.read();
                EventKind::MouseButton {
                    window_id: p.window_id,
                    which: p.which,
                    button: p.button,
                    pressed: self.kind == MOUSE_BUTTON_DOWN,
                    clicks: p.clicks,
                    x: p.x,
                    y: p.y,
                }
            }
            MOUSE_WHEEL => {
                let p: RawMouseWheelEvent = self.read();
                EventKind::MouseWheel {
                    window_id: p.window_id,
                    which: p.which,
                    x: p.x,
                    y: p.y,
                    flipped: p.direction == 1,
                }
            }
            JOY_AXIS_MOTION => {
                let p: RawAxisEvent = self.read();
                EventKind::JoyAxis {
                    which: p.which,
                    axis: p.axis,
                    value: p.value,
                }
            }
            JOY_HAT_MOTION => {
                let p: RawButtonEvent = self.read();
                EventKind::JoyHat {
                    which: p.which,
                    hat: p.index,
                    value: p.state,
                }
            }
            JOY_BUTTON_DOWN | JOY_BUTTON_UP => {
                let p: RawButtonEvent = self.read();
                EventKind::JoyButton {
                    which: p.which,
                    button: p.index,
                    pressed: self.kind == JOY_BUTTON_DOWN,
                }
            }
            JOY_DEVICE_ADDED => EventKind::JoyDeviceAdded {
                device_index: self.read::<RawDeviceEvent>().which,
            },
            JOY_DEVICE_REMOVED => EventKind::JoyDeviceRemoved {
                which: self.read::<RawDeviceEvent>().which,
            },
            CONTROLLER_AXIS_MOTION => {
                let p: RawAxisEvent = self.read();
                EventKind::ControllerAxis {
                    which: p.which,
                    axis: p.axis,
                    value: p.value,
                }
            }
            CONTROLLER_BUTTON_DOWN | CONTROLLER_BUTTON_UP => {
                let p: RawButtonEvent = self.read();
                EventKind::ControllerButton {
                    which: p.which,
                    button: p.index,
                    pressed: self.kind == CONTROLLER_BUTTON_DOWN,
                }
            }
            CONTROLLER_DEVICE_ADDED => EventKind::ControllerDeviceAdded {
                device_index: self.read::<RawDeviceEvent>().which,
            },
            CONTROLLER_DEVICE_REMOVED => EventKind::ControllerDeviceRemoved {
                which: self.read::<RawDeviceEvent>().which,
            },
            CONTROLLER_DEVICE_REMAPPED => EventKind::ControllerDeviceRemapped {
                which: self.read::<RawDeviceEvent>().which,
            },
            FINGER_DOWN | FINGER_UP | FINGER_MOTION => {
                let p: RawFingerEvent = self.read();
                let phase = match self.kind {
                    FINGER_DOWN => FingerPhase::Down,
                    FINGER_UP => FingerPhase::Up,
                    _ => FingerPhase::Motion,
                };
                EventKind::Finger {
                    phase,
                    touch_id: p.touch_id,
                    finger_id: p.finger_id,
                    x: p.x,
                    y: p.y,
                    dx: p.dx,
                    dy: p.dy,
                    pressure: p.pressure,
                    window_id: p.window_id,
                }
            }
            AUDIO_DEVICE_ADDED => {
                let p: RawAudioDeviceEvent = self.read();
                EventKind::AudioDeviceAdded {
                    index: p.which,
                    capture: p.capture != 0,
                }
            }
            AUDIO_DEVICE_REMOVED => {
                let p: RawAudioDeviceEvent = self.read();
                EventKind::AudioDeviceRemoved {
                    device: p.which,
                    capture: p.capture != 0,
                }
            }
            tag => EventKind::Unknown { tag },
        };

        Event {
            timestamp: self.timestamp,
            kind,
        }
    }

    /// Encode an event the way the native library lays it out. Used by
    /// native-side code that pushes synthetic events.
    pub fn encode(event: &Event) -> Self {
        use tags::*;

        let ts = event.timestamp;
        match &event.kind {
            EventKind::Quit => Self::new(QUIT, ts),
            EventKind::LocaleChanged => Self::new(LOCALE_CHANGED, ts),
            EventKind::Window { window_id, event } => {
                let (code, data1, data2) = event.to_raw();
                Self::with_payload(
                    WINDOW,
                    ts,
                    &RawWindowEvent {
                        window_id: *window_id,
                        event: code,
                        _pad: [0; 3],
                        data1,
                        data2,
                    },
                )
            }
            EventKind::Key {
                window_id,
                pressed,
                repeat,
                scancode,
                keycode,
                modifiers,
            } => Self::with_payload(
                if *pressed { KEY_DOWN } else { KEY_UP },
                ts,
                &RawKeyEvent {
                    window_id: *window_id,
                    state: u8::from(*pressed),
                    repeat: u8::from(*repeat),
                    _pad: [0; 2],
                    scancode: *scancode,
                    keycode: *keycode,
                    modifiers: *modifiers,
                    _pad2: [0; 2],
                },
            ),
            EventKind::TextInput { window_id, text } => {
                let mut bytes = [0u8; 32];
                // Keep the terminating NUL.
                let len = text.len().min(bytes.len() - 1);
                bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
                Self::with_payload(
                    TEXT_INPUT,
                    ts,
                    &RawTextInputEvent {
                        window_id: *window_id,
                        text: bytes,
                    },
                )
            }
            EventKind::MouseMotion {
                window_id,
                which,
                state,
                x,
                y,
                xrel,
                yrel,
            } => Self::with_payload(
                MOUSE_MOTION,
                ts,
                &RawMouseMotionEvent {
                    window_id: *window_id,
                    which: *which,
                    state: *state,
                    x: *x,
                    y: *y,
                    xrel: *xrel,
                    yrel: *yrel,
                },
            ),
            EventKind::MouseButton {
                window_id,
                which,
                button,
                pressed,
                clicks,
                x,
                y,
            } => Self::with_payload(
                if *pressed {
                    MOUSE_BUTTON_DOWN
                } else {
                    MOUSE_BUTTON_UP
                },
                ts,
                &RawMouseButtonEvent {
                    window_id: *window_id,
                    which: *which,
                    button: *button,
                    state: u8::from(*pressed),
                    clicks: *clicks,
                    _pad: 0,
                    x: *x,
                    y: *y,
                },
            ),
            EventKind::MouseWheel {
                window_id,
                which,
                x,
                y,
                flipped,
            } => Self::with_payload(
                MOUSE_WHEEL,
                ts,
                &RawMouseWheelEvent {
                    window_id: *window_id,
                    which: *which,
                    x: *x,
                    y: *y,
                    direction: u32::from(*flipped),
                },
            ),
            EventKind::JoyAxis { which, axis, value } => {
                Self::with_payload(JOY_AXIS_MOTION, ts, &RawAxisEvent::new(*which, *axis, *value))
            }
            EventKind::JoyHat { which, hat, value } => {
                Self::with_payload(JOY_HAT_MOTION, ts, &RawButtonEvent::new(*which, *hat, *value))
            }
            EventKind::JoyButton {
                which,
                button,
                pressed,
            } => Self::with_payload(
                if *pressed { JOY_BUTTON_DOWN } else { JOY_BUTTON_UP },
                ts,
                &RawButtonEvent::new(*which, *button, u8::from(*pressed)),
            ),
            EventKind::JoyDeviceAdded { device_index } => {
                Self::with_payload(JOY_DEVICE_ADDED, ts, &RawDeviceEvent { which: *device_index })
            }
            EventKind::JoyDeviceRemoved { which } => {
                Self::with_payload(JOY_DEVICE_REMOVED, ts, &RawDeviceEvent { which: *which })
            }
            EventKind::ControllerAxis { which, axis, value } => Self::with_payload(
                CONTROLLER_AXIS_MOTION,
                ts,
                &RawAxisEvent::new(*which, *axis, *value),
            ),
            EventKind::ControllerButton {
                which,
                button,
                pressed,
            } => Self::with_payload(
                if *pressed {
                    CONTROLLER_BUTTON_DOWN
                } else {
                    CONTROLLER_BUTTON_UP
                },
                ts,
                &RawButtonEvent::new(*which, *button, u8::from(*pressed)),
            ),
            EventKind::ControllerDeviceAdded { device_index } => Self::with_payload(
                CONTROLLER_DEVICE_ADDED,
                ts,
                &RawDeviceEvent {
                    which: *device_index,
                },
            ),
            EventKind::ControllerDeviceRemoved { which } => Self::with_payload(
                CONTROLLER_DEVICE_REMOVED,
                ts,
                &RawDeviceEvent { which: *which },
            ),
            EventKind::ControllerDeviceRemapped { which } => Self::with_payload(
                CONTROLLER_DEVICE_REMAPPED,
                ts,
                &RawDeviceEvent { which: *which },
            ),
            EventKind::Finger {
                phase,
                touch_id,
                finger_id,
                x,
                y,
                dx,
                dy,
                pressure,
                window_id,
            } => Self::with_payload(
                match phase {
                    FingerPhase::Down => FINGER_DOWN,
                    FingerPhase::Up => FINGER_UP,
                    FingerPhase::Motion => FINGER_MOTION,
                },
                ts,
                &RawFingerEvent {
                    touch_id: *touch_id,
                    finger_id: *finger_id,
                    x: *x,
                    y: *y,
                    dx: *dx,
                    dy: *dy,
                    pressure: *pressure,
                    window_id: *window_id,
                },
            ),
            EventKind::AudioDeviceAdded { index, capture } => Self::with_payload(
                AUDIO_DEVICE_ADDED,
                ts,
                &RawAudioDeviceEvent {
                    which: *index,
                    capture: u8::from(*capture),
                    _pad: [0; 3],
                },
            ),
            EventKind::AudioDeviceRemoved { device, capture } => Self::with_payload(
                AUDIO_DEVICE_REMOVED,
                ts,
                &RawAudioDeviceEvent {
                    which: *device,
                    capture: u8::from(*capture),
                    _pad: [0; 3],
                },
            ),
            EventKind::Unknown { tag } => Self::new(*tag, ts),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawWindowEvent {
    window_id: u32,
    event: u8,
    _pad: [u8; 3],
    data1: i32,
    data2: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawKeyEvent {
    window_id: u32,
    state: u8,
    repeat: u8,
    _pad: [u8; 2],
    scancode: u32,
    keycode: i32,
    modifiers: u16,
    _pad2: [u8; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawTextInputEvent {
    window_id: u32,
    text: [u8; 32],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawMouseMotionEvent {
    window_id: u32,
    which: u32,
    state: u32,
    x: i32,
    y: i32,
    xrel: i32,
    yrel: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawMouseButtonEvent {
    window_id: u32,
    which: u32,
    button: u8,
    state: u8,
    clicks: u8,
    _pad: u8,
    x: i32,
    y: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawMouseWheelEvent {
    window_id: u32,
    which: u32,
    x: i32,
    y: i32,
    direction: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawAxisEvent {
    which: i32,
    axis: u8,
    _pad: [u8; 3],
    value: i16,
    _pad2: [u8; 2],
}

impl RawAxisEvent {
    fn new(which: i32, axis: u8, value: i16) -> Self {
        Self {
            which,
            axis,
            _pad: [0; 3],
            value,
            _pad2: [0; 2],
        }
    }
}

/// Shared by joystick buttons, joystick hats and controller buttons.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawButtonEvent {
    which: i32,
    index: u8,
    state: u8,
    _pad: [u8; 2],
}

impl RawButtonEvent {
    fn new(which: i32, index: u8, state: u8) -> Self {
        Self {
            which,
            index,
            state,
            _pad: [0; 2],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawDeviceEvent {
    which: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawFingerEvent {
    touch_id: i64,
    finger_id: i64,
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    pressure: f32,
    window_id: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawAudioDeviceEvent {
    which: u32,
    capture: u8,
    _pad: [u8; 3],
}

const _: () = assert!(std::mem::size_of::<RawEvent>() == 56);
const _: () = assert!(std::mem::size_of::<RawFingerEvent>() <= RAW_PAYLOAD_LEN);
const _: () = assert!(std::mem::size_of::<RawTextInputEvent>() <= RAW_PAYLOAD_LEN);
