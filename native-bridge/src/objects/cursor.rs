use crate::error::Result;
use crate::handle::ObjectKind;
use crate::lifecycle::{NativeObject, Slot, Wrapper, adopt};
use crate::native::OpenRequest;
use crate::registry::{HandleRegistry, Registry};
use crate::runtime;

pub(crate) static CURSORS: HandleRegistry<Slot<CursorState>> = Registry::new(ObjectKind::Cursor);

pub type Cursor = Wrapper<CursorState>;

/// Native system cursor id (arrow, I-beam, wait, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemCursor(pub u32);

impl SystemCursor {
    pub const ARROW: SystemCursor = SystemCursor(0);
    pub const IBEAM: SystemCursor = SystemCursor(1);
    pub const WAIT: SystemCursor = SystemCursor(2);
    pub const CROSSHAIR: SystemCursor = SystemCursor(3);
    pub const HAND: SystemCursor = SystemCursor(11);
}

pub struct CursorState {
    system: SystemCursor,
}

impl NativeObject for CursorState {
    const KIND: ObjectKind = ObjectKind::Cursor;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &CURSORS
    }

    fn destroy(slot: &Slot<Self>) {
        slot.backend().close(Self::KIND, slot.raw_handle());
    }
}

impl Wrapper<CursorState> {
    pub fn system(system: SystemCursor) -> Result<Cursor> {
        let backend = runtime::backend_for_open()?;
        let handle = backend.open(&OpenRequest::Cursor { system: system.0 });
        adopt(backend, handle, |_, _| CursorState { system })
    }

    pub fn system_id(&self) -> SystemCursor {
        self.state().system
    }

    /// Make this the active cursor.
    pub fn activate(&self) -> Result<()> {
        self.with_live(|backend, handle| backend.set_cursor(handle))
    }
}
