//! Renderers, owned by a window and owning their textures.
//!
//! Destroying a renderer natively frees every texture created from it, so a
//! renderer's release only invalidates its textures' wrappers; it never
//! destroys them one by one.

use std::sync::Arc;

use super::native_failure;
use super::texture::{Texture, TextureState};
use super::window::Window;
use crate::error::Result;
use crate::handle::ObjectKind;
use crate::lifecycle::{Children, NativeObject, ReleasePath, Slot, Wrapper, adopt};
use crate::native::OpenRequest;
use crate::registry::{HandleRegistry, Registry};

pub(crate) static RENDERERS: HandleRegistry<Slot<RendererState>> =
    Registry::new(ObjectKind::Renderer);

pub type Renderer = Wrapper<RendererState>;

pub struct RendererState {
    window: Window,
    pub(crate) textures: Children<TextureState>,
}

impl NativeObject for RendererState {
    const KIND: ObjectKind = ObjectKind::Renderer;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &RENDERERS
    }

    fn release_children(slot: &Slot<Self>, _path: ReleasePath) {
        let invalidated = slot.state().textures.invalidate_all();
        if invalidated > 0 {
            tracing::trace!(handle = %slot.raw_handle(), invalidated, "textures freed with their renderer");
        }
    }

    fn destroy(slot: &Slot<Self>) {
        slot.backend().close(Self::KIND, slot.raw_handle());
    }
}

impl Wrapper<RendererState> {
    /// Create a renderer for `window`.
    pub fn create(window: &Window, index: i32, flags: u32) -> Result<Renderer> {
        let parent = window.handle()?;
        let backend = Arc::clone(window.slot().backend_arc());
        let handle = backend.open(&OpenRequest::Renderer {
            window: parent,
            index,
            flags,
        });
        let renderer = adopt(backend, handle, |_, _| RendererState {
            window: window.clone(),
            textures: Children::new(),
        })?;
        window.state().renderers.adopt(renderer.slot());
        Ok(renderer)
    }

    pub fn window(&self) -> &Window {
        &self.state().window
    }

    pub fn set_draw_color(&self, r: u8, g: u8, b: u8, a: u8) -> Result<()> {
        let status = self.with_live(|backend, handle| backend.set_render_draw_color(handle, r, g, b, a))?;
        if status != 0 {
            return Err(native_failure(self, "set_render_draw_color"));
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let status = self.with_live(|backend, handle| backend.render_clear(handle))?;
        if status != 0 {
            return Err(native_failure(self, "render_clear"));
        }
        Ok(())
    }

    /// Copy the whole texture onto the whole render target.
    pub fn copy(&self, texture: &Texture) -> Result<()> {
        let source = texture.handle()?;
        let status = self.with_live(|backend, handle| backend.render_copy(handle, source))?;
        if status != 0 {
            return Err(native_failure(self, "render_copy"));
        }
        Ok(())
    }

    pub fn present(&self) -> Result<()> {
        self.with_live(|backend, handle| backend.render_present(handle))
    }

    /// Number of live textures created from this renderer.
    pub fn texture_count(&self) -> usize {
        self.state().textures.live_count()
    }
}
