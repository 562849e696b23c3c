//! Textures.
//!
//! A texture is freed natively together with its renderer. Its own destroy
//! runs under the renderer's child lock and is skipped once the renderer has
//! started releasing, so a texture is never closed after (or while) the
//! renderer frees it.

use std::sync::Arc;

use super::renderer::Renderer;
use crate::error::Result;
use crate::handle::ObjectKind;
use crate::lifecycle::{NativeObject, Slot, Wrapper, adopt};
use crate::native::{OpenRequest, TextureInfo};
use crate::registry::{HandleRegistry, Registry};

pub(crate) static TEXTURES: HandleRegistry<Slot<TextureState>> = Registry::new(ObjectKind::Texture);

pub type Texture = Wrapper<TextureState>;

pub struct TextureState {
    renderer: Renderer,
    info: TextureInfo,
}

impl NativeObject for TextureState {
    const KIND: ObjectKind = ObjectKind::Texture;

    fn registry() -> &'static HandleRegistry<Slot<Self>> {
        &TEXTURES
    }

    fn destroy(slot: &Slot<Self>) {
        let renderer = &slot.state().renderer;
        renderer.state().textures.exclusive(|| {
            if renderer.is_disposed() {
                tracing::trace!(handle = %slot.raw_handle(), "texture already freed by its renderer");
            } else {
                slot.backend().close(Self::KIND, slot.raw_handle());
            }
        });
    }
}

impl Wrapper<TextureState> {
    pub fn create(renderer: &Renderer, format: u32, access: i32, width: i32, height: i32) -> Result<Texture> {
        let parent = renderer.handle()?;
        let backend = Arc::clone(renderer.slot().backend_arc());
        let handle = backend.open(&OpenRequest::Texture {
            renderer: parent,
            format,
            access,
            width,
            height,
        });
        let texture = adopt(backend, handle, |backend, handle| TextureState {
            renderer: renderer.clone(),
            info: backend.query_texture(handle),
        })?;
        renderer.state().textures.adopt(texture.slot());
        Ok(texture)
    }

    /// Format and size, as queried when the texture was created.
    pub fn info(&self) -> Result<TextureInfo> {
        self.slot().ensure_live()?;
        Ok(self.state().info)
    }

    pub fn renderer(&self) -> &Renderer {
        &self.state().renderer
    }
}
