//! Mount target for rendered diagrams.
//!
//! A [`Container`] stands in for the host element a diagram is drawn into.
//! It knows its viewport size and whether it is attached to the host, and it
//! holds the most recently mounted document.

use std::cell::{Cell, RefCell};

use schemascope_core::geometry::Size;

use crate::error::DiagramError;

#[derive(Debug)]
pub struct Container {
    id: String,
    viewport: Cell<Size>,
    attached: Cell<bool>,
    document: RefCell<Option<String>>,
}

impl Container {
    /// Creates an attached container with the given viewport.
    pub fn new(id: impl Into<String>, viewport: Size) -> Self {
        Self {
            id: id.into(),
            viewport: Cell::new(viewport),
            attached: Cell::new(true),
            document: RefCell::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn viewport(&self) -> Size {
        self.viewport.get()
    }

    pub fn resize(&self, viewport: Size) {
        self.viewport.set(viewport);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Removes the container from the host; later renders into it fail.
    pub fn detach(&self) {
        self.attached.set(false);
    }

    pub fn attach(&self) {
        self.attached.set(true);
    }

    /// Checks that something can be rendered into this container.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::InvalidContainer`] if the container is
    /// detached or its viewport has no area.
    pub fn ensure_mountable(&self) -> Result<(), DiagramError> {
        if !self.is_attached() {
            return Err(DiagramError::InvalidContainer(format!(
                "container `{}` is not attached",
                self.id
            )));
        }
        let viewport = self.viewport();
        if viewport.is_empty() {
            return Err(DiagramError::InvalidContainer(format!(
                "container `{}` has an empty viewport ({}x{})",
                self.id,
                viewport.width(),
                viewport.height()
            )));
        }
        Ok(())
    }

    /// Replaces the mounted document.
    pub fn mount(&self, document: String) -> Result<(), DiagramError> {
        self.ensure_mountable()?;
        *self.document.borrow_mut() = Some(document);
        Ok(())
    }

    /// The mounted document, if any.
    pub fn document(&self) -> Option<String> {
        self.document.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.document.borrow().is_some()
    }

    pub fn clear(&self) {
        self.document.borrow_mut().take();
    }
}
