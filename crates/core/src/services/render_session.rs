use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::annotation::{AnnotationKind, AnnotationSet, AnnotationVisibility, ImageSize};
use crate::services::render_service::RenderService;
use crate::surface::Surface;

/// One chart image with its annotation overlay.
///
/// Holds the complete annotation collection for its whole life; toggling a
/// kind only flips a visibility flag and redraws everything from that
/// collection. Loading new annotations means starting a new session, which
/// also resets visibility.
pub struct RenderSession<S: Surface> {
    surface: S,
    size: ImageSize,
    annotations: AnnotationSet,
    visibility: AnnotationVisibility,
    renderer: RenderService,
}

impl<S: Surface> std::fmt::Debug for RenderSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("size", &self.size)
            .field("annotations", &self.annotations.len())
            .field("hidden", &self.visibility.hidden())
            .finish()
    }
}

impl<S: Surface> RenderSession<S> {
    /// Start a session on an image of known size and draw everything once.
    pub fn new(surface: S, size: ImageSize, annotations: AnnotationSet) -> Self {
        let mut session = Self {
            surface,
            size,
            annotations,
            visibility: AnnotationVisibility::default(),
            renderer: RenderService::new(),
        };
        session.redraw();
        session
    }

    /// Decode the chart image first; a broken image yields an error and no
    /// session, never a blank overlay.
    pub fn open(surface: S, image: &[u8], annotations: AnnotationSet) -> Result<Self, CoreError> {
        let size = RenderService::new().decode_image_size(image)?;
        tracing::info!(
            width = size.width(),
            height = size.height(),
            annotations = annotations.len(),
            rejected = annotations.rejected().len(),
            "opened render session"
        );
        Ok(Self::new(surface, size, annotations))
    }

    /// Redraw the full collection under the current visibility.
    pub fn redraw(&mut self) -> usize {
        self.renderer.render(
            &mut self.surface,
            self.annotations.annotations(),
            &self.visibility,
            self.size,
        )
    }

    /// Flip one kind's visibility, redraw, and return the new state.
    pub fn toggle(&mut self, kind: AnnotationKind) -> bool {
        let visible = self.visibility.toggle(kind);
        self.redraw();
        visible
    }

    /// Show or hide one kind, redrawing only when the state changes.
    pub fn set_visible(&mut self, kind: AnnotationKind, visible: bool) {
        if self.visibility.is_visible(kind) != visible {
            self.visibility.set(kind, visible);
            self.redraw();
        }
    }

    pub fn is_visible(&self, kind: AnnotationKind) -> bool {
        self.visibility.is_visible(kind)
    }

    pub fn visibility(&self) -> &AnnotationVisibility {
        &self.visibility
    }

    /// Accepted annotations per kind, for the summary panel.
    pub fn counts(&self) -> HashMap<AnnotationKind, usize> {
        self.annotations.counts()
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}
