//! The "text changed" event.
//!
//! The editing surface broadcasts each new buffer to every observer. Dirty tracking (the
//! session) and re-rendering ([`LivePreview`]) are separate observers and never call each other.

use crate::markdown::{CommonMark, Render};

pub trait TextObserver {
    fn text_changed(&mut self, text: &str);
}

/// Deliver one change to every observer, in order.
pub fn broadcast(text: &str, observers: &mut [&mut dyn TextObserver]) {
    for observer in observers.iter_mut() {
        observer.text_changed(text);
    }
}

/// Keeps the HTML projection of the buffer current.
#[derive(Debug, Default)]
pub struct LivePreview<R = CommonMark> {
    renderer: R,
    html: String,
}

impl<R: Render> LivePreview<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            html: String::new(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Re-render without going through an event, e.g. after loading a file.
    pub fn refresh(&mut self, text: &str) {
        self.html = self.renderer.render(text);
    }
}

impl<R: Render> TextObserver for LivePreview<R> {
    fn text_changed(&mut self, text: &str) {
        self.refresh(text);
    }
}
