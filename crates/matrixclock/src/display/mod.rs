//! Animated entities and the display surface they draw on.
//!
//! The matrix driver itself lives outside this crate; entities only see the
//! [`Surface`] and [`Layer`] traits. Each entity owns its layer exclusively.

mod clock;
mod sprite;
mod surface;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub use clock::ClockLabel;
pub use sprite::Bounds;
pub use sprite::Sprite;
pub use surface::TracingSurface;

use crate::engine::TaskError;

/// Pixel position on the matrix. May be negative while a sprite bounces back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An initialized display that hands out drawing layers.
pub trait Surface {
    /// Allocate a layer owned by a single animated entity.
    fn layer(&self, name: &str) -> Box<dyn Layer>;
}

/// A region of the display owned by one entity.
pub trait Layer {
    /// Place tile `tile` of the sprite sheet at `position`.
    fn blit(&mut self, position: Point, tile: u16);

    /// Draw a line of text with its top-left corner at `position`.
    fn text(&mut self, position: Point, text: &str);
}

/// Contract for anything the scheduler runs as an animation task.
pub trait Animated {
    fn name(&self) -> &str;

    /// Advance one animation step and draw the result.
    fn render(&mut self);

    /// How long to sleep between two renders.
    fn delay(&self) -> Duration;
}

/// Run an animated entity forever.
///
/// The borrow is released before sleeping so the tick can adjust the
/// entity in between renders.
pub async fn start(entity: Rc<RefCell<dyn Animated>>) -> Result<(), TaskError> {
    tracing::debug!("animation started: {}", entity.borrow().name());
    loop {
        let delay = {
            let mut entity = entity.borrow_mut();
            entity.render();
            entity.delay()
        };
        tokio::time::sleep(delay).await;
    }
}
