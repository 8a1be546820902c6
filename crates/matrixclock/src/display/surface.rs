use tracing::trace;

use super::Layer;
use super::Point;
use super::Surface;

/// Surface that reports every draw call as a trace event.
///
/// Stands in for the LED matrix when running on a host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSurface;

struct TracingLayer {
    name: String,
}

impl Surface for TracingSurface {
    fn layer(&self, name: &str) -> Box<dyn Layer> {
        Box::new(TracingLayer {
            name: name.to_string(),
        })
    }
}

impl Layer for TracingLayer {
    fn blit(&mut self, position: Point, tile: u16) {
        trace!(layer = %self.name, x = position.x, y = position.y, tile, "blit");
    }

    fn text(&mut self, position: Point, text: &str) {
        trace!(layer = %self.name, x = position.x, y = position.y, text, "text");
    }
}
