use std::time::Duration;

use rand::Rng;

use super::Animated;
use super::Layer;
use super::Point;

/// Area sprites are kept inside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
    pub sprite_size: i32,
}

impl Bounds {
    /// Largest x a sprite may sit at without leaving the right edge.
    pub fn max_x(&self) -> i32 {
        self.width - self.sprite_size
    }

    /// Largest y a sprite may sit at without leaving the bottom edge.
    pub fn max_y(&self) -> i32 {
        self.height - self.sprite_size
    }
}

/// A single tile of the sprite sheet moving with a constant velocity.
pub struct Sprite {
    name: String,
    layer: Box<dyn Layer>,
    tile: u16,
    position: Point,
    velocity: Point,
    delay: Duration,
}

impl Sprite {
    pub fn new(
        name: impl Into<String>,
        layer: Box<dyn Layer>,
        tile: u16,
        position: Point,
        delay: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            layer,
            tile,
            position,
            velocity: Point::default(),
            delay,
        }
    }

    /// Place a sprite somewhere inside `bounds` with a small random drift.
    pub fn random(
        name: impl Into<String>,
        layer: Box<dyn Layer>,
        tile: u16,
        bounds: Bounds,
        delay: Duration,
        rng: &mut impl Rng,
    ) -> Self {
        let position = Point::new(
            rng.random_range(0..=bounds.max_x().max(0)),
            rng.random_range(0..=bounds.max_y().max(0)),
        );
        let mut sprite = Self::new(name, layer, tile, position, delay);
        sprite.set_velocity(rng.random_range(-1..=1), rng.random_range(-1..=1));
        sprite
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn set_velocity(&mut self, x: i32, y: i32) {
        self.velocity = Point::new(x, y);
    }

    pub fn set_velocity_x(&mut self, x: i32) {
        self.velocity.x = x;
    }

    pub fn set_velocity_y(&mut self, y: i32) {
        self.velocity.y = y;
    }
}

impl Animated for Sprite {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&mut self) {
        self.position.x += self.velocity.x;
        self.position.y += self.velocity.y;
        self.layer.blit(self.position, self.tile);
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::display::Surface;
    use crate::display::TracingSurface;

    const BOUNDS: Bounds = Bounds {
        width: 64,
        height: 32,
        sprite_size: 16,
    };

    #[test]
    fn test_render_moves_by_velocity() {
        let layer = TracingSurface.layer("sprite");
        let mut sprite = Sprite::new("s", layer, 1, Point::new(10, 5), Duration::from_millis(1));
        sprite.set_velocity(2, -1);

        sprite.render();
        sprite.render();

        assert_eq!(sprite.position(), Point::new(14, 3));
    }

    #[test]
    fn test_partial_velocity_setters() {
        let layer = TracingSurface.layer("sprite");
        let mut sprite = Sprite::new("s", layer, 1, Point::default(), Duration::ZERO);
        sprite.set_velocity(1, 1);
        sprite.set_velocity_x(-1);
        assert_eq!(sprite.velocity(), Point::new(-1, 1));
        sprite.set_velocity_y(0);
        assert_eq!(sprite.velocity(), Point::new(-1, 0));
    }

    #[test]
    fn test_random_sprite_starts_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let layer = TracingSurface.layer("sprite");
            let sprite = Sprite::random("s", layer, 1, BOUNDS, Duration::ZERO, &mut rng);
            let p = sprite.position();
            assert!((0..=BOUNDS.max_x()).contains(&p.x));
            assert!((0..=BOUNDS.max_y()).contains(&p.y));
            let v = sprite.velocity();
            assert!((-1..=1).contains(&v.x));
            assert!((-1..=1).contains(&v.y));
        }
    }
}
