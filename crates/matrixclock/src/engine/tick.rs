use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;

use crate::display::Bounds;
use crate::display::Sprite;
use crate::store::Store;

/// Every this many frames each sprite picks a new random drift.
pub const VELOCITY_SHUFFLE_FRAMES: u32 = 80;

/// Advance the world by one frame.
///
/// Sprites leaving `bounds` have their velocity turned back towards the
/// inside; positions themselves are never clamped. Returns the new frame.
pub fn tick(
    store: &mut Store,
    sprites: &[Rc<RefCell<Sprite>>],
    bounds: &Bounds,
    rng: &mut impl Rng,
) -> u32 {
    let frame = store.frame();
    let shuffle = frame % VELOCITY_SHUFFLE_FRAMES == 0;

    for sprite in sprites {
        let mut sprite = sprite.borrow_mut();
        if shuffle {
            sprite.set_velocity(rng.random_range(-1..=2), rng.random_range(-1..=2));
        }

        let position = sprite.position();
        if position.x < 0 {
            sprite.set_velocity_x(1);
        } else if position.x > bounds.max_x() {
            sprite.set_velocity_x(-1);
        }
        if position.y < 0 {
            sprite.set_velocity_y(1);
        } else if position.y > bounds.max_y() {
            sprite.set_velocity_y(-1);
        }
    }

    store.advance_frame()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::display::Point;
    use crate::display::Surface;
    use crate::display::TracingSurface;

    const BOUNDS: Bounds = Bounds {
        width: 64,
        height: 32,
        sprite_size: 16,
    };

    fn sprite(x: i32, y: i32, vx: i32, vy: i32) -> Rc<RefCell<Sprite>> {
        let mut sprite = Sprite::new(
            "s",
            TracingSurface.layer("s"),
            0,
            Point::new(x, y),
            Duration::from_millis(1),
        );
        sprite.set_velocity(vx, vy);
        Rc::new(RefCell::new(sprite))
    }

    #[test]
    fn test_frame_increments_by_one() {
        let mut store = Store::new();
        let mut rng = StdRng::seed_from_u64(7);

        for expected in 1..=200 {
            assert_eq!(tick(&mut store, &[], &BOUNDS, &mut rng), expected);
        }
        assert_eq!(store.frame(), 200);
    }

    #[test]
    fn test_frame_wraps() {
        let mut store = Store::new();
        store.set_frame(u32::MAX);

        tick(&mut store, &[], &BOUNDS, &mut StdRng::seed_from_u64(0));

        assert_eq!(store.frame(), 0);
    }

    #[test]
    fn test_out_of_bounds_reverses_velocity() {
        let mut store = Store::new();
        store.set_frame(1);
        let left_top = sprite(-1, -3, -1, -1);
        let right_bottom = sprite(49, 17, 2, 1);
        let inside = sprite(10, 10, -1, 2);

        tick(
            &mut store,
            &[left_top.clone(), right_bottom.clone(), inside.clone()],
            &BOUNDS,
            &mut StdRng::seed_from_u64(0),
        );

        assert_eq!(left_top.borrow().velocity(), Point::new(1, 1));
        assert_eq!(right_bottom.borrow().velocity(), Point::new(-1, -1));
        assert_eq!(inside.borrow().velocity(), Point::new(-1, 2));
        assert_eq!(left_top.borrow().position(), Point::new(-1, -3));
    }

    #[test]
    fn test_edge_positions_are_in_bounds() {
        let mut store = Store::new();
        store.set_frame(1);
        let corner = sprite(48, 16, 2, 2);
        let origin = sprite(0, 0, -1, -1);

        tick(
            &mut store,
            &[corner.clone(), origin.clone()],
            &BOUNDS,
            &mut StdRng::seed_from_u64(0),
        );

        assert_eq!(corner.borrow().velocity(), Point::new(2, 2));
        assert_eq!(origin.borrow().velocity(), Point::new(-1, -1));
    }

    #[test]
    fn test_shuffle_frame_randomizes_every_sprite() {
        let mut rng = StdRng::seed_from_u64(42);
        let sprites: Vec<_> = (0..16).map(|_| sprite(20, 8, 9, 9)).collect();
        let mut store = Store::new();
        store.set_frame(VELOCITY_SHUFFLE_FRAMES * 3);

        tick(&mut store, &sprites, &BOUNDS, &mut rng);

        for sprite in &sprites {
            let velocity = sprite.borrow().velocity();
            assert!((-1..=2).contains(&velocity.x), "{velocity:?}");
            assert!((-1..=2).contains(&velocity.y), "{velocity:?}");
        }
    }

    #[test]
    fn test_bounds_win_over_shuffle() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut store = Store::new();
        let escaped = sprite(-5, 40, 0, 0);

        for _ in 0..(VELOCITY_SHUFFLE_FRAMES * 4) {
            tick(&mut store, std::slice::from_ref(&escaped), &BOUNDS, &mut rng);
            let velocity = escaped.borrow().velocity();
            assert!(velocity.x >= 0);
            assert!(velocity.y <= 0);
        }
    }

    #[test]
    fn test_no_shuffle_between_frames() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut store = Store::new();
        store.set_frame(1);
        let drifting = sprite(20, 8, 2, -1);

        for _ in 1..VELOCITY_SHUFFLE_FRAMES {
            tick(&mut store, std::slice::from_ref(&drifting), &BOUNDS, &mut rng);
        }

        assert_eq!(drifting.borrow().velocity(), Point::new(2, -1));
        assert_eq!(store.frame(), VELOCITY_SHUFFLE_FRAMES);
    }
}
