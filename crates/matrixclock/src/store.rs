use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Open record of named fields describing an entity's state.
///
/// Normally carries `state`; lights add `color`, `brightness`, `color_mode`, etc.
pub type EntityState = serde_json::Map<String, serde_json::Value>;

/// Shared handle to the store of the current run.
///
/// The scheduler creates one per run and clones the handle into every task.
/// Borrows must never be held across an `.await`.
pub type StoreHandle = Rc<RefCell<Store>>;

/// One of the two physical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Button {
    Up = 0,
    Down = 1,
}

impl Button {
    /// Map a key number as reported by the keypad to a button.
    pub fn from_key_number(n: usize) -> Option<Self> {
        match n {
            0 => Some(Button::Up),
            1 => Some(Button::Down),
            _ => None,
        }
    }
}

/// Mutable state shared by all tasks of a single scheduler run.
///
/// Nothing here survives a supervisor restart.
#[derive(Debug, Default)]
pub struct Store {
    frame: u32,
    button: Option<Button>,
    entities: HashMap<String, EntityState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh store wrapped in a shareable handle.
    pub fn shared() -> StoreHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Advance the frame counter by one, wrapping at `u32::MAX`.
    pub fn advance_frame(&mut self) -> u32 {
        self.frame = self.frame.wrapping_add(1);
        self.frame
    }

    pub fn button(&self) -> Option<Button> {
        self.button
    }

    pub fn record_button(&mut self, button: Button) {
        self.button = Some(button);
    }

    /// Replace an entity's state wholesale.
    pub fn set_entity(&mut self, name: &str, state: EntityState) {
        self.entities.insert(name.to_string(), state);
    }

    /// `None` means the entity has not been advertised in this run.
    pub fn entity(&self, name: &str) -> Option<&EntityState> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> &HashMap<String, EntityState> {
        &self.entities
    }

    #[cfg(test)]
    pub(crate) fn set_frame(&mut self, frame: u32) {
        self.frame = frame;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> EntityState {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = Store::new();
        assert_eq!(store.frame(), 0);
        assert_eq!(store.button(), None);
        assert!(store.entities().is_empty());
    }

    #[test]
    fn test_advance_frame_wraps() {
        let mut store = Store::new();
        store.set_frame(u32::MAX);
        assert_eq!(store.advance_frame(), 0);
        assert_eq!(store.advance_frame(), 1);
    }

    #[test]
    fn test_button_press_overwrites_previous() {
        let mut store = Store::new();
        store.record_button(Button::Up);
        store.record_button(Button::Down);
        assert_eq!(store.button(), Some(Button::Down));
    }

    #[test]
    fn test_set_entity_replaces_whole_record() {
        let mut store = Store::new();
        store.set_entity("lamp", record(json!({"state": "ON", "brightness": 10})));
        store.set_entity("lamp", record(json!({"state": "OFF"})));

        assert_eq!(store.entity("lamp"), Some(&record(json!({"state": "OFF"}))));
        assert_eq!(store.entities().len(), 1);
    }

    #[test]
    fn test_button_from_key_number() {
        assert_eq!(Button::from_key_number(0), Some(Button::Up));
        assert_eq!(Button::from_key_number(1), Some(Button::Down));
        assert_eq!(Button::from_key_number(2), None);
    }
}
