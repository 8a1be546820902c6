//! The two physical buttons.

use std::cell::RefCell;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;
use tracing::warn;

use crate::store::Button;
use crate::store::StoreHandle;

/// A key transition as reported by the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_number: usize,
    pub pressed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Keypad is already held by another poller")]
    Busy,
}

/// Hardware buttons that must be acquired before their events can be read.
pub trait Keypad {
    /// Take exclusive access to the buttons.
    ///
    /// Access is released when the returned value is dropped.
    fn acquire(&self) -> Result<Box<dyn KeyEvents + '_>, InputError>;
}

/// Queue of pending key events, held while the keypad is acquired.
pub trait KeyEvents {
    /// Pop the oldest pending event without waiting.
    fn next_event(&mut self) -> Option<KeyEvent>;
}

/// Keypad fed by a channel. The sender half plays the role of the GPIO pins.
pub struct ChannelKeypad {
    events: RefCell<Option<mpsc::UnboundedReceiver<KeyEvent>>>,
}

impl ChannelKeypad {
    pub fn new() -> (Self, mpsc::UnboundedSender<KeyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let keypad = Self {
            events: RefCell::new(Some(rx)),
        };
        (keypad, tx)
    }
}

struct ChannelKeys<'a> {
    owner: &'a ChannelKeypad,
    events: Option<mpsc::UnboundedReceiver<KeyEvent>>,
}

impl Keypad for ChannelKeypad {
    fn acquire(&self) -> Result<Box<dyn KeyEvents + '_>, InputError> {
        let events = self.events.borrow_mut().take().ok_or(InputError::Busy)?;
        Ok(Box::new(ChannelKeys {
            owner: self,
            events: Some(events),
        }))
    }
}

impl KeyEvents for ChannelKeys<'_> {
    fn next_event(&mut self) -> Option<KeyEvent> {
        self.events.as_mut()?.try_recv().ok()
    }
}

impl Drop for ChannelKeys<'_> {
    fn drop(&mut self) {
        *self.owner.events.borrow_mut() = self.events.take();
    }
}

/// Map a line typed on the console to a key number.
pub fn console_key_number(line: &str) -> Option<usize> {
    match line.trim().to_lowercase().as_str() {
        "u" | "up" | "0" => Some(Button::Up as usize),
        "d" | "down" | "1" => Some(Button::Down as usize),
        _ => None,
    }
}

/// Record button presses into the store, one event per `interval`.
pub async fn poll_buttons(
    keypad: &dyn Keypad,
    store: &StoreHandle,
    interval: Duration,
) -> Result<(), InputError> {
    let mut keys = keypad.acquire()?;
    loop {
        if let Some(event) = keys.next_event() {
            if event.pressed {
                match Button::from_key_number(event.key_number) {
                    Some(button) => {
                        info!("button: key={} ({})", event.key_number, button);
                        store.borrow_mut().record_button(button);
                    }
                    None => warn!("ignoring unknown key {}", event.key_number),
                }
            }
        }
        tokio::time::sleep(interval).await;
    }
}
