//! # Button Input
//!
//! Reads the front-panel buttons from a Linux evdev device, typically the
//! `gpio-keys` device the board's device tree exposes.
//!
//! ## Key Mapping
//!
//! | Button | Default evdev code | Role |
//! |--------|--------------------|------|
//! | B1 | KEY_ESC | Back |
//! | B2 | KEY_DOWN | Next / increment |
//! | B3 | KEY_UP | Prev / decrement |
//! | B4 | KEY_ENTER | Confirm / hold to configure |
//!
//! evdev reads block, so the reader runs on its own thread and publishes
//! the raw levels through a `watch` channel. Debouncing happens in the main
//! loop, not here.
//!
//! ## Usage
//!
//! ```no_run
//! use anemo_rx::ui::input::{ButtonDevice, KeyMap};
//!
//! let keymap = KeyMap::default();
//! let device = ButtonDevice::open(None, &keymap)?;
//! println!("Buttons on {}", device.device_path());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;
use std::thread::{self, JoinHandle};

use evdev::{Device, InputEvent, InputEventKind, Key};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::buttons::{Button, ButtonLevels, BUTTON_COUNT};
use crate::error::{AnemoError, Result};

/// evdev key code assigned to each button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMap {
    keys: [Key; BUTTON_COUNT],
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            keys: [Key::KEY_ESC, Key::KEY_DOWN, Key::KEY_UP, Key::KEY_ENTER],
        }
    }
}

impl KeyMap {
    /// Build a map from raw key codes in button order: back, next, prev, confirm
    #[must_use]
    pub fn from_codes(back: u16, next: u16, prev: u16, confirm: u16) -> Self {
        Self {
            keys: [Key::new(back), Key::new(next), Key::new(prev), Key::new(confirm)],
        }
    }

    #[must_use]
    pub fn key(&self, button: Button) -> Key {
        self.keys[button.index()]
    }

    /// Which button a key drives, if any
    #[must_use]
    pub fn button_for(&self, key: Key) -> Option<Button> {
        Button::ALL.into_iter().find(|b| self.key(*b) == key)
    }
}

/// Raw button levels maintained from evdev key events
#[derive(Debug, Clone)]
pub struct ButtonState {
    keymap: KeyMap,
    levels: ButtonLevels,
}

impl ButtonState {
    #[must_use]
    pub fn new(keymap: KeyMap) -> Self {
        Self {
            keymap,
            levels: [false; BUTTON_COUNT],
        }
    }

    #[must_use]
    pub fn levels(&self) -> ButtonLevels {
        self.levels
    }

    /// Apply one event; returns true if a button level changed
    ///
    /// Key repeat events (value 2) count as held.
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        let InputEventKind::Key(key) = event.kind() else {
            return false;
        };
        let Some(button) = self.keymap.button_for(key) else {
            return false;
        };

        let held = event.value() != 0;
        let slot = &mut self.levels[button.index()];
        let changed = *slot != held;
        *slot = held;
        changed
    }
}

/// Handle to the evdev device carrying the buttons
pub struct ButtonDevice {
    device: Device,
    device_path: String,
}

impl ButtonDevice {
    /// Open the button device
    ///
    /// With an explicit path that device is used as-is. Otherwise every
    /// `/dev/input/event*` device is scanned in order and the first one
    /// supporting all four mapped keys is taken.
    ///
    /// # Errors
    ///
    /// `Input` if the path cannot be opened or no suitable device exists.
    pub fn open(path: Option<&Path>, keymap: &KeyMap) -> Result<Self> {
        if let Some(path) = path {
            let device = Device::open(path)
                .map_err(|e| AnemoError::Input(format!("Failed to open {}: {}", path.display(), e)))?;
            let device_path = path.to_string_lossy().to_string();
            info!("Using button device {}", device_path);
            return Ok(Self { device, device_path });
        }

        let input_dir = Path::new("/dev/input");
        if !input_dir.exists() {
            return Err(AnemoError::Input("/dev/input directory not found".to_string()));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| AnemoError::Input(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AnemoError::Input(format!("Failed to read directory entry: {}", e)))?;
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();
            let is_event = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!("Found input device: {} ({:?})", path.display(), device.name());
                    let has_all_keys = device
                        .supported_keys()
                        .map(|keys| Button::ALL.iter().all(|b| keys.contains(keymap.key(*b))))
                        .unwrap_or(false);

                    if has_all_keys {
                        let device_path = path.to_string_lossy().to_string();
                        info!("Found button device at {}", device_path);
                        return Ok(Self { device, device_path });
                    }
                }
                Err(e) => debug!("Could not open {}: {}", path.display(), e),
            }
        }

        Err(AnemoError::Input("no input device provides the button keys".to_string()))
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Current key levels as the kernel reports them
    pub fn initial_state(&self, keymap: &KeyMap) -> ButtonLevels {
        let mut levels = [false; BUTTON_COUNT];
        match self.device.get_key_state() {
            Ok(pressed) => {
                for button in Button::ALL {
                    levels[button.index()] = pressed.contains(keymap.key(button));
                }
            }
            Err(e) => debug!("Could not query key state: {}", e),
        }
        levels
    }

    /// Block until events are available
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| AnemoError::Input(format!("Failed to fetch events: {}", e)))
    }
}

/// Read the device on a dedicated thread, publishing levels on every change
///
/// The thread ends when the device fails or every receiver is gone. It is
/// not joined on shutdown since it may be parked in a blocking read.
pub fn spawn_reader(
    mut device: ButtonDevice,
    keymap: KeyMap,
    levels_tx: watch::Sender<ButtonLevels>,
) -> Result<JoinHandle<()>> {
    let builder = thread::Builder::new().name("buttons".to_string());
    let handle = builder.spawn(move || {
        let mut state = ButtonState::new(keymap);
        state.levels = device.initial_state(&keymap);
        levels_tx.send_replace(state.levels());

        loop {
            let events = match device.fetch_events() {
                Ok(events) => events,
                Err(e) => {
                    warn!("Button input lost: {}", e);
                    break;
                }
            };

            let mut changed = false;
            for event in events {
                changed |= state.process_event(&event);
            }

            if changed && levels_tx.send(state.levels()).is_err() {
                debug!("Button reader stopping, no listeners");
                break;
            }
        }

        // Leave no button stuck down
        levels_tx.send_replace([false; BUTTON_COUNT]);
    });

    handle.map_err(|e| AnemoError::Input(format!("Failed to start button reader: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    fn key_event(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }

    #[test]
    fn test_default_keymap() {
        let map = KeyMap::default();
        assert_eq!(map.key(Button::Back), Key::KEY_ESC);
        assert_eq!(map.key(Button::Next), Key::KEY_DOWN);
        assert_eq!(map.key(Button::Prev), Key::KEY_UP);
        assert_eq!(map.key(Button::Confirm), Key::KEY_ENTER);
        assert_eq!(map.button_for(Key::KEY_ENTER), Some(Button::Confirm));
        assert_eq!(map.button_for(Key::KEY_A), None);
    }

    #[test]
    fn test_keymap_from_codes() {
        let map = KeyMap::from_codes(
            Key::KEY_F1.code(),
            Key::KEY_F2.code(),
            Key::KEY_F3.code(),
            Key::KEY_F4.code(),
        );
        assert_eq!(map.button_for(Key::KEY_F3), Some(Button::Prev));
        assert_eq!(map.button_for(Key::KEY_ESC), None);
    }

    #[test]
    fn test_key_events_set_levels() {
        let mut state = ButtonState::new(KeyMap::default());

        assert!(state.process_event(&key_event(Key::KEY_DOWN, 1)));
        assert!(state.levels()[Button::Next.index()]);

        // Autorepeat keeps it held without a change
        assert!(!state.process_event(&key_event(Key::KEY_DOWN, 2)));
        assert!(state.levels()[Button::Next.index()]);

        assert!(state.process_event(&key_event(Key::KEY_DOWN, 0)));
        assert!(!state.levels()[Button::Next.index()]);
    }

    #[test]
    fn test_unmapped_and_non_key_events_ignored() {
        let mut state = ButtonState::new(KeyMap::default());

        assert!(!state.process_event(&key_event(Key::KEY_Q, 1)));
        assert!(!state.process_event(&InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)));
        assert_eq!(state.levels(), [false; BUTTON_COUNT]);
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_open_with_real_hardware() {
        let device = ButtonDevice::open(None, &KeyMap::default()).expect("Button device not found");
        assert!(device.device_path().starts_with("/dev/input/event"));
    }
}
