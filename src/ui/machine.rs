//! # Interaction State Machine
//!
//! Turns debounced button events into screen changes and calibration edits.
//!
//! ## Screens
//!
//! | Screen | Back | Next | Prev | Confirm |
//! |--------|------|------|------|---------|
//! | Main / Diagnostic / Info | go to Main | next screen | previous screen | hold to configure |
//! | Menu | leave configuration | next item | previous item | edit item |
//! | Edit | cancel edit | increment | decrement | commit and save |
//!
//! ## Hold Gesture
//!
//! Outside configuration, holding Confirm for the hold threshold enters the
//! menu once. The gesture then stays locked until Confirm is released, so a
//! button still held after leaving the menu cannot re-enter it. Releasing
//! early discards the elapsed time.

use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::buttons::{Button, ButtonEvents};
use crate::calibration::settings::CalibrationSettings;
use crate::calibration::store::CalibrationStore;

/// Default hold time to enter configuration
pub const DEFAULT_HOLD: Duration = Duration::from_millis(1200);

/// Sub-mode while configuring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Menu,
    Edit,
}

/// What the display is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Main,
    Diagnostic,
    Info,
    Configuration(ConfigMode),
}

impl Screen {
    fn next_view(self) -> Self {
        match self {
            Screen::Main => Screen::Diagnostic,
            Screen::Diagnostic => Screen::Info,
            _ => Screen::Main,
        }
    }

    fn prev_view(self) -> Self {
        match self {
            Screen::Main => Screen::Info,
            Screen::Info => Screen::Diagnostic,
            _ => Screen::Main,
        }
    }

    #[must_use]
    pub fn is_configuration(self) -> bool {
        matches!(self, Screen::Configuration(_))
    }
}

/// Editable calibration items, in menu order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    DirectionOffset,
    SpeedFactor,
    SpeedSource,
    Channel,
}

impl MenuItem {
    pub const ALL: [MenuItem; 4] = [
        MenuItem::DirectionOffset,
        MenuItem::SpeedFactor,
        MenuItem::SpeedSource,
        MenuItem::Channel,
    ];

    fn position(self) -> usize {
        match self {
            MenuItem::DirectionOffset => 0,
            MenuItem::SpeedFactor => 1,
            MenuItem::SpeedSource => 2,
            MenuItem::Channel => 3,
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::DirectionOffset => "Bow offset",
            MenuItem::SpeedFactor => "Speed factor",
            MenuItem::SpeedSource => "Speed source",
            MenuItem::Channel => "Link channel",
        }
    }

    /// Current value of this item, formatted for display
    #[must_use]
    pub fn value_text(self, settings: &CalibrationSettings) -> String {
        match self {
            MenuItem::DirectionOffset => format!("{}°", settings.direction_offset_deg),
            MenuItem::SpeedFactor => format!("x{:.3}", settings.speed_factor),
            MenuItem::SpeedSource => settings.speed_source.label().to_string(),
            MenuItem::Channel => format!("CH {}", settings.channel),
        }
    }

    fn adjust(self, settings: &mut CalibrationSettings, up: bool) {
        match self {
            MenuItem::DirectionOffset => settings.step_offset(if up { 1 } else { -1 }),
            MenuItem::SpeedFactor => settings.step_factor(if up { 1 } else { -1 }),
            MenuItem::SpeedSource => settings.toggle_source(),
            MenuItem::Channel => settings.step_channel(if up { 1 } else { -1 }),
        }
    }
}

/// Side effects the application has to carry out after a step
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    EnteredConfig,
    ExitedConfig,
    Saved,
    SaveFailed(String),
    /// The link channel was committed; the transport should follow it
    Retune(u8),
}

#[derive(Debug, Clone, Copy)]
struct HoldGesture {
    threshold: Duration,
    armed_at: Option<Instant>,
    locked: bool,
}

impl HoldGesture {
    fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            armed_at: None,
            locked: false,
        }
    }

    /// Returns true on the single tick the threshold is reached
    fn update(&mut self, held: bool, now: Instant) -> bool {
        if !held {
            self.armed_at = None;
            self.locked = false;
            return false;
        }
        if self.locked {
            return false;
        }

        match self.armed_at {
            None => {
                self.armed_at = Some(now);
                false
            }
            Some(start) if now.saturating_duration_since(start) >= self.threshold => {
                self.armed_at = None;
                self.locked = true;
                true
            }
            Some(_) => false,
        }
    }

    fn disarm(&mut self, held: bool) {
        self.armed_at = None;
        if !held {
            self.locked = false;
        }
    }

    fn progress(&self, now: Instant) -> Option<f32> {
        let start = self.armed_at?;
        let elapsed = now.saturating_duration_since(start).as_secs_f32();
        Some((elapsed / self.threshold.as_secs_f32()).clamp(0.0, 1.0))
    }
}

/// Screen navigation and calibration editing
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    screen: Screen,
    item: MenuItem,
    hold: HoldGesture,
    /// Settings as they were when the current edit began
    snapshot: Option<CalibrationSettings>,
    save_failures: u32,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD)
    }
}

impl InteractionMachine {
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            screen: Screen::Main,
            item: MenuItem::DirectionOffset,
            hold: HoldGesture::new(hold),
            snapshot: None,
            save_failures: 0,
        }
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn menu_item(&self) -> MenuItem {
        self.item
    }

    /// Number of commits whose save failed since startup
    #[must_use]
    pub fn save_failures(&self) -> u32 {
        self.save_failures
    }

    /// Hold gesture progress in 0..=1, only while armed on the main screen
    #[must_use]
    pub fn hold_progress(&self, now: Instant) -> Option<f32> {
        if self.screen != Screen::Main {
            return None;
        }
        self.hold.progress(now)
    }

    /// Advance the machine by one tick
    pub fn step(
        &mut self,
        events: &ButtonEvents,
        now: Instant,
        settings: &mut CalibrationSettings,
        store: &mut dyn CalibrationStore,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        match self.screen {
            Screen::Configuration(ConfigMode::Menu) => {
                self.hold.disarm(events.down(Button::Confirm));
                self.step_menu(events, settings, &mut effects);
            }
            Screen::Configuration(ConfigMode::Edit) => {
                self.hold.disarm(events.down(Button::Confirm));
                self.step_edit(events, settings, store, &mut effects);
            }
            _ => self.step_views(events, now, &mut effects),
        }

        effects
    }

    fn step_views(&mut self, events: &ButtonEvents, now: Instant, effects: &mut Vec<Effect>) {
        if events.pressed(Button::Back) {
            self.screen = Screen::Main;
        } else if events.pressed(Button::Next) {
            self.screen = self.screen.next_view();
        } else if events.pressed(Button::Prev) {
            self.screen = self.screen.prev_view();
        }

        if self.hold.update(events.down(Button::Confirm), now) {
            self.screen = Screen::Configuration(ConfigMode::Menu);
            self.item = MenuItem::DirectionOffset;
            info!("Entering configuration");
            effects.push(Effect::EnteredConfig);
        }
    }

    fn step_menu(&mut self, events: &ButtonEvents, settings: &CalibrationSettings, effects: &mut Vec<Effect>) {
        if events.pressed(Button::Back) {
            self.screen = Screen::Main;
            info!("Leaving configuration");
            effects.push(Effect::ExitedConfig);
        } else if events.pressed(Button::Confirm) {
            self.snapshot = Some(*settings);
            self.screen = Screen::Configuration(ConfigMode::Edit);
            debug!("Editing {}", self.item.label());
        } else if events.pressed(Button::Next) {
            self.item = self.item.next();
        } else if events.pressed(Button::Prev) {
            self.item = self.item.prev();
        }
    }

    fn step_edit(
        &mut self,
        events: &ButtonEvents,
        settings: &mut CalibrationSettings,
        store: &mut dyn CalibrationStore,
        effects: &mut Vec<Effect>,
    ) {
        if events.pressed(Button::Back) {
            if let Some(before) = self.snapshot.take() {
                *settings = before;
            }
            self.screen = Screen::Configuration(ConfigMode::Menu);
            debug!("Edit of {} cancelled", self.item.label());
        } else if events.pressed(Button::Confirm) {
            self.snapshot = None;
            self.screen = Screen::Configuration(ConfigMode::Menu);

            match store.save(settings) {
                Ok(()) => {
                    info!("{} set to {}", self.item.label(), self.item.value_text(settings));
                    effects.push(Effect::Saved);
                }
                Err(e) => {
                    // In-memory value stays active
                    self.save_failures = self.save_failures.saturating_add(1);
                    error!("Failed to save calibration: {}", e);
                    effects.push(Effect::SaveFailed(e.to_string()));
                }
            }

            if self.item == MenuItem::Channel {
                effects.push(Effect::Retune(settings.channel));
            }
        } else if events.pressed(Button::Next) {
            self.item.adjust(settings, true);
        } else if events.pressed(Button::Prev) {
            self.item.adjust(settings, false);
        }
    }
}
