//! # Buttons
//!
//! Debounced edge detection for the four front-panel buttons.
//!
//! Buttons are sampled as levels; a level has to differ from the current
//! stable state for a full debounce window before it is accepted. A
//! released→held change yields a [`Edge::Pressed`], which is what navigation
//! reacts to. The held level itself is exposed for the hold gesture.

use std::time::{Duration, Instant};

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(60);

/// Number of front-panel buttons
pub const BUTTON_COUNT: usize = 4;

/// Front-panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// B1: back / leave / cancel edit
    Back,
    /// B2: next item / increment
    Next,
    /// B3: previous item / decrement
    Prev,
    /// B4: confirm / commit edit / hold to configure
    Confirm,
}

impl Button {
    pub const ALL: [Button; BUTTON_COUNT] = [Button::Back, Button::Next, Button::Prev, Button::Confirm];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Button::Back => 0,
            Button::Next => 1,
            Button::Prev => 2,
            Button::Confirm => 3,
        }
    }

    #[inline]
    fn mask(self) -> u8 {
        1 << self.index()
    }
}

/// Raw sampled levels, indexed by [`Button::index`]; `true` = held
pub type ButtonLevels = [bool; BUTTON_COUNT];

/// Stable level change reported by a [`Debouncer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

/// Debounce filter for one button
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    stable: bool,
    last_stable: bool,
    since: Instant,
    window: Duration,
}

impl Debouncer {
    /// Start from the level sampled at `now`
    #[must_use]
    pub fn new(initial: bool, now: Instant, window: Duration) -> Self {
        Self {
            stable: initial,
            last_stable: initial,
            since: now,
            window,
        }
    }

    /// Feed one raw sample
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use anemo_rx::ui::buttons::{Debouncer, Edge};
    ///
    /// let t0 = Instant::now();
    /// let mut b = Debouncer::new(false, t0, Duration::from_millis(60));
    ///
    /// assert_eq!(b.update(true, t0 + Duration::from_millis(30)), None);
    /// assert_eq!(b.update(true, t0 + Duration::from_millis(60)), Some(Edge::Pressed));
    /// assert!(b.is_down());
    /// ```
    pub fn update(&mut self, raw: bool, now: Instant) -> Option<Edge> {
        if raw == self.stable {
            self.since = now;
            return None;
        }

        if now.saturating_duration_since(self.since) < self.window {
            return None;
        }

        self.last_stable = self.stable;
        self.stable = raw;
        self.since = now;

        match (self.last_stable, self.stable) {
            (false, true) => Some(Edge::Pressed),
            (true, false) => Some(Edge::Released),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_down(&self) -> bool {
        self.stable
    }
}

/// What happened to the buttons during one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEvents {
    pressed: u8,
    down: u8,
}

impl ButtonEvents {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether `button` went from released to held during this poll
    #[must_use]
    pub fn pressed(&self, button: Button) -> bool {
        self.pressed & button.mask() != 0
    }

    /// Whether `button` is currently held (debounced)
    #[must_use]
    pub fn down(&self, button: Button) -> bool {
        self.down & button.mask() != 0
    }

    #[must_use]
    pub fn any_pressed(&self) -> bool {
        self.pressed != 0
    }

    /// Mark a press edge (the button is also held)
    #[must_use]
    pub fn with_press(mut self, button: Button) -> Self {
        self.pressed |= button.mask();
        self.down |= button.mask();
        self
    }

    /// Mark a held level without an edge
    #[must_use]
    pub fn with_down(mut self, button: Button) -> Self {
        self.down |= button.mask();
        self
    }
}

/// Debouncers for all four buttons
#[derive(Debug, Clone)]
pub struct ButtonBank {
    buttons: [Debouncer; BUTTON_COUNT],
}

impl ButtonBank {
    #[must_use]
    pub fn new(initial: ButtonLevels, now: Instant, window: Duration) -> Self {
        Self {
            buttons: initial.map(|level| Debouncer::new(level, now, window)),
        }
    }

    /// Sample every button once
    pub fn poll(&mut self, levels: ButtonLevels, now: Instant) -> ButtonEvents {
        let mut events = ButtonEvents::none();

        for button in Button::ALL {
            let debouncer = &mut self.buttons[button.index()];
            if debouncer.update(levels[button.index()], now) == Some(Edge::Pressed) {
                events = events.with_press(button);
            }
            if debouncer.is_down() {
                events = events.with_down(button);
            }
        }

        events
    }
}
