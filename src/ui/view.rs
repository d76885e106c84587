//! # View Model
//!
//! What each screen shows, built fresh on every render tick from the current
//! link snapshot, calibration and machine state. Rendering backends only see
//! a [`View`]; they never touch the link or the settings directly.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::machine::{ConfigMode, InteractionMachine, MenuItem, Screen};
use crate::calibration::settings::{CalibrationSettings, SpeedSource};
use crate::error::Result;
use crate::link::health::LinkHealth;
use crate::link::receiver::{LinkCounters, LinkSnapshot};
use crate::measurement::derive;

/// Content of one rendered screen
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Main {
        /// Corrected direction; `None` when stale or flagged invalid
        direction: Option<f32>,
        /// Calibrated speed; `None` when stale
        speed: Option<f32>,
        age: Option<Duration>,
        hold_progress: Option<f32>,
    },
    Diagnostic {
        fresh: bool,
        age: Option<Duration>,
        last_seq: Option<u32>,
        counters: LinkCounters,
        status: Option<u16>,
        raw_direction: Option<f32>,
        pps: Option<f32>,
        rpm: Option<f32>,
        battery_volts: Option<f32>,
        sensor_errors: Option<u16>,
        save_failures: u32,
    },
    Info {
        version: &'static str,
        channel: u8,
        speed_source: SpeedSource,
        direction_offset_deg: i16,
        speed_factor: f32,
    },
    Menu {
        mode: ConfigMode,
        item: MenuItem,
        value_text: String,
    },
}

impl View {
    /// Build the view for the machine's current screen
    #[must_use]
    pub fn build(
        machine: &InteractionMachine,
        settings: &CalibrationSettings,
        snapshot: &LinkSnapshot,
        health: &LinkHealth,
        now: Instant,
    ) -> Self {
        let fresh = health.fresh_frame(snapshot, now);
        let age = health.age(snapshot, now);

        match machine.screen() {
            Screen::Main => {
                let measurement = fresh.map(|frame| (frame, derive(&frame, settings)));
                View::Main {
                    direction: measurement
                        .filter(|(frame, _)| frame.direction_valid())
                        .map(|(_, m)| m.direction_deg),
                    speed: measurement.map(|(_, m)| m.speed),
                    age,
                    hold_progress: machine.hold_progress(now),
                }
            }
            Screen::Diagnostic => {
                let measurement = fresh.map(|frame| derive(&frame, settings));
                View::Diagnostic {
                    fresh: fresh.is_some(),
                    age,
                    last_seq: snapshot.last_seq(),
                    counters: snapshot.counters,
                    status: fresh.map(|f| f.status),
                    raw_direction: measurement.map(|m| m.raw_direction_deg),
                    pps: measurement.map(|m| m.pps),
                    rpm: measurement.map(|m| m.rpm),
                    battery_volts: fresh.and_then(|f| f.battery_volts()),
                    sensor_errors: fresh.map(|f| f.i2c_err_count),
                    save_failures: machine.save_failures(),
                }
            }
            Screen::Info => View::Info {
                version: env!("CARGO_PKG_VERSION"),
                channel: settings.channel,
                speed_source: settings.speed_source,
                direction_offset_deg: settings.direction_offset_deg,
                speed_factor: settings.speed_factor,
            },
            Screen::Configuration(mode) => View::Menu {
                mode,
                item: machine.menu_item(),
                value_text: machine.menu_item().value_text(settings),
            },
        }
    }

    /// Short screen name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            View::Main { .. } => "main",
            View::Diagnostic { .. } => "diagnostic",
            View::Info { .. } => "info",
            View::Menu { mode: ConfigMode::Menu, .. } => "menu",
            View::Menu { mode: ConfigMode::Edit, .. } => "edit",
        }
    }
}

fn opt<T: fmt::Display>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map(f).unwrap_or_else(|| "---".to_string())
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Main { direction, speed, age, hold_progress } => {
                write!(
                    f,
                    "DIR {} SPD {} AGE {}",
                    opt(*direction, |d| format!("{:03.0}°", d)),
                    opt(*speed, |s| format!("{:.1}", s)),
                    opt(age.map(|a| a.as_millis()), |a| format!("{}ms", a)),
                )?;
                if let Some(p) = hold_progress {
                    write!(f, " HOLD {:.0}%", p * 100.0)?;
                }
                Ok(())
            }
            View::Diagnostic {
                fresh,
                last_seq,
                counters,
                status,
                raw_direction,
                pps,
                rpm,
                battery_volts,
                sensor_errors,
                save_failures,
                ..
            } => write!(
                f,
                "{} SEQ {} RX {} LOST {} BAD {}/{}/{} ST {} RAW {} PPS {} RPM {} BAT {} I2C {} SAVEERR {}",
                if *fresh { "OK" } else { "NO DATA" },
                opt(*last_seq, |s| s.to_string()),
                counters.received,
                counters.lost,
                counters.bad_length,
                counters.bad_magic,
                counters.bad_crc,
                opt(*status, |s| format!("0x{:04X}", s)),
                opt(*raw_direction, |d| format!("{:.1}", d)),
                opt(*pps, |v| format!("{:.2}", v)),
                opt(*rpm, |v| format!("{:.1}", v)),
                opt(*battery_volts, |v| format!("{:.2}V", v)),
                opt(*sensor_errors, |v| v.to_string()),
                save_failures,
            ),
            View::Info {
                version,
                channel,
                speed_source,
                direction_offset_deg,
                speed_factor,
            } => write!(
                f,
                "anemo-rx v{} CH {} SRC {} OFF {}° FAC x{:.3}",
                version, channel, speed_source, direction_offset_deg, speed_factor
            ),
            View::Menu { mode, item, value_text } => {
                let tag = match mode {
                    ConfigMode::Menu => "MENU",
                    ConfigMode::Edit => "EDIT",
                };
                write!(f, "[{}] {}: {}", tag, item.label(), value_text)
            }
        }
    }
}

/// Rendering backend fed at the render cadence
pub trait Display: Send {
    fn render(&mut self, view: &View) -> Result<()>;
}

/// Display that writes screens to the log
///
/// Only changes are logged; a screen switch is logged at info level, content
/// updates within a screen at debug.
#[derive(Debug, Default)]
pub struct LogDisplay {
    last: Option<String>,
    last_screen: Option<&'static str>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for LogDisplay {
    fn render(&mut self, view: &View) -> Result<()> {
        let text = view.to_string();
        if self.last.as_deref() == Some(text.as_str()) {
            return Ok(());
        }

        if self.last_screen != Some(view.name()) {
            info!(screen = view.name(), "{}", text);
            self.last_screen = Some(view.name());
        } else {
            debug!(screen = view.name(), "{}", text);
        }
        self.last = Some(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::store::MockCalibrationStore;
    use crate::link::receiver::Reception;
    use crate::ui::buttons::{Button, ButtonEvents};
    use crate::wind::protocol::{WindFrame, STATUS_DIRECTION_VALID};

    fn snapshot_with(status: u16, arrived_at: Instant) -> LinkSnapshot {
        LinkSnapshot {
            latest: Some(Reception {
                frame: WindFrame {
                    seq: 42,
                    angle_cdeg: 9_000,
                    pps_centi: 500,
                    rpm_centi: 3_000,
                    status,
                    ..Default::default()
                },
                arrived_at,
            }),
            counters: LinkCounters { received: 1, ..Default::default() },
        }
    }

    fn main_view(snapshot: &LinkSnapshot, now: Instant) -> View {
        View::build(
            &InteractionMachine::default(),
            &CalibrationSettings::default(),
            snapshot,
            &LinkHealth::default(),
            now,
        )
    }

    #[test]
    fn test_main_shows_direction_when_fresh_and_valid() {
        let t0 = Instant::now();
        let snap = snapshot_with(STATUS_DIRECTION_VALID, t0);

        match main_view(&snap, t0 + Duration::from_millis(500)) {
            View::Main { direction, speed, .. } => {
                assert!((direction.unwrap() - 90.0).abs() < 1e-3);
                assert!((speed.unwrap() - 5.0).abs() < 1e-4);
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_main_hides_direction_without_valid_bit() {
        let t0 = Instant::now();
        let snap = snapshot_with(0, t0);

        match main_view(&snap, t0) {
            View::Main { direction, speed, .. } => {
                assert_eq!(direction, None);
                assert!(speed.is_some());
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_main_shows_no_data_when_stale() {
        let t0 = Instant::now();
        let snap = snapshot_with(STATUS_DIRECTION_VALID, t0);

        match main_view(&snap, t0 + Duration::from_millis(2001)) {
            View::Main { direction, speed, age, .. } => {
                assert_eq!(direction, None);
                assert_eq!(speed, None);
                assert_eq!(age, Some(Duration::from_millis(2001)));
            }
            other => panic!("unexpected view {:?}", other),
        }
        assert!(main_view(&snap, t0 + Duration::from_secs(5)).to_string().contains("DIR ---"));
    }

    #[test]
    fn test_main_before_first_frame() {
        let view = main_view(&LinkSnapshot::default(), Instant::now());
        assert_eq!(
            view,
            View::Main { direction: None, speed: None, age: None, hold_progress: None }
        );
    }

    #[test]
    fn test_diagnostic_and_menu_views() {
        let t0 = Instant::now();
        let snap = snapshot_with(STATUS_DIRECTION_VALID, t0);
        let mut machine = InteractionMachine::default();
        let mut settings = CalibrationSettings::default();
        let mut store = MockCalibrationStore::new();

        machine.step(&ButtonEvents::none().with_press(Button::Next), t0, &mut settings, &mut store);
        let view = View::build(&machine, &settings, &snap, &LinkHealth::default(), t0);
        match &view {
            View::Diagnostic { fresh, last_seq, counters, .. } => {
                assert!(*fresh);
                assert_eq!(*last_seq, Some(42));
                assert_eq!(counters.received, 1);
            }
            other => panic!("unexpected view {:?}", other),
        }
        assert_eq!(view.name(), "diagnostic");

        let held = ButtonEvents::none().with_down(Button::Confirm);
        machine.step(&held, t0, &mut settings, &mut store);
        machine.step(&held, t0 + Duration::from_millis(1200), &mut settings, &mut store);
        let view = View::build(&machine, &settings, &snap, &LinkHealth::default(), t0);
        assert_eq!(view.to_string(), "[MENU] Bow offset: 0°");
    }

    #[test]
    fn test_log_display_accepts_views() {
        let mut display = LogDisplay::new();
        let view = main_view(&LinkSnapshot::default(), Instant::now());
        display.render(&view).unwrap();
        display.render(&view).unwrap();
        assert_eq!(display.last_screen, Some("main"));
    }
}
