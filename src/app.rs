//! # Application Loop
//!
//! The cooperative per-tick work of the receiver, kept free of I/O so it can
//! be driven by a timer in `main` and by hand in tests.
//!
//! Each tick:
//! 1. debounces the latest button levels and steps the interaction machine
//! 2. records the calibrated reading while the link is fresh
//! 3. paces an `MWV` sentence
//! 4. renders the current view at the render interval
//! 5. produces a link status report once per second

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::calibration::settings::CalibrationSettings;
use crate::calibration::store::CalibrationStore;
use crate::config::Config;
use crate::link::health::{LinkHealth, LinkReport, LinkStatusTracker, LinkTransition};
use crate::link::receiver::LinkSnapshot;
use crate::measurement::derive;
use crate::nmea::output::NmeaOutput;
use crate::ui::buttons::{ButtonBank, ButtonLevels};
use crate::ui::machine::{Effect, InteractionMachine};
use crate::ui::view::{Display, View};

/// Interval of the link status report
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// What the surrounding tasks have to act on after a tick
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickOutcome {
    /// New link channel to listen on
    pub retune: Option<u8>,
    /// Sentence to hand to the serial port
    pub sentence: Option<String>,
    pub report: Option<LinkReport>,
}

/// Receiver state owned by the main loop
pub struct App {
    settings: CalibrationSettings,
    store: Box<dyn CalibrationStore>,
    machine: InteractionMachine,
    buttons: ButtonBank,
    health: LinkHealth,
    tracker: LinkStatusTracker,
    nmea: NmeaOutput,
    display: Box<dyn Display>,
    render_interval: Duration,
    last_render: Option<Instant>,
    last_report: Instant,
}

impl App {
    /// Build the loop state, loading calibration from `store`
    ///
    /// `initial_levels` seeds the debouncers, so a button already held at
    /// startup does not count as a press.
    pub fn new(
        config: &Config,
        store: Box<dyn CalibrationStore>,
        display: Box<dyn Display>,
        initial_levels: ButtonLevels,
        now: Instant,
    ) -> Self {
        let settings = store.load();
        info!(
            "Calibration: offset {}°, factor x{:.3}, source {}, channel {}",
            settings.direction_offset_deg, settings.speed_factor, settings.speed_source, settings.channel
        );

        Self {
            settings,
            store,
            machine: InteractionMachine::new(config.ui.hold()),
            buttons: ButtonBank::new(initial_levels, now, config.ui.debounce()),
            health: LinkHealth::new(config.link.stale_after()),
            tracker: LinkStatusTracker::new(),
            nmea: NmeaOutput::new(config.nmea.output(), now),
            display,
            render_interval: config.ui.render_interval(),
            last_render: None,
            last_report: now,
        }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    pub fn machine(&self) -> &InteractionMachine {
        &self.machine
    }

    /// Run one tick of the loop
    pub fn tick(&mut self, now: Instant, levels: ButtonLevels, snapshot: &LinkSnapshot) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let events = self.buttons.poll(levels, now);
        for effect in self.machine.step(&events, now, &mut self.settings, self.store.as_mut()) {
            match effect {
                Effect::Retune(channel) => outcome.retune = Some(channel),
                Effect::SaveFailed(reason) => warn!("Calibration kept in memory only: {}", reason),
                Effect::EnteredConfig | Effect::ExitedConfig | Effect::Saved => {}
            }
        }

        let fresh = self.health.fresh_frame(snapshot, now);
        if let Some(frame) = fresh {
            let measurement = derive(&frame, &self.settings);
            self.nmea.record(measurement.direction_deg, measurement.speed);
        }
        let valid = fresh.map(|f| f.direction_valid()).unwrap_or(false);
        outcome.sentence = self.nmea.tick(now, valid);

        let render_due = self
            .last_render
            .map(|t| now.saturating_duration_since(t) >= self.render_interval)
            .unwrap_or(true);
        if render_due {
            self.last_render = Some(now);
            let view = View::build(&self.machine, &self.settings, snapshot, &self.health, now);
            if let Err(e) = self.display.render(&view) {
                warn!("Render failed: {}", e);
            }
        }

        if now.saturating_duration_since(self.last_report) >= REPORT_INTERVAL {
            self.last_report = now;
            let report = self.tracker.observe(&self.health, snapshot, now);
            log_report(&report);
            outcome.report = Some(report);
        }

        outcome
    }
}

fn log_report(report: &LinkReport) {
    info!(
        "Link: +{} pkt/s ok={} age={}ms seq={} lost={} bad_crc={} bad_len={} bad_magic={}",
        report.datagrams,
        report.fresh as u8,
        report.age.map(|a| a.as_millis()).unwrap_or(0),
        report.last_seq.unwrap_or(0),
        report.counters.lost,
        report.counters.bad_crc,
        report.counters.bad_length,
        report.counters.bad_magic,
    );

    match report.transition {
        Some(LinkTransition::Online) => info!("Link ONLINE"),
        Some(LinkTransition::Offline) => warn!("Link OFFLINE"),
        None => {}
    }
}
