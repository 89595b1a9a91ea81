//! Simulated reader, wipe button, indicators and clock.
//!
//! - `ScriptedReader` replays tag scans at fixed offsets from start
//! - `ScriptedWipeControl` holds the wipe button during scripted windows
//! - `LedAnnunciator` drives an RGB LED + relay model and logs each command
//! - `ManualClock` is a shared clock that only moves when slept or advanced

use bitflags::bitflags;
use gate_common::credential::Identifier;
use gate_common::hal::config::{SimulationEvent, TimingConfig};
use gate_common::hal::driver::{Annunciator, Clock, CredentialReader, HalError, WipeControl};
use gate_common::hal::types::{Annunciation, ReaderInfo};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

bitflags! {
    /// Output lines of the indicator board.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Indicators: u8 {
        /// Red LED lit.
        const RED        = 0x01;
        /// Green LED lit.
        const GREEN      = 0x02;
        /// Blue LED lit.
        const BLUE       = 0x04;
        /// Relay energised (lock open).
        const RELAY_OPEN = 0x08;
    }
}

impl Indicators {
    /// All LED lines.
    pub const LEDS: Self =
        Self::from_bits_truncate(Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits());
}

/// Clock that advances only through `sleep` or `advance`.
///
/// Clones share the same time, so a reader and the controller can be
/// driven from one timeline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

/// Reader that replays scripted scans.
pub struct ScriptedReader<C: Clock> {
    clock: C,
    firmware_version: u8,
    pending: VecDeque<(Duration, Identifier)>,
}

impl<C: Clock> ScriptedReader<C> {
    /// Reader with no scripted scans.
    pub fn new(clock: C, firmware_version: u8) -> Self {
        Self {
            clock,
            firmware_version,
            pending: VecDeque::new(),
        }
    }

    /// Reader replaying the `Scan` entries of `events`.
    pub fn from_events(events: &[SimulationEvent], clock: C, firmware_version: u8) -> Self {
        let mut reader = Self::new(clock, firmware_version);
        for event in events {
            if let SimulationEvent::Scan { at_ms, id } = event {
                reader.schedule(Duration::from_millis(*at_ms), *id);
            }
        }
        reader
    }

    /// Present `id` at `at` (kept in time order).
    pub fn schedule(&mut self, at: Duration, id: Identifier) {
        let index = self.pending.partition_point(|(t, _)| *t <= at);
        self.pending.insert(index, (at, id));
    }

    /// Scans not yet delivered.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl<C: Clock> CredentialReader for ScriptedReader<C> {
    fn init(&mut self) -> Result<ReaderInfo, HalError> {
        debug!(
            "Simulated reader firmware 0x{:02X}, {} scripted scan(s)",
            self.firmware_version,
            self.pending.len()
        );
        Ok(ReaderInfo {
            firmware_version: self.firmware_version,
        })
    }

    fn poll(&mut self) -> Option<Identifier> {
        let now = self.clock.now();
        match self.pending.front() {
            Some((at, _)) if *at <= now => {
                let (_, id) = self.pending.pop_front()?;
                info!("Scanned credential UID: {}", id);
                Some(id)
            }
            _ => None,
        }
    }
}

/// Wipe button held during scripted windows.
pub struct ScriptedWipeControl<C: Clock> {
    clock: C,
    windows: Vec<(Duration, Duration)>,
}

impl<C: Clock> ScriptedWipeControl<C> {
    /// Button that is never pressed.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            windows: Vec::new(),
        }
    }

    /// Button replaying the `WipeHold` entries of `events`.
    pub fn from_events(events: &[SimulationEvent], clock: C) -> Self {
        let mut control = Self::new(clock);
        for event in events {
            if let SimulationEvent::WipeHold { at_ms, hold_ms } = event {
                control.hold(
                    Duration::from_millis(*at_ms),
                    Duration::from_millis(*hold_ms),
                );
            }
        }
        control
    }

    /// Hold the button from `from` for `duration`.
    pub fn hold(&mut self, from: Duration, duration: Duration) {
        self.windows.push((from, from + duration));
    }
}

impl<C: Clock> WipeControl for ScriptedWipeControl<C> {
    fn is_held(&mut self) -> bool {
        let now = self.clock.now();
        self.windows
            .iter()
            .any(|(start, end)| *start <= now && now < *end)
    }
}

/// RGB LED + relay annunciator.
///
/// Patterns block on the clock for their duration. Idle commands are only
/// logged when they differ from the previous command.
pub struct LedAnnunciator<C: Clock> {
    clock: C,
    timing: TimingConfig,
    outputs: Indicators,
    last: Option<Annunciation>,
    grants: u64,
}

impl<C: Clock> LedAnnunciator<C> {
    /// Annunciator with all outputs off and the relay locked.
    pub fn new(timing: TimingConfig, clock: C) -> Self {
        Self {
            clock,
            timing,
            outputs: Indicators::empty(),
            last: None,
            grants: 0,
        }
    }

    /// Current output lines.
    pub fn outputs(&self) -> Indicators {
        self.outputs
    }

    /// Number of relay pulses issued.
    pub fn grants(&self) -> u64 {
        self.grants
    }

    fn set_leds(&mut self, leds: Indicators) {
        self.outputs = (self.outputs - Indicators::LEDS) | leds;
        trace!("Indicators: {:?}", self.outputs);
    }

    fn set_relay_open(&mut self, open: bool) {
        self.outputs.set(Indicators::RELAY_OPEN, open);
    }

    fn wait(&mut self, ms: u64) {
        self.clock.sleep(Duration::from_millis(ms));
    }

    fn blink(&mut self, led: Indicators, times: u32, end_lit: bool) {
        let step = self.timing.blink_ms;
        self.set_leds(Indicators::empty());
        self.wait(step);
        for i in 0..times {
            self.set_leds(led);
            self.wait(step);
            if i + 1 < times || !end_lit {
                self.set_leds(Indicators::empty());
                self.wait(step);
            }
        }
    }

    fn log(&self, command: &Annunciation) {
        let idle = matches!(
            command,
            Annunciation::IdleNormal
                | Annunciation::IdleEnrollmentCycle
                | Annunciation::MasterUndefinedPrompt
        );
        if idle && self.last.as_ref() == Some(command) {
            trace!("{}", command.message());
        } else if command.is_failure() {
            warn!("{}", command.message());
        } else {
            info!("{}", command.message());
        }
    }
}

impl<C: Clock> Annunciator for LedAnnunciator<C> {
    fn annunciate(&mut self, command: &Annunciation) {
        self.log(command);

        match command {
            Annunciation::IdleNormal => {
                self.set_leds(Indicators::BLUE);
                self.set_relay_open(false);
            }
            Annunciation::IdleEnrollmentCycle => {
                let step = self.timing.blink_ms;
                for led in [Indicators::GREEN, Indicators::BLUE, Indicators::RED] {
                    self.set_leds(led);
                    self.wait(step);
                }
            }
            Annunciation::GrantedPulse => {
                self.grants += 1;
                self.set_leds(Indicators::GREEN);
                self.set_relay_open(true);
                let hold = self.timing.grant_hold_ms;
                self.wait(hold);
                self.set_relay_open(false);
            }
            Annunciation::DeniedHold => {
                self.set_leds(Indicators::RED);
                self.set_relay_open(false);
                let hold = self.timing.deny_hold_ms;
                self.wait(hold);
            }
            Annunciation::EnrollEntered { .. } | Annunciation::EnrollExited => {
                self.set_leds(Indicators::empty());
            }
            Annunciation::EnrollAdded => self.blink(Indicators::GREEN, 3, true),
            Annunciation::EnrollRemoved => self.blink(Indicators::BLUE, 3, true),
            Annunciation::EnrollFailed { .. } => self.blink(Indicators::RED, 3, true),
            Annunciation::WipeArmed => {
                self.set_leds(Indicators::RED);
            }
            Annunciation::WipeDone => self.blink(Indicators::RED, 2, false),
            Annunciation::WipeCancelled => self.set_leds(Indicators::empty()),
            Annunciation::MasterUndefinedPrompt => self.blink(Indicators::BLUE, 1, false),
            Annunciation::MasterDefined => self.set_leds(Indicators::empty()),
            Annunciation::Halted => {
                self.set_leds(Indicators::RED);
                self.set_relay_open(false);
            }
        }

        self.last = Some(*command);
    }
}
