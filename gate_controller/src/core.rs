//! Controller core and control loop management.
//!
//! The `ControllerCore` struct owns the registry, the mode state machine and
//! every collaborator opened by a driver. It boots the controller (reader
//! self-check, boot wipe, master provisioning) and runs the polling loop.

use crate::error::ControllerError;
use crate::registry::CredentialRegistry;
use crate::state::{Mode, ModeStateMachine};
use crate::wipe::{WipeDecision, WipeGuard};
use gate_common::credential::Identifier;
use gate_common::hal::config::{ControllerConfig, WipeScope};
use gate_common::hal::driver::{Annunciator, ByteStore, Clock, CredentialReader, WipeControl};
use gate_common::hal::types::{Annunciation, Peripherals};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counters kept by the control loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Cycles executed.
    pub cycle_count: u64,
    /// Access granted.
    pub grants: u64,
    /// Access denied.
    pub denials: u64,
    /// Credentials added or removed.
    pub enroll_changes: u64,
    /// Add or remove refused.
    pub enroll_failures: u64,
    /// Wipes executed.
    pub wipes: u64,
    /// Wipes cancelled by releasing the control.
    pub wipes_cancelled: u64,
    /// Longest observed cycle, in milliseconds.
    pub max_cycle_time_ms: u64,
}

impl CycleStats {
    fn record(&mut self, annunciation: &Annunciation) {
        match annunciation {
            Annunciation::GrantedPulse => self.grants += 1,
            Annunciation::DeniedHold => self.denials += 1,
            Annunciation::EnrollAdded | Annunciation::EnrollRemoved => self.enroll_changes += 1,
            Annunciation::EnrollFailed { .. } => self.enroll_failures += 1,
            _ => {}
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Identifier polled from the reader this cycle.
    pub scanned: Option<Identifier>,
    /// Command sent to the annunciator for the scan or idle state.
    pub annunciation: Option<Annunciation>,
    /// A wipe was confirmed and executed.
    pub wiped: bool,
    /// Mode after the cycle.
    pub mode: Mode,
}

/// Controller core owning the registry, the mode and the collaborators.
pub struct ControllerCore {
    /// Controller configuration
    config: ControllerConfig,
    /// Credential registry on the opened store
    registry: CredentialRegistry<Box<dyn ByteStore>>,
    /// Tag reader
    reader: Box<dyn CredentialReader>,
    /// Wipe control
    wipe_control: Box<dyn WipeControl>,
    /// Indicator/actuator sink
    annunciator: Box<dyn Annunciator>,
    /// Time source for cycle pacing and the wipe window
    clock: Box<dyn Clock>,
    /// Normal / Enrollment mode
    machine: ModeStateMachine,
    /// Wipe confirmation window
    wipe_guard: WipeGuard,
    /// Running flag for loop control
    running: Arc<AtomicBool>,
    /// Optional end of the run, on the clock's timeline
    deadline: Option<Duration>,
    /// Boot sequence completed
    booted: bool,
    /// Loop statistics
    stats: CycleStats,
}

impl ControllerCore {
    /// Create a controller on the peripherals opened by a driver.
    ///
    /// # Errors
    /// Returns error if configuration validation fails or the store cannot
    /// be read.
    pub fn new(config: ControllerConfig, peripherals: Peripherals) -> Result<Self, ControllerError> {
        config.validate()?;

        let Peripherals {
            store,
            reader,
            wipe_control,
            annunciator,
            clock,
        } = peripherals;

        let registry = CredentialRegistry::open(store)?;
        let wipe_guard = WipeGuard::from_timing(&config.timing);

        info!(
            "ControllerCore created: store={} bytes, {} slots, cycle_time={}ms",
            registry.store().capacity(),
            registry.capacity(),
            config.timing.cycle_time_ms
        );

        Ok(Self {
            config,
            registry,
            reader,
            wipe_control,
            annunciator,
            clock,
            machine: ModeStateMachine::new(),
            wipe_guard,
            running: Arc::new(AtomicBool::new(true)),
            deadline: None,
            booted: false,
            stats: CycleStats::default(),
        })
    }

    /// Boot sequence: reader self-check, boot wipe, master provisioning.
    ///
    /// Blocks until the master is defined or the running flag clears.
    ///
    /// # Errors
    /// `MediumUnavailable` if the reader does not respond or the store fails.
    pub fn boot(&mut self) -> Result<(), ControllerError> {
        info!("Booting controller...");

        let info = match self.reader.init() {
            Ok(info) if info.is_responding() => info,
            Ok(info) => {
                return Err(self.halt(ControllerError::MediumUnavailable(format!(
                    "reader not responding (firmware 0x{:02X})",
                    info.firmware_version
                ))));
            }
            Err(e) => {
                return Err(self.halt(ControllerError::MediumUnavailable(e.to_string())));
            }
        };
        info!(
            "Reader firmware 0x{:02X} ({})",
            info.firmware_version,
            info.describe()
        );

        if self.wipe_control.is_held() {
            warn!("Wipe control held at boot");
            self.guarded(|core| core.run_wipe(WipeScope::Full))?;
        }

        self.guarded(Self::provision)?;
        match self.registry.master() {
            Some(master) => info!("Master credential UID: {}", master),
            None => info!("Boot interrupted before a master was defined"),
        }

        self.booted = true;
        info!("Controller booted in {} mode", self.machine.mode());
        Ok(())
    }

    /// Execute one control cycle.
    ///
    /// Polls the reader, runs the wipe protocol if the control is held, then
    /// interprets the scan (or emits the idle pattern). A confirmed wipe
    /// discards the scan and re-runs provisioning.
    pub fn cycle(&mut self) -> Result<CycleReport, ControllerError> {
        self.stats.cycle_count += 1;

        if !self.registry.is_provisioned() {
            self.provision()?;
            if !self.registry.is_provisioned() {
                return Ok(self.report(None, None, false));
            }
        }

        let scanned = self.reader.poll();

        if self.wipe_control.is_held() && self.run_wipe(self.config.wipe.runtime_scope)? {
            if let Some(id) = scanned {
                debug!("Discarding scan {} captured before wipe", id);
            }
            self.provision()?;
            return Ok(self.report(scanned, None, true));
        }

        let annunciation = match scanned {
            None => self.machine.idle_annunciation(),
            Some(id) => self.machine.handle_scan(&mut self.registry, id)?,
        };
        self.annunciator.annunciate(&annunciation);
        self.stats.record(&annunciation);

        Ok(self.report(scanned, Some(annunciation), false))
    }

    /// Run the control loop.
    ///
    /// Boots first if needed, then cycles at `cycle_time_ms` until the
    /// running flag clears or `limit` elapses.
    ///
    /// # Errors
    /// Returns the fatal error that halted the loop.
    pub fn run(&mut self, limit: Option<Duration>) -> Result<(), ControllerError> {
        self.deadline = limit.map(|l| self.clock.now() + l);

        if !self.booted {
            self.boot()?;
        }

        let cycle_time = self.config.timing.cycle_time();
        info!(
            "Starting control loop (cycle_time={}ms)...",
            cycle_time.as_millis()
        );

        while self.should_continue() {
            let cycle_start = self.clock.now();

            self.guarded(Self::cycle)?;

            let elapsed = self.clock.now().saturating_sub(cycle_start);
            let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            if elapsed_ms > self.stats.max_cycle_time_ms {
                self.stats.max_cycle_time_ms = elapsed_ms;
            }

            if elapsed < cycle_time {
                self.clock.sleep(cycle_time - elapsed);
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Control loop: {} cycles, max={}ms, mode={}",
                    self.stats.cycle_count,
                    self.stats.max_cycle_time_ms,
                    self.machine.mode()
                );
            }
        }

        info!(
            "Control loop stopped after {} cycles ({} granted, {} denied)",
            self.stats.cycle_count, self.stats.grants, self.stats.denials
        );
        Ok(())
    }

    /// Request shutdown of the control loop.
    pub fn shutdown(&mut self) {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    /// Credential registry.
    pub fn registry(&self) -> &CredentialRegistry<Box<dyn ByteStore>> {
        &self.registry
    }

    /// Loop statistics.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Block until a credential is scanned and store it as master.
    ///
    /// Returns without provisioning if the running flag clears or the run
    /// deadline passes first.
    fn provision(&mut self) -> Result<(), ControllerError> {
        if self.registry.is_provisioned() {
            return Ok(());
        }

        warn!("No master credential defined");
        self.annunciator
            .annunciate(&Annunciation::MasterUndefinedPrompt);

        let poll_interval = self.config.timing.cycle_time();
        while self.should_continue() {
            if let Some(id) = self.reader.poll() {
                self.registry.define_master(id)?;
                info!("Master credential defined: {}", id);
                self.annunciator.annunciate(&Annunciation::MasterDefined);
                return Ok(());
            }
            self.clock.sleep(poll_interval);
        }
        Ok(())
    }

    /// Run the confirmation window and wipe if confirmed.
    ///
    /// Returns true if the wipe executed. The mode is reset to Normal after
    /// a wipe.
    fn run_wipe(&mut self, scope: WipeScope) -> Result<bool, ControllerError> {
        self.annunciator.annunciate(&Annunciation::WipeArmed);

        let decision = self
            .wipe_guard
            .confirm(self.wipe_control.as_mut(), self.clock.as_mut());

        match decision {
            WipeDecision::Confirmed => {
                match scope {
                    WipeScope::Full => {
                        let written = self.registry.wipe()?;
                        info!("Full wipe complete ({} bytes rewritten)", written);
                    }
                    WipeScope::MasterOnly => {
                        self.registry.clear_master()?;
                        info!("Master credential cleared, enrolled credentials kept");
                    }
                }
                self.machine.reset();
                self.stats.wipes += 1;
                self.annunciator.annunciate(&Annunciation::WipeDone);
                Ok(true)
            }
            WipeDecision::Cancelled => {
                self.stats.wipes_cancelled += 1;
                self.annunciator.annunciate(&Annunciation::WipeCancelled);
                Ok(false)
            }
        }
    }

    /// Run `step`, halting the controller on failure.
    fn guarded<T>(
        &mut self,
        step: impl FnOnce(&mut Self) -> Result<T, ControllerError>,
    ) -> Result<T, ControllerError> {
        step(self).map_err(|e| self.halt(e))
    }

    /// Annunciate the halt and stop the loop.
    fn halt(&mut self, err: ControllerError) -> ControllerError {
        error!("Controller halted: {}", err);
        self.annunciator.annunciate(&Annunciation::Halted);
        self.running.store(false, Ordering::SeqCst);
        err
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.deadline.is_none_or(|deadline| self.clock.now() < deadline)
    }

    fn report(
        &self,
        scanned: Option<Identifier>,
        annunciation: Option<Annunciation>,
        wiped: bool,
    ) -> CycleReport {
        CycleReport {
            scanned,
            annunciation,
            wiped,
            mode: self.machine.mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::{ManualClock, MemoryStore, ScriptedReader, ScriptedWipeControl};
    use std::cell::RefCell;
    use std::rc::Rc;

    const MASTER: Identifier = Identifier::new([0x11, 0x22, 0x33, 0x44]);
    const CARD: Identifier = Identifier::new([0xAA, 0xBB, 0xCC, 0xDD]);

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Annunciation>>>);

    impl Annunciator for Recorder {
        fn annunciate(&mut self, command: &Annunciation) {
            self.0.borrow_mut().push(*command);
        }
    }

    fn core_with(
        reader_version: u8,
        scans: &[(u64, Identifier)],
    ) -> (ControllerCore, ManualClock, Recorder) {
        let clock = ManualClock::new();
        let mut reader = ScriptedReader::new(clock.clone(), reader_version);
        for (at_ms, id) in scans {
            reader.schedule(Duration::from_millis(*at_ms), *id);
        }
        let recorder = Recorder::default();
        let peripherals = Peripherals {
            store: Box::new(MemoryStore::new(64)),
            reader: Box::new(reader),
            wipe_control: Box::new(ScriptedWipeControl::new(clock.clone())),
            annunciator: Box::new(recorder.clone()),
            clock: Box::new(clock.clone()),
        };
        let core = ControllerCore::new(ControllerConfig::default(), peripherals).unwrap();
        (core, clock, recorder)
    }

    #[test]
    fn boot_provisions_first_scan_as_master() {
        let (mut core, _clock, recorder) = core_with(0x92, &[(100, MASTER)]);
        core.boot().unwrap();

        assert_eq!(core.registry().master(), Some(MASTER));
        assert_eq!(
            recorder.0.borrow().as_slice(),
            &[Annunciation::MasterUndefinedPrompt, Annunciation::MasterDefined]
        );
    }

    #[test]
    fn silent_reader_halts_boot() {
        let (mut core, _clock, recorder) = core_with(0x00, &[]);
        let err = core.boot().unwrap_err();

        assert!(err.is_medium_failure());
        assert_eq!(recorder.0.borrow().as_slice(), &[Annunciation::Halted]);
        assert!(!core.running_flag().load(Ordering::SeqCst));
    }

    #[test]
    fn idle_cycle_reports_mode_pattern() {
        let (mut core, _clock, _recorder) = core_with(0x91, &[(0, MASTER)]);
        core.boot().unwrap();

        let report = core.cycle().unwrap();
        assert_eq!(report.scanned, None);
        assert_eq!(report.annunciation, Some(Annunciation::IdleNormal));
        assert_eq!(report.mode, Mode::Normal);
    }

    #[test]
    fn run_stops_at_limit_and_counts() {
        let (mut core, _clock, _recorder) =
            core_with(0x92, &[(0, MASTER), (200, CARD), (400, MASTER)]);
        core.run(Some(Duration::from_secs(1))).unwrap();

        // 50 ms cycles over the remaining second.
        assert!(core.stats().cycle_count >= 19);
        assert_eq!(core.stats().denials, 1);
        assert_eq!(core.mode(), Mode::Enrollment);
    }

    #[test]
    fn cleared_running_flag_interrupts_provisioning() {
        let (mut core, _clock, _recorder) = core_with(0x92, &[]);
        core.shutdown();
        core.boot().unwrap();

        assert!(!core.registry().is_provisioned());
        let report = core.cycle().unwrap();
        assert_eq!(report.annunciation, None);
    }
}
