//! Scheduled Entry Points
//!
//! ## Overview
//!
//! The external scheduler calls one of three entry points with no arguments:
//!
//! | Entry point                 | Cadence | Reads              | Writes                 |
//! |-----------------------------|---------|--------------------|------------------------|
//! | [`Engine::run_evaluation`]  | hourly  | trailing 4 h       | liveness, cooldowns    |
//! | [`Engine::run_weekly_report`] | weekly | trailing 7 days   | nothing                |
//! | [`Engine::run_monthly_calibration`] | monthly | full history | thresholds per season |
//!
//! ## Evaluation Run
//!
//! ```text
//! snapshot read ──ok──► liveness ─► efficiency ─► spike ─┐
//!       │                                                ├─► pressure ─► dispatch
//!       └──err───► reading_store alert (edge) ───────────┘
//! ```
//!
//! All evaluators work on one immutable snapshot fetched once per run. Each
//! stage runs only while the run budget remains; alerts raised before the
//! budget ran out are still dispatched. A failing stage is logged and
//! skipped; the others proceed.
//!
//! ## Errors
//!
//! A run returns `Err` only when nothing could run at all: the Reading Store
//! read failed and no pressure check ran either (evaluation), or the data the
//! whole run depends on could not be read (report, calibration).

use log::{debug, info, warn};
use std::time::Duration as StdDuration;

use crate::alerts::{Alert, AlertDispatcher, DispatchReport};
use crate::calibration::{CalibrationReport, SeasonalCalibrator};
use crate::config::EngineConfig;
use crate::efficiency::{EfficiencyAlertGate, EfficiencyEvaluator, Evaluation};
use crate::errors::{EngineError, EngineResult};
use crate::filters;
use crate::liveness::LivenessMonitor;
use crate::pressure::PressureTrendMonitor;
use crate::reading::Reading;
use crate::report::WeeklyReport;
use crate::season::{CalendarSeasons, SeasonRule};
use crate::spike::IndoorSpikeDetector;
use crate::store::{MemoryStore, StateStore};
use crate::thresholds::{EfficiencyThresholds, SeasonalThresholds};
use crate::time::{Deadline, SystemClock, TimeSource, Timestamp};
use crate::traits::{AlertTransport, FilterLog, PressureSource, ReadingSource};

/// Which entry point produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Evaluation,
    WeeklyReport,
    MonthlyCalibration,
}

/// Named step of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Liveness,
    Efficiency,
    Spike,
    Pressure,
    Reminders,
}

/// Outcome of one scheduled invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub kind: RunKind,
    pub started_at: Timestamp,
    /// Every alert raised, in the order evaluators raised them
    pub alerts: Vec<Alert>,
    pub dispatch: DispatchReport,
    /// Stages that did not run, with the reason
    pub skipped: Vec<(Stage, String)>,
    pub efficiency: Option<Evaluation>,
    pub calibration: Option<CalibrationReport>,
}

impl RunSummary {
    fn new(kind: RunKind, started_at: Timestamp) -> Self {
        Self {
            kind,
            started_at,
            alerts: Vec::new(),
            dispatch: DispatchReport::default(),
            skipped: Vec::new(),
            efficiency: None,
            calibration: None,
        }
    }

    fn skip(&mut self, stage: Stage, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Skipping {:?}: {}", stage, reason);
        self.skipped.push((stage, reason));
    }

    /// True while the run budget lasts; records `stage` as skipped otherwise
    fn within_budget(&mut self, stage: Stage, deadline: &Deadline) -> bool {
        if deadline.expired() {
            self.skip(stage, "run budget exhausted");
            return false;
        }
        debug!("{:?}: {:?} of run budget left", stage, deadline.remaining());
        true
    }

    pub fn was_skipped(&self, stage: Stage) -> bool {
        self.skipped.iter().any(|(s, _)| *s == stage)
    }
}

/// The alert-decision engine with its collaborators
pub struct Engine {
    config: EngineConfig,
    clock: Box<dyn TimeSource>,
    store: Box<dyn StateStore>,
    readings: Box<dyn ReadingSource>,
    filter_log: Option<Box<dyn FilterLog>>,
    pressure: Option<Box<dyn PressureSource>>,
    transport: Box<dyn AlertTransport>,
    seasons: Box<dyn SeasonRule>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(StdDuration::from_secs(self.config.run_budget_secs))
    }

    fn thresholds_at(&self, now: Timestamp) -> EfficiencyThresholds {
        SeasonalThresholds::load(self.store.as_ref(), &self.config.efficiency.defaults)
            .get(self.seasons.season_of(now))
    }

    /// Hourly evaluation at the clock's current time
    pub fn run_evaluation(&mut self) -> EngineResult<RunSummary> {
        let now = self.clock.now();
        self.run_evaluation_at(now)
    }

    /// Hourly evaluation as of `now`
    pub fn run_evaluation_at(&mut self, now: Timestamp) -> EngineResult<RunSummary> {
        let deadline = self.deadline();
        let mut summary = RunSummary::new(RunKind::Evaluation, now);

        let lookback = self.config.efficiency.window().max(self.config.liveness.window());
        let liveness = LivenessMonitor::new(&self.config.liveness);
        let snapshot = self.readings.readings_since(now - lookback);

        let store_error = match snapshot {
            Ok(rows) => {
                debug!("Evaluation snapshot: {} rows", rows.len());
                match liveness.record_store_success(self.store.as_mut(), now) {
                    Ok(alert) => summary.alerts.extend(alert),
                    Err(err) => warn!("Could not record Reading Store recovery: {}", err),
                }
                self.evaluate_rows(&rows, &liveness, &deadline, &mut summary, now);
                None
            }
            Err(err) => {
                warn!("Reading Store read failed: {}", err);
                match liveness.record_store_failure(&err, self.store.as_mut(), now) {
                    Ok(alert) => summary.alerts.extend(alert),
                    Err(store_err) => warn!("Could not record Reading Store failure: {}", store_err),
                }
                for stage in [Stage::Liveness, Stage::Efficiency, Stage::Spike] {
                    summary.skip(stage, format!("Reading Store unavailable: {}", err));
                }
                Some(err)
            }
        };

        self.check_pressure(&deadline, &mut summary, now);
        self.finish(&mut summary);

        match store_error {
            Some(err) if summary.was_skipped(Stage::Pressure) => Err(err),
            _ => Ok(summary),
        }
    }

    fn evaluate_rows(
        &mut self,
        rows: &[Reading],
        liveness: &LivenessMonitor,
        deadline: &Deadline,
        summary: &mut RunSummary,
        now: Timestamp,
    ) {
        if summary.within_budget(Stage::Liveness, deadline) {
            let report = liveness.check(rows, self.store.as_mut(), now);
            if !report.failed.is_empty() {
                warn!("Liveness state not recorded for {} sensor(s)", report.failed.len());
            }
            summary.alerts.extend(report.alerts);
        }

        if summary.within_budget(Stage::Efficiency, deadline) {
            let window_start = now - self.config.efficiency.window();
            let window: Vec<Reading> = rows
                .iter()
                .filter(|r| r.timestamp >= window_start && r.timestamp <= now)
                .cloned()
                .collect();
            let thresholds = self.thresholds_at(now);
            let evaluation =
                EfficiencyEvaluator::new(self.config.efficiency.min_readings).evaluate(&window, &thresholds);
            match &evaluation {
                Evaluation::Scored(score) => {
                    info!(
                        "Efficiency {:.1}% from {} readings: {:?}",
                        score.median_efficiency, score.sample_count, score.status
                    );
                    let gate = EfficiencyAlertGate::new(self.config.efficiency.alert_cooldown());
                    match gate.check(score, self.store.as_mut(), now) {
                        Ok(alert) => summary.alerts.extend(alert),
                        Err(err) => summary.skip(Stage::Efficiency, err.to_string()),
                    }
                }
                Evaluation::InsufficientData { available, required } => {
                    info!(
                        "Efficiency: insufficient confident data ({} of {} readings)",
                        available, required
                    );
                }
            }
            summary.efficiency = Some(evaluation);
        }

        if !summary.within_budget(Stage::Spike, deadline) {
            return;
        }
        if let Some(latest) = IndoorSpikeDetector::latest(rows) {
            let detector = IndoorSpikeDetector::new(&self.config.spike);
            match detector.check(latest, self.store.as_mut(), now) {
                Ok(alert) => summary.alerts.extend(alert),
                Err(err) => summary.skip(Stage::Spike, err.to_string()),
            }
        }
    }

    fn check_pressure(&self, deadline: &Deadline, summary: &mut RunSummary, now: Timestamp) {
        let config = &self.config.pressure;
        if !config.enabled {
            summary.skip(Stage::Pressure, "disabled");
            return;
        }
        let Some(source) = &self.pressure else {
            summary.skip(Stage::Pressure, "no pressure source configured");
            return;
        };
        if !summary.within_budget(Stage::Pressure, deadline) {
            return;
        }
        match source.pressure_series(now, config.window(), config.forecast()) {
            Ok(samples) => {
                let monitor = PressureTrendMonitor::new(config);
                summary.alerts.extend(monitor.check(&samples, now));
            }
            Err(err) => summary.skip(Stage::Pressure, format!("pressure fetch failed: {}", err)),
        }
    }

    fn finish(&mut self, summary: &mut RunSummary) {
        let dispatcher = AlertDispatcher::new(self.config.routing.clone());
        summary.dispatch = dispatcher.dispatch(&summary.alerts, self.transport.as_mut());
        if let Err(err) = self.store.flush() {
            warn!("State store flush failed: {}", err);
        }
        info!(
            "{:?} run: {} alerts, {} digests sent, {} undelivered, {} stages skipped",
            summary.kind,
            summary.alerts.len(),
            summary.dispatch.delivered.len(),
            summary.dispatch.undelivered.len(),
            summary.skipped.len()
        );
    }

    /// Weekly report at the clock's current time
    pub fn run_weekly_report(&mut self) -> EngineResult<RunSummary> {
        let now = self.clock.now();
        self.run_weekly_report_at(now)
    }

    pub fn run_weekly_report_at(&mut self, now: Timestamp) -> EngineResult<RunSummary> {
        let deadline = self.deadline();
        let mut summary = RunSummary::new(RunKind::WeeklyReport, now);

        let since = now - chrono::Duration::days(self.config.report.days);
        let rows = self.readings.readings_since(since)?;

        let thresholds = self.thresholds_at(now);
        let evaluation =
            EfficiencyEvaluator::new(self.config.efficiency.min_readings).evaluate(&rows, &thresholds);
        let report = WeeklyReport::build(&rows, evaluation, &self.config.report, now);
        summary.alerts.push(report.to_alert());
        summary.efficiency = Some(evaluation);

        if self.config.filters.is_empty() {
            debug!("No filter reminder rules configured");
        } else if summary.within_budget(Stage::Reminders, &deadline) {
            match &self.filter_log {
                Some(log) => match log.filter_changes() {
                    Ok(records) => summary
                        .alerts
                        .extend(filters::reminders(&self.config.filters, &records, now)),
                    Err(err) => summary.skip(Stage::Reminders, format!("filter log unavailable: {}", err)),
                },
                None => summary.skip(Stage::Reminders, "no filter log configured"),
            }
        }

        self.finish(&mut summary);
        Ok(summary)
    }

    /// Monthly calibration at the clock's current time
    pub fn run_monthly_calibration(&mut self) -> EngineResult<RunSummary> {
        let now = self.clock.now();
        self.run_monthly_calibration_at(now)
    }

    pub fn run_monthly_calibration_at(&mut self, now: Timestamp) -> EngineResult<RunSummary> {
        let deadline = self.deadline();
        let mut summary = RunSummary::new(RunKind::MonthlyCalibration, now);

        let history = self.readings.all_readings()?;
        let current = SeasonalThresholds::load(self.store.as_ref(), &self.config.efficiency.defaults);
        let calibrator = SeasonalCalibrator::new(self.config.calibration.clone());
        let report = calibrator.calibrate(&history, &current, self.seasons.as_ref(), now);

        if deadline.expired() {
            return Err(EngineError::Source(
                "run budget exhausted before calibration could be persisted".into(),
            ));
        }
        let written = calibrator.persist(&report, self.store.as_mut())?;
        info!("Calibration over {} readings updated {} seasons", history.len(), written.len());

        summary.calibration = Some(report);
        Ok(summary)
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Box<dyn TimeSource>,
    store: Box<dyn StateStore>,
    readings: Option<Box<dyn ReadingSource>>,
    filter_log: Option<Box<dyn FilterLog>>,
    pressure: Option<Box<dyn PressureSource>>,
    transport: Option<Box<dyn AlertTransport>>,
    seasons: Box<dyn SeasonRule>,
}

impl EngineBuilder {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: Box::new(SystemClock),
            store: Box::new(MemoryStore::new()),
            readings: None,
            filter_log: None,
            pressure: None,
            transport: None,
            seasons: Box::new(CalendarSeasons),
        }
    }

    pub fn clock(mut self, clock: impl TimeSource + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn readings(mut self, source: impl ReadingSource + 'static) -> Self {
        self.readings = Some(Box::new(source));
        self
    }

    pub fn filter_log(mut self, log: impl FilterLog + 'static) -> Self {
        self.filter_log = Some(Box::new(log));
        self
    }

    pub fn pressure(mut self, source: impl PressureSource + 'static) -> Self {
        self.pressure = Some(Box::new(source));
        self
    }

    pub fn transport(mut self, transport: impl AlertTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn seasons(mut self, rule: impl SeasonRule + 'static) -> Self {
        self.seasons = Box::new(rule);
        self
    }

    /// Validate the configuration and assemble the engine
    pub fn build(self) -> EngineResult<Engine> {
        self.config.validate()?;
        let readings = self
            .readings
            .ok_or_else(|| EngineError::Config("a reading source is required".into()))?;
        let transport = self
            .transport
            .ok_or_else(|| EngineError::Config("an alert transport is required".into()))?;
        Ok(Engine {
            config: self.config,
            clock: self.clock,
            store: self.store,
            readings,
            filter_log: self.filter_log,
            pressure: self.pressure,
            transport,
            seasons: self.seasons,
        })
    }
}
