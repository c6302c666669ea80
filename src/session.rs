// src/session.rs

use crate::audiometry::{self, audible, ceiling, discretize, discretize_mask, is_bc_frequency, is_valid_frequency};
use crate::cases;
use crate::constants::*;
use crate::error::{Result, TrainerError};
use crate::measurement::{ExportRow, MeasurementLog};
use crate::models::*;
use crate::plot::{PlaceOutcome, Placement, PlotState};
use crate::scoring;
use chrono::Utc;
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    CaseLoaded,
    Measuring,
    Revealed,
    Completed,
}

/// Partial selection change; `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelectionUpdate {
    pub ear: Option<Ear>,
    pub transducer: Option<Transducer>,
    pub frequency: Option<u32>,
    pub level: Option<i32>,
    pub masking: Option<bool>,
    pub mask_level: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    BeginLoad(String),
    FinishLoad,
    LoadCase(String),
    Select(SelectionUpdate),
    StepFrequency(i32),
    /// Place at the current selection level.
    Place,
    /// Place at a raw plot-click level for the current ear, transducer and frequency.
    PlaceAt(f64),
    Remove {
        ear: Ear,
        transducer: Transducer,
        masked: bool,
        frequency: u32,
    },
    ClearPlot,
    ClearLog,
    ToggleAnswer(bool),
    Check,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// A plot action arrived before any case was loaded.
    NoCase,
    LoadStarted(String),
    Loaded(String),
    SelectionChanged(Selection),
    LampSuppressed,
    Placed {
        point: PlotPoint,
        logged: Option<LogEntry>,
    },
    Removed(Option<PlotPoint>),
    Cleared,
    LogCleared,
    AnswerShown(bool),
    Scored(Score),
}

/// The whole training session: one owner for case, selection, plot, log and progress.
#[derive(Debug, Clone)]
pub struct Session {
    phase: SessionPhase,
    case: Option<Case>,
    pending: Option<Case>,
    selection: Selection,
    suppressed: bool,
    answer_visible: bool,
    plot: PlotState,
    log: MeasurementLog,
    progress: Progress,
    last_score: Option<Score>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::restore(Progress::default(), MeasurementLog::new())
    }

    /// Resumes with persisted progress and log; no case is loaded.
    pub fn restore(progress: Progress, log: MeasurementLog) -> Self {
        Session {
            phase: SessionPhase::Idle,
            case: None,
            pending: None,
            selection: Selection::default(),
            suppressed: false,
            answer_visible: false,
            plot: PlotState::new(),
            log,
            progress,
            last_score: None,
        }
    }

    // --- Reducer ---

    pub fn dispatch(&mut self, action: Action) -> Result<Effect> {
        debug!("[Session] {:?} in {:?}", action, self.phase);
        let effect = match action {
            Action::BeginLoad(id) => {
                self.begin_load(&id)?;
                Effect::LoadStarted(id)
            }
            Action::FinishLoad => match self.finish_load() {
                Some(id) => Effect::Loaded(id),
                None => Effect::None,
            },
            Action::LoadCase(id) => {
                self.load_case(&id)?;
                Effect::Loaded(id)
            }
            Action::Select(update) => {
                self.set_selection(update);
                Effect::SelectionChanged(self.selection)
            }
            Action::StepFrequency(dir) => {
                self.step_frequency(dir);
                Effect::SelectionChanged(self.selection)
            }
            Action::Place => self.place_effect(self.selection.level as f64),
            Action::PlaceAt(raw) => self.place_effect(raw),
            Action::Remove {
                ear,
                transducer,
                masked,
                frequency,
            } => Effect::Removed(self.remove(ear, transducer, masked, frequency)),
            Action::ClearPlot => {
                self.clear();
                Effect::Cleared
            }
            Action::ClearLog => {
                self.clear_log();
                Effect::LogCleared
            }
            Action::ToggleAnswer(show) => {
                self.toggle_answer(show);
                Effect::AnswerShown(self.answer_visible)
            }
            Action::Check => Effect::Scored(self.check()),
        };
        Ok(effect)
    }

    fn place_effect(&mut self, db_raw: f64) -> Effect {
        match self.place_at(db_raw) {
            Some((PlaceOutcome::Placed(point), logged)) => Effect::Placed { point, logged },
            Some((PlaceOutcome::Suppressed, _)) => Effect::LampSuppressed,
            None => Effect::NoCase,
        }
    }

    // --- Case Loading ---

    pub fn begin_load(&mut self, id: &str) -> Result<()> {
        if self.pending.is_some() {
            warn!("[Session] Load of '{}' rejected, another case is loading", id);
            return Err(TrainerError::LoadInProgress);
        }
        let case = cases::find_case(id).ok_or_else(|| TrainerError::UnknownCase(id.to_string()))?;
        info!("[Session] Loading case {} ({})", case.id, case.title);
        self.pending = Some(case.clone());
        self.phase = SessionPhase::Loading;
        Ok(())
    }

    /// Installs the pending case. Returns its id, or `None` when nothing was loading.
    pub fn finish_load(&mut self) -> Option<String> {
        let case = self.pending.take()?;
        let id = case.id.clone();
        self.case = Some(case);
        self.plot.clear();
        self.suppressed = false;
        self.answer_visible = false;
        self.last_score = None;
        self.progress.record_session(Utc::now());
        self.phase = SessionPhase::CaseLoaded;
        info!(
            "[Session] Case {} loaded (session #{})",
            id, self.progress.total_sessions
        );
        Some(id)
    }

    pub fn load_case(&mut self, id: &str) -> Result<()> {
        self.begin_load(id)?;
        self.finish_load();
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    // --- Selection ---

    pub fn set_selection(&mut self, update: SelectionUpdate) {
        if let Some(ear) = update.ear {
            if ear != self.selection.ear {
                self.selection.ear = ear;
                self.suppressed = true;
            }
        }
        if let Some(transducer) = update.transducer {
            self.set_transducer(transducer);
        }
        if let Some(frequency) = update.frequency {
            self.set_frequency(frequency);
        }
        if let Some(level) = update.level {
            self.selection.level = discretize(level as f64);
            self.suppressed = false;
        }
        if let Some(on) = update.masking {
            self.selection.masking = on;
            if !on {
                self.selection.mask_level = MASK_OFF;
            }
        }
        if let Some(mask) = update.mask_level {
            self.selection.mask_level = discretize_mask(mask as f64);
        }
        self.clamp_level();
    }

    /// Keeps the presentation level within what the transducer can produce here.
    fn clamp_level(&mut self) {
        let sel = &mut self.selection;
        if let Some(ceil) = ceiling(sel.transducer, sel.frequency) {
            if sel.level > ceil {
                debug!("[Session] Level {} dB above {} ceiling, clamped to {} dB", sel.level, sel.transducer, ceil);
                sel.level = ceil;
            }
        }
    }

    fn set_transducer(&mut self, transducer: Transducer) {
        if transducer == self.selection.transducer {
            return;
        }
        self.selection.transducer = transducer;
        self.suppressed = true;
        if transducer == Transducer::BC && !is_bc_frequency(self.selection.frequency) {
            let moved = nearest_bc_frequency(self.selection.frequency);
            debug!("[Session] BC undefined at {} Hz, moved to {} Hz", self.selection.frequency, moved);
            self.selection.frequency = moved;
        }
    }

    fn set_frequency(&mut self, frequency: u32) {
        if !is_valid_frequency(frequency) {
            warn!("[Session] Ignoring unknown frequency {} Hz", frequency);
            return;
        }
        if self.selection.transducer == Transducer::BC && !is_bc_frequency(frequency) {
            debug!("[Session] BC undefined at {} Hz, lamp suppressed", frequency);
            self.suppressed = true;
            return;
        }
        if frequency != self.selection.frequency {
            self.selection.frequency = frequency;
            self.suppressed = true;
        }
    }

    /// Moves one audiometric frequency up or down, skipping those BC cannot test.
    pub fn step_frequency(&mut self, direction: i32) {
        let step = direction.signum();
        if step == 0 {
            return;
        }
        let Some(mut idx) = FREQUENCIES.iter().position(|&f| f == self.selection.frequency) else {
            return;
        };
        loop {
            let next = idx as i32 + step;
            if next < 0 || next >= FREQUENCIES.len() as i32 {
                return;
            }
            idx = next as usize;
            let f = FREQUENCIES[idx];
            if self.selection.transducer == Transducer::AC || is_bc_frequency(f) {
                self.selection.frequency = f;
                self.suppressed = true;
                self.clamp_level();
                return;
            }
        }
    }

    // --- Plot ---

    pub fn place(&mut self) -> Option<(PlaceOutcome, Option<LogEntry>)> {
        self.place_at(self.selection.level as f64)
    }

    /// Places a point for the current ear, transducer and frequency. `None` without a case.
    pub fn place_at(&mut self, db_raw: f64) -> Option<(PlaceOutcome, Option<LogEntry>)> {
        let Some(case) = self.case.as_ref() else {
            warn!("[Session] Placement ignored, no case loaded");
            return None;
        };
        let sel = self.selection;
        let masked = sel.masking_effective();
        let placement = Placement {
            ear: sel.ear,
            transducer: sel.transducer,
            masked,
            frequency: sel.frequency,
            db_raw,
            mask_level: sel.mask_level,
        };

        let point = match self.plot.place(case, &placement) {
            PlaceOutcome::Placed(p) => p,
            PlaceOutcome::Suppressed => {
                self.suppressed = true;
                return Some((PlaceOutcome::Suppressed, None));
            }
        };

        self.suppressed = false;
        if self.phase == SessionPhase::CaseLoaded {
            self.phase = SessionPhase::Measuring;
        }

        let response = audible(case, point.ear, point.transducer, point.frequency, point.db, masked, sel.mask_level);
        let logged = if response.heard {
            let entry = self.log.record(&point, sel.mask_level, &case.id, Utc::now()).clone();
            info!(
                "[Session] Logged #{}: {}-{} {} Hz {} dB{}",
                entry.id,
                entry.ear,
                entry.transducer,
                entry.frequency,
                entry.db,
                if masked { format!(" (mask {} dB)", sel.mask_level) } else { String::new() }
            );
            Some(entry)
        } else {
            debug!("[Session] No response at {} dB, nothing logged", point.db);
            None
        };
        Some((PlaceOutcome::Placed(point), logged))
    }

    pub fn remove(&mut self, ear: Ear, transducer: Transducer, masked: bool, frequency: u32) -> Option<PlotPoint> {
        self.plot.remove(ear, transducer, masked, frequency)
    }

    pub fn clear(&mut self) {
        self.plot.clear();
    }

    pub fn clear_log(&mut self) {
        info!("[Session] Measurement log cleared ({} entries)", self.log.len());
        self.log.clear();
    }

    // --- Answer & Scoring ---

    pub fn toggle_answer(&mut self, show: bool) {
        if self.case.is_none() {
            return;
        }
        self.answer_visible = show;
        match (self.phase, show) {
            (SessionPhase::CaseLoaded | SessionPhase::Measuring, true) => self.phase = SessionPhase::Revealed,
            (SessionPhase::Revealed, false) => {
                self.phase = if self.plot.is_empty() {
                    SessionPhase::CaseLoaded
                } else {
                    SessionPhase::Measuring
                };
            }
            _ => {}
        }
    }

    /// Ground truth for display, only while revealed.
    pub fn answer(&self) -> Option<&[ThresholdEntry]> {
        match (&self.case, self.answer_visible) {
            (Some(case), true) => Some(&case.thresholds),
            _ => None,
        }
    }

    pub fn check(&mut self) -> Score {
        let Some(case) = self.case.as_ref() else {
            warn!("[Session] Check requested with no case loaded");
            return Score::default();
        };
        let score = scoring::score(case, &self.plot);
        let id = case.id.clone();
        self.progress.record_score(&id, score, Utc::now());
        self.last_score = Some(score);
        self.phase = SessionPhase::Completed;
        score
    }

    // --- Selectors ---

    /// Response lamp for the current selection.
    pub fn lamp(&self) -> bool {
        if self.suppressed {
            return false;
        }
        match &self.case {
            Some(case) => audiometry::audible_for(case, &self.selection).heard,
            None => false,
        }
    }

    pub fn warnings(&self) -> Warnings {
        match &self.case {
            Some(case) => {
                let a = audiometry::audible_for(case, &self.selection);
                audiometry::warnings(&a, &self.selection)
            }
            None => Warnings::default(),
        }
    }

    pub fn export(&self) -> Vec<ExportRow> {
        self.log.export()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn case(&self) -> Option<&Case> {
        self.case.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn plot(&self) -> &PlotState {
        &self.plot
    }

    pub fn log(&self) -> &MeasurementLog {
        &self.log
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn last_score(&self) -> Option<Score> {
        self.last_score
    }
}

fn nearest_bc_frequency(frequency: u32) -> u32 {
    BC_VALID_FREQUENCIES
        .iter()
        .copied()
        .min_by_key(|f| f.abs_diff(frequency))
        .unwrap_or(DEFAULT_FREQUENCY)
}
