// src/scoring.rs

use crate::audiometry::{ceiling, is_defined};
use crate::models::{Case, CaseProgress, PlotPoint, Progress, Score, ThresholdEntry};
use crate::plot::PlotState;
use chrono::{DateTime, Utc};
use log::{debug, info};

/// The (dB, so) pair a correct plot must show for a ground-truth entry.
/// Thresholds beyond the transducer limit can only be plotted as scale-out.
pub fn expected_mark(entry: &ThresholdEntry) -> Option<(i32, bool)> {
    if !is_defined(entry.transducer, entry.frequency) {
        return None;
    }
    let ceil = ceiling(entry.transducer, entry.frequency)?;
    if entry.so || entry.db > ceil {
        Some((ceil, true))
    } else {
        Some((entry.db, false))
    }
}

pub fn is_match(entry: &ThresholdEntry, point: &PlotPoint) -> bool {
    expected_mark(entry).map_or(false, |(db, so)| point.db == db && point.so == so)
}

/// Rounded percentage, halves up; 0 when nothing was scored.
pub fn accuracy(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (200 * correct + total) / (2 * total)
}

/// Compares the learner's final thresholds against the hidden answer.
/// The masked flag on plotted points is ignored.
pub fn score(case: &Case, plot: &PlotState) -> Score {
    let mut total = 0;
    let mut correct = 0;
    for entry in &case.thresholds {
        if expected_mark(entry).is_none() {
            continue;
        }
        total += 1;
        let hit = plot
            .final_threshold(entry.ear, entry.transducer, entry.frequency)
            .map_or(false, |p| is_match(entry, p));
        if hit {
            correct += 1;
        } else {
            debug!(
                "[Score] Miss {}-{} {} Hz (answer {}{})",
                entry.ear,
                entry.transducer,
                entry.frequency,
                entry.db,
                if entry.so { " SO" } else { "" }
            );
        }
    }
    Score {
        total,
        correct,
        accuracy: accuracy(correct, total),
    }
}

impl Progress {
    pub fn record_session(&mut self, now: DateTime<Utc>) {
        self.total_sessions += 1;
        self.last_session_date = Some(now);
    }

    pub fn record_score(&mut self, case_id: &str, score: Score, now: DateTime<Utc>) {
        self.cases.insert(
            case_id.to_string(),
            CaseProgress {
                total: score.total,
                correct: score.correct,
                accuracy: score.accuracy,
                completed_at: now,
            },
        );
        if !self.completed_cases.iter().any(|c| c == case_id) {
            self.completed_cases.push(case_id.to_string());
        }
        info!(
            "[Progress] Case {}: {}/{} ({}%), {} case(s) completed",
            case_id,
            score.correct,
            score.total,
            score.accuracy,
            self.completed_cases.len()
        );
    }

    /// Mean accuracy over completed cases.
    pub fn overall_accuracy(&self) -> u32 {
        if self.cases.is_empty() {
            return 0;
        }
        let sum: u32 = self.cases.values().map(|c| c.accuracy).sum();
        let n = self.cases.len() as u32;
        (2 * sum + n) / (2 * n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::find_case;
    use crate::constants::MASK_OFF;
    use crate::models::{Ear, Transducer};
    use crate::plot::Placement;
    use chrono::TimeZone;

    fn place(plot: &mut PlotState, case: &Case, ear: Ear, transducer: Transducer, masked: bool, frequency: u32, db: i32) {
        plot.place(
            case,
            &Placement {
                ear,
                transducer,
                masked,
                frequency,
                db_raw: db as f64,
                mask_level: if masked { 65 } else { MASK_OFF },
            },
        );
    }

    #[test]
    fn accuracy_rounds_like_a_percentage() {
        assert_eq!(accuracy(0, 0), 0);
        assert_eq!(accuracy(1, 3), 33);
        assert_eq!(accuracy(2, 3), 67);
        assert_eq!(accuracy(1, 8), 13);
        assert_eq!(accuracy(5, 5), 100);
    }

    #[test]
    fn total_counts_every_defined_answer() {
        let case = find_case("A").unwrap();
        let s = score(case, &PlotState::new());
        assert_eq!(s.total, case.thresholds.len() as u32);
        assert_eq!(s.correct, 0);
    }

    #[test]
    fn masked_flag_is_ignored_when_scoring() {
        let case = find_case("A").unwrap();
        let mut plot = PlotState::new();
        place(&mut plot, case, Ear::R, Transducer::AC, false, 1000, 5);
        place(&mut plot, case, Ear::R, Transducer::BC, true, 2000, 70);
        assert_eq!(score(case, &plot).correct, 2);
    }

    #[test]
    fn scale_out_answers_need_scale_out_marks() {
        let case = find_case("A").unwrap();
        let mut plot = PlotState::new();
        // Beyond-ceiling answer at L-AC 125 Hz.
        place(&mut plot, case, Ear::L, Transducer::AC, false, 125, 90);
        // Explicit SO answer at R-BC 4 kHz; unmasked crossover from the left keeps it audible.
        place(&mut plot, case, Ear::R, Transducer::BC, false, 4000, 60);
        let s = score(case, &plot);
        assert_eq!(s.correct, 1);
        // Masking the left ear removes the crossover, so the ceiling point becomes SO.
        place(&mut plot, case, Ear::R, Transducer::BC, true, 4000, 60);
        assert_eq!(score(case, &plot).correct, 2);
    }

    #[test]
    fn progress_tracks_completion_once_per_case() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut progress = Progress::default();
        progress.record_session(now);
        let s = Score {
            total: 10,
            correct: 7,
            accuracy: 70,
        };
        progress.record_score("A", s, now);
        progress.record_score("A", s, now);
        assert_eq!(progress.completed_cases, vec!["A".to_string()]);
        assert_eq!(progress.total_sessions, 1);
        assert_eq!(progress.overall_accuracy(), 70);
    }
}
