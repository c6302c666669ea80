// src/plot.rs

use crate::audiometry::{audible, ceiling, discretize, is_defined};
use crate::models::{Case, Ear, PlotKey, PlotPoint, Transducer};
use log::debug;
use std::collections::BTreeMap;

/// A click on the audiogram, before discretization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub ear: Ear,
    pub transducer: Transducer,
    pub masked: bool,
    pub frequency: u32,
    pub db_raw: f64,
    pub mask_level: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed(PlotPoint),
    /// Undefined coordinate (BC at 125/8000 Hz); the lamp should be suppressed.
    Suppressed,
}

/// The learner's audiogram, one point per (ear, transducer, masked, frequency).
#[derive(Debug, Clone, Default)]
pub struct PlotState {
    points: BTreeMap<PlotKey, PlotPoint>,
}

impl PlotState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&mut self, case: &Case, p: &Placement) -> PlaceOutcome {
        let ceil = match ceiling(p.transducer, p.frequency) {
            Some(c) if is_defined(p.transducer, p.frequency) => c,
            _ => {
                debug!("[Plot] {}-{} undefined at {} Hz, suppressed", p.ear, p.transducer, p.frequency);
                return PlaceOutcome::Suppressed;
            }
        };

        let mut db = discretize(p.db_raw);
        let mut so = false;
        if db >= ceil {
            db = ceil;
            so = !audible(case, p.ear, p.transducer, p.frequency, ceil, p.masked, p.mask_level).heard;
        }

        let point = PlotPoint {
            ear: p.ear,
            transducer: p.transducer,
            masked: p.masked,
            frequency: p.frequency,
            db,
            so,
        };
        if let Some(prev) = self.points.insert(point.key(), point) {
            debug!("[Plot] Replaced {:?} with {} dB (so: {})", prev.key(), db, so);
        }
        PlaceOutcome::Placed(point)
    }

    pub fn remove(&mut self, ear: Ear, transducer: Transducer, masked: bool, frequency: u32) -> Option<PlotPoint> {
        self.points.remove(&PlotKey {
            ear,
            transducer,
            masked,
            frequency,
        })
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn get(&self, key: &PlotKey) -> Option<&PlotPoint> {
        self.points.get(key)
    }

    /// The learner's final threshold at a coordinate, preferring the masked point.
    pub fn final_threshold(&self, ear: Ear, transducer: Transducer, frequency: u32) -> Option<&PlotPoint> {
        let key = |masked| PlotKey {
            ear,
            transducer,
            masked,
            frequency,
        };
        self.points.get(&key(true)).or_else(|| self.points.get(&key(false)))
    }

    /// One plotted series, ordered by frequency.
    pub fn series(&self, ear: Ear, transducer: Transducer, masked: bool) -> Vec<PlotPoint> {
        let mut out: Vec<PlotPoint> = self
            .points
            .values()
            .filter(|p| p.ear == ear && p.transducer == transducer && p.masked == masked)
            .copied()
            .collect();
        out.sort_by_key(|p| p.frequency);
        out
    }

    pub fn points(&self) -> impl Iterator<Item = &PlotPoint> {
        self.points.values()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::find_case;

    fn click(ear: Ear, transducer: Transducer, frequency: u32, db_raw: f64) -> Placement {
        Placement {
            ear,
            transducer,
            masked: false,
            frequency,
            db_raw,
            mask_level: crate::constants::MASK_OFF,
        }
    }

    #[test]
    fn placement_snaps_and_replaces() {
        let case = find_case("A").unwrap();
        let mut plot = PlotState::new();
        plot.place(case, &click(Ear::R, Transducer::AC, 1000, 7.0));
        plot.place(case, &click(Ear::R, Transducer::AC, 1000, 13.0));
        assert_eq!(plot.len(), 1);
        assert_eq!(plot.series(Ear::R, Transducer::AC, false)[0].db, 15);
    }

    #[test]
    fn above_ceiling_promotes_to_scale_out_only_when_silent() {
        let case = find_case("A").unwrap();
        let mut plot = PlotState::new();
        match plot.place(case, &click(Ear::L, Transducer::AC, 125, 90.0)) {
            PlaceOutcome::Placed(p) => {
                assert_eq!(p.db, 70);
                assert!(p.so);
            }
            other => panic!("unexpected {:?}", other),
        }
        // R-AC 2000 threshold is 70, so the 110 dB ceiling is audible.
        match plot.place(case, &click(Ear::R, Transducer::AC, 2000, 125.0)) {
            PlaceOutcome::Placed(p) => {
                assert_eq!(p.db, 110);
                assert!(!p.so);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bc_at_edge_frequencies_is_suppressed() {
        let case = find_case("A").unwrap();
        let mut plot = PlotState::new();
        assert_eq!(plot.place(case, &click(Ear::R, Transducer::BC, 125, 20.0)), PlaceOutcome::Suppressed);
        assert_eq!(plot.place(case, &click(Ear::L, Transducer::BC, 8000, 20.0)), PlaceOutcome::Suppressed);
        assert!(plot.is_empty());
    }

    #[test]
    fn masked_and_unmasked_points_coexist() {
        let case = find_case("A").unwrap();
        let mut plot = PlotState::new();
        plot.place(case, &click(Ear::R, Transducer::BC, 2000, 40.0));
        let mut masked = click(Ear::R, Transducer::BC, 2000, 70.0);
        masked.masked = true;
        masked.mask_level = 60;
        plot.place(case, &masked);
        assert_eq!(plot.len(), 2);
        assert_eq!(plot.final_threshold(Ear::R, Transducer::BC, 2000).unwrap().db, 70);
        assert!(plot.remove(Ear::R, Transducer::BC, true, 2000).is_some());
        assert_eq!(plot.final_threshold(Ear::R, Transducer::BC, 2000).unwrap().db, 40);
        plot.clear();
        assert!(plot.is_empty());
    }
}
