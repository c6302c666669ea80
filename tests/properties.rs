use masking_trainer_lib::audiometry::{discretize_mask, threshold};
use masking_trainer_lib::cases::library;
use masking_trainer_lib::constants::*;
use masking_trainer_lib::*;
use proptest::prelude::*;
use std::collections::HashSet;

fn ear() -> impl Strategy<Value = Ear> {
    prop_oneof![Just(Ear::R), Just(Ear::L)]
}

fn transducer() -> impl Strategy<Value = Transducer> {
    prop_oneof![Just(Transducer::AC), Just(Transducer::BC)]
}

fn frequency() -> impl Strategy<Value = u32> {
    prop::sample::select(FREQUENCIES.to_vec())
}

fn case_index() -> impl Strategy<Value = usize> {
    0..library().len()
}

fn placement() -> impl Strategy<Value = Placement> {
    (ear(), transducer(), any::<bool>(), frequency(), -60.0f64..220.0, -40.0f64..130.0).prop_map(
        |(ear, transducer, masked, frequency, db_raw, mask_raw)| {
            let mask_level = if masked { discretize_mask(mask_raw) } else { MASK_OFF };
            Placement {
                ear,
                transducer,
                masked,
                frequency,
                db_raw,
                mask_level,
            }
        },
    )
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![selection_action(), plot_action()]
}

fn selection_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        ear().prop_map(|e| Action::Select(SelectionUpdate { ear: Some(e), ..Default::default() })),
        transducer().prop_map(|t| Action::Select(SelectionUpdate { transducer: Some(t), ..Default::default() })),
        frequency().prop_map(|f| Action::Select(SelectionUpdate { frequency: Some(f), ..Default::default() })),
        (-20i32..130).prop_map(|l| Action::Select(SelectionUpdate { level: Some(l), ..Default::default() })),
        (-20i32..120).prop_map(|m| Action::Select(SelectionUpdate {
            masking: Some(m >= 0),
            mask_level: Some(m),
            ..Default::default()
        })),
        prop_oneof![Just(1), Just(-1)].prop_map(Action::StepFrequency),
    ]
}

fn plot_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Place),
        (-20.0f64..140.0).prop_map(Action::PlaceAt),
        Just(Action::ClearPlot),
        any::<bool>().prop_map(Action::ToggleAnswer),
        Just(Action::Check),
    ]
}

#[test]
fn plot_points_stay_on_grid_under_ceiling_and_unique() {
    proptest!(|(idx in case_index(), clicks in prop::collection::vec(placement(), 1..40))| {
        let case = &library()[idx];
        let mut plot = PlotState::new();
        for p in &clicks {
            let outcome = plot.place(case, p);
            if let PlaceOutcome::Placed(point) = outcome {
                let ceil = ceiling(point.transducer, point.frequency).unwrap();
                let heard_at_ceiling =
                    audible(case, p.ear, p.transducer, p.frequency, ceil, p.masked, p.mask_level).heard;
                prop_assert_eq!(point.so, point.db == ceil && !heard_at_ceiling);
            } else {
                prop_assert!(p.transducer == Transducer::BC && (p.frequency == 125 || p.frequency == 8000));
            }
        }
        let mut keys = HashSet::new();
        for point in plot.points() {
            prop_assert!(point.db % 5 == 0);
            prop_assert!(point.db >= Y_MIN);
            prop_assert!(point.db <= ceiling(point.transducer, point.frequency).unwrap());
            prop_assert!(!(point.transducer == Transducer::BC && (point.frequency == 125 || point.frequency == 8000)));
            prop_assert!(keys.insert(point.key()));
        }
    });
}

#[test]
fn engine_is_deterministic() {
    proptest!(|(idx in case_index(), e in ear(), t in transducer(), f in frequency(),
                level in -10i32..=120, masked in any::<bool>(), mask in -15i32..=160)| {
        let case = &library()[idx];
        prop_assert_eq!(audible(case, e, t, f, level, masked, mask), audible(case, e, t, f, level, masked, mask));
    });
}

#[test]
fn raising_the_level_never_loses_a_response() {
    proptest!(|(idx in case_index(), e in ear(), t in transducer(), f in frequency(),
                level in -10i32..=115, step in 1i32..=30, masked in any::<bool>(), mask in -15i32..=110)| {
        let case = &library()[idx];
        let low = audible(case, e, t, f, level, masked, mask);
        let high = audible(case, e, t, f, level + step, masked, mask);
        prop_assert!(!low.heard || high.heard);
    });
}

#[test]
fn plateau_masking_only_blocks_crossover() {
    proptest!(|(idx in case_index(), e in ear(), t in transducer(), f in frequency(),
                level in -10i32..=120, a in 0i32..=200, b in 0i32..=200)| {
        let case = &library()[idx];
        let nte_bc = threshold(case, e.opposite(), Transducer::BC, f);
        let te_bc = threshold(case, e, Transducer::BC, f);
        if let (Some(lo), Some(te)) = (nte_bc, te_bc) {
            let hi = te + OVER_MASKING_MARGIN;
            if lo > hi {
                return Ok(());
            }
            let span = hi - lo;
            let (m1, m2) = (lo + a.min(b) % (span + 1), lo + a.max(b) % (span + 1));
            let (m1, m2) = (m1.min(m2), m1.max(m2));
            let first = audible(case, e, t, f, level, true, m1);
            let second = audible(case, e, t, f, level, true, m2);
            prop_assert_eq!(first.test_ear_heard, second.test_ear_heard);
            prop_assert!(!second.cross_heard || first.cross_heard);
        }
    });
}

#[test]
fn over_masking_elevation_has_unit_slope() {
    proptest!(|(idx in case_index(), e in ear(), t in transducer(), f in frequency(),
                level in -10i32..=120, excess in 1i32..=80)| {
        let case = &library()[idx];
        if let (Some(te_bc), Some(te)) = (threshold(case, e, Transducer::BC, f), threshold(case, e, t, f)) {
            let limit = te_bc + OVER_MASKING_MARGIN;
            let a = audible(case, e, t, f, level, true, limit + excess);
            prop_assert!(a.over_masking);
            prop_assert_eq!(a.effective_threshold, Some(te + excess));
        }
    });
}

#[test]
fn measurement_log_only_grows() {
    proptest!(|(idx in case_index(), first in prop::collection::vec(action(), 0..30),
                second in prop::collection::vec(action(), 0..30))| {
        let mut s = Session::new();
        s.dispatch(Action::LoadCase(library()[idx].id.clone())).unwrap();
        for a in first {
            s.dispatch(a).unwrap();
        }
        let snapshot = s.log().entries().to_vec();
        for a in second {
            s.dispatch(a).unwrap();
        }
        let later = s.log().entries();
        prop_assert!(later.len() >= snapshot.len());
        prop_assert_eq!(&later[..snapshot.len()], &snapshot[..]);
        for pair in later.windows(2) {
            prop_assert!(pair[0].id < pair[1].id);
        }
    });
}

#[test]
fn score_total_skips_undefined_bone_entries() {
    proptest!(|(extra in prop::collection::vec((ear(), prop_oneof![Just(125u32), Just(8000u32)], 0i32..=20), 0..4))| {
        let mut case = library()[0].clone();
        let before = case.thresholds.len() as u32;
        let mut seen = HashSet::new();
        for (e, f, db) in extra {
            if seen.insert((e, f)) {
                case.thresholds.push(ThresholdEntry {
                    ear: e,
                    transducer: Transducer::BC,
                    frequency: f,
                    db: db * 5,
                    so: false,
                });
            }
        }
        let score = masking_trainer_lib::scoring::score(&case, &PlotState::new());
        prop_assert_eq!(score.total, before);
    });
}
