// src/cases.rs

use crate::audiometry::ceiling;
use crate::models::{Case, Ear, ThresholdEntry, Transducer};
use std::sync::OnceLock;

use Ear::{L, R};
use Transducer::{AC, BC};

static LIBRARY: OnceLock<Vec<Case>> = OnceLock::new();

/// The preset case library, in presentation order.
pub fn library() -> &'static [Case] {
    LIBRARY.get_or_init(build_library)
}

pub fn find_case(id: &str) -> Option<&'static Case> {
    library().iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

pub fn case_ids() -> Vec<&'static str> {
    library().iter().map(|c| c.id.as_str()).collect()
}

// --- Builders ---

fn series(ear: Ear, transducer: Transducer, levels: &[(u32, i32)]) -> Vec<ThresholdEntry> {
    levels
        .iter()
        .map(|&(frequency, db)| ThresholdEntry {
            ear,
            transducer,
            frequency,
            db,
            so: false,
        })
        .collect()
}

fn scale_out(ear: Ear, transducer: Transducer, frequencies: &[u32]) -> Vec<ThresholdEntry> {
    frequencies
        .iter()
        .filter_map(|&frequency| {
            ceiling(transducer, frequency).map(|db| ThresholdEntry {
                ear,
                transducer,
                frequency,
                db,
                so: true,
            })
        })
        .collect()
}

fn case(id: &str, title: &str, description: &str, parts: Vec<Vec<ThresholdEntry>>) -> Case {
    Case {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        thresholds: parts.into_iter().flatten().collect(),
    }
}

fn build_library() -> Vec<Case> {
    vec![
        case(
            "A",
            "Right high-frequency SNHL",
            "Sensorineural loss above 1 kHz on the right; the left ear does not respond at 125 Hz.",
            vec![
                series(R, AC, &[(125, 10), (250, 10), (500, 10), (1000, 5), (2000, 70), (4000, 75), (8000, 80)]),
                series(R, BC, &[(250, 10), (500, 5), (1000, 5), (2000, 70)]),
                scale_out(R, BC, &[4000]),
                series(L, AC, &[(125, 110), (250, 20), (500, 15), (1000, 10), (2000, 10), (4000, 15), (8000, 20)]),
                series(L, BC, &[(250, 15), (500, 10), (1000, 5), (2000, 5), (4000, 10)]),
            ],
        ),
        case(
            "B",
            "Right conductive loss",
            "Flat 40-50 dB air-bone gap on the right with normal cochlear reserve; BC needs masking.",
            vec![
                series(R, AC, &[(125, 50), (250, 50), (500, 45), (1000, 45), (2000, 40), (4000, 45), (8000, 50)]),
                series(R, BC, &[(250, 5), (500, 10), (1000, 5), (2000, 10), (4000, 5)]),
                series(L, AC, &[(125, 5), (250, 5), (500, 10), (1000, 5), (2000, 5), (4000, 10), (8000, 10)]),
                series(L, BC, &[(250, 5), (500, 5), (1000, 5), (2000, 5), (4000, 5)]),
            ],
        ),
        case(
            "C",
            "Left profound loss",
            "Dead left ear: every left threshold is beyond the audiometer limit except mid-frequency AC.",
            vec![
                series(R, AC, &[(125, 10), (250, 5), (500, 5), (1000, 0), (2000, 5), (4000, 10), (8000, 15)]),
                series(R, BC, &[(250, 5), (500, 5), (1000, 0), (2000, 5), (4000, 10)]),
                scale_out(L, AC, &[125, 250, 2000, 4000, 8000]),
                series(L, AC, &[(500, 105), (1000, 110)]),
                scale_out(L, BC, &[250, 500, 1000, 2000, 4000]),
            ],
        ),
        case(
            "D",
            "Bilateral noise-induced loss",
            "Symmetric sensorineural notch at 4 kHz (C5 dip) with recovery at 8 kHz.",
            vec![
                series(R, AC, &[(125, 10), (250, 10), (500, 10), (1000, 15), (2000, 25), (4000, 55), (8000, 30)]),
                series(R, BC, &[(250, 10), (500, 10), (1000, 15), (2000, 25), (4000, 55)]),
                series(L, AC, &[(125, 10), (250, 15), (500, 10), (1000, 15), (2000, 30), (4000, 60), (8000, 35)]),
                series(L, BC, &[(250, 15), (500, 10), (1000, 15), (2000, 30), (4000, 55)]),
            ],
        ),
        case(
            "E",
            "Right mixed loss",
            "Mixed loss on the right; masking the left ear for right AC risks over-masking.",
            vec![
                series(R, AC, &[(125, 60), (250, 65), (500, 65), (1000, 60), (2000, 65), (4000, 70), (8000, 75)]),
                series(R, BC, &[(250, 25), (500, 30), (1000, 30), (2000, 35), (4000, 40)]),
                series(L, AC, &[(125, 5), (250, 10), (500, 5), (1000, 10), (2000, 5), (4000, 10), (8000, 15)]),
                series(L, BC, &[(250, 5), (500, 5), (1000, 10), (2000, 5), (4000, 10)]),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BC_VALID_FREQUENCIES, Y_MAX, Y_MIN};
    use std::collections::HashSet;

    #[test]
    fn library_ids_are_unique_and_ordered() {
        assert_eq!(case_ids(), vec!["A", "B", "C", "D", "E"]);
        assert!(find_case("a").is_some());
        assert!(find_case("Z").is_none());
    }

    #[test]
    fn presets_are_well_formed() {
        for c in library() {
            let mut seen = HashSet::new();
            for t in &c.thresholds {
                assert!(seen.insert((t.ear, t.transducer, t.frequency)), "duplicate in {}", c.id);
                assert_eq!(t.db % 5, 0, "case {} has off-grid level", c.id);
                assert!(t.db >= Y_MIN && t.db <= Y_MAX);
                if t.transducer == Transducer::BC {
                    assert!(BC_VALID_FREQUENCIES.contains(&t.frequency));
                }
            }
        }
    }

    #[test]
    fn scale_out_entries_sit_at_the_ceiling() {
        let c = find_case("C").unwrap();
        let e = c.entry(L, BC, 1000).unwrap();
        assert!(e.so);
        assert_eq!(e.db, 70);
    }
}
