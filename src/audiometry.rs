// src/audiometry.rs

use crate::constants::*;
use crate::models::{Audibility, Case, Ear, Selection, Transducer, Warnings};
use log::debug;

// --- Discretization ---

/// Snaps a raw level to the 5 dB grid, halves rounding up.
/// Input is bounded one step beyond the level axis first, so any finite or
/// infinite value fits the integer grid. NaN reads as the bottom of the axis.
pub fn round5(raw: f64) -> i32 {
    let lo = (Y_MIN.min(MASK_OFF) - DB_STEP) as f64;
    let hi = (Y_MAX.max(MASK_MAX) + DB_STEP) as f64;
    let bounded = if raw.is_nan() { lo } else { raw.clamp(lo, hi) };
    ((bounded / DB_STEP as f64) + 0.5).floor() as i32 * DB_STEP
}

/// Snaps and clamps a raw level to the plottable axis.
pub fn discretize(raw: f64) -> i32 {
    round5(raw).clamp(Y_MIN, Y_MAX)
}

/// Snaps a masking slider value; anything below 0 dB is the "off" sentinel.
pub fn discretize_mask(raw: f64) -> i32 {
    let db = round5(raw);
    if db < MASK_MIN {
        MASK_OFF
    } else {
        db.min(MASK_MAX)
    }
}

pub fn is_valid_frequency(frequency: u32) -> bool {
    FREQUENCIES.contains(&frequency)
}

/// BC is only defined at 250-4000 Hz.
pub fn is_bc_frequency(frequency: u32) -> bool {
    BC_VALID_FREQUENCIES.contains(&frequency)
}

pub fn is_defined(transducer: Transducer, frequency: u32) -> bool {
    match transducer {
        Transducer::AC => is_valid_frequency(frequency),
        Transducer::BC => is_bc_frequency(frequency),
    }
}

/// Maximum presentable level; `None` where the transducer is undefined.
pub fn ceiling(transducer: Transducer, frequency: u32) -> Option<i32> {
    let table: &[(u32, i32)] = match transducer {
        Transducer::AC => &AC_CEILINGS,
        Transducer::BC => &BC_CEILINGS,
    };
    match table.iter().find(|(f, _)| *f == frequency) {
        Some(&(_, db)) => Some(db),
        None if transducer == Transducer::AC => Some(AC_CEILING_DEFAULT),
        None => None,
    }
}

// --- Threshold Oracle ---

/// True threshold of the simulated patient. `None` means no response at any level.
pub fn threshold(case: &Case, ear: Ear, transducer: Transducer, frequency: u32) -> Option<i32> {
    let entry = case.entry(ear, transducer, frequency)?;
    if entry.so {
        ceiling(transducer, frequency).map(|c| c + SO_OFFSET)
    } else {
        Some(entry.db)
    }
}

// --- Audibility Engine ---

/// Decides whether a single presentation evokes a response.
///
/// Crossover reaches the non-test cochlea at `level - IA` and is heard when it
/// meets the non-test BC threshold, or the masking noise when that is higher.
/// Masking above the test-ear BC threshold plus 50 dB raises the test-ear
/// threshold one-for-one.
pub fn audible(
    case: &Case,
    ear: Ear,
    transducer: Transducer,
    frequency: u32,
    level: i32,
    masked: bool,
    mask_level: i32,
) -> Audibility {
    let te_thr = threshold(case, ear, transducer, frequency);
    let te_bc = threshold(case, ear, Transducer::BC, frequency);
    let nte_bc = threshold(case, ear.opposite(), Transducer::BC, frequency);

    let leak = level - transducer.interaural_attenuation();
    let effective_mask = match nte_bc {
        Some(n) if masked && mask_level > n => Some(mask_level),
        other => other,
    };

    let over_masking_limit = te_bc.map(|b| b + OVER_MASKING_MARGIN);
    let elevation = match over_masking_limit {
        Some(limit) if masked => (mask_level - limit).max(0),
        _ => 0,
    };
    let effective_threshold = te_thr.map(|t| t + elevation);

    let test_ear_heard = effective_threshold.map_or(false, |t| level >= t);
    let cross_heard = effective_mask.map_or(false, |m| leak >= m);
    let over_masking = masked && over_masking_limit.map_or(false, |limit| mask_level > limit);

    debug!(
        "[Engine] {}-{} {} Hz @ {} dB (mask {}:{}): te {:?} -> {:?}, leak {} vs {:?}",
        ear, transducer, frequency, level, masked, mask_level, te_thr, effective_threshold, leak, effective_mask
    );

    Audibility {
        heard: test_ear_heard || cross_heard,
        test_ear_heard,
        cross_heard,
        over_masking,
        cross_hearing: cross_heard,
        effective_threshold,
        leak,
        effective_mask,
        non_test_bc: nte_bc,
        over_masking_limit,
    }
}

/// Engine evaluation for whatever the learner has dialled in.
pub fn audible_for(case: &Case, sel: &Selection) -> Audibility {
    audible(
        case,
        sel.ear,
        sel.transducer,
        sel.frequency,
        sel.level,
        sel.masking_effective(),
        sel.mask_level,
    )
}

fn fmt_db(db: Option<i32>) -> String {
    match db {
        Some(v) => v.to_string(),
        None => "NR".to_string(),
    }
}

/// Warning flags with human-readable detail, levels rendered as integers.
pub fn warnings(a: &Audibility, sel: &Selection) -> Warnings {
    let mut details = Vec::new();
    if a.cross_hearing {
        details.push(format!(
            "cross-hearing: {}-{} {} Hz at {} dB HL, IA {} dB, {} dB reaches the {} cochlea (BC threshold {} dB HL)",
            sel.ear,
            sel.transducer,
            sel.frequency,
            sel.level,
            sel.transducer.interaural_attenuation(),
            a.leak,
            sel.ear.opposite(),
            fmt_db(a.non_test_bc),
        ));
    }
    if a.over_masking {
        if let Some(limit) = a.over_masking_limit {
            details.push(format!(
                "over-masking: noise {} dB exceeds limit {} dB, test-ear threshold raised by {} dB",
                sel.mask_level,
                limit,
                sel.mask_level - limit,
            ));
        }
    }
    Warnings {
        over_masking: a.over_masking,
        cross_hearing: a.cross_hearing,
        details,
    }
}
