// src/constants.rs

// --- Frequencies ---
pub const FREQUENCIES: [u32; 7] = [125, 250, 500, 1000, 2000, 4000, 8000];
pub const BC_VALID_FREQUENCIES: [u32; 5] = [250, 500, 1000, 2000, 4000];

// --- Level Axis (dB HL) ---
pub const Y_MIN: i32 = -10;
pub const Y_MAX: i32 = 120;
pub const DB_STEP: i32 = 5;

// --- Transducer Output Limits ---
pub const AC_CEILING_DEFAULT: i32 = 110;
pub const AC_CEILINGS: [(u32, i32); 7] = [
    (125, 70),
    (250, 90),
    (500, 110),
    (1000, 110),
    (2000, 110),
    (4000, 110),
    (8000, 100),
];
pub const BC_CEILINGS: [(u32, i32); 5] = [(250, 55), (500, 65), (1000, 70), (2000, 70), (4000, 60)];

// A scale-out entry behaves as if the true threshold sat this far above the ceiling.
pub const SO_OFFSET: i32 = 50;

// --- Interaural Attenuation ---
pub const IA_AC: i32 = 50;
pub const IA_BC: i32 = 0;

// --- Masking ---
pub const MASK_OFF: i32 = -15; // "unmasked" sentinel
pub const MASK_MIN: i32 = 0;
pub const MASK_MAX: i32 = 110;
pub const OVER_MASKING_MARGIN: i32 = 50;

// --- Session Defaults ---
pub const DEFAULT_FREQUENCY: u32 = 1000;
pub const DEFAULT_LEVEL: i32 = 0;
pub const DEFAULT_LOAD_DELAY_MS: u64 = 1000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
