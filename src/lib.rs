// src/lib.rs

pub mod audiometry;
pub mod cases;
pub mod commands;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod measurement;
pub mod models;
pub mod plot;
pub mod repository;
pub mod scoring;
pub mod session;

pub use audiometry::{audible, ceiling, threshold};
pub use error::TrainerError;
pub use models::*;
pub use plot::{PlaceOutcome, Placement, PlotState};
pub use session::{Action, Effect, SelectionUpdate, Session, SessionPhase};
