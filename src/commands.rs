// src/commands.rs

use crate::cases;
use crate::config::TrainerConfig;
use crate::database;
use crate::error::{Result, TrainerError};
use crate::measurement::MeasurementLog;
use crate::models::{Ear, Transducer};
use crate::repository;
use crate::session::{Action, Effect, SelectionUpdate, Session};
use log::{debug, info};
use rusqlite::Connection;
use std::time::Instant;

pub const HELP: &str = "\
commands:
  cases                       list preset cases
  load <id>                   load a case (plot is cleared)
  ear <R|L>  tx <AC|BC>  freq <Hz>  up  down
  level <dB>                  presentation level
  mask <on|off|dB>            masking noise to the non-test ear
  place [dB]                  plot a threshold at the current (or given) level
  remove <R|L> <AC|BC> <u|m> <Hz>
  clear  clearlog
  lamp  warnings  plot  export  progress
  answer <on|off>  check
  help  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dispatch(Action),
    Cases,
    Lamp,
    Warnings,
    Plot,
    Export,
    Progress,
    Help,
    Quit,
}

fn invalid(msg: impl Into<String>) -> TrainerError {
    TrainerError::InvalidCommand(msg.into())
}

fn arg<'a>(parts: &[&'a str], idx: usize, what: &str) -> Result<&'a str> {
    parts.get(idx).copied().ok_or_else(|| invalid(format!("missing {}", what)))
}

fn number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| invalid(format!("bad {} '{}'", what, raw)))
}

fn select(update: SelectionUpdate) -> Command {
    Command::Dispatch(Action::Select(update))
}

fn on_off(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parses one line of host input.
pub fn parse_command(line: &str) -> Result<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return Err(invalid("empty command"));
    };

    let cmd = match head.to_ascii_lowercase().as_str() {
        "cases" => Command::Cases,
        "load" => Command::Dispatch(Action::BeginLoad(arg(&parts, 1, "case id")?.to_string())),
        "ear" => select(SelectionUpdate {
            ear: Some(arg(&parts, 1, "ear")?.parse::<Ear>().map_err(invalid)?),
            ..Default::default()
        }),
        "tx" | "transducer" => select(SelectionUpdate {
            transducer: Some(arg(&parts, 1, "transducer")?.parse::<Transducer>().map_err(invalid)?),
            ..Default::default()
        }),
        "freq" | "frequency" => select(SelectionUpdate {
            frequency: Some(number(arg(&parts, 1, "frequency")?, "frequency")?),
            ..Default::default()
        }),
        "up" => Command::Dispatch(Action::StepFrequency(1)),
        "down" => Command::Dispatch(Action::StepFrequency(-1)),
        "level" => select(SelectionUpdate {
            level: Some(number(arg(&parts, 1, "level")?, "level")?),
            ..Default::default()
        }),
        "mask" => {
            let raw = arg(&parts, 1, "mask setting")?;
            match on_off(raw) {
                Some(on) => select(SelectionUpdate {
                    masking: Some(on),
                    ..Default::default()
                }),
                None => select(SelectionUpdate {
                    masking: Some(true),
                    mask_level: Some(number(raw, "mask level")?),
                    ..Default::default()
                }),
            }
        }
        "place" => match parts.get(1) {
            Some(raw) => Command::Dispatch(Action::PlaceAt(number(raw, "level")?)),
            None => Command::Dispatch(Action::Place),
        },
        "remove" => {
            let ear = arg(&parts, 1, "ear")?.parse::<Ear>().map_err(invalid)?;
            let transducer = arg(&parts, 2, "transducer")?.parse::<Transducer>().map_err(invalid)?;
            let masked = match arg(&parts, 3, "u|m")?.to_ascii_lowercase().as_str() {
                "m" | "masked" => true,
                "u" | "unmasked" => false,
                other => return Err(invalid(format!("expected u or m, got '{}'", other))),
            };
            let frequency = number(arg(&parts, 4, "frequency")?, "frequency")?;
            Command::Dispatch(Action::Remove {
                ear,
                transducer,
                masked,
                frequency,
            })
        }
        "clear" => Command::Dispatch(Action::ClearPlot),
        "clearlog" => Command::Dispatch(Action::ClearLog),
        "answer" => {
            let raw = arg(&parts, 1, "on|off")?;
            let show = on_off(raw).ok_or_else(|| invalid(format!("expected on or off, got '{}'", raw)))?;
            Command::Dispatch(Action::ToggleAnswer(show))
        }
        "check" => Command::Dispatch(Action::Check),
        "lamp" => Command::Lamp,
        "warnings" => Command::Warnings,
        "plot" => Command::Plot,
        "export" => Command::Export,
        "progress" => Command::Progress,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(invalid(format!("unknown command '{}'", other))),
    };
    Ok(cmd)
}

// --- Host State ---

/// Owns the session plus optional persistence, and paces case loading.
pub struct Host {
    pub session: Session,
    conn: Option<Connection>,
    config: TrainerConfig,
    loading_since: Option<Instant>,
}

impl Host {
    /// Opens the configured database (if any) and restores progress and the log from it.
    pub fn open(config: TrainerConfig) -> Result<Self> {
        let conn = match &config.db_path {
            Some(path) => {
                info!("Database path: {:?}", path);
                Some(Connection::open(path)?)
            }
            None => None,
        };
        Self::with_connection(config, conn)
    }

    pub fn with_connection(config: TrainerConfig, conn: Option<Connection>) -> Result<Self> {
        let session = match &conn {
            Some(c) => {
                database::init_db(c)?;
                let progress = repository::load_progress(c)?;
                let log = MeasurementLog::restore(repository::load_measurements(c)?)
                    .resume_from(repository::load_next_measurement_id(c)?);
                info!(
                    "Restored {} session(s) and {} measurement(s)",
                    progress.total_sessions,
                    log.len()
                );
                Session::restore(progress, log)
            }
            None => Session::new(),
        };
        Ok(Host {
            session,
            conn,
            config,
            loading_since: None,
        })
    }

    /// Completes a pending case load once the configured delay has elapsed.
    pub fn tick(&mut self) -> Result<Option<String>> {
        let Some(started) = self.loading_since else {
            return Ok(None);
        };
        if started.elapsed() < self.config.load_delay() {
            return Ok(None);
        }
        self.loading_since = None;
        let effect = self.session.dispatch(Action::FinishLoad)?;
        self.persist(&effect)?;
        Ok(match effect {
            Effect::Loaded(id) => Some(format!("case {} loaded", id)),
            _ => None,
        })
    }

    /// Runs one command; returns the text to show, or `None` on quit.
    pub fn handle(&mut self, cmd: Command) -> Result<Option<String>> {
        debug!("[Host] {:?}", cmd);
        let out = match cmd {
            Command::Quit => return Ok(None),
            Command::Help => HELP.to_string(),
            Command::Cases => cases::library()
                .iter()
                .map(|c| format!("{}  {}: {}", c.id, c.title, c.description))
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Lamp => (if self.session.lamp() { "RESPONSE" } else { "-" }).to_string(),
            Command::Warnings => serde_json::to_string_pretty(&self.session.warnings())?,
            Command::Plot => {
                let points: Vec<_> = self.session.plot().points().collect();
                serde_json::to_string_pretty(&points)?
            }
            Command::Export => serde_json::to_string_pretty(&self.session.export())?,
            Command::Progress => serde_json::to_string_pretty(self.session.progress())?,
            Command::Dispatch(action) => {
                let is_load = matches!(action, Action::BeginLoad(_));
                let effect = self.session.dispatch(action)?;
                self.persist(&effect)?;
                if is_load {
                    self.loading_since = Some(Instant::now());
                    if let Some(done) = self.tick()? {
                        return Ok(Some(done));
                    }
                }
                self.describe(&effect)?
            }
        };
        Ok(Some(out))
    }

    fn describe(&self, effect: &Effect) -> Result<String> {
        Ok(match effect {
            Effect::None => "nothing to do".to_string(),
            Effect::NoCase => "no case loaded (load a case first)".to_string(),
            Effect::LoadStarted(id) => format!("loading case {}...", id),
            Effect::Loaded(id) => format!("case {} loaded", id),
            Effect::SelectionChanged(sel) => format!(
                "{}-{} {} Hz {} dB, masking {}  lamp: {}",
                sel.ear,
                sel.transducer,
                sel.frequency,
                sel.level,
                if sel.masking_effective() {
                    format!("{} dB", sel.mask_level)
                } else {
                    "off".to_string()
                },
                if self.session.lamp() { "on" } else { "off" }
            ),
            Effect::LampSuppressed => "not available for this transducer/frequency".to_string(),
            Effect::Placed { point, logged } => format!(
                "placed {}-{}{} {} Hz at {} dB{}{}",
                point.ear,
                point.transducer,
                if point.masked { " (masked)" } else { "" },
                point.frequency,
                point.db,
                if point.so { " SO" } else { "" },
                match logged {
                    Some(e) => format!(", logged #{}", e.id),
                    None => ", no response".to_string(),
                }
            ),
            Effect::Removed(Some(p)) => format!("removed {}-{} {} Hz", p.ear, p.transducer, p.frequency),
            Effect::Removed(None) => "no such point".to_string(),
            Effect::Cleared => "plot cleared".to_string(),
            Effect::LogCleared => "measurement log cleared".to_string(),
            Effect::AnswerShown(true) => serde_json::to_string_pretty(&self.session.answer())?,
            Effect::AnswerShown(false) => "answer hidden".to_string(),
            Effect::Scored(s) => format!("{}/{} correct ({}%)", s.correct, s.total, s.accuracy),
        })
    }

    fn persist(&self, effect: &Effect) -> Result<()> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        match effect {
            Effect::Loaded(_) | Effect::Scored(_) => repository::save_progress(conn, self.session.progress())?,
            Effect::Placed { logged: Some(entry), .. } => repository::append_measurement(conn, entry)?,
            Effect::LogCleared => {
                repository::clear_measurements(conn)?;
                repository::save_next_measurement_id(conn, self.session.log().next_id())?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selection_commands() {
        assert_eq!(
            parse_command("ear L").unwrap(),
            select(SelectionUpdate {
                ear: Some(Ear::L),
                ..Default::default()
            })
        );
        assert_eq!(
            parse_command("mask 40").unwrap(),
            select(SelectionUpdate {
                masking: Some(true),
                mask_level: Some(40),
                ..Default::default()
            })
        );
        assert_eq!(parse_command("place 42.5").unwrap(), Command::Dispatch(Action::PlaceAt(42.5)));
        assert_eq!(
            parse_command("remove r bc m 2000").unwrap(),
            Command::Dispatch(Action::Remove {
                ear: Ear::R,
                transducer: Transducer::BC,
                masked: true,
                frequency: 2000
            })
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse_command(""), Err(TrainerError::InvalidCommand(_))));
        assert!(matches!(parse_command("level loud"), Err(TrainerError::InvalidCommand(_))));
        assert!(matches!(parse_command("ear middle"), Err(TrainerError::InvalidCommand(_))));
        assert!(matches!(parse_command("fly"), Err(TrainerError::InvalidCommand(_))));
    }

    #[test]
    fn zero_delay_loads_immediately() {
        let cfg = TrainerConfig {
            load_delay_ms: 0,
            ..TrainerConfig::default()
        };
        let mut host = Host::open(cfg).unwrap();
        let out = host.handle(parse_command("load A").unwrap()).unwrap().unwrap();
        assert_eq!(out, "case A loaded");
        assert_eq!(host.session.case().map(|c| c.id.as_str()), Some("A"));
    }

    #[test]
    fn delayed_load_keeps_other_commands_live() {
        let mut host = Host::open(TrainerConfig::default()).unwrap();
        let out = host.handle(parse_command("load B").unwrap()).unwrap().unwrap();
        assert_eq!(out, "loading case B...");
        assert!(host.session.is_loading());
        assert!(host.handle(parse_command("level 30").unwrap()).unwrap().is_some());
        assert!(matches!(
            host.handle(parse_command("load C").unwrap()),
            Err(TrainerError::LoadInProgress)
        ));
        assert!(host.tick().unwrap().is_none());
    }

    #[test]
    fn idle_effects_explain_themselves() {
        let mut host = Host::open(TrainerConfig::default()).unwrap();
        let out = host.handle(Command::Dispatch(Action::FinishLoad)).unwrap().unwrap();
        assert_eq!(out, "nothing to do");
        let out = host.handle(parse_command("place").unwrap()).unwrap().unwrap();
        assert_eq!(out, "no case loaded (load a case first)");
        let out = host.handle(parse_command("place 40").unwrap()).unwrap().unwrap();
        assert_eq!(out, "no case loaded (load a case first)");
    }
}
