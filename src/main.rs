// src/main.rs

use clap::Parser;
use log::{error, info, warn};
use masking_trainer_lib::commands::{parse_command, Host, HELP};
use masking_trainer_lib::config::TrainerConfig;
use masking_trainer_lib::constants::{DEFAULT_LOAD_DELAY_MS, DEFAULT_LOG_LEVEL};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Pure-tone audiometry and masking trainer.
#[derive(Parser, Debug)]
#[command(name = "masking-trainer", version, about)]
struct Args {
    /// SQLite file for progress and the measurement log (in-memory when omitted)
    #[arg(long, env = "MASKING_TRAINER_DB")]
    db: Option<PathBuf>,

    /// Log filter passed to env_logger
    #[arg(long, env = "MASKING_TRAINER_LOG", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    /// Simulated case-loading delay
    #[arg(long, env = "MASKING_TRAINER_LOAD_DELAY_MS", default_value_t = DEFAULT_LOAD_DELAY_MS)]
    load_delay_ms: u64,
}

impl From<Args> for TrainerConfig {
    fn from(args: Args) -> Self {
        TrainerConfig {
            db_path: args.db,
            log_level: args.log_level,
            load_delay_ms: args.load_delay_ms,
        }
    }
}

fn main() {
    let config: TrainerConfig = Args::parse().into();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();

    info!("Starting Masking Trainer...");
    let mut host = match Host::open(config) {
        Ok(h) => h,
        Err(e) => {
            error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", HELP);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        if let Err(e) = stdout.flush() {
            warn!("Failed to flush prompt: {}", e);
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        }
        match host.tick() {
            Ok(Some(msg)) => println!("{}", msg),
            Ok(None) => {}
            Err(e) => error!("{}", e),
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line).and_then(|cmd| host.handle(cmd)) {
            Ok(Some(out)) => println!("{}", out),
            Ok(None) => break,
            Err(e) => println!("error: {}", e),
        }
    }
    info!("Goodbye.");
}
