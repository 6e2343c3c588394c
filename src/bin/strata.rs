use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use strata_wm::actor::bar;
use strata_wm::actor::config::ConfigActor;
use strata_wm::actor::config_watcher::ConfigWatcher;
use strata_wm::actor::reactor::{self, Reactor};
use strata_wm::common::config::{Config, config_file, restore_file};
use strata_wm::common::log;
use strata_wm::sys::driver::{DriverEvent, SimDriver};
use strata_wm::sys::executor::Executor;
use strata_wm::ui::widgets::Cell;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check the configuration file for problems without starting the window
    /// manager.
    #[arg(long)]
    validate: bool,

    /// Replay a file of recorded driver events (one RON value per line) and
    /// print the driver calls that result.
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,
}

fn main() {
    let opt = Cli::parse();

    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: We are single threaded at this point.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    log::init_logging();

    let config_path = opt.config.clone().unwrap_or_else(config_file);
    let config = if config_path.exists() {
        match Config::read(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {}", config_path.display(), e);
                process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    if opt.validate {
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
        } else {
            for issue in issues {
                eprintln!("{}", issue);
            }
            process::exit(1);
        }
        return;
    }

    if let Some(path) = &opt.replay {
        if let Err(e) = replay(path, config) {
            eprintln!("{}", e);
            process::exit(1);
        }
        return;
    }

    run_session(config, config_path);
}

/// Runs the full actor stack against the in-memory driver, fed by RON driver
/// events on stdin. Ctrl+C shuts the session down.
fn run_session(config: Config, config_path: PathBuf) {
    let sim = SimDriver::new();

    let bar_tx = if config.bar.enabled {
        let (sink, rows) = tokio::sync::mpsc::unbounded_channel();
        let (bar, bar_tx) = bar::Bar::new(&config.bar, sink);
        std::thread::Builder::new()
            .name("bar".to_string())
            .spawn(move || Executor::run(bar.run()))
            .expect("failed to spawn bar thread");
        spawn_bar_sink(rows);
        Some(bar_tx)
    } else {
        None
    };

    let (reactor, events_tx) = match Reactor::new(
        config.clone(),
        Box::new(sim.clone()),
        bar_tx,
        restore_file(),
        Some(config_path.clone()),
    ) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let config_tx = ConfigActor::spawn(config.clone(), events_tx.clone(), config_path.clone());
    ConfigWatcher::spawn(config_tx, config, config_path);

    let events_tx_for_signal = events_tx.clone();
    ctrlc::set_handler(move || {
        events_tx_for_signal.send(reactor::Event::Shutdown);
    })
    .expect("Error setting Ctrl+C handler");

    let events_tx_for_stdin = events_tx.clone();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match ron::from_str::<DriverEvent>(line) {
                    Ok(event) => events_tx_for_stdin.send(reactor::Event::Driver(event)),
                    Err(e) => warn!("ignoring malformed driver event: {e}"),
                }
            }
        })
        .expect("failed to spawn stdin thread");

    let sim_for_drain = sim.clone();
    std::thread::Builder::new()
        .name("driver-drain".to_string())
        .spawn(move || {
            loop {
                for call in sim_for_drain.take_calls() {
                    info!(target: "strata::driver", "{call:?}");
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        })
        .expect("failed to spawn driver-drain thread");

    Executor::run(reactor.run());
    info!("session ended");
}

/// Drains composed bar rows and logs them, standing in for a graphical
/// rendering backend.
fn spawn_bar_sink(mut rows: UnboundedReceiver<Vec<Cell>>) {
    std::thread::Builder::new()
        .name("bar-sink".to_string())
        .spawn(move || {
            while let Some(row) = rows.blocking_recv() {
                let line = row
                    .iter()
                    .map(|cell| cell.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                info!(target: "strata::bar", "{line}");
            }
        })
        .expect("failed to spawn bar-sink thread");
}

fn replay(path: &Path, config: Config) -> anyhow::Result<()> {
    let file = BufReader::new(std::fs::File::open(path)?);
    let sim = SimDriver::new();
    // Replays must not touch the real session's saved layout.
    let scratch = std::env::temp_dir().join("strata-replay-restore.ron");
    let (mut reactor, _events_tx) =
        Reactor::new(config, Box::new(sim.clone()), None, scratch, None)?;
    for line in file.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: DriverEvent = ron::from_str(&line)?;
        reactor.handle_event(reactor::Event::Driver(event));
        for call in sim.take_calls() {
            println!("{call:?}");
        }
    }
    Ok(())
}
