//! REPL – Read-Eval-Print Loop driving the autopilot against the simulated ship.
//!
//! Shell commands:
//!   /help          – show this list
//!   /run [N]       – tick while the autopilot is running (at most N ticks, default 300)
//!   /tick          – run exactly one tick and print the full report
//!   /status        – show step, waypoint, position and battery
//!   /save          – write `~/.shuttle/state.json`
//!   /quit | /exit  – save state and exit
//!
//! Anything else is parsed as an operator [`Command`] (`start`, `stop`,
//! `shutdown`, `reset`, `step N`, `next`, `next-waypoint`,
//! `add-waypoint GPS:...`).

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use shuttle_hal::ShipRegistry;
use shuttle_hal::sim::SimShip;
use shuttle_runtime::{Command, MissionConfig, ProcessEngine, TickReport};
use shuttle_types::{ConnectorStatus, DetectedEntity, EntityKind, ShuttleError, Vec3};

use crate::state;

/// Simulated seconds that pass between two ticks.
const SECONDS_PER_TICK: f64 = 1.0;
const DEFAULT_RUN_TICKS: usize = 300;

/// Whether the shell keeps reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The simulated ship, its device registry and the engine flying it.
pub struct Session {
    sim: SimShip,
    ship: ShipRegistry,
    engine: ProcessEngine,
    /// Where stop and exit persist the engine state; `None` disables saving.
    state_path: Option<PathBuf>,
    interrupted: Arc<AtomicBool>,
}

impl Session {
    /// Build a session around a demo ship docked at the first waypoint.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::Config`] when `mission` fails validation.
    pub fn new(
        mission: MissionConfig,
        state_path: Option<PathBuf>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<Self, ShuttleError> {
        let sim = demo_ship(&mission);
        let mut ship = sim.build();
        ship.set_revalidation_interval(mission.revalidate_every);
        let engine = ProcessEngine::new(mission, Box::new(sim.host()))?;
        Ok(Self {
            sim,
            ship,
            engine,
            state_path,
            interrupted,
        })
    }

    pub fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ProcessEngine {
        &mut self.engine
    }

    /// Evaluate one input line.
    pub fn execute(&mut self, line: &str) -> Result<Flow, ShuttleError> {
        let mut words = line.split_whitespace();
        match words.next() {
            None => {}
            Some("/help") => cmd_help(),
            Some("/run") => {
                let limit = match words.next() {
                    Some(n) => n.parse().map_err(|_| {
                        ShuttleError::UnknownCommand(format!("/run expects a tick count, got `{n}`"))
                    })?,
                    None => DEFAULT_RUN_TICKS,
                };
                self.run(limit)?;
            }
            Some("/tick") => {
                let report = self.tick()?;
                println!("{report}");
            }
            Some("/status") => self.print_status(),
            Some("/save") => self.save_state(),
            Some("/quit" | "/exit") => {
                self.save_state();
                return Ok(Flow::Quit);
            }
            Some(other) if other.starts_with('/') => {
                return Err(ShuttleError::UnknownCommand(other.to_string()));
            }
            Some(_) => {
                let command: Command = line.parse()?;
                let persist = matches!(command, Command::Stop | Command::Shutdown);
                let message = self.engine.apply(command, &mut self.ship)?;
                println!("{} {}", "✓".green(), message);
                if persist {
                    self.save_state();
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// One engine tick followed by one simulated time step.
    fn tick(&mut self) -> Result<TickReport, ShuttleError> {
        let result = self.engine.run_one_tick(&mut self.ship);
        self.sim.advance(SECONDS_PER_TICK);
        result
    }

    /// Tick until the autopilot stops, `limit` ticks pass or Ctrl-C arrives.
    fn run(&mut self, limit: usize) -> Result<(), ShuttleError> {
        if !self.engine.is_running() {
            println!(
                "  Autopilot is stopped. Type {} first.",
                "start".bold().cyan()
            );
            return Ok(());
        }
        self.interrupted.store(false, Ordering::SeqCst);

        let mut last_status = String::new();
        let mut last: Option<TickReport> = None;
        for _ in 0..limit {
            if self.interrupted.swap(false, Ordering::SeqCst) {
                self.engine.apply(Command::Stop, &mut self.ship)?;
                self.save_state();
                break;
            }
            let report = self.tick()?;
            if report.status_text != last_status {
                println!("  {} {}", format!("[{:>4}]", report.tick).dimmed(), report.status_text);
                last_status.clone_from(&report.status_text);
            }
            if report.completed_lap() {
                println!("  {}", report.progress().green());
            }
            last = Some(report);
            if !self.engine.is_running() {
                break;
            }
        }
        if let Some(report) = last {
            println!("{report}");
        }
        Ok(())
    }

    fn print_status(&self) {
        let state = self.engine.state();
        println!("{}", "Autopilot Status".bold().underline());
        println!(
            "  Step      : {} ({})",
            state.step,
            self.engine.current_step().to_string().yellow()
        );
        println!(
            "  Running   : {}",
            if state.running { "yes".green() } else { "no".red() }
        );
        println!(
            "  Waypoint  : {}",
            state.current_waypoint.as_ref().map_or("NA", |w| w.name())
        );
        println!("  Route     : {} waypoint(s)", state.waypoints.len());
        let p = self.sim.position();
        println!("  Position  : ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z);
        println!("  Connector : {:?}", self.sim.connector_status());
        println!("  Battery   : {:.0}%", self.sim.battery_ratio() * 100.0);
        if self.engine.battery().is_critical() {
            println!("  {}", "Critical power".red().bold());
        }
    }

    fn save_state(&self) {
        let Some(path) = &self.state_path else {
            return;
        };
        if let Err(e) = state::save_to(&self.engine.snapshot(), path) {
            warn!(error = %e, "could not persist autopilot state");
            println!("{}: {}", "Error saving state".red(), e);
        }
    }
}

/// A fully equipped ship docked at the first waypoint, with a station placed
/// beside every stop waypoint so the proximity sensor has something to see.
pub fn demo_ship(mission: &MissionConfig) -> SimShip {
    let sim = SimShip::fully_equipped();
    let stations = mission.waypoints.iter().filter(|w| w.stop_at_waypoint());
    for (id, waypoint) in (1_i64..).zip(stations) {
        sim.add_entity(DetectedEntity::new(
            id,
            format!("{} Station", waypoint.name()),
            EntityKind::LargeGrid,
            waypoint.coords() + Vec3::new(0.0, 0.0, -30.0),
        ));
    }
    if let Some(first) = mission.waypoints.first() {
        sim.set_position(first.coords());
        sim.set_connector_status(ConnectorStatus::Connected);
    }
    sim
}

/// Entry point for the interactive REPL.
pub fn run(mut session: Session) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Terminal error".red(), e);
            return;
        }
    };
    let prompt = format!("{} ", "shuttle>".bold().cyan());

    loop {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                session.save_state();
                break;
            }
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        match session.execute(line) {
            Ok(Flow::Quit) => {
                println!("{}", "Goodbye.".green());
                break;
            }
            Ok(Flow::Continue) => {}
            Err(ShuttleError::UnknownCommand(cmd)) => println!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                cmd.yellow(),
                "/help".bold()
            ),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }
}

fn cmd_help() {
    println!();
    println!("{}", "Shell".bold().underline());
    println!("  {}        – tick while running (default {DEFAULT_RUN_TICKS})", "/run [N]".bold().cyan());
    println!("  {}           – run one tick, print the report", "/tick".bold().cyan());
    println!("  {}         – step, waypoint, position, battery", "/status".bold().cyan());
    println!("  {}           – write ~/.shuttle/state.json", "/save".bold().cyan());
    println!("  {}   – save and exit", "/quit  /exit".bold().cyan());
    println!();
    println!("{}", "Autopilot".bold().underline());
    println!("  {}  {}  {}  {}", "start".bold(), "stop".bold(), "shutdown".bold(), "reset".bold());
    println!("  {}       – jump to step N and stop", "step N".bold());
    println!("  {}         – move to the next step", "next".bold());
    println!("  {}", "next-waypoint".bold());
    println!("  {}", "add-waypoint GPS:Name:x:y:z:".bold());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuttle_types::Waypoint;

    fn mission() -> MissionConfig {
        MissionConfig {
            waypoints: vec![
                Waypoint::new("Base", Vec3::ZERO, true),
                Waypoint::new("Outpost", Vec3::new(2_000.0, 0.0, 0.0), true),
            ],
            ..MissionConfig::default()
        }
    }

    fn session() -> Session {
        Session::new(mission(), None, Arc::new(AtomicBool::new(false))).unwrap()
    }

    #[test]
    fn demo_ship_starts_docked_at_first_waypoint() {
        let sim = demo_ship(&mission());
        assert_eq!(sim.connector_status(), ConnectorStatus::Connected);
        assert!(sim.position().approx_eq(Vec3::ZERO, 1e-12));
    }

    #[test]
    fn operator_commands_reach_the_engine() {
        let mut s = session();
        assert_eq!(s.execute("start").unwrap(), Flow::Continue);
        assert!(s.engine().is_running());
        s.execute("step 5").unwrap();
        assert_eq!(s.engine().state().step, 5);
        assert!(!s.engine().is_running());
    }

    #[test]
    fn unknown_input_is_reported() {
        let mut s = session();
        assert!(matches!(s.execute("/fly"), Err(ShuttleError::UnknownCommand(_))));
        assert!(matches!(s.execute("warp 9"), Err(ShuttleError::UnknownCommand(_))));
        assert!(s.execute("/run many").is_err());
    }

    #[test]
    fn tick_advances_the_lap() {
        let mut s = session();
        s.execute("/tick").unwrap();
        assert_eq!(s.engine().state().step, 1);
    }

    #[test]
    fn run_requires_start() {
        let mut s = session();
        s.execute("/run 10").unwrap();
        assert_eq!(s.engine().state().tick, 0);

        s.execute("start").unwrap();
        s.execute("/run 10").unwrap();
        assert_eq!(s.engine().state().tick, 10);
    }

    #[test]
    fn stale_interrupt_is_discarded() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut s = Session::new(mission(), None, flag.clone()).unwrap();
        s.execute("start").unwrap();
        // A stale interrupt from before the run is discarded.
        flag.store(true, Ordering::SeqCst);
        s.execute("/run 3").unwrap();
        assert_eq!(s.engine().state().tick, 3);
        assert!(s.engine().is_running());
    }

    #[test]
    fn stop_persists_state() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("state.json");
        let mut s = Session::new(
            mission(),
            Some(path.clone()),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        s.execute("start").unwrap();
        s.execute("/tick").unwrap();
        s.execute("/tick").unwrap();
        s.execute("stop").unwrap();

        let saved = state::load_from(&path).unwrap().unwrap();
        assert_eq!(saved.step, 2);
        assert!(!saved.running);
        assert_eq!(saved.current_waypoint.as_deref(), Some("Base"));
    }

    #[test]
    fn quit_saves_and_exits() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("state.json");
        let mut s = Session::new(
            mission(),
            Some(path.clone()),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert_eq!(s.execute("/quit").unwrap(), Flow::Quit);
        assert!(path.exists());
    }
}
