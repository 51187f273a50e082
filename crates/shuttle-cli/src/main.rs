//! `shuttle-cli` – interactive shell for the shuttle autopilot
//!
//! This binary flies the autopilot against the in-process simulated ship.
//! It:
//!
//! 1. Loads `~/.shuttle/mission.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Restores the saved step and waypoint from `~/.shuttle/state.json`.
//! 3. Drops the user into an **interactive REPL** that ticks the engine and
//!    accepts operator commands.
//! 4. Intercepts **Ctrl-C** during `/run` to halt the autopilot and save its
//!    state.

mod config;
mod repl;
mod state;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use shuttle_runtime::{MissionConfig, init_tracing};
use shuttle_types::Waypoint;

fn main() {
    // Held for the whole process; dropping it flushes pending spans.
    let _tracing = init_tracing("shuttle");

    print_banner();

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – halting autopilot …".yellow().bold());
        interrupted_handler.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; /run can only be left by its tick limit");
    }

    // ── Mission ───────────────────────────────────────────────────────────
    let mission = match config::load() {
        Ok(Some(mission)) => {
            println!(
                "  Mission loaded from {}",
                config::mission_path().display().to_string().bold()
            );
            mission
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Mission error".red(), e);
            println!("  Using the default mission.");
            MissionConfig::default()
        }
    };

    let mut session = match repl::Session::new(mission, Some(state::state_path()), interrupted) {
        Ok(session) => session,
        Err(e) => {
            println!("{}: {}", "Cannot start autopilot".red(), e);
            std::process::exit(1);
        }
    };

    // ── Saved state ───────────────────────────────────────────────────────
    match state::load() {
        Ok(Some(saved)) => {
            session.engine_mut().restore(&saved);
            println!(
                "  Resuming at step {} ({})",
                session.engine().state().step,
                session.engine().current_step().to_string().bold()
            );
        }
        Ok(None) => {}
        Err(e) => println!("{}: {} – starting a fresh lap", "State error".red(), e),
    }

    println!(
        "  Route: {} waypoint(s). Type {} for a list of commands.\n",
        session.engine().state().waypoints.len(),
        "/help".bold().cyan()
    );

    repl::run(session);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> MissionConfig {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║      Shuttle First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No mission found.  Let's plan a route.\n");

    let mut mission = MissionConfig::default();

    println!("  Paste GPS waypoints (GPS:Name:x:y:z:), one per line; empty line to finish.");
    loop {
        let line = prompt_line(
            &format!("  Waypoint #{}: ", mission.waypoints.len() + 1),
            "",
        );
        if line.is_empty() {
            break;
        }
        match line.parse::<Waypoint>() {
            Ok(wp) => mission.waypoints.push(wp),
            Err(e) => println!("  {} {}", "Skipped:".yellow(), e),
        }
    }

    let period = prompt_line(
        &format!("  Parking period in seconds [{}]: ", mission.parking_period_secs),
        &mission.parking_period_secs.to_string(),
    );
    match period.parse::<i64>() {
        Ok(secs) if secs >= 0 => mission.parking_period_secs = secs,
        _ => println!(
            "  {} '{}' is not a valid period, keeping {}",
            "Warning:".yellow(),
            period,
            mission.parking_period_secs
        ),
    }

    let orbit = prompt_line("  Fly an orbit instead of the route? [y/N]: ", "n");
    mission.orbit_mode = orbit.eq_ignore_ascii_case("y");

    match config::save(&mission) {
        Ok(()) => println!(
            "\n  {} Mission saved to {}\n",
            "✓".green().bold(),
            config::mission_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving mission".red(), e),
    }
    mission
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"     _           _   _   _      "#.bold().cyan());
    println!("{}", r#" ___| |__  _   _| |_| |_| | ___ "#.bold().cyan());
    println!("{}", r#"/ __| '_ \| | | | __| __| |/ _ \"#.bold().cyan());
    println!("{}", r#"\__ \ | | | |_| | |_| |_| |  __/"#.bold().cyan());
    println!("{}", r#"|___/_| |_|\__,_|\__|\__|_|\___|"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Shuttle".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Autonomous docking shuttle autopilot");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{msg}");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
