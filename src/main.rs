//! Command-line driver: load a specification, set up the game, and play
//! moves from a script file or stdin.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tabula::render::{parse_position, render_board};
use tabula::rules::validate_and_execute;
use tabula::spec::{setup::initialize, GameSpec, Profile, SpecError};
use tabula::{GameState, Position, Value};

/// Play a specification-defined board game.
#[derive(Debug, Parser)]
#[command(name = "tabula", version, about)]
struct Cli {
    /// Path to the game specification (JSON).
    spec: PathBuf,

    /// Optional moves file; once exhausted, input switches to stdin.
    moves: Option<PathBuf>,

    /// Presentation profile to render with.
    #[arg(long, default_value = "ascii")]
    profile: String,

    /// Log condition-by-condition validation traces.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "tabula=trace" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), SpecError> {
    let spec = GameSpec::from_path(&cli.spec)?;
    println!("Loaded game: {}", spec.name);

    let profile = match spec.profile(&cli.profile) {
        Some(profile) => profile.clone(),
        None => {
            warn!(profile = %cli.profile, "presentation profile not found, using fallback");
            Profile::default()
        }
    };

    let mut state = initialize(&spec)?;
    println!(
        "Setup complete: {} entities on the board.",
        state.entity_count()
    );

    let mut script: VecDeque<String> = match &cli.moves {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            println!("Running scripted moves from {}.", path.display());
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        }
        None => VecDeque::new(),
    };

    let phase = spec.rules.flow.initial_phase.clone();
    let stdin = io::stdin();

    loop {
        print!("{}", render_board(&state, &profile));

        let Some(actor) = current_player_name(&state) else {
            println!("No current player; game over.");
            return Ok(());
        };
        println!("Turn: {actor}");

        let line = if let Some(line) = script.pop_front() {
            println!("Executing from file: {line}");
            line
        } else {
            print!("Player '{actor}', enter move (format: A1 B2 C3...) or 'quit': ");
            io::stdout().flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(());
            }
            line.trim().to_string()
        };

        if line.eq_ignore_ascii_case("quit") {
            println!("Game ended.");
            return Ok(());
        }

        let path = match parse_path(&line, &state) {
            Ok(path) => path,
            Err(message) => {
                println!("!! {message}");
                abort_script(&mut script);
                continue;
            }
        };

        match validate_and_execute(
            &mut state,
            &spec.rules,
            spec.rules.allowed_actions(&phase),
            &path,
        ) {
            Ok(outcome) => {
                let actions: Vec<&str> =
                    outcome.segments.iter().map(|s| s.action.as_str()).collect();
                println!("Move accepted ({}).", actions.join(", "));
                advance_turn(&mut state);
            }
            Err(err) => {
                println!("!! {err}");
                abort_script(&mut script);
            }
        }
    }
}

/// Parse a whitespace-separated path like `A3 B4 C5`.
fn parse_path(line: &str, state: &GameState) -> Result<Vec<Position>, String> {
    let positions: Result<Vec<Position>, _> = line
        .split_whitespace()
        .map(|token| parse_position(token, state))
        .collect();
    let positions = positions.map_err(|err| err.to_string())?;
    if positions.len() < 2 {
        return Err("a move requires at least a start and an end position".to_string());
    }
    Ok(positions)
}

fn current_player_name(state: &GameState) -> Option<String> {
    let id = state.global("current_player")?.as_player()?;
    Some(state.player(id)?.name.clone())
}

/// Two-role successor rule: after a committed move the other role acts.
fn advance_turn(state: &mut GameState) {
    let Some(current) = state.global("current_player").and_then(Value::as_player) else {
        return;
    };
    let next = state.players().iter().find(|p| p.id != current).map(|p| p.id);
    if let Some(next) = next {
        state.set_global("current_player", Value::Player(next));
    }
}

/// A rejected scripted move abandons the rest of the script rather than the
/// process.
fn abort_script(script: &mut VecDeque<String>) {
    if !script.is_empty() {
        println!("!! Aborting script; switching to interactive mode.");
        script.clear();
    }
}
