//! Stash CLI: Redis-style front end for the stashkit instrumented cache.
//!
//! Three modes:
//! - **Shell mode**: `stash [flags] COMMAND` (single command, exit)
//! - **REPL mode**: `stash [flags]` (interactive prompt if stdin is a TTY)
//! - **Pipe mode**: `echo "store hello" | stash` (line-by-line from stdin)

mod commands;
mod format;
mod logging;
mod parse;
mod repl;
mod state;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use stashkit_engine::{InstrumentedCache, StashConfig, CONFIG_FILE_NAME};
use tracing::debug;

use commands::build_cli;
use format::{format_error, format_output, OutputMode};
use parse::matches_to_request;
use state::SessionState;

fn main() {
    logging::init_tracing(None);

    let matches = build_cli().get_matches();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else if matches.get_flag("raw") {
        OutputMode::Raw
    } else {
        OutputMode::Human
    };

    let mut state = match open_session(&matches) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if matches.subcommand().is_some() {
        let exit_code = run_shell_mode(&matches, &mut state, output_mode);
        process::exit(exit_code);
    } else if std::io::stdin().is_terminal() {
        repl::run_repl(&mut state, output_mode);
    } else {
        let exit_code = repl::run_pipe(&mut state, output_mode);
        process::exit(exit_code);
    }
}

/// Load `stash.toml` (writing the default when the implicit path is
/// missing) and apply flag overrides.
fn load_config(matches: &clap::ArgMatches) -> Result<StashConfig, String> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => StashConfig::from_file(&PathBuf::from(path)).map_err(|e| e.to_string())?,
        None => {
            let path = PathBuf::from(CONFIG_FILE_NAME);
            StashConfig::write_default_if_missing(&path).map_err(|e| e.to_string())?;
            StashConfig::from_file(&path).map_err(|e| e.to_string())?
        }
    };

    if let Some(backend) = matches.get_one::<String>("backend") {
        config.backend = backend.parse().map_err(|e: stashkit_core::Error| e.to_string())?;
    }
    if let Some(url) = matches.get_one::<String>("redis-url") {
        config.redis_url = url.clone();
    }
    if matches.get_flag("no-flush") {
        config.flush_on_init = false;
    }
    if let Some(mode) = matches.get_one::<String>("instrumentation") {
        config.instrumentation = mode.parse().map_err(|e: stashkit_core::Error| e.to_string())?;
    }
    Ok(config)
}

fn open_session(matches: &clap::ArgMatches) -> Result<SessionState, String> {
    let config = load_config(matches)?;
    debug!(target: "stashkit::cli", ?config, "Loaded configuration");

    let client = config
        .open_kv()
        .map_err(|e| format!("Failed to open store: {}", e))?;
    let cache = InstrumentedCache::with_options(client, config.cache_options())
        .map_err(|e| format!("Failed to initialize cache: {}", e))?;

    let backend = match config.backend {
        stashkit_engine::Backend::Memory => "memory",
        stashkit_engine::Backend::Redis => "redis",
    };
    Ok(SessionState::new(cache, backend))
}

fn run_shell_mode(matches: &clap::ArgMatches, state: &mut SessionState, mode: OutputMode) -> i32 {
    let request = match matches_to_request(matches) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("(error) {}", e);
            return 1;
        }
    };
    match state.execute(request) {
        Ok(output) => {
            let formatted = format_output(&output, mode);
            if !formatted.is_empty() {
                println!("{}", formatted);
            }
            0
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            1
        }
    }
}
