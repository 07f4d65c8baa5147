//! REPL loop with rustyline.
//!
//! Interactive mode: prompt, meta-commands, history, TAB completion.
//! Pipe mode: read lines from stdin, execute each.

use std::io::{self, BufRead};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use tracing::warn;

use crate::commands::build_repl_cmd;
use crate::format::{format_error, format_output, OutputMode};
use crate::parse::{check_meta_command, matches_to_request, MetaCommand};
use crate::state::SessionState;

/// Run the interactive REPL.
pub fn run_repl(state: &mut SessionState, mode: OutputMode) {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<StashHelper, _> = match Editor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("(error) Cannot start line editor: {}", e);
            return;
        }
    };
    rl.set_helper(Some(StashHelper));

    let history_path = history_file();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = state.prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(trimmed);

                if let Some(meta) = check_meta_command(trimmed) {
                    match meta {
                        MetaCommand::Quit => break,
                        MetaCommand::Clear => print!("\x1B[2J\x1B[1;1H"),
                        MetaCommand::Help { command } => print_help(command.as_deref()),
                    }
                    continue;
                }

                execute_line(trimmed, state, mode);
            }
            // Ctrl-C: new prompt
            Err(ReadlineError::Interrupted) => continue,
            // Ctrl-D
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("(error) {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        if let Err(e) = rl.save_history(path) {
            warn!(target: "stashkit::cli", error = %e, "Could not save REPL history");
        }
    }
}

/// Run in pipe mode: read lines from stdin, execute each.
///
/// Returns the process exit code: 1 if any line failed.
pub fn run_pipe(state: &mut SessionState, mode: OutputMode) -> i32 {
    let stdin = io::stdin();
    let mut exit_code = 0;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(meta) = check_meta_command(trimmed) {
            match meta {
                MetaCommand::Quit => break,
                MetaCommand::Help { command } => print_help(command.as_deref()),
                MetaCommand::Clear => {}
            }
            continue;
        }

        if !execute_line(trimmed, state, mode) {
            exit_code = 1;
        }
    }

    exit_code
}

/// Tokenize, parse and execute one line. Returns true on success.
fn execute_line(line: &str, state: &mut SessionState, mode: OutputMode) -> bool {
    let tokens = match shlex::split(line) {
        Some(t) if !t.is_empty() => t,
        Some(_) => return true,
        None => {
            eprintln!("(error) Invalid quoting: {}", line);
            return false;
        }
    };

    let matches = match build_repl_cmd().try_get_matches_from(tokens) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            return false;
        }
    };

    let request = match matches_to_request(&matches) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("(error) {}", e);
            return false;
        }
    };

    match state.execute(request) {
        Ok(output) => {
            let formatted = format_output(&output, mode);
            if !formatted.is_empty() {
                println!("{}", formatted);
            }
            true
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            false
        }
    }
}

fn history_file() -> Option<String> {
    std::env::var("HOME")
        .ok()
        .map(|h| format!("{}/.stash_history", h))
}

fn print_help(command: Option<&str>) {
    if let Some(cmd) = command {
        let cli = build_repl_cmd();
        if let Err(e) = cli.try_get_matches_from(vec![cmd, "--help"]) {
            println!("{}", e);
        }
    } else {
        println!("Available commands:");
        println!("  store <value> [--int|--float|--bytes]   Store a value, print its key");
        println!("  get <key> [--as text|int|float|raw]     Read a value");
        println!("  count [identity]                        Invocation count (default: Cache.store)");
        println!("  replay [identity]                       Recorded calls (default: Cache.store)");
        println!("  flush                                   Drop every key");
        println!();
        println!("Meta-commands:");
        println!("  help [command]         Show help");
        println!("  quit / exit            Exit REPL");
        println!("  clear                  Clear screen");
    }
}

// =========================================================================
// TAB Completion
// =========================================================================

const TOP_LEVEL_COMMANDS: &[&str] = &[
    "store", "get", "count", "replay", "flush", "help", "quit", "exit", "clear",
];

fn flags_for(cmd: &str) -> &'static [&'static str] {
    match cmd {
        "store" => &["--int", "--float", "--bytes"],
        "get" => &["--as"],
        _ => &[],
    }
}

struct StashHelper;

impl Helper for StashHelper {}
impl Validator for StashHelper {}
impl Highlighter for StashHelper {}
impl Hinter for StashHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for StashHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_pos = &line[..pos];
        let parts: Vec<&str> = line_to_pos.split_whitespace().collect();
        let trailing_space = line_to_pos.ends_with(' ');

        let (prefix, pool): (&str, &[&str]) = match parts.as_slice() {
            [] => ("", TOP_LEVEL_COMMANDS),
            [word] if !trailing_space => (*word, TOP_LEVEL_COMMANDS),
            [cmd, ..] if trailing_space => ("", flags_for(cmd)),
            [cmd, .., last] if last.starts_with('-') => (*last, flags_for(cmd)),
            _ => return Ok((pos, Vec::new())),
        };

        let candidates = pool
            .iter()
            .filter(|c| c.starts_with(prefix))
            .map(|c| Pair {
                display: c.to_string(),
                replacement: c.to_string(),
            })
            .collect();
        Ok((pos - prefix.len(), candidates))
    }
}
