//! Clap command tree definition.
//!
//! Builds the `clap::Command` tree used by both shell mode (directly)
//! and REPL mode (via `try_get_matches_from`).

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("stash")
        .about("Redis-style CLI for the stashkit instrumented cache")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Config file (default: stash.toml, created if missing)")
                .global(true),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .help("Key-value backend, overrides the config file")
                .value_parser(["memory", "redis"])
                .global(true),
        )
        .arg(
            Arg::new("redis-url")
                .long("redis-url")
                .help("Redis connection URL, overrides the config file")
                .global(true),
        )
        .arg(
            Arg::new("no-flush")
                .long("no-flush")
                .help("Keep existing data instead of flushing on start")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("instrumentation")
                .long("instrumentation")
                .help("Bookkeeping around store: off, count, history, full")
                .value_parser(["off", "count", "history", "full"])
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .conflicts_with("raw")
                .global(true),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Raw output mode (no type prefixes, no quotes)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommands(session_commands())
}

/// Build a command tree for REPL mode (no global flags).
pub fn build_repl_cmd() -> Command {
    Command::new("repl")
        .multicall(true)
        .subcommand_required(true)
        .subcommands(session_commands())
}

fn session_commands() -> Vec<Command> {
    vec![
        build_store(),
        build_get(),
        build_count(),
        build_replay(),
        build_flush(),
    ]
}

fn build_store() -> Command {
    Command::new("store")
        .about("Store a value under a fresh key and print the key")
        .arg(Arg::new("value").required(true).help("Value to store"))
        .arg(
            Arg::new("int")
                .long("int")
                .help("Store as an integer")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("float")
                .long("float")
                .help("Store as a float")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("bytes")
                .long("bytes")
                .help("Value is hex-encoded bytes")
                .action(ArgAction::SetTrue),
        )
        .group(
            clap::ArgGroup::new("kind")
                .args(["int", "float", "bytes"])
                .multiple(false),
        )
}

fn build_get() -> Command {
    Command::new("get")
        .about("Read a value by key")
        .arg(Arg::new("key").required(true).help("Key returned by store"))
        .arg(
            Arg::new("as")
                .long("as")
                .help("Decoding: text (default), int, float, raw")
                .value_parser(["text", "int", "float", "raw"])
                .default_value("text"),
        )
}

fn build_count() -> Command {
    Command::new("count")
        .about("Show how many times an operation was called")
        .arg(
            Arg::new("identity")
                .help("Operation identity (default: Cache.store)"),
        )
}

fn build_replay() -> Command {
    Command::new("replay")
        .about("Print the recorded calls of an operation")
        .arg(
            Arg::new("identity")
                .help("Operation identity (default: Cache.store)"),
        )
}

fn build_flush() -> Command {
    Command::new("flush").about("Drop every key in the store")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_valid() {
        build_cli().debug_assert();
        build_repl_cmd().debug_assert();
    }

    #[test]
    fn test_store_kinds_are_exclusive() {
        let result = build_repl_cmd().try_get_matches_from(["store", "1", "--int", "--float"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_get_defaults_to_text() {
        let matches = build_repl_cmd()
            .try_get_matches_from(["get", "abc"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("as").map(String::as_str), Some("text"));
    }

    #[test]
    fn test_global_flags_parse() {
        let matches = build_cli()
            .try_get_matches_from(["stash", "--backend", "memory", "--no-flush", "count"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("backend").map(String::as_str),
            Some("memory")
        );
        assert!(matches.get_flag("no-flush"));
    }
}
