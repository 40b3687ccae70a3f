use crate::cli::Args;

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(no_color_env: bool, dumb_terminal: bool) -> bool {
    no_color_env || dumb_terminal
}

/// Progress bars draw only on an interactive, non-dumb stderr and never with
/// quiet or JSON output.
pub(crate) fn should_use_progress_bars(
    stderr_is_terminal: bool,
    quiet: bool,
    json: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !json && !dumb_terminal
}

/// Maps `--quiet`/`--verbose` to a default tracing level.
pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn is_no_color_requested() -> bool {
    should_disable_color(no_color_env_requested(), is_dumb_terminal())
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `default_level`.
pub(crate) fn init_tracing(default_level: &str, no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_progress_bars_need_interactive_stderr() {
        assert!(should_use_progress_bars(true, false, false, false));
        assert!(!should_use_progress_bars(false, false, false, false));
        assert!(!should_use_progress_bars(true, true, false, false));
        assert!(!should_use_progress_bars(true, false, true, false));
        assert!(!should_use_progress_bars(true, false, false, true));
    }

    #[test]
    fn test_color_disabled_by_env_or_dumb_terminal() {
        assert!(!should_disable_color(false, false));
        assert!(should_disable_color(true, false));
        assert!(should_disable_color(false, true));
    }

    #[test]
    fn test_default_log_level_follows_flags() {
        let parse = |extra: &[&str]| {
            let mut argv = vec!["iadl", "-u", "item", "-s"];
            argv.extend_from_slice(extra);
            Args::try_parse_from(argv).unwrap()
        };
        assert_eq!(resolve_default_log_level(&parse(&[])), "info");
        assert_eq!(resolve_default_log_level(&parse(&["--verbose"])), "debug");
        assert_eq!(
            resolve_default_log_level(&parse(&["--verbose", "--verbose"])),
            "trace"
        );
        assert_eq!(resolve_default_log_level(&parse(&["-q"])), "error");
    }
}
