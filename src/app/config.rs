//! File configuration and its merge with command-line values.
//!
//! Values set explicitly on the command line win over config-file values,
//! which win over built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use iadl_core::download::{
    CONNECT_TIMEOUT_SECS, MAX_CONCURRENCY, MAX_RETRIES_LIMIT, MIN_CONCURRENCY, READ_TIMEOUT_SECS,
};

use crate::cli::Args;

/// Directory name under the user config root.
const CONFIG_DIR_NAME: &str = "iadl";

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Parsed `key = value` configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    /// Default destination folder.
    pub(crate) dest: Option<PathBuf>,
    /// Default remote host.
    pub(crate) base_url: Option<String>,
    /// Default worker count (1..=100).
    pub(crate) concurrency: Option<u8>,
    /// Default attempt ceiling per file (1..=10).
    pub(crate) max_retries: Option<u8>,
    /// Default wait between attempts in milliseconds.
    pub(crate) retry_backoff_ms: Option<u64>,
    /// Default pause after each file in milliseconds.
    pub(crate) courtesy_delay_ms: Option<u64>,
    /// File download connect timeout in seconds.
    pub(crate) connect_timeout_secs: Option<u64>,
    /// File download read timeout in seconds.
    pub(crate) read_timeout_secs: Option<u64>,
    /// Default log verbosity.
    pub(crate) verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&usize::from(concurrency))
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
            );
        }

        if let Some(max_retries) = self.max_retries
            && !(1..=MAX_RETRIES_LIMIT).contains(&u32::from(max_retries))
        {
            bail!(
                "Invalid config value for `max_retries`: {max_retries}. Expected range: 1..={MAX_RETRIES_LIMIT}"
            );
        }

        validate_millis("retry_backoff_ms", self.retry_backoff_ms)?;
        validate_millis("courtesy_delay_ms", self.courtesy_delay_ms)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_millis(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value > 60_000 {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 0..=60000");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoadedConfig {
    /// Config path that was considered, if any.
    pub(crate) path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub(crate) config: Option<FileConfig>,
}

/// Which argument values were typed on the command line rather than defaulted.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) dest: bool,
    pub(crate) base_url: bool,
    pub(crate) concurrent: bool,
    pub(crate) max_retries: bool,
    pub(crate) retry_backoff_ms: bool,
    pub(crate) courtesy_delay_ms: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

impl CliValueSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            dest: is_commandline_value(matches, "dest"),
            base_url: is_commandline_value(matches, "base_url"),
            concurrent: is_commandline_value(matches, "concurrent"),
            max_retries: is_commandline_value(matches, "max_retries"),
            retry_backoff_ms: is_commandline_value(matches, "retry_backoff_ms"),
            courtesy_delay_ms: is_commandline_value(matches, "courtesy_delay_ms"),
            verbose: is_commandline_value(matches, "verbose"),
            quiet: is_commandline_value(matches, "quiet"),
        }
    }
}

/// HTTP timeouts for file transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HttpTimeoutSettings {
    pub(crate) connect_secs: u64,
    pub(crate) read_secs: u64,
}

impl Default for HttpTimeoutSettings {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            read_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Arguments after merging the config file, plus settings only the file can set.
#[derive(Debug)]
pub(crate) struct ResolvedConfig {
    pub(crate) args: Args,
    pub(crate) timeouts: HttpTimeoutSettings,
    pub(crate) loaded: LoadedConfig,
}

/// Parses the command line and records which values came from it.
pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command()
        .try_get_matches()
        .unwrap_or_else(|err| exit_on_parse_error(&err));
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| exit_on_parse_error(&err));
    (args, CliValueSources::from_matches(&matches))
}

/// Help and version exit 0; usage errors exit 1 like every other boundary error.
fn exit_on_parse_error(err: &clap::Error) -> ! {
    if err.use_stderr() {
        let _ = err.print();
        std::process::exit(1);
    }
    err.exit()
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Loads the config file named by `--config`, or the default one if present.
pub(crate) fn resolve_config(args: Args, sources: &CliValueSources) -> Result<ResolvedConfig> {
    let loaded = match args.config.as_deref() {
        Some(explicit) => LoadedConfig {
            path: Some(explicit.to_path_buf()),
            config: Some(load_file_config(explicit)?),
        },
        None => load_default_file_config()?,
    };
    let args = apply_config_defaults(args, sources, loaded.config.as_ref());
    let timeouts = resolve_timeouts(loaded.config.as_ref());
    Ok(ResolvedConfig {
        args,
        timeouts,
        loaded,
    })
}

/// Fills every value not typed on the command line from `file_config`.
pub(crate) fn apply_config_defaults(
    mut args: Args,
    sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !sources.dest
        && args.dest.is_none()
        && let Some(dest) = &file_config.dest
    {
        args.dest = Some(dest.clone());
    }

    if !sources.base_url
        && let Some(base_url) = &file_config.base_url
    {
        args.base_url.clone_from(base_url);
    }

    if !sources.concurrent
        && let Some(concurrency) = file_config.concurrency
    {
        args.concurrent = concurrency;
    }

    if !sources.max_retries
        && let Some(max_retries) = file_config.max_retries
    {
        args.max_retries = max_retries;
    }

    if !sources.retry_backoff_ms
        && let Some(backoff) = file_config.retry_backoff_ms
    {
        args.retry_backoff_ms = backoff;
    }

    if !sources.courtesy_delay_ms
        && let Some(delay) = file_config.courtesy_delay_ms
    {
        args.courtesy_delay_ms = delay;
    }

    if !sources.verbose
        && !sources.quiet
        && let Some(verbosity) = file_config.verbosity
    {
        apply_config_verbosity(&mut args, verbosity);
    }

    args
}

fn apply_config_verbosity(args: &mut Args, verbosity: VerbositySetting) {
    match verbosity {
        VerbositySetting::Default => {}
        VerbositySetting::Verbose => args.verbose = 1,
        VerbositySetting::Debug => args.verbose = 2,
        VerbositySetting::Quiet => args.quiet = true,
    }
}

fn resolve_timeouts(file_config: Option<&FileConfig>) -> HttpTimeoutSettings {
    let defaults = HttpTimeoutSettings::default();
    let Some(file_config) = file_config else {
        return defaults;
    };
    HttpTimeoutSettings {
        connect_secs: file_config
            .connect_timeout_secs
            .unwrap_or(defaults.connect_secs),
        read_secs: file_config.read_timeout_secs.unwrap_or(defaults.read_secs),
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/iadl/config.toml`
/// 2. `$HOME/.config/iadl/config.toml`
#[must_use]
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "dest" => {
                cfg.dest = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "base_url" => {
                cfg.base_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "concurrency" => {
                cfg.concurrency = Some(parse_integer_u8(value).with_context(invalid)?);
            }
            "max_retries" => {
                cfg.max_retries = Some(parse_integer_u8(value).with_context(invalid)?);
            }
            "retry_backoff_ms" => {
                cfg.retry_backoff_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "courtesy_delay_ms" => {
                cfg.courtesy_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}
