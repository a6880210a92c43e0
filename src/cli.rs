use std::{
    collections::BTreeMap,
    env,
    fs::OpenOptions,
    io::{self, IsTerminal},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, style::Color, Terminal};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::display_item::DisplayItem;
use crate::event::SaltEvent;
use crate::source::{demo_seed, run_source, Source, EVENT_CHANNEL_CAPACITY};
use crate::theme::{parse_hex_color, syntax_palette, UiTheme, DEFAULT_SELECTION, DEFAULT_SYNTAX_THEME};
use crate::tui::{Action, Tui, TuiConfig, DEFAULT_MAX_ITEMS};

const CONFIG_FILE: &str = "salt-live.json";
const LOG_ENV: &str = "SALT_LIVE_LOG";
const DEFAULT_LOG_FILTER: &str = "info";
const TUI_TICK_MS: u64 = 50;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
enum UiEvent {
    Item(DisplayItem),
    SourceClosed,
    Quit,
}

#[derive(Parser, Debug)]
#[command(name = "salt-live", version, about = "Live view of the Salt master event bus")]
struct Cli {
    /// Number of events kept in history.
    #[arg(long)]
    max_items: Option<usize>,
    /// Syntax theme of the details pane.
    #[arg(long)]
    theme: Option<String>,
    /// Selection color as #RRGGBB.
    #[arg(long)]
    selection_color: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Newline-delimited events to read; `-` reads stdin.
    #[arg(long, conflicts_with = "demo")]
    input: Option<PathBuf>,
    /// Generate local demo events instead of reading input.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    demo: bool,
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
struct Config {
    max_items: usize,
    theme: String,
    selection_color: Color,
    log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone)]
struct PartialConfig {
    max_items: Option<usize>,
    theme: Option<String>,
    selection_color: Option<String>,
    log_file: Option<PathBuf>,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        if other.max_items.is_some() {
            self.max_items = other.max_items;
        }
        if other.theme.is_some() {
            self.theme = other.theme;
        }
        if other.selection_color.is_some() {
            self.selection_color = other.selection_color;
        }
        if other.log_file.is_some() {
            self.log_file = other.log_file;
        }
    }
}

impl Config {
    fn from_partial(partial: PartialConfig) -> Result<Self, ConfigError> {
        let max_items = partial.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
        if max_items == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_items".to_string(),
                value: "0".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }

        let selection_color = match partial.selection_color {
            Some(value) => parse_hex_color(&value).map_err(|reason| ConfigError::InvalidValue {
                name: "selection_color".to_string(),
                value,
                reason,
            })?,
            None => DEFAULT_SELECTION,
        };

        Ok(Self {
            max_items,
            theme: partial.theme.unwrap_or_else(|| DEFAULT_SYNTAX_THEME.to_string()),
            selection_color,
            log_file: partial.log_file,
        })
    }

    fn tui_config(&self) -> TuiConfig {
        TuiConfig {
            max_items: self.max_items,
            theme: UiTheme::default()
                .with_syntax(self.theme.clone())
                .with_selection(self.selection_color),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    #[serde(alias = "maxItems")]
    max_items: Option<usize>,
    theme: Option<String>,
    #[serde(alias = "selectionColor")]
    selection_color: Option<String>,
    #[serde(alias = "logFile")]
    log_file: Option<PathBuf>,
}

impl FileConfig {
    fn into_partial(self) -> PartialConfig {
        PartialConfig {
            max_items: self.max_items,
            theme: self.theme,
            selection_color: self.selection_color,
            log_file: self.log_file,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("config file not found: {path}")]
    MissingConfig { path: PathBuf },
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
    #[error("invalid {name} `{value}`: {reason}")]
    InvalidValue { name: String, value: String, reason: String },
    #[error("no event input: stdin is a terminal; pipe events in, pass --input <PATH> or use --demo")]
    NoInput,
}

fn cli_overrides(cli: &Cli) -> PartialConfig {
    PartialConfig {
        max_items: cli.max_items,
        theme: cli.theme.clone(),
        selection_color: cli.selection_color.clone(),
        log_file: cli.log_file.clone(),
    }
}

fn env_overrides(env: &BTreeMap<String, String>) -> Result<PartialConfig, ConfigError> {
    let mut partial = PartialConfig::default();
    if let Some(value) = env.get("SALT_LIVE_MAX_ITEMS") {
        partial.max_items = Some(parse_usize("SALT_LIVE_MAX_ITEMS", value)?);
    }
    if let Some(theme) = env.get("SALT_LIVE_THEME") {
        if !theme.trim().is_empty() {
            partial.theme = Some(theme.clone());
        }
    }
    if let Some(color) = env.get("SALT_LIVE_SELECTION_COLOR") {
        if !color.trim().is_empty() {
            partial.selection_color = Some(color.clone());
        }
    }
    if let Some(path) = env.get("SALT_LIVE_LOG_FILE") {
        if !path.trim().is_empty() {
            partial.log_file = Some(PathBuf::from(path));
        }
    }
    Ok(partial)
}

fn parse_usize(name: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnv { name: name.to_string(), value: value.to_string() })
}

fn load_config_file(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let parsed: FileConfig = serde_json::from_str(&contents)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;
    Ok(parsed.into_partial())
}

fn find_config_path(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}

fn resolve_config(
    cli: &Cli,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let mut partial = PartialConfig::default();

    let config_path = if let Some(path) = &cli.config {
        if !path.is_file() {
            return Err(ConfigError::MissingConfig { path: path.clone() });
        }
        Some(path.clone())
    } else {
        find_config_path(cwd)
    };

    if let Some(path) = config_path.as_ref() {
        partial.merge(load_config_file(path)?);
    }
    partial.merge(env_overrides(env)?);
    partial.merge(cli_overrides(cli));

    Ok((Config::from_partial(partial)?, config_path))
}

fn resolve_source(cli: &Cli, stdin_is_terminal: bool) -> Result<Source, ConfigError> {
    if cli.demo {
        return Ok(Source::Demo { seed: demo_seed() });
    }
    match &cli.input {
        Some(path) if path.as_os_str() == "-" => Ok(Source::Stdin),
        Some(path) => Ok(Source::File(path.clone())),
        None if !stdin_is_terminal => Ok(Source::Stdin),
        None => Err(ConfigError::NoInput),
    }
}

/// Installs the tracing subscriber. The TUI owns the terminal, so without a log file
/// everything is discarded.
fn init_logging(log_file: Option<&Path>) -> Result<(), DynError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()?;
        }
        None => builder.with_writer(io::sink).try_init()?,
    }
    Ok(())
}

async fn run_tui(
    config: TuiConfig,
    mut event_rx: mpsc::Receiver<SaltEvent>,
) -> Result<(), DynError> {
    let (ui_tx, ui_rx) = std::sync::mpsc::channel::<UiEvent>();
    let ui_tx_signal = ui_tx.clone();
    let running = Arc::new(AtomicBool::new(true));
    let running_signal = running.clone();

    let ingest_handle = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let item = DisplayItem::build_or_placeholder(&event);
            if ui_tx.send(UiEvent::Item(item)).is_err() {
                return;
            }
        }
        let _ = ui_tx.send(UiEvent::SourceClosed);
    });

    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ui_tx_signal.send(UiEvent::Quit);
            running_signal.store(false, Ordering::SeqCst);
        }
    });

    tokio::task::spawn_blocking(move || run_tui_loop(config, ui_rx, running)).await??;

    ingest_handle.abort();
    signal_handle.abort();

    Ok(())
}

fn run_tui_loop(
    config: TuiConfig,
    ui_rx: std::sync::mpsc::Receiver<UiEvent>,
    running: Arc<AtomicBool>,
) -> Result<(), DynError> {
    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let mut tui = Tui::new(config);
    let size = terminal.size()?;
    tui.handle_resize(size.width, size.height);

    while running.load(Ordering::SeqCst) {
        while let Ok(event) = ui_rx.try_recv() {
            match event {
                UiEvent::Item(item) => tui.push_item(item),
                UiEvent::SourceClosed => {
                    info!(buffered = tui.history().len(), "event source closed; view stays open");
                }
                UiEvent::Quit => {
                    running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }

        if !running.load(Ordering::SeqCst) {
            break;
        }

        terminal.draw(|frame| {
            tui.render(frame);
        })?;

        if event::poll(Duration::from_millis(TUI_TICK_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if tui.handle_key(key) == Action::Quit {
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                Event::Resize(width, height) => tui.handle_resize(width, height),
                _ => {}
            }
        }
    }

    terminal.show_cursor()?;
    Ok(())
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, DynError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

pub async fn run() -> Result<(), DynError> {
    let cli = Cli::parse();
    let cwd = env::current_dir()?;
    let env_map: BTreeMap<String, String> = env::vars().collect();
    let (config, config_path) = resolve_config(&cli, &cwd, &env_map)?;
    let source = resolve_source(&cli, io::stdin().is_terminal())?;

    init_logging(config.log_file.as_deref())?;

    if let Some(path) = &config_path {
        info!(path = %path.display(), "loaded config file");
    } else {
        info!("no {CONFIG_FILE} found, using defaults and env/cli overrides");
    }
    info!(
        max_items = config.max_items,
        theme = %config.theme,
        selection_color = ?config.selection_color,
        source = %source.label(),
        "resolved config"
    );
    if syntax_palette(&config.theme).is_none() {
        warn!(theme = %config.theme, "unknown syntax theme; details are shown as plain text");
    }

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let producer_handle = tokio::spawn(async move {
        if let Err(error) = run_source(source, event_tx).await {
            warn!(%error, "event producer failed");
        }
    });

    let result = run_tui(config.tui_config(), event_rx).await;
    producer_handle.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn bare_cli() -> Cli {
        Cli {
            max_items: None,
            theme: None,
            selection_color: None,
            config: None,
            input: None,
            demo: false,
            log_file: None,
        }
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "salt-live",
            "--max-items",
            "250",
            "--theme",
            "solarized-light",
            "--selection-color",
            "#112233",
            "--config",
            "config.json",
            "--input",
            "events.jsonl",
            "--log-file",
            "salt-live.log",
        ]);

        assert_eq!(cli.max_items, Some(250));
        assert_eq!(cli.theme.as_deref(), Some("solarized-light"));
        assert_eq!(cli.selection_color.as_deref(), Some("#112233"));
        assert_eq!(cli.config.as_deref(), Some(Path::new("config.json")));
        assert_eq!(cli.input.as_deref(), Some(Path::new("events.jsonl")));
        assert_eq!(cli.log_file.as_deref(), Some(Path::new("salt-live.log")));
        assert!(!cli.demo);
    }

    #[test]
    fn cli_rejects_input_with_demo() {
        let result = Cli::try_parse_from(["salt-live", "--demo", "--input", "events.jsonl"]);
        assert!(result.is_err());
    }

    #[test]
    fn resolves_config_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let child = root.join("nested");
        fs::create_dir_all(&child).expect("create nested dir");

        let config_path = root.join(CONFIG_FILE);
        fs::write(
            &config_path,
            r##"{
  "maxItems": 50,
  "theme": "terminal",
  "selectionColor": "#010203",
  "logFile": "from-file.log"
}"##,
        )
        .expect("write config");

        let mut env_map = BTreeMap::new();
        env_map.insert("SALT_LIVE_MAX_ITEMS".to_string(), "75".to_string());
        env_map.insert("SALT_LIVE_THEME".to_string(), "solarized-light".to_string());

        let cli = Cli { max_items: Some(100), ..bare_cli() };

        let (config, resolved_path) = resolve_config(&cli, &child, &env_map).unwrap();

        assert_eq!(resolved_path.as_deref(), Some(config_path.as_path()));
        assert_eq!(config.max_items, 100);
        assert_eq!(config.theme, "solarized-light");
        assert_eq!(config.selection_color, Color::Rgb(1, 2, 3));
        assert_eq!(config.log_file.as_deref(), Some(Path::new("from-file.log")));
    }

    #[test]
    fn defaults_without_any_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (config, path) = resolve_config(&bare_cli(), temp.path(), &BTreeMap::new()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.max_items, DEFAULT_MAX_ITEMS);
        assert_eq!(config.theme, DEFAULT_SYNTAX_THEME);
        assert_eq!(config.selection_color, DEFAULT_SELECTION);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn snake_case_file_keys_are_accepted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"max_items": 12, "selection_color": "rgb:ff/ff/00"}"#).expect("write");
        let partial = load_config_file(&path).unwrap();
        assert_eq!(partial.max_items, Some(12));
        assert_eq!(partial.selection_color.as_deref(), Some("rgb:ff/ff/00"));
    }

    #[test]
    fn zero_max_items_is_rejected() {
        let cli = Cli { max_items: Some(0), ..bare_cli() };
        let temp = tempfile::tempdir().expect("tempdir");
        let err = resolve_config(&cli, temp.path(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[rstest]
    #[case("SALT_LIVE_MAX_ITEMS", "many")]
    #[case("SALT_LIVE_MAX_ITEMS", "-4")]
    fn invalid_env_values_are_rejected(#[case] name: &str, #[case] value: &str) {
        let mut env_map = BTreeMap::new();
        env_map.insert(name.to_string(), value.to_string());
        let err = env_overrides(&env_map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn invalid_selection_color_is_rejected() {
        let cli = Cli { selection_color: Some("yellow-ish".to_string()), ..bare_cli() };
        let temp = tempfile::tempdir().expect("tempdir");
        let err = resolve_config(&cli, temp.path(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cli = Cli { config: Some(temp.path().join("absent.json")), ..bare_cli() };
        let err = resolve_config(&cli, temp.path(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfig { .. }));
    }

    #[test]
    fn find_config_path_none_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(find_config_path(temp.path()).is_none());
    }

    #[test]
    fn load_config_file_invalid_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "{not valid json").expect("write");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn resolves_event_source() {
        assert!(matches!(
            resolve_source(&Cli { demo: true, ..bare_cli() }, true),
            Ok(Source::Demo { .. })
        ));
        assert_eq!(
            resolve_source(&Cli { input: Some(PathBuf::from("-")), ..bare_cli() }, true).unwrap(),
            Source::Stdin
        );
        assert_eq!(
            resolve_source(&Cli { input: Some(PathBuf::from("ev.jsonl")), ..bare_cli() }, false)
                .unwrap(),
            Source::File(PathBuf::from("ev.jsonl"))
        );
        assert_eq!(resolve_source(&bare_cli(), false).unwrap(), Source::Stdin);
        assert!(matches!(resolve_source(&bare_cli(), true), Err(ConfigError::NoInput)));
    }

    #[test]
    fn tui_config_carries_theme_and_selection() {
        let config = Config {
            max_items: 9,
            theme: "terminal".to_string(),
            selection_color: Color::Rgb(9, 9, 9),
            log_file: None,
        };
        let tui_config = config.tui_config();
        assert_eq!(tui_config.max_items, 9);
        assert_eq!(tui_config.theme.syntax, "terminal");
        assert_eq!(tui_config.theme.selection, Color::Rgb(9, 9, 9));
    }
}
