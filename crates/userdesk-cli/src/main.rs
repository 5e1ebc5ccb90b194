//! `userdesk`: terminal admin panel for the userdesk server.
//!
//! # Usage
//!
//! ```
//! userdesk --url http://localhost:8080
//! userdesk --config ~/.config/userdesk/config.toml --log-file userdesk.log
//! ```

#![allow(async_fn_in_trait)]

mod app;
mod client;
mod form;
mod guard;
mod router;
mod session;
mod ui;
mod users;

#[cfg(test)]
mod e2e;
#[cfg(test)]
mod testing;

use std::{
  fs::File,
  io,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use client::{ApiClient, ApiConfig, Backend};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "userdesk", about = "Terminal admin panel for userdesk")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the userdesk server (default: http://localhost:8080).
  #[arg(long, env = "USERDESK_URL")]
  url: Option<String>,

  /// Write logs here. The terminal belongs to the UI, so without this
  /// nothing is logged.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

fn init_logging(path: &Path) -> Result<()> {
  let file = File::create(path)
    .with_context(|| format!("creating log file {}", path.display()))?;
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(path) = &args.log_file {
    init_logging(path)?;
  }

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
  };
  tracing::info!(url = %api_config.base_url, "starting userdesk");

  let client = ApiClient::new(api_config).context("building HTTP client")?;
  let mut app = App::new(Arc::new(client));

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop<B: Backend>(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<B>,
) -> Result<()> {
  // Entering `/` runs the session check and the first fetch.
  let view = app.clone();
  if run_pending(terminal, &view, app.mount(), ctrl_c_pressed).await?.is_none() {
    return Ok(());
  }

  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    let Some(Event::Key(key)) = maybe_event else { continue };
    let view = app.clone();
    match run_pending(terminal, &view, app.handle_key(key), ctrl_c_pressed).await? {
      Some(Ok(true)) => {}
      Some(Ok(false)) | None => break,
      Some(Err(e)) => return Err(e),
    }
  }

  Ok(())
}

/// Drive `op` to completion, redrawing `view` whenever a store changes.
///
/// `view` is a clone of the app `op` is working on. It shares the stores, so
/// its frames show checks and loads while they are in flight. Returns `None`
/// if `interrupted` reports a quit first; `op` is then dropped mid-request.
async fn run_pending<T, B, F>(
  terminal: &mut Terminal<T>,
  view: &App<B>,
  op: F,
  mut interrupted: impl FnMut() -> io::Result<bool>,
) -> Result<Option<F::Output>>
where
  T: ratatui::backend::Backend,
  B: Backend,
  F: Future,
{
  let mut session = view.session.subscribe();
  let mut users = view.users.subscribe();
  let mut tick = tokio::time::interval(Duration::from_millis(50));
  tokio::pin!(op);

  loop {
    tokio::select! {
      biased;
      out = &mut op => return Ok(Some(out)),
      Ok(()) = session.changed() => {}
      Ok(()) = users.changed() => {}
      _ = tick.tick() => {
        if interrupted()? {
          return Ok(None);
        }
      }
    }
    terminal.draw(|f| ui::draw(f, view)).context("drawing frame")?;
  }
}

/// Drain queued input, reporting whether it held Ctrl-C. Anything else
/// typed while a request is in flight is dropped.
fn ctrl_c_pressed() -> io::Result<bool> {
  while event::poll(Duration::ZERO)? {
    if let Event::Key(key) = event::read()?
      && app::is_quit(key)
    {
      return Ok(true);
    }
  }
  Ok(false)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
  use ratatui::backend::TestBackend;

  use crate::{
    router::{HOME, LOGIN},
    testing::FakeBackend,
  };

  fn terminal() -> Terminal<TestBackend> { Terminal::new(TestBackend::new(100, 16)).unwrap() }

  fn screen(terminal: &Terminal<TestBackend>) -> String {
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  /// Quits on the second tick, after at least one mid-operation frame.
  fn quit_on_second_tick() -> impl FnMut() -> io::Result<bool> {
    let mut ticks = 0;
    move || {
      ticks += 1;
      Ok(ticks > 1)
    }
  }

  #[tokio::test]
  async fn session_check_is_drawn_while_pending() {
    let backend = Arc::new(FakeBackend::new());
    let _gate = backend.hold("me");
    let mut app = App::new(Arc::clone(&backend));
    let view = app.clone();
    let mut terminal = terminal();

    let outcome = run_pending(&mut terminal, &view, app.mount(), quit_on_second_tick())
      .await
      .unwrap();

    assert!(outcome.is_none());
    assert!(screen(&terminal).contains("Checking session"));
  }

  #[tokio::test]
  async fn released_check_completes_the_mount() {
    let backend = Arc::new(FakeBackend::new());
    let gate = backend.hold("me");
    let mut app = App::new(Arc::clone(&backend));
    let view = app.clone();
    let mut terminal = terminal();

    let mut ticks = 0;
    let release_on_second_tick = move || {
      ticks += 1;
      if ticks == 2 {
        gate.notify_one();
      }
      Ok::<_, io::Error>(false)
    };
    let outcome = run_pending(&mut terminal, &view, app.mount(), release_on_second_tick)
      .await
      .unwrap();

    assert_eq!(outcome, Some(()));
    assert_eq!(app.location().path, LOGIN);
  }

  #[tokio::test]
  async fn pending_login_is_drawn() {
    let backend = Arc::new(FakeBackend::new());
    let mut app = App::new(Arc::clone(&backend));
    app.mount().await;
    for c in FakeBackend::ADMIN_EMAIL.chars() {
      app.handle_key(key(KeyCode::Char(c))).await.unwrap();
    }
    app.handle_key(key(KeyCode::Tab)).await.unwrap();
    for c in FakeBackend::ADMIN_PASSWORD.chars() {
      app.handle_key(key(KeyCode::Char(c))).await.unwrap();
    }

    let _gate = backend.hold("login");
    let view = app.clone();
    let mut terminal = terminal();
    let outcome = run_pending(
      &mut terminal,
      &view,
      app.handle_key(key(KeyCode::Enter)),
      quit_on_second_tick(),
    )
    .await
    .unwrap();

    assert!(outcome.is_none());
    assert!(screen(&terminal).contains("Signing in"));
  }

  #[tokio::test]
  async fn pending_reload_is_drawn() {
    let backend = Arc::new(FakeBackend::new());
    backend
      .login(FakeBackend::ADMIN_EMAIL, FakeBackend::ADMIN_PASSWORD)
      .await
      .unwrap();
    let mut app = App::new(Arc::clone(&backend));
    app.mount().await;
    assert_eq!(app.location().path, HOME);

    let _gate = backend.hold("list");
    let view = app.clone();
    let mut terminal = terminal();
    let outcome = run_pending(
      &mut terminal,
      &view,
      app.handle_key(key(KeyCode::Char('r'))),
      quit_on_second_tick(),
    )
    .await
    .unwrap();

    assert!(outcome.is_none());
    assert!(screen(&terminal).contains("loading…"));
  }
}
