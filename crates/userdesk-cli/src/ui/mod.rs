//! TUI rendering: the background view, then any overlay on top.

pub mod login;
pub mod user_form;
pub mod user_table;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Flex, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph},
};

use crate::{
  app::App,
  client::Backend,
  guard::{GuardOutcome, guard},
  router::{BackgroundRoute, resolve},
};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<B: Backend>(f: &mut Frame, app: &App<B>) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let date = Local::now().format("%Y-%m-%d").to_string();
  let who = app
    .session
    .snapshot()
    .identity
    .map(|i| i.name.unwrap_or(i.email))
    .unwrap_or_default();

  let left = Span::styled(
    " userdesk",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{who}  {date} "),
    Style::default().fg(Color::Gray),
  );

  // Simple left-right header: pad the middle.
  let left_width = left.content.chars().count() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let resolved = resolve(app.location());

  match resolved.background {
    BackgroundRoute::Login => login::draw(f, area, app),
    // Replaced on the next mount; nothing to show in between.
    BackgroundRoute::Fallback => {}
    BackgroundRoute::Home => {
      match guard(&app.session.snapshot(), &resolved.background_location) {
        GuardOutcome::Render => user_table::draw(f, area, app),
        GuardOutcome::Checking => draw_notice(f, area, "Checking session…"),
        GuardOutcome::Redirect { .. } => draw_notice(f, area, "Not signed in."),
      }
    }
  }

  if let Some(form) = &app.form {
    let popup = centered(area, 64, form.fields().len() as u16 * 2 + 6);
    f.render_widget(Clear, popup);
    user_form::draw(f, popup, form);
  }
}

fn draw_notice(f: &mut Frame, area: Rect, text: &str) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new(Span::styled(text.to_string(), Style::default().fg(Color::DarkGray))),
    inner,
  );
}

/// A `width`×`height` rectangle centred in `area`, clamped to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
    .flex(Flex::Center)
    .areas(area);
  let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
    .flex(Flex::Center)
    .areas(row);
  cell
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let background = resolve(app.location()).background;
  let (mode_label, hints) = match background {
    _ if app.form.is_some() => (
      "FORM",
      "Tab/↑↓ field  ←→ choose  Space toggle  Enter save  Esc cancel",
    ),
    BackgroundRoute::Login => ("LOGIN", "Tab switch field  Enter sign in  Esc quit"),
    _ if app.filter_active => ("SEARCH", "Type to filter  Esc clear  Enter done"),
    _ if app.pending_delete.is_some() => ("DELETE", "Press y to delete, any other key to keep"),
    _ => (
      "NORMAL",
      "↑↓/jk navigate  / search  n new  e edit  d delete  r reload  o sign out  q quit",
    ),
  };

  // Store errors take the bar over from the hints until the next operation.
  let error = match background {
    BackgroundRoute::Login => app.session.snapshot().error,
    _ => app.users.snapshot().error,
  };
  let (text, color) = match error {
    Some(e) => (e, Color::Red),
    None => (hints.to_string(), Color::DarkGray),
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(format!("  {text}"), Style::default().fg(color));

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
