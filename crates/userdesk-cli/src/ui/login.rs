//! Login view.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::{app::App, client::Backend, ui::centered};

pub fn draw<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let popup = centered(area, 48, 10);
  let block = Block::default()
    .title(" Sign in ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(popup);
  f.render_widget(block, popup);

  let form = &app.login;
  let masked = "•".repeat(form.values.password.chars().count());
  let mut lines = Vec::new();

  for (i, (label, key, value)) in [
    ("Email", "email", form.values.email.as_str()),
    ("Password", "password", masked.as_str()),
  ]
  .into_iter()
  .enumerate()
  {
    let focused = form.focus == i;
    let label_style = if focused {
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::Gray)
    };
    let cursor = if focused { "_" } else { "" };
    lines.push(Line::from(vec![
      Span::styled(format!("{label:<10}"), label_style),
      Span::raw(format!("{value}{cursor}")),
    ]));
    let error = form.errors.get(key).cloned().unwrap_or_default();
    lines.push(Line::from(Span::styled(
      format!("{:<10}{error}", ""),
      Style::default().fg(Color::Red),
    )));
  }

  let session = app.session.snapshot();
  if session.loading {
    lines.push(Line::from(Span::styled(
      "Signing in…",
      Style::default().fg(Color::DarkGray),
    )));
  } else if let Some(error) = session.error {
    lines.push(Line::from(Span::styled(error, Style::default().fg(Color::Red))));
  }

  f.render_widget(Paragraph::new(lines), inner);
}
