//! User list, the authenticated layout's content.

use ratatui::{
  Frame,
  layout::{Constraint, Rect},
  style::{Color, Modifier, Style},
  text::Line,
  widgets::{Block, Borders, Paragraph, Row, Table, TableState},
};

use crate::{app::App, client::Backend};

/// Render the user table into `area`.
pub fn draw<B: Backend>(f: &mut Frame, area: Rect, app: &App<B>) {
  let visible = app.visible_users();
  let collection = app.users.snapshot();
  let total = collection.visible().len();

  // Title with count.
  let loading = if collection.loading { " loading…" } else { "" };
  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" Users ({}/{}){loading} ", visible.len(), total)
  } else {
    format!(" Users ({total}){loading} ")
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  // Filter bar at the bottom of the inner area.
  if (app.filter_active || !app.filter.is_empty()) && inner_area.height > 2 {
    let filter_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let filter_text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(filter_text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  if visible.is_empty() {
    let text = if total == 0 { "No users yet. Press n to add one." } else { "No matches." };
    f.render_widget(
      Paragraph::new(Line::from(text)).style(Style::default().fg(Color::DarkGray)),
      inner_area,
    );
    return;
  }

  let header = Row::new(["Name", "Email", "Birth date", "Telephone", "Employment"])
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

  let rows = visible.iter().map(|user| {
    let pending = app.pending_delete == Some(user.id);
    let style = if pending {
      Style::default().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT)
    } else {
      Style::default()
    };
    Row::new([
      user.full_name.clone(),
      user.email.clone(),
      user
        .birth_date
        .map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_default(),
      user.telephone.clone().unwrap_or_default(),
      user.employment.clone(),
    ])
    .style(style)
  });

  let mut state = TableState::default();
  state.select(Some(app.list_cursor));

  f.render_stateful_widget(
    Table::new(rows, [
      Constraint::Percentage(26),
      Constraint::Percentage(30),
      Constraint::Length(12),
      Constraint::Length(14),
      Constraint::Min(10),
    ])
    .header(header)
    .row_highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner_area,
    &mut state,
  );
}
