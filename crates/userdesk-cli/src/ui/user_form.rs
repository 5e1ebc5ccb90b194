//! Create / edit overlay.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};
use userdesk_core::Employment;

use crate::form::{Field, FormMode, UserForm};

fn employment_label(e: Employment) -> &'static str {
  match e {
    Employment::Employed => "employed",
    Employment::Unemployed => "unemployed",
    Employment::Unspecified => "(choose)",
  }
}

fn display(form: &UserForm, field: Field) -> String {
  let v = &form.values;
  match field {
    Field::Name => v.name.clone(),
    Field::SurName => v.sur_name.clone(),
    Field::FullName => v.full_name.clone(),
    Field::Email => v.email.clone(),
    Field::Password => "•".repeat(v.password.chars().count()),
    Field::BirthDate => v.birth_date.clone(),
    Field::Telephone => v.telephone.clone(),
    Field::Employment => format!("‹ {} ›", employment_label(v.employment)),
    Field::UserAgreement => if v.user_agreement { "[x]" } else { "[ ]" }.to_string(),
  }
}

pub fn draw(f: &mut Frame, area: Rect, form: &UserForm) {
  let title = match form.mode {
    FormMode::Create => " New user ",
    FormMode::Edit(_) => " Edit user ",
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let mut lines = Vec::new();
  if let Some(status) = &form.status {
    lines.push(Line::from(Span::styled(
      status.clone(),
      Style::default().fg(Color::Black).bg(Color::Red),
    )));
    lines.push(Line::from(""));
  }

  for (i, field) in form.fields().iter().copied().enumerate() {
    let focused = i == form.focus;
    let editable = field.is_editable(form.mode);

    let label_style = match (focused, editable) {
      (true, _) => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
      (false, true) => Style::default().fg(Color::Gray),
      (false, false) => Style::default().fg(Color::DarkGray),
    };
    let value_style = if editable {
      Style::default()
    } else {
      Style::default().fg(Color::DarkGray)
    };
    let cursor = if focused && editable { "_" } else { "" };

    lines.push(Line::from(vec![
      Span::styled(format!("{:<16}", field.label()), label_style),
      Span::styled(format!("{}{cursor}", display(form, field)), value_style),
    ]));

    if let Some(error) = form.errors.get(field.key()) {
      lines.push(Line::from(Span::styled(
        format!("{:<16}{error}", ""),
        Style::default().fg(Color::Red),
      )));
    }
  }

  f.render_widget(Paragraph::new(lines), inner);
}
