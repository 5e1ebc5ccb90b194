//! Login and user forms: values, client-side rules and edit state.
//!
//! Rules are checked before anything is sent; a form that fails them never
//! reaches the network.

use std::collections::BTreeMap;

use userdesk_core::{
  Employment, NewUser, UserPatch, UserRecord,
  user::full_name,
  validate::{NAME_MAX, is_email, messages, parse_birth_date, required_max, violation},
};
use uuid::Uuid;
use validator::ValidationErrors;

use crate::client::Error;

pub const PASSWORD_MIN: usize = 4;
pub const PHONE_DIGITS: usize = 11;

/// Field key → first message, for inline display.
pub type FieldErrors = BTreeMap<&'static str, String>;

fn first_messages(errors: &ValidationErrors) -> FieldErrors {
  let mut out = FieldErrors::new();
  for (field, message) in messages(errors) {
    out.entry(field).or_insert(message);
  }
  out
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
  if email.is_empty() {
    errors.add("email", violation("required", "email is required"));
  } else if !is_email(email) {
    errors.add("email", violation("email", "invalid email"));
  }
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
  if password.is_empty() {
    errors.add("password", violation("required", "password is required"));
  } else if password.chars().count() < PASSWORD_MIN {
    errors.add(
      "password",
      violation("length", format!("password must be at least {PASSWORD_MIN} characters")),
    );
  }
}

fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
  if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginValues {
  pub email:    String,
  pub password: String,
}

impl LoginValues {
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, &self.email);
    check_password(&mut errors, &self.password);
    finish(errors)
  }
}

/// The login screen's editable state.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
  pub values: LoginValues,
  /// 0 = email, 1 = password.
  pub focus:  usize,
  pub errors: FieldErrors,
}

impl LoginForm {
  pub fn toggle_focus(&mut self) { self.focus = 1 - self.focus.min(1); }

  fn focused_mut(&mut self) -> &mut String {
    if self.focus == 0 {
      &mut self.values.email
    } else {
      &mut self.values.password
    }
  }

  pub fn type_char(&mut self, c: char) { self.focused_mut().push(c); }

  pub fn backspace(&mut self) { self.focused_mut().pop(); }

  /// Run the rules, keeping their messages. Returns whether the form passed.
  pub fn check(&mut self) -> bool {
    match self.values.validate() {
      Ok(()) => {
        self.errors.clear();
        true
      }
      Err(e) => {
        self.errors = first_messages(&e);
        false
      }
    }
  }
}

// ─── User form values ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
  Create,
  Edit(Uuid),
}

/// Values behind the create and edit forms.
///
/// `full_name` is never typed; it follows `name` and `sur_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFormValues {
  pub name:           String,
  pub sur_name:       String,
  pub full_name:      String,
  pub email:          String,
  pub password:       String,
  /// `YYYY-MM-DD`.
  pub birth_date:     String,
  /// Digits only.
  pub telephone:      String,
  pub employment:     Employment,
  pub user_agreement: bool,
}

fn digits(s: &str) -> String { s.chars().filter(char::is_ascii_digit).collect() }

/// `79161234567` / `89161234567` → `+79161234567`.
fn international(digits: &str) -> String {
  match digits.strip_prefix(['7', '8']) {
    Some(rest) if digits.len() == PHONE_DIGITS => format!("+7{rest}"),
    _ => digits.to_owned(),
  }
}

impl UserFormValues {
  pub fn from_record(user: &UserRecord) -> Self {
    Self {
      name:           user.name.clone(),
      sur_name:       user.sur_name.clone(),
      full_name:      user.full_name.clone(),
      email:          user.email.clone(),
      password:       String::new(),
      birth_date:     user
        .birth_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default(),
      telephone:      user.telephone.as_deref().map(digits).unwrap_or_default(),
      employment:     Employment::parse(&user.employment).unwrap_or_default(),
      user_agreement: user.user_agreement,
    }
  }

  pub fn set_name(&mut self, name: String) {
    self.name = name;
    self.full_name = full_name(&self.name, &self.sur_name);
  }

  pub fn set_sur_name(&mut self, sur_name: String) {
    self.sur_name = sur_name;
    self.full_name = full_name(&self.name, &self.sur_name);
  }

  /// Email and password are only checked when creating.
  pub fn validate(&self, mode: FormMode) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    required_max(&mut errors, "name", &self.name, NAME_MAX);
    required_max(&mut errors, "surName", &self.sur_name, NAME_MAX);
    if self.full_name.is_empty() {
      errors.add("fullName", violation("required", "fullName should not be empty"));
    }

    if mode == FormMode::Create {
      check_email(&mut errors, &self.email);
      check_password(&mut errors, &self.password);
    }

    if self.birth_date.is_empty() {
      errors.add("birthDate", violation("required", "birth date is required"));
    } else if parse_birth_date(&self.birth_date).is_err() {
      errors.add("birthDate", violation("date", "birth date must be YYYY-MM-DD"));
    }

    let phone = digits(&self.telephone);
    if phone.is_empty() {
      errors.add("telephone", violation("required", "telephone is required"));
    } else if phone.len() != PHONE_DIGITS || phone.len() != self.telephone.len() {
      errors.add(
        "telephone",
        violation("phone", format!("telephone must be exactly {PHONE_DIGITS} digits")),
      );
    }

    if self.employment == Employment::Unspecified {
      errors.add("employment", violation("required", "choose an employment status"));
    }
    if !self.user_agreement {
      errors.add("userAgreement", violation("accepted", "the user agreement must be accepted"));
    }

    finish(errors)
  }

  pub fn into_new_user(self) -> NewUser {
    NewUser {
      telephone: Some(international(&self.telephone)),
      employment: Some(self.employment.to_string()),
      birth_date: Some(self.birth_date),
      name: self.name,
      sur_name: self.sur_name,
      full_name: self.full_name,
      email: self.email,
      password: self.password,
      user_agreement: self.user_agreement,
    }
  }
}

/// The patch an edit submits. Email and password have no place in a
/// [`UserPatch`], so whatever the form holds for them is dropped here.
impl From<UserFormValues> for UserPatch {
  fn from(values: UserFormValues) -> Self {
    UserPatch {
      telephone:      Some(international(&values.telephone)),
      employment:     Some(values.employment.to_string()),
      birth_date:     Some(values.birth_date),
      name:           Some(values.name),
      sur_name:       Some(values.sur_name),
      full_name:      Some(values.full_name),
      user_agreement: Some(values.user_agreement),
    }
  }
}

// ─── User form state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Name,
  SurName,
  FullName,
  Email,
  Password,
  BirthDate,
  Telephone,
  Employment,
  UserAgreement,
}

impl Field {
  /// The wire name, which is also the key of its errors.
  pub fn key(self) -> &'static str {
    match self {
      Field::Name => "name",
      Field::SurName => "surName",
      Field::FullName => "fullName",
      Field::Email => "email",
      Field::Password => "password",
      Field::BirthDate => "birthDate",
      Field::Telephone => "telephone",
      Field::Employment => "employment",
      Field::UserAgreement => "userAgreement",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Field::Name => "Name",
      Field::SurName => "Surname",
      Field::FullName => "Full name",
      Field::Email => "Email",
      Field::Password => "Password",
      Field::BirthDate => "Birth date",
      Field::Telephone => "Telephone",
      Field::Employment => "Employment",
      Field::UserAgreement => "User agreement",
    }
  }

  /// Fields shown for `mode`, in order. Edit shows the email but cannot
  /// change it, and has no password.
  pub fn shown(mode: FormMode) -> &'static [Field] {
    const CREATE: &[Field] = &[
      Field::Name,
      Field::SurName,
      Field::FullName,
      Field::Email,
      Field::Password,
      Field::BirthDate,
      Field::Telephone,
      Field::Employment,
      Field::UserAgreement,
    ];
    const EDIT: &[Field] = &[
      Field::Name,
      Field::SurName,
      Field::FullName,
      Field::Email,
      Field::BirthDate,
      Field::Telephone,
      Field::Employment,
      Field::UserAgreement,
    ];
    match mode {
      FormMode::Create => CREATE,
      FormMode::Edit(_) => EDIT,
    }
  }

  pub fn is_editable(self, mode: FormMode) -> bool {
    match self {
      Field::FullName => false,
      Field::Email => mode == FormMode::Create,
      _ => true,
    }
  }
}

/// An open create or edit form.
#[derive(Debug, Clone)]
pub struct UserForm {
  pub mode:   FormMode,
  pub values: UserFormValues,
  pub focus:  usize,
  pub errors: FieldErrors,
  /// Form-level banner for a failed edit.
  pub status: Option<String>,
}

impl UserForm {
  pub fn new(mode: FormMode, values: UserFormValues) -> Self {
    Self { mode, values, focus: 0, errors: FieldErrors::new(), status: None }
  }

  pub fn fields(&self) -> &'static [Field] { Field::shown(self.mode) }

  pub fn focused(&self) -> Field { self.fields()[self.focus.min(self.fields().len() - 1)] }

  pub fn next(&mut self) { self.focus = (self.focus + 1) % self.fields().len(); }

  pub fn prev(&mut self) {
    let len = self.fields().len();
    self.focus = (self.focus + len - 1) % len;
  }

  pub fn type_char(&mut self, c: char) {
    let field = self.focused();
    if !field.is_editable(self.mode) {
      return;
    }
    let v = &mut self.values;
    match field {
      Field::Name => {
        let mut name = v.name.clone();
        name.push(c);
        v.set_name(name);
      }
      Field::SurName => {
        let mut sur_name = v.sur_name.clone();
        sur_name.push(c);
        v.set_sur_name(sur_name);
      }
      Field::Email => v.email.push(c),
      Field::Password => v.password.push(c),
      Field::BirthDate => v.birth_date.push(c),
      Field::Telephone if c.is_ascii_digit() => v.telephone.push(c),
      Field::UserAgreement if c == ' ' => v.user_agreement = !v.user_agreement,
      _ => {}
    }
  }

  pub fn backspace(&mut self) {
    let field = self.focused();
    if !field.is_editable(self.mode) {
      return;
    }
    let v = &mut self.values;
    match field {
      Field::Name => {
        let mut name = v.name.clone();
        name.pop();
        v.set_name(name);
      }
      Field::SurName => {
        let mut sur_name = v.sur_name.clone();
        sur_name.pop();
        v.set_sur_name(sur_name);
      }
      Field::Email => { v.email.pop(); }
      Field::Password => { v.password.pop(); }
      Field::BirthDate => { v.birth_date.pop(); }
      Field::Telephone => { v.telephone.pop(); }
      _ => {}
    }
  }

  /// Left/right on a choice field.
  pub fn cycle(&mut self, forward: bool) {
    let field = self.focused();
    let v = &mut self.values;
    match field {
      Field::Employment => {
        v.employment = if forward { v.employment.next() } else { v.employment.prev() };
      }
      Field::UserAgreement => v.user_agreement = !v.user_agreement,
      _ => {}
    }
  }

  /// Run the rules, keeping their messages. Returns whether the form passed.
  pub fn check(&mut self) -> bool {
    self.status = None;
    match self.values.validate(self.mode) {
      Ok(()) => {
        self.errors.clear();
        true
      }
      Err(e) => {
        self.errors = first_messages(&e);
        false
      }
    }
  }

  /// Show a rejected submit: under the email field when creating, in the
  /// banner when editing.
  pub fn submit_failed(&mut self, error: &Error, fallback: &str) {
    let message = error.message_or(fallback);
    match self.mode {
      FormMode::Create => {
        self.errors.insert(Field::Email.key(), message);
      }
      FormMode::Edit(_) => self.status = Some(message),
    }
  }
}
