//! Application state machine and event dispatcher.
//!
//! Navigation goes through [`History`]; after every change [`App::mount`]
//! resolves the new location and runs the effects of whatever it enters.
//!
//! The stores are shared, so a clone of the app taken before an operation
//! starts keeps seeing their live state while the original is busy.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use userdesk_core::UserRecord;
use uuid::Uuid;

use crate::{
  client::Backend,
  form::{FormMode, LoginForm, UserForm, UserFormValues},
  guard::{GuardOutcome, guard},
  router::{
    BackgroundRoute, CREATE_USER, HOME, History, LOGIN, Location, NavState, OverlayRoute,
    UPDATE_USER, edit_initial_values, resolve,
  },
  session::SessionStore,
  users::{ADD_FAILED, CollectionStore, UPDATE_FAILED},
};

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<B> {
  pub session: Arc<SessionStore<B>>,
  pub users:   Arc<CollectionStore<B>>,
  pub history: History,

  /// Login screen fields.
  pub login: LoginForm,

  /// The open create/edit overlay, if any.
  pub form: Option<UserForm>,

  /// Current fuzzy-filter string (only typed into when `filter_active`).
  pub filter:        String,
  pub filter_active: bool,

  /// Cursor position within the *filtered* user list.
  pub list_cursor: usize,

  /// User awaiting delete confirmation.
  pub pending_delete: Option<Uuid>,

  /// Background route whose mount effects have run.
  mounted: Option<BackgroundRoute>,
}

impl<B> Clone for App<B> {
  fn clone(&self) -> Self {
    Self {
      session:        Arc::clone(&self.session),
      users:          Arc::clone(&self.users),
      history:        self.history.clone(),
      login:          self.login.clone(),
      form:           self.form.clone(),
      filter:         self.filter.clone(),
      filter_active:  self.filter_active,
      list_cursor:    self.list_cursor,
      pending_delete: self.pending_delete,
      mounted:        self.mounted,
    }
  }
}

/// Ctrl-C, which quits from anywhere, even mid-request.
pub fn is_quit(key: KeyEvent) -> bool {
  key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

impl<B: Backend> App<B> {
  /// An app at `/` that has not mounted anything yet.
  pub fn new(backend: Arc<B>) -> Self {
    Self {
      session:        Arc::new(SessionStore::new(Arc::clone(&backend))),
      users:          Arc::new(CollectionStore::new(backend)),
      history:        History::new(Location::new(HOME)),
      login:          LoginForm::default(),
      form:           None,
      filter:         String::new(),
      filter_active:  false,
      list_cursor:    0,
      pending_delete: None,
      mounted:        None,
    }
  }

  pub fn location(&self) -> &Location { self.history.current() }

  // ── Navigation ────────────────────────────────────────────────────────────

  /// Resolve the current location and run the effects of what it enters:
  /// the authenticated layout checks the session (bouncing to the login
  /// view without one) and then loads the list.
  pub async fn mount(&mut self) {
    loop {
      let resolved = resolve(self.history.current());
      match resolved.background {
        BackgroundRoute::Fallback => {
          tracing::debug!(path = %self.history.current().path, "unknown route");
          self.history.replace(Location::new(HOME));
          continue;
        }
        BackgroundRoute::Login => {
          if self.mounted != Some(BackgroundRoute::Login) {
            self.login = LoginForm::default();
          }
          self.mounted = Some(BackgroundRoute::Login);
          self.form = None;
        }
        BackgroundRoute::Home => {
          if self.mounted != Some(BackgroundRoute::Home) {
            self.session.check_auth().await;
            let outcome = guard(&self.session.snapshot(), &resolved.background_location);
            if let GuardOutcome::Redirect { to, from } = outcome {
              self.mounted = None;
              self.history.replace(Location::new(to).with_state(NavState {
                from: Some(Box::new(from)),
                ..NavState::default()
              }));
              continue;
            }
            self.mounted = Some(BackgroundRoute::Home);
            self.list_cursor = 0;
            self.users.fetch_users().await;
          }
          self.form = resolved.overlay.map(|overlay| self.open_form(overlay));
        }
      }
      break;
    }
  }

  fn open_form(&self, overlay: OverlayRoute) -> UserForm {
    match overlay {
      OverlayRoute::CreateUser => UserForm::new(FormMode::Create, UserFormValues::default()),
      OverlayRoute::EditUser { user_id } => {
        let values = edit_initial_values(user_id, &self.users.derived_view());
        // An id that is not in the list still opens a blank edit form.
        let mode = FormMode::Edit(user_id.unwrap_or_else(Uuid::nil));
        UserForm::new(mode, values)
      }
    }
  }

  pub async fn navigate(&mut self, location: Location) {
    self.history.push(location);
    self.mount().await;
  }

  /// Open an overlay over the current background.
  pub async fn open_overlay(&mut self, path: &str, user_id: Option<Uuid>) {
    let location = Location::overlay(path, self.history.current(), user_id);
    self.navigate(location).await;
  }

  /// Close the overlay by stepping back to where it was opened from.
  pub async fn close_overlay(&mut self) {
    self.history.back();
    self.mount().await;
  }

  // ── Filtered list ─────────────────────────────────────────────────────────

  /// The derived view narrowed by the current filter query.
  pub fn visible_users(&self) -> Vec<UserRecord> {
    let users = self.users.derived_view();
    if self.filter.is_empty() {
      return users;
    }
    let matcher = SkimMatcherV2::default();
    users
      .into_iter()
      .filter(|u| {
        matcher.fuzzy_match(&u.full_name, &self.filter).is_some()
          || matcher.fuzzy_match(&u.email, &self.filter).is_some()
      })
      .collect()
  }

  /// The user under the list cursor in the filtered view, if any.
  pub fn cursor_user(&self) -> Option<UserRecord> {
    self.visible_users().into_iter().nth(self.list_cursor)
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if is_quit(key) {
      return Ok(false);
    }

    if self.form.is_some() {
      self.handle_form_key(key).await;
      return Ok(true);
    }

    match resolve(self.history.current()).background {
      BackgroundRoute::Login => self.handle_login_key(key).await,
      _ if self.filter_active => {
        self.handle_filter_key(key);
        Ok(true)
      }
      _ => self.handle_list_key(key).await,
    }
  }

  async fn handle_login_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Esc => return Ok(false),
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
        self.login.toggle_focus();
      }
      KeyCode::Backspace => self.login.backspace(),
      KeyCode::Enter => self.submit_login().await,
      KeyCode::Char(c) => self.login.type_char(c),
      _ => {}
    }
    Ok(true)
  }

  async fn submit_login(&mut self) {
    if !self.login.check() {
      return;
    }
    let values = self.login.values.clone();
    self.session.login(&values.email, &values.password).await;

    if self.session.snapshot().identity.is_some() {
      let target = self
        .history
        .current()
        .return_to()
        .cloned()
        .unwrap_or_else(|| Location::new(HOME));
      self.navigate(target).await;
    }
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
      }
      KeyCode::Enter => self.filter_active = false,
      KeyCode::Backspace => {
        self.filter.pop();
      }
      KeyCode::Char(c) => self.filter.push(c),
      _ => {}
    }
    self.list_cursor = 0;
  }

  async fn handle_list_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Any key other than `y` abandons a pending delete.
    if let Some(id) = self.pending_delete.take() {
      if key.code == KeyCode::Char('y') {
        self.users.remove_user(id).await;
        let len = self.visible_users().len();
        self.list_cursor = self.list_cursor.min(len.saturating_sub(1));
      }
      return Ok(true);
    }

    match key.code {
      KeyCode::Char('q') => return Ok(false),

      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.visible_users().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.list_cursor = 0;
      }

      KeyCode::Char('n') => self.open_overlay(CREATE_USER, None).await,
      KeyCode::Enter | KeyCode::Char('e') => {
        if let Some(user) = self.cursor_user() {
          self.open_overlay(UPDATE_USER, Some(user.id)).await;
        }
      }
      KeyCode::Char('d') | KeyCode::Delete => {
        self.pending_delete = self.cursor_user().map(|u| u.id);
      }
      KeyCode::Char('r') => self.users.fetch_users().await,

      KeyCode::Char('o') => {
        self.session.logout().await;
        if self.session.snapshot().identity.is_none() {
          self.mounted = None;
          self.navigate(Location::new(LOGIN)).await;
        }
      }

      _ => {}
    }
    Ok(true)
  }

  async fn handle_form_key(&mut self, key: KeyEvent) {
    let Some(form) = self.form.as_mut() else { return };
    match key.code {
      KeyCode::Esc => self.close_overlay().await,
      KeyCode::Tab | KeyCode::Down => form.next(),
      KeyCode::BackTab | KeyCode::Up => form.prev(),
      KeyCode::Left => form.cycle(false),
      KeyCode::Right => form.cycle(true),
      KeyCode::Backspace => form.backspace(),
      KeyCode::Enter => self.submit_form().await,
      KeyCode::Char(c) => form.type_char(c),
      _ => {}
    }
  }

  /// Validate, send, and close on success. A rejected create lands on the
  /// email field; a rejected edit in the form banner.
  async fn submit_form(&mut self) {
    let Some(form) = self.form.as_mut() else { return };
    if !form.check() {
      return;
    }
    let values = form.values.clone();
    let mode = form.mode;

    let (result, fallback) = match mode {
      FormMode::Create => (self.users.add_user(values.into_new_user()).await, ADD_FAILED),
      FormMode::Edit(id) => (self.users.update_user(id, values).await, UPDATE_FAILED),
    };

    match result {
      Ok(()) => self.close_overlay().await,
      Err(e) => {
        if let Some(form) = self.form.as_mut() {
          form.submit_failed(&e, fallback);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    form::Field,
    testing::{FakeBackend, record},
  };
  use userdesk_core::Employment;

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  async fn press(app: &mut App<FakeBackend>, code: KeyCode) {
    assert!(app.handle_key(key(code)).await.unwrap());
  }

  async fn type_str(app: &mut App<FakeBackend>, s: &str) {
    for c in s.chars() {
      press(app, KeyCode::Char(c)).await;
    }
  }

  fn backend_with(users: Vec<UserRecord>) -> FakeBackend {
    let backend = FakeBackend::new();
    backend.seed(users);
    backend
  }

  /// An app logged in as the system account and sitting on `/`.
  async fn logged_in(backend: FakeBackend) -> App<FakeBackend> {
    let mut app = App::new(Arc::new(backend));
    app.mount().await;
    type_str(&mut app, FakeBackend::ADMIN_EMAIL).await;
    press(&mut app, KeyCode::Tab).await;
    type_str(&mut app, FakeBackend::ADMIN_PASSWORD).await;
    press(&mut app, KeyCode::Enter).await;
    assert_eq!(app.location().path, HOME);
    app
  }

  #[tokio::test]
  async fn anonymous_start_lands_on_login_with_return_location() {
    let mut app = App::new(Arc::new(FakeBackend::new()));
    app.mount().await;

    assert_eq!(app.location().path, LOGIN);
    assert_eq!(app.location().return_to().map(|l| l.path.as_str()), Some(HOME));
  }

  #[tokio::test]
  async fn invalid_login_form_never_calls_server() {
    let backend = Arc::new(FakeBackend::new());
    let mut app = App::new(Arc::clone(&backend));
    app.mount().await;
    type_str(&mut app, "not-an-email").await;
    press(&mut app, KeyCode::Enter).await;

    assert!(app.login.errors.contains_key("email"));
    assert!(app.login.errors.contains_key("password"));
    // Only the session check from entering `/`.
    assert_eq!(backend.calls(), vec!["me"]);
  }

  #[tokio::test]
  async fn clone_shares_store_state() {
    let mut app = App::new(Arc::new(FakeBackend::new()));
    let view = app.clone();
    app.mount().await;

    assert_eq!(
      view.session.snapshot().error.as_deref(),
      Some(crate::session::UNAUTHENTICATED)
    );
    // Navigation state is the clone's own.
    assert_eq!(view.location().path, HOME);
    assert_eq!(app.location().path, LOGIN);
  }

  #[tokio::test]
  async fn login_loads_list_without_system_account() {
    let app = logged_in(backend_with(vec![record("ada@example.com", "Ada", "Lovelace")])).await;

    let view = app.users.derived_view();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].email, "ada@example.com");
    assert_eq!(app.users.snapshot().users.len(), 2);
  }

  #[tokio::test]
  async fn create_overlay_cancel_returns_to_background() {
    let mut app = logged_in(FakeBackend::new()).await;
    let before = app.location().clone();

    press(&mut app, KeyCode::Char('n')).await;
    assert_eq!(app.location().path, CREATE_USER);
    assert_eq!(app.form.as_ref().map(|f| f.mode), Some(FormMode::Create));

    press(&mut app, KeyCode::Esc).await;
    assert_eq!(app.location(), &before);
    assert!(app.form.is_none());
  }

  #[tokio::test]
  async fn submitting_create_form_adds_and_closes() {
    let mut app = logged_in(FakeBackend::new()).await;
    press(&mut app, KeyCode::Char('n')).await;

    let form = app.form.as_mut().unwrap();
    form.values.set_name("Grace".into());
    form.values.set_sur_name("Hopper".into());
    form.values.email = "grace@example.com".into();
    form.values.password = "navy".into();
    form.values.birth_date = "1906-12-09".into();
    form.values.telephone = "89161234567".into();
    form.values.employment = Employment::Employed;
    form.values.user_agreement = true;
    press(&mut app, KeyCode::Enter).await;

    assert!(app.form.is_none());
    assert_eq!(app.location().path, HOME);
    let view = app.users.derived_view();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].full_name, "Grace Hopper");
    assert_eq!(view[0].telephone.as_deref(), Some("+79161234567"));
  }

  #[tokio::test]
  async fn rejected_create_shows_error_on_email_field() {
    let mut app = logged_in(backend_with(vec![record("grace@example.com", "G", "H")])).await;
    press(&mut app, KeyCode::Char('n')).await;

    let form = app.form.as_mut().unwrap();
    form.values = UserFormValues {
      email: "grace@example.com".into(),
      password: "navy".into(),
      birth_date: "1906-12-09".into(),
      telephone: "89161234567".into(),
      employment: Employment::Employed,
      user_agreement: true,
      ..UserFormValues::default()
    };
    form.values.set_name("Grace".into());
    press(&mut app, KeyCode::Enter).await;

    // Still blocked by the missing surname; nothing was sent.
    let form = app.form.as_mut().unwrap();
    assert!(form.errors.contains_key(Field::SurName.key()));
    form.values.set_sur_name("Hopper".into());
    press(&mut app, KeyCode::Enter).await;

    let form = app.form.as_ref().unwrap();
    assert_eq!(app.location().path, CREATE_USER);
    assert_eq!(
      form.errors.get("email").map(String::as_str),
      Some("user with email grace@example.com already exists")
    );
  }

  #[tokio::test]
  async fn edit_overlay_prefills_and_submits_without_email() {
    let target = record("ada@example.com", "Ada", "Lovelace");
    let mut app = logged_in(backend_with(vec![target.clone()])).await;

    press(&mut app, KeyCode::Char('e')).await;
    assert_eq!(app.location().path, UPDATE_USER);
    assert_eq!(
      app.location().state.as_ref().and_then(|s| s.user_id),
      Some(target.id)
    );
    let form = app.form.as_mut().unwrap();
    assert_eq!(form.mode, FormMode::Edit(target.id));
    assert_eq!(form.values.email, "ada@example.com");

    form.values.email = "hijack@example.com".into();
    form.values.set_name("Augusta".into());
    press(&mut app, KeyCode::Enter).await;

    assert!(app.form.is_none());
    let view = app.users.derived_view();
    assert_eq!(view[0].full_name, "Augusta Lovelace");
    assert_eq!(view[0].email, "ada@example.com");
  }

  #[tokio::test]
  async fn edit_overlay_with_unknown_id_renders_empty_form() {
    let mut app = logged_in(FakeBackend::new()).await;

    app.open_overlay(UPDATE_USER, Some(Uuid::new_v4())).await;

    let form = app.form.as_ref().unwrap();
    assert_eq!(form.values, UserFormValues::default());
  }

  #[tokio::test]
  async fn rejected_edit_shows_banner() {
    let target = record("ada@example.com", "Ada", "Lovelace");
    let backend = backend_with(vec![target.clone()]);
    backend.fail_next("update", 400, Some("telephone must be a valid phone number"));
    let mut app = logged_in(backend).await;

    press(&mut app, KeyCode::Enter).await;
    press(&mut app, KeyCode::Enter).await;

    let form = app.form.as_ref().unwrap();
    assert_eq!(form.status.as_deref(), Some("telephone must be a valid phone number"));
    assert!(form.errors.is_empty());
  }

  #[tokio::test]
  async fn failed_delete_is_reported_only_through_store() {
    let target = record("ada@example.com", "Ada", "Lovelace");
    let backend = backend_with(vec![target]);
    backend.fail_next("delete", 500, None);
    let mut app = logged_in(backend).await;

    press(&mut app, KeyCode::Char('d')).await;
    press(&mut app, KeyCode::Char('y')).await;

    assert_eq!(app.users.derived_view().len(), 1);
    assert_eq!(
      app.users.snapshot().error.as_deref(),
      Some(crate::users::DELETE_FAILED)
    );
  }

  #[tokio::test]
  async fn delete_needs_confirmation() {
    let mut app = logged_in(backend_with(vec![record("ada@example.com", "A", "L")])).await;

    press(&mut app, KeyCode::Char('d')).await;
    press(&mut app, KeyCode::Char('x')).await;
    assert_eq!(app.users.derived_view().len(), 1);

    press(&mut app, KeyCode::Char('d')).await;
    press(&mut app, KeyCode::Char('y')).await;
    assert!(app.users.derived_view().is_empty());
  }

  #[tokio::test]
  async fn filter_narrows_list() {
    let mut app = logged_in(backend_with(vec![
      record("ada@example.com", "Ada", "Lovelace"),
      record("grace@example.com", "Grace", "Hopper"),
    ]))
    .await;

    press(&mut app, KeyCode::Char('/')).await;
    type_str(&mut app, "hop").await;
    press(&mut app, KeyCode::Enter).await;

    let visible = app.visible_users();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].email, "grace@example.com");
  }

  #[tokio::test]
  async fn logout_returns_to_login() {
    let mut app = logged_in(FakeBackend::new()).await;

    press(&mut app, KeyCode::Char('o')).await;

    assert_eq!(app.location().path, LOGIN);
    assert!(app.session.snapshot().identity.is_none());
  }

  #[tokio::test]
  async fn unknown_route_falls_back_to_home() {
    let mut app = logged_in(FakeBackend::new()).await;
    app.navigate(Location::new("/nowhere")).await;
    assert_eq!(app.location().path, HOME);
  }
}
