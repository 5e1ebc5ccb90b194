//! Locations, history and the two-layer route table.
//!
//! A screen is a background route (login, or the authenticated layout with
//! the user list) with at most one overlay form drawn over it. Which
//! background stays visible while an overlay is open, and which user an edit
//! overlay targets, travel in [`NavState`] next to the path rather than in
//! it.

use uuid::Uuid;

use userdesk_core::UserRecord;

use crate::form::UserFormValues;

pub const LOGIN: &str = "/login";
pub const HOME: &str = "/";
pub const CREATE_USER: &str = "/user/create";
pub const UPDATE_USER: &str = "/user/update";

// ─── Locations ────────────────────────────────────────────────────────────────

/// A path plus the navigation state pushed with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
  pub path:  String,
  pub state: Option<NavState>,
}

/// Side-channel context carried alongside a [`Location`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavState {
  /// The location to keep rendering underneath an overlay.
  pub background: Option<Box<Location>>,
  /// Target of the edit overlay.
  pub user_id:    Option<Uuid>,
  /// Where a guard redirect came from.
  pub from:       Option<Box<Location>>,
}

impl Location {
  pub fn new(path: impl Into<String>) -> Self {
    Self { path: path.into(), state: None }
  }

  pub fn with_state(mut self, state: NavState) -> Self {
    self.state = Some(state);
    self
  }

  /// An overlay location drawn over `background`.
  pub fn overlay(path: &str, background: &Location, user_id: Option<Uuid>) -> Self {
    // Keep the innermost background; overlays never stack.
    let background = background.background().clone();
    Self::new(path).with_state(NavState {
      background: Some(Box::new(background)),
      user_id,
      from: None,
    })
  }

  /// The location the background layer renders: the carried background if
  /// any, else this location itself.
  pub fn background(&self) -> &Location {
    self
      .state
      .as_ref()
      .and_then(|s| s.background.as_deref())
      .unwrap_or(self)
  }

  /// The refused location a guard redirect recorded.
  pub fn return_to(&self) -> Option<&Location> {
    self.state.as_ref().and_then(|s| s.from.as_deref())
  }
}

// ─── History ──────────────────────────────────────────────────────────────────

/// An in-memory history stack.
#[derive(Debug, Clone)]
pub struct History {
  entries: Vec<Location>,
  index:   usize,
}

impl History {
  pub fn new(initial: Location) -> Self {
    Self { entries: vec![initial], index: 0 }
  }

  pub fn current(&self) -> &Location { &self.entries[self.index] }

  /// Navigate to `location`, discarding any forward entries.
  pub fn push(&mut self, location: Location) {
    self.entries.truncate(self.index + 1);
    self.entries.push(location);
    self.index += 1;
  }

  /// Swap the current entry for `location`.
  pub fn replace(&mut self, location: Location) {
    self.entries[self.index] = location;
  }

  /// Step back one entry. Returns `false` (and stays put) at the first entry.
  pub fn back(&mut self) -> bool {
    if self.index == 0 {
      return false;
    }
    self.index -= 1;
    true
  }
}

// ─── Route table ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundRoute {
  Login,
  /// The authenticated layout showing the user list.
  Home,
  /// Unknown path; redirect-replace to [`HOME`].
  Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayRoute {
  CreateUser,
  EditUser { user_id: Option<Uuid> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
  pub background:          BackgroundRoute,
  /// The location `background` was matched against.
  pub background_location: Location,
  pub overlay:             Option<OverlayRoute>,
}

fn match_background(path: &str) -> BackgroundRoute {
  match path {
    LOGIN => BackgroundRoute::Login,
    HOME => BackgroundRoute::Home,
    _ => BackgroundRoute::Fallback,
  }
}

/// Match `location` against both route tables.
///
/// Overlay routes are matched against the location itself, and only when it
/// carries a background; opened without one (say, typed directly) an overlay
/// path is just an unknown background path.
pub fn resolve(location: &Location) -> Resolved {
  let background_location = location.background().clone();
  let background = match_background(&background_location.path);

  let has_background = location
    .state
    .as_ref()
    .is_some_and(|s| s.background.is_some());
  let overlay = has_background
    .then(|| match location.path.as_str() {
      CREATE_USER => Some(OverlayRoute::CreateUser),
      UPDATE_USER => Some(OverlayRoute::EditUser {
        user_id: location.state.as_ref().and_then(|s| s.user_id),
      }),
      _ => None,
    })
    .flatten();

  Resolved { background, background_location, overlay }
}

/// Initial values for the edit overlay, looked up in the already-loaded
/// list. An unknown or missing id yields an empty form.
pub fn edit_initial_values(user_id: Option<Uuid>, users: &[UserRecord]) -> UserFormValues {
  user_id
    .and_then(|id| users.iter().find(|u| u.id == id))
    .map(UserFormValues::from_record)
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::record;

  #[test]
  fn plain_locations_resolve_to_background_only() {
    let r = resolve(&Location::new(HOME));
    assert_eq!(r.background, BackgroundRoute::Home);
    assert_eq!(r.overlay, None);

    assert_eq!(resolve(&Location::new(LOGIN)).background, BackgroundRoute::Login);
    assert_eq!(
      resolve(&Location::new("/nowhere")).background,
      BackgroundRoute::Fallback
    );
  }

  #[test]
  fn overlay_keeps_background_from_state() {
    let home = Location::new(HOME);
    let r = resolve(&Location::overlay(CREATE_USER, &home, None));
    assert_eq!(r.background, BackgroundRoute::Home);
    assert_eq!(r.background_location, home);
    assert_eq!(r.overlay, Some(OverlayRoute::CreateUser));
  }

  #[test]
  fn edit_overlay_carries_id_in_state_not_path() {
    let id = Uuid::new_v4();
    let loc = Location::overlay(UPDATE_USER, &Location::new(HOME), Some(id));
    assert_eq!(loc.path, UPDATE_USER);
    assert_eq!(
      resolve(&loc).overlay,
      Some(OverlayRoute::EditUser { user_id: Some(id) })
    );
  }

  #[test]
  fn overlay_path_without_background_is_fallback() {
    let r = resolve(&Location::new(CREATE_USER));
    assert_eq!(r.background, BackgroundRoute::Fallback);
    assert_eq!(r.overlay, None);
  }

  #[test]
  fn overlay_opened_from_overlay_keeps_original_background() {
    let home = Location::new(HOME);
    let create = Location::overlay(CREATE_USER, &home, None);
    let edit = Location::overlay(UPDATE_USER, &create, Some(Uuid::new_v4()));
    assert_eq!(edit.background(), &home);
  }

  #[test]
  fn create_then_cancel_returns_to_previous_background() {
    let mut history = History::new(Location::new(HOME));
    let before = history.current().clone();

    let overlay = Location::overlay(CREATE_USER, history.current(), None);
    history.push(overlay);
    assert_eq!(resolve(history.current()).overlay, Some(OverlayRoute::CreateUser));

    assert!(history.back());
    assert_eq!(history.current(), &before);
    let r = resolve(history.current());
    assert_eq!(r.background, BackgroundRoute::Home);
    assert_eq!(r.overlay, None);
  }

  #[test]
  fn history_push_replace_back() {
    let mut history = History::new(Location::new(HOME));
    assert!(!history.back());

    history.push(Location::new("/a"));
    history.push(Location::new("/b"));
    history.replace(Location::new("/c"));
    assert_eq!(history.current().path, "/c");

    assert!(history.back());
    assert_eq!(history.current().path, "/a");

    // Pushing drops the forward entry.
    history.push(Location::new("/d"));
    assert!(history.back());
    assert_eq!(history.current().path, "/a");
    assert!(history.back());
    assert_eq!(history.current().path, HOME);
    assert!(!history.back());
  }

  #[test]
  fn edit_values_come_from_loaded_list() {
    let user = record("ada@example.com", "Ada", "Lovelace");
    let values = edit_initial_values(Some(user.id), std::slice::from_ref(&user));
    assert_eq!(values.email, "ada@example.com");
    assert_eq!(values.full_name, "Ada Lovelace");
  }

  #[test]
  fn unknown_edit_id_yields_empty_form() {
    let users = [record("ada@example.com", "Ada", "Lovelace")];
    assert_eq!(
      edit_initial_values(Some(Uuid::new_v4()), &users),
      UserFormValues::default()
    );
    assert_eq!(edit_initial_values(None, &users), UserFormValues::default());
  }
}
