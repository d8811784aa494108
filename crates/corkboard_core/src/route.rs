//! Hash-based route table for lobby and board views.
//!
//! # Responsibility
//! - Encode and parse the two view locations (`/`, `/board/<uuid>`).
//! - Hold the current route for navigation.

use crate::store::CollectionId;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static BOARD_ROUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/board/([^/]+)$").expect("valid board route regex"));

/// One addressable view location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Board selection view.
    Lobby,
    /// One board, addressed by its collection id.
    Board(CollectionId),
}

impl Route {
    /// Parses a hash path. A leading `#` is tolerated.
    pub fn parse(path: &str) -> Result<Route, RouteParseError> {
        let path = path.strip_prefix('#').unwrap_or(path);
        if path == "/" {
            return Ok(Route::Lobby);
        }
        if let Some(captures) = BOARD_ROUTE_RE.captures(path) {
            let raw = &captures[1];
            let id = Uuid::parse_str(raw)
                .map_err(|_| RouteParseError::InvalidBoardId(raw.to_string()))?;
            return Ok(Route::Board(id));
        }
        Err(RouteParseError::UnknownPath(path.to_string()))
    }

    /// Hash path for this route.
    pub fn to_hash_path(&self) -> String {
        match self {
            Route::Lobby => "/".to_string(),
            Route::Board(id) => format!("/board/{id}"),
        }
    }
}

/// Route parsing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteParseError {
    /// Path does not match any route in the table.
    UnknownPath(String),
    /// Board path with a malformed identifier.
    InvalidBoardId(String),
}

impl Display for RouteParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPath(path) => write!(f, "no route matches path `{path}`"),
            Self::InvalidBoardId(raw) => write!(f, "invalid board id in path: `{raw}`"),
        }
    }
}

impl Error for RouteParseError {}

/// Current-route holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    current: Route,
}

impl Router {
    /// Starts at the lobby.
    pub fn new() -> Self {
        Self {
            current: Route::Lobby,
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    /// Switches the current view location.
    pub fn navigate(&mut self, route: Route) {
        info!("event=navigate module=route path={}", route.to_hash_path());
        self.current = route;
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Route, RouteParseError, Router};
    use uuid::Uuid;

    #[test]
    fn lobby_and_board_paths_roundtrip() {
        assert_eq!(Route::parse("/").unwrap(), Route::Lobby);
        assert_eq!(Route::Lobby.to_hash_path(), "/");

        let id = Uuid::new_v4();
        let route = Route::Board(id);
        let path = route.to_hash_path();
        assert_eq!(Route::parse(&path).unwrap(), route);
    }

    #[test]
    fn leading_hash_is_tolerated() {
        let id = Uuid::new_v4();
        let parsed = Route::parse(&format!("#/board/{id}")).unwrap();
        assert_eq!(parsed, Route::Board(id));
    }

    #[test]
    fn junk_paths_are_rejected() {
        assert!(matches!(
            Route::parse("/boards/123"),
            Err(RouteParseError::UnknownPath(_))
        ));
        assert!(matches!(
            Route::parse(""),
            Err(RouteParseError::UnknownPath(_))
        ));
        assert!(matches!(
            Route::parse("/board/zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz"),
            Err(RouteParseError::InvalidBoardId(_))
        ));
    }

    #[test]
    fn router_starts_at_lobby_and_navigates() {
        let mut router = Router::new();
        assert_eq!(router.current(), Route::Lobby);

        let id = Uuid::new_v4();
        router.navigate(Route::Board(id));
        assert_eq!(router.current(), Route::Board(id));
    }
}
