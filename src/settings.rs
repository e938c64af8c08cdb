//! Persisted client-side configuration: session role, theme and API base URL.
//!
//! Values are read once at start-up and injected into the components that
//! need them. Environment variables override what is stored.

use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::api::normalize_base_url;
use crate::db::{self, DbState};
use crate::error::PosError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

const SETTINGS_CATEGORY: &str = "session";
const KEY_ROLE: &str = "user_role";
const KEY_THEME: &str = "theme";
const KEY_API_BASE_URL: &str = "api_base_url";

pub const ENV_API_URL: &str = "CAFE_POS_API_URL";
pub const ENV_ROLE: &str = "CAFE_POS_ROLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Admin,
    #[default]
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            other => Err(PosError::Validation(format!("Unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    fn parse_stored(raw: &str) -> Theme {
        if raw.trim().eq_ignore_ascii_case("dark") {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

/// Environment overrides, captured once so loading stays testable.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub api_url: Option<String>,
    pub role: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let read = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            api_url: read(ENV_API_URL),
            role: read(ENV_ROLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub role: Role,
    pub theme: Theme,
    pub api_base_url: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            role: Role::default(),
            theme: Theme::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Preferences {
    /// Resolve preferences: environment first, then stored values, then defaults.
    pub fn load(db: &DbState, env: &EnvOverrides) -> Result<Self, PosError> {
        let conn = db.conn.lock().map_err(|e| PosError::Storage(e.to_string()))?;

        let role = match env
            .role
            .clone()
            .or_else(|| db::get_setting(&conn, SETTINGS_CATEGORY, KEY_ROLE))
        {
            Some(raw) => raw.parse::<Role>().unwrap_or_else(|e| {
                warn!(value = %raw, error = %e, "ignoring unrecognised role, using staff");
                Role::Staff
            }),
            None => Role::default(),
        };

        let theme = db::get_setting(&conn, SETTINGS_CATEGORY, KEY_THEME)
            .map(|raw| Theme::parse_stored(&raw))
            .unwrap_or_default();

        let api_base_url = env
            .api_url
            .clone()
            .or_else(|| db::get_setting(&conn, SETTINGS_CATEGORY, KEY_API_BASE_URL))
            .map(|raw| normalize_base_url(&raw))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        info!(role = %role, theme = theme.as_str(), api_base_url = %api_base_url, "preferences resolved");

        Ok(Self {
            role,
            theme,
            api_base_url,
        })
    }
}

pub fn set_role(db: &DbState, role: Role) -> Result<(), PosError> {
    store(db, KEY_ROLE, role.as_str())
}

pub fn set_api_base_url(db: &DbState, url: &str) -> Result<String, PosError> {
    let normalized = normalize_base_url(url);
    if normalized.is_empty() {
        return Err(PosError::Validation("API URL cannot be empty".to_string()));
    }
    store(db, KEY_API_BASE_URL, &normalized)?;
    Ok(normalized)
}

/// Forget the stored URL so the default (or environment) applies again.
pub fn reset_api_base_url(db: &DbState) -> Result<(), PosError> {
    let conn = db.conn.lock().map_err(|e| PosError::Storage(e.to_string()))?;
    db::delete_setting(&conn, SETTINGS_CATEGORY, KEY_API_BASE_URL).map_err(PosError::Storage)
}

/// Flip the stored theme and return the new value.
pub fn toggle_theme(db: &DbState) -> Result<Theme, PosError> {
    let conn = db.conn.lock().map_err(|e| PosError::Storage(e.to_string()))?;
    let current = db::get_setting(&conn, SETTINGS_CATEGORY, KEY_THEME)
        .map(|raw| Theme::parse_stored(&raw))
        .unwrap_or_default();
    let next = current.toggled();
    db::set_setting(&conn, SETTINGS_CATEGORY, KEY_THEME, next.as_str())
        .map_err(PosError::Storage)?;
    Ok(next)
}

fn store(db: &DbState, key: &str, value: &str) -> Result<(), PosError> {
    let conn = db.conn.lock().map_err(|e| PosError::Storage(e.to_string()))?;
    db::set_setting(&conn, SETTINGS_CATEGORY, key, value).map_err(PosError::Storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> DbState {
        db::init_in_memory().expect("in-memory db")
    }

    #[test]
    fn defaults_when_nothing_stored() {
        let db = memory_db();
        let prefs = Preferences::load(&db, &EnvOverrides::default()).unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn stored_values_are_read_back() {
        let db = memory_db();
        set_role(&db, Role::Admin).unwrap();
        set_api_base_url(&db, "pos.example.com/api/").unwrap();
        let prefs = Preferences::load(&db, &EnvOverrides::default()).unwrap();
        assert_eq!(prefs.role, Role::Admin);
        assert_eq!(prefs.api_base_url, "https://pos.example.com");
    }

    #[test]
    fn environment_overrides_stored_values() {
        let db = memory_db();
        set_role(&db, Role::Staff).unwrap();
        let env = EnvOverrides {
            api_url: Some("localhost:8080".into()),
            role: Some("ADMIN".into()),
        };
        let prefs = Preferences::load(&db, &env).unwrap();
        assert_eq!(prefs.role, Role::Admin);
        assert_eq!(prefs.api_base_url, "http://localhost:8080");
    }

    #[test]
    fn unknown_role_falls_back_to_staff() {
        let db = memory_db();
        let env = EnvOverrides {
            api_url: None,
            role: Some("owner".into()),
        };
        let prefs = Preferences::load(&db, &env).unwrap();
        assert_eq!(prefs.role, Role::Staff);
    }

    #[test]
    fn toggle_theme_persists() {
        let db = memory_db();
        assert_eq!(toggle_theme(&db).unwrap(), Theme::Dark);
        let prefs = Preferences::load(&db, &EnvOverrides::default()).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(toggle_theme(&db).unwrap(), Theme::Light);
    }

    #[test]
    fn reset_api_url_restores_default() {
        let db = memory_db();
        set_api_base_url(&db, "pos.example.com").unwrap();
        reset_api_base_url(&db).unwrap();
        let prefs = Preferences::load(&db, &EnvOverrides::default()).unwrap();
        assert_eq!(prefs.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn empty_api_url_is_rejected() {
        let db = memory_db();
        assert!(matches!(
            set_api_base_url(&db, "   "),
            Err(PosError::Validation(_))
        ));
    }
}
