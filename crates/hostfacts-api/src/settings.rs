//! Authentication settings: the registered definitions, the live values and
//! their validation.
//!
//! Settings are a plain struct assembled at start-up and shared through the
//! router state. [`definitions`] is the static registry describing each
//! setting (kind, bounds, labels) for clients and for bounds checking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::allowlist::{AllowListValidator, DEFAULT_ALLOWED_PATHS};

pub const CATEGORY: &str = "Authentication";
pub const CATEGORY_SLUG: &str = "authentication";

// ─── Registry ────────────────────────────────────────────────────────────────

/// Value kind and constraints of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettingKind {
  Integer { min: i64, max: Option<i64> },
  Boolean,
  Text { allow_blank: bool },
  StringList,
}

/// Metadata of one registered setting.
#[derive(Debug, Clone, Serialize)]
pub struct SettingDefinition {
  pub key:           &'static str,
  pub kind:          SettingKind,
  pub label:         &'static str,
  pub help_text:     &'static str,
  pub category:      &'static str,
  pub category_slug: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit:          Option<&'static str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub warning_text:  Option<&'static str>,
}

const fn setting(
  key: &'static str,
  kind: SettingKind,
  label: &'static str,
  help_text: &'static str,
) -> SettingDefinition {
  SettingDefinition {
    key,
    kind,
    label,
    help_text,
    category: CATEGORY,
    category_slug: CATEGORY_SLUG,
    unit: None,
    warning_text: None,
  }
}

static DEFINITIONS: [SettingDefinition; 8] = [
  SettingDefinition {
    unit: Some("seconds"),
    ..setting(
      "session_cookie_age",
      // Roughly 1,000 years; larger values overflow date arithmetic.
      SettingKind::Integer { min: 60, max: Some(30_000_000_000) },
      "Idle Time Force Log Out",
      "Number of seconds that a user is inactive before they will need to \
       login again.",
    )
  },
  setting(
    "sessions_per_user",
    SettingKind::Integer { min: -1, max: None },
    "Maximum number of simultaneous logged in sessions",
    "Maximum number of simultaneous logged in sessions a user may have. To \
     disable enter -1.",
  ),
  setting(
    "disable_local_auth",
    SettingKind::Boolean,
    "Disable the built-in authentication system",
    "Controls whether users are prevented from using the built-in \
     authentication system.",
  ),
  setting(
    "auth_basic_enabled",
    SettingKind::Boolean,
    "Enable HTTP Basic Auth",
    "Enable HTTP Basic Auth for the API.",
  ),
  SettingDefinition {
    warning_text: Some(
      "Changing the redirect URL could impact the ability to login if local \
       authentication is also disabled.",
    ),
    ..setting(
      "login_redirect_override",
      SettingKind::Text { allow_blank: true },
      "Login redirect override URL",
      "URL to which unauthorized users will be redirected to log in. If \
       blank, users will be sent to the login page.",
    )
  },
  setting(
    "allow_metrics_for_anonymous_users",
    SettingKind::Boolean,
    "Allow anonymous users to poll metrics",
    "If true, anonymous users are allowed to poll metrics.",
  ),
  setting(
    "restrict_api_anonymous_access",
    SettingKind::Boolean,
    "Restrict Anonymous API Access",
    "If true, all API endpoints except those specified in \"Allowed URLs for \
     Anonymous Access\" will require authentication.",
  ),
  setting(
    "anonymous_access_api_allowed_paths",
    SettingKind::StringList,
    "Allowed URLs for Anonymous Access",
    "A list of API endpoints that can be accessed without authentication, \
     even when \"Restrict Anonymous API Access\" is enabled.",
  ),
];

/// Every registered authentication setting, in registration order.
pub fn definitions() -> &'static [SettingDefinition] { &DEFINITIONS }

pub fn definition(key: &str) -> Option<&'static SettingDefinition> {
  DEFINITIONS.iter().find(|d| d.key == key)
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// Live authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSettings {
  pub session_cookie_age:                 i64,
  pub sessions_per_user:                  i64,
  pub disable_local_auth:                 bool,
  pub auth_basic_enabled:                 bool,
  pub login_redirect_override:            String,
  pub allow_metrics_for_anonymous_users:  bool,
  pub restrict_api_anonymous_access:      bool,
  pub anonymous_access_api_allowed_paths: Vec<String>,
}

impl Default for AuthSettings {
  fn default() -> Self {
    Self {
      session_cookie_age:                 1800,
      sessions_per_user:                  -1,
      disable_local_auth:                 false,
      auth_basic_enabled:                 true,
      login_redirect_override:            String::new(),
      allow_metrics_for_anonymous_users:  false,
      restrict_api_anonymous_access:      false,
      anonymous_access_api_allowed_paths: DEFAULT_ALLOWED_PATHS
        .iter()
        .map(|p| (*p).to_owned())
        .collect(),
    }
  }
}

/// A partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSettingsPatch {
  pub session_cookie_age:                 Option<i64>,
  pub sessions_per_user:                  Option<i64>,
  pub disable_local_auth:                 Option<bool>,
  pub auth_basic_enabled:                 Option<bool>,
  pub login_redirect_override:            Option<String>,
  pub allow_metrics_for_anonymous_users:  Option<bool>,
  pub restrict_api_anonymous_access:      Option<bool>,
  pub anonymous_access_api_allowed_paths: Option<Vec<String>>,
}

impl AuthSettingsPatch {
  pub fn apply(self, current: &AuthSettings) -> AuthSettings {
    let current = current.clone();
    AuthSettings {
      session_cookie_age:                 self
        .session_cookie_age
        .unwrap_or(current.session_cookie_age),
      sessions_per_user:                  self
        .sessions_per_user
        .unwrap_or(current.sessions_per_user),
      disable_local_auth:                 self
        .disable_local_auth
        .unwrap_or(current.disable_local_auth),
      auth_basic_enabled:                 self
        .auth_basic_enabled
        .unwrap_or(current.auth_basic_enabled),
      login_redirect_override:            self
        .login_redirect_override
        .unwrap_or(current.login_redirect_override),
      allow_metrics_for_anonymous_users:  self
        .allow_metrics_for_anonymous_users
        .unwrap_or(current.allow_metrics_for_anonymous_users),
      restrict_api_anonymous_access:      self
        .restrict_api_anonymous_access
        .unwrap_or(current.restrict_api_anonymous_access),
      anonymous_access_api_allowed_paths: self
        .anonymous_access_api_allowed_paths
        .unwrap_or(current.anonymous_access_api_allowed_paths),
    }
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: String,
}

/// Settings were rejected; nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid authentication settings: {}", summary(.errors))]
pub struct ValidationError {
  pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
  errors
    .iter()
    .map(|e| format!("{}: {}", e.field, e.message))
    .collect::<Vec<_>>()
    .join("; ")
}

impl ValidationError {
  fn single(field: &'static str, message: impl Into<String>) -> Self {
    Self { errors: vec![FieldError { field, message: message.into() }] }
  }
}

fn check_bounds(key: &'static str, value: i64, errors: &mut Vec<FieldError>) {
  let Some(SettingDefinition {
    kind: SettingKind::Integer { min, max },
    ..
  }) = definition(key)
  else {
    return;
  };
  if value < *min {
    errors.push(FieldError {
      field:   key,
      message: format!("Ensure this value is greater than or equal to {min}."),
    });
  }
  if let Some(max) = max
    && value > *max
  {
    errors.push(FieldError {
      field:   key,
      message: format!("Ensure this value is less than or equal to {max}."),
    });
  }
}

impl AuthSettings {
  /// Validate a candidate settings value.
  ///
  /// Per-field bounds come first, then the category validators in order:
  /// local authentication cannot be disabled (no remote systems exist), and
  /// the allow-list must resolve, with missing default paths added back.
  /// Returns the settings to store, which may differ from `self` in the
  /// allow-list.
  pub fn validate(
    mut self,
    allow_list: &AllowListValidator,
  ) -> Result<Self, ValidationError> {
    let mut errors = Vec::new();
    check_bounds("session_cookie_age", self.session_cookie_age, &mut errors);
    check_bounds("sessions_per_user", self.sessions_per_user, &mut errors);
    if !errors.is_empty() {
      return Err(ValidationError { errors });
    }

    if self.disable_local_auth {
      return Err(ValidationError::single(
        "disable_local_auth",
        "There are no remote authentication systems configured.",
      ));
    }

    let paths = std::mem::take(&mut self.anonymous_access_api_allowed_paths);
    self.anonymous_access_api_allowed_paths = allow_list
      .validate(paths)
      .map_err(|e| {
        ValidationError::single("anonymous_access_api_allowed_paths", e.to_string())
      })?;

    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::allowlist::RouteTable;

  fn validator() -> AllowListValidator {
    AllowListValidator::new(RouteTable::new(["/api/", "/api/v2/", "/api/v2/ping/"]))
  }

  #[test]
  fn registry_covers_every_setting() {
    let value = serde_json::to_value(AuthSettings::default()).unwrap();
    let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), definitions().len());
    for key in keys {
      let def = definition(&key).unwrap();
      assert_eq!(def.category_slug, "authentication");
    }
  }

  #[test]
  fn defaults_are_valid() {
    let settings = AuthSettings::default();
    assert_eq!(settings.clone().validate(&validator()).unwrap(), settings);
  }

  #[test]
  fn session_cookie_age_bounds() {
    let too_small = AuthSettings { session_cookie_age: 59, ..Default::default() };
    let err = too_small.validate(&validator()).unwrap_err();
    assert_eq!(err.errors[0].field, "session_cookie_age");

    let too_large =
      AuthSettings { session_cookie_age: 30_000_000_001, ..Default::default() };
    assert!(too_large.validate(&validator()).is_err());

    let max = AuthSettings { session_cookie_age: 30_000_000_000, ..Default::default() };
    assert!(max.validate(&validator()).is_ok());
  }

  #[test]
  fn sessions_per_user_minus_one_disables() {
    let ok = AuthSettings { sessions_per_user: -1, ..Default::default() };
    assert!(ok.validate(&validator()).is_ok());

    let bad = AuthSettings { sessions_per_user: -2, ..Default::default() };
    let err = bad.validate(&validator()).unwrap_err();
    assert_eq!(err.errors[0].field, "sessions_per_user");
  }

  #[test]
  fn disabling_local_auth_is_rejected() {
    let settings = AuthSettings { disable_local_auth: true, ..Default::default() };
    let err = settings.validate(&validator()).unwrap_err();
    assert_eq!(err.errors[0].field, "disable_local_auth");
  }

  #[test]
  fn allow_list_is_completed_with_defaults() {
    let settings = AuthSettings {
      anonymous_access_api_allowed_paths: vec![],
      ..Default::default()
    };
    let validated = settings.validate(&validator()).unwrap();
    assert_eq!(
      validated.anonymous_access_api_allowed_paths,
      AuthSettings::default().anonymous_access_api_allowed_paths
    );
  }

  #[test]
  fn bad_allow_list_names_the_path() {
    let mut paths = AuthSettings::default().anonymous_access_api_allowed_paths;
    paths.push("not_a_path".into());
    let settings = AuthSettings {
      anonymous_access_api_allowed_paths: paths,
      ..Default::default()
    };
    let err = settings.validate(&validator()).unwrap_err();
    assert_eq!(err.errors[0].field, "anonymous_access_api_allowed_paths");
    assert!(err.errors[0].message.contains("not_a_path"));
  }

  #[test]
  fn patch_keeps_unset_fields() {
    let current = AuthSettings::default();
    let patch: AuthSettingsPatch =
      serde_json::from_str(r#"{"restrict_api_anonymous_access": true}"#).unwrap();
    let next = patch.apply(&current);
    assert!(next.restrict_api_anonymous_access);
    assert_eq!(next.session_cookie_age, current.session_cookie_age);
    assert_eq!(
      next.anonymous_access_api_allowed_paths,
      current.anonymous_access_api_allowed_paths
    );
  }

  #[test]
  fn patch_rejects_unknown_settings() {
    assert!(serde_json::from_str::<AuthSettingsPatch>(r#"{"bogus": 1}"#).is_err());
  }
}
