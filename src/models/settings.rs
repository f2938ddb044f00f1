use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Application preferences. Keys this type does not know about are kept in
/// `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
  pub theme: String,
  pub notifications: bool,
  pub language: String,
  pub auto_backup: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Default for AppSettings {
  fn default() -> Self {
    Self {
      theme: "light".to_string(),
      notifications: true,
      language: "pt-BR".to_string(),
      auto_backup: true,
      extra: Map::new(),
    }
  }
}
