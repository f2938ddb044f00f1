use serde::{Deserialize, Serialize};

use super::{require, Collection, Record};
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  Admin,
  Doctor,
  Patient,
}

impl UserRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      UserRole::Admin => "admin",
      UserRole::Doctor => "doctor",
      UserRole::Patient => "patient",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "admin" => Some(UserRole::Admin),
      "doctor" => Some(UserRole::Doctor),
      "patient" => Some(UserRole::Patient),
      _ => None,
    }
  }
}

/// Registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub name: String,
  pub email: String,
  pub role: UserRole,
  /// Avatar URL
  #[serde(default)]
  pub image: String,
  /// Only meaningful for doctors
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub specialty: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
  pub name: Option<String>,
  pub email: Option<String>,
  pub image: Option<String>,
  pub specialty: Option<String>,
}

impl Record for User {
  type Update = UserUpdate;

  const ENTITY: &'static str = "user";
  const COLLECTION: Collection = Collection::RegisteredUsers;

  fn id(&self) -> &str {
    &self.id
  }

  fn validate(&self) -> Result<()> {
    require(Self::ENTITY, "id", &self.id)?;
    require(Self::ENTITY, "name", &self.name)?;
    require(Self::ENTITY, "email", &self.email)?;
    if !self.email.contains('@') {
      return Err(StoreError::validation(
        Self::ENTITY,
        format!("malformed email: {}", self.email),
      ));
    }
    Ok(())
  }

  fn apply(&mut self, update: UserUpdate) -> Result<()> {
    if let Some(name) = update.name {
      self.name = name;
    }
    if let Some(email) = update.email {
      self.email = email;
    }
    if let Some(image) = update.image {
      self.image = image;
    }
    if let Some(specialty) = update.specialty {
      self.specialty = Some(specialty);
    }
    Ok(())
  }
}
