//! The signed-in user and their auth token.

use tracing::info;

use super::RecordStore;
use crate::error::Result;
use crate::keys;
use crate::models::User;

impl RecordStore {
  /// Remember `user` as signed in with `token`.
  pub async fn save_session(&self, user: &User, token: &str) -> Result<()> {
    self.cache().set(keys::USER, user, None).await?;
    self.cache().set(keys::TOKEN, token, None).await?;
    info!(user_id = %user.id, "Session saved");
    Ok(())
  }

  pub async fn current_user(&self) -> Option<User> {
    self.cache().get(keys::USER).await
  }

  pub async fn token(&self) -> Option<String> {
    self.cache().get(keys::TOKEN).await
  }

  /// Replace the stored profile of the signed-in user.
  pub async fn update_current_user(&self, user: &User) -> Result<()> {
    self.cache().set(keys::USER, user, None).await
  }

  pub async fn clear_session(&self) -> Result<()> {
    self.cache().remove(keys::USER).await?;
    self.cache().remove(keys::TOKEN).await?;
    info!("Session cleared");
    Ok(())
  }
}
