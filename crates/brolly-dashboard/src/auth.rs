//! A local [`CredentialVerifier`] backed by the document store.
//!
//! Accounts live in the `users` collection, keyed by a generated id, with the
//! password stored as an argon2 PHC string. Each email is claimed by a
//! document in `user_emails` keyed on the email itself, so two registrations
//! for one address cannot both succeed. Tokens are base64-encoded
//! `email:password` credentials; this module verifies them but never mints
//! session tokens.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use brolly_core::{
  Error, Result,
  auth::{Claims, CredentialVerifier, UserRecord},
  collection::{USER_EMAILS, USERS},
  document::{Document, Fields},
  store::DocumentStore,
};
use chrono::Utc;
use rand_core::OsRng;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Encode credentials in the form [`LocalAuth::verify_token`] accepts.
pub fn credentials_token(email: &str, password: &str) -> String {
  B64.encode(format!("{email}:{password}"))
}

pub struct LocalAuth<S> {
  store: Arc<S>,
}

impl<S: DocumentStore> LocalAuth<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn find_by_email(&self, email: &str) -> Result<Option<Document>> {
    let Some(claim) = self.store.get_document(USER_EMAILS, email).await? else {
      return Ok(None);
    };
    let Some(uid) = claim.get("uid").and_then(Value::as_str) else {
      return Ok(None);
    };
    self.store.get_document(USERS, uid).await
  }
}

impl<S: DocumentStore> CredentialVerifier for LocalAuth<S> {
  async fn verify_token(&self, token: &str) -> Result<Claims> {
    let invalid = |msg: &str| Error::InvalidToken(msg.to_owned());

    let decoded = B64
      .decode(token.trim())
      .map_err(|_| invalid("token is not valid base64"))?;
    let creds = std::str::from_utf8(&decoded).map_err(|_| invalid("token is not utf-8"))?;
    let (email, password) = creds
      .split_once(':')
      .ok_or_else(|| invalid("token is not an email:password pair"))?;

    let user = self
      .find_by_email(email)
      .await?
      .ok_or_else(|| invalid("unknown user"))?;
    let stored_hash = user
      .get("password_hash")
      .and_then(Value::as_str)
      .ok_or_else(|| invalid("user has no password"))?;

    let parsed_hash = PasswordHash::new(stored_hash).map_err(|_| invalid("corrupt password hash"))?;
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| invalid("wrong password"))?;

    debug!(uid = %user.key, "token verified");
    Ok(Claims { uid: user.key, email: email.to_owned() })
  }

  async fn create_user(&self, email: &str, password: &str) -> Result<UserRecord> {
    let failed = |msg: String| Error::UserCreationFailed(msg);

    if email.is_empty() || !email.contains('@') || email.contains(':') {
      return Err(failed(format!("invalid email address {email:?}")));
    }
    if password.len() < MIN_PASSWORD_LEN {
      return Err(failed(format!(
        "password must be at least {MIN_PASSWORD_LEN} characters"
      )));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| failed(format!("argon2 error: {e}")))?
      .to_string();

    let id = Uuid::new_v4().simple().to_string();

    let mut claim = Fields::new();
    claim.insert("uid".into(), Value::from(id.as_str()));
    match self.store.create_document(USER_EMAILS, email, claim).await {
      Ok(()) => {}
      Err(Error::AlreadyExists { .. }) => {
        return Err(failed(format!("email {email} is already registered")));
      }
      Err(e) => return Err(failed(e.to_string())),
    }

    let mut fields = Fields::new();
    fields.insert("email".into(), Value::from(email));
    fields.insert("password_hash".into(), Value::from(hash));
    fields.insert("created_at".into(), Value::from(Utc::now().to_rfc3339()));

    if let Err(e) = self.store.create_document(USERS, &id, fields).await {
      // Release the claim so the address can be registered again.
      if let Err(release) = self.store.delete_document(USER_EMAILS, email).await {
        warn!(error = %release, "failed to release email claim");
      }
      return Err(failed(e.to_string()));
    }

    info!(uid = %id, "user created");
    Ok(UserRecord { id, email: email.to_owned() })
  }
}
