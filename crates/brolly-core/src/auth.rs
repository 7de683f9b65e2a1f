//! The credential-verifier contract.
//!
//! The data-access layer keys preference documents on the `uid` a verifier
//! returns but performs no authentication itself.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Verified identity extracted from a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub uid:   String,
  pub email: String,
}

/// A newly created account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  pub id:    String,
  pub email: String,
}

pub trait CredentialVerifier: Send + Sync {
  /// Fails with `InvalidToken` if the token cannot be verified.
  fn verify_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Claims>> + Send + 'a;

  /// Fails with `UserCreationFailed` if the account cannot be created.
  fn create_user<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<UserRecord>> + Send + 'a;
}
