use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo_types::UserId;

/// JWT payload carried by the bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId, // user ID
    pub jti: Uuid,   // unique per login, so a re-login never reissues an old token
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}
