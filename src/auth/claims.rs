use serde::{Deserialize, Serialize};

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>, // username
    #[serde(default)]
    pub iat: i64,            // issued at (unix timestamp)
    pub exp: i64,            // expires at (unix timestamp)
}
