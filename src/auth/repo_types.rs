/// User record in the static directory.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,      // unique key
    pub password_hash: String, // Argon2 PHC string
    pub disabled: bool,
}
