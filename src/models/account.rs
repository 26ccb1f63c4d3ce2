use serde::{Deserialize, Serialize};

pub const MAX_USERNAME_LEN: usize = 20;

/// The account entity, shared between the wire and the database.
///
/// `password` deserializes from request bodies but is never written back
/// out: responses must not carry credentials, so serialization skips it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Assigned by the store on insert. Client-supplied values are discarded.
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: Option<i64>,
}

/// Username is the identity key: 1-20 characters, mirroring the column
/// constraint, so a bad key is rejected before it reaches the store.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty() && username.chars().count() <= MAX_USERNAME_LEN
}
