use base64::Engine;
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::models::token::StoredToken;
use crate::service::AccountService;
use crate::util::now_millis;

/// Capability labels gating endpoint access. `IosUser` is the authority of
/// the registered API client and only attaches to token-authenticated
/// principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
    IosUser,
}

/// The authenticated caller, resolved before any handler runs.
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Identity settings: the one registered API client plus the operator
/// account. The operator is ordinary configuration, not a magic username;
/// its password is checked like anyone else's.
#[derive(Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub client_scopes: Vec<String>,
    pub operator_username: String,
    pub operator_password: String,
    pub token_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl AuthSettings {
    /// Roles for a verified user identity.
    pub fn roles_for(&self, username: &str) -> Vec<Role> {
        if username == self.operator_username {
            vec![Role::Admin, Role::User]
        } else {
            vec![Role::User]
        }
    }

    pub fn client_matches(&self, client_id: &str, client_secret: &str) -> bool {
        secrets_match(client_id, &self.client_id) && secrets_match(client_secret, &self.client_secret)
    }

    pub fn scope_string(&self) -> String {
        self.client_scopes.join(" ")
    }

    /// A requested scope is valid when every element is one the client is
    /// registered for.
    pub fn scope_allowed(&self, requested: &str) -> bool {
        requested
            .split_whitespace()
            .all(|s| self.client_scopes.iter().any(|c| c == s))
    }
}

/// Timing-safe string comparison for credentials.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Decode a `Basic <base64(user:pass)>` header value.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Verify user credentials against the operator identity or the account
/// store and resolve the caller's roles. Lookup misses and password
/// mismatches answer identically.
pub async fn verify_user(
    accounts: &AccountService,
    settings: &AuthSettings,
    username: &str,
    password: &str,
) -> Result<Principal, AppError> {
    let invalid = || AppError::Unauthorized("invalid username or password".into());

    if username == settings.operator_username {
        if secrets_match(password, &settings.operator_password) {
            return Ok(Principal {
                username: username.to_string(),
                roles: settings.roles_for(username),
            });
        }
        return Err(invalid());
    }

    let account = match accounts.get_by_username(username).await {
        Ok(account) => account,
        Err(AppError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e),
    };

    // Accounts created without a password cannot log in.
    match account.password.as_deref() {
        Some(stored) if secrets_match(password, stored) => Ok(Principal {
            username: username.to_string(),
            roles: settings.roles_for(username),
        }),
        _ => Err(invalid()),
    }
}

/// Mint an opaque token value: 32 random bytes, hex-encoded.
pub fn new_token_value() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Build a fresh access/refresh token pair for a verified user.
pub fn mint_token(settings: &AuthSettings, username: &str, scope: String) -> StoredToken {
    let now = now_millis();
    StoredToken {
        access_token: new_token_value(),
        refresh_token: new_token_value(),
        username: username.to_string(),
        client_id: settings.client_id.clone(),
        scope,
        issued_at: now,
        expires_at: now + settings.token_ttl_secs * 1000,
        refresh_expires_at: now + settings.refresh_ttl_secs * 1000,
    }
}
