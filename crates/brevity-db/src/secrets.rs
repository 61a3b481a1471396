//! Session tokens and password hashes.
//!
//! Session tokens are random, prefixed, and only their SHA-256 digest is
//! stored. Passwords are hashed with Argon2id into PHC strings.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::Rng;
use sha2::{Digest, Sha256};

use brevity_core::{Error, Result};

/// Prefix that marks brevity session tokens.
pub const SESSION_TOKEN_PREFIX: &str = "brv_st_";

/// Random characters after the prefix.
const SESSION_TOKEN_LEN: usize = 48;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory in KiB (default: 19456 = 19 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 2).
    pub iterations: u32,
    /// Parallelism degree (default: 1).
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordParams {
    /// Cheap parameters for tests and the in-memory provider.
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| Error::Config(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Generate a new session token.
pub fn generate_session_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let body: String = (0..SESSION_TOKEN_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("{}{}", SESSION_TOKEN_PREFIX, body)
}

/// Hex SHA-256 digest of a session token, as stored.
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str, params: PasswordParams) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
///
/// Parameters are read from the hash itself, so hashes made with any
/// [`PasswordParams`] verify.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Run password hashing off the async executor.
pub async fn hash_password_blocking(password: String, params: PasswordParams) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, params))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
}

/// Run password verification off the async executor.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("Password verification task failed: {}", e)))?
}

/// Hash verified in place of a real one when sign-in finds no usable
/// account, so unknown and known emails cost the same Argon2 work.
///
/// Built on first use with the provider's own parameters.
#[derive(Debug)]
pub struct DecoyHash {
    params: PasswordParams,
    hash: tokio::sync::OnceCell<String>,
}

impl DecoyHash {
    pub fn new(params: PasswordParams) -> Self {
        Self {
            params,
            hash: tokio::sync::OnceCell::new(),
        }
    }

    /// Verify `password` against the decoy and discard the outcome.
    pub async fn verify(&self, password: String) -> Result<()> {
        let params = self.params;
        let hash = self
            .hash
            .get_or_try_init(|| async move {
                let seed = generate_session_token();
                hash_password_blocking(seed, params).await
            })
            .await?;
        verify_password_blocking(password, hash.clone()).await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.hash.initialized()
    }
}
