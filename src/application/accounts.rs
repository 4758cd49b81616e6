use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{CreateTokenParams, CreateUserParams, RepoError, UsersRepo};
use crate::domain::accounts::{validate_email, validate_password, validate_username};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;

const TOKEN_PREFIX: &str = "lt";
const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid bearer token")]
    Invalid,
    #[error("expired bearer token")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub user: UserRecord,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    token_ttl: Duration,
    hasher: Argon2<'static>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>, token_ttl: Duration) -> Self {
        Self {
            users,
            token_ttl,
            hasher: Argon2::default(),
        }
    }

    /// Swap the argon2 cost parameters. Stored hashes carry their own
    /// parameters, so existing passwords keep verifying.
    pub fn with_password_params(mut self, params: Params) -> Self {
        self.hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        self
    }

    pub async fn register(&self, cmd: RegisterCommand) -> Result<UserRecord, AccountError> {
        let username = validate_username(&cmd.username)?;
        let email = validate_email(&cmd.email)?;
        validate_password(&cmd.password)?;

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AccountError::UsernameTaken);
        }

        let password_hash = self.hash_password(&cmd.password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username,
                email,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::UsernameTaken,
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "larder::accounts",
            user_id = %user.id,
            username = %user.username,
            "User registered"
        );
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AccountError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let expires_at = OffsetDateTime::now_utc() + self.token_ttl;

        self.users
            .create_token(CreateTokenParams {
                user_id: user.id,
                prefix,
                hashed_secret: Self::hash_secret(&secret),
                expires_at,
            })
            .await?;

        Ok(IssuedToken {
            token,
            expires_at,
            user,
        })
    }

    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let parsed = Self::parse_token(token).ok_or(AuthError::Invalid)?;
        let record = self
            .users
            .find_token_by_prefix(parsed.prefix)
            .await
            .map_err(|_| AuthError::Invalid)?
            .ok_or(AuthError::Invalid)?;

        let hashed_input = Self::hash_secret(parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }
        if record.expires_at <= OffsetDateTime::now_utc() {
            return Err(AuthError::Expired);
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await
            .map_err(|_| AuthError::Invalid)?
            .ok_or(AuthError::Invalid)?;

        Ok(Principal {
            user_id: user.id,
            username: user.username,
            email: user.email,
        })
    }

    fn hash_password(&self, password: &str) -> Result<String, AccountError> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|err| AccountError::Hashing(err.to_string()))?;
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AccountError::Hashing(err.to_string()))
    }

    fn verify_password(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
        let mut parts = token.trim().splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
            return None;
        }
        Some(ParsedToken { prefix, secret })
    }
}

struct ParsedToken<'a> {
    prefix: &'a str,
    secret: &'a str,
}
