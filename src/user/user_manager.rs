use super::hasher::PasswordHasher;
use super::token::{TokenError, TokenManager};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{User, UserStore};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn require_non_empty(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("\"{}\" is not allowed to be empty", field)));
    }
    Ok(())
}

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenManager,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>, tokens: TokenManager) -> Self {
        Self {
            user_store,
            hasher: PasswordHasher::default(),
            tokens,
        }
    }

    pub fn register(&self, username: &str, password: &str, fullname: &str) -> ServiceResult<String> {
        require_non_empty("username", username)?;
        require_non_empty("password", password)?;
        require_non_empty("fullname", fullname)?;

        let password_hash = self.hasher.hash(password)?;
        match self.user_store.create_user(username, &password_hash, fullname)? {
            Some(user_id) => {
                info!("Registered user {} as {}", username, user_id);
                Ok(user_id)
            }
            None => Err(ServiceError::validation(
                "Failed to add user. Username is already used",
            )),
        }
    }

    pub fn get_user(&self, user_id: &str) -> ServiceResult<User> {
        self.user_store
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    pub fn user_exists(&self, user_id: &str) -> ServiceResult<bool> {
        Ok(self.user_store.user_exists(user_id)?)
    }

    /// Checks the credentials and issues a token pair. The refresh token is persisted
    /// so that it can later be exchanged or revoked.
    pub fn login(&self, username: &str, password: &str) -> ServiceResult<TokenPair> {
        let wrong_credentials = || ServiceError::authentication("The credentials you provided are wrong");

        let credentials = self
            .user_store
            .get_user_credentials(username)?
            .ok_or_else(wrong_credentials)?;
        if !self.hasher.verify(password, &credentials.password_hash)? {
            debug!("Wrong password for {}", username);
            return Err(wrong_credentials());
        }

        let pair = TokenPair {
            access_token: self.sign(|t| t.generate_access_token(&credentials.user_id))?,
            refresh_token: self.sign(|t| t.generate_refresh_token(&credentials.user_id))?,
        };
        self.user_store.add_refresh_token(&pair.refresh_token)?;
        info!("User {} logged in", credentials.user_id);
        Ok(pair)
    }

    pub fn refresh_access_token(&self, refresh_token: &str) -> ServiceResult<String> {
        require_non_empty("refreshToken", refresh_token)?;
        if !self.user_store.has_refresh_token(refresh_token)? {
            return Err(ServiceError::validation("Refresh token is not valid"));
        }
        let user_id = self
            .tokens
            .verify_refresh_token(refresh_token)
            .map_err(|_| ServiceError::validation("Refresh token is not valid"))?;
        self.sign(|t| t.generate_access_token(&user_id))
    }

    pub fn logout(&self, refresh_token: &str) -> ServiceResult<()> {
        require_non_empty("refreshToken", refresh_token)?;
        if !self.user_store.delete_refresh_token(refresh_token)? {
            return Err(ServiceError::validation("Refresh token is not valid"));
        }
        Ok(())
    }

    /// Resolves a bearer access token to the id of a user that still exists.
    pub fn authenticate(&self, access_token: &str) -> ServiceResult<String> {
        let user_id = self.tokens.verify_access_token(access_token).map_err(|err| {
            debug!("Rejected access token: {}", err);
            match err {
                TokenError::Expired => ServiceError::authentication("Token has expired"),
                _ => ServiceError::authentication("Invalid token"),
            }
        })?;
        if !self.user_store.user_exists(&user_id)? {
            return Err(ServiceError::authentication("Token owner no longer exists"));
        }
        Ok(user_id)
    }

    fn sign<F>(&self, generate: F) -> ServiceResult<String>
    where
        F: FnOnce(&TokenManager) -> Result<String, TokenError>,
    {
        generate(&self.tokens).map_err(|err| ServiceError::Internal(err.into()))
    }
}
