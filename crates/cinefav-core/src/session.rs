use tracing::info;

use crate::{
    credentials::CredentialStore,
    models::{Credential, Profile},
    services::AccountBackend,
    Error, Result,
};

pub const SIGN_IN_FALLBACK: &str = "Failed to sign up";
pub const UPDATE_FALLBACK: &str = "Failed to update details";

const SIGN_IN_SUCCESS: &str = "Signed up successfully";
const UPDATE_SUCCESS: &str = "Details updated successfully";

/// Sign-up/sign-in, profile edits and logout
pub struct AccountSession<B> {
    backend: B,
    credentials: CredentialStore,
    keep_token_on_logout: bool,
}

impl<B: AccountBackend> AccountSession<B> {
    pub fn new(backend: B, credentials: CredentialStore) -> Self {
        Self {
            backend,
            credentials,
            keep_token_on_logout: false,
        }
    }

    pub fn keep_token_on_logout(mut self, keep: bool) -> Self {
        self.keep_token_on_logout = keep;
        self
    }

    /// Profile of the signed-in user, if any
    pub fn current_profile(&self) -> Option<Profile> {
        self.credentials.load().map(|credential| credential.profile)
    }

    /// Sign up or sign in and persist the issued token.
    ///
    /// Returns the backend's greeting when it sent one.
    pub async fn sign_in(&self, username: &str, email: &str, phone: Option<&str>) -> Result<String> {
        let profile = normalize_profile(username, email, phone)?;

        let grant = self.backend.authenticate(&profile).await?;
        if grant.access_token.trim().is_empty() {
            return Err(Error::DecodeFailure("backend issued an empty token".into()));
        }

        self.credentials
            .save(&Credential::new(grant.access_token, profile.clone()))?;
        info!("Signed in as {}", profile.username);

        Ok(grant
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| SIGN_IN_SUCCESS.to_string()))
    }

    /// Push new profile details and store them locally once accepted
    pub async fn update_profile(
        &self,
        username: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<String> {
        let profile = normalize_profile(username, email, phone)?;
        let credential = self.credentials.load().ok_or(Error::Unauthenticated)?;

        self.backend
            .update_profile(&credential.token, &profile)
            .await?;

        self.credentials
            .save(&Credential::new(credential.token, profile))?;
        info!("Updated profile");

        Ok(UPDATE_SUCCESS.to_string())
    }

    /// Drop the cached profile and, unless configured otherwise, the token.
    ///
    /// Either way every authenticated call reports `Unauthenticated`
    /// afterwards, since those require a full credential.
    pub fn logout(&self) -> Result<()> {
        self.credentials.clear()?;
        if !self.keep_token_on_logout {
            self.credentials.forget()?;
        }
        info!("Logged out");
        Ok(())
    }
}

fn normalize_profile(username: &str, email: &str, phone: Option<&str>) -> Result<Profile> {
    let username = username.trim();
    let email = email.trim();

    if username.is_empty() || email.is_empty() {
        return Err(Error::Validation("Please fill in all fields".into()));
    }

    Ok(Profile {
        username: username.to_string(),
        email: email.to_string(),
        phone: phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
    })
}
