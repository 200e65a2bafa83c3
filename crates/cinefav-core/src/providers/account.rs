// Account backend provider - bridges AccountClient with AccountBackend
use async_trait::async_trait;
use cinefav_api::{AccountClient, FavoriteAction, ProfilePayload};

use crate::{
    models::{FavoriteRecord, Profile, ToggleOutcome},
    services::{AccountBackend, AuthGrant},
    Result,
};

/// Wrapper around AccountClient that implements AccountBackend
pub struct HttpAccountBackend {
    client: AccountClient,
}

impl HttpAccountBackend {
    pub fn new(client: AccountClient) -> Self {
        Self { client }
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(AccountClient::with_base_url(base_url.to_string()))
    }
}

#[async_trait]
impl AccountBackend for HttpAccountBackend {
    async fn check_favorite(&self, token: &str, item_id: u64) -> Result<bool> {
        let response = self.client.check_favorite(token, item_id).await?;
        Ok(response.is_favorite)
    }

    async fn toggle_favorite(&self, token: &str, item_id: u64, title: &str) -> Result<ToggleOutcome> {
        let response = self.client.toggle_favorite(token, item_id, title).await?;
        Ok(action_to_outcome(response.action))
    }

    async fn list_favorites(&self, token: &str) -> Result<Vec<FavoriteRecord>> {
        let response = self.client.list_favorites(token).await?;
        Ok(response
            .favorites
            .into_iter()
            .map(|f| FavoriteRecord {
                id: f.id,
                title: f.title,
            })
            .collect())
    }

    async fn authenticate(&self, profile: &Profile) -> Result<AuthGrant> {
        let response = self.client.authenticate(&profile_to_payload(profile)).await?;
        Ok(AuthGrant {
            access_token: response.access_token,
            message: response.message,
        })
    }

    async fn update_profile(&self, token: &str, profile: &Profile) -> Result<Option<String>> {
        let response = self
            .client
            .update_profile(token, &profile_to_payload(profile))
            .await?;
        Ok(response.message)
    }
}

fn action_to_outcome(action: Option<FavoriteAction>) -> ToggleOutcome {
    match action {
        Some(FavoriteAction::Added) => ToggleOutcome::Added,
        Some(FavoriteAction::Removed) => ToggleOutcome::Removed,
        Some(FavoriteAction::Other) | None => ToggleOutcome::Unconfirmed,
    }
}

/// The backend wants an empty string rather than a missing phone
fn profile_to_payload(profile: &Profile) -> ProfilePayload {
    ProfilePayload {
        username: profile.username.clone(),
        email: profile.email.clone(),
        phone: profile.phone.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_action_is_unconfirmed() {
        assert_eq!(action_to_outcome(Some(FavoriteAction::Added)), ToggleOutcome::Added);
        assert_eq!(action_to_outcome(Some(FavoriteAction::Removed)), ToggleOutcome::Removed);
        assert_eq!(action_to_outcome(Some(FavoriteAction::Other)), ToggleOutcome::Unconfirmed);
        assert_eq!(action_to_outcome(None), ToggleOutcome::Unconfirmed);
    }

    #[test]
    fn test_missing_phone_sent_as_empty_string() {
        let payload = profile_to_payload(&Profile {
            username: "ana".into(),
            email: "ana@example.com".into(),
            phone: None,
        });
        assert_eq!(payload.phone, "");
    }
}
