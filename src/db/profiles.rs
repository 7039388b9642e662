//! Database queries for user profiles.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use crate::entity::profile::{self, ActiveModel, Entity as ProfileEntity};
use crate::error::{AppError, AppResult};
use crate::models::{Profile, ProfilePatch};

use super::DbPool;
use super::store::ProfileStore;

impl From<profile::Model> for Profile {
    fn from(m: profile::Model) -> Self {
        Profile {
            id: m.id,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
            has_completed_onboarding: m.has_completed_onboarding,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl DbPool {
    async fn find_profile(&self, id: &str) -> AppResult<Option<profile::Model>> {
        ProfileEntity::find_by_id(id.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get profile: {}", e)))
    }
}

#[async_trait]
impl ProfileStore for DbPool {
    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        Ok(self.find_profile(id).await?.map(Profile::from))
    }

    async fn get_or_create_profile(&self, id: &str, email: &str) -> AppResult<Profile> {
        if let Some(existing) = self.find_profile(id).await? {
            return Ok(existing.into());
        }

        let now = Utc::now();
        let model = ActiveModel {
            id: Set(id.to_string()),
            email: Set(email.to_string()),
            first_name: Set(None),
            last_name: Set(None),
            has_completed_onboarding: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(self.connection()).await {
            Ok(created) => Ok(created.into()),
            // Lost a race with a concurrent first request
            Err(e) => match self.find_profile(id).await? {
                Some(existing) => Ok(existing.into()),
                None => Err(AppError::Database(format!("Failed to insert profile: {}", e))),
            },
        }
    }

    async fn update_profile(&self, id: &str, patch: ProfilePatch) -> AppResult<Profile> {
        let existing = self
            .find_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", id)))?;

        let mut active: ActiveModel = existing.into();
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(done) = patch.has_completed_onboarding {
            active.has_completed_onboarding = Set(done);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update profile: {}", e)))?;

        Ok(updated.into())
    }
}
