//! In-memory report and profile store.
//!
//! Same semantics as the PostgreSQL store, held in process memory. Backs the
//! `CRS_STORE=memory` mode and the test suites.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ListReportsQuery, NewReport, Profile, ProfilePatch, Report, ReportPatch, ReportStatus,
};

use super::store::{ProfileStore, ReportStore, check_patch, terminal_conflict};

#[derive(Default)]
pub struct MemoryStore {
    reports: RwLock<HashMap<Uuid, Report>>,
    profiles: RwLock<HashMap<String, Profile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Report>> {
        Ok(self.reports.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewReport) -> AppResult<Report> {
        let now = Utc::now();
        let report = Report {
            id: Uuid::now_v7(),
            owner_id: new.owner_id,
            linkedin_url: new.linkedin_url,
            google_sheet_url: None,
            status: ReportStatus::Processing,
            created_at: now,
            updated_at: now,
        };

        self.reports.write().await.insert(report.id, report.clone());
        Ok(report)
    }

    async fn update(&self, id: Uuid, patch: ReportPatch) -> AppResult<Report> {
        check_patch(&patch)?;

        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Report {}", id)))?;

        if report.status.is_terminal() {
            return Err(terminal_conflict(id, report.status));
        }

        report.status = patch.status;
        report.google_sheet_url = patch.google_sheet_url;
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        query: &ListReportsQuery,
    ) -> AppResult<(Vec<Report>, u64)> {
        let reports = self.reports.read().await;
        let mut owned: Vec<Report> = reports
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        // Newest first; v7 ids break ties between equal timestamps
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = owned.len() as u64;
        let page = owned
            .into_iter()
            .skip(query.offset as usize)
            .take(query.clamped_limit() as usize)
            .collect();

        Ok((page, total))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn get_or_create_profile(&self, id: &str, email: &str) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.entry(id.to_string()).or_insert_with(|| {
            let now = Utc::now();
            Profile {
                id: id.to_string(),
                email: email.to_string(),
                first_name: None,
                last_name: None,
                has_completed_onboarding: false,
                created_at: now,
                updated_at: now,
            }
        });
        Ok(profile.clone())
    }

    async fn update_profile(&self, id: &str, patch: ProfilePatch) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", id)))?;

        if let Some(first_name) = patch.first_name {
            profile.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            profile.last_name = Some(last_name);
        }
        if let Some(done) = patch.has_completed_onboarding {
            profile.has_completed_onboarding = done;
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}
