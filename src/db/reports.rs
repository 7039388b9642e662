//! Database queries for competitor reports.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::competitor_report::{self as report, ActiveModel, Entity as ReportEntity};
use crate::error::{AppError, AppResult};
use crate::models::{ListReportsQuery, NewReport, Report, ReportPatch, ReportStatus};

use super::DbPool;
use super::store::{ReportStore, check_patch, terminal_conflict};

impl TryFrom<report::Model> for Report {
    type Error = AppError;

    fn try_from(m: report::Model) -> AppResult<Self> {
        let status = ReportStatus::parse(&m.status).ok_or_else(|| {
            AppError::Database(format!("Report {} has unknown status '{}'", m.id, m.status))
        })?;

        Ok(Report {
            id: m.id,
            owner_id: m.owner_id,
            linkedin_url: m.linkedin_url,
            google_sheet_url: m.google_sheet_url,
            status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

#[async_trait]
impl ReportStore for DbPool {
    async fn get(&self, id: Uuid) -> AppResult<Option<Report>> {
        ReportEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get report: {}", e)))?
            .map(Report::try_from)
            .transpose()
    }

    async fn create(&self, new: NewReport) -> AppResult<Report> {
        let now = Utc::now();

        let model = ActiveModel {
            // UUIDv7 keeps ids time-ordered
            id: Set(Uuid::now_v7()),
            owner_id: Set(new.owner_id),
            linkedin_url: Set(new.linkedin_url),
            google_sheet_url: Set(None),
            status: Set(ReportStatus::Processing.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert report: {}", e)))?;

        result.try_into()
    }

    async fn update(&self, id: Uuid, patch: ReportPatch) -> AppResult<Report> {
        check_patch(&patch)?;

        // Guarded on status so two racing writers cannot both land
        let result = ReportEntity::update_many()
            .col_expr(report::Column::Status, Expr::value(patch.status.as_str()))
            .col_expr(
                report::Column::GoogleSheetUrl,
                Expr::value(patch.google_sheet_url.clone()),
            )
            .col_expr(report::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::Status.eq(ReportStatus::Processing.as_str()))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update report: {}", e)))?;

        let current = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {}", id)))?;

        if result.rows_affected == 0 {
            return Err(terminal_conflict(id, current.status));
        }

        Ok(current)
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        query: &ListReportsQuery,
    ) -> AppResult<(Vec<Report>, u64)> {
        let select = ReportEntity::find().filter(report::Column::OwnerId.eq(owner_id));

        let total = select
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count reports: {}", e)))?;

        let reports = select
            .order_by_desc(report::Column::CreatedAt)
            .offset(query.offset)
            .limit(query.clamped_limit())
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list reports: {}", e)))?
            .into_iter()
            .map(Report::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((reports, total))
    }

    async fn ping(&self) -> AppResult<()> {
        self.connection()
            .ping()
            .await
            .map_err(|e| AppError::Database(format!("Database ping failed: {}", e)))
    }
}
