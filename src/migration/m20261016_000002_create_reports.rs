//! Migration: Create reports table.
//!
//! One row per competitor analysis request. The status check mirrors
//! `ReportStatus`; `google_sheet_url` is only meaningful once completed.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE reports (
                    id UUID PRIMARY KEY,
                    owner_id VARCHAR(255) NOT NULL,
                    linkedin_url TEXT NOT NULL,
                    google_sheet_url TEXT,
                    status VARCHAR(20) NOT NULL DEFAULT 'processing'
                        CHECK (status IN ('processing', 'completed', 'error')),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Listing a user's reports, newest first
                CREATE INDEX idx_reports_owner_created_at ON reports(owner_id, created_at DESC);

                -- Finding reports still waiting on the workflow
                CREATE INDEX idx_reports_processing ON reports(created_at)
                    WHERE status = 'processing';

                CREATE TRIGGER update_reports_updated_at
                    BEFORE UPDATE ON reports
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_reports_updated_at ON reports;
                DROP TABLE IF EXISTS reports CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
