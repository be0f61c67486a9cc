//! Server snapshot tools

use super::{DoctorTools, respond};
use crate::envelope::ToolResponse;
use crate::queries;
use crate::server::{
    ActiveSession, ActiveSessions, DatabaseInfo, DatabaseList, MemoryCounters, MemoryReport,
    SchedulerSummary, ServerConfigurations, ServerVersion, assess_configuration_rows,
    assess_memory,
};
use sqldoctor_core::Result;

impl DoctorTools {
    /// Version string and instance name
    #[tracing::instrument(skip(self))]
    pub async fn get_server_version(&self) -> ToolResponse<ServerVersion> {
        respond("get_server_version", self.server_version().await)
    }

    /// Every database on the instance, by name
    #[tracing::instrument(skip(self))]
    pub async fn list_databases(&self) -> ToolResponse<DatabaseList> {
        respond("list_databases", self.databases().await)
    }

    /// Executing requests outside the system databases
    #[tracing::instrument(skip(self))]
    pub async fn get_active_sessions(&self) -> ToolResponse<ActiveSessions> {
        respond("get_active_sessions", self.active_sessions().await)
    }

    /// CPU and IO queue depth across schedulers
    #[tracing::instrument(skip(self))]
    pub async fn get_scheduler_stats(&self) -> ToolResponse<SchedulerSummary> {
        respond("get_scheduler_stats", self.scheduler_stats().await)
    }

    /// Memory and parallelism settings with their assessment
    #[tracing::instrument(skip(self))]
    pub async fn get_server_configurations(&self) -> ToolResponse<ServerConfigurations> {
        respond("get_server_configurations", self.server_configurations().await)
    }

    /// Page life expectancy, memory grants and allocation gap
    #[tracing::instrument(skip(self))]
    pub async fn get_memory_stats(&self) -> ToolResponse<MemoryReport> {
        respond("get_memory_stats", self.memory_stats().await)
    }

    async fn server_version(&self) -> Result<ServerVersion> {
        let row = self.fetch_first(queries::SERVER_VERSION).await?;
        let version = ServerVersion::from_row(&row);
        tracing::info!(server = %version.server_name, "retrieved server version");
        Ok(version)
    }

    async fn databases(&self) -> Result<DatabaseList> {
        let rows = self.fetch_rows(queries::LIST_DATABASES, &[]).await?;
        let list = DatabaseList::new(rows.iter().map(DatabaseInfo::from_row).collect());
        tracing::info!(count = list.count, "retrieved databases");
        Ok(list)
    }

    async fn active_sessions(&self) -> Result<ActiveSessions> {
        let rows = self.fetch_rows(queries::ACTIVE_SESSIONS, &[]).await?;
        let sessions = ActiveSessions::new(rows.iter().map(ActiveSession::from_row).collect());
        tracing::info!(
            count = sessions.count,
            blocked = sessions.blocked().count(),
            "retrieved active sessions"
        );
        Ok(sessions)
    }

    async fn scheduler_stats(&self) -> Result<SchedulerSummary> {
        let row = self.fetch_first(queries::SCHEDULER_STATS).await?;
        let summary = SchedulerSummary::from_row(&row);
        tracing::info!(
            schedulers = summary.scheduler_count,
            avg_runnable = summary.avg_runnable_per_scheduler,
            avg_pending_io = summary.avg_pending_disk_io,
            "retrieved scheduler stats"
        );
        Ok(summary)
    }

    async fn server_configurations(&self) -> Result<ServerConfigurations> {
        let rows = self.fetch_rows(queries::SERVER_CONFIGURATIONS, &[]).await?;
        let configurations = assess_configuration_rows(&rows);
        tracing::info!(
            count = configurations.configurations.len(),
            "retrieved server configurations"
        );
        Ok(configurations)
    }

    async fn memory_stats(&self) -> Result<MemoryReport> {
        let row = self.fetch_first(queries::MEMORY_COUNTERS).await?;
        let stats = assess_memory(MemoryCounters::from_row(&row));
        tracing::info!(
            ple_seconds = stats.ple_seconds,
            assessment = %stats.overall_assessment,
            "retrieved memory stats"
        );
        Ok(MemoryReport {
            memory_stats: Some(stats),
        })
    }
}
