//! Diagnostic SQL
//!
//! Column aliases are the contract with the row readers in `server` and the
//! analyzer's `from_row` constructors.

/// `@@VERSION` and `@@SERVERNAME`
pub const SERVER_VERSION: &str = r#"
SELECT
    @@VERSION AS Version,
    @@SERVERNAME AS ServerName
"#;

pub const LIST_DATABASES: &str = r#"
SELECT
    name,
    database_id,
    CONVERT(VARCHAR, create_date, 120) AS create_date,
    state_desc,
    recovery_model_desc,
    compatibility_level
FROM sys.databases
ORDER BY name
"#;

/// Executing requests outside `master`/`msdb`, excluding this query itself
pub const ACTIVE_SESSIONS: &str = r#"
SELECT
    sqltext.TEXT AS sql_text,
    req.session_id,
    req.status,
    req.command,
    CONVERT(NUMERIC(8,1), req.cpu_time / 1000.0) AS cpu_seconds,
    CONVERT(NUMERIC(8,1), req.total_elapsed_time / 1000.0) AS elapsed_seconds,
    req.reads,
    req.logical_reads,
    req.wait_time,
    req.last_wait_type,
    req.blocking_session_id,
    CONVERT(VARCHAR, con.connect_time, 120) AS connect_time,
    req.dop,
    dm_es.host_name,
    dm_es.program_name,
    DB_NAME(req.database_id) AS database_name,
    dm_es.login_name
FROM sys.dm_exec_requests req
LEFT OUTER JOIN sys.dm_exec_sessions dm_es ON dm_es.session_id = req.session_id
LEFT OUTER JOIN sys.dm_exec_connections con ON con.connection_id = req.connection_id
CROSS APPLY sys.dm_exec_sql_text(req.sql_handle) AS sqltext
WHERE sqltext.TEXT NOT LIKE '%sqltext.TEXT%'
  AND DB_NAME(req.database_id) NOT IN ('master', 'msdb')
"#;

/// Averages over visible online schedulers
pub const SCHEDULER_STATS: &str = r#"
SELECT
    COUNT(*) AS scheduler_count,
    AVG(1.0 * runnable_tasks_count) AS avg_runnable_tasks,
    AVG(1.0 * pending_disk_io_count) AS avg_pending_disk_io_count
FROM sys.dm_os_schedulers
WHERE scheduler_id < 255
"#;

/// Raw inputs for the configuration assessment, one row per setting
pub const SERVER_CONFIGURATIONS: &str = r#"
SELECT
    CONVERT(VARCHAR(100), c.name) AS name,
    CAST(c.value_in_use AS BIGINT) AS value,
    CAST(i.physical_memory_kb / 1024 AS BIGINT) AS physical_memory_mb,
    CAST(SERVERPROPERTY('EngineEdition') AS INT) AS engine_edition,
    CAST(SERVERPROPERTY('Edition') AS VARCHAR(128)) AS edition,
    i.cpu_count,
    i.hyperthread_ratio
FROM sys.configurations c
CROSS JOIN sys.dm_os_sys_info i
WHERE c.name IN ('max server memory (MB)', 'cost threshold for parallelism', 'max degree of parallelism')
ORDER BY c.name
"#;

/// Memory counters; classification happens client side
pub const MEMORY_COUNTERS: &str = r#"
WITH memory_metrics AS (
    SELECT
        MAX(CASE WHEN counter_name = 'Page life expectancy' AND object_name LIKE '%Buffer Node%'
            THEN cntr_value END) AS ple_seconds,
        MAX(CASE WHEN counter_name = 'Memory Grants Pending' AND object_name LIKE '%Memory Manager%'
            THEN cntr_value END) AS grants_pending,
        MAX(CASE WHEN counter_name = 'Target Server Memory (KB)'
            THEN cntr_value / 1024 END) AS target_mb,
        MAX(CASE WHEN counter_name = 'Total Server Memory (KB)'
            THEN cntr_value / 1024 END) AS total_mb
    FROM sys.dm_os_performance_counters
    WHERE counter_name IN ('Page life expectancy', 'Memory Grants Pending',
                           'Target Server Memory (KB)', 'Total Server Memory (KB)')
)
SELECT
    @@SERVERNAME AS server_name,
    CONVERT(VARCHAR, GETDATE(), 120) AS check_timestamp,
    ple_seconds,
    grants_pending AS memory_grants_pending,
    target_mb AS target_memory_mb,
    total_mb AS total_memory_mb,
    (SELECT CAST(value AS INT) FROM sys.configurations WHERE name = 'max server memory (MB)') AS max_server_memory_mb,
    (SELECT committed_kb / 1024 FROM sys.dm_os_sys_info) AS buffer_pool_committed_mb,
    (SELECT committed_target_kb / 1024 FROM sys.dm_os_sys_info) AS buffer_pool_target_mb
FROM memory_metrics
"#;

/// Missing-index candidates for the current database, in DMV form
pub const MISSING_INDEXES: &str = r#"
SELECT
    OBJECT_SCHEMA_NAME(mid.object_id, mid.database_id) + '.' + OBJECT_NAME(mid.object_id, mid.database_id) AS table_name,
    mid.equality_columns,
    mid.inequality_columns,
    mid.included_columns,
    migs.user_seeks,
    migs.user_scans,
    migs.avg_total_user_cost,
    migs.avg_user_impact
FROM sys.dm_db_missing_index_details mid
JOIN sys.dm_db_missing_index_groups mig ON mig.index_handle = mid.index_handle
JOIN sys.dm_db_missing_index_group_stats migs ON migs.group_handle = mig.index_group_handle
WHERE mid.database_id = DB_ID()
"#;

/// Non-clustered user indexes with their usage counters and size
pub const INDEX_USAGE: &str = r#"
SELECT
    OBJECT_SCHEMA_NAME(i.object_id) + '.' + OBJECT_NAME(i.object_id) AS table_name,
    i.name AS index_name,
    ISNULL(MAX(us.user_seeks), 0) AS user_seeks,
    ISNULL(MAX(us.user_scans), 0) AS user_scans,
    ISNULL(MAX(us.user_lookups), 0) AS user_lookups,
    ISNULL(MAX(us.user_updates), 0) AS user_updates,
    CAST(SUM(ps.used_page_count) * 8 / 1024.0 AS DECIMAL(18, 2)) AS size_mb
FROM sys.indexes i
JOIN sys.dm_db_partition_stats ps ON ps.object_id = i.object_id AND ps.index_id = i.index_id
LEFT JOIN sys.dm_db_index_usage_stats us
    ON us.object_id = i.object_id AND us.index_id = i.index_id AND us.database_id = DB_ID()
WHERE OBJECTPROPERTY(i.object_id, 'IsUserTable') = 1
  AND i.type_desc = 'NONCLUSTERED'
  AND i.is_primary_key = 0
  AND i.is_unique_constraint = 0
GROUP BY i.object_id, i.name
ORDER BY user_updates DESC
"#;

/// Statistics of one table; `@P1` is the table name
pub const TABLE_STATISTICS: &str = r#"
SELECT
    OBJECT_SCHEMA_NAME(s.object_id) + '.' + OBJECT_NAME(s.object_id) AS table_name,
    s.name AS stat_name,
    sp.last_updated,
    DATEDIFF(DAY, sp.last_updated, SYSDATETIME()) AS days_since_update,
    sp.rows,
    sp.modification_counter
FROM sys.stats s
OUTER APPLY sys.dm_db_stats_properties(s.object_id, s.stats_id) sp
WHERE s.object_id = OBJECT_ID(@P1)
ORDER BY s.name
"#;
