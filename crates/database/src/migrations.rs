use crate::pool::DbPool;

refinery::embed_migrations!("migrations");

/// Apply the embedded SQL migrations on one pooled connection
pub async fn run(pool: &DbPool) -> anyhow::Result<()> {
    let mut client = pool.get().await?;
    let report = migrations::runner()
        .run_async(&mut **client)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;

    for migration in report.applied_migrations() {
        tracing::info!("Applied migration {}", migration);
    }
    Ok(())
}
