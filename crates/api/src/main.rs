use anyhow::Context;
use tracing::info;

use filterjob_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    filterjob_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        pending_job_limit = config.jobs.pending_job_limit,
        output_bucket = config.jobs.output_bucket.as_str(),
        topic = config.jobs.topic.as_str(),
        download_url_template = %config.jobs.download_url_template,
        persistent = config.use_persistent_stores,
        "starting filter job service"
    );

    let (app, services) = filterjob_api::app::build_app(&config).await?;
    let sweeper = services.sweeper.clone().spawn(config.sweep_interval);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    sweeper.shutdown().await;
    info!("shut down");
    Ok(())
}
