use anyhow::Result;
use tokio::sync::watch;
use tokio::time::Duration;

use kobodash::logging::{log, obj, v_str, v_u64, Domain, Level};
use kobodash::pipeline::Dashboard;
use kobodash::scheduler::run_loop;
use kobodash::state::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    cfg.validate()?;

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("form_id", v_str(&cfg.form_id)),
            ("base", v_str(&cfg.base)),
            ("refresh_secs", v_u64(cfg.refresh_secs)),
            (
                "chart_column",
                cfg.chart_column
                    .as_deref()
                    .map(v_str)
                    .unwrap_or(serde_json::Value::Null),
            ),
            ("filtered_columns", v_u64(cfg.filters.columns().count() as u64)),
        ]),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let period = Duration::from_secs(cfg.refresh_secs);
    let mut dash = Dashboard::new(cfg);
    run_loop(&mut dash, period, shutdown_rx).await?;
    Ok(())
}
