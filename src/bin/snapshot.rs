//! One-shot snapshot: fetch once, render the summary, write the CSV/XLSX
//! export files. The download path of the dashboard without the loop.

use anyhow::{bail, Result};

use kobodash::pipeline::{CycleOutcome, Dashboard};
use kobodash::state::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cfg = Config::from_env();
    cfg.validate()?;
    if cfg.export_dir.is_none() {
        cfg.export_dir = Some(".".to_string());
    }

    let mut dash = Dashboard::new(cfg);
    match dash.run_cycle().await {
        CycleOutcome::Rendered(_) => Ok(()),
        CycleOutcome::Empty => Ok(()),
        CycleOutcome::Failed(err) => bail!(err),
    }
}
