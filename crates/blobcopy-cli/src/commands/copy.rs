use anyhow::Result;
use tracing::{info, warn};

use blobcopy_core::{open_store, parse_location, CopyEngine, CopyOptions, RemotesConfig};

/// Exit code for a run that finished but left failed objects behind.
const EXIT_PARTIAL: i32 = 2;
/// Exit code for a run aborted before completion.
const EXIT_ABORTED: i32 = 1;

pub async fn run(
    source: &str,
    dest: &str,
    options: CopyOptions,
    remotes: &RemotesConfig,
) -> Result<i32> {
    let source_location = parse_location(source, remotes)?;
    let dest_location = parse_location(dest, remotes)?;

    let source_store = open_store(&source_location.store)?;
    let dest_store = open_store(&dest_location.store)?;

    info!("Starting copy: {} -> {}", source, dest);

    let engine = CopyEngine::new(
        source_store,
        dest_store,
        source_location.prefix,
        dest_location.prefix,
        options,
    )?;

    // First interrupt requests a clean stop; in-flight uploads are aborted
    // by the engine before it returns.
    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight work settles");
            cancel.cancel();
        }
    });

    let report = engine.run().await?;
    println!("{}", report);

    if report.aborted {
        Ok(EXIT_ABORTED)
    } else if !report.fully_successful() {
        Ok(EXIT_PARTIAL)
    } else {
        Ok(0)
    }
}
