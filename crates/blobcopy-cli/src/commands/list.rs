use anyhow::Result;
use futures::StreamExt;

use blobcopy_core::list::{enumerate, PAGE_SIZE};
use blobcopy_core::{open_store, parse_location, CopyOptions, RemotesConfig, RunContext};

pub async fn run(target: &str, remotes: &RemotesConfig) -> Result<()> {
    let location = parse_location(target, remotes)?;
    let store = open_store(&location.store)?;
    let ctx = RunContext::new(&CopyOptions::default());

    let entries = enumerate(store, location.prefix, PAGE_SIZE, ctx);
    futures::pin_mut!(entries);

    let mut count = 0u64;
    let mut total_bytes = 0u64;
    while let Some(entry) = entries.next().await {
        let (key, meta) = entry?;
        println!("{:>14} {}", meta.size, key);
        count += 1;
        total_bytes += meta.size;
    }

    println!("{} objects, {} bytes", count, total_bytes);
    Ok(())
}
