use anyhow::Result;
use futures::StreamExt;

use blobcopy_core::copy::map_key;
use blobcopy_core::diff::{decide, CopyDecision};
use blobcopy_core::list::{enumerate, PAGE_SIZE};
use blobcopy_core::{open_store, parse_location, CopyOptions, RemotesConfig, RunContext};

/// Diff-only dry run: report what a copy would transfer. Mutates nothing.
///
/// Exit code 0 means the stores already agree; 1 means differences exist.
pub async fn run(
    source: &str,
    dest: &str,
    checkers: usize,
    remotes: &RemotesConfig,
) -> Result<i32> {
    let source_location = parse_location(source, remotes)?;
    let dest_location = parse_location(dest, remotes)?;

    let source_store = open_store(&source_location.store)?;
    let dest_store = open_store(&dest_location.store)?;

    let options = CopyOptions {
        checkers,
        ..Default::default()
    };
    let ctx = RunContext::new(&options);

    let source_prefix = source_location.prefix.clone();
    let dest_prefix = dest_location.prefix.clone();

    let entries = enumerate(
        source_store,
        source_location.prefix.clone(),
        PAGE_SIZE,
        ctx.clone(),
    );
    let results = entries
        .map(|entry| {
            let ctx = ctx.clone();
            let dest_store = dest_store.clone();
            let source_prefix = source_prefix.clone();
            let dest_prefix = dest_prefix.clone();
            async move {
                let (key, meta) = entry?;
                let dest_key = map_key(&key, &source_prefix, &dest_prefix);

                let existing = match ctx
                    .remote("stat destination", || {
                        let dest_store = dest_store.clone();
                        let dest_key = dest_key.clone();
                        async move { dest_store.head(dest_key.as_str()).await }
                    })
                    .await
                {
                    Ok(found) => Some(found),
                    Err(e) if e.is_not_found() => None,
                    Err(e) => return Err(e),
                };

                Ok((key, decide(&meta, existing.as_ref())))
            }
        })
        .buffer_unordered(checkers);
    futures::pin_mut!(results);

    let mut to_copy = 0u64;
    let mut identical = 0u64;
    while let Some(result) = results.next().await {
        let (key, decision) = result?;
        match decision {
            CopyDecision::Copy(reason) => {
                println!("would copy {} ({})", key, reason);
                to_copy += 1;
            }
            CopyDecision::Skip => identical += 1,
        }
    }

    println!("{} to copy, {} identical", to_copy, identical);
    Ok(if to_copy > 0 { 1 } else { 0 })
}
