use std::io::Write;

use anyhow::{Context, Result};
use docfetch::Fetcher;

pub async fn run(fetcher: &dyn Fetcher) -> Result<()> {
    let bytes = fetcher
        .get_raw()
        .await
        .with_context(|| format!("could not obtain {}", fetcher.descriptor()))?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&bytes)
        .and_then(|()| stdout.flush())
        .context("failed to write to stdout")
}
