use anyhow::{Context, Result};
use docfetch::Fetcher;

pub async fn run(fetcher: &dyn Fetcher) -> Result<()> {
    let path = fetcher
        .obtain()
        .await
        .with_context(|| format!("could not obtain {}", fetcher.descriptor()))?;
    println!("{}", path.display());
    Ok(())
}
