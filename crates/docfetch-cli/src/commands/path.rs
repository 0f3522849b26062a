use anyhow::Result;
use docfetch::Fetcher;

/// Print where the source is cached and whether an entry exists yet.
pub fn run(fetcher: &dyn Fetcher) -> Result<()> {
    let state = if fetcher.is_cached() { "cached" } else { "missing" };
    println!("{}\t{state}", fetcher.cache_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use docfetch::FetcherConfig;
    use docfetch::test_support::ScriptedFetcher;

    use super::*;

    #[test]
    fn path_does_not_retrieve() {
        let root = tempfile::tempdir().unwrap();
        let config = FetcherConfig::new(root.path(), "https://host.com/x.json");
        let fetcher = ScriptedFetcher::new(config, "body").unwrap();

        run(&fetcher).unwrap();

        assert_eq!(fetcher.retrievals(), 0);
        assert!(!fetcher.is_cached());
    }
}
