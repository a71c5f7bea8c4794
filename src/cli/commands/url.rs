//! Url command - print the cache URL for a source image

use crate::cli::args::UrlArgs;
use crate::cli::{audited, blocking, open_cache};
use crate::config::Config;
use crate::error::ImagixResult;

/// Execute the url command
pub async fn execute(args: UrlArgs, config: &Config) -> ImagixResult<()> {
    let imagix = open_cache(config).await?;
    let requested = args.source.clone();

    let result = blocking(move || imagix.url(&args.source, &args.format)).await;
    let url = audited(config, "url", &requested, result).await?;

    println!("{}", url);
    Ok(())
}
