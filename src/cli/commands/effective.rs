//! Effective command - print the current URL for a cache path

use crate::cli::args::DestinationArgs;
use crate::cli::{audited, blocking, open_cache};
use crate::config::Config;
use crate::error::ImagixResult;

/// Execute the effective command
pub async fn execute(args: DestinationArgs, config: &Config) -> ImagixResult<()> {
    let imagix = open_cache(config).await?;
    let requested = args.destination.clone();

    let result = blocking(move || imagix.effective(&args.destination)).await;
    let url = audited(config, "effective", &requested, result).await?;

    println!("{}", url);
    Ok(())
}
