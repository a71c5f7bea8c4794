//! Source command - decode a cache URL

use crate::cli::args::DestinationArgs;
use crate::cli::{blocking, open_cache};
use crate::config::Config;
use crate::error::ImagixResult;

/// Execute the source command
///
/// Prints `source<TAB>format`.
pub async fn execute(args: DestinationArgs, config: &Config) -> ImagixResult<()> {
    let imagix = open_cache(config).await?;
    let (source, format) = blocking(move || imagix.source(&args.destination)).await?;

    println!("{}\t{}", source, format);
    Ok(())
}
