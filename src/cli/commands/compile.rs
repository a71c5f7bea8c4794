//! Compile command - generate a derivative on demand

use crate::cli::args::DestinationArgs;
use crate::cli::{audited, blocking, open_cache};
use crate::config::Config;
use crate::error::ImagixResult;
use tracing::info;

/// Execute the compile command
pub async fn execute(args: DestinationArgs, config: &Config) -> ImagixResult<()> {
    let imagix = open_cache(config).await?;
    let requested = args.destination.clone();

    let result = blocking(move || imagix.compile(&args.destination)).await;
    let path = audited(config, "compile", &requested, result).await?;

    info!("Compiled {}", requested);
    println!("{}", path.display());
    Ok(())
}
