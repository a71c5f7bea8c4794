//! Send command - serve a cache path as a CGI response
//!
//! Writes the `Status:` line, headers and body to stdout. Failures still
//! produce a bodiless status response before the error is reported on
//! stderr, so the web server never sees an empty reply.

use crate::cli::args::SendArgs;
use crate::cli::{audited, blocking, open_cache};
use crate::config::Config;
use crate::error::{ImagixError, ImagixResult};
use crate::response::{CgiResponder, Delivery};
use std::io;
use tracing::debug;

/// Execute the send command
pub async fn execute(args: SendArgs, config: &Config) -> ImagixResult<()> {
    let imagix = open_cache(config).await?;
    let cache_control = config.http.cache_control.clone();
    let requested = args.destination.clone();

    let result = blocking(move || {
        let mut responder = CgiResponder::new(io::stdout().lock())
            .with_if_modified_since(args.if_modified_since)
            .with_cache_control(cache_control);

        match imagix.send(&args.destination, &mut responder) {
            Ok(delivery) => Ok(delivery),
            Err(e) => {
                responder.send_error(error_status(&e))?;
                Err(e)
            }
        }
    })
    .await;

    match audited(config, "send", &requested, result).await? {
        Delivery::Redirect(location) => debug!("Redirected {} to {}", requested, location),
        Delivery::NotModified(path) => debug!("{} not modified", path.display()),
        Delivery::File(path) => debug!("Sent {}", path.display()),
    }
    Ok(())
}

/// HTTP status reported to the client for a failed send
fn error_status(error: &ImagixError) -> u16 {
    match error {
        ImagixError::PathForbidden { .. } => 403,
        ImagixError::MalformedSource(_)
        | ImagixError::MalformedDestination(_)
        | ImagixError::InvalidFormatName(_)
        | ImagixError::FormatNotFound(_)
        | ImagixError::SourceNotFound(_) => 404,
        _ => 500,
    }
}
