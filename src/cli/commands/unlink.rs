//! Unlink command - remove cached variants of one source

use crate::audit::AuditLog;
use crate::cli::args::UnlinkArgs;
use crate::cli::{audited, blocking, open_cache};
use crate::config::Config;
use crate::error::ImagixResult;
use crate::ui::{self, UiContext};

/// Execute the unlink command
pub async fn execute(args: UnlinkArgs, config: &Config) -> ImagixResult<()> {
    let ctx = UiContext::detect();
    let imagix = open_cache(config).await?;
    let UnlinkArgs {
        source,
        format,
        lifetime,
    } = args;

    let result = {
        let (source, format) = (source.clone(), format.clone());
        blocking(move || imagix.unlink(&source, format.as_deref(), lifetime)).await
    };
    let report = audited(config, "unlink", &source, result).await?;

    AuditLog::new(config)
        .cache_removed(Some(&source), format.as_deref(), lifetime, report.count())
        .await;

    ui::step_ok_detail(
        &ctx,
        &format!("Removed {} cached file(s)", report.count()),
        &source,
    );
    Ok(())
}
