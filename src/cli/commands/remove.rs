//! Remove command - sweep cached variants across the whole cache

use crate::audit::AuditLog;
use crate::cli::args::RemoveArgs;
use crate::cli::{blocking, open_cache};
use crate::config::Config;
use crate::error::ImagixResult;
use crate::ui::{self, UiContext};
use std::sync::Arc;

/// Execute the remove command
pub async fn execute(args: RemoveArgs, config: &Config) -> ImagixResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let imagix = Arc::new(open_cache(config).await?);
    let lifetime = args.lifetime.or_else(|| config.default_lifetime());
    let format = args.format;

    let planned = {
        let (imagix, format) = (Arc::clone(&imagix), format.clone());
        blocking(move || imagix.plan_remove(format.as_deref(), lifetime)).await?
    };

    if planned.is_empty() {
        ui::step_info(&ctx, "Nothing to remove");
        return Ok(());
    }

    let clears_everything = format.is_none() && lifetime.map_or(true, |l| l.is_zero());

    if args.dry_run {
        ui::section(&ctx, &format!("Would remove {} entries:", planned.len()));
        for path in &planned {
            ui::remark(&ctx, &path.display().to_string());
        }
        return Ok(());
    }

    if clears_everything {
        let prompt = format!(
            "Remove everything under {}?",
            imagix.destination_root().display()
        );
        if !ui::confirm(&ctx, &prompt, false).await? {
            ui::step_warn_hint(&ctx, "Nothing removed", "Pass --yes to skip the prompt");
            return Ok(());
        }
    }

    let report = {
        let (imagix, format) = (Arc::clone(&imagix), format.clone());
        blocking(move || imagix.remove(format.as_deref(), lifetime)).await?
    };

    AuditLog::new(config)
        .cache_removed(None, format.as_deref(), lifetime, report.count())
        .await;

    ui::step_ok(&ctx, &format!("Removed {} entries", report.count()));
    Ok(())
}
