//! Formats command - list configured formats

use crate::cli::args::{FormatsArgs, OutputFormat};
use crate::config::Config;
use crate::error::ImagixResult;
use console::style;

/// Execute the formats command
pub async fn execute(args: FormatsArgs, config: &Config) -> ImagixResult<()> {
    // Building the registry validates every name and recipe
    let registry = config.format_registry()?;

    if registry.is_empty() {
        println!("No formats configured.");
        return Ok(());
    }

    match args.output {
        OutputFormat::Table => print_table(config),
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Plain => {
            for name in registry.names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn print_table(config: &Config) {
    println!("{:<20} {}", "FORMAT", "RECIPE");
    println!("{}", "-".repeat(60));

    for (name, recipe) in &config.formats {
        println!("{:<20} {}", style(name).cyan(), recipe);
    }

    println!();
    println!("Total: {} format(s)", config.formats.len());
}

fn print_json(config: &Config) -> ImagixResult<()> {
    #[derive(serde::Serialize)]
    struct FormatJson<'a> {
        name: &'a str,
        recipe: String,
        ops: &'a [crate::format::Operation],
    }

    let formats: Vec<FormatJson<'_>> = config
        .formats
        .iter()
        .map(|(name, recipe)| FormatJson {
            name,
            recipe: recipe.to_string(),
            ops: &recipe.ops,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&formats)?);
    Ok(())
}
