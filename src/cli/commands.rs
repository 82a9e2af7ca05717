use crate::{
    cli::CliArgs,
    config::Config,
    processing::{tool_report, ToolStatus},
    utils::{Error, Result},
};
use console::style;

/// Runs informational commands. Returns `true` when one ran and the
/// conversion should be skipped.
pub async fn handle_commands(args: &CliArgs, config: &Config) -> Result<bool> {
    if args.check_tools {
        check_tools(config).await?;
        return Ok(true);
    }

    Ok(false)
}

async fn check_tools(config: &Config) -> Result<()> {
    let report = tool_report(&config.tools).await;

    println!("External tools:");
    println!("{:-<80}", "");
    println!("{:<12} {:<10} {:<28} {}", "Tool", "Status", "Path", "Version");
    println!("{:-<80}", "");
    for status in &report {
        println!("{}", format_status(status));
    }
    println!("{:-<80}", "");

    match report.iter().find(|s| s.required && s.resolved.is_none()) {
        Some(missing) => Err(Error::dependency_missing(
            missing.name,
            format!("'{}' not found", missing.configured),
        )),
        None => Ok(()),
    }
}

fn format_status(status: &ToolStatus) -> String {
    let state = match (&status.resolved, status.required) {
        (Some(_), _) => style("found").green().to_string(),
        (None, true) => style("MISSING").red().bold().to_string(),
        (None, false) => style("optional").yellow().to_string(),
    };
    let path = status
        .resolved
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| status.configured.clone());

    format!(
        "{:<12} {:<10} {:<28} {}",
        status.name,
        state,
        truncate(&path, 28),
        status.version.as_deref().unwrap_or("-")
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width - 3).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
