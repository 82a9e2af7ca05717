use clap::Parser;
use std::process::ExitCode;
use tracing::{error, warn};

use mkv2dv8::{
    cli::{handle_commands, CliArgs},
    config::{Config, ThrottleProfile},
    processing::Pipeline,
    utils::{setup_logging, Error, Result},
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                error!("{}", e);
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: &CliArgs) -> Result<()> {
    let mut config = Config::load_with_fallback(&args.config)?;
    config.apply_process_env()?;
    args.apply_overrides(&mut config)?;
    config.validate()?;

    setup_logging(
        args.get_log_level(&config.logging.level),
        config.logging.show_timestamps,
        config.logging.colored_output && args.should_use_color(),
    )?;

    if handle_commands(args, &config).await? {
        return Ok(());
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| Error::input("An input MKV is required"))?;

    let throttle = ThrottleProfile::detect(config.pipeline.speed_mode);
    let pipeline = Pipeline::new(config, throttle);

    tokio::select! {
        result = pipeline.run(input, args.basename.as_deref()) => result.map(|_| ()),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping tools and cleaning up");
            Err(Error::Interrupted)
        }
    }
}
