use std::{io::stdout, process::ExitCode};

use anyhow::{Context, Result};
use atitweak::{
    adl::Adl, arg_parser::ArgsOptions, commands, config::Config, logger, session,
};
use tracing::{debug, warn};

fn main() -> ExitCode {
    // Parse the command line arguments
    let args_options = ArgsOptions::parse();

    match run(&args_options) {
        Ok(code) => code,
        Err(err) => {
            println!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args_options: &ArgsOptions) -> Result<ExitCode> {
    let config = Config::load(args_options.config_file_path.as_deref())
        .with_context(|| "Failed to load the configuration")?;

    logger::init_logging(config.log_level.as_deref());

    for warning in config.warnings() {
        warn!("{warning}");
    }

    // Nothing to do, show the usage without touching the driver
    let Some(command) = args_options.command(&config)? else {
        print!("{}", args_options.usage());
        return Ok(ExitCode::SUCCESS);
    };

    debug!("Running {command:?}");

    let adl = Adl::load(&config.library_paths)?;

    let outcome = session::with_session(&adl, |session| {
        commands::execute(session, &command, &mut stdout().lock())
    });

    for err in outcome.errors() {
        println!("{err}");
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
