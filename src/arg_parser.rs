use std::{
    io::{Write, stderr, stdout},
    path::PathBuf,
    process,
};

use anyhow::Result;
use argparse::{ArgumentParser, Print, Store, StoreOption, StoreTrue};

use crate::{
    commands::{Action, Command},
    config::Config,
    performance::LevelSettings,
    selection::{ALL, Selection},
};

const PROGRAM_NAME: &str = "atitweak";

#[derive(Debug)]
pub struct ArgsOptions {
    pub list_adapters: bool,

    // Set mode values, clocks in MHz and voltage in VDC
    pub engine_clock: Option<f64>,
    pub memory_clock: Option<f64>,
    pub core_voltage: Option<f64>,

    pub adapters: String,
    pub performance_levels: String,

    pub profile: Option<String>,
    pub config_file_path: Option<PathBuf>,

    usage: String,
}

impl ArgsOptions {
    // Parse the process arguments, exit on error, `--help` or `--version`
    pub fn parse() -> Self {
        let args = std::env::args().collect();

        Self::parse_from(args, &mut stdout(), &mut stderr())
            .unwrap_or_else(|code| process::exit(code))
    }

    // Parse `args` (program name first), the error is the exit code
    pub fn parse_from(
        args: Vec<String>,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> std::result::Result<Self, i32> {
        let mut options = ArgsOptions::default();
        let mut usage = Vec::new();

        {
            let mut parser = ArgumentParser::new();
            parser.set_description(
                "List the AMD display adapters and tweak the clocks and \
                 voltage of their performance levels.",
            );

            parser.refer(&mut options.list_adapters).add_option(
                &["-l", "--list-adapters"],
                StoreTrue,
                "Lists all detected and supported display adapters.",
            );

            parser.refer(&mut options.engine_clock).add_option(
                &["-e", "--set-engine-clock"],
                StoreOption,
                "Sets engine clock speed (in MHz) for the selected performance \
                 levels on the selected adapters.",
            );
            parser.refer(&mut options.memory_clock).add_option(
                &["-m", "--set-memory-clock"],
                StoreOption,
                "Sets memory clock speed (in MHz) for the selected performance \
                 levels on the selected adapters.",
            );
            parser.refer(&mut options.core_voltage).add_option(
                &["-v", "--set-core-voltage"],
                StoreOption,
                "Sets core voltage level (in VDC) for the selected performance \
                 levels on the selected adapters.",
            );

            parser
                .refer(&mut options.adapters)
                .add_option(
                    &["-A", "--adapter"],
                    Store,
                    "Comma-separated indices of the adapters shown by \
                     --list-adapters to act on, or \"all\" (default).",
                )
                .metavar("ADAPTERLIST");
            parser
                .refer(&mut options.performance_levels)
                .add_option(
                    &["-P", "--performance-level"],
                    Store,
                    "Comma-separated indices of the performance levels shown by \
                     --list-adapters to act on, or \"all\" (default).",
                )
                .metavar("PERFORMANCELEVELLIST");

            parser
                .refer(&mut options.profile)
                .add_option(
                    &["-p", "--profile"],
                    StoreOption,
                    "Applies the values of a profile from the configuration file, \
                     explicit --set-* options take precedence.",
                )
                .metavar("NAME");

            // Configuration file path
            parser
                .refer(&mut options.config_file_path)
                .add_option(
                    &["-c", "--config"],
                    StoreOption,
                    "The file path of the configuration file",
                )
                .metavar("PATH");

            // Show the version
            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the program version",
            );

            parser.parse(args, out, err)?;

            parser
                .print_help(PROGRAM_NAME, &mut usage)
                .map_err(|_| 1)?;
        }

        options.usage = String::from_utf8_lossy(&usage).into_owned();

        Ok(options)
    }

    // Usage text printed when there is nothing to do
    pub fn usage(&self) -> &str {
        &self.usage
    }

    // Resolve what to run, `None` when only the usage should be printed.
    //
    // Selections and values are validated here, before any native call.
    pub fn command(&self, config: &Config) -> Result<Option<Command>> {
        let adapters = Selection::parse("adapter list", &self.adapters)?;
        let levels = Selection::parse("performance level list", &self.performance_levels)?;

        let mut settings = LevelSettings::from_user_values(
            self.engine_clock,
            self.memory_clock,
            self.core_voltage,
        )?;

        if let Some(name) = &self.profile {
            settings = settings.or(config.profile(name)?.settings()?);
        }

        let action = if self.list_adapters {
            Action::List
        } else if !settings.is_empty() {
            Action::Set(settings)
        } else {
            return Ok(None);
        };

        Ok(Some(Command {
            action,
            adapters,
            levels,
        }))
    }
}

impl Default for ArgsOptions {
    fn default() -> Self {
        Self {
            list_adapters: false,

            engine_clock: None,
            memory_clock: None,
            core_voltage: None,

            adapters: ALL.to_string(),
            performance_levels: ALL.to_string(),

            profile: None,
            config_file_path: None,

            usage: String::new(),
        }
    }
}
