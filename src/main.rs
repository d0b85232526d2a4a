use anyhow::{Context, Result};
use clap::Parser;
use diffmap::cli::{Cli, Commands, OutputFormat};
use diffmap::config::DiffConfig;
use std::fs;
use std::io::Write;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Diff {
            before,
            after,
            format,
            output,
            function,
            no_fuzzy,
            config,
        } => {
            let mut diff_config = match &config {
                Some(path) => DiffConfig::load(path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => DiffConfig::default(),
            };
            if no_fuzzy {
                diff_config.fuzzy_matching = false;
            }
            if function.is_some() {
                diff_config.function_filter = function;
            }

            let before_source = fs::read_to_string(&before)
                .with_context(|| format!("reading {}", before.display()))?;
            let after_source = fs::read_to_string(&after)
                .with_context(|| format!("reading {}", after.display()))?;

            let report = diffmap::diff_sources(
                &before_source,
                &after_source,
                &before,
                &after,
                &diff_config,
            )?;

            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(fs::File::create(path)?),
                None => Box::new(std::io::stdout()),
            };
            match format {
                OutputFormat::Json => diffmap::output::write_json(&report, &mut writer)?,
                OutputFormat::Terminal => diffmap::output::write_terminal(&report, &mut writer)?,
            }
            Ok(())
        }
    }
}
