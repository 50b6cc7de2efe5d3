use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use climon_service::alert::RiskPolicy;
use climon_service::config::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use climon_service::ingest::tables::parse_date;
use climon_service::logging::{self, Source};
use climon_service::variables::{DEFAULT_VARIABLE, NUMERIC_SCALE, VARIABLE_REGISTRY};
use climon_service::{Config, DashboardContext, export};

/// Climate risk classification for the northern-region municipal dashboard
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List forecast dates
    Dates,
    /// List map variables and their palettes
    Variables,
    /// Export the classified table as CSV ('-' for stdout)
    Classify { out: String },
    /// Export one map layer as GeoJSON ('-' for stdout)
    Render {
        variable: String,
        date: String,
        out: String,
    },
}

fn open_output(path: &str) -> io::Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(io::stdout().lock()))
    } else {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

fn print_variables() {
    for variable in VARIABLE_REGISTRY {
        let marker = if variable.id == DEFAULT_VARIABLE { "*" } else { " " };
        let colors = match variable.palette(RiskPolicy::default()) {
            Some(palette) if variable.is_categorical() => palette
                .iter()
                .map(|e| format!("{}={}", e.label, e.color))
                .collect::<Vec<_>>()
                .join(", "),
            _ => format!("scale={}", NUMERIC_SCALE),
        };
        println!("{} {:<20} {:<30} {}", marker, variable.id, variable.label, colors);
    }
}

/// Reads the configuration, starts logging and loads every input.
fn load_context(config_path: &Path) -> Result<DashboardContext, Box<dyn Error>> {
    let config = Config::load(config_path)?;
    logging::init_logger(
        config.logging.level,
        config.log_file_path().as_deref(),
        config.logging.timestamps,
    );
    logging::debug(
        Source::Config,
        None,
        &format!("using {}", config_path.display()),
    );
    Ok(DashboardContext::load(&config)?)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Variables => print_variables(),
        Command::Dates => {
            let context = load_context(&cli.config)?;
            for date in context.dates() {
                println!("{}", date.format("%Y-%m-%d"));
            }
        }
        Command::Classify { out } => {
            let context = load_context(&cli.config)?;
            let rows = context.classified();
            export::write_classified_csv(&rows, open_output(&out)?)?;
            logging::info(
                Source::System,
                None,
                &format!("wrote {} classified rows to {}", rows.len(), out),
            );
        }
        Command::Render { variable, date, out } => {
            let date = parse_date(&date).ok_or_else(|| format!("cannot parse date '{}'", date))?;
            let context = load_context(&cli.config)?;
            let layer = context.layer(&variable, date)?;
            export::write_layer_geojson(&layer, open_output(&out)?)?;
            logging::info(
                Source::System,
                None,
                &format!(
                    "wrote {} features for '{}' on {} to {}",
                    layer.entries.len(),
                    variable,
                    date,
                    out
                ),
            );
        }
    }
    Ok(())
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_arguments_parse() {
        let cli = Cli::try_parse_from([
            "climon_service",
            "--config",
            "dados/climon.toml",
            "render",
            "heat_class",
            "2025-01-10",
            "-",
        ])
        .expect("render command should parse");
        assert_eq!(cli.config, PathBuf::from("dados/climon.toml"));
        match cli.command {
            Command::Render { variable, date, out } => {
                assert_eq!(variable, "heat_class");
                assert_eq!(date, "2025-01-10");
                assert_eq!(out, "-");
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["climon_service", "-c", "x.toml"]).is_err());
        assert!(Cli::try_parse_from(["climon_service", "classify"]).is_err(), "classify needs OUT");
    }
}
