mod data;
mod prompt;
mod report;
mod stats;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use data::error::DataError;
use data::filter::{apply_filter, City, DaySelector, MonthSelector};
use data::loader;
use prompt::{Preset, Prompter};
use stats::TripStats;

#[derive(Parser)]
#[command(name = "bikeshare-explorer")]
#[command(about = "Explore US bikeshare trip data: popular times, stations, trip durations and riders")]
#[command(version)]
struct Cli {
    /// Directory holding chicago, new_york_city and washington data files
    #[arg(short = 'D', long, env = "BIKESHARE_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// City to analyze (chicago, new york city, washington)
    #[arg(short, long)]
    city: Option<City>,

    /// Month to filter by (january - june, or all)
    #[arg(short, long)]
    month: Option<MonthSelector>,

    /// Day of week to filter by (sunday - saturday, or all)
    #[arg(short, long)]
    day: Option<DaySelector>,

    /// Print statistics as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        if e.downcast_ref::<DataError>().is_some_and(DataError::is_unavailable) {
            eprintln!(
                "Point --data-dir (or BIKESHARE_DATA_DIR) at the city files, or create sample ones with `generate_sample`."
            );
        }
        std::process::exit(1);
    }
}

/// One pass per city/month/day selection. Runs once when every selector was
/// given on the command line, otherwise until the user declines to restart.
fn run(cli: &Cli) -> Result<()> {
    let preset = Preset {
        city: cli.city,
        month: cli.month,
        day: cli.day,
    };
    let fixed = preset.complete();
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout().lock());

    loop {
        let spec = match fixed {
            Some(spec) => spec,
            None => prompter.get_filters(&preset)?,
        };

        let table = loader::load_city(&cli.data_dir, spec.city)
            .with_context(|| format!("loading {} data", spec.city))?;
        let filtered = apply_filter(&table, &spec);

        if cli.json {
            report::write_json(prompter.output(), &TripStats::compute(&filtered, spec))?;
        } else {
            report::render_report(prompter.output(), &filtered, &spec)?;
        }
        prompter.output().flush().context("flushing output")?;

        if fixed.is_some() {
            return Ok(());
        }
        prompter.view_raw_data(&filtered)?;
        if !prompter.confirm("\nWould you like to restart? Enter 'yes' or 'no'.\n")? {
            return Ok(());
        }
    }
}
