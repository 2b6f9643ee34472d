use std::{path::PathBuf, process};

use chrono::{Local, NaiveDate};
use clap::Parser;
use fincontrol_rs_lib::{export_payment_requests, RuleSet, RunParameters};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fincontrol-rs",
    version,
    about = "Builds payment requests from a monthly financial-control report"
)]
struct Cli {
    /// Financial-control report workbook (.xls/.xlsx)
    report: PathBuf,

    /// Business unit code, e.g. 4950
    #[arg(short = 'b', long = "business-unit")]
    business_unit: String,

    /// Personnel number of the person in charge
    #[arg(short = 'p', long = "personnel-number")]
    personnel_number: String,

    /// Directory holding the reference ("НСИ ... общий") workbooks
    #[arg(short = 'r', long = "reference-dir", default_value = ".")]
    reference_dir: PathBuf,

    /// Output file
    #[arg(short = 'o', long = "output", default_value = "payment_requests.csv")]
    output: PathBuf,

    /// Run date (YYYY-MM-DD); the report covers the month before it. Defaults to today.
    #[arg(long = "date")]
    date: Option<NaiveDate>,

    /// JSON file overriding the default business rules
    #[arg(long = "rules")]
    rules: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let rules = match &cli.rules {
        None => RuleSet::default(),
        Some(path) => match RuleSet::from_json_file(path) {
            Ok(rules) => rules,
            Err(e) => {
                eprintln!("an error occurred: {}", e);
                process::exit(1);
            }
        },
    };

    let params = RunParameters {
        report_path: cli.report,
        business_unit: cli.business_unit,
        personnel_number: cli.personnel_number,
        reference_dir: cli.reference_dir,
        output_path: cli.output,
        run_date: cli.date.unwrap_or_else(|| Local::now().date_naive()),
        rules,
    };

    match export_payment_requests(&params) {
        Ok(count) => {
            println!("{} payment requests written to {}", count, params.output_path.display());
            process::exit(0);
        }
        Err(e) => {
            eprintln!("an error occurred: {}", e);
            process::exit(1);
        }
    }
}
