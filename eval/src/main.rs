mod answer;
mod cli;
mod config;
mod dataset;
mod metrics;
mod report;
mod run;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::run::RunArgs;

fn main() -> Result<()> {
    harness::logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            dataset,
            data,
            policy,
            config,
            output,
            limit,
        } => {
            let config = config::load_config(&config)?;
            let report = run::run_dataset(&RunArgs {
                kind: dataset,
                data,
                policy: policy.into(),
                config,
                output,
                limit,
            })?;
            print_report(&report);
            Ok(())
        }
        Commands::Report { file } => {
            let report = report::report_from_trace(&file)?;
            print_report(&report);
            Ok(())
        }
    }
}

fn print_report(report: &metrics::MetricsReport) {
    println!("instances:    {}", report.instances);
    println!("acc_default:  {:.4}", report.acc_default);
    println!("acc_revised:  {:.4}", report.acc_revised);
    match report.improve_rate {
        Some(rate) => println!("improve_rate: {rate:.4}"),
        None => println!("improve_rate: n/a"),
    }
    match report.worse_rate {
        Some(rate) => println!("worse_rate:   {rate:.4}"),
        None => println!("worse_rate:   n/a"),
    }
}
