use anyhow::Context;
use clap::Parser;
use fuel_price::cli::{Args, OutputFormat};
use fuel_price::fetcher::{PriceSource, RacqClient};
use fuel_price::model::Reading;
use fuel_price::notifier::{Notifier, WebhookNotifier};
use fuel_price::pipeline;
use fuel_price::statistics::{Statistics, compute_statistics};
use fuel_price::store::CsvStore;

fn print_line(output: OutputFormat, reading: &Reading, stats: &Statistics) {
    match output {
        OutputFormat::Raw => println!("{}", reading.to_line()),
        OutputFormat::Stats => println!("{}", stats.to_line(&reading.timestamp)),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Error)
        .filter_module("fuel_price", args.log.filter())
        .init();
    log::debug!("started..");

    let client = RacqClient::new(args.endpoint.as_str())?;
    let request = args.request();

    let Some(log_dir) = args.log_dir.as_ref() else {
        let reading = client.fetch(&request)?;
        let stats = compute_statistics(&reading)?;
        print_line(args.output, &reading, &stats);
        return Ok(());
    };

    let store = CsvStore::new(log_dir);
    let notifier = args
        .webhook_url
        .as_deref()
        .map(WebhookNotifier::new)
        .transpose()?;

    let report = pipeline::run(
        &client,
        &store,
        notifier.as_ref().map(|n| n as &dyn Notifier),
        &request,
    )
    .with_context(|| format!("run failed for {}", log_dir.display()))?;

    print_line(args.output, &report.reading, &report.stats);
    if report.change.increased {
        log::warn!(
            "price increased ({:?}), notified={}",
            report.change.causes,
            report.notified
        );
    }
    Ok(())
}
