use crate::detector::{PriceChange, detect_price_increase};
use crate::error::{FuelError, Result};
use crate::fetcher::{PriceRequest, PriceSource};
use crate::model::Reading;
use crate::notifier::Notifier;
use crate::statistics::{Statistics, compute_statistics};
use crate::store::{CsvStore, Snapshot};

/// Outcome of one fetch-and-compare run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub reading: Reading,
    pub stats: Statistics,
    pub previous: Option<Statistics>,
    pub change: PriceChange,
    pub notified: bool,
}

/// fetch → stats → append → rotate → read previous → stats → detect → notify
pub fn run(
    source: &dyn PriceSource,
    store: &CsvStore,
    notifier: Option<&dyn Notifier>,
    request: &PriceRequest,
) -> Result<RunReport> {
    let reading = source.fetch(request)?;
    let stats = compute_statistics(&reading)?;
    log::info!("current: {}", stats.to_line(&reading.timestamp));

    let previous = {
        let _lock = store.lock()?;
        store.append_reading(&reading)?;
        store.rotate_snapshot(&reading)?;
        match store.read_snapshot(Snapshot::Previous) {
            Ok(previous) => Some(previous),
            Err(FuelError::NotFound(path)) => {
                log::info!("no previous snapshot at {}, first run", path.display());
                None
            }
            Err(err) => return Err(err),
        }
    };

    let Some(previous) = previous else {
        return Ok(RunReport {
            reading,
            stats,
            previous: None,
            change: PriceChange::default(),
            notified: false,
        });
    };

    let previous_stats = compute_statistics(&previous)?;
    let change = detect_price_increase(&previous_stats, &stats);

    let mut notified = false;
    if change.increased {
        log::info!("price up: {:?}", change.causes);
        if let Some(notifier) = notifier {
            match notifier.notify(&change.message(&previous_stats, &stats)) {
                Ok(()) => notified = true,
                Err(err) => log::warn!("{}", err),
            }
        }
    }

    Ok(RunReport {
        reading,
        stats,
        previous: Some(previous_stats),
        change,
        notified,
    })
}
