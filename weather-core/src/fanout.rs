//! Concurrent per-day retrieval over a date range.
//!
//! One task is spawned per day. The caller waits for every task before deciding the
//! outcome: any failure fails the whole range, and the failure reported is the one for
//! the earliest day, so concurrent failures always surface the same error.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::{
    date::{DateRange, Day},
    error::FetchError,
    gateway::ResourceGateway,
    model::{Resource, Temperature, Weather, WindSpeed},
};

/// Fetch one resource per day of `range` and return them ordered by date.
pub async fn fetch_range<G>(
    gateway: &Arc<G>,
    range: DateRange,
) -> Result<Vec<G::Resource>, FetchError>
where
    G: ResourceGateway + ?Sized + 'static,
{
    let mut tasks = JoinSet::new();
    let mut days = HashMap::with_capacity(range.len());

    for day in range.days() {
        let gateway = Arc::clone(gateway);
        let handle = tasks.spawn(async move { (day, gateway.fetch_at(day).await) });
        days.insert(handle.id(), day);
    }
    debug!(start = %range.start, end = %range.end, tasks = days.len(), "fan-out started");

    let mut resources = Vec::with_capacity(days.len());
    let mut failure = FirstFailure::default();

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, (_, Ok(resource)))) => resources.push(resource),
            Ok((_, (day, Err(err)))) => {
                error!(%day, kind = %err.kind, message = %err.message, "fetch failed");
                failure.record(day, err);
            }
            Err(join_err) => {
                let Some(&day) = days.get(&join_err.id()) else {
                    continue;
                };
                error!(%day, error = %join_err, "fetch task did not complete");
                failure.record(day, FetchError::internal(format!("Fetch task failed: {join_err}")));
            }
        }
    }

    if let Some(err) = failure.into_error() {
        return Err(err);
    }

    resources.sort_by(|a, b| a.date().cmp(b.date()));
    Ok(resources)
}

/// Fetch temperatures and wind speeds over the same range and join them by date.
///
/// Both fan-outs run concurrently and both must succeed. When both fail the
/// temperature error is reported.
pub async fn fetch_weather<T, W>(
    temperatures: &Arc<T>,
    speeds: &Arc<W>,
    range: DateRange,
) -> Result<Vec<Weather>, FetchError>
where
    T: ResourceGateway<Resource = Temperature> + ?Sized + 'static,
    W: ResourceGateway<Resource = WindSpeed> + ?Sized + 'static,
{
    let (temperatures, speeds) =
        tokio::join!(fetch_range(temperatures, range), fetch_range(speeds, range));

    Ok(merge_by_date(&temperatures?, &speeds?))
}

/// Join records by date. A date present on one side only keeps zeroes for the other.
pub fn merge_by_date(temperatures: &[Temperature], speeds: &[WindSpeed]) -> Vec<Weather> {
    let mut merged: BTreeMap<&str, Weather> = BTreeMap::new();

    for temperature in temperatures {
        merged
            .entry(temperature.date())
            .or_insert_with(|| Weather::empty(temperature.date()))
            .apply_temperature(temperature);
    }
    for speed in speeds {
        merged
            .entry(speed.date())
            .or_insert_with(|| Weather::empty(speed.date()))
            .apply_wind_speed(speed);
    }

    merged.into_values().collect()
}

#[derive(Default)]
struct FirstFailure(Option<(Day, FetchError)>);

impl FirstFailure {
    fn record(&mut self, day: Day, err: FetchError) {
        match &self.0 {
            Some((seen, _)) if *seen <= day => {}
            _ => self.0 = Some((day, err)),
        }
    }

    fn into_error(self) -> Option<FetchError> {
        self.0.map(|(_, err)| err)
    }
}
