use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use crate::error::SchedulingError;
use crate::handlers::coordinator::Coordinator;
use crate::models::calendar_event::CalendarEvent;

/// Where a freshly reloaded calendar goes.
#[async_trait]
pub trait CalendarSink: Send + Sync {
    async fn publish(&self, events: &[CalendarEvent]) -> Result<(), String>;
}

pub struct StdoutSink;

#[async_trait]
impl CalendarSink for StdoutSink {
    async fn publish(&self, events: &[CalendarEvent]) -> Result<(), String> {
        println!("--- {} event(s) ---", events.len());
        for event in events {
            println!("{}", crate::cli::render_event(event));
        }
        Ok(())
    }
}

/// Reloads forever. Each reload waits for the previous one, so two reloads of
/// the same coordinator never overlap.
pub async fn run_refresh_loop<S: CalendarSink + ?Sized>(
    coordinator: &mut Coordinator<'_>,
    sink: &S,
    interval: Duration,
) {
    loop {
        if let Err(err) = refresh_tick(coordinator, sink).await {
            warn!(error = %err, "Calendar refresh failed, retrying next tick");
        }
        sleep(interval).await;
    }
}

pub async fn refresh_tick<S: CalendarSink + ?Sized>(
    coordinator: &mut Coordinator<'_>,
    sink: &S,
) -> Result<usize, SchedulingError> {
    let events = coordinator.load_calendar().await?;
    let count = events.len();
    if let Err(err) = sink.publish(events).await {
        warn!(error = %err, "Calendar sink rejected update");
    }
    Ok(count)
}
