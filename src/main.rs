#![allow(non_snake_case)]

use clap::Parser;

use prestationCalendar::cli::{self, Cli};
use prestationCalendar::config::AppConfig;
use prestationCalendar::handlers::coordinator::Coordinator;
use prestationCalendar::runtime;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}; falling back to environment", err);
            AppConfig::default()
        }
    };
    runtime::init_tracing(&config.log_filter());

    let refresh_interval = match config.refresh_interval() {
        Ok(interval) => interval,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };
    let (session, backend) = match runtime::connect(&config) {
        Ok(connected) => connected,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };

    let mut coordinator = Coordinator::new(&session, backend);
    if let Err(err) = coordinator.initialize().await {
        eprintln!("Failed to load calendar: {}", err.user_message());
    }
    cli::cli(&mut coordinator, args.command, refresh_interval).await;
}
