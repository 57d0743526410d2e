use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use inquire::Select;

use crate::error::SchedulingError;
use crate::handlers::coordinator::{
    Coordinator, DEFAULT_BLOCKED_HORIZON_DAYS, MAX_BLOCKED_HORIZON_DAYS,
};
use crate::models::agent::{Agent, AgentId};
use crate::models::appointment::Decision;
use crate::models::calendar_event::{CalendarEvent, EventId};
use crate::models::timestamp::parse_timestamp;
use crate::tasks::refresh_loop::{run_refresh_loop, StdoutSink};

#[derive(Parser)]
#[command(about = "Appointment calendar for prestation agents, clients and admins")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the agents that can be assigned
    Agents,
    /// Show the calendar, optionally a single day (YYYY-MM-DD)
    Calendar {
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Assign an agent to a free slot (admin)
    Assign {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        agent: Option<AgentId>,
    },
    /// Move an appointment to another agent (admin)
    Reassign {
        #[arg(long)]
        appointment: String,
        #[arg(long)]
        agent: Option<AgentId>,
    },
    /// Confirm a pending appointment (admin)
    Confirm { appointment: String },
    /// Cancel an appointment (admin)
    Cancel { appointment: String },
    /// Declare your own availability (agent)
    Declare {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Accept, or with --refuse decline, an appointment awaiting you (agent)
    Decide {
        appointment: String,
        #[arg(long)]
        refuse: bool,
    },
    /// Book an availability slot by its event id (client)
    Reserve { slot: String },
    /// Days without any availability, starting today
    BlockedDays {
        #[arg(
            long,
            default_value_t = DEFAULT_BLOCKED_HORIZON_DAYS,
            value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_BLOCKED_HORIZON_DAYS))
        )]
        horizon: u32,
    },
    /// Reload and print the calendar periodically
    Watch,
}

struct AgentChoice<'a>(&'a Agent);

impl fmt::Display for AgentChoice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.email {
            Some(email) => write!(f, "{} <{}> (#{})", self.0.display_name, email, self.0.id),
            None => write!(f, "{} (#{})", self.0.display_name, self.0.id),
        }
    }
}

pub fn render_event(event: &CalendarEvent) -> String {
    let status = event
        .status
        .map(|status| format!(" [{}]", status))
        .unwrap_or_default();
    format!(
        "{id:<24} {start} -> {end}  {kind:<12} {title}{status}",
        id = event.id,
        start = event.start.format("%Y-%m-%d %H:%M"),
        end = event.end.format("%H:%M"),
        kind = event.kind,
        title = event.title,
        status = status,
    )
}

pub async fn cli(coordinator: &mut Coordinator<'_>, command: Commands, refresh_interval: Duration) {
    match command {
        Commands::Agents => {
            for agent in coordinator.agents() {
                println!("{}", AgentChoice(agent));
            }
        }
        Commands::Calendar { day } => {
            let events: Vec<&CalendarEvent> = match day {
                Some(day) => coordinator.events_on(day),
                None => coordinator.events().iter().collect(),
            };
            for event in events {
                println!("{}", render_event(event));
            }
        }
        Commands::Assign { start, end, agent } => {
            let result = assign(coordinator, &start, &end, agent).await;
            if result.is_err() {
                coordinator.cancel_dialog();
            }
            report("assign agent", result);
        }
        Commands::Reassign { appointment, agent } => {
            let result = reassign(coordinator, EventId(appointment), agent).await;
            if result.is_err() {
                coordinator.cancel_dialog();
            }
            report("reassign appointment", result);
        }
        Commands::Confirm { appointment } => {
            let result = coordinator.confirm_appointment(&EventId(appointment)).await;
            report("confirm appointment", result.map(refreshed_note).map_err(Into::into));
        }
        Commands::Cancel { appointment } => {
            let result = coordinator.cancel_appointment(&EventId(appointment)).await;
            report("cancel appointment", result.map(refreshed_note).map_err(Into::into));
        }
        Commands::Declare { start, end } => {
            let result = declare(coordinator, &start, &end).await;
            report("declare availability", result);
        }
        Commands::Decide { appointment, refuse } => {
            let decision = if refuse { Decision::Refuse } else { Decision::Accept };
            let result = coordinator.decide(&EventId(appointment), decision).await;
            report("record decision", result.map(refreshed_note).map_err(Into::into));
        }
        Commands::Reserve { slot } => {
            let result = coordinator.reserve(&EventId(slot)).await;
            report("reserve slot", result.map(refreshed_note).map_err(Into::into));
        }
        Commands::BlockedDays { horizon } => {
            let today = coordinator.session().day_policy.day_of(&Utc::now());
            for day in coordinator.blocked_days(today, horizon) {
                println!("{}", day);
            }
        }
        Commands::Watch => {
            run_refresh_loop(coordinator, &StdoutSink, refresh_interval).await;
        }
    }
}

async fn assign(
    coordinator: &mut Coordinator<'_>,
    start: &str,
    end: &str,
    agent: Option<AgentId>,
) -> Result<String, Box<dyn std::error::Error>> {
    let start = parse_input("start", start, coordinator)?;
    let end = parse_input("end", end, coordinator)?;
    coordinator.select_slot(start, end)?;
    let agent = match agent {
        Some(agent) => agent,
        None => pick_agent(coordinator.agents())?,
    };
    let outcome = coordinator.confirm_assignment(agent).await?;
    Ok(format!("Agent {} assigned on {}{}", outcome.agent_id, outcome.day, refreshed_note(outcome.calendar_refreshed)))
}

async fn reassign(
    coordinator: &mut Coordinator<'_>,
    appointment: EventId,
    agent: Option<AgentId>,
) -> Result<String, Box<dyn std::error::Error>> {
    if !coordinator.select_appointment(&appointment)? {
        return Err(SchedulingError::NotAnAppointment.into());
    }
    let agent = match agent {
        Some(agent) => agent,
        None => pick_agent(coordinator.agents())?,
    };
    let outcome = coordinator.confirm_assignment(agent).await?;
    Ok(format!("Appointment {} now belongs to agent {}{}", appointment, outcome.agent_id, refreshed_note(outcome.calendar_refreshed)))
}

async fn declare(
    coordinator: &mut Coordinator<'_>,
    start: &str,
    end: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let start = parse_input("start", start, coordinator)?;
    let end = parse_input("end", end, coordinator)?;
    let refreshed = coordinator.declare_availability(start, end).await?;
    Ok(format!("Availability saved{}", refreshed_note(refreshed)))
}

fn parse_input(
    field: &'static str,
    value: &str,
    coordinator: &Coordinator<'_>,
) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    Ok(parse_timestamp(field, value, &coordinator.session().day_policy)?)
}

fn pick_agent(agents: &[Agent]) -> Result<AgentId, Box<dyn std::error::Error>> {
    if agents.is_empty() {
        return Err("No agents available".into());
    }
    let choices: Vec<AgentChoice<'_>> = agents.iter().map(AgentChoice).collect();
    let picked = Select::new("Which agent?", choices).prompt()?;
    Ok(picked.0.id)
}

fn refreshed_note(refreshed: bool) -> String {
    if refreshed {
        String::new()
    } else {
        " (calendar not reloaded)".to_string()
    }
}

fn report(action: &str, result: Result<String, Box<dyn std::error::Error>>) {
    match result {
        Ok(message) if message.is_empty() => println!("Done."),
        Ok(message) => println!("{}", message),
        Err(err) => match err.downcast_ref::<SchedulingError>() {
            Some(scheduling) => eprintln!("Failed to {}: {}", action, scheduling.user_message()),
            None => eprintln!("Failed to {}: {}", action, err),
        },
    }
}
