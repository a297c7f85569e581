//! Lifeline CLI
//!
//! Thin host around the Lifeline core: wires simulated transports and a
//! fixed location provider to the coordinator so the alert pipeline can be
//! exercised from a terminal.
//!
//! # Usage
//! ```bash
//! lifeline nearby --lat 16.31 --lon 80.44 -k 3
//! lifeline simulate --sender 911 --message "EMERGENCY: crash detected"
//! lifeline contacts
//! lifeline events
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use lifeline_core::config::CoreConfig;
use lifeline_core::coordinator::AlertCoordinator;
use lifeline_core::dispatch::{Dispatcher, LoggingChannel, LoggingMessenger};
use lifeline_core::geo::{Coordinates, GeoIndex, ServiceCategory};
use lifeline_core::location::FixedLocationProvider;
use lifeline_core::store::FileStore;
use lifeline_core::trigger::InboundMessage;

/// Lifeline - automated emergency response coordination
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory for persisted contacts, rules and the event log
    #[arg(long, default_value = ".lifeline")]
    data_dir: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank the nearest responder services for a position
    Nearby {
        /// Origin latitude in signed degrees
        #[arg(long)]
        lat: f64,

        /// Origin longitude in signed degrees
        #[arg(long)]
        lon: f64,

        /// How many services to return per category
        #[arg(short, default_value = "3")]
        k: usize,

        /// Restrict to services within this radius in km
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Feed a simulated inbound message through the full alert pipeline
    Simulate {
        /// Sender identifier, e.g. a short code
        #[arg(long, default_value = "911")]
        sender: String,

        /// Message body to classify
        #[arg(long)]
        message: String,

        /// Reporter latitude used by the simulated location provider
        #[arg(long, default_value = "16.31")]
        lat: f64,

        /// Reporter longitude used by the simulated location provider
        #[arg(long, default_value = "80.44")]
        lon: f64,
    },

    /// List emergency contacts in dispatch order
    Contacts,

    /// Show the most recent audited emergency events
    Events {
        /// Maximum events to show
        #[arg(short, default_value = "20")]
        n: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    }

    match args.command {
        Command::Nearby {
            lat,
            lon,
            k,
            radius,
        } => nearby(lat, lon, k, radius),
        Command::Simulate {
            sender,
            message,
            lat,
            lon,
        } => simulate(&args.data_dir, sender, message, lat, lon).await,
        Command::Contacts => contacts(&args.data_dir).await,
        Command::Events { n } => events(&args.data_dir, n).await,
    }
}

fn nearby(lat: f64, lon: f64, k: usize, radius: Option<f64>) -> anyhow::Result<()> {
    let origin = Coordinates::new(lat, lon)?;
    let index = GeoIndex::with_default_registry();

    for category in [ServiceCategory::Hospital, ServiceCategory::Police] {
        let ranked = match radius {
            Some(radius_km) => index.within_radius(origin, category, radius_km),
            None => index.nearest(origin, category, k),
        };
        println!("{category}:");
        if ranked.is_empty() {
            println!("  (none)");
        }
        for entry in ranked {
            println!(
                "  {:>8}  {}  ({})",
                entry.distance_label, entry.service.name, entry.service.phone
            );
        }
    }
    Ok(())
}

async fn build_coordinator(data_dir: &str, lat: f64, lon: f64) -> anyhow::Result<AlertCoordinator> {
    let store = Arc::new(FileStore::new(data_dir).await?);
    let dispatcher = Dispatcher::new(
        Arc::new(LoggingChannel::new("primary_api")),
        Arc::new(LoggingMessenger),
    )
    .with_fallback(Arc::new(LoggingChannel::new("provider_1")))
    .with_fallback(Arc::new(LoggingChannel::new("provider_2")))
    .with_banner(Arc::new(LoggingChannel::new("banner")));

    let coordinator = AlertCoordinator::new(
        CoreConfig::default(),
        GeoIndex::with_default_registry(),
        dispatcher,
        store,
        Arc::new(FixedLocationProvider::new(lat, lon, 15.0)),
    )
    .await?;
    Ok(coordinator)
}

async fn simulate(
    data_dir: &str,
    sender: String,
    message: String,
    lat: f64,
    lon: f64,
) -> anyhow::Result<()> {
    let mut coordinator = build_coordinator(data_dir, lat, lon).await?;

    let inbound = InboundMessage::new(chrono::Utc::now().timestamp().to_string(), sender, message);
    match coordinator.handle_message(&inbound).await? {
        None => println!("Message did not match any trigger rule; no alert raised."),
        Some(session) => {
            println!("Session {} reached {:?}", session.id, session.state);
            if let Some(report) = &session.report {
                println!(
                    "Delivered: {} ({} channel attempts)",
                    report.delivered,
                    report.outcomes.len()
                );
                for outcome in &report.outcomes {
                    let status = if outcome.succeeded { "ok" } else { "failed" };
                    println!("  {:<20} {}", outcome.channel, status);
                }
            }
            if !session.ranked_hospitals.is_empty() {
                println!("Nearest hospitals:");
                for entry in &session.ranked_hospitals {
                    println!("  {:>8}  {}", entry.distance_label, entry.service.name);
                }
            }
        }
    }
    Ok(())
}

async fn contacts(data_dir: &str) -> anyhow::Result<()> {
    let coordinator = build_coordinator(data_dir, 16.31, 80.44).await?;
    for contact in coordinator.contacts() {
        println!(
            "{:<3} {:<20} {:<12} {}",
            contact.priority, contact.name, contact.phone, contact.relationship
        );
    }
    Ok(())
}

async fn events(data_dir: &str, n: usize) -> anyhow::Result<()> {
    let coordinator = build_coordinator(data_dir, 16.31, 80.44).await?;
    let recent = coordinator.event_log().recent(n);
    if recent.is_empty() {
        println!("No audited events.");
    }
    for event in recent {
        println!(
            "{}  {:<8} {:<8} {}",
            event.created_at.to_rfc3339(),
            event.kind,
            event.severity.to_string(),
            event.message
        );
    }
    Ok(())
}
