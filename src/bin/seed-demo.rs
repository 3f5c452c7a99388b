//! Populate a database with demo data for the admin screens.
//!
//! Usage: seed-demo [--reset] [--days N]
//!   --reset   : Empty all tables (and restart ids) before seeding
//!   --days N  : Spread events over N days before and after today (default 14)

use anyhow::{Context, Result};
use chrono::{Duration, NaiveTime, Utc};
use clap::Parser;

use event_admin::{
    db,
    models::{category::CategoryInput, event::EventInput, participant::ParticipantInput},
    repository::Repositories,
};

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed the event admin database with demo data")]
struct Args {
    /// Truncate categories, events and participants first
    #[arg(long)]
    reset: bool,

    /// Days on each side of today to place events on
    #[arg(long, default_value_t = 14)]
    days: i64,
}

const CATEGORIES: &[(&str, &str)] = &[
    ("Conference", "Multi-track talks and keynotes"),
    ("Workshop", "Hands-on sessions in small groups"),
    ("Meetup", "Evening community gatherings"),
];

/// Name, location, category index, hour.
const EVENTS: &[(&str, &str, usize, u32)] = &[
    ("TechConf", "Convention Center", 0, 9),
    ("RustConf Warmup", "Main Hall", 0, 10),
    ("Intro to Async", "Lab 2", 1, 14),
    ("Database Tuning", "Lab 1", 1, 13),
    ("Open Source Night", "Brewery Loft", 2, 19),
    ("Hack & Pizza", "Co-working Space", 2, 18),
];

const PARTICIPANTS: &[(&str, &str)] = &[
    ("Ada Lovelace", "ada@example.com"),
    ("Grace Hopper", "grace@example.com"),
    ("Alan Turing", "alan@example.com"),
    ("Barbara Liskov", "barbara@example.com"),
    ("Edsger Dijkstra", "edsger@example.com"),
];

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let pool = db::create_pool(&database_url, 5)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    if args.reset {
        tracing::info!("Emptying existing tables...");
        sqlx::query(
            "TRUNCATE event_participants, participants, events, categories RESTART IDENTITY CASCADE",
        )
        .execute(&pool)
        .await
        .context("Failed to truncate tables")?;
    }

    let repos = Repositories::postgres(pool);

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        let category = repos
            .categories
            .create(CategoryInput {
                name: name.to_string(),
                description: description.to_string(),
            })
            .await?;
        category_ids.push(category.id);
    }
    tracing::info!("Seeded {} categories", category_ids.len());

    // Spread the events evenly over [today - days, today + days], one on today.
    let today = Utc::now().date_naive();
    let span = args.days.max(1);
    let step = (2 * span) / (EVENTS.len() as i64 - 1).max(1);
    let mut event_ids = Vec::with_capacity(EVENTS.len());
    for (i, (name, location, category, hour)) in EVENTS.iter().enumerate() {
        let offset = if i == EVENTS.len() / 2 { 0 } else { -span + step * i as i64 };
        let time = NaiveTime::from_hms_opt(*hour, 0, 0).context("invalid seed hour")?;
        let event = repos
            .events
            .create(EventInput {
                name: name.to_string(),
                description: format!("{name} at {location}"),
                date: today + Duration::days(offset),
                time,
                location: location.to_string(),
                category_id: category_ids.get(*category).copied(),
            })
            .await?;
        event_ids.push(event.id);
    }
    tracing::info!("Seeded {} events around {}", event_ids.len(), today);

    for (i, (name, email)) in PARTICIPANTS.iter().enumerate() {
        // Every participant attends two consecutive events.
        let first = i % event_ids.len();
        let second = (i + 1) % event_ids.len();
        repos
            .participants
            .create(ParticipantInput {
                name: name.to_string(),
                email: email.to_string(),
                event_ids: vec![event_ids[first], event_ids[second]],
            })
            .await
            .with_context(|| format!("Failed to seed participant {email}"))?;
    }
    tracing::info!("Seeded {} participants", PARTICIPANTS.len());

    Ok(())
}
