use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use appointment_watch::{
    config::{Overrides, load_settings_path},
    db::{connection::connect_sqlite, migrate},
    engine::{PollingEngine, driver::monitor_location},
    notify::{NotificationSink, console::ConsoleSink},
    policy::AcceptancePolicy,
};
use chrono::Local;
use clap::Parser;
use schedule_source::providers::{ScheduleSource, ttp_rest::TtpRestSource};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Watches Trusted Traveler locations for earlier interview appointments.
#[derive(Parser)]
#[command(name = "appointment-watch", version, about)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Current appointment date, e.g. "January 1, 2024".
    #[arg(short = 'd', long)]
    current_appointment_date: Option<String>,

    /// Comma separated location ids to add to the configured ones.
    #[arg(short = 'l', long, value_delimiter = ',')]
    location_ids: Vec<i64>,

    /// Notification level (1 = info, 2 = error).
    #[arg(short = 'n', long)]
    notification_level: Option<u8>,

    /// Retrieval interval, e.g. 5m. Zero polls once and exits.
    #[arg(short = 'r', long)]
    retrieval_interval: Option<String>,

    /// Earliest appointment time of day, HH:MM.
    #[arg(short = 's', long)]
    start_appointment_time: Option<String>,

    /// Latest appointment time of day, HH:MM.
    #[arg(short = 'e', long)]
    end_appointment_time: Option<String>,

    /// Only consider appointments at least this far from now (default 15m).
    #[arg(short = 'T', long)]
    travel_time: Option<String>,

    /// Log debug messages.
    #[arg(short = 'D', long)]
    debug: bool,

    /// Send a test notification and exit.
    #[arg(short = 't', long)]
    test_notifications: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            current_appointment_date: self.current_appointment_date.clone(),
            location_ids: self.location_ids.clone(),
            notification_level: self.notification_level,
            retrieval_interval: self.retrieval_interval.clone(),
            start_appointment_time: self.start_appointment_time.clone(),
            end_appointment_time: self.end_appointment_time.clone(),
            travel_time: self.travel_time.clone(),
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // 1) Config: file, then environment, then flags
    let mut settings = load_settings_path(Some(cli.config.as_path()))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    settings.apply_env();
    settings.apply_overrides(&cli.overrides())?;
    settings.validate(Local::now().date_naive())?;

    let sink: Arc<dyn NotificationSink> = Arc::new(ConsoleSink::stdout(
        settings.locations.clone(),
        settings.notification_level,
    ));

    if cli.test_notifications {
        tracing::info!("Sending test notifications...");
        sink.send_text("This is a test message.", None).await?;
        return Ok(());
    }

    let locations = settings.require_locations()?.to_vec();

    // 2) Database: create the file and bring the schema up to date
    let db_url = settings.database_url();
    migrate::run_sqlite(&db_url).with_context(|| format!("migrating {db_url}"))?;

    // 3) One polling task per location, each with its own connection
    let source: Arc<dyn ScheduleSource> =
        Arc::new(TtpRestSource::with_url_template(settings.source_url.clone())?);
    let policy = AcceptancePolicy::new(settings.constraints());
    let interval = settings.retrieval_interval;
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for location_id in locations {
        let conn = connect_sqlite(&db_url)?;
        let engine = PollingEngine::new(
            location_id,
            policy.clone(),
            Arc::clone(&source),
            Arc::clone(&sink),
            conn,
        );
        let token = cancel.child_token();
        tasks.spawn(async move {
            let result = monitor_location(&engine, interval, token).await;
            (location_id, result)
        });
    }

    tracing::info!(count = tasks.len(), ?interval, "monitoring locations");

    // 4) Wait for every task; Ctrl+C stops them all
    let mut listen_for_signal = true;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c(), if listen_for_signal => {
                listen_for_signal = false;
                match signal {
                    Ok(()) => {
                        tracing::info!("Ctrl+C pressed. Stopping all location monitors");
                        cancel.cancel();
                    }
                    Err(error) => tracing::warn!(%error, "unable to listen for Ctrl+C"),
                }
            }
            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok((location_id, Ok(())))) => {
                    tracing::debug!(%location_id, "location monitor finished");
                }
                Some(Ok((location_id, Err(error)))) => {
                    tracing::error!(%location_id, %error, "stopped monitoring location");
                }
                Some(Err(error)) => tracing::error!(%error, "location monitor panicked"),
            }
        }
    }

    Ok(())
}
