//! # Moon Tracker Application Entry Point
//!
//! This binary crate resolves an observer location (command line, offline
//! place book or configuration default), computes the moon state and prints
//! it as an ASCII report or JSON. With `--watch` it keeps the report current
//! through the refresh scheduler until interrupted.


use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use moon_tracker_lib::config::{Config, CONFIG_FILE};
use moon_tracker_lib::geocode::Geocoder;
use moon_tracker_lib::refresh::RefreshScheduler;
use moon_tracker_lib::renderer::draw_ascii;
use moon_tracker_lib::{Location, MoonState, MoonStateAssembler};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_LEVEL: &str = "info";

const USAGE: &str = "usage: moon-tracker [--city NAME] [--lat LAT --lon LON] [--at RFC3339] [--watch] [--json] [--config PATH]";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub at: Option<DateTime<Utc>>,
    pub watch: bool,
    pub json: bool,
    pub config_path: Option<String>,
    pub help: bool,
}

fn flag_value<I: Iterator<Item = String>>(flag: &str, args: &mut I) -> anyhow::Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} needs a value\n{USAGE}"))
}

fn parse_coordinate(flag: &str, value: &str) -> anyhow::Result<f64> {
    value
        .parse::<f64>()
        .with_context(|| format!("{flag} expects a number, got {value:?}"))
}

/// Parse arguments (without the program name).
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--city" => parsed.city = Some(flag_value("--city", &mut args)?),
            "--lat" => {
                let value = flag_value("--lat", &mut args)?;
                parsed.latitude = Some(parse_coordinate("--lat", &value)?);
            }
            "--lon" => {
                let value = flag_value("--lon", &mut args)?;
                parsed.longitude = Some(parse_coordinate("--lon", &value)?);
            }
            "--at" => {
                let value = flag_value("--at", &mut args)?;
                let at = DateTime::parse_from_rfc3339(&value)
                    .with_context(|| format!("--at expects an RFC 3339 timestamp, got {value:?}"))?;
                parsed.at = Some(at.with_timezone(&Utc));
            }
            "--config" => parsed.config_path = Some(flag_value("--config", &mut args)?),
            "--watch" => parsed.watch = true,
            "--json" => parsed.json = true,
            "--help" | "-h" => parsed.help = true,
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }

    if parsed.latitude.is_some() != parsed.longitude.is_some() {
        bail!("--lat and --lon must be given together");
    }
    if parsed.city.is_some() && parsed.latitude.is_some() {
        bail!("use either --city or --lat/--lon, not both");
    }
    if parsed.watch && parsed.at.is_some() {
        bail!("--watch always follows the current time and cannot be combined with --at");
    }
    Ok(parsed)
}

/// Pick the observer location from the arguments, falling back to the config.
pub fn resolve_location(args: &Args, config: &Config) -> anyhow::Result<Location> {
    let places = config.place_book();

    if let (Some(latitude), Some(longitude)) = (args.latitude, args.longitude) {
        let named = places.reverse(latitude, longitude)?;
        return Ok(Location::new(named.city, latitude, longitude)?);
    }

    if let Some(city) = &args.city {
        let found = places
            .geocode(city)
            .with_context(|| format!("add {city:?} to [[places]] in the config file"))?;
        let location = Location::from(found);
        location.validate()?;
        return Ok(location);
    }

    Ok(config.to_location()?)
}

fn print_state(state: &MoonState, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else {
        draw_ascii(state);
    }
    Ok(())
}

async fn watch(config: &Config, initial: MoonState, json: bool) -> anyhow::Result<()> {
    let mut scheduler =
        RefreshScheduler::new(MoonStateAssembler::default(), config.refresh_period());
    let mut updates = scheduler.track(initial);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if !json {
                    println!();
                }
                print_state(&state, json)?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("interrupted, stopping refresh");
                break;
            }
        }
    }

    scheduler.stop();
    Ok(())
}

/// Log filter from `RUST_LOG`-style directives, `info` when unset or invalid.
pub fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(log_filter(env::var("RUST_LOG").ok()))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::load_from_path(args.config_path.as_deref().unwrap_or(CONFIG_FILE));
    let location = resolve_location(&args, &config)?;

    let state = MoonStateAssembler::default()
        .compute(&location, args.at)
        .with_context(|| format!("failed to compute moon state for {}", location.city))?;
    print_state(&state, args.json)?;

    if args.watch {
        // Create Tokio runtime for the refresh task
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(watch(&config, state, args.json))?;
    }

    Ok(())
}
