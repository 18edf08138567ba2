use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use taste_navigator::config::Settings;
use taste_navigator::core::{RecommendationOutcome, SearchSession, SessionNotice};
use taste_navigator::models::Coordinate;
use taste_navigator::services::{
    FixedPosition, GeolocationResolver, NoPositionSource, PositionSource, RecommendationClient,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Ask the recommendation service for places matching a mood, on a map
#[derive(Debug, Parser)]
#[command(name = "taste-navigator", version, about)]
struct Cli {
    /// Free-text description of the place you want
    #[arg(short, long, default_value = "")]
    text: String,

    /// Keyword tag, repeatable (e.g. --tag 카페 --tag 뷰맛집)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Hard filter key, repeatable (BusinessParking, RestaurantsGoodForGroups, GoodForKids, DineIn, Vegetarian)
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Search radius in km (0.5 - 10.0, step 0.5)
    #[arg(short, long)]
    radius: Option<f64>,

    /// Move the position marker to this latitude (requires --lng)
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Move the position marker to this longitude (requires --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Configuration file (defaults to config/default.toml + config/local.toml)
    #[arg(short, long, env = "TASTE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = settings.unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(2);
    });

    init_logging(&settings);

    if let Err(e) = run(cli, settings).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Taste Navigator session...");

    let source: Arc<dyn PositionSource> = match settings.geolocation.device()? {
        Some(position) => Arc::new(FixedPosition(position)),
        None => Arc::new(NoPositionSource),
    };
    let resolver = GeolocationResolver::new(
        source,
        settings.geolocation.fallback()?,
        settings.geolocation.timeout(),
    );

    let client = RecommendationClient::new(settings.service.base_url.clone(), settings.service.timeout())?
        .with_auth_token(settings.service.auth_token.clone())
        .with_failure_message(settings.service.failure_message.clone());

    info!("Recommendation service at {}", client.base_url());

    let initial = resolver.initial().await;
    let session = SearchSession::new(
        Arc::new(client),
        settings.search.criteria_at(initial),
        settings.overlay.remount_delay(),
    );
    let mut notices = session.notices();

    if let (Some(lat), Some(lng)) = (cli.lat, cli.lng) {
        session.on_marker_drag_end(Coordinate::new(lat, lng)?);
    }
    if let Some(radius) = cli.radius {
        let applied = session.set_radius(radius);
        if applied != radius {
            info!("Radius adjusted to {} km", applied);
        }
    }
    for tag in &cli.tags {
        session.toggle_tag(tag);
    }
    for key in &cli.filters {
        session.toggle_hard_filter(key)?;
    }
    session.set_free_text(&cli.text);

    let submitted = session.submit().await;

    while let Ok(notice) = notices.try_recv() {
        match notice {
            SessionNotice::Validation(message) => eprintln!("{}", message),
            SessionNotice::Alert(message) => eprintln!("Error: {}", message),
        }
    }
    submitted?;

    let sidebar = session.sidebar();
    let map = session.map_overlays();

    if let RecommendationOutcome::Failure { .. } = session.outcome() {
        session.shutdown();
        return Err("recommendation request failed".into());
    }

    if let RecommendationOutcome::Success(_) = session.outcome() {
        println!("Search center: {}", map.position.position);
        println!(
            "Scanned: {}  Analyzed: {}",
            sidebar.scanned_count, sidebar.analyzed_count
        );
        println!();
        println!("{}", sidebar.result_text.unwrap_or_default());
        println!();
        for marker in &map.markers {
            println!(
                "{:>2}. {} {} ({:.2} km)",
                marker.label, marker.name, marker.position, marker.distance_km
            );
        }
    }

    session.shutdown();
    Ok(())
}
