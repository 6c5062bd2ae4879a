use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use skillshop::{
    Coordinates, DistanceUnit, Geocoder, InMemoryLocationStore, ListingCatalog, NominatimGeocoder,
    SearchQuery, SearchService, SkillshopConfig, SkillshopError, distance, telemetry, web,
};

#[derive(Parser)]
#[command(name = "skillshop")]
#[command(about = "Local services marketplace with location-aware search.")]
struct CommandLine {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for skillshop
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        /// JSON file with listings to serve
        #[arg(long)]
        listings: Option<PathBuf>,
    },
    /// Resolve a place name or postcode to coordinates
    Geocode { text: String },
    /// Great-circle distance between two "lat,lon" points
    #[command(allow_negative_numbers = true)]
    Distance {
        from: Coordinates,
        to: Coordinates,
        #[arg(short, long, default_value = "miles")]
        unit: DistanceUnit,
    },
    /// Search a JSON listing file the way the API does
    Search {
        #[arg(long)]
        listings: PathBuf,
        #[arg(long, default_value = "")]
        skill: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        radius: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let commands = CommandLine::parse();

    let mut config = SkillshopConfig::load_from_path(commands.config.clone())?;
    telemetry::init(&config.logging, commands.verbose)?;

    match commands.command {
        Commands::Serve { port, listings } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(listings) = listings {
                config.server.listings_path = Some(listings.to_string_lossy().into_owned());
            }
            web::run(config).await
        }
        Commands::Geocode { text } => {
            let geocoder = NominatimGeocoder::new(&config.geocoder)?;
            let coordinates = geocoder
                .resolve(&text)
                .await
                .map_err(SkillshopError::from)
                .with_context(|| format!("Could not geocode '{text}'"))?;
            println!("{text}: {coordinates}");
            Ok(())
        }
        Commands::Distance { from, to, unit } => {
            println!("{:.2} {}", distance(from, to, unit), unit);
            Ok(())
        }
        Commands::Search {
            listings,
            skill,
            location,
            radius,
            lat,
            lon,
        } => {
            let catalog = Arc::new(ListingCatalog::from_json_file(&listings)?);
            let geocoder = Arc::new(NominatimGeocoder::new(&config.geocoder)?);
            let service = SearchService::new(
                geocoder,
                Arc::new(InMemoryLocationStore::new()),
                catalog,
            )
            .with_default_radius(config.search.default_radius_miles);

            let query = SearchQuery {
                skill_text: skill,
                location_text: location,
                browser_lat: lat,
                browser_lon: lon,
                radius,
            };
            let outcome = service.search_active(&query).await?;

            if let Some(error) = &outcome.location_error {
                println!("{error}");
            }
            println!(
                "Found {} listings within {} miles:",
                outcome.results.len(),
                outcome.radius_miles
            );
            for hit in &outcome.results {
                let place = hit
                    .listing
                    .location
                    .as_ref()
                    .map_or("no location", |l| l.name.as_str());
                match hit.distance_miles {
                    Some(miles) => println!(
                        "  - #{} {} ({}, {:.1} mi away)",
                        hit.listing.id, hit.listing.skill.name, place, miles
                    ),
                    None => println!("  - #{} {} ({})", hit.listing.id, hit.listing.skill.name, place),
                }
            }
            Ok(())
        }
    }
}
