use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use weather_core::{
    Config, FileStore, FixedLocator, LocationResolver, LocationSearch, OpenWeatherProvider,
    WeatherCache, WeatherProvider, provider::provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a saved location, with a local cache")]
pub struct Cli {
    /// Print debug logs to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Search places by name or zip code.
    Search {
        /// Place name ("London", "Zocca, IT") or zip code ("10001", "E14,GB").
        query: String,

        /// Save the Nth result (1-based) as the current location.
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Use a raw coordinate as the current location, as a device fix would.
    Locate {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },

    /// Show weather for the saved location.
    Show {
        /// Skip the cache and fetch fresh data.
        #[arg(long)]
        refresh: bool,
    },

    /// One-off lookup by query, bypassing the saved location and cache.
    Quick {
        query: String,
    },
}

/// Everything a command needs, wired from the config.
struct App {
    config: Config,
    provider: Arc<OpenWeatherProvider>,
    cache: WeatherCache,
}

impl App {
    fn load() -> anyhow::Result<Self> {
        let config = Config::load()?;
        let provider = Arc::new(provider_from_config(&config)?);
        let store_path = config.store_path()?;
        tracing::debug!(path = %store_path.display(), "using store");

        let cache = WeatherCache::new(provider.clone(), Arc::new(FileStore::new(store_path)));
        Ok(Self { config, provider, cache })
    }

    async fn search(&self, query: &str, pick: Option<usize>) -> anyhow::Result<()> {
        let search = LocationSearch::with_limit(
            LocationResolver::new(self.provider.clone()),
            self.config.search_limit(),
        );
        search.search(query).await;
        let results = search.results().get();

        if results.is_empty() {
            println!("No places found for '{query}'.");
            return Ok(());
        }

        let Some(n) = pick else {
            for (i, location) in results.iter().enumerate() {
                println!(
                    "{:>2}. {}  ({:.4}, {:.4})",
                    i + 1,
                    location.display_text(),
                    location.lat,
                    location.lon
                );
            }
            println!("\nSave one with: weather search '{query}' --pick <N>");
            return Ok(());
        };

        let location = n
            .checked_sub(1)
            .and_then(|i| results.get(i))
            .with_context(|| format!("--pick must be between 1 and {}", results.len()))?
            .clone();
        self.cache.save_location(location).await;
        self.print_weather(false).await;
        Ok(())
    }

    async fn locate(&self, lat: f64, lon: f64) -> anyhow::Result<()> {
        self.cache.save_device_location(&FixedLocator::new(lat, lon)).await?;
        self.print_weather(false).await;
        Ok(())
    }

    async fn show(&self, refresh: bool) -> anyhow::Result<()> {
        if self.cache.load_location().await.is_none() {
            bail!(
                "No saved location.\n\
                 Hint: run `weather search <place> --pick 1` or `weather locate <lat> <lon>`."
            );
        }
        self.print_weather(refresh).await;
        Ok(())
    }

    async fn quick(&self, query: &str) -> anyhow::Result<()> {
        let snapshot = self
            .provider
            .weather_by_query(query)
            .await
            .with_context(|| format!("Weather lookup for '{query}' failed"))?;
        let title = snapshot.name.clone().unwrap_or_else(|| query.to_string());
        println!("{}", render::weather_report(&title, &snapshot, Utc::now()));
        Ok(())
    }

    async fn print_weather(&self, force_refresh: bool) {
        self.cache.get_weather(force_refresh).await;

        let title = self
            .cache
            .location()
            .get()
            .map(|l| l.display_text())
            .unwrap_or_default();

        match self.cache.weather().get() {
            Some(snapshot) => println!("{}", render::weather_report(&title, &snapshot, Utc::now())),
            None => println!("{title}\nWeather is unavailable right now; try again with --refresh."),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Search { query, pick } => App::load()?.search(&query, pick).await,
            Command::Locate { lat, lon } => App::load()?.locate(lat, lon).await,
            Command::Show { refresh } => App::load()?.show(refresh).await,
            Command::Quick { query } => App::load()?.quick(&query).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Text::new("OpenWeather API key:")
        .with_help_message("Create one at https://home.openweathermap.org/api_keys")
        .prompt()
        .context("Failed to read API key")?;
    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key.to_string());
    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}
