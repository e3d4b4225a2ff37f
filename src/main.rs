use anyhow::{Context, Result};
use cinestudio::api::Category;
use cinestudio::util::{display_width, pad_to_width, sanitize_line, truncate_to_width};
use cinestudio::{BrowseMachine, Catalog, Config, Movie, SearchMachine, TmdbClient};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Fallback output width when `COLUMNS` is not set.
const DEFAULT_COLUMNS: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "cinestudio", about = "Browse and search a movie catalog")]
struct Args {
    /// Config file (default: ~/.config/cinestudio/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Language tag for titles and overviews, e.g. fr-FR
    #[arg(long)]
    language: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a category: popular, top_rated, upcoming or now_playing
    List {
        #[arg(short, long)]
        category: Option<Category>,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Search titles
    Search {
        query: String,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Show details for one movie
    Show { id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the listing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();
    if let Some(language) = args.language {
        config.language = language;
    }

    let client = TmdbClient::new(config.client_config()).context("Failed to create catalog client")?;
    let catalog = Arc::new(client);

    match args.command {
        Command::List { category, pages } => {
            list(catalog, category.unwrap_or(config.default_category), pages).await
        }
        Command::Search { query, pages } => search(catalog, &config, &query, pages).await,
        Command::Show { id } => show(catalog.as_ref(), id).await,
    }
}

async fn list<C: Catalog>(catalog: Arc<C>, category: Category, pages: u32) -> Result<()> {
    let mut browse = BrowseMachine::new(catalog);

    browse.select_category(category);
    browse.settle().await;
    for _ in 1..pages {
        if !browse.advance_page() {
            break;
        }
        browse.settle().await;
    }

    let error = browse.take_error();
    let state = browse.state();
    println!("{} ({} movies)", category.label(), state.movies.len());
    print_movies(&state.movies);
    finish(error, state.movies.is_empty())
}

async fn search<C: Catalog>(catalog: Arc<C>, config: &Config, query: &str, pages: u32) -> Result<()> {
    let mut search = SearchMachine::with_debounce(catalog, config.search_debounce());

    if !search.search(query, 1) {
        if let Some(error) = search.take_error() {
            anyhow::bail!(error);
        }
        anyhow::bail!("Nothing to search for");
    }
    search.settle().await;
    for _ in 1..pages {
        if !search.advance_page() {
            break;
        }
        search.settle().await;
    }

    let error = search.take_error();
    let state = search.state();
    println!("Results for '{}' ({} movies)", state.query, state.movies.len());
    print_movies(&state.movies);
    finish(error, state.movies.is_empty())
}

async fn show<C: Catalog>(catalog: &C, id: u64) -> Result<()> {
    let movie = catalog
        .fetch_by_id(id)
        .await
        .with_context(|| format!("Failed to load movie {id}"))?;

    println!("{}", sanitize_line(&movie.title));
    let year = movie
        .release_year()
        .map(|y| y.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    println!("Released: {year}");
    println!("Rating:   {}", movie.formatted_rating());

    let genres = movie.genre_names();
    if !genres.is_empty() {
        println!("Genres:   {}", genres.join(", "));
    }
    if let Some(url) = movie.poster_url() {
        println!("Poster:   {url}");
    }
    if let Some(url) = movie.backdrop_url() {
        println!("Backdrop: {url}");
    }
    match movie.overview.as_deref().map(sanitize_line) {
        Some(overview) if !overview.is_empty() => println!("\n{overview}"),
        _ => println!("\nNo overview available."),
    }
    Ok(())
}

fn print_movies(movies: &[Movie]) {
    let columns = std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(DEFAULT_COLUMNS);

    for movie in movies {
        let year = movie
            .release_year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());
        let prefix = format!(
            "{:>8}  {}  {}  ",
            movie.id,
            year,
            pad_to_width(&movie.formatted_rating(), 7)
        );
        let room = columns.saturating_sub(display_width(&prefix));
        let title = sanitize_line(&movie.title);
        println!("{prefix}{}", truncate_to_width(&title, room));
    }
}

/// Surface a pending error once; fail only when nothing could be shown.
fn finish(error: Option<String>, empty: bool) -> Result<()> {
    match error {
        Some(error) if empty => anyhow::bail!(error),
        Some(error) => {
            eprintln!("Warning: {error}");
            Ok(())
        }
        None => Ok(()),
    }
}
