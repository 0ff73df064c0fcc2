use clap::{Parser, Subcommand};
use recipe_pages::content::{ContentSource, ContentfulClient, FixtureSource};
use recipe_pages::{config, generate, output, paths, render, resolve, serve};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recipe-pages")]
#[command(about = "Static recipe pages from a headless CMS")]
#[command(long_about = "\
Static recipe pages from a headless CMS

Every entry of the configured content type becomes one page at
recipes/<slug>/index.html. Pages are regenerated when they are older than
the revalidation interval and their content changed upstream.

Fields read from each entry:
  slug, title, cookingTime, ingredients, method (rich text), featuredImage

Credentials come from recipes.toml or, preferably, the environment:
  CONTENTFUL_SPACE_ID, CONTENTFUL_ACCESS_KEY

Run 'recipe-pages gen-config' to generate a documented recipes.toml.")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Where configuration and entries come from.
#[derive(clap::Args)]
struct SourceArgs {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Read entries from an exported API response instead of the network
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Space identifier (overrides the config file)
    #[arg(long, env = "CONTENTFUL_SPACE_ID", global = true, hide_env_values = true)]
    space_id: Option<String>,

    /// Delivery API access token (overrides the config file)
    #[arg(long, env = "CONTENTFUL_ACCESS_KEY", global = true, hide_env_values = true)]
    access_token: Option<String>,
}

impl SourceArgs {
    /// Load the config and build the content source it describes.
    fn open(&self) -> Result<(config::SiteConfig, Box<dyn ContentSource>), Box<dyn std::error::Error>> {
        let site_config = config::load_config(&self.config)?
            .with_credentials(self.space_id.clone(), self.access_token.clone());
        let source: Box<dyn ContentSource> = match &self.fixture {
            Some(path) => {
                tracing::info!(path = %path.display(), "reading entries from fixture");
                Box::new(FixtureSource::watch(path)?)
            }
            None => Box::new(ContentfulClient::new(&site_config.contentful)?),
        };
        Ok((site_config, source))
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the routes that would be generated
    Paths,
    /// Resolve one slug and print its page to stdout
    Show { slug: String },
    /// Generate every page
    Build,
    /// Regenerate stale pages and add newly published ones
    Revalidate {
        /// Regenerate every page regardless of age
        #[arg(long)]
        force: bool,
    },
    /// Serve the output directory, generating pages on demand
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Print a stock recipes.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Paths => {
            let (site_config, source) = cli.source.open()?;
            let paths = paths::enumerate_paths(source.as_ref(), &site_config.contentful)?;
            output::print_paths(&paths);
        }
        Command::Show { slug } => {
            let (site_config, source) = cli.source.open()?;
            let props = resolve::resolve_entry(source.as_ref(), &site_config, &slug)?;
            if props.recipe.is_none() {
                eprintln!("No entry with slug {slug:?}; rendering placeholder");
            }
            println!("{}", render::render_page(&props, &site_config).into_string());
        }
        Command::Build => {
            let (site_config, source) = cli.source.open()?;
            init_thread_pool(&site_config.processing);
            println!("==> Building recipe pages → {}", cli.output.display());
            let report = generate::build(source.as_ref(), &site_config, &cli.output)?;
            output::print_build_output(&report);
        }
        Command::Revalidate { force } => {
            let (site_config, source) = cli.source.open()?;
            init_thread_pool(&site_config.processing);
            println!("==> Revalidating {}", cli.output.display());
            let report = generate::revalidate(source.as_ref(), &site_config, &cli.output, force)?;
            output::print_revalidate_output(&report);
        }
        Command::Serve { port } => {
            let (site_config, source) = cli.source.open()?;
            serve::serve(source.as_ref(), &site_config, &cli.output, port)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
