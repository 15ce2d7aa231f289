use adaptive_images::imaging::RustBackend;
use adaptive_images::service::{ImageRequest, ResizeService};
use adaptive_images::{config, logging, output, server, warm};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "adaptive-images")]
#[command(about = "Serve breakpoint-sized images from an on-disk rendition cache")]
#[command(long_about = "\
Serve breakpoint-sized images from an on-disk rendition cache

Each image request is matched to the widest breakpoint that fits the client's
viewport (read from a cookie, or guessed from the user agent). The first
request renders the image at that width and stores it under the cache
directory; later requests are served straight from disk until the source
changes.

Layout:

  public/                          # document_root
  ├── photos/dawn.jpg              # source, served for /photos/dawn.jpg
  └── cache/                       # cache_directory_name
      ├── 1200/photos/dawn.jpg     # rendition per breakpoint
      └── 480/photos/dawn.jpg

Front-end script sets the viewport cookie, e.g.:

  document.cookie = 'resolution=' + Math.max(screen.width, screen.height)
                  + ',' + (window.devicePixelRatio || 1) + '; path=/';

Run 'adaptive-images gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured document root
    #[arg(long, global = true)]
    document_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override the configured listen address
        #[arg(long)]
        listen: Option<String>,
    },
    /// Show what a request would be served, without rendering
    Plan {
        /// Request path, e.g. /photos/dawn.jpg
        path: String,
        /// Viewport hint in pixels, as the cookie would carry it
        #[arg(long)]
        hint: Option<i64>,
        /// User-Agent to classify when no hint is given
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Pre-render every breakpoint of every image under the document root
    Warm {
        /// Worker threads (defaults to the number of cores)
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Validate the config and print the resolved settings
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { ref listen } => {
            logging::init("info");
            let mut server_config = resolve_config(&cli)?;
            if let Some(listen) = listen {
                server_config.server.listen = listen.clone();
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(Arc::new(server_config)))?;
        }
        Command::Plan {
            ref path,
            hint,
            ref user_agent,
        } => {
            logging::init("warn");
            let server_config = resolve_config(&cli)?;
            let service = ResizeService::new(Arc::new(server_config), RustBackend::new());
            let plan = service.plan(&ImageRequest {
                path: path.clone(),
                viewport_hint: hint,
                user_agent: user_agent.clone(),
            })?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Warm { jobs } => {
            logging::init("warn");
            let server_config = resolve_config(&cli)?;
            init_thread_pool(jobs);
            let service = ResizeService::new(Arc::new(server_config), RustBackend::new());
            println!("==> Warming {}", service.cache().root().display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_warm_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = warm::warm(&service, Some(tx))?;
            printer.join().ok();
            println!("{}", output::format_warm_summary(&report));
        }
        Command::Check => {
            let server_config = resolve_config(&cli)?;
            println!("==> Config is valid");
            output::print_config(&server_config);
            if !server_config.document_root.is_dir() {
                println!(
                    "warning: document root {} does not exist",
                    server_config.document_root.display()
                );
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file (or defaults) and apply command-line overrides.
fn resolve_config(cli: &Cli) -> Result<config::ServerConfig, config::ConfigError> {
    let mut server_config = config::load_config(cli.config.as_deref())?;
    if let Some(root) = &cli.document_root {
        server_config.document_root = root.clone();
    }
    Ok(server_config)
}

/// Initialize the rayon thread pool.
///
/// Caps at the number of available CPU cores; users can constrain down, not up.
fn init_thread_pool(jobs: Option<usize>) {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = jobs.map_or(cores, |j| j.clamp(1, cores));
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
