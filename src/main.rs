use clap::{Parser, Subcommand};
use image_vault::catalog::ListQuery;
use image_vault::store::{AssetStore, StoreError, UploadFile, UploadOptions};
use image_vault::{config, naming, output};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "image-vault")]
#[command(about = "Store images with optimized originals and resized derivatives")]
#[command(long_about = "\
Store images with optimized originals and resized derivatives

Every upload is re-encoded in its own format and stored together with one
resized copy per configured size profile:

  uploads/
  └── products/                                # Category
      └── 2024/11/                             # Upload year / month (UTC)
          ├── 1730800000000-6f1c…e2.jpg        # Original
          ├── 1730800000000-6f1c…e2-small.jpg  # Fits 150x150
          ├── 1730800000000-6f1c…e2-medium.jpg # Fits 300x300
          └── 1730800000000-6f1c…e2-large.jpg  # Fits 800x800

Images are addressed by their path relative to the storage root, for example
'products/2024/11/1730800000000-6f1c…e2.jpg'.

Run 'image-vault gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "image-vault.toml", global = true)]
    config: PathBuf,

    /// Storage root, overriding the config file
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store one or more image files
    Upload {
        /// Image files (up to 10)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Category to file the images under
        #[arg(long, default_value = "general")]
        category: String,
        /// Skip resized derivatives
        #[arg(long)]
        no_derivatives: bool,
        /// Store the bytes as given instead of re-encoding
        #[arg(long)]
        no_optimize: bool,
        /// MIME type for every file (default: from the file extension)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Write a stored image to a file or stdout
    Get {
        path: String,
        /// Derivative size label instead of the original
        #[arg(long)]
        size: Option<String>,
        /// Output file (default: stdout)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Show size, timestamps, and dimensions of a stored image
    Info { path: String },
    /// Report whether a stored image exists
    Exists { path: String },
    /// Delete an image and its derivatives
    Delete {
        path: String,
        /// Fail if any derivative could not be removed
        #[arg(long)]
        strict: bool,
    },
    /// List stored originals, newest first
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show image count and total size
    Stats,
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut store_config = config::load_config(&cli.config)?;
    if let Some(root) = &cli.root {
        store_config.storage.root = root.clone();
    }
    init_thread_pool(&store_config.processing);
    let development = store_config.development;

    let result = AssetStore::open(store_config)
        .map_err(Into::into)
        .and_then(|store| run(&cli, &store));

    result.map_err(|err| match err.downcast::<StoreError>() {
        Ok(store_err) => {
            debug!(error = %store_err, "command failed");
            format!(
                "{} [{}]",
                store_err.public_message(development),
                store_err.kind()
            )
            .into()
        }
        Err(other) => other,
    })
}

fn run(cli: &Cli, store: &AssetStore) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Upload {
            files,
            category,
            no_derivatives,
            no_optimize,
            mime,
        } => {
            let options = UploadOptions {
                category: category.clone(),
                generate_derivatives: !no_derivatives,
                optimize: !no_optimize,
            };
            let uploads = files
                .iter()
                .map(|path| read_upload(path, mime.as_deref()))
                .collect::<Result<Vec<_>, _>>()?;

            let descriptors = match uploads.as_slice() {
                [single] => vec![store.upload(
                    &single.bytes,
                    &single.name,
                    &single.mime_type,
                    &options,
                )?],
                many => store.upload_batch(many, &options)?,
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&descriptors)?);
            } else {
                for descriptor in &descriptors {
                    output::print_upload(descriptor);
                }
            }
        }
        Command::Get { path, size, out } => {
            let image = match size {
                Some(label) => store.get_variant(path, label)?,
                None => store.get(path)?,
            };
            match out {
                Some(out) => {
                    std::fs::write(out, &image.bytes)?;
                    eprintln!(
                        "Wrote {} bytes ({}) to {}",
                        image.bytes.len(),
                        image.content_type,
                        out.display()
                    );
                }
                None => std::io::stdout().lock().write_all(&image.bytes)?,
            }
        }
        Command::Info { path } => {
            let meta = store.metadata(path)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&meta)?);
            } else {
                output::print_metadata(&meta);
            }
        }
        Command::Exists { path } => {
            let exists = store.exists(path);
            if cli.json {
                println!("{}", serde_json::json!({ "path": path, "exists": exists }));
            } else {
                println!("{}", exists);
            }
        }
        Command::Delete { path, strict } => {
            let report = store.delete(path)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_delete(&report);
            }
            if *strict {
                report.into_result()?;
            }
        }
        Command::List {
            category,
            page,
            limit,
        } => {
            let listing = store.list(&ListQuery {
                category: category.clone(),
                page: *page,
                limit: *limit,
            })?;
            if cli.json {
                let body = serde_json::json!({
                    "items": listing.items,
                    "pagination": listing.pagination(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                output::print_listing(&listing);
            }
        }
        Command::Stats => {
            let stats = store.stats()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                output::print_stats(&stats);
            }
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }
    Ok(())
}

/// Read a file for upload. The MIME type comes from `--mime` or the extension.
fn read_upload(path: &Path, mime: Option<&str>) -> std::io::Result<UploadFile> {
    let bytes = std::fs::read(path)?;
    let mime_type = mime
        .map(str::to_string)
        .unwrap_or_else(|| naming::content_type_for(path).to_string());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadFile {
        name,
        mime_type,
        bytes,
    })
}

/// Log to stderr so stdout carries only command output.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Size the global rayon pool that encodes derivatives and batch uploads.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
