use clap::{Parser, Subcommand};
use iiif_gen::config::{self, Grouping, Overrides, SampleConfig};
use iiif_gen::generate::{self, GenerateError};
use iiif_gen::imaging::RustBackend;
use iiif_gen::output;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "iiif-gen")]
#[command(about = "Generate IIIF Presentation 3.0 manifests and collections for a directory of images")]
#[command(long_about = "\
Generate IIIF Presentation 3.0 manifests and collections for a directory of images

Every image becomes one manifest whose canvas is painted by the image served
from an external IIIF image server. Manifests can be grouped into collections
by a metadata column, a file name prefix, a subdirectory, or one-hot flag
columns. A top-level index collection ties everything together.

Layout:

  data/images/                     # --images-dir
  ├── a.jpg                        # → {base_url}/iiif/3/a.jpg
  └── b.png
  data/metadata.csv                # --metadata-file (optional)
      filename,set,category        # key column + one metadata field per column
      a.jpg,train,portrait

  out/collections/                 # --output-dir, served at --manifest-url
  ├── a.jpg.json                   # manifest per image
  ├── b.png.json
  ├── train.json                   # collection per group (--group-by column:set)
  └── index.json                   # top-level collection

Settings are read from iiif-gen.toml, then environment variables, then flags.
Run 'iiif-gen gen-config' to generate a documented iiif-gen.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing the images
    #[arg(long, env = "IMAGES_DIR", global = true)]
    images_dir: Option<PathBuf>,

    /// Directory the JSON documents are written to
    #[arg(long, env = "OUTPUT_DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Base URL of the IIIF image server
    #[arg(long, env = "IIIF_BASE_URL", global = true)]
    base_url: Option<String>,

    /// URL under which the output directory is published
    #[arg(long, env = "MANIFEST_BASE_URL", global = true)]
    manifest_url: Option<String>,

    /// CSV file with per-image metadata
    #[arg(long, env = "METADATA_FILE", global = true)]
    metadata_file: Option<PathBuf>,

    /// Accepted image extensions, comma separated
    #[arg(long, value_delimiter = ',', global = true)]
    extensions: Option<Vec<String>>,

    /// Group manifests into collections: column:<name>, prefix:<sep>, directory, flags:<c1,c2>
    #[arg(long = "group-by", value_name = "GROUPING", global = true)]
    group_by: Vec<Grouping>,

    /// Also write sample.json listing the first N manifests
    #[arg(long, value_name = "N", global = true)]
    sample_size: Option<usize>,

    /// Descend into subdirectories of the images directory
    #[arg(long, global = true)]
    recursive: bool,

    /// Config file (default: ./iiif-gen.toml if present)
    #[arg(long, env = "IIIF_GEN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Regenerate even if the output directory already has manifests
    #[arg(long, global = true)]
    force: bool,

    /// Show per-image progress and skipped files
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write manifests and collections (default)
    Generate,
    /// Scan and identify images, report what would be written
    Check,
    /// Print a stock iiif-gen.toml with all options documented
    GenConfig,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            images_dir: self.images_dir.clone(),
            output_dir: self.output_dir.clone(),
            base_url: self.base_url.clone(),
            manifest_url: self.manifest_url.clone(),
            metadata_file: self.metadata_file.clone(),
            extensions: self.extensions.clone(),
            recursive: self.recursive.then_some(true),
            sample: self.sample_size.map(|size| SampleConfig { size }),
            grouping: (!self.group_by.is_empty()).then(|| self.group_by.clone()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), GenerateError> {
    let command = cli.command.as_ref().unwrap_or(&Command::Generate);
    if let Command::GenConfig = command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref(), &cli.overrides())?;
    init_thread_pool(&config.processing);
    let backend = RustBackend::new();

    match command {
        Command::Check => {
            let generation = generate::prepare(&config, &backend)?;
            output::print_check_output(&generation, &config.output_dir, cli.verbose);
        }
        _ => {
            if !cli.force {
                generate::check_inputs(&config)?;
                let existing = generate::existing_outputs(&config.output_dir)?;
                if !existing.is_empty() {
                    output::print_existing_notice(&config.output_dir, &existing);
                    return Ok(());
                }
            }
            let report = generate::generate(&config, &backend)?;
            output::print_generate_output(&report, cli.verbose);
            output::print_example_urls(&report.generation);
        }
    }
    Ok(())
}

/// Logs go to stderr. Default level is `warn`, `--verbose` raises it to
/// `debug`; `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
