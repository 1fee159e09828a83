use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use photometa::batch::{self, BatchOptions};
use photometa::catalog::NamespaceCatalog;
use photometa::config::{self, EngineConfig};
use photometa::gps::{self, GpsPosition};
use photometa::orientation::{self, ExifOrientation, PrimitiveAction};
use photometa::resolve::Comment;
use photometa::sidecar::{self, JsonSidecarSource, SidecarReconciler, SidecarSource};
use photometa::store::MemoryTagStore;
use photometa::write::FieldWriter;
use photometa::{logging, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "photometa")]
#[command(about = "Resolve and reconcile Exif, IPTC and XMP photo metadata")]
#[command(long_about = "\
Resolve and reconcile Exif, IPTC and XMP photo metadata

Images are read as JSON tag-store dumps (photo.jpg.json) written by an
external codec. A sidecar next to the dump (photo.jpg.json.xmp, or
photo.jpg.xmp with naming = \"replace\") is merged over the file's data.

Field resolution (first enabled namespace with a usable value wins):
  Tags:    digiKam → Windows → Lightroom → MediaPro → ACDSee → dc:subject → IPTC
  Rating:  xmp:Rating → ACDSee → Windows % → Exif 0x4746 → Exif 0x4749 % → IPTC Urgency
  Comment: dc:description → exif:UserComment → tiff:ImageDescription → ACDSee
           → JPEG comment → Exif ImageDescription → IPTC Caption

Run 'photometa gen-config' to generate a documented photometa.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding photometa.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve tags, rating, caption, GPS and orientation of dumps
    Resolve {
        /// Dump files or directories to search for *.json dumps
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Preferred caption language (e.g. fr-FR)
        #[arg(long)]
        lang: Option<String>,
        /// Ignore sidecars regardless of configuration
        #[arg(long)]
        no_sidecar: bool,
    },
    /// Write a 0-5 star rating
    SetRating { dump: PathBuf, stars: u8 },
    /// Replace the tag list (`/`-separated paths)
    SetTags { dump: PathBuf, tags: Vec<String> },
    /// Replace the caption; an empty caption clears it
    SetComment { dump: PathBuf, text: String },
    /// Coordinate conversions
    #[command(subcommand)]
    Gps(GpsCommand),
    /// Combine a stored orientation with rotate/flip actions
    Orientation {
        /// Stored Exif orientation code (1-8)
        code: i64,
        /// Actions in the order they are applied
        #[arg(long = "apply", value_enum)]
        actions: Vec<ActionArg>,
    },
    /// Print a stock photometa.toml with all options documented
    GenConfig {
        /// Print the built-in namespace catalog as a [catalog] section instead
        #[arg(long)]
        catalog: bool,
    },
    /// Validate photometa.toml and print the effective catalog
    CheckConfig,
}

#[derive(Subcommand)]
enum GpsCommand {
    /// Decimal degrees to XMP strings and Exif rationals
    Encode {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
        /// Altitude in meters, negative below sea level
        #[arg(long, allow_hyphen_values = true)]
        altitude: Option<f64>,
    },
    /// XMP coordinate string (e.g. 33,27.40734S) to decimal degrees
    Decode { value: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Rotate90,
    Rotate180,
    Rotate270,
    Hflip,
    Vflip,
}

impl From<ActionArg> for PrimitiveAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Rotate90 => PrimitiveAction::Rotate90,
            ActionArg::Rotate180 => PrimitiveAction::Rotate180,
            ActionArg::Rotate270 => PrimitiveAction::Rotate270,
            ActionArg::Hflip => PrimitiveAction::FlipHorizontal,
            ActionArg::Vflip => PrimitiveAction::FlipVertical,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _logger = logging::init_logging(&cli.log_level)?;

    match cli.command {
        Command::Resolve {
            paths,
            lang,
            no_sidecar,
        } => {
            let engine = config::load_config(&cli.config_dir)?;
            init_thread_pool(&engine.processing);
            let catalog = engine.namespace_catalog()?;
            let dumps = batch::collect_dumps(&paths);
            info!("event=resolve_start module=main dumps={}", dumps.len());
            let options = BatchOptions {
                language: lang,
                read_sidecars: engine.sidecar.read && !no_sidecar,
                naming: engine.sidecar.naming,
            };
            let results = batch::resolve_batch(&dumps, &catalog, &options);
            output::print_resolve_output(&results);
        }
        Command::SetRating { dump, stars } => {
            let engine = config::load_config(&cli.config_dir)?;
            let written = update_dump(&engine, &dump, |catalog, store| {
                FieldWriter::new(catalog, store).write_rating(stars)
            })?;
            println!("Rating {stars} written to {written} namespaces");
        }
        Command::SetTags { dump, tags } => {
            let engine = config::load_config(&cli.config_dir)?;
            let written = update_dump(&engine, &dump, |catalog, store| {
                FieldWriter::new(catalog, store).write_tags(&tags)
            })?;
            println!("{} tags written to {written} namespaces", tags.len());
        }
        Command::SetComment { dump, text } => {
            let engine = config::load_config(&cli.config_dir)?;
            let written = update_dump(&engine, &dump, |catalog, store| {
                FieldWriter::new(catalog, store).write_comment(&Comment::new(text.as_str()))
            })?;
            println!("Caption written to {written} namespaces");
        }
        Command::Gps(GpsCommand::Encode {
            latitude,
            longitude,
            altitude,
        }) => {
            let mut position = GpsPosition::new(latitude, longitude);
            if let Some(meters) = altitude {
                position = position.with_altitude(meters);
            }
            position.validate()?;
            output::print_gps_encoding(&position);
        }
        Command::Gps(GpsCommand::Decode { value }) => {
            let degrees = gps::string_to_coordinate(&value)
                .ok_or_else(|| format!("not a coordinate: {value}"))?;
            println!("{degrees}");
            if let Some(dms) = gps::to_user_presentable(&value) {
                println!("{dms}");
            }
        }
        Command::Orientation { code, actions } => {
            let actions: Vec<PrimitiveAction> = actions.into_iter().map(Into::into).collect();
            let result = orientation::rotate_orientation(code, &actions);
            output::print_orientation(ExifOrientation::from_code(code), &actions, result);
        }
        Command::GenConfig { catalog } => {
            if catalog {
                print!("{}", config::stock_catalog_toml()?);
            } else {
                print!("{}", config::stock_config_toml());
            }
        }
        Command::CheckConfig => {
            let engine = config::load_config(&cli.config_dir)?;
            output::print_catalog(&engine.namespace_catalog()?);
            println!("==> Configuration is valid");
        }
    }

    Ok(())
}

/// Load a dump with its sidecar, apply `edit`, and save to the configured targets.
fn update_dump<E>(
    engine: &EngineConfig,
    dump: &Path,
    edit: impl FnOnce(&NamespaceCatalog, &mut MemoryTagStore) -> Result<usize, E>,
) -> Result<usize, Box<dyn std::error::Error>>
where
    E: std::error::Error + 'static,
{
    let catalog = engine.namespace_catalog()?;
    let source = JsonSidecarSource::new(engine.sidecar.naming);
    let reconciler = SidecarReconciler::new(source, engine.sidecar.read);
    let file = batch::load_dump(dump)?;
    let mut reconciled = reconciler.reconcile(dump, file).store;

    let written = edit(&catalog, &mut reconciled)?;

    let writable = std::fs::metadata(dump)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false);
    let targets = sidecar::write_targets(engine.sidecar.writing_mode, writable);
    if targets.image {
        batch::save_dump(dump, &reconciled)?;
        info!("event=dump_saved module=main path={}", dump.display());
    }
    if targets.sidecar {
        let path = source.sidecar_path_for(dump);
        source.save(&path, &sidecar::sidecar_payload(&reconciled))?;
        info!("event=sidecar_saved module=main path={}", path.display());
    }
    if !targets.image && !targets.sidecar {
        return Err(format!("{} is read-only and the writing mode allows no sidecar", dump.display()).into());
    }
    Ok(written)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    batch::init_thread_pool(config::effective_threads(processing));
}
