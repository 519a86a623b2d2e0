mod inspect;

use clap::{Parser, Subcommand, ValueEnum};
use eyre_pretty::{Context, Result, bail};
use nrofmt::{Editor, asset::SectionKind, nacp::FieldPolicy};
use std::path::PathBuf;

/// Start-of-image marker of a JPEG file.
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExtractKind {
    Icon,
    Nacp,
    Romfs,
}

impl From<ExtractKind> for SectionKind {
    fn from(kind: ExtractKind) -> Self {
        match kind {
            ExtractKind::Icon => SectionKind::Icon,
            ExtractKind::Nacp => SectionKind::Nacp,
            ExtractKind::Romfs => SectionKind::RomFs,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect a .nro file
    Inspect {
        /// Path to the input file
        #[arg(short, long)]
        input: PathBuf,
        /// Whether to list the name and author of every language
        #[arg(long, default_value_t = false)]
        languages: bool,
    },
    /// Edit the metadata and icon of a .nro file
    ///
    /// Fields that are not given keep their current value.
    Edit(EditArgs),
    /// Extract a section of a .nro file
    Extract {
        /// Section to extract
        kind: ExtractKind,
        /// Path to the input file
        #[arg(short, long)]
        input: PathBuf,
        /// Path to the output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// A CLI to inspect and edit the assets of Nintendo Switch homebrew.
///
/// Supported formats: .nro.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Action to take
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct EditArgs {
    /// Path to the input file
    #[arg(short, long)]
    input: PathBuf,
    /// Path to the output file. Defaults to editing the input in place
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// New application title
    #[arg(long)]
    title: Option<String>,
    /// New application author
    #[arg(long)]
    author: Option<String>,
    /// New application version
    #[arg(long)]
    version: Option<String>,
    /// Path to the new icon, a 256x256 JPEG
    #[arg(long)]
    icon: Option<PathBuf>,
    /// Fail instead of truncating fields that are too long
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn edit(args: EditArgs) -> Result<()> {
    println!("-> Opening '{}'...", args.input.display());
    let bytes = std::fs::read(&args.input).context("reading input file")?;
    let mut editor = Editor::open(bytes).context("parsing .nro")?;
    inspect::print_metadata("Original Metadata", &editor);

    if args.strict {
        editor.set_policy(FieldPolicy::Strict);
    }

    let mut changed = false;
    if let Some(path) = args.icon {
        let icon = std::fs::read(&path).context("reading icon file")?;
        if !icon.starts_with(&JPEG_SOI) {
            tracing::warn!(path = %path.display(), "icon does not look like a JPEG");
        }

        println!("-> Going to update the icon to '{}'!", path.display());
        editor.set_icon(icon);
        changed = true;
    }

    let mut metadata = editor.metadata().clone();
    let fields = [
        (&mut metadata.name, args.title),
        (&mut metadata.author, args.author),
        (&mut metadata.version, args.version),
    ];

    for (field, value) in fields {
        if let Some(value) = value {
            *field = value;
            changed = true;
        }
    }

    if !changed {
        tracing::warn!("no changes were made");
        return Ok(());
    }

    editor.set_metadata(metadata);
    let out = editor.serialize().context("serializing .nro")?;

    let output = args.output.unwrap_or(args.input);
    println!("-> Saving '{}'...", output.display());
    std::fs::write(&output, &out).context("writing output file")?;

    let saved = Editor::open(out).context("parsing saved .nro")?;
    println!("-> NRO was updated!");
    inspect::print_metadata("New Metadata", &saved);

    Ok(())
}

fn extract(kind: SectionKind, input: PathBuf, output: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&input).context("reading input file")?;
    let editor = Editor::open(bytes).context("parsing .nro")?;

    let section = editor.assets().section(kind);
    if !section.is_present() {
        bail!("the {kind} section is absent");
    }

    std::fs::write(&output, section.bytes()).context("writing output file")?;
    tracing::info!(%kind, size = section.len(), "extracted section");

    Ok(())
}

fn setup_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or(EnvFilter::new("nrotool=info,nrofmt=info"));

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(env_filter);

    subscriber.init();
}

fn main() -> Result<()> {
    eyre_pretty::install()?;
    setup_tracing();

    let config = Args::parse();
    match config.command {
        Command::Inspect { input, languages } => inspect::inspect_nro(input, languages),
        Command::Edit(args) => edit(args),
        Command::Extract {
            kind,
            input,
            output,
        } => extract(kind.into(), input, output),
    }
}
