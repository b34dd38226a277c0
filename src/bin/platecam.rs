//! CLI for Platecam - menu text to food photography.

use clap::{Args, Parser, Subcommand, ValueEnum};
use platecam::{
    EncodedImage, GeminiBackend, GenerativeBackend, ImageEditor, PhotoStyle, Settings, Studio,
    EXAMPLE_MENU,
};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "platecam")]
#[command(about = "Generate food photography for every dish on a menu")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Photograph every dish in a menu
    Generate(GenerateArgs),

    /// Edit a photo with a plain-language instruction
    Edit(EditArgs),

    /// List photographic styles
    Styles,

    /// Verify the API key and models
    Check,
}

#[derive(Args)]
struct GenerateArgs {
    /// Menu text file ("-" reads stdin)
    #[arg(required_unless_present = "example")]
    menu: Option<PathBuf>,

    /// Use the bundled example menu
    #[arg(long, conflicts_with = "menu")]
    example: bool,

    /// Photographic style
    #[arg(short, long, value_enum, default_value = "bright-modern")]
    style: StyleArg,

    /// Directory to write photos into
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Args)]
struct EditArgs {
    /// Image to edit
    input: PathBuf,

    /// What to change (e.g. "add steam", "make it black and white")
    #[arg(short, long)]
    instruction: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StyleArg {
    RusticDark,
    BrightModern,
    SocialMedia,
}

impl From<StyleArg> for PhotoStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::RusticDark => PhotoStyle::RusticDark,
            StyleArg::BrightModern => PhotoStyle::BrightModern,
            StyleArg::SocialMedia => PhotoStyle::SocialMedia,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Edit(args) => edit(args, cli.json).await?,
        Commands::Styles => list_styles(cli.json)?,
        Commands::Check => check(cli.json).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "platecam=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn backend(settings: &Settings) -> anyhow::Result<Arc<dyn GenerativeBackend>> {
    Ok(Arc::new(GeminiBackend::from_settings(settings.clone())?))
}

fn read_menu(args: &GenerateArgs) -> anyhow::Result<String> {
    if args.example {
        return Ok(EXAMPLE_MENU.to_string());
    }
    match args.menu.as_deref() {
        Some(path) if path == Path::new("-") => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => anyhow::bail!("no menu given (pass a file, '-' or --example)"),
    }
}

/// Picks a file name in `dir` that no earlier photo of this run has taken.
fn unique_path(dir: &Path, file_name: &str, taken: &mut HashSet<String>) -> PathBuf {
    let mut candidate = file_name.to_string();
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };
    let mut n = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{stem}_{n}{ext}");
        n += 1;
    }
    dir.join(candidate)
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let menu = read_menu(&args)?;
    let style = PhotoStyle::from(args.style);

    let settings = Settings::from_env();
    let mut studio = Studio::from_settings(backend(&settings)?, &settings);

    let images = studio.request_generation(&menu, style).await?;

    std::fs::create_dir_all(&args.out_dir)?;
    let mut taken = HashSet::new();
    let mut saved = Vec::with_capacity(images.len());
    for image in images {
        let path = unique_path(&args.out_dir, &image.suggested_file_name(), &mut taken);
        image.image.save(&path)?;
        saved.push((image, path));
    }

    if json_output {
        let entries: Vec<_> = saved
            .iter()
            .map(|(image, path)| {
                serde_json::json!({
                    "id": image.id,
                    "dish": image.dish_name,
                    "output": path.display().to_string(),
                    "mime_type": image.image.mime_type(),
                    "size_bytes": image.image.size(),
                })
            })
            .collect();
        let result = serde_json::json!({
            "success": true,
            "style": style.as_str(),
            "images": entries,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Generated {} photos ({}):", saved.len(), style.label());
        for (image, path) in &saved {
            println!(
                "  {} -> {} ({} bytes)",
                image.dish_name,
                path.display(),
                image.image.size()
            );
        }
    }

    Ok(())
}

async fn edit(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let input = EncodedImage::load(&args.input)?;

    let settings = Settings::from_env();
    let editor = ImageEditor::new(backend(&settings)?).with_timeout(settings.edit_timeout);

    let image = editor.edit_image(&input, &args.instruction).await?;

    let expected = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .and_then(platecam::ImageFormat::from_extension);
    if expected.is_some_and(|f| f != image.format) {
        tracing::warn!(
            output = %args.output.display(),
            actual = image.mime_type(),
            "output extension does not match the returned image format"
        );
    }
    image.save(&args.output)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": args.output.display().to_string(),
            "mime_type": image.mime_type(),
            "size_bytes": image.size(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Edited image: {} ({} bytes, {})",
            args.output.display(),
            image.size(),
            image.mime_type()
        );
    }

    Ok(())
}

fn list_styles(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct StyleInfo {
        name: &'static str,
        label: &'static str,
        prompt_suffix: &'static str,
    }

    let styles: Vec<_> = PhotoStyle::ALL
        .iter()
        .map(|s| StyleInfo {
            name: s.as_str(),
            label: s.label(),
            prompt_suffix: s.prompt_suffix(),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&styles)?);
    } else {
        println!("Available styles:\n");
        for s in &styles {
            println!("  {} ({})", s.name, s.label);
            println!("    {}", s.prompt_suffix);
        }
    }

    Ok(())
}

async fn check(json_output: bool) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let backend = backend(&settings)?;
    let result = backend.health_check().await;

    if json_output {
        let report = serde_json::json!({
            "backend": backend.name(),
            "configured": settings.is_configured(),
            "text_model": settings.text_model,
            "image_model": settings.image_model,
            "edit_model": settings.edit_model,
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &result {
            Ok(()) => println!("{}: OK", backend.name()),
            Err(e) => println!("{}: {}", backend.name(), e),
        }
    }

    result.map_err(Into::into)
}
