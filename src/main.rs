use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use image::ImageReader;
use tracing_subscriber::EnvFilter;

use roadwatch::core::db::ReportDb;
use roadwatch::detection::{Annotator, DEFAULT_CONFIDENCE_THRESHOLD, DamageDetector};
use roadwatch::server::{self, AppState};

#[derive(Parser)]
#[command(name = "roadwatch")]
#[command(about = "Detect and report road damage (potholes, waste) from images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP reporting service
    Serve(ServeArgs),
    /// Run detection once over a local image
    Detect(DetectArgs),
}

#[derive(Args)]
struct ModelArgs {
    /// Path to the pothole detection model (ONNX)
    #[arg(long, env = "ROADWATCH_POTHOLE_MODEL")]
    pothole_model: PathBuf,

    /// Path to the waste detection model (ONNX)
    #[arg(long, env = "ROADWATCH_WASTE_MODEL")]
    waste_model: PathBuf,

    /// Confidence threshold applied to both detectors
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    threshold: f32,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    models: ModelArgs,

    /// Directory holding the report database and stored images
    #[arg(long, env = "ROADWATCH_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Address to listen on
    #[arg(long, env = "ROADWATCH_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// TTF/OTF font for box labels; boxes only when omitted
    #[arg(long, env = "ROADWATCH_LABEL_FONT")]
    font: Option<PathBuf>,
}

#[derive(Args)]
struct DetectArgs {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    #[command(flatten)]
    models: ModelArgs,

    /// Write the annotated image here
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// TTF/OTF font for box labels
    #[arg(long, env = "ROADWATCH_LABEL_FONT")]
    font: Option<PathBuf>,
}

fn build_detector(models: &ModelArgs, font: Option<&PathBuf>) -> anyhow::Result<DamageDetector> {
    let mut detector =
        DamageDetector::load_models(&models.pothole_model, &models.waste_model, models.threshold)?;
    if let Some(font_path) = font {
        detector = detector.with_annotator(Annotator::new().with_font_file(font_path)?);
    }
    Ok(detector)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Serve(args) => {
            let detector = Arc::new(build_detector(&args.models, args.font.as_ref())?);
            let db = ReportDb::open(&args.data_dir).await?;
            server::serve(AppState { detector, db }, &args.bind).await
        }
        Command::Detect(args) => {
            let img = ImageReader::open(&args.image_path)?
                .decode()
                .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;

            let detector = build_detector(&args.models, args.font.as_ref())?;
            let assessment = detector.assess(&img)?;

            println!("Damage type: {}", assessment.class);
            println!("Confidence:  {:.2}", assessment.confidence);
            println!(
                "Detections:  {} pothole, {} waste",
                assessment.pothole_count, assessment.waste_count
            );

            if let Some(out) = args.out {
                assessment
                    .annotated
                    .save_with_format(&out, image::ImageFormat::Png)?;
                println!("Annotated image written to {:?}", out);
            }
            Ok(())
        }
    }
}
