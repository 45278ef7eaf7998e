use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use greeting_compositor::{
    composition::{CompositionEngine, CompositionSpec},
    config::Config,
    fetch,
    video::EncoderPreset,
};

#[derive(Parser)]
#[command(
    name = "greeting-compositor",
    version,
    about = "Bracket a generated clip with intro and outro into a portrait greeting video",
    long_about = "Greeting-Compositor letterboxes an AI-generated clip to 1080x1920, joins it between a fixed intro and outro, fits background music to the result and writes an H.264/AAC MP4."
)]
struct Cli {
    /// Generated clip: local path or http(s) URL
    #[arg(short, long)]
    generated: String,

    /// Intro clip (overrides configuration)
    #[arg(long)]
    intro: Option<PathBuf>,

    /// Outro clip (overrides configuration)
    #[arg(long)]
    outro: Option<PathBuf>,

    /// Background music file (overrides configuration)
    #[arg(long, conflicts_with = "no_bgm")]
    bgm: Option<PathBuf>,

    /// Compose without background music
    #[arg(long)]
    no_bgm: bool,

    /// x264 speed/quality preset
    #[arg(short, long, value_enum)]
    preset: Option<EncoderPreset>,

    /// Mix background music with the clips' own audio instead of replacing it
    #[arg(long)]
    mix_source_audio: bool,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Copy the result here instead of leaving it in the temp directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    info!("Starting Greeting-Compositor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    if let Some(intro) = &cli.intro {
        config.assets.intro = intro.clone();
    }
    if let Some(outro) = &cli.outro {
        config.assets.outro = outro.clone();
    }
    if let Some(preset) = cli.preset {
        config.output.preset = preset;
    }
    if cli.mix_source_audio {
        config.audio.mix_source_audio = true;
    }
    config.validate()?;

    let mut spec = CompositionSpec::from_config(&config);
    if cli.no_bgm {
        spec = spec.without_background_music();
    } else if let Some(bgm) = &cli.bgm {
        spec = spec.with_background_music(bgm);
    }
    let engine = CompositionEngine::with_spec(spec);

    // Fetch the generated clip if it lives behind a URL
    let remote = fetch::is_remote(&cli.generated);
    let generated = if remote {
        fetch::download_clip_to_temp(&cli.generated, config.output.temp_dir.as_deref()).await?
    } else {
        PathBuf::from(&cli.generated)
    };

    info!("Starting composition process...");
    let outcome = engine.compose_in_background(generated.clone()).await;

    if remote {
        if let Err(e) = tokio::fs::remove_file(&generated).await {
            warn!("Could not remove downloaded clip {:?}: {}", generated, e);
        }
    }

    let video = match outcome {
        Ok(video) => video,
        Err(e) => {
            error!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let final_path = match &cli.output {
        Some(output) => {
            tokio::fs::copy(&video.path, output).await?;
            tokio::fs::remove_file(&video.path).await?;
            output.clone()
        }
        None => video.path.clone(),
    };

    info!("Composition complete! Output saved to: {:?}", final_path);
    println!("{}", final_path.display());
    Ok(())
}
