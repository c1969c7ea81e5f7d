mod overlay;

use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Target};
use log::{warn, LevelFilter};
use now_playing_overlay::{
    player::Playerctl, Config, HttpArtworkSource, Poller, ThemeImage, ThemeResult,
};

#[derive(Parser)]
#[command(name = "now_playing_overlay")]
#[command(version)]
#[command(about = "Fullscreen now-playing overlay themed from the album art")]
struct Cli {
    /// Path to the config TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// playerctl player name (e.g. spotify)
    #[arg(short, long)]
    player: Option<String>,

    /// Run in a normal decorated window instead of fullscreen
    #[arg(long)]
    windowed: bool,

    /// Reload the config file when it changes
    #[arg(long)]
    watch_config: bool,

    /// Poll once, print the track and palette, and exit
    #[arg(long)]
    once: bool,
}

fn init_logger() {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
        return;
    }
    Builder::new()
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .filter_module("now_playing_overlay", LevelFilter::Info)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|err| {
            warn!("{err:#}; using defaults");
            Config::default()
        }),
    };

    if let Some(player) = &cli.player {
        config.player.name = Some(player.clone());
    }
    if cli.windowed {
        config.display.fullscreen = false;
        config.display.always_on_top = false;
    }
    Ok(config)
}

fn print_once(config: &Config) {
    let mut poller = Poller::new(
        Playerctl::new(config.player.name.clone()),
        HttpArtworkSource::new(config.artwork.fetch_timeout),
        config,
    );
    let update = poller.tick();
    let track = &update.track;

    if !update.player_available {
        println!("No track playing");
    }
    println!("title:   {}", track.title);
    println!("artist:  {}", track.artist);
    println!("album:   {}", track.album);
    println!("status:  {}", track.playback_status);
    if let Some(art) = &track.art_reference {
        println!("artwork: {art}");
    }

    if let ThemeResult::Placeholder(theme) | ThemeResult::Resolved(theme) = &update.theme {
        let kind = match &theme.artwork {
            ThemeImage::Solid { .. } => "placeholder",
            ThemeImage::Bitmap(_) => "album art",
        };
        println!("theme:   {kind}");
        println!("  strong {}  {}", theme.palette.strong.to_hex(), theme.palette.strong);
        println!("  medium {}  {}", theme.palette.medium.to_hex(), theme.palette.medium);
        println!("  base   {}  {}", theme.palette.base.to_hex(), theme.palette.base);
    }
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.once {
        print_once(&config);
        return Ok(());
    }

    overlay::run(config, cli.watch_config)
}
