//! Now-playing overlay core: MPRIS metadata snapshots and an album-art
//! driven theme engine.

pub mod artwork;
pub mod color;
pub mod config;
pub mod engine;
pub mod metadata;
pub mod player;
pub mod poller;
pub mod session;

pub use artwork::{ArtworkCache, ArtworkError, ArtworkSource, HttpArtworkSource};
pub use color::{Palette, Rgb};
pub use config::Config;
pub use engine::{EngineState, Theme, ThemeEngine, ThemeImage, ThemeResult, ThemeSettings};
pub use metadata::{PlaybackStatus, TrackMetadata};
pub use poller::{PollUpdate, Poller};
