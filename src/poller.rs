use log::info;

use crate::{
    artwork::ArtworkSource,
    config::Config,
    engine::{EngineState, ThemeEngine, ThemeResult},
    metadata::TrackMetadata,
    player::MediaPlayer,
    session::{SessionRunner, SessionState},
};

/// One poll's worth of state for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    pub track: TrackMetadata,
    /// False when no player answered this tick.
    pub player_available: bool,
    pub theme: ThemeResult,
}

/// Sequential poll loop body: player, snapshot, theme, session.
pub struct Poller<P, S> {
    player: P,
    engine: ThemeEngine<S>,
    state: EngineState,
    session: SessionRunner,
}

impl<P: MediaPlayer, S: ArtworkSource> Poller<P, S> {
    pub fn new(player: P, source: S, config: &Config) -> Self {
        Self {
            player,
            engine: ThemeEngine::new(source, config.theme.clone()),
            state: EngineState::new(config.artwork.cache_capacity),
            session: SessionRunner::new(config.session.clone()),
        }
    }

    pub fn tick(&mut self) -> PollUpdate {
        let raw = self.player.snapshot();
        let player_available = raw.is_some();
        let track = raw
            .map(|raw| raw.to_track())
            .unwrap_or_else(TrackMetadata::no_track);

        let theme = self
            .engine
            .resolve(track.art_reference.as_deref(), &mut self.state);
        self.session.observe(track.playback_status);

        PollUpdate {
            track,
            player_available,
            theme,
        }
    }

    /// Applies a reloaded config. The next tick re-renders the current
    /// artwork from the cache.
    pub fn apply_config(&mut self, config: &Config) {
        info!("Applying reloaded config");
        self.engine.set_settings(config.theme.clone());
        self.state
            .cache_mut()
            .set_capacity(config.artwork.cache_capacity);
        self.session.set_config(config.session.clone());
        self.engine.invalidate(&mut self.state);
    }

    /// Replaces the player queried from the next tick on.
    pub fn set_player(&mut self, player: P) {
        self.player = player;
    }

    pub fn set_source(&mut self, source: S) {
        self.engine.set_source(source);
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn engine(&self) -> &ThemeEngine<S> {
        &self.engine
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }
}
