use std::{collections::HashMap, process::Command};

use log::debug;

use crate::metadata::{parse_playerctl_metadata, PlaybackStatus, TrackMetadata};

/// What one poll of the media player returned, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSnapshot {
    pub pairs: HashMap<String, String>,
    pub status: String,
}

impl RawSnapshot {
    pub fn to_track(&self) -> TrackMetadata {
        TrackMetadata::parse(&self.pairs).with_status(PlaybackStatus::parse(&self.status))
    }
}

pub trait MediaPlayer {
    /// `None` when no player is reachable.
    fn snapshot(&self) -> Option<RawSnapshot>;
}

/// Talks to MPRIS players through the `playerctl` binary.
#[derive(Debug, Clone, Default)]
pub struct Playerctl {
    player: Option<String>,
}

impl Playerctl {
    pub fn new(player: Option<String>) -> Self {
        Self { player }
    }

    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    fn run(&self, args: &[&str]) -> Option<String> {
        let mut command = Command::new("playerctl");
        if let Some(player) = &self.player {
            command.arg("--player").arg(player);
        }
        command.args(args);

        let output = match command.output() {
            Ok(output) => output,
            Err(err) => {
                debug!("playerctl unavailable: {err}");
                return None;
            }
        };

        if !output.status.success() {
            debug!(
                "playerctl {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl MediaPlayer for Playerctl {
    fn snapshot(&self) -> Option<RawSnapshot> {
        let metadata = self.run(&["metadata"])?;
        let pairs = parse_playerctl_metadata(&metadata);
        if pairs.is_empty() {
            return None;
        }
        let status = self.run(&["status"]).unwrap_or_default();
        Some(RawSnapshot {
            pairs,
            status: status.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_snapshot_folds_status_into_track() {
        let snapshot = RawSnapshot {
            pairs: parse_playerctl_metadata("spotify xesam:title Song A\n"),
            status: "Paused".to_string(),
        };
        let track = snapshot.to_track();
        assert_eq!(track.title, "Song A");
        assert_eq!(track.playback_status, PlaybackStatus::Paused);
    }

    #[test]
    fn empty_snapshot_is_unknown_track() {
        let track = RawSnapshot::default().to_track();
        assert_eq!(track, TrackMetadata::no_track());
    }
}
