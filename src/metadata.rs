use std::{collections::HashMap, fmt, time::Duration};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

pub const KEY_TITLE: &str = "xesam:title";
pub const KEY_ARTIST: &str = "xesam:artist";
pub const KEY_ALBUM: &str = "xesam:album";
pub const KEY_ART_URL: &str = "mpris:artUrl";
pub const KEY_LENGTH: &str = "mpris:length";
pub const KEY_TRACK_NUMBER: &str = "xesam:trackNumber";
/// Not an MPRIS key; callers may fold the separately polled status in here.
pub const KEY_STATUS: &str = "status";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
    #[default]
    Unknown,
}

impl PlaybackStatus {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("playing") {
            PlaybackStatus::Playing
        } else if value.eq_ignore_ascii_case("paused") {
            PlaybackStatus::Paused
        } else if value.eq_ignore_ascii_case("stopped") {
            PlaybackStatus::Stopped
        } else {
            PlaybackStatus::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
            PlaybackStatus::Stopped => "Stopped",
            PlaybackStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub art_reference: Option<String>,
    pub playback_status: PlaybackStatus,
    pub length: Option<Duration>,
    pub track_number: Option<u32>,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self::no_track()
    }
}

impl TrackMetadata {
    /// The snapshot used when nothing is playing or the player is gone.
    pub fn no_track() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            art_reference: None,
            playback_status: PlaybackStatus::Unknown,
            length: None,
            track_number: None,
        }
    }

    /// Builds a snapshot from raw player pairs. Missing or malformed fields
    /// fall back individually; this never fails.
    pub fn parse(raw: &HashMap<String, String>) -> Self {
        let text = |key: &str, fallback: &str| {
            raw.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        let art_reference = raw
            .get(KEY_ART_URL)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let playback_status = raw
            .get(KEY_STATUS)
            .map(|v| PlaybackStatus::parse(v))
            .unwrap_or_default();

        let length = raw
            .get(KEY_LENGTH)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|micros| *micros > 0)
            .map(Duration::from_micros);

        let track_number = raw
            .get(KEY_TRACK_NUMBER)
            .and_then(|v| v.trim().parse::<u32>().ok());

        Self {
            title: text(KEY_TITLE, UNKNOWN_TITLE),
            artist: text(KEY_ARTIST, UNKNOWN_ARTIST),
            album: text(KEY_ALBUM, UNKNOWN_ALBUM),
            art_reference,
            playback_status,
            length,
            track_number,
        }
    }

    pub fn with_status(mut self, status: PlaybackStatus) -> Self {
        self.playback_status = status;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playback_status == PlaybackStatus::Playing
    }
}

/// Splits `playerctl metadata` output into key/value pairs.
///
/// Lines look like `spotify xesam:title Some Song`. Lines without a value are
/// skipped. Repeated artist lines are joined; other repeats keep the last.
pub fn parse_playerctl_metadata(output: &str) -> HashMap<String, String> {
    let mut pairs: HashMap<String, String> = HashMap::new();

    for line in output.lines() {
        let Some((key, value)) = split_metadata_line(line) else {
            continue;
        };

        if key == KEY_ARTIST {
            if let Some(existing) = pairs.get_mut(key) {
                existing.push_str(", ");
                existing.push_str(value);
                continue;
            }
        }
        pairs.insert(key.to_string(), value.to_string());
    }

    pairs
}

fn split_metadata_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let (_player, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (key, value) = rest.split_once(char::is_whitespace)?;
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

pub fn format_length(length: Duration) -> String {
    let total_seconds = length.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_input_yields_fallback_snapshot() {
        let track = TrackMetadata::parse(&HashMap::new());
        assert_eq!(track.title, "Unknown Title");
        assert_eq!(track.artist, "Unknown Artist");
        assert_eq!(track.album, "Unknown Album");
        assert_eq!(track.art_reference, None);
        assert_eq!(track.playback_status, PlaybackStatus::Unknown);
        assert_eq!(track, TrackMetadata::no_track());
    }

    #[test]
    fn known_keys_are_mapped() {
        let track = TrackMetadata::parse(&pairs(&[
            ("xesam:title", "Song A"),
            ("xesam:artist", "Artist A"),
            ("xesam:album", "Album A"),
            ("mpris:artUrl", "http://x/a.png"),
            ("mpris:length", "215000000"),
            ("xesam:trackNumber", "4"),
            ("status", "Playing"),
        ]));
        assert_eq!(track.title, "Song A");
        assert_eq!(track.artist, "Artist A");
        assert_eq!(track.album, "Album A");
        assert_eq!(track.art_reference.as_deref(), Some("http://x/a.png"));
        assert_eq!(track.length, Some(Duration::from_secs(215)));
        assert_eq!(track.track_number, Some(4));
        assert!(track.is_playing());
    }

    #[test]
    fn malformed_fields_fall_back_individually() {
        let track = TrackMetadata::parse(&pairs(&[
            ("xesam:title", "Song A"),
            ("mpris:artUrl", "   "),
            ("mpris:length", "forever"),
            ("xesam:trackNumber", "-1"),
        ]));
        assert_eq!(track.title, "Song A");
        assert_eq!(track.art_reference, None);
        assert_eq!(track.length, None);
        assert_eq!(track.track_number, None);
    }

    #[test]
    fn playerctl_output_is_split_into_pairs() {
        let output = "\
spotify mpris:trackid /com/spotify/track/1
spotify xesam:title   Song   With  Spaces
spotify xesam:artist Artist A
spotify xesam:artist Artist B
spotify xesam:album
garbage
spotify mpris:artUrl https://i.scdn.co/image/abc
";
        let parsed = parse_playerctl_metadata(output);
        assert_eq!(parsed.get("xesam:title").map(String::as_str), Some("Song   With  Spaces"));
        assert_eq!(parsed.get("xesam:artist").map(String::as_str), Some("Artist A, Artist B"));
        assert!(!parsed.contains_key("xesam:album"));
        assert_eq!(
            parsed.get("mpris:artUrl").map(String::as_str),
            Some("https://i.scdn.co/image/abc")
        );
        assert_eq!(parsed.len(), 4);
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(PlaybackStatus::parse("Playing\n"), PlaybackStatus::Playing);
        assert_eq!(PlaybackStatus::parse("paused"), PlaybackStatus::Paused);
        assert_eq!(PlaybackStatus::parse("STOPPED"), PlaybackStatus::Stopped);
        assert_eq!(PlaybackStatus::parse("No players found"), PlaybackStatus::Unknown);
    }

    #[test]
    fn lengths_format_like_a_player_clock() {
        assert_eq!(format_length(Duration::from_secs(215)), "3:35");
        assert_eq!(format_length(Duration::from_secs(3725)), "1:02:05");
    }
}
