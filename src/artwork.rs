use std::{
    collections::{HashMap, VecDeque},
    fs,
    io::Read,
    path::Path,
    sync::Arc,
    time::Duration,
};

use image::RgbImage;
use log::debug;
use thiserror::Error;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

const USER_AGENT: &str = concat!("now_playing_overlay/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("artwork request failed: {0}")]
    Fetch(String),

    #[error("artwork read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("artwork response for {0} was empty")]
    Empty(String),

    #[error("failed to decode artwork: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to open local artwork {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ureq::Error> for ArtworkError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(code, response) => {
                ArtworkError::Fetch(format!("{} returned HTTP {code}", response.get_url()))
            }
            ureq::Error::Transport(transport) => ArtworkError::Fetch(transport.to_string()),
        }
    }
}

/// Turns an art reference into raw image bytes.
pub trait ArtworkSource {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, ArtworkError>;
}

impl<S: ArtworkSource + ?Sized> ArtworkSource for &S {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, ArtworkError> {
        (**self).fetch(reference)
    }
}

/// Fetches `http(s)://` references over the network and `file://` or bare
/// absolute paths from disk.
#[derive(Debug)]
pub struct HttpArtworkSource {
    agent: ureq::Agent,
}

impl HttpArtworkSource {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }

    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, ArtworkError> {
        let response = self.agent.get(url).call()?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(ArtworkError::Read)?;
        if bytes.is_empty() {
            return Err(ArtworkError::Empty(url.to_string()));
        }
        debug!("Fetched {} bytes of artwork from {url}", bytes.len());
        Ok(bytes)
    }

    fn fetch_local(path: &str) -> Result<Vec<u8>, ArtworkError> {
        let bytes = fs::read(Path::new(path)).map_err(|source| ArtworkError::Io {
            path: path.to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(ArtworkError::Empty(path.to_string()));
        }
        Ok(bytes)
    }
}

impl Default for HttpArtworkSource {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl ArtworkSource for HttpArtworkSource {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, ArtworkError> {
        if let Some(path) = local_path(reference) {
            return Self::fetch_local(path);
        }
        self.fetch_remote(reference)
    }
}

fn local_path(reference: &str) -> Option<&str> {
    if let Some(path) = reference.strip_prefix("file://") {
        return Some(path);
    }
    if reference.starts_with('/') {
        return Some(reference);
    }
    None
}

/// Decodes any supported raster format and normalizes it to 8-bit RGB.
pub fn decode_artwork(bytes: &[u8]) -> Result<RgbImage, ArtworkError> {
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgb8())
}

/// Decoded artwork keyed by reference, evicting the least recently used
/// entry once `capacity` is reached.
#[derive(Debug)]
pub struct ArtworkCache {
    capacity: usize,
    entries: HashMap<String, Arc<RgbImage>>,
    // front = most recent, back = least recent
    recency: VecDeque<String>,
}

impl ArtworkCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    /// Returns the entry and marks it most recently used.
    pub fn get(&mut self, reference: &str) -> Option<Arc<RgbImage>> {
        let image = self.entries.get(reference).cloned()?;
        self.touch(reference);
        Some(image)
    }

    pub fn insert(&mut self, reference: &str, image: Arc<RgbImage>) {
        if self.entries.insert(reference.to_string(), image).is_some() {
            self.touch(reference);
            return;
        }

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.recency.pop_back() else {
                break;
            };
            debug!("Evicting cached artwork {oldest}");
            self.entries.remove(&oldest);
        }
        self.recency.push_front(reference.to_string());
    }

    /// Changes the capacity, evicting as needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.recency.pop_back() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    fn touch(&mut self, reference: &str) {
        if let Some(pos) = self.recency.iter().position(|r| r == reference) {
            if let Some(entry) = self.recency.remove(pos) {
                self.recency.push_front(entry);
            }
        }
    }
}

impl Default for ArtworkCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
