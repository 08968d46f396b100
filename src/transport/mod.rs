//! Hand-off of the finished site config to the rendering layer through a
//! size-bounded buffer.
//!
//! Packing is reactive: each tier is serialized and written, and only a failed
//! write moves on to the next tier. Nothing estimates the size up front.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use fs_err as fs;
use parking_lot::Mutex;
use thiserror::Error;

use crate::wire::{Image, SiteConfig};

pub const SITE_CONFIG_KEY: &str = "siteConfig";
pub const MAX_IMAGES: usize = 3;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport buffer full: {needed} bytes needed, {available} available")]
    Overflow { needed: usize, available: usize },
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A keyed byte store with a fixed total capacity.
pub trait TransportBuffer: Send + Sync {
    /// Replaces any existing value under `key`. Fails without side effects when
    /// the new total would exceed capacity.
    fn store(&self, key: &str, payload: &[u8]) -> Result<(), TransportError>;

    fn load(&self, key: &str) -> Result<Option<Bytes>, TransportError>;

    fn capacity(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Full config, thumbnails only, at most `MAX_IMAGES` images.
    Optimized,
    /// Theme, palette, pages and metadata; no images.
    Minimal,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Optimized => "optimized",
            Tier::Minimal => "minimal",
        }
    }
}

#[derive(Debug)]
pub struct Packed {
    pub tier: Tier,
    pub bytes: usize,
    pub config: SiteConfig,
}

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Your site is too large to preview. Try using fewer images or shorter content.")]
    TooLarge {
        optimized_bytes: usize,
        minimal_bytes: usize,
        #[source]
        source: TransportError,
    },
}

impl PackError {
    /// Resubmitting the same content would overflow again.
    pub fn retryable(&self) -> bool {
        false
    }
}

/// Tier 0: every image points at its thumbnail and only the first
/// `MAX_IMAGES` are kept.
pub fn optimize(config: &SiteConfig) -> SiteConfig {
    let images = config.images.iter().take(MAX_IMAGES).map(thumbnail_only).collect();
    SiteConfig { images, ..config.clone() }
}

fn thumbnail_only(image: &Image) -> Image {
    let mut out = image.clone();
    out.urls.medium = image.urls.thumbnail.clone();
    out.urls.full = image.urls.thumbnail.clone();
    out
}

/// Tier 1: drops images entirely.
pub fn minimal(config: &SiteConfig) -> SiteConfig {
    SiteConfig {
        theme: config.theme,
        color_palette: config.color_palette.clone(),
        pages: config.pages.clone(),
        metadata: config.metadata.clone(),
        images: Vec::new(),
    }
}

fn attempt(buffer: &dyn TransportBuffer, config: &SiteConfig) -> (usize, Result<(), TransportError>) {
    match serde_json::to_vec(config) {
        Ok(payload) => (payload.len(), buffer.store(SITE_CONFIG_KEY, &payload)),
        Err(e) => (0, Err(e.into())),
    }
}

pub fn pack(config: &SiteConfig, buffer: &dyn TransportBuffer) -> Result<Packed, PackError> {
    let optimized = optimize(config);
    let (optimized_bytes, result) = attempt(buffer, &optimized);
    match result {
        Ok(()) => {
            tracing::info!(bytes = optimized_bytes, images = optimized.images.len(), "stored optimized site config");
            return Ok(Packed { tier: Tier::Optimized, bytes: optimized_bytes, config: optimized });
        }
        Err(e) => {
            tracing::warn!(error = %e, bytes = optimized_bytes, "optimized site config did not fit, dropping images");
        }
    }

    let reduced = minimal(config);
    let (minimal_bytes, result) = attempt(buffer, &reduced);
    match result {
        Ok(()) => {
            tracing::info!(bytes = minimal_bytes, "stored minimal site config");
            Ok(Packed { tier: Tier::Minimal, bytes: minimal_bytes, config: reduced })
        }
        Err(source) => {
            tracing::error!(error = %source, bytes = minimal_bytes, capacity = buffer.capacity(), "site config does not fit even without images");
            Err(PackError::TooLarge { optimized_bytes, minimal_bytes, source })
        }
    }
}

/// Reads back what `pack` stored.
pub fn unpack(buffer: &dyn TransportBuffer) -> Result<Option<SiteConfig>, TransportError> {
    match buffer.load(SITE_CONFIG_KEY)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// In-process buffer. Capacity is shared across keys.
pub struct MemoryTransport {
    limit: usize,
    entries: Mutex<HashMap<String, Bytes>>,
}

impl MemoryTransport {
    pub fn new(limit: usize) -> Self {
        Self { limit, entries: Mutex::new(HashMap::new()) }
    }

    pub fn used(&self) -> usize {
        self.entries.lock().values().map(Bytes::len).sum()
    }
}

impl TransportBuffer for MemoryTransport {
    fn store(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut entries = self.entries.lock();
        let others: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        let available = self.limit.saturating_sub(others);
        if payload.len() > available {
            return Err(TransportError::Overflow { needed: payload.len(), available });
        }
        entries.insert(key.to_string(), Bytes::copy_from_slice(payload));
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Bytes>, TransportError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn capacity(&self) -> usize {
        self.limit
    }
}

/// Directory-backed buffer, one `<key>.json` file per entry.
pub struct FileTransport {
    dir: PathBuf,
    limit: usize,
}

impl FileTransport {
    pub fn new(dir: impl AsRef<Path>, limit: usize) -> Result<Self, TransportError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, limit })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn used_except(&self, skip: &Path) -> Result<usize, TransportError> {
        let mut total = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path() == skip {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                total += meta.len() as usize;
            }
        }
        Ok(total)
    }
}

impl TransportBuffer for FileTransport {
    fn store(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let path = self.path_for(key);
        let available = self.limit.saturating_sub(self.used_except(&path)?);
        if payload.len() > available {
            return Err(TransportError::Overflow { needed: payload.len(), available });
        }
        let staged = path.with_extension("json.tmp");
        if let Err(err) = fs::write(&staged, payload).and_then(|_| fs::rename(&staged, &path)) {
            let _ = fs::remove_file(&staged);
            return Err(err.into());
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Bytes>, TransportError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Bytes::from(fs::read(&path)?)))
    }

    fn capacity(&self) -> usize {
        self.limit
    }
}
