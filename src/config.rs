//! Configuration management for lazy-image-io.
//!
//! Runtime knobs live in [`Settings`], a process-wide value loaded from the
//! environment the first time it is read and replaceable with [`configure`].
//! The command-line front end ([`Cli`]) exposes the same knobs as arguments
//! with environment fallbacks.
//!
//! # Environment Variables
//!
//! - `LAZY_IMAGE_CONCURRENCY` - Strips evaluated in parallel (default: number of CPUs)
//! - `LAZY_IMAGE_TILE_HEIGHT` - Rows per evaluation strip (default: 16)
//! - `LAZY_IMAGE_BLOCK_SIZE` - Block size for native file reads (default: 64KB)
//! - `LAZY_IMAGE_CACHE_BLOCKS` - Blocks cached per native file (default: 256)

use std::sync::{PoisonError, RwLock};

use clap::{Args, Parser, Subcommand};
use once_cell::sync::Lazy;

use crate::io::{DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default number of rows per evaluation strip.
pub const DEFAULT_TILE_HEIGHT: u32 = 16;

pub const ENV_CONCURRENCY: &str = "LAZY_IMAGE_CONCURRENCY";
pub const ENV_TILE_HEIGHT: &str = "LAZY_IMAGE_TILE_HEIGHT";
pub const ENV_BLOCK_SIZE: &str = "LAZY_IMAGE_BLOCK_SIZE";
pub const ENV_CACHE_BLOCKS: &str = "LAZY_IMAGE_CACHE_BLOCKS";

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// =============================================================================
// Settings
// =============================================================================

/// Process-wide runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Number of strips evaluated at the same time
    pub concurrency: usize,
    /// Rows per evaluation strip
    pub tile_height: u32,
    /// Block size in bytes for native file reads
    pub block_size: usize,
    /// Blocks kept in each native file's cache
    pub block_cache_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            tile_height: DEFAULT_TILE_HEIGHT,
            block_size: DEFAULT_BLOCK_SIZE,
            block_cache_capacity: DEFAULT_BLOCK_CACHE_CAPACITY,
        }
    }
}

impl Settings {
    /// Defaults overridden by any `LAZY_IMAGE_*` variables that parse.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(v) = lookup(ENV_CONCURRENCY).and_then(|v| v.parse().ok()) {
            settings.concurrency = v;
        }
        if let Some(v) = lookup(ENV_TILE_HEIGHT).and_then(|v| v.parse().ok()) {
            settings.tile_height = v;
        }
        if let Some(v) = lookup(ENV_BLOCK_SIZE).and_then(|v| v.parse().ok()) {
            settings.block_size = v;
        }
        if let Some(v) = lookup(ENV_CACHE_BLOCKS).and_then(|v| v.parse().ok()) {
            settings.block_cache_capacity = v;
        }
        settings
    }

    /// Validate the settings and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.tile_height == 0 {
            return Err("tile_height must be greater than 0".to_string());
        }
        if self.block_cache_capacity == 0 {
            return Err("block_cache_capacity must be greater than 0".to_string());
        }
        if self.block_size < 1024 || self.block_size > 16 * 1024 * 1024 {
            return Err("block_size must be between 1KB and 16MB".to_string());
        }
        Ok(())
    }
}

static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| RwLock::new(Settings::from_env()));

/// Current process-wide settings.
pub fn settings() -> Settings {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the process-wide settings.
pub fn configure(settings: Settings) -> Result<(), String> {
    settings.validate()?;
    *SETTINGS.write().unwrap_or_else(PoisonError::into_inner) = settings;
    Ok(())
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// lazy-image-io - open, inspect and convert images through a lazy pipeline.
///
/// Files are opened by content and suffix; pixels are decoded only when
/// something reads them.
#[derive(Parser, Debug, Clone)]
#[command(name = "lazy-image-io")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub tuning: Tuning,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Evaluation and cache knobs.
#[derive(Args, Debug, Clone)]
pub struct Tuning {
    /// Strips evaluated in parallel.
    #[arg(long, global = true, env = ENV_CONCURRENCY)]
    pub concurrency: Option<usize>,

    /// Rows per evaluation strip.
    #[arg(long, global = true, default_value_t = DEFAULT_TILE_HEIGHT, env = ENV_TILE_HEIGHT)]
    pub tile_height: u32,

    /// Block size in bytes for native file reads.
    #[arg(long, global = true, default_value_t = DEFAULT_BLOCK_SIZE, env = ENV_BLOCK_SIZE)]
    pub block_size: usize,

    /// Blocks cached per native file.
    #[arg(long, global = true, default_value_t = DEFAULT_BLOCK_CACHE_CAPACITY, env = ENV_CACHE_BLOCKS)]
    pub cache_blocks: usize,
}

impl Tuning {
    pub fn to_settings(&self) -> Settings {
        Settings {
            concurrency: self.concurrency.unwrap_or_else(default_concurrency),
            tile_height: self.tile_height,
            block_size: self.block_size,
            block_cache_capacity: self.cache_blocks,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the header of an image without decoding pixels.
    Header {
        /// Image to inspect, with optional `:options`.
        file: String,

        /// Print as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Convert an image; the output format follows the output suffix.
    Copy {
        input: String,
        /// Output file, with optional `:options` (e.g. `out.jpg:90`).
        output: String,

        /// Print percent-complete while writing.
        #[arg(long, default_value_t = false)]
        progress: bool,
    },

    /// Open an image and run the sanity checker on it.
    Check { file: String },
}

// =============================================================================
// Tests
// =============================================================================
