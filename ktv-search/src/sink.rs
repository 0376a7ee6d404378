//! Output sinks for aggregated songs
//!
//! The CLI hands its results to a [`SongSink`]; the JSON sink writes them
//! pretty-printed to a file or to stdout.

use crate::search::BatchResult;
use ktv_common::{AggregatedSong, Result};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Destination for finished search results
pub trait SongSink {
    /// One search: a song list
    fn write_songs(&mut self, songs: &[AggregatedSong]) -> Result<()>;

    /// A batch: songs grouped by keyword
    fn write_batch(&mut self, batch: &BatchResult) -> Result<()>;
}

/// Pretty JSON writer
pub enum JsonSink {
    Stdout,
    File(PathBuf),
}

impl JsonSink {
    /// File sink when a path is given, stdout otherwise
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => JsonSink::File(path),
            None => JsonSink::Stdout,
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        match self {
            JsonSink::Stdout => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", json)?;
            }
            JsonSink::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&*path, json)?;
            }
        }
        Ok(())
    }
}

impl SongSink for JsonSink {
    fn write_songs(&mut self, songs: &[AggregatedSong]) -> Result<()> {
        self.write_json(songs)?;
        if let JsonSink::File(path) = self {
            info!("Wrote {} songs to {}", songs.len(), path.display());
        }
        Ok(())
    }

    fn write_batch(&mut self, batch: &BatchResult) -> Result<()> {
        self.write_json(batch)?;
        if let JsonSink::File(path) = self {
            info!(
                "Wrote {} keywords ({} songs) to {}",
                batch.entries.len(),
                batch.total_songs(),
                path.display()
            );
        }
        Ok(())
    }
}
