use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::PlaybackConfig;
use crate::error::{Result, TsuyakuError};
use crate::session::ExchangeId;
use crate::speech::AudioClip;

/// Somewhere synthesized audio can be sent
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, item: &PlaybackItem) -> Result<()>;
}

/// A clip waiting to be played, tagged with the exchange it belongs to
#[derive(Debug, Clone)]
pub struct PlaybackItem {
    pub exchange_id: ExchangeId,
    pub clip: AudioClip,
}

/// FIFO of clips, drained one at a time after each interaction
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    items: VecDeque<PlaybackItem>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, exchange_id: ExchangeId, clip: AudioClip) {
        self.items.push_back(PlaybackItem { exchange_id, clip });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Play every queued clip in order, waiting for each to finish.
    /// Failed clips are logged and skipped. Returns the number played.
    pub async fn drain(&mut self, sink: &dyn AudioSink) -> usize {
        let mut played = 0;
        while let Some(item) = self.items.pop_front() {
            match sink.play(&item).await {
                Ok(()) => played += 1,
                Err(e) => warn!("Playback of exchange {} failed: {}", item.exchange_id, e),
            }
        }
        played
    }
}

/// Plays clips through an external player binary (mpv, afplay, ...)
pub struct CommandPlayer {
    binary_path: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(binary_path: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            args,
        }
    }
}

#[async_trait]
impl AudioSink for CommandPlayer {
    async fn play(&self, item: &PlaybackItem) -> Result<()> {
        // Removed when dropped, after the player exits
        let mut file = tempfile::Builder::new()
            .prefix("tsuyaku-")
            .suffix(&format!(".{}", item.clip.format.extension()))
            .tempfile()?;
        file.write_all(&item.clip.bytes)?;
        file.flush()?;

        debug!("Playing exchange {} with {}", item.exchange_id, self.binary_path);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .arg(file.path())
            .output()
            .await
            .map_err(|e| TsuyakuError::Config(format!("Failed to execute player {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TsuyakuError::Io(std::io::Error::other(format!(
                "{} exited with {}: {}",
                self.binary_path,
                output.status,
                stderr.trim()
            ))));
        }
        Ok(())
    }
}

/// Writes each clip to `<dir>/exchange-<id>.<ext>`
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn path_for(&self, item: &PlaybackItem) -> PathBuf {
        self.output_dir.join(format!(
            "exchange-{}.{}",
            item.exchange_id.0,
            item.clip.format.extension()
        ))
    }
}

#[async_trait]
impl AudioSink for FileSink {
    async fn play(&self, item: &PlaybackItem) -> Result<()> {
        let path = self.path_for(item);
        tokio::fs::write(&path, &item.clip.bytes[..]).await?;
        info!("Saved audio to {}", path.display());
        Ok(())
    }
}

/// Pick the sink described by the configuration, if any
pub fn sink_from_config(config: &PlaybackConfig) -> Result<Option<Box<dyn AudioSink>>> {
    if let Some(player) = &config.player {
        return Ok(Some(Box::new(CommandPlayer::new(player.clone(), config.player_args.clone()))));
    }
    if let Some(dir) = &config.output_dir {
        return Ok(Some(Box::new(FileSink::new(dir)?)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        played: Mutex<Vec<ExchangeId>>,
        fail_on: Option<ExchangeId>,
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn play(&self, item: &PlaybackItem) -> Result<()> {
            if Some(item.exchange_id) == self.fail_on {
                return Err(TsuyakuError::Config("broken".to_string()));
            }
            self.played.lock().unwrap().push(item.exchange_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_drain_plays_in_fifo_order() {
        let mut queue = PlaybackQueue::new();
        for id in [3, 1, 2] {
            queue.enqueue(ExchangeId(id), AudioClip::mp3(vec![1, 2, 3]));
        }

        let sink = RecordingSink::default();
        assert_eq!(queue.drain(&sink).await, 3);
        assert!(queue.is_empty());
        assert_eq!(*sink.played.lock().unwrap(), vec![ExchangeId(3), ExchangeId(1), ExchangeId(2)]);
    }

    #[tokio::test]
    async fn test_drain_skips_failed_clip() {
        let mut queue = PlaybackQueue::new();
        queue.enqueue(ExchangeId(1), AudioClip::mp3(vec![1]));
        queue.enqueue(ExchangeId(2), AudioClip::mp3(vec![2]));

        let sink = RecordingSink {
            fail_on: Some(ExchangeId(1)),
            ..Default::default()
        };
        assert_eq!(queue.drain(&sink).await, 1);
        assert_eq!(*sink.played.lock().unwrap(), vec![ExchangeId(2)]);
    }

    #[tokio::test]
    async fn test_file_sink_writes_clip() {
        let temp = assert_fs::TempDir::new().unwrap();
        let sink = FileSink::new(temp.path()).unwrap();
        let item = PlaybackItem {
            exchange_id: ExchangeId(7),
            clip: AudioClip::mp3(b"ID3fake".to_vec()),
        };

        sink.play(&item).await.unwrap();
        let written = temp.child("exchange-7.mp3");
        assert_eq!(std::fs::read(written.path()).unwrap(), b"ID3fake");
    }

    #[tokio::test]
    async fn test_missing_player_fails() {
        let player = CommandPlayer::new("/nonexistent/player", vec![]);
        let item = PlaybackItem {
            exchange_id: ExchangeId(1),
            clip: AudioClip::mp3(vec![0]),
        };
        assert!(player.play(&item).await.is_err());
    }

    #[test]
    fn test_sink_from_config() {
        let config = PlaybackConfig {
            player: None,
            player_args: vec![],
            output_dir: None,
        };
        assert!(sink_from_config(&config).unwrap().is_none());
    }
}
