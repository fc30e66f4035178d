//! Fake engine that writes placeholder audio files instead of running yt-dlp

use anymusic_dl::{
    AudioConverter, Config, Engine, EngineCapabilities, EngineError, EngineProgress, ExtractMode,
    ExtractOutput, ExtractRequest, ExtractedItem,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Placeholder content written for every produced file
pub const FAKE_AUDIO: &[u8] = b"ID3 fake audio payload";

/// One playlist entry: its title, or the error it fails with
#[derive(Clone)]
pub enum Entry {
    Ok(&'static str),
    Fails(EngineError),
}

/// Engine double driven by a list of entries
///
/// Single mode produces the first entry; playlist mode walks all of them,
/// reporting per-entry progress and collecting failures as skipped.
pub struct FakeEngine {
    title: &'static str,
    entries: Vec<Entry>,
    chunk_delay: Duration,
    invocations: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new(title: &'static str, entries: Vec<Entry>) -> Self {
        Self {
            title,
            entries,
            chunk_delay: Duration::ZERO,
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Counter incremented on every `extract` call
    pub fn invocations(&self) -> Arc<AtomicUsize> {
        self.invocations.clone()
    }

    async fn pause(&self) {
        if !self.chunk_delay.is_zero() {
            tokio::time::sleep(self.chunk_delay).await;
        }
    }

    async fn produce(
        &self,
        request: &ExtractRequest,
        relative: String,
        title: &str,
        progress: &mpsc::UnboundedSender<EngineProgress>,
        entry: Option<(u32, u32)>,
    ) -> ExtractedItem {
        for downloaded in [250u64, 500, 1000] {
            let mut event = EngineProgress::downloading(downloaded, Some(1000));
            if let Some((index, count)) = entry {
                event = event.in_entry(index, count);
            }
            let _ = progress.send(event);
            self.pause().await;
        }
        let mut finished = EngineProgress::finished();
        if let Some((index, count)) = entry {
            finished = finished.in_entry(index, count);
        }
        let _ = progress.send(finished);

        let path = request.output_dir.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(&path, FAKE_AUDIO).await.unwrap();
        ExtractedItem {
            title: title.to_string(),
            path,
        }
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: mpsc::UnboundedSender<EngineProgress>,
    ) -> Result<ExtractOutput, EngineError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let format = &request.audio_format;

        match request.mode {
            ExtractMode::Single => match self.entries.first() {
                Some(Entry::Ok(title)) => {
                    let item = self
                        .produce(request, format!("{title}.{format}"), title, &progress, None)
                        .await;
                    Ok(ExtractOutput {
                        title: title.to_string(),
                        items: vec![item],
                        skipped: Vec::new(),
                    })
                }
                Some(Entry::Fails(error)) => Err(error.clone()),
                None => Err(EngineError::Resolution("no media found".into())),
            },
            ExtractMode::Playlist => {
                let count = self.entries.len() as u32;
                let mut output = ExtractOutput {
                    title: self.title.to_string(),
                    ..Default::default()
                };
                for (i, entry) in self.entries.iter().enumerate() {
                    match entry {
                        Entry::Ok(title) => {
                            let relative = format!("{}/{title}.{format}", self.title);
                            let item = self
                                .produce(request, relative, title, &progress, Some((i as u32 + 1, count)))
                                .await;
                            output.items.push(item);
                        }
                        Entry::Fails(error) => output.skipped.push(error.clone()),
                    }
                }
                Ok(output)
            }
        }
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_extract: true,
            can_transcode: true,
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Create a converter around `engine` in a fresh temporary download root
pub async fn create_converter(engine: FakeEngine) -> (Arc<AudioConverter>, TempDir) {
    create_converter_with(engine, |_| {}).await
}

/// Like [`create_converter`], with a hook to adjust the configuration
pub async fn create_converter_with(
    engine: FakeEngine,
    configure: impl FnOnce(&mut Config),
) -> (Arc<AudioConverter>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    configure(&mut config);

    let converter = AudioConverter::with_engine(config, Arc::new(engine))
        .await
        .unwrap();
    (Arc::new(converter), temp_dir)
}
