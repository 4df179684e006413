use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::{EventBus, EventData, COMPLETE_EVENT, PROGRESS_EVENT};

use super::{Asset, AssetError, AudioClip, CachedAsset, ImageAsset, SpritesheetConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl LoadProgress {
    pub fn processed(&self) -> usize {
        self.loaded + self.failed
    }

    /// Percent of queued work processed. An empty queue counts as done.
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed() as f32 / self.total as f32 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.processed() >= self.total
    }
}

#[derive(Debug)]
enum PendingLoad {
    Image { key: String, path: PathBuf },
    Audio { key: String, path: PathBuf },
    Spritesheet(SpritesheetConfig),
}

/// Keyed store of decoded assets with a FIFO load queue. Paths are resolved
/// against the cache root unless absolute.
#[derive(Debug)]
pub struct AssetCache {
    root: PathBuf,
    entries: HashMap<String, Asset>,
    spritesheets: HashMap<String, SpritesheetConfig>,
    queue: VecDeque<PendingLoad>,
    progress: LoadProgress,
    completion_published: bool,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: HashMap::new(),
            spritesheets: HashMap::new(),
            queue: VecDeque::new(),
            progress: LoadProgress::default(),
            completion_published: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_image(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.enqueue(PendingLoad::Image {
            key: key.into(),
            path: path.into(),
        });
    }

    pub fn load_audio(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.enqueue(PendingLoad::Audio {
            key: key.into(),
            path: path.into(),
        });
    }

    pub fn load_spritesheet(&mut self, sheet: SpritesheetConfig) {
        self.enqueue(PendingLoad::Spritesheet(sheet));
    }

    fn enqueue(&mut self, pending: PendingLoad) {
        debug!(pending = ?pending, "asset_queued");
        self.queue.push_back(pending);
        self.progress.total += 1;
        self.completion_published = false;
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress
    }

    /// Drains the queue in order. Failed items are logged and counted rather
    /// than aborting the queue. Publishes `progress` after each processed
    /// item and `complete` once everything queued so far has been processed.
    pub fn process_queue(&mut self, events: &mut EventBus) -> LoadProgress {
        while let Some(pending) = self.queue.pop_front() {
            match pending {
                PendingLoad::Image { key, path } => {
                    let resolved = self.resolve(&path);
                    match ImageAsset::load(&resolved) {
                        Ok(image) => {
                            self.insert_image(key, image);
                            self.record_loaded(events);
                        }
                        Err(error) => self.record_failed(events, &key, &error),
                    }
                }
                PendingLoad::Audio { key, path } => {
                    let resolved = self.resolve(&path);
                    match AudioClip::load(&resolved) {
                        Ok(audio) => {
                            self.insert_audio(key, audio);
                            self.record_loaded(events);
                        }
                        Err(error) => self.record_failed(events, &key, &error),
                    }
                }
                PendingLoad::Spritesheet(sheet) => {
                    let resolved = self.resolve(&sheet.path);
                    match ImageAsset::load(&resolved) {
                        Ok(image) => {
                            let image = self.insert_image(sheet.key.clone(), image);
                            self.record_loaded(events);
                            self.slice_spritesheet(&sheet, &image, events);
                            self.spritesheets.insert(sheet.key.clone(), sheet);
                        }
                        Err(error) => self.record_failed(events, &sheet.key, &error),
                    }
                }
            }
        }

        if self.progress.is_complete() && self.progress.total > 0 && !self.completion_published {
            self.completion_published = true;
            info!(
                loaded = self.progress.loaded,
                failed = self.progress.failed,
                "asset_loading_complete"
            );
            events.publish(
                COMPLETE_EVENT,
                &EventData::Complete {
                    percent: self.progress.percent(),
                },
            );
        }
        self.progress
    }

    fn slice_spritesheet(
        &mut self,
        sheet: &SpritesheetConfig,
        image: &ImageAsset,
        events: &mut EventBus,
    ) {
        self.progress.total += sheet.frames.len();
        for (name, index) in &sheet.frames {
            let (x, y) = sheet.frame_origin(*index, image.width());
            match image.crop(x, y, sheet.frame_width, sheet.frame_height) {
                Some(frame) => {
                    self.insert_image(sheet.frame_key(name), frame);
                    self.record_loaded(events);
                }
                None => {
                    let error = AssetError::FrameOutOfBounds {
                        key: sheet.key.clone(),
                        frame: *index,
                        sheet_width: image.width(),
                        sheet_height: image.height(),
                    };
                    self.record_failed(events, &sheet.frame_key(name), &error);
                }
            }
        }
    }

    fn record_loaded(&mut self, events: &mut EventBus) {
        self.progress.loaded += 1;
        self.publish_progress(events);
    }

    fn record_failed(&mut self, events: &mut EventBus, key: &str, error: &AssetError) {
        warn!(key, error = %error, "asset_load_failed");
        self.progress.failed += 1;
        self.publish_progress(events);
    }

    fn publish_progress(&self, events: &mut EventBus) {
        events.publish(
            PROGRESS_EVENT,
            &EventData::Progress {
                percent: self.progress.percent(),
            },
        );
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn insert_image(&mut self, key: impl Into<String>, image: ImageAsset) -> Arc<ImageAsset> {
        let image = Arc::new(image);
        self.entries
            .insert(key.into(), Asset::Image(Arc::clone(&image)));
        image
    }

    pub fn insert_audio(&mut self, key: impl Into<String>, audio: AudioClip) -> Arc<AudioClip> {
        let audio = Arc::new(audio);
        self.entries
            .insert(key.into(), Asset::Audio(Arc::clone(&audio)));
        audio
    }

    pub fn get<T: CachedAsset>(&self, key: &str) -> Result<T, AssetError> {
        let asset = self.entries.get(key).ok_or_else(|| AssetError::NotFound {
            key: key.to_string(),
        })?;
        T::from_asset(asset).ok_or_else(|| AssetError::WrongKind {
            key: key.to_string(),
            expected: T::KIND,
            actual: asset.kind(),
        })
    }

    pub fn image(&self, key: &str) -> Result<Arc<ImageAsset>, AssetError> {
        self.get(key)
    }

    pub fn audio(&self, key: &str) -> Result<Arc<AudioClip>, AssetError> {
        self.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn spritesheet(&self, key: &str) -> Option<&SpritesheetConfig> {
        self.spritesheets.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops cached entries. Queue and progress counters are left alone.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.spritesheets.clear();
    }
}
