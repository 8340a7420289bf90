// src/gallery.rs - Validated, downscaled images placed on the globe
use crate::config::UploadConfig;
use crate::error::UploadError;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// MIME type guessed from a file extension, for the accepted formats only.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub enum CandidateSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// One file offered by the picker or a drop, before validation.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub name: String,
    pub mime: Option<String>,
    pub size: u64,
    pub source: CandidateSource,
}

impl UploadCandidate {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            mime: mime_for_path(path).map(str::to_string),
            size: metadata.len(),
            source: CandidateSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, mime: Option<String>, bytes: Arc<[u8]>) -> Self {
        let name = name.into();
        let mime = mime
            .filter(|m| !m.is_empty())
            .or_else(|| mime_for_path(Path::new(&name)).map(str::to_string));
        Self {
            name,
            mime,
            size: bytes.len() as u64,
            source: CandidateSource::Bytes(bytes),
        }
    }

    pub fn validate(&self, config: &UploadConfig) -> Result<(), UploadError> {
        let mime = self.mime.as_deref().unwrap_or("");
        if !ACCEPTED_MIME_TYPES.contains(&mime) {
            return Err(UploadError::UnsupportedType(if mime.is_empty() {
                self.name.clone()
            } else {
                mime.to_string()
            }));
        }
        if self.size > config.max_file_bytes {
            return Err(UploadError::TooLarge {
                size: self.size,
                limit: config.max_file_bytes,
            });
        }
        Ok(())
    }

    fn decode(&self, max_edge: u32) -> Result<RgbaImage, UploadError> {
        let image = match &self.source {
            CandidateSource::Path(path) => {
                let bytes = std::fs::read(path).map_err(|source| UploadError::Read {
                    path: path.clone(),
                    source,
                })?;
                image::load_from_memory(&bytes)?
            }
            CandidateSource::Bytes(bytes) => image::load_from_memory(bytes)?,
        };
        Ok(downscale(image, max_edge).to_rgba8())
    }
}

/// Shrinks so the longest edge is at most `max_edge`, keeping the aspect ratio.
/// Smaller images are returned untouched.
pub fn downscale(image: DynamicImage, max_edge: u32) -> DynamicImage {
    if image.width().max(image.height()) <= max_edge {
        image
    } else {
        image.resize(max_edge, max_edge, FilterType::Triangle)
    }
}

#[derive(Debug, Clone)]
pub struct GalleryImage {
    pub id: Uuid,
    pub uri: String,
    pub name: String,
    pub image: RgbaImage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub loaded: usize,
    pub rejected: usize,
    pub failed: usize,
    /// Whether the gallery contents were replaced.
    pub replaced: bool,
}

#[derive(Default)]
pub struct ImageGallery {
    images: Vec<GalleryImage>,
    generation: u64,
}

impl ImageGallery {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            generation: 0,
        }
    }

    pub fn images(&self) -> &[GalleryImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Bumped every time the contents are replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn uris(&self) -> Vec<&str> {
        self.images.iter().map(|img| img.uri.as_str()).collect()
    }

    /// Swaps in a decoded batch. A batch with nothing usable leaves the
    /// current images in place.
    pub fn install(&mut self, batch: DecodedBatch) -> IngestReport {
        let mut report = batch.report;
        if batch.images.is_empty() {
            return report;
        }

        report.replaced = true;
        self.images = batch.images;
        self.generation += 1;
        info!(
            "gallery now holds {} images ({} rejected, {} failed)",
            report.loaded, report.rejected, report.failed
        );
        report
    }
}

/// Keeps the first `max_files` candidates, then drops invalid ones.
pub fn filter_batch(
    config: &UploadConfig,
    batch: Vec<UploadCandidate>,
) -> (Vec<UploadCandidate>, usize) {
    let mut rejected = 0;
    let valid = batch
        .into_iter()
        .take(config.max_files)
        .filter(|candidate| match candidate.validate(config) {
            Ok(()) => true,
            Err(e) => {
                debug!("skipping {}: {e}", candidate.name);
                rejected += 1;
                false
            }
        })
        .collect();
    (valid, rejected)
}

/// Images decoded from one upload, ready for [`ImageGallery::install`].
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    pub images: Vec<GalleryImage>,
    pub report: IngestReport,
}

/// Filters, reads, decodes and downscales a batch. Undecodable files are
/// skipped and counted.
pub fn decode_batch(config: &UploadConfig, batch: Vec<UploadCandidate>) -> DecodedBatch {
    let (valid, rejected) = filter_batch(config, batch);
    let mut decoded = DecodedBatch {
        images: Vec::with_capacity(valid.len()),
        report: IngestReport {
            rejected,
            ..IngestReport::default()
        },
    };

    for candidate in &valid {
        match candidate.decode(config.max_edge) {
            Ok(image) => {
                let id = Uuid::new_v4();
                decoded.images.push(GalleryImage {
                    id,
                    uri: format!("gallery://{id}"),
                    name: candidate.name.clone(),
                    image,
                });
            }
            Err(e) => {
                warn!("failed to load {}: {e}", candidate.name);
                decoded.report.failed += 1;
            }
        }
    }
    decoded.report.loaded = decoded.images.len();
    decoded
}

/// Decodes uploads on worker threads so the render loop keeps ticking.
/// Only the most recently submitted batch is ever handed back; older ones
/// that finish late are dropped.
pub struct GalleryLoader {
    tx: Sender<(u64, DecodedBatch)>,
    rx: Receiver<(u64, DecodedBatch)>,
    submitted: u64,
    delivered: u64,
}

impl GalleryLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            submitted: 0,
            delivered: 0,
        }
    }

    pub fn submit(&mut self, config: UploadConfig, batch: Vec<UploadCandidate>) -> io::Result<()> {
        let seq = self.submitted + 1;
        let tx = self.tx.clone();
        std::thread::Builder::new()
            .name("gallery-decode".to_string())
            .spawn(move || {
                let decoded = decode_batch(&config, batch);
                let _ = tx.send((seq, decoded));
            })?;
        self.submitted = seq;
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.delivered < self.submitted
    }

    /// Newest finished batch since the last poll, if any. Never blocks.
    pub fn poll(&mut self) -> Option<DecodedBatch> {
        let mut newest = None;
        for (seq, batch) in self.rx.try_iter() {
            if seq > self.delivered {
                self.delivered = seq;
                newest = Some(batch);
            }
        }
        newest
    }
}

impl Default for GalleryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Arc<[u8]> {
        let image = DynamicImage::new_rgb8(width, height);
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .unwrap();
        buf.into()
    }

    fn ingest(gallery: &mut ImageGallery, batch: Vec<UploadCandidate>) -> IngestReport {
        gallery.install(decode_batch(&UploadConfig::default(), batch))
    }

    fn png(name: &str, width: u32, height: u32) -> UploadCandidate {
        UploadCandidate::from_bytes(name, None, png_bytes(width, height))
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a/B.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("x.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(Path::new("x.gif")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn explicit_mime_beats_extension() {
        let c = UploadCandidate::from_bytes("photo.bin", Some("image/png".into()), png_bytes(2, 2));
        assert_eq!(c.mime.as_deref(), Some("image/png"));
        let c = UploadCandidate::from_bytes("photo.png", Some(String::new()), png_bytes(2, 2));
        assert_eq!(c.mime.as_deref(), Some("image/png"));
    }

    #[test]
    fn rejects_wrong_type_and_oversize() {
        let config = UploadConfig::default();
        let gif = UploadCandidate::from_bytes("anim.gif", None, png_bytes(2, 2));
        assert!(matches!(gif.validate(&config), Err(UploadError::UnsupportedType(_))));

        let mut big = png("big.png", 2, 2);
        big.size = config.max_file_bytes + 1;
        assert!(matches!(big.validate(&config), Err(UploadError::TooLarge { .. })));
    }

    #[test]
    fn downscale_caps_longest_edge() {
        let wide = downscale(DynamicImage::new_rgb8(1024, 256), 512);
        assert_eq!((wide.width(), wide.height()), (512, 128));
        let tall = downscale(DynamicImage::new_rgb8(300, 900), 512);
        assert_eq!(tall.height(), 512);
        assert!(tall.width() <= 171 && tall.width() >= 170);
        let small = downscale(DynamicImage::new_rgb8(100, 50), 512);
        assert_eq!((small.width(), small.height()), (100, 50));
    }

    #[test]
    fn ingest_replaces_contents() {
        let mut gallery = ImageGallery::new();
        ingest(&mut gallery, vec![png("a.png", 4, 4), png("b.png", 4, 4)]);
        assert_eq!(gallery.len(), 2);

        let report = ingest(&mut gallery, vec![png("c.png", 4, 4)]);
        assert!(report.replaced);
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.images()[0].name, "c.png");
        assert_eq!(gallery.generation(), 2);
        assert!(gallery.uris()[0].starts_with("gallery://"));
    }

    #[test]
    fn empty_valid_batch_keeps_existing_images() {
        let mut gallery = ImageGallery::new();
        ingest(&mut gallery, vec![png("a.png", 4, 4)]);
        let report = ingest(&mut gallery, vec![UploadCandidate::from_bytes("notes.txt", None, png_bytes(1, 1))]);
        assert_eq!(report.rejected, 1);
        assert!(!report.replaced);
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.generation(), 1);
    }

    #[test]
    fn undecodable_files_are_skipped() {
        let mut gallery = ImageGallery::new();
        let broken = UploadCandidate::from_bytes("broken.png", None, Arc::from(&b"not a png"[..]));
        let report = ingest(&mut gallery, vec![broken, png("ok.png", 3, 3)]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.loaded, 1);
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn batch_is_truncated_before_filtering() {
        let config = UploadConfig {
            max_files: 2,
            ..UploadConfig::default()
        };
        let batch = vec![
            UploadCandidate::from_bytes("x.gif", None, png_bytes(1, 1)),
            png("a.png", 1, 1),
            png("b.png", 1, 1),
        ];
        let (valid, rejected) = filter_batch(&config, batch);
        assert_eq!(valid.len(), 1);
        assert_eq!(rejected, 1);
    }

    fn wait_for_batch(loader: &mut GalleryLoader) -> Option<DecodedBatch> {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            if let Some(batch) = loader.poll() {
                return Some(batch);
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn loader_decodes_off_thread_and_installs() {
        let mut loader = GalleryLoader::new();
        let mut gallery = ImageGallery::new();

        loader
            .submit(UploadConfig::default(), vec![png("a.png", 600, 300), png("b.png", 4, 4)])
            .unwrap();
        assert!(loader.is_loading());
        assert!(gallery.is_empty());

        let batch = wait_for_batch(&mut loader).expect("batch never finished");
        assert!(!loader.is_loading());
        let report = gallery.install(batch);
        assert!(report.replaced);
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.images()[0].image.width(), 512);
    }

    #[test]
    fn loader_drops_batches_superseded_before_delivery() {
        let mut loader = GalleryLoader::new();
        loader.submitted = 2;
        let old = decode_batch(&UploadConfig::default(), vec![png("old.png", 2, 2)]);
        let new = decode_batch(&UploadConfig::default(), vec![png("new.png", 2, 2)]);
        loader.tx.send((2, new)).unwrap();
        loader.tx.send((1, old)).unwrap();

        let batch = loader.poll().unwrap();
        assert_eq!(batch.images[0].name, "new.png");
        assert!(loader.poll().is_none());
        assert!(!loader.is_loading());
    }
}
