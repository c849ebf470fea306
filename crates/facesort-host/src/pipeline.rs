//! The per-item sorting loop: scan, decode, analyze, route, and stream
//! status rows plus a percent signal.
//!
//! Per-item failures are rows, never aborts; a run only ends in completion
//! or cancellation.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use image::imageops::FilterType;
use image::RgbImage;
use walkdir::WalkDir;

use facesort_core::log::{HostEvent, ItemStatus};
use facesort_core::settings::SortSettings;

use crate::config::HostConfig;
use crate::engine::FaceEngine;
use crate::matcher::PersonGallery;
use crate::store::GalleryStore;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Items that went through the loop before the run ended.
    pub items: usize,
    pub cancelled: bool,
}

/// Run one sorting pass over `folder`, emitting a row per item and a percent
/// after each, then the terminal sentinel. The stop flag is checked before
/// every item; a cancelled run ends with a synthetic `Cancelled` row instead
/// of the sentinel.
pub fn run_sort(
    folder: &Path,
    settings: &SortSettings,
    engine: &mut dyn FaceEngine,
    gallery: &mut PersonGallery,
    store: &GalleryStore,
    config: &HostConfig,
    emit: &dyn Fn(HostEvent),
    stop: &AtomicBool,
) -> RunOutcome {
    let files = collect_images(folder);
    let total = files.len();
    tracing::info!(folder = %folder.display(), total, "sorting run begins");

    if total == 0 {
        emit(HostEvent::Progress(100));
        finish(settings, gallery, store, emit);
        return RunOutcome {
            items: 0,
            cancelled: false,
        };
    }

    for (index, path) in files.iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            tracing::info!(done = index, total, "sorting run cancelled");
            emit(row(None, ItemStatus::Cancelled, None));
            return RunOutcome {
                items: index,
                cancelled: true,
            };
        }

        emit(sort_one(path, settings, engine, gallery, config));
        emit(HostEvent::Progress(((index + 1) * 100 / total) as u32));
    }

    finish(settings, gallery, store, emit);
    RunOutcome {
        items: total,
        cancelled: false,
    }
}

/// Route one file to a status row.
fn sort_one(
    path: &Path,
    settings: &SortSettings,
    engine: &mut dyn FaceEngine,
    gallery: &mut PersonGallery,
    config: &HostConfig,
) -> HostEvent {
    let label = label_of(path);

    let image = match image::open(path) {
        Ok(image) => image,
        Err(err) => {
            tracing::debug!(file = %path.display(), error = %err, "unreadable image");
            return row(Some(label), ItemStatus::ReadError, None);
        }
    };

    let working = downscale(&image, settings.resize_scale);
    let mut faces = match engine.analyze(&working) {
        Ok(faces) => faces,
        Err(err) => {
            tracing::warn!(file = %path.display(), error = %err, "analysis failed");
            return row(Some(label), ItemStatus::ProcessingError, None);
        }
    };

    if faces.is_empty() {
        return row(Some(label), ItemStatus::NoFaceDetected, None);
    }

    if faces.len() > 1 {
        if let Err(err) = copy_into(path, &config.group_photo_dir) {
            tracing::warn!(file = %path.display(), error = %err, "group photo copy failed");
            return row(Some(label), ItemStatus::ProcessingError, None);
        }
        return row(Some(label), ItemStatus::GroupPhotoDetected, None);
    }

    let face = faces.remove(0);
    let person_id = gallery.match_or_add(face.embedding, settings.similarity_threshold as f32);
    if let Err(err) = copy_into(path, &config.output_dir.join(&person_id)) {
        tracing::warn!(file = %path.display(), error = %err, "sorted copy failed");
        return row(Some(label), ItemStatus::ProcessingError, None);
    }
    row(Some(label), ItemStatus::Matched, Some(person_id))
}

/// Retention pass, cache save, terminal sentinel. A save failure surfaces as
/// a synthetic row; the run still completes.
fn finish(
    settings: &SortSettings,
    gallery: &mut PersonGallery,
    store: &GalleryStore,
    emit: &dyn Fn(HostEvent),
) {
    gallery.retain_clusters(settings.min_cluster_size);
    if let Err(err) = store.save(gallery) {
        tracing::error!(error = %err, "gallery cache save failed");
        emit(row(None, ItemStatus::ProcessingError, None));
    }
    emit(row(None, ItemStatus::Done, None));
}

fn row(label: Option<String>, status: ItemStatus, person_id: Option<String>) -> HostEvent {
    HostEvent::Log {
        label,
        status,
        person_id,
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Recursive scan in stable (sorted) order.
fn collect_images(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_image_file(path))
        .collect();
    files.sort();
    files
}

/// Downscale to the working resolution; a scale of 1.0 keeps the original.
fn downscale(image: &image::DynamicImage, scale: f64) -> RgbImage {
    let rgb = image.to_rgb8();
    if scale >= 1.0 {
        return rgb;
    }
    let width = ((f64::from(rgb.width()) * scale).round() as u32).max(1);
    let height = ((f64::from(rgb.height()) * scale).round() as u32).max(1);
    image::imageops::resize(&rgb, width, height, FilterType::Triangle)
}

fn label_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn copy_into(path: &Path, dir: &Path) -> io::Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    std::fs::create_dir_all(dir)?;
    std::fs::copy(path, dir.join(name))?;
    Ok(())
}
