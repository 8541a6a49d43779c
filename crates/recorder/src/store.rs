//! DiskEpisodeStore - writes an episode as image files plus a CSV driving log
//!
//! Layout:
//! ```text
//! <episode>/
//!   imgs/<frame_index>_<camera>.<ext>
//!   driving_log.csv
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use contracts::{ContractError, EpisodeStore, FrameRecord, ImageData, ImageFormat, Telemetry};
use csv::Writer;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use tracing::{debug, instrument, warn};

/// Image sub-directory of an episode
pub const IMAGE_DIR: &str = "imgs";

/// Telemetry table file name
pub const DRIVING_LOG: &str = "driving_log.csv";

/// Columns after the per-camera image columns
pub const TELEMETRY_COLUMNS: [&str; 17] = [
    "LocationX",
    "LocationY",
    "LocationZ",
    "Speed",
    "Steer",
    "Throttle",
    "Brake",
    "Reverse",
    "APSteer",
    "APThrottle",
    "APBrake",
    "APReverse",
    "HLC",
    "SpeedLimit",
    "TrafficLight",
    "AutoPilotEnabled",
    "WeatherID",
];

/// Full header for a camera list
pub fn driving_log_header(cameras: &[String]) -> Vec<String> {
    std::iter::once("Frame".to_string())
        .chain(cameras.iter().cloned())
        .chain(TELEMETRY_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Episode currently open for writing
struct OpenEpisode {
    root: PathBuf,
    cameras: Vec<String>,
    log: Writer<File>,
}

/// Store that persists episodes to the local filesystem
///
/// Clones carry configuration only; each clone opens its own episode.
pub struct DiskEpisodeStore {
    name: String,
    image_extension: String,
    episode: Option<OpenEpisode>,
}

impl DiskEpisodeStore {
    pub fn new(image_extension: impl Into<String>) -> Self {
        Self {
            name: "disk".to_string(),
            image_extension: image_extension.into().to_lowercase(),
            episode: None,
        }
    }

    pub fn image_extension(&self) -> &str {
        &self.image_extension
    }

    fn io_error(&self, path: &Path, e: impl std::fmt::Display) -> ContractError {
        ContractError::store_write(&self.name, format!("{}: {e}", path.display()))
    }

    fn open_episode(&self, root: &Path, cameras: &[String]) -> io::Result<OpenEpisode> {
        fs::create_dir_all(root.join(IMAGE_DIR))?;

        let log_path = root.join(DRIVING_LOG);
        let existing = fs::metadata(&log_path).map(|m| m.len() > 0).unwrap_or(false);

        // appending keeps the column order of the existing header
        let cameras = if existing {
            let header = existing_cameras(&log_path)?;
            if header != cameras {
                warn!(
                    path = %log_path.display(),
                    existing = ?header,
                    requested = ?cameras,
                    "Camera columns differ from existing driving log, keeping existing order"
                );
            }
            header
        } else {
            cameras.to_vec()
        };

        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
        let mut log = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !existing {
            log.write_record(driving_log_header(&cameras))?;
            log.flush()?;
        }

        Ok(OpenEpisode {
            root: root.to_path_buf(),
            cameras,
            log,
        })
    }

    fn persist_frame(&self, episode: &mut OpenEpisode, frame: &FrameRecord) -> io::Result<()> {
        let imgs = episode.root.join(IMAGE_DIR);
        for (camera, image) in &frame.images {
            let path = imgs.join(frame.image_file_name(camera, &self.image_extension));
            save_image(&path, image, &self.image_extension)?;
        }

        let mut row = Vec::with_capacity(1 + episode.cameras.len() + TELEMETRY_COLUMNS.len());
        row.push(frame.frame_index.to_string());
        for camera in &episode.cameras {
            row.push(if frame.images.contains_key(camera) {
                format!(
                    "{IMAGE_DIR}/{}",
                    frame.image_file_name(camera, &self.image_extension)
                )
            } else {
                String::new()
            });
        }
        row.extend(telemetry_cells(&frame.telemetry));

        episode.log.write_record(&row)?;
        episode.log.flush()?;
        Ok(())
    }
}

impl Clone for DiskEpisodeStore {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            image_extension: self.image_extension.clone(),
            episode: None,
        }
    }
}

impl std::fmt::Debug for DiskEpisodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskEpisodeStore")
            .field("image_extension", &self.image_extension)
            .field("episode", &self.episode.as_ref().map(|e| &e.root))
            .finish()
    }
}

impl EpisodeStore for DiskEpisodeStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "disk_store_prepare",
        skip(self, cameras),
        fields(store = %self.name, episode = %episode_path.display())
    )]
    async fn prepare(&mut self, episode_path: &Path, cameras: &[String]) -> Result<(), ContractError> {
        let episode = self
            .open_episode(episode_path, cameras)
            .map_err(|e| self.io_error(episode_path, e))?;
        debug!(cameras = ?episode.cameras, "Episode opened");
        self.episode = Some(episode);
        Ok(())
    }

    #[instrument(
        name = "disk_store_write",
        skip(self, frame),
        fields(store = %self.name, frame_index = frame.frame_index)
    )]
    async fn write_frame(&mut self, frame: &FrameRecord) -> Result<(), ContractError> {
        let mut episode = self
            .episode
            .take()
            .ok_or_else(|| ContractError::store_write(&self.name, "episode not prepared"))?;
        let result = self
            .persist_frame(&mut episode, frame)
            .map_err(|e| self.io_error(&episode.root, e));
        self.episode = Some(episode);
        result
    }

    #[instrument(name = "disk_store_finish", skip(self), fields(store = %self.name))]
    async fn finish(&mut self) -> Result<(), ContractError> {
        if let Some(mut episode) = self.episode.take() {
            episode
                .log
                .flush()
                .map_err(|e| self.io_error(&episode.root, e))?;
            debug!(episode = %episode.root.display(), "Episode closed");
        }
        Ok(())
    }
}

/// Camera columns of an existing driving log header
fn existing_cameras(log_path: &Path) -> io::Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(log_path)?;
    let header = reader.headers()?;
    Ok(header
        .iter()
        .skip(1)
        .take_while(|column| *column != TELEMETRY_COLUMNS[0])
        .map(str::to_string)
        .collect())
}

fn telemetry_cells(t: &Telemetry) -> Vec<String> {
    vec![
        t.location.x.to_string(),
        t.location.y.to_string(),
        t.location.z.to_string(),
        t.speed_kmh.to_string(),
        t.controls.steer.to_string(),
        t.controls.throttle.to_string(),
        t.controls.brake.to_string(),
        (t.controls.reverse as u8).to_string(),
        t.autopilot_controls.steer.to_string(),
        t.autopilot_controls.throttle.to_string(),
        t.autopilot_controls.brake.to_string(),
        (t.autopilot_controls.reverse as u8).to_string(),
        t.hlc.code().to_string(),
        t.speed_limit.to_string(),
        t.traffic_light.code().to_string(),
        (t.autopilot_enabled as u8).to_string(),
        t.weather_id.to_string(),
    ]
}

/// Encode an image buffer; format is chosen from the path extension
fn save_image(path: &Path, image: &ImageData, extension: &str) -> io::Result<()> {
    let dynamic = to_dynamic(image)?;
    // JPEG has no alpha channel
    let dynamic = if matches!(extension, "jpg" | "jpeg") {
        DynamicImage::ImageRgb8(dynamic.to_rgb8())
    } else {
        dynamic
    };
    dynamic.save(path).map_err(io::Error::other)
}

fn to_dynamic(image: &ImageData) -> io::Result<DynamicImage> {
    let (w, h) = (image.width, image.height);
    let data = image.data.to_vec();
    let dynamic = match image.format {
        ImageFormat::Rgb8 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        ImageFormat::Rgba8 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        ImageFormat::Bgra8 => {
            let mut rgba = data;
            for chunk in rgba.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }
            RgbaImage::from_raw(w, h, rgba).map(DynamicImage::ImageRgba8)
        }
        ImageFormat::Gray8 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
    };
    dynamic.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} bytes do not fill a {w}x{h} {:?} image",
                image.data.len(),
                image.format
            ),
        )
    })
}
