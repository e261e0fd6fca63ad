use crate::error::{PlaybackError, Result};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, DeviceSinkBuilder, MixerDeviceSink, Player};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::mem;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Notifications raised by a media element, drained in the order they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Play,
    Pause,
    LoadedMetadata { duration: Option<f64> },
    TimeUpdate,
    Ended,
    Error(String),
}

/// A single playable resource, driven by the player surface.
///
/// `play` and `pause` are fire-and-forget: the element reports what actually
/// happened through [`MediaEvent`]s, which the owner collects with
/// [`MediaElement::drain_events`].
pub trait MediaElement {
    /// `declared_duration` is the listing's length in seconds, used when the
    /// source itself does not report one.
    fn load(&mut self, url: &str, declared_duration: Option<f64>) -> Result<()>;
    fn unload(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn set_looping(&mut self, looping: bool);
    fn tick(&mut self);
    fn drain_events(&mut self) -> Vec<MediaEvent>;
}

impl<M: MediaElement + ?Sized> MediaElement for Box<M> {
    fn load(&mut self, url: &str, declared_duration: Option<f64>) -> Result<()> {
        (**self).load(url, declared_duration)
    }

    fn unload(&mut self) {
        (**self).unload();
    }

    fn play(&mut self) {
        (**self).play();
    }

    fn pause(&mut self) {
        (**self).pause();
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn set_current_time(&mut self, seconds: f64) {
        (**self).set_current_time(seconds);
    }

    fn set_looping(&mut self, looping: bool) {
        (**self).set_looping(looping);
    }

    fn tick(&mut self) {
        (**self).tick();
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> {
        (**self).drain_events()
    }
}

/// Maps a media url onto a local file. Remote transports are not handled here.
pub fn local_path(url: &str) -> Result<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(PlaybackError::UnsupportedUrl(url.to_string()));
    }
    Ok(PathBuf::from(url))
}

fn decode(path: &Path) -> Result<impl Source + Send + use<>> {
    let file = File::open(path)
        .map_err(|err| PlaybackError::Media(format!("failed to open {}: {err}", path.display())))?;
    Decoder::try_from(file)
        .map_err(|err| PlaybackError::Media(format!("failed to decode {}: {err}", path.display())))
}

pub struct RodioMediaElement {
    stream: MixerDeviceSink,
    sink: Player,
    source: Option<PathBuf>,
    looping: bool,
    ended: bool,
    events: Vec<MediaEvent>,
}

impl RodioMediaElement {
    pub fn new() -> anyhow::Result<Self> {
        let (stream, sink) = Self::open_output_stream()?;
        Ok(Self {
            stream,
            sink,
            source: None,
            looping: false,
            ended: false,
            events: Vec::new(),
        })
    }

    fn open_output_stream() -> anyhow::Result<(MixerDeviceSink, Player)> {
        use anyhow::Context;

        let mut stream = with_silenced_stderr(|| {
            match DeviceSinkBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_sink_or_fallback()
                        .context("failed to start default output stream")
                }) {
                Ok(stream) => Ok(stream),
                Err(default_err) => {
                    let host = rodio::cpal::default_host();
                    let mut candidates: Vec<String> = host
                        .output_devices()
                        .ok()
                        .into_iter()
                        .flatten()
                        .filter_map(|device| device.name().ok())
                        .collect();
                    candidates.sort_by_cached_key(|name| {
                        let lower = name.to_ascii_lowercase();
                        let rank = if lower.contains("pulse") {
                            0_u8
                        } else if lower.contains("pipewire") {
                            1_u8
                        } else if lower.contains("default") {
                            2_u8
                        } else {
                            3_u8
                        };
                        (rank, lower)
                    });
                    candidates.dedup();

                    for candidate in candidates {
                        let Some(device) = host.output_devices().ok().into_iter().flatten().find(
                            |entry| entry.name().ok().as_deref() == Some(candidate.as_str()),
                        ) else {
                            continue;
                        };
                        let opened = DeviceSinkBuilder::from_device(device)
                            .context("failed to open fallback output device")
                            .and_then(|builder| {
                                builder
                                    .with_error_callback(|_| {})
                                    .open_sink_or_fallback()
                                    .context("failed to start fallback output stream")
                            });
                        if let Ok(stream) = opened {
                            debug!(device = %candidate, "opened fallback output device");
                            return Ok(stream);
                        }
                    }

                    Err(anyhow::anyhow!(
                        "unable to start any audio output stream after default failed: {default_err:#}"
                    ))
                }
            }
        })?;
        stream.log_on_drop(false);
        let sink = Player::connect_new(stream.mixer());
        Ok((stream, sink))
    }

    fn restart_source(&mut self) -> Result<()> {
        let path = self.source.clone().ok_or(PlaybackError::NoSource)?;
        let source = decode(&path)?;
        self.sink.append(source);
        self.sink.play();
        Ok(())
    }
}

impl MediaElement for RodioMediaElement {
    fn load(&mut self, url: &str, declared_duration: Option<f64>) -> Result<()> {
        self.unload();
        let path = local_path(url)?;
        let source = decode(&path)?;
        let duration = source
            .total_duration()
            .map(|total| total.as_secs_f64())
            .or(declared_duration);

        self.sink = Player::connect_new(self.stream.mixer());
        self.sink.pause();
        self.sink.append(source);
        self.source = Some(path);
        self.events.push(MediaEvent::LoadedMetadata { duration });
        Ok(())
    }

    fn unload(&mut self) {
        self.sink.stop();
        self.source = None;
        self.ended = false;
    }

    fn play(&mut self) {
        if self.source.is_none() {
            self.events.push(MediaEvent::Error(PlaybackError::NoSource.to_string()));
            return;
        }
        if self.ended {
            self.ended = false;
            if let Err(err) = self.restart_source() {
                self.events.push(MediaEvent::Error(err.to_string()));
                return;
            }
        }
        self.sink.play();
        self.events.push(MediaEvent::Play);
    }

    fn pause(&mut self) {
        if self.source.is_none() {
            return;
        }
        self.sink.pause();
        self.events.push(MediaEvent::Pause);
    }

    fn current_time(&self) -> f64 {
        if self.source.is_none() {
            return 0.0;
        }
        self.sink.get_pos().as_secs_f64()
    }

    fn set_current_time(&mut self, seconds: f64) {
        if self.source.is_none() {
            return;
        }
        let target = Duration::from_secs_f64(seconds.max(0.0));
        if let Err(err) = self.sink.try_seek(target) {
            warn!(?err, "seek failed");
        }
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn tick(&mut self) {
        if self.source.is_none() || self.ended || self.sink.is_paused() {
            return;
        }

        if !self.sink.empty() {
            self.events.push(MediaEvent::TimeUpdate);
            return;
        }

        if self.looping {
            if let Err(err) = self.restart_source() {
                self.events.push(MediaEvent::Error(err.to_string()));
            }
            return;
        }

        self.ended = true;
        self.events.push(MediaEvent::Pause);
        self.events.push(MediaEvent::Ended);
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> {
        mem::take(&mut self.events)
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Silent element that follows a wall clock. Used when no output device opens.
pub struct NullMediaElement {
    paused: bool,
    current: Option<String>,
    looping: bool,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    events: Vec<MediaEvent>,
}

impl NullMediaElement {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            looping: false,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            events: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_duration(&mut self, duration: Option<Duration>) {
        self.track_duration = duration;
    }

    #[cfg(test)]
    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    /// Probes the source, then falls back to the declared length.
    fn estimate_duration(url: &str, declared_duration: Option<f64>) -> Option<Duration> {
        let probed = local_path(url)
            .ok()
            .and_then(|path| decode(&path).ok())
            .and_then(|source| source.total_duration());
        probed.filter(|duration| !duration.is_zero()).or_else(|| {
            declared_duration
                .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
                .map(Duration::from_secs_f64)
        })
    }

    fn position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused && self.current.is_some() {
            if let Some(started_at) = self.started_at {
                position = position.saturating_add(started_at.elapsed());
            }
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.position() >= duration
    }
}

impl Default for NullMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for NullMediaElement {
    fn load(&mut self, url: &str, declared_duration: Option<f64>) -> Result<()> {
        self.current = Some(url.to_string());
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(url, declared_duration);
        self.events.push(MediaEvent::LoadedMetadata {
            duration: self.track_duration.map(|duration| duration.as_secs_f64()),
        });
        Ok(())
    }

    fn unload(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn play(&mut self) {
        if self.current.is_none() {
            self.events.push(MediaEvent::Error(PlaybackError::NoSource.to_string()));
            return;
        }
        if self.track_duration.is_some_and(|duration| self.position_offset >= duration) {
            self.position_offset = Duration::ZERO;
        }
        if self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
        self.events.push(MediaEvent::Play);
    }

    fn pause(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.position_offset = self.position();
        self.started_at = None;
        self.paused = true;
        self.events.push(MediaEvent::Pause);
    }

    fn current_time(&self) -> f64 {
        if self.current.is_none() {
            return 0.0;
        }
        self.position().as_secs_f64()
    }

    fn set_current_time(&mut self, seconds: f64) {
        if self.current.is_none() {
            return;
        }
        let target = Duration::from_secs_f64(seconds.max(0.0));
        self.position_offset = self
            .track_duration
            .map_or(target, |duration| target.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn tick(&mut self) {
        if self.current.is_none() || self.paused {
            return;
        }

        if !self.is_finished() {
            self.events.push(MediaEvent::TimeUpdate);
            return;
        }

        if self.looping {
            self.position_offset = Duration::ZERO;
            self.started_at = Some(Instant::now());
            return;
        }

        self.position_offset = self.position();
        self.started_at = None;
        self.paused = true;
        self.events.push(MediaEvent::Pause);
        self.events.push(MediaEvent::Ended);
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> {
        mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::tempdir;

    fn write_test_wav(path: &Path, duration_ms: u32) {
        let sample_rate: u32 = 44_100;
        let channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let bytes_per_sample = u32::from(bits_per_sample / 8);
        let total_samples = (u64::from(sample_rate) * u64::from(duration_ms) / 1_000) as u32;
        let data_size = total_samples * u32::from(channels) * bytes_per_sample;
        let byte_rate = sample_rate * u32::from(channels) * bytes_per_sample;
        let block_align = channels * (bits_per_sample / 8);

        let mut bytes = Vec::with_capacity((44_u32 + data_size) as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36_u32 + data_size).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16_u32.to_le_bytes());
        bytes.extend_from_slice(&1_u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_size.to_le_bytes());
        bytes.resize((44_u32 + data_size) as usize, 0_u8);

        fs::write(path, bytes).expect("wav fixture should be written");
    }

    #[test]
    fn local_path_accepts_files_and_rejects_remote() {
        assert_eq!(
            local_path("file:///tmp/a.mp3").expect("file url"),
            PathBuf::from("/tmp/a.mp3")
        );
        assert_eq!(
            local_path("episodes/a.mp3").expect("relative"),
            PathBuf::from("episodes/a.mp3")
        );
        assert_eq!(
            local_path("https://cdn.example.com/a.mp3"),
            Err(PlaybackError::UnsupportedUrl(String::from(
                "https://cdn.example.com/a.mp3"
            )))
        );
    }

    #[test]
    fn null_element_reports_metadata_and_transport_events() {
        let mut element = NullMediaElement::new();
        element.load("missing.mp3", None).expect("load");
        element.play();
        element.pause();

        assert_eq!(
            element.drain_events(),
            vec![
                MediaEvent::LoadedMetadata { duration: None },
                MediaEvent::Play,
                MediaEvent::Pause,
            ]
        );
        assert!(element.drain_events().is_empty());
    }

    #[test]
    fn null_element_play_without_source_is_an_error() {
        let mut element = NullMediaElement::new();
        element.play();
        assert!(matches!(
            element.drain_events().as_slice(),
            [MediaEvent::Error(_)]
        ));
    }

    #[test]
    fn null_element_position_advances_only_while_playing() {
        let mut element = NullMediaElement::new();
        element.load("missing.mp3", None).expect("load");
        element.play();
        thread::sleep(Duration::from_millis(20));
        element.pause();

        let paused = element.current_time();
        assert!(paused > 0.0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(element.current_time(), paused);
    }

    #[test]
    fn null_element_seek_moves_position() {
        let mut element = NullMediaElement::new();
        element.load("missing.mp3", None).expect("load");
        element.set_current_time(12.0);
        assert_eq!(element.current_time(), 12.0);
    }

    #[test]
    fn null_element_ends_when_known_duration_elapses() {
        let dir = tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_test_wav(&track, 80);

        let mut element = NullMediaElement::new();
        element.load(&track.to_string_lossy(), Some(30.0)).expect("load");
        element.play();
        element.drain_events();

        thread::sleep(Duration::from_millis(120));
        element.tick();

        assert_eq!(
            element.drain_events(),
            vec![MediaEvent::Pause, MediaEvent::Ended]
        );
        assert!(element.is_paused());
    }

    #[test]
    fn null_element_falls_back_to_declared_duration() {
        let mut element = NullMediaElement::new();
        element
            .load("https://cdn.example.com/a.mp3", Some(0.05))
            .expect("load");
        element.play();
        assert_eq!(
            element.drain_events(),
            vec![
                MediaEvent::LoadedMetadata { duration: Some(0.05) },
                MediaEvent::Play,
            ]
        );

        thread::sleep(Duration::from_millis(90));
        element.tick();

        assert_eq!(
            element.drain_events(),
            vec![MediaEvent::Pause, MediaEvent::Ended]
        );
        assert!(element.current_time() <= 0.05);
    }

    #[test]
    fn null_element_ignores_unusable_declared_duration() {
        let mut element = NullMediaElement::new();
        element.load("missing.mp3", Some(0.0)).expect("load");
        element.load("missing.mp3", Some(f64::NAN)).expect("load");
        assert_eq!(
            element.drain_events(),
            vec![
                MediaEvent::LoadedMetadata { duration: None },
                MediaEvent::LoadedMetadata { duration: None },
            ]
        );
    }

    #[test]
    fn null_element_looping_restarts_without_ending() {
        let mut element = NullMediaElement::new();
        element.load("missing.mp3", None).expect("load");
        element.set_duration(Some(Duration::from_millis(10)));
        element.set_looping(true);
        element.play();
        element.drain_events();

        thread::sleep(Duration::from_millis(30));
        element.tick();

        assert!(element.drain_events().is_empty());
        assert!(!element.is_paused());
        assert!(element.current_time() < 0.01);
    }

    #[test]
    fn null_element_ticks_time_updates_while_playing() {
        let mut element = NullMediaElement::new();
        element.load("missing.mp3", None).expect("load");
        element.tick();
        element.play();
        element.drain_events();
        element.tick();
        assert_eq!(element.drain_events(), vec![MediaEvent::TimeUpdate]);
    }
}
