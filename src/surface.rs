//! Binds [`PlaybackState`] to a [`MediaElement`].
//!
//! State drives the element through [`PlayerSurface::sync`]; element events
//! come back through [`PlayerSurface::handle_event`] and only ever touch
//! state, never the element.

use crate::media::{MediaElement, MediaEvent};
use crate::model::Episode;
use crate::state::PlaybackState;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerAction {
    TogglePlay,
    Next,
    Previous,
    ToggleShuffle,
    ToggleLoop,
    /// Absolute position in seconds.
    Seek(f64),
    /// Relative jump in seconds.
    SeekBy(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    pub enabled: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportControls {
    pub shuffle: ControlState,
    pub previous: ControlState,
    /// `active` means playing, so the button shows "pause".
    pub play_pause: ControlState,
    pub next: ControlState,
    pub repeat: ControlState,
}

impl TransportControls {
    pub fn for_state(state: &PlaybackState) -> Self {
        let loaded = state.current_episode().is_some();
        Self {
            shuffle: ControlState {
                enabled: loaded && state.len() != 1,
                active: state.is_shuffling(),
            },
            previous: ControlState {
                enabled: loaded && state.has_previous(),
                active: false,
            },
            play_pause: ControlState {
                enabled: loaded,
                active: state.is_playing(),
            },
            next: ControlState {
                enabled: loaded && state.has_next(),
                active: false,
            },
            repeat: ControlState {
                enabled: loaded,
                active: state.is_looping(),
            },
        }
    }

    pub fn allows(&self, action: PlayerAction) -> bool {
        match action {
            PlayerAction::TogglePlay => self.play_pause.enabled,
            PlayerAction::Next => self.next.enabled,
            PlayerAction::Previous => self.previous.enabled,
            PlayerAction::ToggleShuffle => self.shuffle.enabled,
            PlayerAction::ToggleLoop => self.repeat.enabled,
            PlayerAction::Seek(_) | PlayerAction::SeekBy(_) => self.play_pause.enabled,
        }
    }
}

/// Snapshot the ui renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub episode: Option<Episode>,
    pub elapsed_seconds: u64,
    pub duration_seconds: u64,
    pub controls: TransportControls,
}

pub struct PlayerSurface<M: MediaElement> {
    media: M,
    /// `(generation, index)` of the episode currently loaded into `media`.
    loaded: Option<(u64, usize)>,
    reload_requested: bool,
    // Last `is_playing` value acted on; play/pause is only pushed on a change.
    seen_playing: bool,
    pushed_looping: bool,
    subscribed: bool,
    // The element holds no source after a failed load, so seeks are dropped.
    load_failed: bool,
    progress: u64,
    last_error: Option<String>,
}

impl<M: MediaElement> PlayerSurface<M> {
    pub fn new(media: M) -> Self {
        Self {
            media,
            loaded: None,
            reload_requested: false,
            seen_playing: false,
            pushed_looping: false,
            subscribed: false,
            load_failed: false,
            progress: 0,
            last_error: None,
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// Elapsed-time counter in whole seconds.
    pub fn progress(&self) -> u64 {
        self.progress
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    pub fn controls(&self, state: &PlaybackState) -> TransportControls {
        TransportControls::for_state(state)
    }

    pub fn view(&self, state: &PlaybackState) -> PlayerView {
        let episode = state.current_episode().cloned();
        let duration_seconds = episode.as_ref().map_or(0, |episode| episode.duration);
        PlayerView {
            episode,
            elapsed_seconds: self.progress,
            duration_seconds,
            controls: self.controls(state),
        }
    }

    /// Runs a transport action if its control is enabled. Returns whether it ran.
    pub fn dispatch(&mut self, state: &mut PlaybackState, action: PlayerAction) -> bool {
        if !self.controls(state).allows(action) {
            debug!(?action, "ignored disabled control");
            return false;
        }

        match action {
            PlayerAction::TogglePlay => state.toggle_playing(),
            PlayerAction::Next => state.play_next(),
            PlayerAction::Previous => state.play_previous(),
            PlayerAction::ToggleShuffle => state.toggle_shuffling(),
            PlayerAction::ToggleLoop => state.toggle_looping(),
            PlayerAction::Seek(seconds) => self.seek(state, seconds),
            PlayerAction::SeekBy(delta) => {
                let target = self.media.current_time() + delta;
                self.seek(state, target);
            }
        }
        self.sync(state);
        true
    }

    /// Moves the playhead and updates the counter without waiting for a time update.
    pub fn seek(&mut self, state: &PlaybackState, seconds: f64) {
        let Some(episode) = state.current_episode() else {
            return;
        };
        if self.load_failed {
            debug!("seek ignored, nothing loaded");
            return;
        }
        let target = seconds.clamp(0.0, episode.duration as f64);
        self.media.set_current_time(target);
        self.progress = target.floor() as u64;
    }

    /// Applies one element event to state. Never calls back into the element.
    pub fn handle_event(&mut self, state: &mut PlaybackState, event: MediaEvent) {
        match event {
            MediaEvent::Play => {
                state.set_playing(true);
                self.seen_playing = true;
            }
            MediaEvent::Pause => {
                state.set_playing(false);
                self.seen_playing = false;
            }
            MediaEvent::LoadedMetadata { duration } => {
                debug!(?duration, "media metadata loaded");
                self.subscribed = true;
            }
            MediaEvent::TimeUpdate => {
                if self.subscribed {
                    let elapsed = self.media.current_time().max(0.0).floor() as u64;
                    self.progress = match state.current_episode() {
                        Some(episode) if episode.duration > 0 => elapsed.min(episode.duration),
                        _ => elapsed,
                    };
                }
            }
            MediaEvent::Ended => {
                if state.has_next() {
                    let before = (state.generation(), state.current_index());
                    state.play_next();
                    self.reload_requested =
                        before == (state.generation(), state.current_index());
                } else {
                    state.clear();
                }
            }
            MediaEvent::Error(message) => {
                warn!(%message, "media element failed");
                state.set_playing(false);
                self.seen_playing = false;
                self.last_error = Some(message);
            }
        }
    }

    /// Pushes state onto the element: source, looping and play/pause.
    pub fn sync(&mut self, state: &mut PlaybackState) {
        let wanted = state
            .current_episode()
            .map(|_| (state.generation(), state.current_index()));

        if wanted != self.loaded || self.reload_requested {
            self.reload_requested = false;
            self.loaded = wanted;
            self.progress = 0;
            self.subscribed = false;
            self.load_current(state);
        }

        if self.pushed_looping != state.is_looping() {
            self.media.set_looping(state.is_looping());
            self.pushed_looping = state.is_looping();
        }

        let playing = state.is_playing();
        if playing != self.seen_playing {
            self.seen_playing = playing;
            if self.loaded.is_some() {
                if playing {
                    self.media.play();
                } else {
                    self.media.pause();
                }
            }
        }
    }

    /// Ticks the element and feeds its events back, then syncs once.
    pub fn pump(&mut self, state: &mut PlaybackState) {
        self.media.tick();
        for event in self.media.drain_events() {
            self.handle_event(state, event);
        }
        self.sync(state);
    }

    fn load_current(&mut self, state: &mut PlaybackState) {
        self.load_failed = false;
        let Some((url, declared)) = state
            .current_episode()
            .map(|episode| (episode.url.clone(), episode.duration))
        else {
            self.media.unload();
            return;
        };

        self.media.set_looping(state.is_looping());
        self.pushed_looping = state.is_looping();
        let declared = (declared > 0).then_some(declared as f64);
        match self.media.load(&url, declared) {
            Ok(()) => {
                self.media.set_current_time(0.0);
                self.media.play();
                self.seen_playing = state.is_playing();
            }
            Err(err) => {
                warn!(%url, error = %err, "failed to load episode");
                state.set_playing(false);
                self.seen_playing = false;
                self.load_failed = true;
                self.last_error = Some(err.to_string());
            }
        }
    }
}
