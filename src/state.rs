use crate::error::{PlaybackError, Result};
use crate::model::Episode;
use rand::rngs::SmallRng;
use rand::rngs::SysRng;
use rand::{RngExt, SeedableRng};
use tracing::debug;

/// Queue, current selection and modifier flags for the player.
///
/// Every mutation goes through the methods below. `has_next` and
/// `has_previous` are computed from the queue on each call.
#[derive(Debug)]
pub struct PlaybackState {
    episodes: Vec<Episode>,
    current_index: usize,
    is_playing: bool,
    is_looping: bool,
    is_shuffling: bool,
    generation: u64,
    shuffle_rng: SmallRng,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::try_from_rng(&mut SysRng).expect("failed to seed SmallRng from OS entropy"))
    }

    pub fn with_rng(shuffle_rng: SmallRng) -> Self {
        Self {
            episodes: Vec::new(),
            current_index: 0,
            is_playing: false,
            is_looping: false,
            is_shuffling: false,
            generation: 0,
            shuffle_rng,
        }
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.episodes.get(self.current_index)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn is_shuffling(&self) -> bool {
        self.is_shuffling
    }

    /// Bumped every time the queue is replaced or cleared.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.is_shuffling || self.current_index + 1 < self.episodes.len()
    }

    pub fn play_single(&mut self, episode: Episode) {
        debug!(title = %episode.title, "playing single episode");
        self.replace_queue(vec![episode], 0);
    }

    /// Replaces the queue and starts at `start_index`.
    ///
    /// An index outside the new queue is rejected and leaves the state as it was.
    pub fn play_queue(&mut self, episodes: Vec<Episode>, start_index: usize) -> Result<()> {
        if start_index >= episodes.len() {
            return Err(PlaybackError::InvalidIndex {
                index: start_index,
                len: episodes.len(),
            });
        }

        debug!(len = episodes.len(), start_index, "playing queue");
        self.replace_queue(episodes, start_index);
        Ok(())
    }

    pub fn toggle_playing(&mut self) {
        self.is_playing = !self.is_playing;
        debug!(is_playing = self.is_playing, "toggled playing");
    }

    pub fn toggle_looping(&mut self) {
        self.is_looping = !self.is_looping;
        debug!(is_looping = self.is_looping, "toggled looping");
    }

    pub fn toggle_shuffling(&mut self) {
        self.is_shuffling = !self.is_shuffling;
        debug!(is_shuffling = self.is_shuffling, "toggled shuffling");
    }

    pub fn set_playing(&mut self, state: bool) {
        self.is_playing = state;
    }

    /// Shuffle picks any position, the current one included.
    pub fn play_next(&mut self) {
        if self.is_shuffling {
            if self.episodes.is_empty() {
                return;
            }
            self.current_index = self.shuffle_rng.random_range(0..self.episodes.len());
            debug!(index = self.current_index, "shuffled to episode");
        } else if self.has_next() {
            self.current_index += 1;
            debug!(index = self.current_index, "advanced to next episode");
        }
    }

    pub fn play_previous(&mut self) {
        if self.has_previous() {
            self.current_index -= 1;
            debug!(index = self.current_index, "went back to previous episode");
        }
    }

    /// Empties the queue. Flags survive.
    pub fn clear(&mut self) {
        self.episodes.clear();
        self.current_index = 0;
        self.generation = self.generation.wrapping_add(1);
        debug!("cleared playback queue");
    }

    fn replace_queue(&mut self, episodes: Vec<Episode>, index: usize) {
        self.episodes = episodes;
        self.current_index = index;
        self.is_playing = true;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn episode(title: &str) -> Episode {
    Episode {
        title: title.to_string(),
        thumbnail: format!("https://example.com/{title}.jpg"),
        members: String::from("host"),
        duration: 60,
        url: format!("{title}.mp3"),
    }
}
