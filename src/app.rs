use crate::catalog;
use crate::config;
use crate::logging;
use crate::media::{MediaElement, NullMediaElement, RodioMediaElement};
use crate::model::{Episode, Settings};
use crate::state::PlaybackState;
use crate::surface::{PlayerAction, PlayerSurface};
use crate::ui::{self, LibraryView};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct AppStartupOptions {
    pub episodes_path: PathBuf,
    pub null_audio: bool,
    /// Start the whole listing from this index right away.
    pub play_index: Option<usize>,
}

pub struct App<M: MediaElement> {
    pub episodes: Vec<Episode>,
    pub selected: usize,
    pub state: PlaybackState,
    pub surface: PlayerSurface<M>,
    pub status: String,
    pub dirty: bool,
    scrub_seconds: f64,
    // Set while the queue is the listing itself, so queue indices are listing indices.
    queue_is_listing: bool,
}

impl<M: MediaElement> App<M> {
    pub fn new(episodes: Vec<Episode>, media: M, settings: &Settings) -> Self {
        Self {
            episodes,
            selected: 0,
            state: PlaybackState::new(),
            surface: PlayerSurface::new(media),
            status: String::from("Ready"),
            dirty: true,
            scrub_seconds: f64::from(settings.scrub_seconds),
            queue_is_listing: false,
        }
    }

    /// Returns `true` when the app should quit.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Down => self.select_next(),
            KeyCode::Up => self.select_prev(),
            KeyCode::Enter => self.play_list_from(self.selected),
            KeyCode::Char('p') => self.play_selected_single(),
            KeyCode::Char(' ') => self.run_action(PlayerAction::TogglePlay),
            KeyCode::Char('n') => self.run_action(PlayerAction::Next),
            KeyCode::Char('b') => self.run_action(PlayerAction::Previous),
            KeyCode::Char('s') => self.run_action(PlayerAction::ToggleShuffle),
            KeyCode::Char('l') => self.run_action(PlayerAction::ToggleLoop),
            KeyCode::Right | KeyCode::Char('>') => {
                self.run_action(PlayerAction::SeekBy(self.scrub_seconds));
            }
            KeyCode::Left | KeyCode::Char('<') => {
                self.run_action(PlayerAction::SeekBy(-self.scrub_seconds));
            }
            KeyCode::Char('c') => {
                self.state.clear();
                self.surface.sync(&mut self.state);
                self.set_status("Cleared player");
            }
            _ => {}
        }
        false
    }

    pub fn play_list_from(&mut self, index: usize) {
        match self.state.play_queue(self.episodes.clone(), index) {
            Ok(()) => {
                self.queue_is_listing = true;
                self.surface.sync(&mut self.state);
                self.set_status(&format!("Playing list from episode {}", index + 1));
            }
            Err(err) => self.set_status(&err.to_string()),
        }
        self.collect_error();
    }

    pub fn play_selected_single(&mut self) {
        let Some(episode) = self.episodes.get(self.selected).cloned() else {
            self.set_status("Nothing selected");
            return;
        };
        let title = episode.title.clone();
        self.queue_is_listing = false;
        self.state.play_single(episode);
        self.surface.sync(&mut self.state);
        self.set_status(&format!("Playing {title}"));
        self.collect_error();
    }

    /// Drains element events into state and reacts to them.
    pub fn pump(&mut self) {
        let before = (self.state.generation(), self.state.current_index());
        let progress = self.surface.progress();
        let playing = self.state.is_playing();

        self.surface.pump(&mut self.state);

        if before == (self.state.generation(), self.state.current_index())
            && progress == self.surface.progress()
            && playing == self.state.is_playing()
        {
            self.collect_error();
            return;
        }
        if self.state.is_empty() && !self.episodes.is_empty() && before.0 != self.state.generation() {
            self.set_status("Reached end of queue");
        }
        self.dirty = true;
        self.collect_error();
    }

    pub fn playing_index(&self) -> Option<usize> {
        let current = self.state.current_episode()?;
        if self.queue_is_listing {
            return Some(self.state.current_index());
        }
        self.episodes.iter().position(|episode| episode == current)
    }

    fn run_action(&mut self, action: PlayerAction) {
        if !self.surface.dispatch(&mut self.state, action) {
            self.set_status("Control unavailable");
            return;
        }
        self.dirty = true;
        self.collect_error();
    }

    fn select_next(&mut self) {
        if self.episodes.is_empty() {
            return;
        }
        self.selected = (self.selected + 1).min(self.episodes.len() - 1);
        self.dirty = true;
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.dirty = true;
    }

    fn collect_error(&mut self) {
        if let Some(err) = self.surface.take_error() {
            self.set_status(&format!("playback error: {err}"));
        }
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let settings = config::load_or_init_settings()?;
    let _log_guard = logging::init(&config::log_dir()?, settings.log_filter.as_deref())?;
    let episodes = catalog::load_episodes(&options.episodes_path)?;
    info!(count = episodes.len(), path = %options.episodes_path.display(), "loaded episodes");

    let media: Box<dyn MediaElement> = if options.null_audio {
        Box::new(NullMediaElement::new())
    } else {
        match RodioMediaElement::new() {
            Ok(element) => Box::new(element),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "no audio output, using silent element");
                Box::new(NullMediaElement::new())
            }
        }
    };

    let mut app = App::new(episodes, media, &settings);
    if let Some(index) = options.play_index {
        app.selected = index.min(app.episodes.len().saturating_sub(1));
        app.play_list_from(index);
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let tick = Duration::from_millis(settings.tick_millis.max(16));
    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        app.pump();

        if app.dirty || last_draw.elapsed() > tick {
            let player = app.surface.view(&app.state);
            let library = LibraryView {
                episodes: &app.episodes,
                selected: app.selected,
                playing: app.playing_index(),
            };
            terminal.draw(|frame| ui::draw(frame, &library, &player, &app.status))?;
            app.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if app.handle_key(key.code, key.modifiers) {
            break Ok(());
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("shutting down");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn episode(title: &str, duration: u64) -> Episode {
        Episode {
            title: title.to_string(),
            thumbnail: String::new(),
            members: String::from("crew"),
            duration,
            url: format!("{title}.mp3"),
        }
    }

    fn app() -> App<NullMediaElement> {
        App::new(
            vec![episode("a", 60), episode("b", 60), episode("c", 60)],
            NullMediaElement::new(),
            &Settings::default(),
        )
    }

    fn press(app: &mut App<NullMediaElement>, ch: char) -> bool {
        app.handle_key(KeyCode::Char(ch), KeyModifiers::NONE)
    }

    #[test]
    fn enter_plays_listing_from_selection() {
        let mut app = app();
        app.handle_key(KeyCode::Down, KeyModifiers::NONE);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(app.state.len(), 3);
        assert_eq!(app.state.current_index(), 1);
        assert_eq!(app.playing_index(), Some(1));

        app.pump();
        assert!(app.state.is_playing());
        assert!(app.surface.is_subscribed());
        assert!(!app.surface.media().is_paused());
    }

    #[test]
    fn single_play_disables_navigation() {
        let mut app = app();
        press(&mut app, 'p');
        app.pump();

        assert_eq!(app.state.len(), 1);
        press(&mut app, 'n');
        assert_eq!(app.status, "Control unavailable");
        press(&mut app, 's');
        assert!(!app.state.is_shuffling());
    }

    #[test]
    fn space_pauses_element_and_state() {
        let mut app = app();
        app.play_list_from(0);
        app.pump();

        press(&mut app, ' ');
        app.pump();

        assert!(!app.state.is_playing());
        assert!(app.surface.media().is_paused());
    }

    #[test]
    fn seek_keys_move_counter_by_scrub_step() {
        let mut app = app();
        app.play_list_from(0);
        app.pump();

        app.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert!(app.surface.progress() >= 10);
        app.handle_key(KeyCode::Left, KeyModifiers::NONE);
        app.handle_key(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(app.surface.progress(), 0);
    }

    #[test]
    fn finished_last_episode_returns_to_idle() {
        let mut app = app();
        app.play_list_from(2);
        app.pump();
        app.surface
            .media_mut()
            .set_duration(Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));

        app.pump();
        app.pump();

        assert!(app.state.current_episode().is_none());
        assert_eq!(app.status, "Reached end of queue");
    }

    #[test]
    fn finished_episode_advances_and_keeps_playing() {
        let mut app = app();
        app.play_list_from(0);
        app.pump();
        app.surface
            .media_mut()
            .set_duration(Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));

        app.pump();
        assert_eq!(app.state.current_index(), 1);
        app.pump();
        assert!(app.state.is_playing());
    }

    #[test]
    fn duplicate_listing_entries_mark_the_played_row() {
        let mut app = App::new(
            vec![episode("a", 60), episode("a", 60), episode("b", 60)],
            NullMediaElement::new(),
            &Settings::default(),
        );
        app.play_list_from(1);
        assert_eq!(app.playing_index(), Some(1));

        app.selected = 1;
        press(&mut app, 'p');
        assert_eq!(app.playing_index(), Some(0));
    }

    #[test]
    fn clear_and_quit_keys() {
        let mut app = app();
        app.play_list_from(0);
        press(&mut app, 'c');
        assert!(app.state.current_episode().is_none());
        assert!(press(&mut app, 'q'));
        assert!(app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
    }

    #[test]
    fn out_of_range_start_is_reported() {
        let mut app = app();
        app.play_list_from(9);
        assert!(app.state.current_episode().is_none());
        assert!(app.status.contains("out of range"));
    }
}
