use podcastr::media::{MediaElement, MediaEvent, NullMediaElement};
use podcastr::model::Episode;
use podcastr::state::PlaybackState;
use podcastr::surface::{PlayerAction, PlayerSurface};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::thread;
use std::time::Duration;

fn episode(title: &str) -> Episode {
    Episode {
        title: title.to_string(),
        thumbnail: format!("https://example.com/{title}.jpg"),
        members: String::from("crew"),
        duration: 300,
        url: format!("{title}.mp3"),
    }
}

fn queue(titles: &[&str]) -> Vec<Episode> {
    titles.iter().map(|title| episode(title)).collect()
}

#[test]
fn listing_flow_walks_forward_and_back() {
    let mut state = PlaybackState::with_rng(SmallRng::seed_from_u64(11));
    let mut surface = PlayerSurface::new(NullMediaElement::new());

    state.play_queue(queue(&["a", "b", "c"]), 1).expect("queue");
    surface.sync(&mut state);
    surface.pump(&mut state);
    assert!(state.is_playing());

    assert!(surface.dispatch(&mut state, PlayerAction::Next));
    assert_eq!(state.current_index(), 2);
    assert!(!state.has_next());
    assert!(!surface.dispatch(&mut state, PlayerAction::Next));
    assert_eq!(state.current_index(), 2);

    assert!(surface.dispatch(&mut state, PlayerAction::Previous));
    assert!(surface.dispatch(&mut state, PlayerAction::Previous));
    assert_eq!(state.current_index(), 0);
    assert!(!surface.view(&state).controls.previous.enabled);
}

#[test]
fn seek_shows_new_position_before_time_update() {
    let mut state = PlaybackState::with_rng(SmallRng::seed_from_u64(11));
    let mut surface = PlayerSurface::new(NullMediaElement::new());
    state.play_single(episode("solo"));
    surface.sync(&mut state);

    surface.seek(&state, 123.75);

    assert_eq!(surface.progress(), 123);
    assert_eq!(surface.view(&state).elapsed_seconds, 123);
    assert!(surface.media().current_time() >= 123.75);
}

#[test]
fn ended_with_shuffle_stays_loaded_and_playing() {
    let mut state = PlaybackState::with_rng(SmallRng::seed_from_u64(11));
    let mut surface = PlayerSurface::new(NullMediaElement::new());
    state.play_queue(queue(&["a", "b", "c", "d", "e"]), 4).expect("queue");
    surface.sync(&mut state);
    surface.pump(&mut state);
    assert!(surface.dispatch(&mut state, PlayerAction::ToggleShuffle));

    for _ in 0..50 {
        surface.handle_event(&mut state, MediaEvent::Pause);
        surface.handle_event(&mut state, MediaEvent::Ended);
        surface.sync(&mut state);
        surface.pump(&mut state);

        assert!(state.current_index() < 5);
        assert!(state.current_episode().is_some());
        assert!(state.is_playing());
    }
}

#[test]
fn ended_without_next_goes_idle_but_keeps_modifiers() {
    let mut state = PlaybackState::with_rng(SmallRng::seed_from_u64(11));
    let mut surface = PlayerSurface::new(NullMediaElement::new());
    state.play_queue(queue(&["a", "b"]), 1).expect("queue");
    surface.sync(&mut state);
    assert!(surface.dispatch(&mut state, PlayerAction::ToggleLoop));

    surface.handle_event(&mut state, MediaEvent::Ended);
    surface.sync(&mut state);

    assert!(state.current_episode().is_none());
    assert!(state.is_looping());
    assert_eq!(surface.progress(), 0);
    assert!(!surface.view(&state).controls.play_pause.enabled);
}

#[test]
fn unprobeable_sources_end_on_declared_duration() {
    let mut state = PlaybackState::with_rng(SmallRng::seed_from_u64(11));
    let mut surface = PlayerSurface::new(NullMediaElement::new());
    let remote: Vec<Episode> = ["first", "second"]
        .iter()
        .map(|title| Episode {
            duration: 1,
            url: format!("https://cdn.example.com/{title}.mp3"),
            ..episode(title)
        })
        .collect();
    state.play_queue(remote, 0).expect("queue");
    surface.sync(&mut state);

    for _ in 0..25 {
        surface.pump(&mut state);
        let view = surface.view(&state);
        assert!(view.elapsed_seconds <= view.duration_seconds);
        if state.current_index() == 1 {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    assert_eq!(state.current_index(), 1);
    surface.pump(&mut state);
    assert!(state.is_playing());
    assert_eq!(surface.progress(), 0);
}
