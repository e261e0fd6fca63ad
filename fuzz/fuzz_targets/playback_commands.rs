#![no_main]

use libfuzzer_sys::fuzz_target;
use podcastr::media::{MediaEvent, NullMediaElement};
use podcastr::model::Episode;
use podcastr::state::PlaybackState;
use podcastr::surface::{PlayerAction, PlayerSurface};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fuzz_target!(|data: &[u8]| {
    let mut state = PlaybackState::with_rng(SmallRng::seed_from_u64(0));
    let mut surface = PlayerSurface::new(NullMediaElement::new());
    let len = (data.len() % 32).max(1);
    let episodes: Vec<Episode> = (0..len)
        .map(|idx| Episode {
            title: format!("episode_{idx}"),
            thumbnail: String::new(),
            members: String::new(),
            duration: 60,
            url: format!("episode_{idx}.mp3"),
        })
        .collect();

    for byte in data {
        match byte % 12 {
            0 => {
                let _ = state.play_queue(episodes.clone(), usize::from(*byte) % (len + 1));
            }
            1 => state.play_single(episodes[0].clone()),
            2 => {
                surface.dispatch(&mut state, PlayerAction::TogglePlay);
            }
            3 => {
                surface.dispatch(&mut state, PlayerAction::Next);
            }
            4 => {
                surface.dispatch(&mut state, PlayerAction::Previous);
            }
            5 => {
                surface.dispatch(&mut state, PlayerAction::ToggleShuffle);
            }
            6 => {
                surface.dispatch(&mut state, PlayerAction::ToggleLoop);
            }
            7 => {
                surface.dispatch(&mut state, PlayerAction::Seek(f64::from(*byte)));
            }
            8 => surface.handle_event(&mut state, MediaEvent::Ended),
            9 => surface.handle_event(&mut state, MediaEvent::TimeUpdate),
            10 => state.clear(),
            _ => surface.pump(&mut state),
        }
        surface.sync(&mut state);

        assert_eq!(state.has_previous(), state.current_index() > 0);
        assert_eq!(
            state.has_next(),
            state.is_shuffling() || state.current_index() + 1 < state.len()
        );
        let view = surface.view(&state);
        assert!(view.elapsed_seconds <= view.duration_seconds);
        if state.is_empty() {
            assert!(state.current_episode().is_none());
        } else {
            assert!(state.current_index() < state.len());
        }
    }
});
