use crate::model::Episode;
use crate::surface::{ControlState, PlayerView};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

const APP_TITLE: &str = "Podcastr  ";
const SCRUBBER_WIDTH: usize = 32;

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    rail: Color,
    selected_bg: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    panel_alt_bg: Color::Rgb(36, 24, 66),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(110, 120, 140),
    accent: Color::Rgb(4, 211, 97),
    alert: Color::Rgb(249, 174, 88),
    rail: Color::Rgb(159, 117, 255),
    selected_bg: Color::Rgb(34, 55, 82),
};

/// Episode listing shown beside the player.
pub struct LibraryView<'a> {
    pub episodes: &'a [Episode],
    pub selected: usize,
    /// Index into `episodes` that is loaded in the player, if any.
    pub playing: Option<usize>,
}

pub fn draw(frame: &mut Frame, library: &LibraryView, player: &PlayerView, status: &str) {
    let colors = PALETTE;
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[0]);

    draw_library(frame, library, body[0], &colors);
    draw_player(frame, player, body[1], &colors);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            "Keys: Enter play list, p play one, space pause, n/b next/prev, s shuffle, l loop, </> seek, c clear, q quit",
            Style::default().fg(colors.muted),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(status, Style::default().fg(colors.text)),
    ]))
    .block(panel_block("Message", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(footer, vertical[1]);
}

fn draw_library(frame: &mut Frame, library: &LibraryView, area: Rect, colors: &Palette) {
    let items: Vec<ListItem> = library
        .episodes
        .iter()
        .enumerate()
        .map(|(idx, episode)| {
            let marker = if library.playing == Some(idx) {
                "  > "
            } else {
                "    "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.accent)),
                Span::styled(episode.title.as_str(), Style::default().fg(colors.text)),
                Span::styled(
                    format!("  {}  {}", episode.members, format_time(episode.duration)),
                    Style::default().fg(colors.muted),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!library.episodes.is_empty()).then_some(library.selected));

    let title = format!("{APP_TITLE}Episodes {}", library.episodes.len());
    let list = List::new(items)
        .block(panel_block(&title, colors.panel_bg, colors.text, colors.border))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_player(frame: &mut Frame, player: &PlayerView, area: Rect, colors: &Palette) {
    let block = panel_block("Now playing", colors.panel_alt_bg, colors.text, colors.border);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let header = match &player.episode {
        Some(episode) => vec![
            Line::from(Span::styled(
                episode.title.as_str(),
                Style::default()
                    .fg(colors.text)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                episode.members.as_str(),
                Style::default().fg(colors.muted),
            )),
            Line::from(Span::styled(
                episode.thumbnail.as_str(),
                Style::default().fg(colors.rail),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "Select a podcast to listen",
            Style::default()
                .fg(colors.alert)
                .add_modifier(Modifier::BOLD),
        ))],
    };
    frame.render_widget(
        Paragraph::new(header).wrap(Wrap { trim: true }),
        sections[0],
    );

    frame.render_widget(
        Paragraph::new(scrubber_line(player, colors)).alignment(Alignment::Center),
        sections[1],
    );
    frame.render_widget(
        Paragraph::new(controls_line(player, colors)).alignment(Alignment::Center),
        sections[2],
    );
}

fn scrubber_line(player: &PlayerView, colors: &Palette) -> Line<'static> {
    let elapsed = Span::styled(
        format_time(player.elapsed_seconds),
        Style::default().fg(colors.text),
    );
    let total = Span::styled(
        format_time(player.duration_seconds),
        Style::default().fg(colors.text),
    );

    if player.episode.is_none() {
        return Line::from(vec![
            elapsed,
            Span::styled(
                format!(" {} ", "-".repeat(SCRUBBER_WIDTH)),
                Style::default().fg(colors.muted),
            ),
            total,
        ]);
    }

    let filled = filled_cells(player.elapsed_seconds, player.duration_seconds, SCRUBBER_WIDTH);
    Line::from(vec![
        elapsed,
        Span::raw(" "),
        Span::styled("=".repeat(filled), Style::default().fg(colors.accent)),
        Span::styled(
            "-".repeat(SCRUBBER_WIDTH - filled),
            Style::default().fg(colors.rail),
        ),
        Span::raw(" "),
        total,
    ])
}

fn controls_line(player: &PlayerView, colors: &Palette) -> Line<'static> {
    let controls = &player.controls;
    let play_label = if controls.play_pause.active {
        "[ pause ]"
    } else {
        "[ play ]"
    };
    let buttons = [
        ("[shuffle]", controls.shuffle, true),
        ("[prev]", controls.previous, false),
        (play_label, controls.play_pause, false),
        ("[next]", controls.next, false),
        ("[loop]", controls.repeat, true),
    ];

    let mut spans = Vec::with_capacity(buttons.len() * 2);
    for (idx, (label, control, toggles)) in buttons.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(label, button_style(control, toggles, colors)));
    }
    Line::from(spans)
}

fn button_style(control: ControlState, toggles: bool, colors: &Palette) -> Style {
    if !control.enabled {
        return Style::default()
            .fg(colors.muted)
            .add_modifier(Modifier::DIM);
    }
    if toggles && control.active {
        return Style::default()
            .fg(colors.accent)
            .add_modifier(Modifier::BOLD);
    }
    Style::default().fg(colors.text)
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn filled_cells(elapsed: u64, duration: u64, width: usize) -> usize {
    if duration == 0 {
        return 0;
    }
    let ratio = (elapsed as f64 / duration as f64).clamp(0.0, 1.0);
    (ratio * width as f64).round() as usize
}

/// `mm:ss`, with minutes running past 59 for long episodes.
pub fn format_time(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}
