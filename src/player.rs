use anyhow::Result;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};
use ratatui::Frame;
use tracing::{debug, warn};

use crate::api::{FeedItem, ItemId};

pub const COLOR_LIKED: Color = Color::Rgb(0xF2, 0x4E, 0x1E);
const COLOR_TEXT: Color = Color::Rgb(205, 214, 244);
const COLOR_MUTED: Color = Color::Rgb(166, 173, 200);
const COLOR_BORDER: Color = Color::Rgb(137, 180, 250);

pub trait MediaSurface: Send {
    fn is_paused(&mut self) -> Result<bool>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
}

pub trait SurfaceFactory {
    fn open(&self, video_url: &str, title: &str) -> Result<Box<dyn MediaSurface>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    PlayPause,
    Like,
    Comment,
    Trash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelIntent {
    Like,
    ToggleComments,
    RequestDelete,
}

pub struct PanelProps<'a> {
    pub item: &'a FeedItem,
    pub liked: bool,
    pub comment_count: usize,
}

#[derive(Default)]
pub struct Panel {
    item: Option<ItemId>,
    state: PlaybackState,
    surface: Option<Box<dyn MediaSurface>>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    // A different item drops the media session.
    pub fn focus(&mut self, item: Option<ItemId>) {
        if self.item == item {
            return;
        }
        self.item = item;
        self.surface = None;
        self.state = PlaybackState::Idle;
    }

    pub fn press(
        &mut self,
        button: Button,
        item: &FeedItem,
        surfaces: &dyn SurfaceFactory,
    ) -> Option<PanelIntent> {
        match button {
            Button::PlayPause => {
                self.toggle_playback(item, surfaces);
                None
            }
            Button::Like => Some(PanelIntent::Like),
            Button::Comment => Some(PanelIntent::ToggleComments),
            Button::Trash => Some(PanelIntent::RequestDelete),
        }
    }

    pub fn toggle_playback(&mut self, item: &FeedItem, surfaces: &dyn SurfaceFactory) {
        self.focus(Some(item.id));
        if self.surface.is_none() {
            match surfaces.open(&item.video_url, &item.title) {
                Ok(surface) => self.surface = Some(surface),
                Err(err) => {
                    warn!("Error playing video: {err:#}");
                    return;
                }
            }
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        match surface.is_paused() {
            Ok(true) => match surface.play() {
                Ok(()) => {
                    debug!(item = item.id, "playback started");
                    self.state = PlaybackState::Playing;
                }
                Err(err) => warn!("Error playing video: {err:#}"),
            },
            Ok(false) => {
                if let Err(err) = surface.pause() {
                    warn!("Error pausing video: {err:#}");
                }
                self.state = PlaybackState::Idle;
            }
            Err(err) => {
                warn!("media surface unavailable: {err:#}");
                self.surface = None;
                self.state = PlaybackState::Idle;
            }
        }
    }

    pub fn sync(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let paused = match self.surface.as_mut().map(|surface| surface.is_paused()) {
            Some(Ok(paused)) => paused,
            Some(Err(err)) => {
                debug!("media surface went away: {err:#}");
                self.surface = None;
                true
            }
            None => true,
        };
        if paused {
            self.state = PlaybackState::Idle;
        }
        paused
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, props: &PanelProps<'_>) {
        let block = Block::default()
            .title(Span::styled(
                format!(" {} ", props.item.title),
                Style::default()
                    .fg(COLOR_TEXT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER))
            .padding(Padding::uniform(1));
        frame.render_widget(
            Paragraph::new(panel_text(self.state, props))
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            area,
        );
    }
}

fn panel_text(state: PlaybackState, props: &PanelProps<'_>) -> Text<'static> {
    let play_label = match state {
        PlaybackState::Idle => "▶  play (space)",
        PlaybackState::Playing => "❚❚ pause (space)",
    };
    let heart_style = if props.liked {
        Style::default().fg(COLOR_LIKED).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let heart = if props.liked { "♥" } else { "♡" };

    let mut lines = vec![
        Line::from(Span::styled(
            props.item.video_url.clone(),
            Style::default().fg(COLOR_MUTED),
        )),
        Line::default(),
        Line::from(Span::styled(
            play_label,
            Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    lines.push(Line::from(vec![
        Span::styled(format!("{heart} {}", props.item.like_num), heart_style),
        Span::raw("   "),
        Span::styled(
            format!("💬 {}", props.comment_count),
            Style::default().fg(Color::White),
        ),
        Span::raw("   "),
        Span::styled("🗑 x", Style::default().fg(COLOR_MUTED)),
    ]));
    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::feed::tests::item;

    #[derive(Default)]
    struct Shared {
        paused: AtomicBool,
        refuse_play: AtomicBool,
        opened: AtomicUsize,
    }

    struct FakeSurface(Arc<Shared>);

    impl MediaSurface for FakeSurface {
        fn is_paused(&mut self) -> Result<bool> {
            Ok(self.0.paused.load(Ordering::SeqCst))
        }

        fn play(&mut self) -> Result<()> {
            if self.0.refuse_play.load(Ordering::SeqCst) {
                return Err(anyhow!("autoplay blocked"));
            }
            self.0.paused.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.0.paused.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeFactory(Arc<Shared>);

    impl SurfaceFactory for FakeFactory {
        fn open(&self, _video_url: &str, _title: &str) -> Result<Box<dyn MediaSurface>> {
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            self.0.paused.store(true, Ordering::SeqCst);
            Ok(Box::new(FakeSurface(self.0.clone())))
        }
    }

    fn factory() -> (FakeFactory, Arc<Shared>) {
        let shared = Arc::new(Shared::default());
        (FakeFactory(shared.clone()), shared)
    }

    #[test]
    fn toggle_follows_native_state() {
        let (surfaces, shared) = factory();
        let video = item(1, "A", 0);
        let mut panel = Panel::new();
        panel.toggle_playback(&video, &surfaces);
        assert_eq!(panel.state(), PlaybackState::Playing);

        // Paused behind the panel's back: the next press starts it again.
        shared.paused.store(true, Ordering::SeqCst);
        panel.toggle_playback(&video, &surfaces);
        assert_eq!(panel.state(), PlaybackState::Playing);

        panel.toggle_playback(&video, &surfaces);
        assert_eq!(panel.state(), PlaybackState::Idle);
        assert!(shared.paused.load(Ordering::SeqCst));
        assert_eq!(shared.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_play_stays_idle() {
        let (surfaces, shared) = factory();
        shared.refuse_play.store(true, Ordering::SeqCst);
        let mut panel = Panel::new();
        panel.toggle_playback(&item(1, "A", 0), &surfaces);
        assert_eq!(panel.state(), PlaybackState::Idle);
    }

    #[test]
    fn sync_detects_intrinsic_pause() {
        let (surfaces, shared) = factory();
        let mut panel = Panel::new();
        panel.toggle_playback(&item(1, "A", 0), &surfaces);
        assert!(!panel.sync());
        shared.paused.store(true, Ordering::SeqCst);
        assert!(panel.sync());
        assert_eq!(panel.state(), PlaybackState::Idle);
    }

    #[test]
    fn item_swap_resets_to_idle() {
        let (surfaces, shared) = factory();
        let mut panel = Panel::new();
        panel.toggle_playback(&item(1, "A", 0), &surfaces);
        panel.focus(Some(2));
        assert_eq!(panel.state(), PlaybackState::Idle);
        panel.toggle_playback(&item(2, "B", 0), &surfaces);
        assert_eq!(shared.opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn buttons_emit_intents() {
        let (surfaces, _) = factory();
        let video = item(1, "A", 0);
        let mut panel = Panel::new();
        assert_eq!(
            panel.press(Button::Like, &video, &surfaces),
            Some(PanelIntent::Like)
        );
        assert_eq!(
            panel.press(Button::Comment, &video, &surfaces),
            Some(PanelIntent::ToggleComments)
        );
        assert_eq!(
            panel.press(Button::Trash, &video, &surfaces),
            Some(PanelIntent::RequestDelete)
        );
        assert_eq!(panel.press(Button::PlayPause, &video, &surfaces), None);
        assert_eq!(panel.state(), PlaybackState::Playing);
    }

    #[test]
    fn liked_count_uses_accent_colour() {
        let video = item(1, "A", 4);
        let props = PanelProps {
            item: &video,
            liked: true,
            comment_count: 2,
        };
        let text = panel_text(PlaybackState::Idle, &props);
        let counts = text.lines.last().unwrap();
        assert_eq!(counts.spans[0].content.as_ref(), "♥ 4");
        assert_eq!(counts.spans[0].style.fg, Some(COLOR_LIKED));
        assert_eq!(counts.spans[2].content.as_ref(), "💬 2");
    }
}
