use std::io::{Write, stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::{debug, trace, warn};

use crate::app::{App, Message, Model, ToastLevel, update};
use crate::book::Book;
use crate::watcher::BookWatcher;

/// Resize bursts settle for this long before the layout is rebuilt.
const RESIZE_SETTLE_MS: u64 = 100;
/// Two presses on one cell within this window form a double click.
const DOUBLE_CLICK_MS: u64 = 400;
const IDLE_POLL_MS: u64 = 250;

/// Keeps the latest value of a burst and releases it once the burst stops.
#[derive(Debug)]
pub(super) struct Debounced<T> {
    delay_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> Debounced<T> {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) fn set(&mut self, value: T, now_ms: u64) {
        self.pending = Some((value, now_ms));
    }

    pub(super) fn take(&mut self, now_ms: u64) -> Option<T> {
        let (_, at) = self.pending.as_ref()?;
        if now_ms.saturating_sub(*at) < self.delay_ms {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Turns a second press on the same cell into a double click.
pub(super) struct ClickTracker {
    window_ms: u64,
    last: Option<(u16, u16, u64)>,
}

impl ClickTracker {
    pub(super) const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last: None,
        }
    }

    /// Record a press. Returns `true` when it completes a double click.
    pub(super) fn press(&mut self, column: u16, row: u16, now_ms: u64) -> bool {
        if let Some((c, r, at)) = self.last
            && c == column
            && r == row
            && now_ms.saturating_sub(at) <= self.window_ms
        {
            self.last = None;
            return true;
        }
        self.last = Some((column, row, now_ms));
        false
    }
}

/// State carried across loop iterations.
struct LoopState {
    started: Instant,
    resize: Debounced<(u16, u16)>,
    clicks: ClickTracker,
    watcher: Option<BookWatcher>,
    redraw: bool,
    frames: u64,
}

impl LoopState {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn poll_timeout(&self) -> Duration {
        if self.redraw {
            Duration::ZERO
        } else if self.resize.is_pending() {
            Duration::from_millis(10)
        } else {
            Duration::from_millis(IDLE_POLL_MS)
        }
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the book cannot be loaded, the terminal cannot be
    /// initialized, or the event loop hits an I/O failure.
    pub fn run(&mut self) -> Result<()> {
        let book = Book::load(&self.book_path)
            .with_context(|| format!("Failed to open {}", self.book_path.display()))?;

        // Graphics are queried over stdio, before raw mode.
        let picker = crate::image::create_picker(self.force_half_cell);

        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal: folio requires an interactive terminal")?;
        let size = terminal.size()?;
        debug!(width = size.width, height = size.height, "terminal ready");

        let mut model = Model::new(
            self.book_path.clone(),
            book,
            (size.width, size.height),
            self.options,
        )
        .with_picker(Some(picker));
        model.watch_enabled = self.watch_enabled;
        model.config_global_path.clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);
        if self.start_editing {
            model.toggle_edit();
            model.refresh();
        }

        let result = Self::event_loop(&mut terminal, &mut model);

        let _ = execute!(stdout(), DisableBracketedPaste, DisableMouseCapture);
        ratatui::restore();
        result
    }

    fn dispatch(model: &mut Model, watcher: &mut Option<BookWatcher>, msg: Message) {
        trace!(?msg, "message");
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        Self::handle_message_side_effects(model, watcher, &side_msg);
    }

    fn start_watcher(model: &mut Model) -> Option<BookWatcher> {
        if !model.watch_enabled {
            return None;
        }
        Self::make_book_watcher(model)
            .inspect_err(|err| {
                warn!(path = %model.book_path.display(), %err, "watcher failed");
            })
            .map_err(|err| {
                model.watch_enabled = false;
                model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
            })
            .ok()
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let mut state = LoopState {
            started: Instant::now(),
            resize: Debounced::new(RESIZE_SETTLE_MS),
            clicks: ClickTracker::new(DOUBLE_CLICK_MS),
            watcher: Self::start_watcher(model),
            redraw: true,
            frames: 0,
        };

        execute!(stdout(), EnableMouseCapture, EnableBracketedPaste)?;
        set_mouse_motion_tracking(true)?;

        while !model.should_quit {
            Self::pump_background(&mut state, model);
            if event::poll(state.poll_timeout())? {
                Self::pump_input(&mut state, model)?;
            }
            if state.redraw {
                Self::draw(terminal, model, &mut state)?;
            }
        }

        let _ = set_mouse_motion_tracking(false);
        Ok(())
    }

    /// Timers and file changes.
    fn pump_background(state: &mut LoopState, model: &mut Model) {
        if model.expire_toast(Instant::now()) {
            state.redraw = true;
        }
        let now_ms = state.now_ms();
        if let Some((width, height)) = state.resize.take(now_ms) {
            debug!(width, height, "resize applied");
            Self::dispatch(model, &mut state.watcher, Message::Resize(width, height));
            state.redraw = true;
        }
        let changed = model.watch_enabled
            && state
                .watcher
                .as_mut()
                .is_some_and(BookWatcher::take_change_ready);
        if changed {
            Self::dispatch(model, &mut state.watcher, Message::BookChanged);
            state.redraw = true;
        }
    }

    /// Handle every queued terminal event before drawing once.
    fn pump_input(state: &mut LoopState, model: &mut Model) -> Result<()> {
        loop {
            let now_ms = state.now_ms();
            let msg = Self::handle_event(
                &event::read()?,
                model,
                now_ms,
                &mut state.resize,
                &mut state.clicks,
            );
            if let Some(msg) = msg {
                Self::dispatch(model, &mut state.watcher, msg);
                state.redraw = true;
            }
            if !event::poll(Duration::ZERO)? {
                return Ok(());
            }
        }
    }

    fn draw(
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        state: &mut LoopState,
    ) -> Result<()> {
        state.frames += 1;
        let started = Instant::now();
        terminal.draw(|frame| Self::view(model, frame))?;
        // Sheets are measured once laid out; new heights need another frame.
        if model.measure_after_draw() {
            debug!(frame = state.frames, "sparse pages changed, redrawing");
            terminal.draw(|frame| Self::view(model, frame))?;
        }
        trace!(
            frame = state.frames,
            draw_ms = started.elapsed().as_secs_f64() * 1000.0,
            "frame drawn"
        );
        state.redraw = false;
        Ok(())
    }
}

fn set_mouse_motion_tracking(enable: bool) -> std::io::Result<()> {
    // 1003 reports drags between press and release, 1006 is SGR encoding.
    let sequence: &[u8] = if enable {
        b"\x1b[?1003h\x1b[?1006h"
    } else {
        b"\x1b[?1003l\x1b[?1006l"
    };
    let mut out = stdout();
    out.write_all(sequence)?;
    out.flush()
}
