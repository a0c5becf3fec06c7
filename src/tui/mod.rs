pub mod app;
pub mod log;
pub mod ui;

use crate::config::SurveyConfig;
use crate::core::{Dataset, LoadEvent, load};
use crate::tui::app::{AppState, ExportKind, Focus};
use crate::tui::ui::draw_ui;
use crate::watch::{Debouncer, SurveyWatcher};

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, unbounded};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::thread;
use std::{io, time::Duration};

type LoadResult = std::result::Result<Dataset, String>;

/// Loader channels shared by every reload of a session.
struct Loader {
    config: SurveyConfig,
    events_tx: Sender<LoadEvent>,
    events_rx: Receiver<LoadEvent>,
    result_tx: Sender<LoadResult>,
    result_rx: Receiver<LoadResult>,
}

impl Loader {
    fn new(config: SurveyConfig) -> Self {
        let (events_tx, events_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();
        Self {
            config,
            events_tx,
            events_rx,
            result_tx,
            result_rx,
        }
    }

    /// Loads on a worker thread; the UI keeps drawing the previous dataset.
    fn spawn(&self, state: &mut AppState) {
        if state.is_loading {
            return;
        }
        state.is_loading = true;
        state.status_message = "RELOADING...".to_string();

        let config = self.config.clone();
        let events_tx = self.events_tx.clone();
        let result_tx = self.result_tx.clone();
        thread::spawn(move || {
            let result = load(&config, Some(events_tx)).map_err(|e| e.to_string());
            let _ = result_tx.send(result);
        });
    }
}

pub fn start_tui(config: SurveyConfig, watch: bool, logs: Receiver<String>) -> Result<()> {
    // 1. Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 2. Run
    let result = run_app(&mut terminal, config, watch, logs);

    // 3. Cleanup
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: SurveyConfig,
    watch: bool,
    logs: Receiver<String>,
) -> Result<()> {
    let mut state = AppState::new(config.clone());
    let loader = Loader::new(config.clone());
    loader.spawn(&mut state);

    let watcher = if watch {
        match SurveyWatcher::new(&config.data_dir, config.recursive) {
            Ok(w) => {
                state.watching = true;
                state.add_log(format!("Watching {} for changes.", config.data_dir.display()));
                Some(w)
            }
            Err(e) => {
                state.add_log(format!("ERROR: {:#}", e));
                None
            }
        }
    } else {
        None
    };
    let mut debouncer = Debouncer::new(Duration::from_millis(500));

    loop {
        state.on_tick();
        terminal.draw(|f| draw_ui(f, &mut state))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key(&mut state, &loader, key.code) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollDown => scroll(&mut state, true),
                    MouseEventKind::ScrollUp => scroll(&mut state, false),
                    _ => {}
                },
                _ => {}
            }
        }

        for line in logs.try_iter() {
            state.add_log(line);
        }

        while let Ok(event) = loader.events_rx.try_recv() {
            state.on_load_event(event);
        }

        if let Ok(result) = loader.result_rx.try_recv() {
            match result {
                Ok(dataset) => state.on_dataset(dataset),
                Err(e) => state.on_load_failed(e),
            }
        }

        if let Some(watcher) = &watcher {
            let events = watcher.pending_events();
            if !events.is_empty() && debouncer.any_relevant(&events) {
                state.add_log("Change detected in data folder.".to_string());
                loader.spawn(&mut state);
            }
            if state.tick_count % 200 == 0 {
                debouncer.cleanup();
            }
        }
    }
}

/// Returns true when the app should quit.
fn handle_key(state: &mut AppState, loader: &Loader, code: KeyCode) -> bool {
    if state.show_help {
        if matches!(code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            state.show_help = false;
        }
        return false;
    }

    // Global keys
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('?') => state.show_help = true,
        KeyCode::Tab => state.next_tab(),
        KeyCode::Char(c @ '1'..='4') => state.select_tab(c as usize - '1' as usize),
        KeyCode::Char('r') => loader.spawn(state),
        KeyCode::Char('f') => state.toggle_focus(),
        KeyCode::Char('c') => {
            state.clear_filters();
            state.status_message = "Filters cleared".to_string();
        }
        _ => {}
    }

    match state.active_tab {
        // Question explorer and demographics share the filter panel
        0 | 1 => match (state.focus, code) {
            (Focus::Questions, KeyCode::Down | KeyCode::Char('j')) => state.next_question(),
            (Focus::Questions, KeyCode::Up | KeyCode::Char('k')) => state.previous_question(),
            (Focus::Filters, KeyCode::Down | KeyCode::Char('j')) => state.next_filter(),
            (Focus::Filters, KeyCode::Up | KeyCode::Char('k')) => state.previous_filter(),
            (Focus::Filters, KeyCode::Right | KeyCode::Char('l')) => state.cycle_filter_value(true),
            (Focus::Filters, KeyCode::Left | KeyCode::Char('h')) => {
                state.cycle_filter_value(false)
            }
            (Focus::Filters, KeyCode::Char(' ') | KeyCode::Enter) => state.toggle_filter_value(),
            _ => {}
        },
        2 => match code {
            KeyCode::Down | KeyCode::Char('j') => state.scroll_down(1),
            KeyCode::Up | KeyCode::Char('k') => state.scroll_up(1),
            KeyCode::PageDown => state.scroll_down(20),
            KeyCode::PageUp => state.scroll_up(20),
            _ => {}
        },
        3 => {
            let kind = match code {
                KeyCode::Char('e') => Some(ExportKind::Table),
                KeyCode::Char('s') => Some(ExportKind::Summary),
                KeyCode::Char('a') => Some(ExportKind::Analysis),
                _ => None,
            };
            if let Some(kind) = kind {
                match state.export(kind) {
                    Ok(path) => {
                        state.status_message = format!("Exported to {}", path.display());
                        state.add_log(format!("Exported {}", path.display()));
                    }
                    Err(e) => {
                        state.status_message = format!("ERROR: {:#}", e);
                        state.add_log(format!("ERROR: export failed: {:#}", e));
                    }
                }
            }
        }
        _ => {}
    }
    false
}

fn scroll(state: &mut AppState, down: bool) {
    match (state.active_tab, down) {
        (2, true) => state.scroll_down(3),
        (2, false) => state.scroll_up(3),
        (_, true) => state.next_question(),
        (_, false) => state.previous_question(),
    }
}
