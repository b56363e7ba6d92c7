//! Terminal setup and the event loop that drives [`App`].

use std::io;
use std::io::Stdout;
use std::io::stdout;
use std::path::Path;
use std::path::PathBuf;

use crossterm::cursor::Show;
use crossterm::event::DisableBracketedPaste;
use crossterm::event::EnableBracketedPaste;
use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::execute;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::StreamExt;
use writeup_client::ActiveSession;
use writeup_client::WriteupClient;
use writeup_client::download::save_download;
use writeup_protocol::wire::ExportFormat;

use crate::AppExitInfo;
use crate::ExitReason;
use crate::app::App;
use crate::app::AppConfig;
use crate::app::Effect;
use crate::app_event::AppEvent;
use crate::clipboard_paste::paste_image_as_data_url;

pub type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

/// Enter raw mode and the alternate screen with bracketed paste enabled.
pub fn init() -> io::Result<Terminal> {
    enable_raw_mode()?;
    set_panic_hook();
    if let Err(err) = execute!(stdout(), EnterAlternateScreen, EnableBracketedPaste) {
        let _ = restore();
        return Err(err);
    }
    let mut terminal = ratatui::Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;
    Ok(terminal)
}

/// Undo [`init`]. Safe to call more than once.
pub fn restore() -> io::Result<()> {
    let screen = execute!(stdout(), DisableBracketedPaste, LeaveAlternateScreen, Show);
    disable_raw_mode()?;
    screen
}

fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore();
        hook(info);
    }));
}

/// Run the interactive screen until the user quits.
pub async fn run_app(config: AppConfig, client: WriteupClient) -> anyhow::Result<AppExitInfo> {
    let mut terminal = init()?;
    let result = run_event_loop(&mut terminal, App::new(config), client).await;
    let restored = restore();
    let exit_info = result?;
    restored?;
    Ok(exit_info)
}

async fn run_event_loop(
    terminal: &mut Terminal,
    mut app: App,
    client: WriteupClient,
) -> anyhow::Result<AppExitInfo> {
    let (app_event_tx, mut app_event_rx) = unbounded_channel::<AppEvent>();
    let mut events = EventStream::new();

    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(&app, area);
            if let Some(position) = app.cursor_position(area) {
                frame.set_cursor_position(position);
            }
        })?;

        if let Some(reason) = app.exit_reason().cloned() {
            return Ok(AppExitInfo {
                session: app.into_session(),
                exit_reason: reason,
            });
        }

        tokio::select! {
            maybe_event = events.next() => {
                let Some(event) = maybe_event else {
                    app.request_exit(ExitReason::InputClosed);
                    continue;
                };
                match event? {
                    Event::Key(key_event) => {
                        if let Some(effect) = app.handle_key(key_event) {
                            run_effect(&mut app, effect, &client, &app_event_tx);
                        }
                    }
                    Event::Paste(pasted) => app.handle_paste(&pasted),
                    // Resize and focus changes only need the redraw at the top of the loop.
                    _ => {}
                }
            }
            Some(app_event) = app_event_rx.recv() => app.on_app_event(app_event),
        }
    }
}

fn run_effect(
    app: &mut App,
    effect: Effect,
    client: &WriteupClient,
    app_event_tx: &UnboundedSender<AppEvent>,
) {
    match effect {
        Effect::Generate { request, guard } => {
            let client = client.clone();
            let tx = app_event_tx.clone();
            tokio::spawn(async move {
                let result = client.generate(&request).await;
                if tx
                    .send(AppEvent::GenerationFinished {
                        request,
                        result,
                        guard,
                    })
                    .is_err()
                {
                    tracing::debug!("generation finished after the app loop exited");
                }
            });
        }
        Effect::Export { format, session } => {
            let client = client.clone();
            let tx = app_event_tx.clone();
            let download_dir = app.config().download_dir.clone();
            tokio::spawn(async move {
                let result = export_to_dir(&client, format, &session, &download_dir).await;
                if tx
                    .send(AppEvent::ExportFinished { format, result })
                    .is_err()
                {
                    tracing::debug!(?format, "export finished after the app loop exited");
                }
            });
        }
        Effect::ReadClipboardImage => app.attach_pasted_image(paste_image_as_data_url()),
    }
}

async fn export_to_dir(
    client: &WriteupClient,
    format: ExportFormat,
    session: &ActiveSession,
    download_dir: &Path,
) -> Result<PathBuf, String> {
    let bytes = client
        .export_session(format, Some(session))
        .await
        .map_err(|err| {
            tracing::warn!(format = format.short_name(), "export failed: {err}");
            err.user_message()
        })?;
    save_download(download_dir, format.default_file_name(), &bytes).map_err(|err| {
        tracing::warn!("saving export failed: {err:#}");
        format!("Could not save the {} export: {err:#}", format.short_name())
    })
}
