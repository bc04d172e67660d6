mod app;
mod ui;

pub use app::{App, InputEvent, TuiHooks};

use crate::trace::StackTree;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::time::Duration;

pub fn run_tui(stack: StackTree<TuiHooks>, file_path: Option<String>) -> io::Result<()> {
    init_file_logging()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(stack, file_path);

    // Run the main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

/// Log to a file under the cache directory, only when RUST_LOG is set.
/// The terminal belongs to the UI, so stderr is not an option.
fn init_file_logging() -> io::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        return Ok(());
    }

    let log_dir = dirs::cache_dir()
        .or_else(dirs::state_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("stree-tui");
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("stree-tui.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::new()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .parse_default_env()
        .init();

    log::info!("Starting stree-tui - log file: {}", log_path.display());
    Ok(())
}

fn run_app<B: ratatui::backend::Backend + io::Write>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), B::Error>
where
    B::Error: From<std::io::Error>,
{
    loop {
        let app_ref = &mut *app;
        terminal.draw(move |f| ui::draw(f, app_ref))?;

        if let Some(event) = get_event()? {
            app.handle_event(event);
        }

        if app.should_quit {
            return Ok(());
        }

        // Check if we need to open an editor
        if let Some((file, line)) = app.pending_editor_open.take() {
            // Suspend the TUI - proper cleanup
            disable_raw_mode()?;
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                DisableMouseCapture
            )?;
            terminal.show_cursor()?;

            // Flush the terminal to ensure all commands are executed
            io::stdout().flush()?;

            if let Err(e) = open_editor_foreground(&file, line) {
                eprintln!("Error opening editor: {}", e);
                // Wait for user to press Enter before continuing
                eprintln!("Press Enter to continue...");
                let mut input = String::new();
                io::stdin().read_line(&mut input).ok();
            }

            // Resume the TUI
            enable_raw_mode()?;
            execute!(
                terminal.backend_mut(),
                EnterAlternateScreen,
                EnableMouseCapture
            )?;
            terminal.hide_cursor()?;

            // Force a full redraw
            terminal.clear()?;
        }
    }
}

pub fn get_event() -> io::Result<Option<InputEvent>> {
    if !event::poll(Duration::from_millis(100))? {
        return Ok(None);
    }

    match event::read()? {
        // Only process key press events, not release
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(InputEvent::Key(key))),
        Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
            Ok(Some(InputEvent::Mouse(mouse)))
        }
        _ => Ok(None),
    }
}

/// Arguments that make `editor` open `file` at `line`
fn editor_line_args(editor: &str, file: &str, line: u32) -> Vec<String> {
    match editor {
        "code" | "vscode" | "code-insiders" => {
            // --wait keeps it blocking like a terminal editor
            vec![
                "--wait".to_string(),
                "--goto".to_string(),
                format!("{}:{}", file, line),
            ]
        }
        "subl" | "sublime" | "sublime_text" => {
            vec!["--wait".to_string(), format!("{}:{}", file, line)]
        }
        "micro" | "helix" | "hx" => vec![format!("{}:{}", file, line)],
        "kate" => vec!["-l".to_string(), line.to_string(), file.to_string()],
        // vim, nano, emacs, gedit and unknown editors take +line
        _ => vec![format!("+{}", line), file.to_string()],
    }
}

/// Open editor in foreground (blocking)
fn open_editor_foreground(file: &str, line: u32) -> Result<(), String> {
    use std::process::Command;

    let editor_env = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    // EDITOR may carry arguments, like "code --wait"
    let parts: Vec<&str> = editor_env.split_whitespace().collect();
    let Some((editor_cmd, editor_args)) = parts.split_first() else {
        return Err("EDITOR is empty".to_string());
    };

    let editor_name = std::path::Path::new(editor_cmd)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(editor_cmd);

    let mut cmd = Command::new(editor_cmd);
    cmd.args(editor_args);
    cmd.args(editor_line_args(editor_name, file, line));

    log::debug!("Opening editor: {:?}", cmd);

    // TUI editors need the real terminal
    cmd.stdin(std::process::Stdio::inherit());
    cmd.stdout(std::process::Stdio::inherit());
    cmd.stderr(std::process::Stdio::inherit());

    let status = cmd
        .status()
        .map_err(|e| format!("Failed to run editor: {}", e))?;

    if !status.success() {
        return Err(format!("Editor exited with status: {}", status));
    }

    Ok(())
}
