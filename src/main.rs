use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use todo_tui::app::App;
use todo_tui::config::Config;
use todo_tui::identity::{GoogleSignIn, HttpScriptLoader};
use todo_tui::token_store::FileTokenStore;
use todo_tui::{logging, ui, HttpBackend, Session};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    logging::setup_logging(&config.data_dir)?;
    info!(api_url = %config.api_url, "Starting todo-tui");

    let backend = Arc::new(HttpBackend::new(&config.api_url)?);
    let session = Session::new(Box::new(FileTokenStore::new(&config.data_dir)));
    let mut app = App::new(session, backend);
    let sign_in = GoogleSignIn::new(HttpScriptLoader::new()?);

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    // Provider script loads in the background; only the restore holds the
    // loading screen.
    app.load_sign_in(sign_in, config.provider());
    terminal.draw(|f| ui::draw(f, &mut app))?;
    app.start().await;

    let res = ui::run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "Terminal loop failed");
        eprintln!("Error: {:?}", err);
    }

    info!("Exiting");
    Ok(())
}
