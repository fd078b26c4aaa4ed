use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use docchat_core::{Config, FileConfig};
use tracing::{error, info};

mod app;
mod handler;
mod logging;
mod page;
mod tui;
mod ui;

use app::App;
use page::Page;

#[derive(Parser)]
#[command(name = "docchat", version)]
#[command(about = "Read documentation in the terminal and ask an AI assistant about it")]
struct Cli {
    /// Documentation page to open (markdown or plain text)
    page: Option<PathBuf>,

    /// Question-answering backend, overrides DOCCHAT_BACKEND_URL and the config file
    #[arg(long)]
    backend_url: Option<String>,

    /// Offer "Translate" in the selection menu
    #[arg(long)]
    enable_translation: bool,

    /// Where to write logs
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the resolved settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = self.backend_url.as_deref().filter(|u| !u.trim().is_empty()) {
            config.backend_url = url.trim_end_matches('/').to_string();
        }
        if self.enable_translation {
            config.enable_translation = true;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match &cli.log_file {
        Some(path) => path.clone(),
        None => logging::default_log_path()?,
    };
    logging::init(&log_path)?;

    let config = cli.apply(Config::from_env().context("Could not load configuration")?);
    info!(
        backend = %config.backend_url,
        translation = config.enable_translation,
        "starting docchat"
    );

    if cli.save_config {
        let path = FileConfig::from(&config).save()?;
        info!(path = %path.display(), "saved configuration");
        println!("Saved configuration to {}", path.display());
        return Ok(());
    }

    let page = match &cli.page {
        Some(path) => Page::load(path)?,
        None => Page::builtin(),
    };

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, config, page).await;
    tui::restore()?;

    if let Err(err) = &result {
        error!(error = %err, "docchat exited with an error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, config: Config, page: Page) -> Result<()> {
    let mut events = tui::EventHandler::new();
    let mut app = App::new(config, page, events.sender())?;

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }
    }

    Ok(())
}
