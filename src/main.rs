use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::stream::{self, StreamExt};
use ratatui::prelude::*;

mod api;
mod app;
mod config;
mod db;
mod error;
mod models;
mod observable;
mod prefs;
mod sync;
mod tui;

use api::{Connectivity, FixedConnectivity, HttpShowsApi, TcpProbe};
use app::App;
use config::Config;
use db::Repository;
use error::Result;
use models::Show;
use prefs::Preferences;
use sync::ShowSynchronizer;
use tui::{draw, handle_key_event};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Browse,
    Refresh,
    TopRated,
    List,
    Show(i64),
    Login { email: String, password: String },
    Logout,
    UploadAvatar(PathBuf),
}

const USAGE: &str = "usage: shows [--offline] [--refresh | --top-rated | --list | --show <id> | --login <email> <password> | --logout | --upload-avatar <path>]";

/// Returns the command and whether `--offline` was given.
fn parse_args(args: &[String]) -> anyhow::Result<(Command, bool)> {
    let offline = args.iter().any(|a| a == "--offline");
    let rest: Vec<&str> = args
        .iter()
        .skip(1)
        .map(String::as_str)
        .filter(|a| *a != "--offline")
        .collect();

    let command = match rest.as_slice() {
        [] => Command::Browse,
        ["--refresh"] => Command::Refresh,
        ["--top-rated"] => Command::TopRated,
        ["--list"] => Command::List,
        ["--logout"] => Command::Logout,
        ["--show", id] => Command::Show(id.parse()?),
        ["--login", email, password] => Command::Login {
            email: email.to_string(),
            password: password.to_string(),
        },
        ["--upload-avatar", path] => Command::UploadAvatar(PathBuf::from(path)),
        _ => anyhow::bail!("{USAGE}"),
    };

    Ok((command, offline))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (command, offline) = parse_args(&args)?;

    let config = Config::load()?;
    let mut prefs = Preferences::load(&Config::prefs_path())?;

    let repository = Arc::new(Repository::new(&config.db_path).await?);
    let api = Arc::new(HttpShowsApi::new(&config)?);
    let connectivity: Arc<dyn Connectivity> = if offline || config.force_offline {
        Arc::new(FixedConnectivity::new(false))
    } else {
        Arc::new(TcpProbe::new(
            &config.api_base_url,
            Duration::from_millis(config.probe_timeout_ms),
        )?)
    };

    let sync = Arc::new(ShowSynchronizer::new(api, connectivity, Arc::clone(&repository)));
    sync.restore_session(&prefs).await;

    match command {
        Command::Browse => {}

        Command::Refresh => {
            let outcome = sync.load_shows().await?;
            if let Some(persist) = outcome.persist {
                persist.await??;
            }
            let shows = sync.shows().get().map(|(_, shows)| shows).unwrap_or_default();
            let reviews = refresh_reviews(&sync, &shows).await;
            println!(
                "Refreshed {} shows and {} reviews ({:?})",
                outcome.count, reviews, outcome.source
            );
            return Ok(());
        }

        Command::TopRated => {
            let outcome = sync.load_top_rated_shows().await?;
            if let Some(persist) = outcome.persist {
                persist.await??;
            }
            print_shows(&sync.shows().get().map(|(_, shows)| shows).unwrap_or_default());
            return Ok(());
        }

        Command::List => {
            let shows: Vec<Show> = repository
                .get_all_shows()
                .await?
                .into_iter()
                .map(Show::from)
                .collect();
            print_shows(&shows);
            return Ok(());
        }

        Command::Show(id) => {
            let Some(show) = sync.load_show(id).await? else {
                println!("Show {id} is not cached");
                return Ok(());
            };
            print_shows(std::slice::from_ref(&show));

            let outcome = sync.load_reviews(id).await?;
            if let Some(persist) = outcome.persist {
                persist.await??;
            }
            for review in sync.reviews().get().unwrap_or_default() {
                println!(
                    "  {}/5 {}: {}",
                    review.rating,
                    review.author_email().unwrap_or("anonymous"),
                    review.comment
                );
            }
            return Ok(());
        }

        Command::Login { email, password } => {
            let (session, user) = sync.sign_in(&email, &password).await?;
            prefs.remember_login(session, &user, true);
            prefs.save()?;
            println!("Signed in as {}", user.email);
            return Ok(());
        }

        Command::Logout => {
            prefs.logout();
            prefs.save()?;
            sync.sign_out().await;
            println!("Logged out");
            return Ok(());
        }

        Command::UploadAvatar(path) => {
            let user = sync.upload_avatar(&path).await?;
            prefs.set_user(&user);
            prefs.save()?;
            println!(
                "Avatar updated: {}",
                user.image_url.as_deref().unwrap_or("(none)")
            );
            return Ok(());
        }
    }

    let mut app = App::new(Arc::clone(&sync), &repository, prefs).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Bring published state and finished tasks onto this loop
        app.poll_state()?;
        app.poll_task_results();

        terminal.draw(|frame| draw(frame, app))?;

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.key_context()) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Load and cache the reviews of every show, a few at a time.
async fn refresh_reviews(sync: &ShowSynchronizer, shows: &[Show]) -> usize {
    stream::iter(shows)
        .map(|show| async move {
            match sync.load_reviews(show.id).await {
                Ok(outcome) => {
                    if let Some(persist) = outcome.persist {
                        match persist.await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => tracing::warn!("Failed to cache reviews of {}: {}", show.title, e),
                            Err(e) => tracing::warn!("Review cache task for {} failed: {}", show.title, e),
                        }
                    }
                    outcome.count
                }
                Err(e) => {
                    tracing::debug!("Failed to load reviews of {}: {}", show.title, e);
                    0
                }
            }
        })
        .buffer_unordered(5) // Max 5 concurrent fetches
        .fold(0, |total, count| async move { total + count })
        .await
}

fn print_shows(shows: &[Show]) {
    let options = textwrap::Options::new(78)
        .initial_indent("    ")
        .subsequent_indent("    ");

    for show in shows {
        println!(
            "[{}] {} ({:.1}★, {} reviews)",
            show.id, show.title, show.average_rating, show.no_of_reviews
        );
        if !show.description.is_empty() {
            println!("{}", textwrap::fill(&show.description, &options));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("shows")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn no_arguments_starts_the_browser() {
        assert_eq!(parse_args(&args(&[])).unwrap(), (Command::Browse, false));
    }

    #[test]
    fn offline_flag_combines_with_any_command() {
        assert_eq!(
            parse_args(&args(&["--offline", "--refresh"])).unwrap(),
            (Command::Refresh, true)
        );
        assert_eq!(
            parse_args(&args(&["--list", "--offline"])).unwrap(),
            (Command::List, true)
        );
    }

    #[test]
    fn login_takes_email_and_password() {
        assert_eq!(
            parse_args(&args(&["--login", "me@example.com", "pw"])).unwrap().0,
            Command::Login {
                email: "me@example.com".to_string(),
                password: "pw".to_string(),
            }
        );
        assert!(parse_args(&args(&["--login", "me@example.com"])).is_err());
    }

    #[test]
    fn show_needs_a_numeric_id() {
        assert_eq!(parse_args(&args(&["--show", "12"])).unwrap().0, Command::Show(12));
        assert!(parse_args(&args(&["--show", "twelve"])).is_err());
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        let err = parse_args(&args(&["--bogus"])).unwrap_err();
        assert!(err.to_string().starts_with("usage:"));
    }
}
