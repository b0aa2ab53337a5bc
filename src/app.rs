use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Review, Show, ShowList, ShowRow, User};
use crate::observable::Receiver;
use crate::prefs::Preferences;
use crate::sync::{ShowSynchronizer, Source};
use crate::tui::{AppAction, KeyContext};

// Message for a finished background load
pub enum TaskResult {
    Shows {
        list: ShowList,
        result: std::result::Result<(Source, usize), String>,
    },
    Reviews {
        show_id: i64,
        result: std::result::Result<usize, String>,
    },
    ReviewPosted(std::result::Result<Review, String>),
    Avatar(std::result::Result<User, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    AvatarPath,
    Review,
}

pub struct App {
    // Data
    pub shows: Vec<Show>,
    pub reviews: Vec<Review>,
    pub reviews_show_id: Option<i64>,
    pub profile: Option<User>,
    pub list: ShowList,
    pub last_source: Option<Source>,
    pub cached_count: usize,

    // UI State
    pub selected_index: usize,
    pub show_help: bool,
    pub show_profile: bool,
    pub confirm_logout: bool,
    pub show_empty_state: bool,
    pub input_mode: Option<InputMode>,
    pub input: String,
    pub status: Option<String>,

    // Async state
    pub is_loading: bool,
    pub is_loading_reviews: bool,
    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,
    shows_rx: Receiver<(ShowList, Vec<Show>)>,
    reviews_rx: Receiver<Vec<Review>>,
    profile_rx: Receiver<User>,
    cached_rx: Receiver<Vec<ShowRow>>,

    // Services
    sync: Arc<ShowSynchronizer>,
    prefs: Preferences,
}

impl App {
    pub async fn new(
        sync: Arc<ShowSynchronizer>,
        repository: &Repository,
        prefs: Preferences,
    ) -> Result<Self> {
        let shows_rx = sync.shows().subscribe_channel();
        let reviews_rx = sync.reviews().subscribe_channel();
        let profile_rx = sync.profile().subscribe_channel();
        let cached_rx = repository.subscribe_shows().await?;

        sync.load_profile(&prefs);

        let (task_tx, task_rx) = mpsc::channel(8);

        let mut app = Self {
            shows: Vec::new(),
            reviews: Vec::new(),
            reviews_show_id: None,
            profile: None,
            list: ShowList::All,
            last_source: None,
            cached_count: 0,
            selected_index: 0,
            show_help: false,
            show_profile: false,
            confirm_logout: false,
            show_empty_state: false,
            input_mode: None,
            input: String::new(),
            status: None,
            is_loading: false,
            is_loading_reviews: false,
            task_rx,
            task_tx,
            shows_rx,
            reviews_rx,
            profile_rx,
            cached_rx,
            sync,
            prefs,
        };

        app.refresh_shows();
        app.poll_state()?;
        Ok(app)
    }

    pub fn key_context(&self) -> KeyContext {
        if self.show_help {
            KeyContext::Help
        } else if self.input_mode.is_some() {
            KeyContext::Input
        } else if self.confirm_logout {
            KeyContext::ConfirmLogout
        } else if self.show_profile {
            KeyContext::Profile
        } else {
            KeyContext::Normal
        }
    }

    pub fn selected_show(&self) -> Option<&Show> {
        self.shows.get(self.selected_index)
    }

    /// Reviews shown in the detail pane; only those of the selected show.
    pub fn visible_reviews(&self) -> &[Review] {
        match (self.selected_show(), self.reviews_show_id) {
            (Some(show), Some(id)) if show.id == id => &self.reviews,
            _ => &[],
        }
    }

    pub fn is_empty_state(&self) -> bool {
        self.show_empty_state || self.shows.is_empty()
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            AppAction::MoveDown => {
                let len = self.shows.len();
                if len > 0 && self.selected_index < len - 1 {
                    self.selected_index += 1;
                }
            }

            AppAction::MoveToTop => {
                self.selected_index = 0;
            }

            AppAction::MoveToBottom => {
                self.selected_index = self.shows.len().saturating_sub(1);
            }

            AppAction::SelectShow => {
                if let Some(show) = self.selected_show() {
                    let show_id = show.id;
                    self.load_reviews(show_id);
                }
            }

            AppAction::RefreshShows => {
                self.refresh_shows();
            }

            AppAction::ToggleList => {
                self.list = self.list.toggle();
                self.shows.clear();
                self.selected_index = 0;
                self.refresh_shows();
            }

            AppAction::ToggleEmptyState => {
                self.show_empty_state = !self.show_empty_state;
            }

            AppAction::OpenImage => {
                if let Some(show) = self.selected_show() {
                    if !show.image_url.is_empty() {
                        let _ = open::that(&show.image_url);
                    }
                }
            }

            AppAction::WriteReview => {
                if self.selected_show().is_some() {
                    self.input_mode = Some(InputMode::Review);
                    self.input.clear();
                }
            }

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }

            AppAction::ShowProfile => {
                self.show_profile = true;
            }

            AppAction::HideProfile => {
                self.show_profile = false;
            }

            AppAction::ChangeAvatar => {
                self.input_mode = Some(InputMode::AvatarPath);
                self.input.clear();
            }

            AppAction::Logout => {
                self.confirm_logout = true;
            }

            AppAction::CancelLogout => {
                self.confirm_logout = false;
            }

            AppAction::ConfirmLogout => {
                self.prefs.logout();
                self.prefs.save()?;
                self.sync.sign_out().await;
                tracing::info!("Logged out");
                return Ok(true);
            }

            AppAction::InputChar(c) => {
                self.input.push(c);
            }

            AppAction::InputBackspace => {
                self.input.pop();
            }

            AppAction::InputConfirm => {
                let input = std::mem::take(&mut self.input);
                match self.input_mode.take() {
                    Some(InputMode::AvatarPath) => self.upload_avatar(input.trim()),
                    Some(InputMode::Review) => self.post_review(&input),
                    None => {}
                }
            }

            AppAction::InputCancel => {
                self.input_mode = None;
                self.input.clear();
            }
        }

        Ok(false)
    }

    pub fn refresh_shows(&mut self) {
        self.is_loading = true;
        self.status = None;

        let list = self.list;
        let sync = Arc::clone(&self.sync);
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = match sync.load_list(list).await {
                Ok(outcome) => Ok((outcome.source, outcome.count)),
                Err(e) if e.is_remote() => Err(format!("backend: {e}")),
                Err(e) => Err(format!("cache: {e}")),
            };
            let _ = tx.send(TaskResult::Shows { list, result }).await;
        });
    }

    fn load_reviews(&mut self, show_id: i64) {
        self.is_loading_reviews = true;

        let sync = Arc::clone(&self.sync);
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = match sync.load_reviews(show_id).await {
                Ok(outcome) => Ok(outcome.count),
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(TaskResult::Reviews { show_id, result }).await;
        });
    }

    fn post_review(&mut self, input: &str) {
        let Some(show_id) = self.selected_show().map(|s| s.id) else {
            return;
        };

        let Some((rating, comment)) = parse_review_input(input) else {
            self.status = Some("Review format: <rating 1-5> <comment>".to_string());
            return;
        };

        let sync = Arc::clone(&self.sync);
        let tx = self.task_tx.clone();
        self.reviews_show_id = Some(show_id);

        tokio::spawn(async move {
            let result = sync
                .submit_review(show_id, rating, &comment)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(TaskResult::ReviewPosted(result)).await;
        });
    }

    fn upload_avatar(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }

        let path = PathBuf::from(path);
        let sync = Arc::clone(&self.sync);
        let tx = self.task_tx.clone();
        self.status = Some("Uploading avatar...".to_string());

        tokio::spawn(async move {
            let result = sync.upload_avatar(&path).await.map_err(|e| e.to_string());
            let _ = tx.send(TaskResult::Avatar(result)).await;
        });
    }

    /// Poll for finished background tasks (non-blocking)
    pub fn poll_task_results(&mut self) {
        while let Ok(result) = self.task_rx.try_recv() {
            match result {
                TaskResult::Shows { list, result } => {
                    // A result for a list the user already switched away from
                    if list != self.list {
                        continue;
                    }
                    self.is_loading = false;
                    match result {
                        Ok((source, count)) => {
                            tracing::debug!("Loaded {} shows from {:?}", count, source);
                            self.last_source = Some(source);
                        }
                        Err(e) => {
                            tracing::error!("Failed to load shows: {}", e);
                            self.status = Some(format!("Failed to load shows: {e}"));
                        }
                    }
                }
                TaskResult::Reviews { show_id, result } => {
                    self.is_loading_reviews = false;
                    if let Err(e) = result {
                        tracing::error!("Failed to load reviews for show {}: {}", show_id, e);
                        self.status = Some(format!("Failed to load reviews: {e}"));
                    }
                }
                TaskResult::ReviewPosted(result) => match result {
                    Ok(review) => {
                        self.status = Some(format!("Review posted ({}/5)", review.rating));
                    }
                    Err(e) => {
                        tracing::error!("Failed to post review: {}", e);
                        self.status = Some(format!("Failed to post review: {e}"));
                    }
                },
                TaskResult::Avatar(result) => match result {
                    Ok(_) => {
                        self.status = Some("Avatar updated".to_string());
                    }
                    Err(e) => {
                        tracing::error!("Failed to upload avatar: {}", e);
                        self.status = Some(format!("Failed to upload avatar: {e}"));
                    }
                },
            }
        }
    }

    /// Drain the state holders onto this loop. Publishes can happen on any
    /// task; the screen only reads what was drained here.
    pub fn poll_state(&mut self) -> Result<()> {
        // Both lists publish into one holder; skip values for the other list
        let mut latest_shows = None;
        while let Some((list, shows)) = self.shows_rx.try_recv() {
            if list == self.list {
                latest_shows = Some(shows);
            }
        }
        if let Some(shows) = latest_shows {
            self.shows = shows;
            if self.selected_index >= self.shows.len() {
                self.selected_index = self.shows.len().saturating_sub(1);
            }
        }

        if let Some(reviews) = self.reviews_rx.latest() {
            self.reviews_show_id = reviews
                .first()
                .map(|r| r.show_id)
                .or_else(|| self.selected_show().map(|s| s.id));
            self.reviews = reviews;
        }

        if let Some(cached) = self.cached_rx.latest() {
            self.cached_count = cached.len();
        }

        if let Some(user) = self.profile_rx.latest() {
            if user.image_url != self.prefs.user_image {
                self.prefs.user_image = user.image_url.clone();
                self.prefs.save()?;
            }
            self.profile = Some(user);
        }

        Ok(())
    }
}

/// Split "<rating> <comment>" as typed into the review prompt.
fn parse_review_input(input: &str) -> Option<(i64, String)> {
    let input = input.trim();
    let (rating, comment) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
    let rating = rating.parse().ok()?;
    Some((rating, comment.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FixedConnectivity, ShowsApi};
    use crate::error::AppError;
    use crate::models::{NewReview, Session};
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;

    fn show(id: i64, title: &str) -> Show {
        Show {
            id,
            title: title.to_string(),
            description: String::new(),
            image_url: String::new(),
            average_rating: 4.0,
            no_of_reviews: 0,
        }
    }

    /// Backend whose full list answers slowly and whose top-rated list
    /// answers at once.
    struct SlowListApi;

    #[async_trait]
    impl ShowsApi for SlowListApi {
        async fn list_shows(&self) -> Result<Vec<Show>> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(vec![show(1, "All shows")])
        }

        async fn top_rated_shows(&self) -> Result<Vec<Show>> {
            Ok(vec![show(2, "Top rated")])
        }

        async fn get_show(&self, _id: i64) -> Result<Show> {
            Err(AppError::Offline)
        }

        async fn show_reviews(&self, _show_id: i64) -> Result<Vec<Review>> {
            Ok(Vec::new())
        }

        async fn create_review(&self, _review: NewReview) -> Result<Review> {
            Err(AppError::Offline)
        }

        async fn sign_in(&self, _email: &str, _password: &str) -> Result<(Session, User)> {
            Err(AppError::Offline)
        }

        async fn upload_avatar(&self, _image_path: &Path) -> Result<User> {
            Err(AppError::Offline)
        }

        async fn set_session(&self, _session: Option<Session>) {}
    }

    async fn test_app(dir: &Path) -> App {
        let repository = Arc::new(Repository::open_in_memory().await.unwrap());
        let sync = Arc::new(ShowSynchronizer::new(
            Arc::new(SlowListApi),
            Arc::new(FixedConnectivity::new(true)),
            Arc::clone(&repository),
        ));
        let prefs = Preferences::load(&dir.join("prefs.toml")).unwrap();
        App::new(sync, &repository, prefs).await.unwrap()
    }

    async fn settle(app: &mut App) {
        tokio::time::sleep(Duration::from_millis(400)).await;
        app.poll_state().unwrap();
        app.poll_task_results();
    }

    fn titles(app: &App) -> Vec<&str> {
        app.shows.iter().map(|s| s.title.as_str()).collect()
    }

    #[tokio::test]
    async fn late_result_for_previous_list_is_not_displayed() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path()).await;

        assert!(!app.handle_action(AppAction::ToggleList).await.unwrap());
        assert_eq!(app.list, ShowList::TopRated);
        assert!(app.is_empty_state());

        settle(&mut app).await;
        assert_eq!(titles(&app), vec!["Top rated"]);
        assert_eq!(app.last_source, Some(Source::Remote));
        assert!(!app.is_loading);
        assert!(app.status.is_none());
    }

    #[tokio::test]
    async fn switching_back_shows_the_full_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path()).await;
        settle(&mut app).await;
        assert_eq!(titles(&app), vec!["All shows"]);

        app.handle_action(AppAction::ToggleList).await.unwrap();
        settle(&mut app).await;
        assert_eq!(titles(&app), vec!["Top rated"]);

        app.handle_action(AppAction::ToggleList).await.unwrap();
        settle(&mut app).await;
        assert_eq!(app.list, ShowList::All);
        assert_eq!(titles(&app), vec!["All shows"]);
        assert_eq!(app.cached_count, 2);
    }

    #[test]
    fn review_input_splits_rating_and_comment() {
        assert_eq!(
            parse_review_input(" 4  Solid second season "),
            Some((4, "Solid second season".to_string()))
        );
        assert_eq!(parse_review_input("5"), Some((5, String::new())));
        assert_eq!(parse_review_input("great show"), None);
    }
}
