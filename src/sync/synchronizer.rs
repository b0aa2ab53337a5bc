use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::task::JoinHandle;

use crate::api::{Connectivity, ShowsApi};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{NewReview, Review, Session, Show, ShowList, ShowRow, User};
use crate::observable::Observable;
use crate::prefs::Preferences;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";

static EMAIL_RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Local,
}

/// What a load published.
#[derive(Debug)]
pub struct LoadOutcome {
    pub source: Source,
    pub count: usize,
    /// The background cache write of a remote load. Nothing waits on it;
    /// await it to learn whether the rows reached the local store.
    pub persist: Option<JoinHandle<Result<usize>>>,
}

impl LoadOutcome {
    fn local(count: usize) -> Self {
        Self {
            source: Source::Local,
            count,
            persist: None,
        }
    }

    fn remote(count: usize, persist: JoinHandle<Result<usize>>) -> Self {
        Self {
            source: Source::Remote,
            count,
            persist: Some(persist),
        }
    }
}

/// Picks the data source for each load and publishes the result.
///
/// Online loads hit the backend, publish, and cache the rows in the
/// background. Offline loads read the cache. A remote failure publishes
/// nothing and does not fall back to the cache.
pub struct ShowSynchronizer {
    api: Arc<dyn ShowsApi>,
    connectivity: Arc<dyn Connectivity>,
    repository: Arc<Repository>,
    /// Tagged with the list it was loaded for; both lists share this holder.
    shows: Observable<(ShowList, Vec<Show>)>,
    reviews: Observable<Vec<Review>>,
    profile: Observable<User>,
}

impl ShowSynchronizer {
    pub fn new(
        api: Arc<dyn ShowsApi>,
        connectivity: Arc<dyn Connectivity>,
        repository: Arc<Repository>,
    ) -> Self {
        Self {
            api,
            connectivity,
            repository,
            shows: Observable::new(),
            reviews: Observable::new(),
            profile: Observable::new(),
        }
    }

    pub fn shows(&self) -> &Observable<(ShowList, Vec<Show>)> {
        &self.shows
    }

    pub fn reviews(&self) -> &Observable<Vec<Review>> {
        &self.reviews
    }

    pub fn profile(&self) -> &Observable<User> {
        &self.profile
    }

    pub async fn load_shows(&self) -> Result<LoadOutcome> {
        self.load_list(ShowList::All).await
    }

    pub async fn load_top_rated_shows(&self) -> Result<LoadOutcome> {
        self.load_list(ShowList::TopRated).await
    }

    pub async fn load_list(&self, list: ShowList) -> Result<LoadOutcome> {
        if self.connectivity.is_online().await {
            tracing::debug!("Online, fetching {} shows from the backend", list.label());
            let shows = match list {
                ShowList::All => self.api.list_shows().await?,
                ShowList::TopRated => self.api.top_rated_shows().await?,
            };

            let count = shows.len();
            let rows: Vec<ShowRow> = shows.iter().map(ShowRow::from).collect();
            self.shows.publish((list, shows));
            let persist = self.spawn_persist_shows(rows);

            tracing::info!("Loaded {} shows from the backend", count);
            Ok(LoadOutcome::remote(count, persist))
        } else {
            tracing::debug!("Offline, reading {} shows from the cache", list.label());
            let mut shows: Vec<Show> = self
                .repository
                .get_all_shows()
                .await?
                .into_iter()
                .map(Show::from)
                .collect();
            if list == ShowList::TopRated {
                shows.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating));
            }

            let count = shows.len();
            self.shows.publish((list, shows));
            Ok(LoadOutcome::local(count))
        }
    }

    fn spawn_persist_shows(&self, rows: Vec<ShowRow>) -> JoinHandle<Result<usize>> {
        let repository = Arc::clone(&self.repository);
        tokio::spawn(async move {
            let result = repository.upsert_shows(rows).await;
            if let Err(e) = &result {
                tracing::warn!("Failed to cache shows: {}", e);
            }
            result
        })
    }

    /// Load the reviews of one show into the reviews holder.
    pub async fn load_reviews(&self, show_id: i64) -> Result<LoadOutcome> {
        if self.connectivity.is_online().await {
            let reviews = self.api.show_reviews(show_id).await?;
            let count = reviews.len();
            self.reviews.publish(reviews.clone());

            let repository = Arc::clone(&self.repository);
            let persist = tokio::spawn(async move {
                let result = repository.insert_reviews(reviews).await;
                if let Err(e) = &result {
                    tracing::warn!("Failed to cache reviews for show {}: {}", show_id, e);
                }
                result
            });
            Ok(LoadOutcome::remote(count, persist))
        } else {
            let reviews = self.repository.get_reviews_for_show(show_id).await?;
            let count = reviews.len();
            self.reviews.publish(reviews);
            Ok(LoadOutcome::local(count))
        }
    }

    /// Fetch one show, refreshing its cached row when online.
    pub async fn load_show(&self, id: i64) -> Result<Option<Show>> {
        if self.connectivity.is_online().await {
            let show = self.api.get_show(id).await?;
            self.repository
                .upsert_shows(vec![ShowRow::from(&show)])
                .await?;
            Ok(Some(show))
        } else {
            Ok(self.repository.get_show(id).await?.map(Show::from))
        }
    }

    /// Post a review and refresh the reviews holder for its show.
    ///
    /// Succeeds once the backend accepts the review. Caching it and
    /// reloading the list are best effort.
    pub async fn submit_review(&self, show_id: i64, rating: i64, comment: &str) -> Result<Review> {
        let review = NewReview {
            rating,
            comment: comment.trim().to_string(),
            show_id,
        };
        review.validate().map_err(AppError::Validation)?;

        if !self.connectivity.is_online().await {
            return Err(AppError::Offline);
        }

        let created = self.api.create_review(review).await?;

        // The review exists on the backend from here on; later failures
        // must not read as a failed post.
        if let Err(e) = self.repository.insert_review(created.clone()).await {
            tracing::warn!("Failed to cache review {}: {}", created.id, e);
        }
        if let Err(e) = self.load_reviews(show_id).await {
            tracing::warn!("Failed to reload reviews for show {}: {}", show_id, e);
        }
        Ok(created)
    }

    /// Upload a new avatar and publish the updated profile.
    pub async fn upload_avatar(&self, image_path: &Path) -> Result<User> {
        let user = self.api.upload_avatar(image_path).await?;
        tracing::info!("Uploaded avatar for {}", user.email);
        self.profile.publish(user.clone());
        Ok(user)
    }

    /// Publish the profile remembered in preferences.
    pub fn load_profile(&self, prefs: &Preferences) -> User {
        let user = prefs.profile();
        self.profile.publish(user.clone());
        user
    }

    pub async fn restore_session(&self, prefs: &Preferences) {
        self.api.set_session(prefs.session.clone()).await;
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(Session, User)> {
        if !is_valid_email(email)? {
            return Err(AppError::Validation(format!("Invalid email address: {email}")));
        }
        if password.is_empty() {
            return Err(AppError::Validation("Password must not be empty".to_string()));
        }

        let (session, user) = self.api.sign_in(email, password).await?;
        self.profile.publish(user.clone());
        Ok((session, user))
    }

    pub async fn sign_out(&self) {
        self.api.set_session(None).await;
    }
}

fn is_valid_email(email: &str) -> Result<bool> {
    match EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN)) {
        Ok(re) => Ok(re.is_match(email)),
        Err(e) => Err(AppError::Other(anyhow::anyhow!("email pattern: {e}"))),
    }
}
