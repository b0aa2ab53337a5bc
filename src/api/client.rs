use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    ListShowsResponse, LoginResponse, NewReview, Review, ReviewResponse, ReviewsResponse,
    Session, Show, ShowResponse, User,
};

const ACCESS_TOKEN: &str = "access-token";
const CLIENT: &str = "client";
const UID: &str = "uid";

/// The remote shows backend.
#[async_trait]
pub trait ShowsApi: Send + Sync {
    async fn list_shows(&self) -> Result<Vec<Show>>;

    async fn top_rated_shows(&self) -> Result<Vec<Show>>;

    async fn get_show(&self, id: i64) -> Result<Show>;

    async fn show_reviews(&self, show_id: i64) -> Result<Vec<Review>>;

    async fn create_review(&self, review: NewReview) -> Result<Review>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<(Session, User)>;

    async fn upload_avatar(&self, image_path: &Path) -> Result<User>;

    async fn set_session(&self, session: Option<Session>);
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct HttpShowsApi {
    client: Client,
    base_url: Url,
    session: RwLock<Option<Session>>,
}

impl HttpShowsApi {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent("shows-browser/1.0")
            .build()?;

        let mut base_url = Url::parse(&config.api_base_url)?;
        // Url::join drops the last segment unless the path ends in a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            session: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.read().await.as_ref() {
            Some(session) => request
                .header(ACCESS_TOKEN, &session.access_token)
                .header(CLIENT, &session.client)
                .header(UID, &session.uid),
            None => request,
        }
    }

    async fn require_session(&self) -> Result<()> {
        if self.session.read().await.is_none() {
            return Err(AppError::NotSignedIn);
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let url = self.endpoint(path)?;
        let request = self.authorized(self.client.get(url)).await;
        check_status(request.send().await?).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(AppError::Api { status, message })
}

fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    Some(Session {
        access_token: header(ACCESS_TOKEN)?,
        client: header(CLIENT)?,
        uid: header(UID)?,
    })
}

fn image_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[async_trait]
impl ShowsApi for HttpShowsApi {
    async fn list_shows(&self) -> Result<Vec<Show>> {
        let response: ListShowsResponse = self.get("shows").await?.json().await?;
        Ok(response.shows)
    }

    async fn top_rated_shows(&self) -> Result<Vec<Show>> {
        let response: ListShowsResponse = self.get("shows/top_rated").await?.json().await?;
        Ok(response.shows)
    }

    async fn get_show(&self, id: i64) -> Result<Show> {
        let response: ShowResponse = self.get(&format!("shows/{id}")).await?.json().await?;
        Ok(response.show)
    }

    async fn show_reviews(&self, show_id: i64) -> Result<Vec<Review>> {
        let response: ReviewsResponse = self
            .get(&format!("shows/{show_id}/reviews"))
            .await?
            .json()
            .await?;
        Ok(response.reviews)
    }

    async fn create_review(&self, review: NewReview) -> Result<Review> {
        self.require_session().await?;

        let url = self.endpoint("reviews")?;
        let request = self.authorized(self.client.post(url).json(&review)).await;
        let response: ReviewResponse = check_status(request.send().await?).await?.json().await?;
        Ok(response.review)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(Session, User)> {
        let url = self.endpoint("users/sign_in")?;
        let response = self
            .client
            .post(url)
            .json(&SignInRequest { email, password })
            .send()
            .await?;
        let response = check_status(response).await?;

        let session = session_from_headers(response.headers()).ok_or_else(|| AppError::Api {
            status: response.status().as_u16(),
            message: "Sign in response is missing auth headers".to_string(),
        })?;
        let login: LoginResponse = response.json().await?;

        *self.session.write().await = Some(session.clone());
        Ok((session, login.user))
    }

    async fn upload_avatar(&self, image_path: &Path) -> Result<User> {
        self.require_session().await?;

        let bytes = tokio::fs::read(image_path).await?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "avatar.jpg".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(image_mime(image_path))?;
        let form = Form::new().part("image", part);

        let url = self.endpoint("users")?;
        let request = self.authorized(self.client.put(url).multipart(form)).await;
        let response: LoginResponse = check_status(request.send().await?).await?.json().await?;
        Ok(response.user)
    }

    async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }
}
