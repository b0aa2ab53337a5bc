use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A show as the backend returns it and as screens render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    #[serde(deserialize_with = "super::user::id_from_string_or_int")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: String,
    #[serde(default, alias = "rating")]
    pub average_rating: f64,
    #[serde(default, alias = "numberOfReviews")]
    pub no_of_reviews: i64,
}

/// Storage representation of a show in the `shows` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRow {
    pub id_show: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub average_rating: f64,
    pub no_of_reviews: i64,
    pub cached_at: Option<DateTime<Utc>>,
}

impl From<&Show> for ShowRow {
    fn from(show: &Show) -> Self {
        Self {
            id_show: show.id,
            title: show.title.clone(),
            description: show.description.clone(),
            image_url: show.image_url.clone(),
            average_rating: show.average_rating,
            no_of_reviews: show.no_of_reviews,
            cached_at: None,
        }
    }
}

impl From<ShowRow> for Show {
    fn from(row: ShowRow) -> Self {
        Self {
            id: row.id_show,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            average_rating: row.average_rating,
            no_of_reviews: row.no_of_reviews,
        }
    }
}

/// Which remote listing a show list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowList {
    #[default]
    All,
    TopRated,
}

impl ShowList {
    pub fn label(&self) -> &'static str {
        match self {
            ShowList::All => "All",
            ShowList::TopRated => "Top rated",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            ShowList::All => ShowList::TopRated,
            ShowList::TopRated => ShowList::All,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListShowsResponse {
    pub shows: Vec<Show>,
}

#[derive(Debug, Deserialize)]
pub struct ShowResponse {
    pub show: Show,
}
