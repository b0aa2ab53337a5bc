mod review;
mod show;
mod user;

pub use review::{NewReview, Review, ReviewAuthor, ReviewResponse, ReviewsResponse};
pub use show::{ListShowsResponse, Show, ShowList, ShowResponse, ShowRow};
pub use user::{LoginResponse, Session, User};
