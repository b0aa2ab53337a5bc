pub const SCHEMA: &str = r#"
-- shows table
CREATE TABLE IF NOT EXISTS shows (
    id_show INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL DEFAULT '',
    average_rating REAL NOT NULL DEFAULT 0,
    no_of_reviews INTEGER NOT NULL DEFAULT 0,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- reviews table (show_id is not a declared foreign key)
CREATE TABLE IF NOT EXISTS reviews (
    id_review INTEGER PRIMARY KEY,
    show_id INTEGER NOT NULL,
    rating INTEGER NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    user_email TEXT
);

CREATE INDEX IF NOT EXISTS idx_reviews_show_id ON reviews(show_id);
"#;
