use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "id_from_string_or_int")]
    pub id: i64,
    pub email: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub user: User,
}

/// Auth headers handed out by sign in and echoed back on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub client: String,
    pub uid: String,
}

/// The backend sends ids as strings while older payloads use integers.
pub(crate) fn id_from_string_or_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Str(String),
    }

    match Id::deserialize(deserializer)? {
        Id::Int(id) => Ok(id),
        Id::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_login_response() {
        let json = r#"{"user": {"id": "42", "email": "me@example.com", "image_url": null}}"#;
        let response: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.user.id, 42);
        assert_eq!(response.user.image_url, None);
    }

    #[test]
    fn rejects_non_numeric_id() {
        let json = r#"{"id": "abc", "email": "me@example.com"}"#;
        assert!(serde_json::from_str::<User>(json).is_err());
    }
}
