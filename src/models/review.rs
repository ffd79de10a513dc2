use super::{FieldKind, trimmed, Resource};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Stored review document. One per (bootcamp, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub text: String,
    pub rating: i32,
    pub created_at: DateTime,
    pub bootcamp: ObjectId,
    pub user: ObjectId,
}

impl Resource for Review {
    const COLLECTION: &'static str = "reviews";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("_id", FieldKind::Id),
        ("title", FieldKind::Text),
        ("text", FieldKind::Text),
        ("rating", FieldKind::Number),
        ("createdAt", FieldKind::Date),
        ("bootcamp", FieldKind::Id),
        ("user", FieldKind::Id),
    ];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewReview {
    #[validate(
        required(message = "Please add a title"),
        length(max = 100, message = "Maximum length of characters is 100")
    )]
    pub title: Option<String>,
    #[validate(required(message = "Please add some text"))]
    pub text: Option<String>,
    #[validate(
        required(message = "Please add a rating between 1 and 10"),
        range(min = 1, max = 10, message = "Please add a rating between 1 and 10")
    )]
    pub rating: Option<i32>,
}

impl NewReview {
    pub fn normalized(self) -> Self {
        Self {
            title: trimmed(self.title),
            text: trimmed(self.text),
            ..self
        }
    }

    pub fn into_review(self, bootcamp: ObjectId, author: ObjectId) -> Review {
        Review {
            id: None,
            title: self.title.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            rating: self.rating.unwrap_or_default(),
            created_at: DateTime::now(),
            bootcamp,
            user: author,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Maximum length of characters is 100"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add some text"))]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 10, message = "Please add a rating between 1 and 10"))]
    pub rating: Option<i32>,
}

impl ReviewUpdate {
    pub fn normalized(self) -> Self {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            title: trim(self.title),
            text: trim(self.text),
            ..self
        }
    }
}
