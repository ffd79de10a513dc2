use super::{FieldKind, string_or_number, trimmed, Resource};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Stored course document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: SkillLevel,
    #[serde(default)]
    pub scholarship_available: bool,
    pub created_at: DateTime,
    pub bootcamp: ObjectId,
    pub user: ObjectId,
}

impl Resource for Course {
    const COLLECTION: &'static str = "courses";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("_id", FieldKind::Id),
        ("title", FieldKind::Text),
        ("description", FieldKind::Text),
        ("weeks", FieldKind::Text),
        ("tuition", FieldKind::Number),
        ("minimumSkill", FieldKind::Text),
        ("scholarshipAvailable", FieldKind::Bool),
        ("createdAt", FieldKind::Date),
        ("bootcamp", FieldKind::Id),
        ("user", FieldKind::Id),
    ];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    #[validate(required(message = "Please add a course title"))]
    pub title: Option<String>,
    #[validate(required(message = "Please add a description"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    #[validate(required(message = "Please add number of weeks"))]
    pub weeks: Option<String>,
    #[validate(
        required(message = "Please add a tuition cost"),
        range(min = 0.0, message = "Tuition cost can not be negative")
    )]
    pub tuition: Option<f64>,
    #[validate(required(message = "Please add a minimum skill"))]
    pub minimum_skill: Option<SkillLevel>,
    pub scholarship_available: Option<bool>,
}

impl NewCourse {
    pub fn normalized(self) -> Self {
        Self {
            title: trimmed(self.title),
            description: trimmed(self.description),
            weeks: trimmed(self.weeks),
            ..self
        }
    }

    pub fn into_course(self, bootcamp: ObjectId, owner: ObjectId) -> Course {
        Course {
            id: None,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            weeks: self.weeks.unwrap_or_default(),
            tuition: self.tuition.unwrap_or_default(),
            minimum_skill: self.minimum_skill.unwrap_or(SkillLevel::Beginner),
            scholarship_available: self.scholarship_available.unwrap_or(false),
            created_at: DateTime::now(),
            bootcamp,
            user: owner,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add a course title"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add a description"))]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(length(min = 1, message = "Please add number of weeks"))]
    pub weeks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Tuition cost can not be negative"))]
    pub tuition: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_skill: Option<SkillLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_available: Option<bool>,
}

impl CourseUpdate {
    pub fn normalized(self) -> Self {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            title: trim(self.title),
            description: trim(self.description),
            weeks: trim(self.weeks),
            ..self
        }
    }
}

/// Stored average cost: the mean tuition rounded up to the next multiple of ten
pub fn round_average_cost(mean: f64) -> f64 {
    (mean / 10.0).ceil() * 10.0
}
