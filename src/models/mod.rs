pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::{Bootcamp, BootcampUpdate, Career, GeoPoint, NewBootcamp};
pub use course::{Course, CourseUpdate, NewCourse, SkillLevel};
pub use review::{NewReview, Review, ReviewUpdate};
pub use user::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, Role,
    TokenResponse, UpdateDetailsRequest, UpdatePasswordRequest, User, UserProfile,
};

use crate::{
    query::Pagination,
    utils::{ApiError, ApiResult},
};
use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Stored type of a top-level field, used to coerce query-string filter values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Text,
    Number,
    Bool,
    Date,
    /// Embedded document; dotted sub-paths are matched as text
    Object,
}

/// A MongoDB-backed collection the list-query builder can run against
pub trait Resource {
    /// Collection name
    const COLLECTION: &'static str;
    /// Top-level stored fields accepted in list filters
    const FIELDS: &'static [(&'static str, FieldKind)];

    fn field_kind(name: &str) -> Option<FieldKind> {
        Self::FIELDS
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, kind)| *kind)
    }
}

/// Single-record success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Multi-record success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub data: Vec<Value>,
}

impl ListResponse {
    pub fn new(data: Vec<Value>) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination: None,
            data,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Parse a path identifier, failing the way a bad id cast does
pub fn parse_id(id: &str) -> ApiResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| ApiError::cast_error())
}

/// Render a stored record as API JSON
pub fn to_json<T: Serialize>(record: &T) -> ApiResult<Value> {
    Ok(bson_to_json(bson::to_bson(record)?))
}

/// Render a raw document as API JSON
pub fn document_to_json(doc: Document) -> Value {
    bson_to_json(Bson::Document(doc))
}

/// Convert BSON to plain JSON: ObjectIds become hex strings and dates RFC 3339
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Double(n) => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}

/// Trim a string field, treating blank input as absent
pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Accept either a JSON string or number for text-typed fields like `weeks`
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
