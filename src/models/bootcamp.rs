use super::{FieldKind, trimmed, Resource};
use crate::geocoder::GeoLocation;
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Career categories a bootcamp can be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Other,
}

/// GeoJSON point plus the address parts the geocoder returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<GeoLocation> for GeoPoint {
    fn from(loc: GeoLocation) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: vec![loc.longitude, loc.latitude],
            formatted_address: Some(loc.formatted_address),
            street: loc.street,
            city: loc.city,
            state: loc.state,
            zipcode: loc.zipcode,
            country: loc.country,
        }
    }
}

/// Stored bootcamp document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Only kept when no geocoder resolved it into `location`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub careers: Vec<Career>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
    #[serde(default = "default_photo")]
    pub photo: String,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
    pub created_at: DateTime,
    pub user: ObjectId,
}

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

impl Resource for Bootcamp {
    const COLLECTION: &'static str = "bootcamps";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("_id", FieldKind::Id),
        ("name", FieldKind::Text),
        ("slug", FieldKind::Text),
        ("description", FieldKind::Text),
        ("website", FieldKind::Text),
        ("phone", FieldKind::Text),
        ("email", FieldKind::Text),
        ("location", FieldKind::Object),
        ("careers", FieldKind::Text),
        ("averageRating", FieldKind::Number),
        ("averageCost", FieldKind::Number),
        ("photo", FieldKind::Text),
        ("housing", FieldKind::Bool),
        ("jobAssistance", FieldKind::Bool),
        ("jobGuarantee", FieldKind::Bool),
        ("acceptGi", FieldKind::Bool),
        ("createdAt", FieldKind::Date),
        ("user", FieldKind::Id),
    ];
}

/// Create payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBootcamp {
    #[validate(
        required(message = "Please add a name"),
        length(max = 50, message = "Name can not be more than 50 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Please add a description"),
        length(max = 500, message = "Description can not be more than 500 characters")
    )]
    pub description: Option<String>,
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[validate(required(message = "Please add an address"))]
    pub address: Option<String>,
    #[validate(
        required(message = "Please add at least one career"),
        length(min = 1, message = "Please add at least one career")
    )]
    pub careers: Option<Vec<Career>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl NewBootcamp {
    /// Trim text fields; blank values count as missing
    pub fn normalized(self) -> Self {
        Self {
            name: trimmed(self.name),
            description: trimmed(self.description),
            website: trimmed(self.website),
            phone: trimmed(self.phone),
            email: trimmed(self.email),
            address: trimmed(self.address),
            ..self
        }
    }

    /// Build the stored document once validated. `location` replaces the
    /// raw address when present.
    pub fn into_bootcamp(self, owner: ObjectId, location: Option<GeoPoint>) -> Bootcamp {
        let name = self.name.unwrap_or_default();
        let address = if location.is_some() { None } else { self.address };

        Bootcamp {
            id: None,
            slug: slugify(&name),
            name,
            description: self.description.unwrap_or_default(),
            website: self.website,
            phone: self.phone,
            email: self.email,
            address,
            location,
            careers: self.careers.unwrap_or_default(),
            average_rating: None,
            average_cost: None,
            photo: default_photo(),
            housing: self.housing.unwrap_or(false),
            job_assistance: self.job_assistance.unwrap_or(false),
            job_guarantee: self.job_guarantee.unwrap_or(false),
            accept_gi: self.accept_gi.unwrap_or(false),
            created_at: DateTime::now(),
            user: owner,
        }
    }
}

/// Partial update payload; only present fields are written
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BootcampUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "name_present"),
        length(max = 50, message = "Name can not be more than 50 characters")
    )]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "description_present"),
        length(max = 500, message = "Description can not be more than 500 characters")
    )]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add an address"))]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Please add at least one career"))]
    pub careers: Option<Vec<Career>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_assistance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_guarantee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_gi: Option<bool>,
}

fn present(value: &str, code: &'static str, message: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Borrowed(message));
        return Err(error);
    }
    Ok(())
}

fn name_present(name: &str) -> Result<(), ValidationError> {
    present(name, "name", "Please add a name")
}

fn description_present(description: &str) -> Result<(), ValidationError> {
    present(description, "description", "Please add a description")
}

impl BootcampUpdate {
    pub fn normalized(self) -> Self {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            name: trim(self.name),
            description: trim(self.description),
            website: trim(self.website),
            phone: trim(self.phone),
            email: trim(self.email),
            address: trim(self.address),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.website.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.careers.is_none()
            && self.housing.is_none()
            && self.job_assistance.is_none()
            && self.job_guarantee.is_none()
            && self.accept_gi.is_none()
    }
}

/// URL-friendly form of a bootcamp name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
