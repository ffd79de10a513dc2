//! Fixture import and wipe for the `seeder` binary.
//!
//! Fixtures live in `_data/{users,bootcamps,courses,reviews}.json` and carry
//! their own hex `_id`s so courses and reviews can point at bootcamps and
//! users declared in the other files.

use crate::{
    auth::AuthService,
    db::Database,
    geocoder::Geocoder,
    models::{
        Bootcamp, Course, GeoPoint, NewBootcamp, NewCourse, NewReview, Review, Role, User,
    },
};
use anyhow::{anyhow, Context, Result};
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use serde::{de::DeserializeOwned, Deserialize};
use std::path::{Path, PathBuf};
use validator::Validate;

pub const DEFAULT_DATA_DIR: &str = "_data";

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Plain text; hashed on import
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedBootcamp {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    #[serde(flatten)]
    pub fields: NewBootcamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCourse {
    #[serde(rename = "_id")]
    pub id: String,
    pub bootcamp: String,
    pub user: String,
    #[serde(flatten)]
    pub fields: NewCourse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedReview {
    #[serde(rename = "_id")]
    pub id: String,
    pub bootcamp: String,
    pub user: String,
    #[serde(flatten)]
    pub fields: NewReview,
}

/// Every fixture file, parsed but not yet validated
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub bootcamps: Vec<SeedBootcamp>,
    pub courses: Vec<SeedCourse>,
    pub reviews: Vec<SeedReview>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: u64,
    pub bootcamps: u64,
    pub courses: u64,
    pub reviews: u64,
}

/// `SEED_DATA_DIR` or `_data`
pub fn data_dir() -> PathBuf {
    std::env::var("SEED_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

fn read_fixture<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_oid(hex: &str, what: &str) -> Result<ObjectId> {
    ObjectId::parse_str(hex).map_err(|_| anyhow!("Invalid {} id `{}`", what, hex))
}

fn check<T: Validate>(record: &T, kind: &str, id: &str) -> Result<()> {
    record
        .validate()
        .map_err(|errors| anyhow!("{} {}: {}", kind, id, crate::ApiError::from(errors).message))
}

impl SeedData {
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            users: read_fixture(dir, "users.json")?,
            bootcamps: read_fixture(dir, "bootcamps.json")?,
            courses: read_fixture(dir, "courses.json")?,
            reviews: read_fixture(dir, "reviews.json")?,
        })
    }

    /// Users ready to insert, with passwords hashed by `hash`
    pub fn users(&self, hash: impl Fn(&str) -> Result<String>) -> Result<Vec<User>> {
        self.users
            .iter()
            .map(|seed| {
                Ok(User {
                    id: Some(parse_oid(&seed.id, "user")?),
                    name: seed.name.trim().to_string(),
                    email: seed.email.trim().to_lowercase(),
                    role: seed.role,
                    password: hash(&seed.password)?,
                    reset_password_token: None,
                    reset_password_expire: None,
                    created_at: DateTime::now(),
                })
            })
            .collect()
    }

    pub fn courses(&self) -> Result<Vec<Course>> {
        self.courses
            .iter()
            .map(|seed| {
                let fields = seed.fields.clone().normalized();
                check(&fields, "course", &seed.id)?;
                let mut course = fields.into_course(
                    parse_oid(&seed.bootcamp, "bootcamp")?,
                    parse_oid(&seed.user, "user")?,
                );
                course.id = Some(parse_oid(&seed.id, "course")?);
                Ok(course)
            })
            .collect()
    }

    pub fn reviews(&self) -> Result<Vec<Review>> {
        self.reviews
            .iter()
            .map(|seed| {
                let fields = seed.fields.clone().normalized();
                check(&fields, "review", &seed.id)?;
                let mut review = fields.into_review(
                    parse_oid(&seed.bootcamp, "bootcamp")?,
                    parse_oid(&seed.user, "user")?,
                );
                review.id = Some(parse_oid(&seed.id, "review")?);
                Ok(review)
            })
            .collect()
    }

    /// Bootcamps ready to insert, geocoded when a geocoder is available
    pub async fn bootcamps(&self, geocoder: Option<&Geocoder>) -> Result<Vec<Bootcamp>> {
        let mut bootcamps = Vec::with_capacity(self.bootcamps.len());
        for seed in &self.bootcamps {
            let fields = seed.fields.clone().normalized();
            check(&fields, "bootcamp", &seed.id)?;

            let location = match (geocoder, fields.address.as_deref()) {
                (Some(geocoder), Some(address)) => match geocoder.geocode(address).await {
                    Ok(location) => Some(GeoPoint::from(location)),
                    Err(err) => {
                        tracing::warn!(bootcamp = %seed.id, "Geocoding failed: {}", err.message);
                        None
                    }
                },
                _ => None,
            };

            let mut bootcamp = fields.into_bootcamp(parse_oid(&seed.user, "user")?, location);
            bootcamp.id = Some(parse_oid(&seed.id, "bootcamp")?);
            bootcamps.push(bootcamp);
        }
        Ok(bootcamps)
    }
}

/// Insert every fixture and recompute the bootcamp averages
pub async fn import(
    db: &Database,
    auth_service: &AuthService,
    geocoder: Option<&Geocoder>,
    data: &SeedData,
) -> Result<SeedSummary> {
    let users = data.users(|password| {
        auth_service
            .hash_password(password)
            .map_err(|err| anyhow!(err.message))
    })?;
    let bootcamps = data.bootcamps(geocoder).await?;
    let courses = data.courses()?;
    let reviews = data.reviews()?;

    let mut summary = SeedSummary::default();
    if !users.is_empty() {
        summary.users = db.users().insert_many(&users).await?.inserted_ids.len() as u64;
    }
    if !bootcamps.is_empty() {
        summary.bootcamps = db.bootcamps().insert_many(&bootcamps).await?.inserted_ids.len() as u64;
    }
    if !courses.is_empty() {
        summary.courses = db.courses().insert_many(&courses).await?.inserted_ids.len() as u64;
    }
    if !reviews.is_empty() {
        summary.reviews = db.reviews().insert_many(&reviews).await?.inserted_ids.len() as u64;
    }

    for bootcamp_id in bootcamps.iter().filter_map(|b| b.id) {
        db.refresh_average_cost(bootcamp_id)
            .await
            .map_err(|err| anyhow!(err.message))?;
        db.refresh_average_rating(bootcamp_id)
            .await
            .map_err(|err| anyhow!(err.message))?;
    }

    tracing::info!(?summary, "Seed data imported");
    Ok(summary)
}

/// Remove every document from the four collections
pub async fn destroy(db: &Database) -> Result<SeedSummary> {
    let summary = SeedSummary {
        reviews: db.reviews().delete_many(doc! {}).await?.deleted_count,
        courses: db.courses().delete_many(doc! {}).await?.deleted_count,
        bootcamps: db.bootcamps().delete_many(doc! {}).await?.deleted_count,
        users: db.users().delete_many(doc! {}).await?.deleted_count,
    };

    tracing::info!(?summary, "Seed data destroyed");
    Ok(summary)
}
