//! Derived bootcamp fields and cascades.
//!
//! Each refresh re-reads the full dependent set, so a value left stale by a
//! failed or interleaved write is corrected by the next write to that bootcamp.

use super::Database;
use crate::{
    models::{course::round_average_cost, Bootcamp, Course, Review},
    utils::ApiResult,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

/// What a bootcamp delete removed alongside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSummary {
    pub courses: u64,
    pub reviews: u64,
}

impl Database {
    /// `$avg` of `field` over documents of `collection` referencing the bootcamp
    async fn average_for_bootcamp(
        &self,
        collection: mongodb::Collection<Document>,
        bootcamp_id: ObjectId,
        field: &str,
    ) -> ApiResult<Option<f64>> {
        let pipeline = vec![
            doc! { "$match": { "bootcamp": bootcamp_id } },
            doc! { "$group": { "_id": "$bootcamp", "average": { "$avg": format!("${}", field) } } },
        ];

        let groups: Vec<Document> = collection.aggregate(pipeline).await?.try_collect().await?;
        Ok(groups
            .first()
            .and_then(|group| group.get("average"))
            .and_then(|average| average.as_f64()))
    }

    async fn store_average(
        &self,
        bootcamp_id: ObjectId,
        field: &str,
        value: Option<f64>,
    ) -> ApiResult<()> {
        let mut change = Document::new();
        let update = match value {
            Some(value) => {
                change.insert(field, value);
                doc! { "$set": change }
            }
            None => {
                change.insert(field, "");
                doc! { "$unset": change }
            }
        };
        self.raw::<Bootcamp>()
            .update_one(doc! { "_id": bootcamp_id }, update)
            .await?;
        Ok(())
    }

    /// Recompute `averageCost` from the bootcamp's courses
    pub async fn refresh_average_cost(&self, bootcamp_id: ObjectId) -> ApiResult<Option<f64>> {
        let mean = self
            .average_for_bootcamp(self.raw::<Course>(), bootcamp_id, "tuition")
            .await?;
        let cost = mean.map(round_average_cost);
        self.store_average(bootcamp_id, "averageCost", cost).await?;

        tracing::debug!(bootcamp = %bootcamp_id, average_cost = ?cost, "Average cost refreshed");
        Ok(cost)
    }

    /// Recompute `averageRating` from the bootcamp's reviews
    pub async fn refresh_average_rating(&self, bootcamp_id: ObjectId) -> ApiResult<Option<f64>> {
        let rating = self
            .average_for_bootcamp(self.raw::<Review>(), bootcamp_id, "rating")
            .await?;
        self.store_average(bootcamp_id, "averageRating", rating).await?;

        tracing::debug!(bootcamp = %bootcamp_id, average_rating = ?rating, "Average rating refreshed");
        Ok(rating)
    }

    /// Remove a bootcamp together with its courses and reviews
    pub async fn delete_bootcamp_cascade(&self, bootcamp_id: ObjectId) -> ApiResult<CascadeSummary> {
        let courses = self
            .courses()
            .delete_many(doc! { "bootcamp": bootcamp_id })
            .await?
            .deleted_count;
        let reviews = self
            .reviews()
            .delete_many(doc! { "bootcamp": bootcamp_id })
            .await?
            .deleted_count;
        self.bootcamps().delete_one(doc! { "_id": bootcamp_id }).await?;

        tracing::info!(bootcamp = %bootcamp_id, courses, reviews, "Bootcamp deleted with dependents");
        Ok(CascadeSummary { courses, reviews })
    }
}
