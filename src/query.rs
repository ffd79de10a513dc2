//! Filtering, field selection, sorting and pagination for list endpoints.
//!
//! Query strings like `?careers[in]=Business,UI/UX&averageCost[lte]=10000&select=name&sort=-averageCost&page=2`
//! are parsed into a typed [`ListQuery`] and executed as a single aggregation
//! pipeline, with an optional `$lookup` standing in for relation expansion.

use crate::{
    db::Database,
    models::{document_to_json, FieldKind, ListResponse, Resource},
    utils::{ApiError, ApiResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;
pub const DEFAULT_SORT: &str = "-createdAt";

/// Query-string keys that control the listing rather than filter it
const RESERVED_PARAMS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Comparison operator accepted in `field[op]=value` filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    fn operator(self) -> Option<&'static str> {
        match self {
            FilterOp::Eq => None,
            FilterOp::Gt => Some("$gt"),
            FilterOp::Gte => Some("$gte"),
            FilterOp::Lt => Some("$lt"),
            FilterOp::Lte => Some("$lte"),
            FilterOp::In => Some("$in"),
        }
    }
}

/// `{ page, limit }` of an adjacent page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// Links to the neighbouring pages, each present only if that page exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Relation expansion, executed as a `$lookup` stage
#[derive(Debug, Clone)]
pub struct Populate {
    pub from: &'static str,
    pub local_field: &'static str,
    pub foreign_field: &'static str,
    /// Output field, also the name `select` must mention to keep the expansion
    pub as_field: &'static str,
    /// Reference to one document rather than a list
    pub single: bool,
    /// Fields kept on the joined documents; empty keeps everything
    pub fields: &'static [&'static str],
}

impl Populate {
    /// A bootcamp's courses
    pub fn courses() -> Self {
        Self {
            from: "courses",
            local_field: "_id",
            foreign_field: "bootcamp",
            as_field: "courses",
            single: false,
            fields: &[],
        }
    }

    /// `{ _id, name, description }` of the referenced bootcamp
    pub fn bootcamp_summary() -> Self {
        Self {
            from: "bootcamps",
            local_field: "bootcamp",
            foreign_field: "_id",
            as_field: "bootcamp",
            single: true,
            fields: &["name", "description"],
        }
    }

    pub fn stages(&self) -> Vec<Document> {
        let mut pipeline = vec![doc! {
            "$match": { "$expr": { "$eq": [format!("${}", self.foreign_field), "$$key"] } }
        }];
        if !self.fields.is_empty() {
            let projection: Document = self
                .fields
                .iter()
                .map(|field| (field.to_string(), Bson::Int32(1)))
                .collect();
            pipeline.push(doc! { "$project": projection });
        }

        let mut stages = vec![doc! {
            "$lookup": {
                "from": self.from,
                "let": { "key": format!("${}", self.local_field) },
                "pipeline": pipeline,
                "as": self.as_field,
            }
        }];
        if self.single {
            stages.push(doc! {
                "$unwind": {
                    "path": format!("${}", self.as_field),
                    "preserveNullAndEmptyArrays": true,
                }
            });
        }
        stages
    }
}

/// A parsed list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Document,
    pub select: Option<Vec<String>>,
    pub sort: Document,
    pub page: u64,
    pub limit: u64,
}

impl ListQuery {
    /// Parse raw query-string pairs for resource `R`
    pub fn parse<R: Resource>(params: &[(String, String)]) -> ApiResult<Self> {
        let lookup = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        let mut filter = Document::new();
        for (key, value) in params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            let (field, op) = split_filter_key(key)?;
            let kind = field_kind::<R>(field)?;
            add_clause(&mut filter, field, op, coerce_filter_value(field, kind, op, value)?)?;
        }

        let select = lookup("select")
            .map(|raw| parse_field_list(raw, "select"))
            .transpose()?
            .filter(|fields| !fields.is_empty());

        let sort = parse_sort(lookup("sort").unwrap_or(DEFAULT_SORT))?;

        Ok(Self {
            filter,
            select,
            sort,
            page: parse_positive(lookup("page"), DEFAULT_PAGE),
            limit: parse_positive(lookup("limit"), DEFAULT_LIMIT),
        })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn projection(&self) -> Option<Document> {
        self.select.as_ref().map(|fields| {
            fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(1)))
                .collect()
        })
    }

    /// Neighbouring pages given the number of matching documents
    pub fn pagination(&self, total: u64) -> Pagination {
        let end = self.page.saturating_mul(self.limit);
        Pagination {
            next: (end < total).then(|| PageRef {
                page: self.page.saturating_add(1),
                limit: self.limit,
            }),
            prev: (self.skip() > 0).then(|| PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }

    /// Whether the expansion survives the `select` list
    fn keeps(&self, populate: &Populate) -> bool {
        self.select
            .as_ref()
            .map_or(true, |fields| fields.iter().any(|f| f == populate.as_field))
    }

    /// Aggregation pipeline for one page of results
    pub fn pipeline(&self, populate: Option<&Populate>) -> Vec<Document> {
        let mut pipeline = vec![
            doc! { "$match": self.filter.clone() },
            doc! { "$sort": self.sort.clone() },
            doc! { "$skip": as_bson_count(self.skip()) },
            doc! { "$limit": as_bson_count(self.limit) },
        ];
        if let Some(projection) = self.projection() {
            pipeline.push(doc! { "$project": projection });
        }
        if let Some(populate) = populate.filter(|p| self.keeps(p)) {
            pipeline.extend(populate.stages());
        }
        pipeline
    }

    /// Run the query against `R`'s collection
    pub async fn execute<R: Resource>(
        &self,
        db: &Database,
        populate: Option<&Populate>,
    ) -> ApiResult<ListResponse> {
        let collection = db.raw::<R>();

        let total = collection.count_documents(self.filter.clone()).await?;
        let documents: Vec<Document> = collection
            .aggregate(self.pipeline(populate))
            .await?
            .try_collect()
            .await?;

        tracing::debug!(
            collection = R::COLLECTION,
            total,
            returned = documents.len(),
            page = self.page,
            "List query executed"
        );

        let data = documents.into_iter().map(document_to_json).collect();
        Ok(ListResponse::new(data).with_pagination(self.pagination(total)))
    }
}

/// Fetch one document by id with a relation expanded
pub async fn find_populated<R: Resource>(
    db: &Database,
    id: ObjectId,
    populate: &Populate,
) -> ApiResult<Option<Document>> {
    let mut pipeline = vec![doc! { "$match": { "_id": id } }];
    pipeline.extend(populate.stages());

    let mut cursor = db.raw::<R>().aggregate(pipeline).await?;
    Ok(cursor.try_next().await?)
}

/// `cost[gte]` → (`cost`, Gte); `cost` → (`cost`, Eq)
fn split_filter_key(key: &str) -> ApiResult<(&str, FilterOp)> {
    let Some(open) = key.find('[') else {
        return Ok((key, FilterOp::Eq));
    };
    let field = &key[..open];
    let op = key[open + 1..]
        .strip_suffix(']')
        .and_then(FilterOp::parse)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported filter `{}`", key)))?;
    Ok((field, op))
}

fn field_kind<R: Resource>(field: &str) -> ApiResult<FieldKind> {
    if field.is_empty() || field.starts_with('$') || field.contains("..") {
        return Err(ApiError::bad_request(format!("Invalid filter field `{}`", field)));
    }
    let (root, nested) = match field.split_once('.') {
        Some((root, _)) => (root, true),
        None => (field, false),
    };
    match R::field_kind(root) {
        Some(FieldKind::Object) if nested => Ok(FieldKind::Text),
        Some(kind) => Ok(kind),
        None => Err(ApiError::bad_request(format!("Unknown filter field `{}`", field))),
    }
}

fn coerce_filter_value(field: &str, kind: FieldKind, op: FilterOp, raw: &str) -> ApiResult<Bson> {
    if op == FilterOp::In {
        let values = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| coerce_scalar(field, kind, v))
            .collect::<ApiResult<Vec<_>>>()?;
        return Ok(Bson::Array(values));
    }
    coerce_scalar(field, kind, raw)
}

fn coerce_scalar(field: &str, kind: FieldKind, raw: &str) -> ApiResult<Bson> {
    let invalid = || ApiError::bad_request(format!("Invalid value `{}` for field `{}`", raw, field));

    match kind {
        FieldKind::Text | FieldKind::Object => Ok(Bson::String(raw.to_string())),
        FieldKind::Id => ObjectId::parse_str(raw)
            .map(Bson::ObjectId)
            .map_err(|_| invalid()),
        FieldKind::Number => {
            if let Ok(n) = raw.parse::<i64>() {
                Ok(Bson::Int64(n))
            } else {
                raw.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(Bson::Double)
                    .ok_or_else(invalid)
            }
        }
        FieldKind::Bool => match raw {
            "true" => Ok(Bson::Boolean(true)),
            "false" => Ok(Bson::Boolean(false)),
            _ => Err(invalid()),
        },
        FieldKind::Date => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| Bson::DateTime(DateTime::from_millis(dt.timestamp_millis())))
            .or_else(|_| {
                chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|date| {
                    let millis = date
                        .and_hms_opt(0, 0, 0)
                        .map(|dt| dt.and_utc().timestamp_millis())
                        .unwrap_or_default();
                    Bson::DateTime(DateTime::from_millis(millis))
                })
            })
            .map_err(|_| invalid()),
    }
}

fn add_clause(filter: &mut Document, field: &str, op: FilterOp, value: Bson) -> ApiResult<()> {
    let conflict = || ApiError::bad_request(format!("Conflicting filters for field `{}`", field));

    match op.operator() {
        None => {
            if filter.contains_key(field) {
                return Err(conflict());
            }
            filter.insert(field, value);
        }
        Some(operator) => match filter.get_mut(field) {
            Some(Bson::Document(clauses)) => {
                clauses.insert(operator, value);
            }
            Some(_) => return Err(conflict()),
            None => {
                let mut clauses = Document::new();
                clauses.insert(operator, value);
                filter.insert(field, clauses);
            }
        },
    }
    Ok(())
}

fn parse_field_list(raw: &str, param: &str) -> ApiResult<Vec<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| {
            if f.starts_with('$') {
                Err(ApiError::bad_request(format!("Invalid {} field `{}`", param, f)))
            } else {
                Ok(f.to_string())
            }
        })
        .collect()
}

/// `a,-b` → `{ a: 1, b: -1 }`, with `_id` appended as a stable tie-breaker
fn parse_sort(raw: &str) -> ApiResult<Document> {
    let mut sort = Document::new();
    let mut last_direction = -1;
    for field in parse_field_list(raw, "sort")? {
        let (name, direction) = match field.strip_prefix('-') {
            Some(name) => (name.to_string(), -1),
            None => (field, 1),
        };
        if name.is_empty() {
            continue;
        }
        last_direction = direction;
        sort.insert(name, direction);
    }
    if sort.is_empty() {
        sort.insert("createdAt", -1);
    }
    if !sort.contains_key("_id") {
        sort.insert("_id", last_direction);
    }
    Ok(sort)
}

/// Positive integer capped at `i64::MAX`, the largest `$skip`/`$limit` BSON carries
fn parse_positive(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&v| v > 0)
        .map(|v| v.min(i64::MAX as u64))
        .unwrap_or(default)
}

fn as_bson_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
