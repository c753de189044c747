use actix_web::{delete, get, post, put, web, HttpResponse, Scope};
use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

use super::{into_body, validate, JsonOrForm};
use crate::auth::AuthenticatedParent;
use crate::db::{
    models::{Allergen, AllergenView, Severity},
    MongoDbContext,
};
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct AllergenRequest {
    pub child_id: Option<String>,
    pub name: Option<String>,
    pub severity: Option<String>,
    pub reaction: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AllergenQuery {
    pub child_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AllergenListResponse {
    pub allergens: Vec<AllergenView>,
}

pub fn scope() -> Scope {
    web::scope("/api/v1/allergens")
        .service(list_allergens)
        .service(create_allergen)
        .service(get_allergen)
        .service(update_allergen)
        .service(delete_allergen)
}

fn severity(raw: Option<String>) -> Result<Option<Severity>> {
    validate::optional(raw)
        .map(|raw| raw.parse::<Severity>().map_err(AppError::Validation))
        .transpose()
}

/// Resolves `child_id` to one of the parent's children.
async fn owned_child(db: &MongoDbContext, parent_id: &ObjectId, raw: &str) -> Result<ObjectId> {
    let child_id = validate::field_id("child_id", raw)?;
    db.children()
        .find_owned(&child_id, parent_id)
        .await?
        .ok_or(AppError::NotFound("child"))?;
    Ok(child_id)
}

#[get("")]
pub async fn list_allergens(
    parent: AuthenticatedParent,
    query: web::Query<AllergenQuery>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let child_id = validate::optional(query.into_inner().child_id)
        .map(|raw| validate::field_id("child_id", &raw))
        .transpose()?;

    let allergens = db
        .allergens()
        .list_for_parent(&parent.id, child_id.as_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AllergenListResponse {
        allergens: allergens.iter().map(AllergenView::from).collect(),
    }))
}

#[post("")]
pub async fn create_allergen(
    parent: AuthenticatedParent,
    body: JsonOrForm<AllergenRequest>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let req = into_body(body);

    let name = validate::required("name", req.name)?;
    let severity = severity(req.severity)?.unwrap_or_default();
    let raw_child = validate::required("child_id", req.child_id)?;
    let child_id = owned_child(&db, &parent.id, &raw_child).await?;

    let allergen = Allergen::new(
        parent.id,
        child_id,
        name,
        severity,
        validate::optional(req.reaction),
        validate::optional(req.notes),
    );
    let allergen = db.allergens().insert(allergen).await?;

    log::info!(
        "Recorded allergen {} for child {}",
        allergen.name,
        child_id.to_hex()
    );

    Ok(HttpResponse::Created().json(AllergenView::from(&allergen)))
}

#[get("/{id}")]
pub async fn get_allergen(
    parent: AuthenticatedParent,
    path: web::Path<String>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let id = validate::path_id(&path, "allergen")?;
    let allergen = db
        .allergens()
        .find_owned(&id, &parent.id)
        .await?
        .ok_or(AppError::NotFound("allergen"))?;

    Ok(HttpResponse::Ok().json(AllergenView::from(&allergen)))
}

#[put("/{id}")]
pub async fn update_allergen(
    parent: AuthenticatedParent,
    path: web::Path<String>,
    body: JsonOrForm<AllergenRequest>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let id = validate::path_id(&path, "allergen")?;
    let req = into_body(body);
    let mut changes = Document::new();

    if req.name.is_some() {
        changes.insert("name", validate::required("name", req.name)?);
    }
    if let Some(severity) = severity(req.severity)? {
        let severity = bson::to_bson(&severity)
            .map_err(|e| AppError::Internal(format!("failed to encode severity: {}", e)))?;
        changes.insert("severity", severity);
    }
    for (field, value) in [("reaction", req.reaction), ("notes", req.notes)] {
        if value.is_some() {
            changes.insert(field, validate::optional(value).map_or(Bson::Null, Bson::String));
        }
    }
    if let Some(raw_child) = validate::optional(req.child_id) {
        changes.insert("child_id", owned_child(&db, &parent.id, &raw_child).await?);
    }

    if changes.is_empty() {
        return Err(AppError::Validation("no fields to update".to_string()));
    }

    let allergen = db
        .allergens()
        .update_owned(&id, &parent.id, changes)
        .await?
        .ok_or(AppError::NotFound("allergen"))?;

    Ok(HttpResponse::Ok().json(AllergenView::from(&allergen)))
}

#[delete("/{id}")]
pub async fn delete_allergen(
    parent: AuthenticatedParent,
    path: web::Path<String>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let id = validate::path_id(&path, "allergen")?;

    if !db.allergens().delete_owned(&id, &parent.id).await? {
        return Err(AppError::NotFound("allergen"));
    }

    log::info!("Parent {} removed allergen {}", parent.id.to_hex(), id.to_hex());

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parsing() {
        assert_eq!(severity(None).unwrap(), None);
        assert_eq!(severity(Some(" ".to_string())).unwrap(), None);
        assert_eq!(
            severity(Some("Severe".to_string())).unwrap(),
            Some(Severity::Severe)
        );
        assert!(matches!(
            severity(Some("deadly".to_string())),
            Err(AppError::Validation(_))
        ));
    }
}
