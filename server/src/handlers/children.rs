use actix_web::{delete, get, post, put, web, HttpResponse, Scope};
use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};

use super::{into_body, validate, JsonOrForm};
use crate::auth::AuthenticatedParent;
use crate::db::{
    models::{Child, ChildView},
    MongoDbContext,
};
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct ChildRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthdate: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChildListResponse {
    pub children: Vec<ChildView>,
}

pub fn scope() -> Scope {
    web::scope("/api/v1/children")
        .service(list_children)
        .service(create_child)
        .service(get_child)
        .service(update_child)
        .service(delete_child)
}

#[get("")]
pub async fn list_children(
    parent: AuthenticatedParent,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let children = db.children().list_for_parent(&parent.id).await?;

    log::debug!(
        "Listed {} children for parent {}",
        children.len(),
        parent.id.to_hex()
    );

    Ok(HttpResponse::Ok().json(ChildListResponse {
        children: children.iter().map(ChildView::from).collect(),
    }))
}

#[post("")]
pub async fn create_child(
    parent: AuthenticatedParent,
    body: JsonOrForm<ChildRequest>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let req = into_body(body);

    let child = Child::new(
        parent.id,
        validate::required("first_name", req.first_name)?,
        validate::optional(req.last_name),
        validate::birthdate(req.birthdate)?,
    );
    let child = db.children().insert(child).await?;

    log::info!("Parent {} added child {}", parent.id.to_hex(), child.first_name);

    Ok(HttpResponse::Created().json(ChildView::from(&child)))
}

#[get("/{id}")]
pub async fn get_child(
    parent: AuthenticatedParent,
    path: web::Path<String>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let id = validate::path_id(&path, "child")?;
    let child = db
        .children()
        .find_owned(&id, &parent.id)
        .await?
        .ok_or(AppError::NotFound("child"))?;

    Ok(HttpResponse::Ok().json(ChildView::from(&child)))
}

/// Only the fields present in the body change; an empty optional field
/// clears the stored value.
fn child_changes(req: ChildRequest) -> Result<Document> {
    let mut changes = Document::new();

    if req.first_name.is_some() {
        changes.insert("first_name", validate::required("first_name", req.first_name)?);
    }
    if req.last_name.is_some() {
        let last_name = validate::optional(req.last_name).map_or(Bson::Null, Bson::String);
        changes.insert("last_name", last_name);
    }
    if req.birthdate.is_some() {
        let birthdate = bson::to_bson(&validate::birthdate(req.birthdate)?)
            .map_err(|e| AppError::Internal(format!("failed to encode birthdate: {}", e)))?;
        changes.insert("birthdate", birthdate);
    }

    if changes.is_empty() {
        return Err(AppError::Validation("no fields to update".to_string()));
    }
    Ok(changes)
}

#[put("/{id}")]
pub async fn update_child(
    parent: AuthenticatedParent,
    path: web::Path<String>,
    body: JsonOrForm<ChildRequest>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let id = validate::path_id(&path, "child")?;
    let changes = child_changes(into_body(body))?;

    let child = db
        .children()
        .update_owned(&id, &parent.id, changes)
        .await?
        .ok_or(AppError::NotFound("child"))?;

    Ok(HttpResponse::Ok().json(ChildView::from(&child)))
}

#[delete("/{id}")]
pub async fn delete_child(
    parent: AuthenticatedParent,
    path: web::Path<String>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let id = validate::path_id(&path, "child")?;

    if !db.children().delete_owned(&id, &parent.id).await? {
        return Err(AppError::NotFound("child"));
    }
    let removed = db.allergens().delete_for_child(&id).await?;

    log::info!(
        "Parent {} removed child {} and {} allergens",
        parent.id.to_hex(),
        id.to_hex(),
        removed
    );

    Ok(HttpResponse::NoContent().finish())
}
