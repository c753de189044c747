use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Parent {
    pub fn new(
        username: String,
        password: &str,
        first_name: String,
        last_name: String,
        email: Option<String>,
    ) -> Result<Self> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

        Ok(Self {
            id: None,
            username,
            password_hash,
            first_name,
            last_name,
            email,
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, &self.password_hash)?)
    }
}

/// Public representation of a parent; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct ParentView {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&Parent> for ParentView {
    fn from(parent: &Parent) -> Self {
        Self {
            id: parent.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: parent.username.clone(),
            first_name: parent.first_name.clone(),
            last_name: parent.last_name.clone(),
            email: parent.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub parent_id: ObjectId,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Child {
    pub fn new(
        parent_id: ObjectId,
        first_name: String,
        last_name: Option<String>,
        birthdate: Option<NaiveDate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            parent_id,
            first_name,
            last_name,
            birthdate,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChildView {
    pub id: String,
    pub parent_id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Child> for ChildView {
    fn from(child: &Child) -> Self {
        Self {
            id: child.id.map(|id| id.to_hex()).unwrap_or_default(),
            parent_id: child.parent_id.to_hex(),
            first_name: child.first_name.clone(),
            last_name: child.last_name.clone(),
            birthdate: child.birthdate,
            created_at: child.created_at,
            updated_at: child.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    #[default]
    Moderate,
    Severe,
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            other => Err(format!(
                "severity must be one of mild, moderate, severe (got '{}')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allergen {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub parent_id: ObjectId,
    pub child_id: ObjectId,
    pub name: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Allergen {
    pub fn new(
        parent_id: ObjectId,
        child_id: ObjectId,
        name: String,
        severity: Severity,
        reaction: Option<String>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            parent_id,
            child_id,
            name,
            severity,
            reaction,
            notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllergenView {
    pub id: String,
    pub child_id: String,
    pub name: String,
    pub severity: Severity,
    pub reaction: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Allergen> for AllergenView {
    fn from(allergen: &Allergen) -> Self {
        Self {
            id: allergen.id.map(|id| id.to_hex()).unwrap_or_default(),
            child_id: allergen.child_id.to_hex(),
            name: allergen.name.clone(),
            severity: allergen.severity,
            reaction: allergen.reaction.clone(),
            notes: allergen.notes.clone(),
            created_at: allergen.created_at,
            updated_at: allergen.updated_at,
        }
    }
}
