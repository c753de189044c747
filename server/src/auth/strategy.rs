use std::sync::OnceLock;

use actix_web::web;
use async_trait::async_trait;

use crate::db::{models::Parent, ParentRepository};
use crate::error::Result;

const DECOY_PASSWORD: &str = "peach-decoy-password";

/// Verifies a username/password pair.
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    /// `Ok(None)` means the credentials were wrong.
    async fn verify(&self, username: &str, password: &str) -> Result<Option<Parent>>;
}

/// Username lookup plus bcrypt verification against the `parents` collection.
#[derive(Clone)]
pub struct LocalStrategy {
    parents: ParentRepository,
}

impl LocalStrategy {
    pub fn new(parents: ParentRepository) -> Self {
        Self { parents }
    }
}

#[async_trait]
impl CredentialStrategy for LocalStrategy {
    async fn verify(&self, username: &str, password: &str) -> Result<Option<Parent>> {
        let parent = self.parents.find_by_username(username).await?;

        let password = password.to_string();
        web::block(move || check_password(parent, &password)).await?
    }
}

/// Stands in for a stored hash when the username is unknown, so a miss
/// costs the same bcrypt verification as a hit.
fn decoy_hash() -> Result<&'static str> {
    static DECOY: OnceLock<String> = OnceLock::new();

    if let Some(hash) = DECOY.get() {
        return Ok(hash.as_str());
    }
    let hash = bcrypt::hash(DECOY_PASSWORD, bcrypt::DEFAULT_COST)?;
    Ok(DECOY.get_or_init(|| hash).as_str())
}

/// Blocking; run it on `web::block`.
fn check_password(parent: Option<Parent>, password: &str) -> Result<Option<Parent>> {
    match parent {
        Some(parent) => {
            let matches = parent.verify_password(password)?;
            Ok(matches.then_some(parent))
        }
        None => {
            bcrypt::verify(password, decoy_hash()?)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> Parent {
        Parent::new(
            "peachmom".to_string(),
            "correct horse",
            "Peach".to_string(),
            "Mom".to_string(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_known_parent_checks_password() {
        let found = check_password(Some(parent()), "correct horse").unwrap();
        assert_eq!(found.unwrap().username, "peachmom");

        assert!(check_password(Some(parent()), "wrong horse").unwrap().is_none());
    }

    #[test]
    fn test_unknown_parent_still_runs_bcrypt() {
        assert!(check_password(None, "correct horse").unwrap().is_none());

        let hash = decoy_hash().unwrap();
        assert!(hash.starts_with("$2"));
        assert!(!bcrypt::verify("correct horse", hash).unwrap());
        // Computed once.
        assert!(std::ptr::eq(hash, decoy_hash().unwrap()));
    }
}
