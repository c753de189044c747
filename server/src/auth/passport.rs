use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::Session;

pub const PASSPORT_KEY: &str = "passport";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PassportData {
    user: String,
}

/// Stores the parent's identity in a fresh session id.
pub fn log_in(session: &Session, parent_id: &ObjectId) -> Result<()> {
    session.renew();
    session.insert(
        PASSPORT_KEY,
        PassportData {
            user: parent_id.to_hex(),
        },
    )
}

pub fn log_out(session: &Session) {
    session.purge();
}

/// Reads the identity back; malformed payloads count as logged out.
pub fn user_from(session: &Session) -> Result<Option<ObjectId>> {
    let data = match session.get::<PassportData>(PASSPORT_KEY) {
        Ok(Some(data)) => data,
        Ok(None) => return Ok(None),
        Err(err) => {
            log::warn!("Ignoring unreadable passport data: {}", err);
            return Ok(None);
        }
    };

    match ObjectId::parse_str(&data.user) {
        Ok(id) => Ok(Some(id)),
        Err(err) => {
            log::warn!("Ignoring passport user '{}': {}", data.user, err);
            Ok(None)
        }
    }
}
