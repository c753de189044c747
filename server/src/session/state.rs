use std::cell::RefCell;
use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use mongodb::bson::{self, Bson, DateTime as BsonDateTime, Document};
use serde::{de::DeserializeOwned, Serialize};

use super::store::SessionRecord;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionStatus {
    Unchanged,
    Changed,
    Renewed,
    Purged,
}

#[derive(Debug)]
struct SessionInner {
    id: Option<String>,
    retired_id: Option<String>,
    expires: Option<BsonDateTime>,
    data: Document,
    status: SessionStatus,
}

/// What the session layer has to persist once the handler is done.
#[derive(Debug)]
pub(crate) struct SessionChanges {
    pub id: Option<String>,
    pub retired_id: Option<String>,
    pub expires: Option<BsonDateTime>,
    pub data: Document,
    pub status: SessionStatus,
}

/// Per-request view of the caller's session.
///
/// Cloning is cheap and every clone refers to the same state. New sessions
/// have no id until something is written to them.
#[derive(Debug, Clone)]
pub struct Session(Rc<RefCell<SessionInner>>);

impl Session {
    pub(crate) fn fresh() -> Self {
        Self::build(None, None, Document::new())
    }

    pub(crate) fn from_record(record: SessionRecord) -> Self {
        Self::build(Some(record.id), Some(record.expires), record.session)
    }

    fn build(id: Option<String>, expires: Option<BsonDateTime>, data: Document) -> Self {
        Session(Rc::new(RefCell::new(SessionInner {
            id,
            retired_id: None,
            expires,
            data,
            status: SessionStatus::Unchanged,
        })))
    }

    pub fn id(&self) -> Option<String> {
        self.0.borrow().id.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().data.is_empty()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let value = match self.0.borrow().data.get(key) {
            Some(value) => value.clone(),
            None => return Ok(None),
        };

        bson::from_bson(value).map(Some).map_err(|e| {
            AppError::Internal(format!("failed to decode session key '{}': {}", key, e))
        })
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = bson::to_bson(&value).map_err(|e| {
            AppError::Internal(format!("failed to encode session key '{}': {}", key, e))
        })?;

        let mut inner = self.0.borrow_mut();
        inner.data.insert(key, value);
        inner.mark_changed();
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Bson> {
        let mut inner = self.0.borrow_mut();
        let removed = inner.data.remove(key);
        if removed.is_some() {
            inner.mark_changed();
        }
        removed
    }

    /// Keeps the data but moves it to a new session id.
    pub fn renew(&self) {
        let mut inner = self.0.borrow_mut();
        inner.retire_id();
        inner.expires = None;
        inner.status = SessionStatus::Renewed;
    }

    /// Drops the data and the stored record.
    pub fn purge(&self) {
        let mut inner = self.0.borrow_mut();
        inner.retire_id();
        inner.expires = None;
        inner.data.clear();
        inner.status = SessionStatus::Purged;
    }

    pub(crate) fn take_changes(&self) -> SessionChanges {
        let mut inner = self.0.borrow_mut();
        SessionChanges {
            id: inner.id.clone(),
            retired_id: inner.retired_id.take(),
            expires: inner.expires,
            data: std::mem::take(&mut inner.data),
            status: std::mem::replace(&mut inner.status, SessionStatus::Unchanged),
        }
    }
}

impl SessionInner {
    fn mark_changed(&mut self) {
        match self.status {
            SessionStatus::Unchanged => self.status = SessionStatus::Changed,
            // Writing after a purge starts a brand new session.
            SessionStatus::Purged => self.status = SessionStatus::Renewed,
            SessionStatus::Changed | SessionStatus::Renewed => {}
        }
    }

    // Only the first retired id matters: it is the one the store knows about.
    fn retire_id(&mut self) {
        let current = self.id.take();
        if self.retired_id.is_none() {
            self.retired_id = current;
        }
    }
}

impl FromRequest for Session {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<Session>().cloned().ok_or_else(|| {
            AppError::Internal("session layer is not mounted".to_string()).into()
        }))
    }
}
