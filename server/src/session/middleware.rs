use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    body::{BoxBody, MessageBody},
    cookie::{
        time::{Duration as CookieDuration, OffsetDateTime},
        Cookie, SameSite,
    },
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, HttpMessage, ResponseError,
};
use uuid::Uuid;

use super::cookie::CookieSigner;
use super::state::{Session, SessionChanges, SessionStatus};
use super::store::{SessionRecord, SessionStore};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::middleware::proxy::request_is_secure;
use crate::monitor::StoreMonitor;

pub const SESSION_COOKIE: &str = "peach.sid";
pub const SESSION_MAX_AGE: Duration = Duration::from_millis(86_400_000);

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age: Duration,
    pub trust_proxy_hops: usize,
}

impl CookieSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: SESSION_COOKIE.to_string(),
            secure: config.session_cookie_secure,
            max_age: SESSION_MAX_AGE,
            trust_proxy_hops: config.trust_proxy_hops,
        }
    }
}

/// Everything the session middleware needs, registered as app data.
#[derive(Clone)]
pub struct SessionLayer {
    store: Arc<dyn SessionStore>,
    signer: CookieSigner,
    cookie: CookieSettings,
    monitor: StoreMonitor,
}

impl SessionLayer {
    pub fn new(store: Arc<dyn SessionStore>, config: &AppConfig, monitor: StoreMonitor) -> Result<Self> {
        let signer = CookieSigner::new(config.session_secret.as_bytes())?;
        Ok(Self::with_settings(
            store,
            signer,
            CookieSettings::from_config(config),
            monitor,
        ))
    }

    pub fn with_settings(
        store: Arc<dyn SessionStore>,
        signer: CookieSigner,
        cookie: CookieSettings,
        monitor: StoreMonitor,
    ) -> Self {
        Self {
            store,
            signer,
            cookie,
            monitor,
        }
    }

    pub fn monitor(&self) -> &StoreMonitor {
        &self.monitor
    }

    pub fn cookie_settings(&self) -> &CookieSettings {
        &self.cookie
    }

    /// Routes store outcomes through the monitor.
    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.monitor.record_success(),
            Err(err) => self.monitor.report(err),
        }
        result
    }

    async fn load(&self, req: &ServiceRequest) -> Result<Session> {
        let cookie = match req.cookie(&self.cookie.name) {
            Some(cookie) => cookie,
            None => return Ok(Session::fresh()),
        };

        let session_id = match self.signer.unsign(cookie.value()) {
            Some(id) => id.to_string(),
            None => {
                log::debug!("Ignoring session cookie with an invalid signature");
                return Ok(Session::fresh());
            }
        };

        let record = self.observe(self.store.load(&session_id).await)?;
        Ok(record.map(Session::from_record).unwrap_or_else(Session::fresh))
    }

    async fn persist<B>(
        &self,
        res: &mut ServiceResponse<B>,
        changes: SessionChanges,
        had_cookie: bool,
    ) -> Result<()> {
        if changes.status == SessionStatus::Unchanged {
            return Ok(());
        }

        if let Some(retired) = &changes.retired_id {
            self.observe(self.store.destroy(retired).await)?;
        }

        if changes.status == SessionStatus::Purged {
            if had_cookie {
                let removal = Cookie::build(self.cookie.name.clone(), "").path("/").finish();
                res.response_mut()
                    .add_removal_cookie(&removal)
                    .map_err(|e| AppError::Internal(format!("failed to clear cookie: {}", e)))?;
            }
            return Ok(());
        }

        // Uninitialized sessions are never stored.
        if changes.id.is_none() && changes.data.is_empty() {
            return Ok(());
        }

        let is_new = changes.id.is_none();
        let id = changes
            .id
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let mut record = SessionRecord::new(id, changes.data, self.cookie.max_age);
        if let Some(expires) = changes.expires {
            record.expires = expires;
        }

        self.observe(self.store.save(&record).await)?;

        if is_new {
            self.issue_cookie(res, &record)?;
        }

        Ok(())
    }

    fn issue_cookie<B>(&self, res: &mut ServiceResponse<B>, record: &SessionRecord) -> Result<()> {
        if self.cookie.secure && !request_is_secure(res.request(), self.cookie.trust_proxy_hops) {
            log::debug!(
                "Session {} saved without a cookie: secure cookie over an insecure connection",
                record.id
            );
            return Ok(());
        }

        let max_age = CookieDuration::milliseconds(self.cookie.max_age.as_millis() as i64);
        let mut builder = Cookie::build(self.cookie.name.clone(), self.signer.sign(&record.id)?)
            .path("/")
            .http_only(true)
            .secure(self.cookie.secure)
            .max_age(max_age)
            .expires(OffsetDateTime::now_utc() + max_age);
        if self.cookie.secure {
            // The browser client lives on another site.
            builder = builder.same_site(SameSite::None);
        }

        res.response_mut()
            .add_cookie(&builder.finish())
            .map_err(|e| AppError::Internal(format!("failed to set cookie: {}", e)))?;
        Ok(())
    }
}

/// Loads the session before the handler and persists it afterwards.
///
/// Store failures become error responses here instead of `Err`, so the
/// outer layers still see a response to decorate.
pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> std::result::Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let layer = match req.app_data::<web::Data<SessionLayer>>().cloned() {
        Some(layer) => layer,
        None => {
            return Ok(req.error_response(AppError::Internal(
                "session layer not configured".to_string(),
            )))
        }
    };

    let had_cookie = req.cookie(&layer.cookie.name).is_some();
    let session = match layer.load(&req).await {
        Ok(session) => session,
        Err(err) => return Ok(req.error_response(err)),
    };
    req.extensions_mut().insert(session.clone());

    let mut res = next.call(req).await?.map_into_boxed_body();

    if let Err(err) = layer
        .persist(&mut res, session.take_changes(), had_cookie)
        .await
    {
        let (http_req, _) = res.into_parts();
        return Ok(ServiceResponse::new(http_req, err.error_response()));
    }

    Ok(res)
}
