use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::Error;
use crate::request::{ApiRequest, RequestBody};
use crate::telemetry::{RefreshTrigger, ReplayOutcome};
use crate::token::{AccessToken, RefreshCoordinator, TokenStore};

use super::{AuthenticatedHttpClient, ClientBuilder};

impl AuthenticatedHttpClient {
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn refresh_interval(&self) -> Duration {
        self.policy.interval()
    }

    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    pub fn coordinator(&self) -> Arc<RefreshCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Sends `request` with credentials attached, refreshing and replaying
    /// once if the server answers 401.
    ///
    /// HTTP error statuses come back as a normal `Response`; only transport
    /// failures are errors.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, Error> {
        let prepared = self.prepare_request(request).await;
        let result = self.dispatch(&prepared).await;
        self.handle_response(prepared, result).await
    }

    /// Runs the proactive refresh check and attaches the current headers.
    ///
    /// Never fails: a refresh or store problem is logged and the request goes
    /// out with whatever credentials are available.
    pub async fn prepare_request(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(stale) = self.stale_token().await
            && let Err(err) = self
                .coordinator
                .refresh(RefreshTrigger::Proactive, Some(&stale))
                .await
        {
            warn!(
                path = %request.path(),
                error = %err,
                "proactive refresh failed; sending with stored token"
            );
        }

        let token = self.current_token().await;
        attach_bearer(&mut request, token);

        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        match request.body {
            RequestBody::Multipart(_) => {
                // reqwest writes the boundary-bearing content type itself
                request.headers.remove(CONTENT_TYPE);
            }
            RequestBody::Json(_) | RequestBody::Empty => {
                request
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
        }
        request
    }

    /// Applies the 401 policy to the outcome of a dispatch.
    pub async fn handle_response(
        &self,
        mut request: ApiRequest,
        result: Result<Response, Error>,
    ) -> Result<Response, Error> {
        let response = result?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if request.replayed {
            return Ok(final_unauthorized(&request, response));
        }
        request.replayed = true;

        warn!(
            method = %request.method(),
            path = %request.path(),
            "received 401; refreshing token"
        );
        let refreshed = self
            .coordinator
            .refresh(RefreshTrigger::Reactive, request.sent_with.as_ref())
            .await;
        if let Err(err) = refreshed {
            warn!(
                path = %request.path(),
                error = %err,
                "refresh failed; returning original 401"
            );
            ReplayOutcome {
                method: request.method.clone(),
                path: request.path.clone(),
                refreshed: false,
                status: None,
            }
            .log();
            return Ok(response);
        }

        let token = self.current_token().await;
        attach_bearer(&mut request, token);
        let replay = self.dispatch(&request).await;
        ReplayOutcome {
            method: request.method.clone(),
            path: request.path.clone(),
            refreshed: true,
            status: replay.as_ref().ok().map(|r| r.status()),
        }
        .log();
        match replay? {
            resp if resp.status() == StatusCode::UNAUTHORIZED => {
                Ok(final_unauthorized(&request, resp))
            }
            resp => Ok(resp),
        }
    }

    /// Sends a prepared request as-is.
    pub async fn dispatch(&self, request: &ApiRequest) -> Result<Response, Error> {
        let url = self.base_url.join(request.relative_path())?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(serde_json::to_vec(value)?),
            RequestBody::Multipart(payload) => builder.multipart(payload.to_form()?),
        };
        debug!(
            method = %request.method,
            path = %request.path,
            replayed = request.replayed,
            "request.dispatch"
        );
        Ok(builder.send().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.send(ApiRequest::delete(path))
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Sends and decodes a JSON body, turning error statuses into `Error::Transport`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let resp = self.send(request).await?.error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// The stored token, when it is old enough to refresh before sending.
    async fn stale_token(&self) -> Option<AccessToken> {
        match self.store.record().await {
            Ok(Some(record)) if self.policy.is_due(record.issued_at, self.clock.now()) => {
                Some(record.token)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "could not read token timestamp");
                None
            }
        }
    }

    async fn current_token(&self) -> Option<AccessToken> {
        match self.store.get_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "could not read stored token; sending unauthenticated");
                None
            }
        }
    }
}

fn final_unauthorized(request: &ApiRequest, response: Response) -> Response {
    warn!(
        method = %request.method(),
        path = %request.path(),
        "401 after replay; returning to caller"
    );
    response
}

fn attach_bearer(request: &mut ApiRequest, token: Option<AccessToken>) {
    let token = token.and_then(|token| match HeaderValue::from_str(&token.bearer()) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some((token, value))
        }
        Err(_) => {
            warn!("stored token is not a valid header value; sending unauthenticated");
            None
        }
    });
    match token {
        Some((token, value)) => {
            request.headers.insert(AUTHORIZATION, value);
            request.sent_with = Some(token);
        }
        None => {
            request.headers.remove(AUTHORIZATION);
            request.sent_with = None;
        }
    }
}
