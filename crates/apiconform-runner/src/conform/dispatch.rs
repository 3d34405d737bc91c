//! Request dispatch: one blocking HTTP exchange per descriptor

use std::time::{Duration, Instant};

use apiconform_core::descriptor::RequestDescriptor;
use apiconform_core::response::{ResponseBody, ResponseRecord};

use super::RunnerError;

/// Redirect hops allowed for endpoints that opt into following them.
const MAX_REDIRECTS: usize = 10;

/// Sends descriptors to `base_url`. One per virtual user.
pub struct Dispatcher {
    base_url: String,
    client: reqwest::blocking::Client,
    follow_client: reqwest::blocking::Client,
}

impl Dispatcher {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RunnerError> {
        let build = |policy: reqwest::redirect::Policy| {
            reqwest::blocking::Client::builder()
                .timeout(timeout)
                .pool_max_idle_per_host(0)
                .redirect(policy)
                .build()
                .map_err(|e| RunnerError::Client(e.to_string()))
        };
        Ok(Self {
            base_url: base_url.into(),
            client: build(reqwest::redirect::Policy::none())?,
            follow_client: build(reqwest::redirect::Policy::limited(MAX_REDIRECTS))?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request` exactly as built. Transport failures (refused
    /// connection, timeout, invalid header bytes) come back as status 0.
    ///
    /// The client adds `Accept: */*` only when the descriptor carries no
    /// `Accept` of its own.
    #[must_use]
    pub fn dispatch(&self, request: &RequestDescriptor) -> ResponseRecord {
        let start = Instant::now();
        self.send(request, start)
            .unwrap_or_else(|e| ResponseRecord::transport_failure(e, start.elapsed()))
    }

    fn send(&self, request: &RequestDescriptor, start: Instant) -> Result<ResponseRecord, String> {
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|_| format!("invalid HTTP method '{}'", request.method()))?;

        let client = if request.follow_redirects() {
            &self.follow_client
        } else {
            &self.client
        };

        let mut req = client.request(method, request.url(&self.base_url));
        for (name, value) in request.headers().iter() {
            req = req.header(name, value);
        }
        if let Some(cookie) = request.cookie_header() {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(body) = request.body() {
            req = req.body(body.bytes.clone());
        }

        let resp = req.send().map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = resp.bytes().map_err(|e| e.to_string())?;

        Ok(ResponseRecord {
            status,
            headers,
            body: ResponseBody::from_bytes(&bytes),
            elapsed: start.elapsed(),
            transport_error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiconform_core::endpoint::Method;

    #[test]
    fn refused_connection_is_status_zero() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let dispatcher =
            Dispatcher::new(format!("http://127.0.0.1:{port}"), Duration::from_secs(2)).unwrap();
        let request = RequestDescriptor::builder(Method::parse("GET").unwrap(), "/").build();

        let record = dispatcher.dispatch(&request);
        assert_eq!(record.status, 0);
        assert!(record.is_transport_failure());
        assert!(record.transport_error.is_some());
    }
}
