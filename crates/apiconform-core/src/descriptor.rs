//! Concrete request descriptors
//!
//! A [`RequestDescriptor`] is built once per case through
//! [`DescriptorBuilder`] and then only read. The dispatcher sends exactly
//! what it holds.

use serde::Serialize;

use crate::endpoint::{ContentType, Method};
use crate::outcome::FaultDimension;

/// Header map with case-insensitive names. Inserting an existing name
/// replaces the value (last write wins) and keeps the first spelling.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for HeaderMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Raw body bytes plus the declared media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Body {
    pub bytes: Vec<u8>,
    pub content_type: ContentType,
}

impl Body {
    /// Lossy text view for logs and reproductions.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: String,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    body: Option<Body>,
    follow_redirects: bool,
}

impl RequestDescriptor {
    #[must_use]
    pub fn builder(method: Method, path: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            inner: Self {
                method,
                path: path.into(),
                query: String::new(),
                headers: HeaderMap::new(),
                cookies: Vec::new(),
                body: None,
                follow_redirects: false,
            },
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Rendered path (placeholders substituted).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string without the leading `?`.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Path plus query, e.g. `/documents?limit=1`.
    #[must_use]
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.target())
    }

    /// `Cookie` header value, `None` without cookies.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Fault dimensions in which `self` and `other` differ.
    #[must_use]
    pub fn differing_dimensions(&self, other: &Self) -> Vec<FaultDimension> {
        let mut dims = Vec::new();
        if self.headers != other.headers || self.cookies != other.cookies {
            dims.push(FaultDimension::Headers);
        }
        if self.method != other.method || self.path != other.path {
            dims.push(FaultDimension::Path);
        }
        if self.query != other.query {
            dims.push(FaultDimension::Query);
        }
        if self.body != other.body {
            dims.push(FaultDimension::Body);
        }
        dims
    }
}

/// Accumulates a descriptor; [`DescriptorBuilder::build`] freezes it.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    inner: RequestDescriptor,
}

impl DescriptorBuilder {
    /// Append an already-serialized query fragment.
    #[must_use]
    pub fn query_fragment(mut self, fragment: &str) -> Self {
        if !self.inner.query.is_empty() {
            self.inner.query.push('&');
        }
        self.inner.query.push_str(fragment);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.insert(name, value);
        self
    }

    /// Set a cookie; an existing cookie of the same name is replaced.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.inner.cookies.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.cookies.push((name, value)),
        }
        self
    }

    #[must_use]
    pub fn body(mut self, bytes: Vec<u8>, content_type: ContentType) -> Self {
        self.inner.body = Some(Body {
            bytes,
            content_type,
        });
        self
    }

    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.inner.follow_redirects = follow;
        self
    }

    #[must_use]
    pub fn build(self) -> RequestDescriptor {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> DescriptorBuilder {
        RequestDescriptor::builder(Method::parse("GET").unwrap(), path)
    }

    #[test]
    fn header_names_are_case_insensitive_last_write_wins() {
        let mut h = HeaderMap::new();
        h.insert("X-Schema-ID", "30");
        h.insert("x-schema-id", "31");
        assert_eq!(h.len(), 1);
        assert_eq!(h.get("X-SCHEMA-ID"), Some("31"));
        assert_eq!(h.iter().next(), Some(("X-Schema-ID", "31")));
        assert_eq!(h.remove("x-schema-ID"), Some("31".into()));
        assert!(h.is_empty());
    }

    #[test]
    fn target_and_url() {
        let d = get("/documents")
            .query_fragment("limit=1")
            .query_fragment("tag=a&tag=b")
            .build();
        assert_eq!(d.target(), "/documents?limit=1&tag=a&tag=b");
        assert_eq!(
            d.url("http://localhost:8282/"),
            "http://localhost:8282/documents?limit=1&tag=a&tag=b"
        );
        assert_eq!(get("/x").build().target(), "/x");
    }

    #[test]
    fn cookie_header_joined() {
        let d = get("/").cookie("session", "abc").cookie("theme", "dark").cookie("session", "xyz").build();
        assert_eq!(d.cookie_header().as_deref(), Some("session=xyz; theme=dark"));
        assert_eq!(get("/").build().cookie_header(), None);
    }

    #[test]
    fn differing_dimensions_per_axis() {
        let base = get("/d/1").query_fragment("a=1").header("X-A", "1").build();
        assert!(base.differing_dimensions(&base.clone()).is_empty());

        let header = get("/d/1").query_fragment("a=1").build();
        assert_eq!(base.differing_dimensions(&header), vec![FaultDimension::Headers]);

        let cookie = get("/d/1").query_fragment("a=1").header("X-A", "1").cookie("s", "1").build();
        assert_eq!(base.differing_dimensions(&cookie), vec![FaultDimension::Headers]);

        let path = get("/d/2").query_fragment("a=1").header("x-a", "1").build();
        assert_eq!(base.differing_dimensions(&path), vec![FaultDimension::Path]);

        let body = get("/d/1")
            .query_fragment("a=1")
            .header("X-A", "1")
            .body(b"{}".to_vec(), ContentType::Json)
            .build();
        assert_eq!(base.differing_dimensions(&body), vec![FaultDimension::Body]);
    }
}
