//! Route templates and bucket keys.
//!
//! A template such as `payments/:id/refund` names its path parameters with a leading `:`
//! (a parameter runs to the next `/`). Binding values produces two views of the route:
//!
//! - the **endpoint**: every bound parameter substituted plus the query string, used to
//!   build the request URL;
//! - the **bucket key** input: only *major* parameters substituted and no query string, so
//!   routes that differ only in minor identifiers share one rate-limit bucket.
//!
//! ```rust
//! use ratequeue::Route;
//! use http::Method;
//!
//! let mut route = Route::bind("customers/:id", ["cus_123"]);
//! route.add_query("limit", 10);
//! assert_eq!(route.endpoint(), "customers/cus_123?limit=10");
//! assert_eq!(route.bucket_key(&Method::GET), "GET customers/:id");
//! ```

use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Bytes escaped in a bound path value so it stays a single segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Parameters that split buckets. The remote API rate-limits per template, so none do by
/// default.
pub const DEFAULT_MAJOR_PARAMETERS: &[&str] = &[];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    template: String,
    vars: Vec<String>,
    args: HashMap<String, String>,
    query: Vec<(String, String)>,
    major: Vec<String>,
}

impl Route {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let vars = placeholders(&template);
        Self {
            template,
            vars,
            args: HashMap::new(),
            query: Vec::new(),
            major: DEFAULT_MAJOR_PARAMETERS.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Shorthand for `Route::new(template).bind_args(args)`.
    pub fn bind<I, V>(template: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Self::new(template).bind_args(args)
    }

    /// Bind values to placeholders in the order they appear in the template. Extra values
    /// are ignored; missing ones leave their placeholder unbound.
    pub fn bind_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        for (var, value) in self.vars.iter().zip(args) {
            self.args.insert(var.clone(), value.to_string());
        }
        self
    }

    /// Bind a single placeholder by name.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args.insert(name.into(), value.to_string());
        self
    }

    /// Append a query parameter. Re-adding a key replaces its value in place.
    pub fn add_query(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        let key = key.into();
        let value = value.to_string();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key, value)),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.add_query(key, value);
        self
    }

    /// Replace the set of parameters that take part in the bucket key.
    pub fn with_major_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.major = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in template order.
    pub fn placeholders(&self) -> &[String] {
        &self.vars
    }

    /// Relative endpoint with every bound parameter and the query string. Bound values are
    /// percent-encoded as single path segments.
    pub fn endpoint(&self) -> String {
        let mut endpoint = self.substitute(false);
        if !self.query.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            endpoint.push('?');
            endpoint.push_str(&query);
        }
        endpoint
    }

    /// Bucket key: method plus the path with only major parameters bound.
    pub fn bucket_key(&self, method: &Method) -> String {
        format!("{} {}", method, self.substitute(true))
    }

    fn substitute(&self, only_major: bool) -> String {
        self.template
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !only_major => match self.args.get(name) {
                    Some(value) => Cow::from(utf8_percent_encode(value, PATH_SEGMENT)),
                    None => Cow::Borrowed(segment),
                },
                Some(name) if self.major.iter().any(|m| m == name) => {
                    Cow::Borrowed(self.args.get(name).map(String::as_str).unwrap_or(segment))
                }
                _ => Cow::Borrowed(segment),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl From<&str> for Route {
    fn from(template: &str) -> Self {
        Route::new(template)
    }
}

impl From<String> for Route {
    fn from(template: String) -> Self {
        Route::new(template)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint())
    }
}

fn placeholders(template: &str) -> Vec<String> {
    template
        .split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
