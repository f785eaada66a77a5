//! Path routing for the HTTP surface.
//!
//! `sent`, `received` and `search` are matched before the `{id}` catch-all.

/// HTTP methods the API answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Other,
}

impl From<&tiny_http::Method> for Method {
    fn from(method: &tiny_http::Method) -> Self {
        match method {
            tiny_http::Method::Get => Self::Get,
            tiny_http::Method::Post => Self::Post,
            tiny_http::Method::Put => Self::Put,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Create,
    Sent,
    Received,
    Search(String),
    Detail(String),
    Reply(String),
}

/// Resolve a request line to a route. Query strings are ignored.
#[must_use]
pub fn route(method: Method, url: &str) -> Option<Route> {
    let path = url.split_once('?').map_or(url, |(path, _)| path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (Method::Post, ["consultations"]) => Some(Route::Create),
        (Method::Get, ["consultations", "sent"]) => Some(Route::Sent),
        (Method::Get, ["consultations", "received"]) => Some(Route::Received),
        (Method::Get, ["consultations", "search"]) => Some(Route::Search(String::new())),
        (Method::Get, ["consultations", "search", query]) => Some(Route::Search(decode(query))),
        (Method::Get, ["consultations", id]) => Some(Route::Detail(decode(id))),
        (Method::Put, ["consultations", id]) => Some(Route::Reply(decode(id))),
        _ => None,
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned())
}
