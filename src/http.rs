use std::io::{self, BufRead, Write};

use crate::error::ServeError;

const MAX_HEADERS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target exactly as received, query included.
    pub target: String,
    /// Escaped path part of the target.
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Pattern of the route this request was dispatched under.
    pub route: String,
    /// Remainder captured by a wildcard route, still escaped.
    pub wildcard: Option<String>,
}

impl Request {
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method: method.to_ascii_uppercase(),
            target: target.to_string(),
            path: path.to_string(),
            query,
            headers: Vec::new(),
            route: String::new(),
            wildcard: None,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new("GET", target)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Reads a request line and its headers; the body, if any, is left unread.
    pub fn read_from<R: BufRead>(reader: &mut R) -> io::Result<Self> {
        let mut first_line = String::new();
        if reader.read_line(&mut first_line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before request line",
            ));
        }
        log::debug!("Request line: {}", first_line.trim());

        let parts: Vec<&str> = first_line.split_whitespace().collect();
        if parts.len() != 3 || !parts[2].starts_with("HTTP/") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed request line: {:?}", first_line.trim()),
            ));
        }
        let mut request = Request::new(parts[0], parts[1]);

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
                break;
            }
            if request.headers.len() >= MAX_HEADERS {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "too many headers"));
            }
            log::trace!("Header line: {}", line.trim());
            if let Some((name, value)) = line.split_once(':') {
                request
                    .headers
                    .push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        let mut response =
            Self::new(status).with_header("Content-Type", "text/plain; charset=utf-8");
        response.body = body.as_bytes().to_vec();
        response
    }

    /// Client-facing rendering of an error: status and reason phrase only.
    pub fn from_error(error: &ServeError) -> Self {
        let status = error.status();
        Self::text(status, reason_phrase(status))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Replaces any existing values of `name`.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, include_body: bool) -> io::Result<()> {
        write!(
            writer,
            "HTTP/1.1 {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        )?;
        for (name, value) in &self.headers {
            write!(writer, "{}: {}\r\n", name, value)?;
        }
        if self.header("Content-Length").is_none() && self.status != 304 {
            write!(writer, "Content-Length: {}\r\n", self.body.len())?;
        }
        writer.write_all(b"Connection: close\r\n\r\n")?;
        if include_body {
            writer.write_all(&self.body)?;
        }
        writer.flush()
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        304 => "Not Modified",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        416 => "Range Not Satisfiable",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// One link in a handler chain.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request) -> Result<Response, ServeError>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Result<Response, ServeError> + Send + Sync,
{
    fn handle(&self, request: &Request) -> Result<Response, ServeError> {
        self(request)
    }
}

/// End of every chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundHandler;

impl Handler for NotFoundHandler {
    fn handle(&self, request: &Request) -> Result<Response, ServeError> {
        Err(ServeError::NotFound {
            path: request.path.clone(),
        })
    }
}

/// Mount pattern. A trailing `*` captures the rest of the path; anything else
/// matches exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pattern: String,
}

impl Route {
    pub fn new(pattern: &str) -> Self {
        let pattern = if pattern.starts_with('/') {
            pattern.to_string()
        } else {
            format!("/{}", pattern)
        };
        Self { pattern }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Attaches this route to `request` when the path falls under it.
    pub fn bind(&self, mut request: Request) -> Option<Request> {
        let wildcard = match self.pattern.strip_suffix('*') {
            Some(prefix) => {
                if let Some(rest) = request.path.strip_prefix(prefix) {
                    Some(rest.to_string())
                } else if prefix.len() > 1 && request.path == prefix.trim_end_matches('/') {
                    Some(String::new())
                } else {
                    return None;
                }
            }
            None if request.path == self.pattern => None,
            None => return None,
        };
        request.route = self.pattern.clone();
        request.wildcard = wildcard;
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_request_line_and_headers() {
        let raw = "GET /a%20b/c.js?v=1 HTTP/1.1\r\nHost: x\r\nAccept-Encoding: gzip, br\r\n\r\n";
        let request = Request::read_from(&mut Cursor::new(raw)).unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/a%20b/c.js");
        assert_eq!(request.query.as_deref(), Some("v=1"));
        assert_eq!(request.header("accept-encoding"), Some("gzip, br"));
        assert_eq!(request.header("missing"), None);
    }

    #[test]
    fn rejects_garbage_request_line() {
        let err = Request::read_from(&mut Cursor::new("hello\r\n\r\n")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = Request::read_from(&mut Cursor::new("")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn wildcard_route_captures_remainder() {
        let route = Route::new("/static/*");
        let bound = route.bind(Request::get("/static/js/app.js")).unwrap();
        assert_eq!(bound.route, "/static/*");
        assert_eq!(bound.wildcard.as_deref(), Some("js/app.js"));

        let bound = route.bind(Request::get("/static")).unwrap();
        assert_eq!(bound.wildcard.as_deref(), Some(""));

        assert!(route.bind(Request::get("/other")).is_none());
    }

    #[test]
    fn exact_route_matches_only_itself() {
        let route = Route::new("about");
        assert_eq!(route.pattern(), "/about");
        assert!(route.bind(Request::get("/about")).unwrap().wildcard.is_none());
        assert!(route.bind(Request::get("/about/team")).is_none());
    }

    #[test]
    fn writes_status_line_and_length() {
        let mut out = Vec::new();
        Response::text(404, "Not Found")
            .write_to(&mut out, true)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.ends_with("\r\n\r\nNot Found"));
    }

    #[test]
    fn head_keeps_length_but_drops_body() {
        let mut out = Vec::new();
        Response::text(200, "hello").write_to(&mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn closures_are_handlers() {
        let handler = |request: &Request| Ok::<_, ServeError>(Response::text(200, &request.path));
        let response = handler.handle(&Request::get("/x")).unwrap();
        assert_eq!(response.body, b"/x");

        let err = NotFoundHandler.handle(&Request::get("/y")).unwrap_err();
        assert!(err.is_not_found());
    }
}
