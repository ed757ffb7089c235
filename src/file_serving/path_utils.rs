use percent_encoding::percent_decode_str;

use crate::config::StaticConfig;
use crate::error::ServeError;
use crate::http::Request;

/// Maps a request onto a `/`-rooted document name inside the mount.
///
/// The name is always produced by [`clean_path`], so no `..` survives and the
/// filesystem never sees anything above its root.
pub fn document_path(request: &Request, config: &StaticConfig) -> Result<String, ServeError> {
    // Wildcard mounts resolve the capture, not the prefix they are mounted under.
    let raw = match &request.wildcard {
        Some(capture) if request.route.ends_with('*') => capture.as_str(),
        _ => request.path.as_str(),
    };

    let unescaped = unescape_path(raw)?;
    let mut name = clean_path(&format!("/{}", unescaped));
    log::trace!("Cleaned {:?} to {}", raw, name);

    if config.ignore_base {
        name = strip_route_base(&name, &request.route, &unescaped);
    }

    if name == "/" {
        name = join_path("/", &config.index);
    }
    Ok(name)
}

/// Percent-decodes a path, refusing truncated or non-hex escapes and bytes
/// that are not UTF-8.
pub fn unescape_path(raw: &str) -> Result<String, ServeError> {
    let malformed = || ServeError::MalformedPath {
        path: raw.to_string(),
    };

    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(malformed());
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| malformed())?;
    if decoded.contains('\0') {
        return Err(malformed());
    }
    Ok(decoded.into_owned())
}

/// Lexically resolves `.`, `..` and repeated separators; the result is rooted
/// and has no trailing slash (except `/` itself).
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

pub fn join_path(dir: &str, name: &str) -> String {
    clean_path(&format!("{}/{}", dir, name))
}

/// Last segment of a cleaned path; empty for `/`.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn last_segment(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Drops the trailing segment of `name` once when it repeats the route's own
/// last segment, so `/static` can serve a root without a `static/` folder.
/// Only the final route segment is compared, never a longer prefix.
fn strip_route_base(name: &str, route: &str, unescaped: &str) -> String {
    let route_base = last_segment(route.trim_end_matches(&['/', '*'][..]));
    match (route_base, last_segment(unescaped)) {
        (Some(route_base), Some(url_base)) if route_base == url_base => {
            match name.rsplit_once('/') {
                Some((parent, last)) if last == route_base => {
                    log::debug!("Dropping repeated base {:?} from {}", route_base, name);
                    clean_path(parent)
                }
                _ => name.to_string(),
            }
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Route;

    fn mounted(route: &str, target: &str) -> Request {
        Route::new(route).bind(Request::get(target)).unwrap()
    }

    #[test]
    fn clean_path_resolves_dots_and_separators() {
        assert_eq!(clean_path("/a/./b//c/"), "/a/b/c");
        assert_eq!(clean_path("/a/b/../c"), "/a/c");
        assert_eq!(clean_path("//"), "/");
        assert_eq!(clean_path(""), "/");
    }

    #[test]
    fn traversal_never_leaves_root() {
        let config = StaticConfig::default();
        for target in [
            "/../../etc/passwd",
            "/a/../../../etc/passwd",
            "/..%2f..%2fetc/passwd",
            "/%2e%2e/%2e%2e/etc/passwd",
            "/./../.././etc//passwd",
        ] {
            let name = document_path(&mounted("/*", target), &config).unwrap();
            assert_eq!(name, "/etc/passwd", "{}", target);
        }

        let name = document_path(&mounted("/*", "/../.."), &config).unwrap();
        assert_eq!(name, "/index.html");
    }

    #[test]
    fn malformed_escapes_are_client_errors() {
        let config = StaticConfig::default();
        for target in ["/a%zz", "/a%4", "/%", "/%ff%fe", "/a%00b"] {
            let err = document_path(&mounted("/*", target), &config).unwrap_err();
            assert!(matches!(err, ServeError::MalformedPath { .. }), "{}", target);
        }
    }

    #[test]
    fn unescapes_valid_sequences() {
        assert_eq!(unescape_path("/a%20b/%C3%A9").unwrap(), "/a b/é");
        assert_eq!(unescape_path("/plain").unwrap(), "/plain");
    }

    #[test]
    fn root_becomes_index() {
        let config = StaticConfig {
            index: "home.html".into(),
            ..StaticConfig::default()
        };
        assert_eq!(document_path(&mounted("/*", "/"), &config).unwrap(), "/home.html");
        assert_eq!(document_path(&mounted("/*", "/./"), &config).unwrap(), "/home.html");
    }

    #[test]
    fn wildcard_mount_uses_capture_only() {
        let config = StaticConfig::default();
        let request = mounted("/static/*", "/static/js/app.js");
        assert_eq!(document_path(&request, &config).unwrap(), "/js/app.js");

        let request = mounted("/static/*", "/static/");
        assert_eq!(document_path(&request, &config).unwrap(), "/index.html");
    }

    #[test]
    fn exact_mount_uses_full_path() {
        let config = StaticConfig::default();
        let request = mounted("/docs/guide.html", "/docs/guide.html");
        assert_eq!(document_path(&request, &config).unwrap(), "/docs/guide.html");
    }

    #[test]
    fn ignore_base_drops_repeated_segment() {
        let config = StaticConfig {
            ignore_base: true,
            ..StaticConfig::default()
        };
        let request = mounted("/static", "/static");
        assert_eq!(document_path(&request, &config).unwrap(), "/index.html");

        let request = mounted("/static/*", "/static/css/static");
        assert_eq!(document_path(&request, &config).unwrap(), "/css");

        let request = mounted("/static/*", "/static/css/site.css");
        assert_eq!(document_path(&request, &config).unwrap(), "/css/site.css");
    }

    #[test]
    fn ignore_base_off_keeps_segment() {
        let config = StaticConfig::default();
        let request = mounted("/static/*", "/static/css/static");
        assert_eq!(document_path(&request, &config).unwrap(), "/css/static");
    }

    #[test]
    fn base_name_of_paths() {
        assert_eq!(base_name("/a/b.txt"), "b.txt");
        assert_eq!(base_name("/index.html"), "index.html");
        assert_eq!(base_name("/"), "");
    }
}
