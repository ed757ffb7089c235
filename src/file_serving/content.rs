//! Writes an opened document into a response: type, validators, ranges.

use mime_guess::from_path;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::http::{reason_phrase, Request, Response};

#[derive(Debug, PartialEq, Eq)]
enum ByteRange {
    Full,
    Partial(Range<u64>),
    Unsatisfiable,
}

/// Serves `size` bytes of `content` under the display `name`.
///
/// The content type comes from `name`, so a compressed body stored as
/// `app.js.br` still goes out as JavaScript when named `app.js`.
pub fn serve_content<R: Read + Seek>(
    request: &Request,
    mut content: R,
    name: &str,
    modified: SystemTime,
    size: u64,
) -> io::Result<Response> {
    let modified = truncate_to_seconds(modified);
    let last_modified = (modified > UNIX_EPOCH).then(|| httpdate::fmt_http_date(modified));

    if let Some(last_modified) = &last_modified {
        if is_not_modified(request.header("If-Modified-Since"), modified) {
            return Ok(Response::new(304).with_header("Last-Modified", last_modified));
        }
    }

    let mime_type = from_path(name).first_or_octet_stream();
    let mut response = Response::new(200)
        .with_header("Content-Type", mime_type.as_ref())
        .with_header("Accept-Ranges", "bytes")
        .with_header("X-Content-Type-Options", "nosniff");
    if let Some(last_modified) = &last_modified {
        response.set_header("Last-Modified", last_modified);
    }

    let range = match parse_range(request.header("Range"), size) {
        ByteRange::Full => 0..size,
        ByteRange::Partial(range) => {
            response.status = 206;
            response.set_header(
                "Content-Range",
                &format!("bytes {}-{}/{}", range.start, range.end - 1, size),
            );
            range
        }
        ByteRange::Unsatisfiable => {
            log::debug!("Unsatisfiable range for {} ({} bytes)", name, size);
            return Ok(Response::text(416, reason_phrase(416))
                .with_header("Content-Range", &format!("bytes */{}", size)));
        }
    };

    let len = range.end - range.start;
    if request.is_head() {
        response.set_header("Content-Length", &len.to_string());
        return Ok(response);
    }

    content.seek(SeekFrom::Start(range.start))?;
    let mut body = Vec::with_capacity(len as usize);
    content.take(len).read_to_end(&mut body)?;
    response.set_header("Content-Length", &body.len().to_string());
    response.body = body;
    Ok(response)
}

fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn is_not_modified(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    match if_modified_since.map(|h| httpdate::parse_http_date(h.trim())) {
        Some(Ok(since)) => modified <= since,
        _ => false,
    }
}

/// Single `bytes=` ranges only; anything else is served in full.
fn parse_range(header: Option<&str>, size: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let Ok(suffix) = end.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial(size - suffix.min(size)..size);
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    if start >= size {
        return ByteRange::Unsatisfiable;
    }
    let last = if end.is_empty() {
        size - 1
    } else {
        match end.parse::<u64>() {
            Ok(last) if last >= start => last.min(size - 1),
            _ => return ByteRange::Full,
        }
    };
    ByteRange::Partial(start..last + 1)
}
