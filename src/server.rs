//! HTTP handler serving assets from a [`FileSystem`]
//!
//! [`AssetServer::handle`] maps one request to one response. It is
//! synchronous and holds no per-connection state, so the binary wraps it in
//! a `hyper` service and any other HTTP stack can call it the same way.
//!
//! Packed assets that are stored compressed go out as-is when the client
//! accepts the coding; otherwise they are decompressed while streaming.
//!
//! Streamed bodies read synchronously when polled. Inside a tokio runtime,
//! [`AssetBody::offload`] moves those reads to the blocking pool.

use crate::core::catalog::{truncate_to_secs, Metadata};
use crate::core::mime::MimeTable;
use crate::core::path::{clean_path, join};
use crate::core::tag::tag_of_metadata;
use crate::core::vfs::{Asset, File, FileSystem};
use crate::error::{ImbedError, Result};
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body::{Body, Frame, SizeHint};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Size of the frames produced while streaming a body
const STREAM_CHUNK: usize = 16 * 1024;

/// Frames buffered between a blocking reader and the connection
const STREAM_BACKLOG: usize = 4;

/// Fallback page picked up from the root of the filesystem
pub const DEFAULT_NOT_FOUND: &str = "404.html";

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Socket address to bind
    pub listen: String,

    /// URL path prefix under which assets are served
    pub prefix: String,

    /// Asset served with status 404 when nothing matches
    pub not_found: Option<String>,

    /// Live directory layered over the pack
    pub overlay: Option<PathBuf>,

    /// Extension → MIME overrides for live files
    pub mime_types: MimeTable,

    /// PEM certificate chain; serving over TLS needs both this and `tls_key`
    pub tls_cert: Option<PathBuf>,

    /// PEM private key
    pub tls_key: Option<PathBuf>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            listen: "127.0.0.1:8080".to_string(),
            prefix: "/".to_string(),
            not_found: None,
            overlay: None,
            mime_types: MimeTable::new(),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(mut self, addr: impl Into<String>) -> Self {
        self.listen = addr.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn not_found(mut self, path: impl Into<String>) -> Self {
        self.not_found = Some(path.into());
        self
    }

    pub fn overlay(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overlay = Some(dir.into());
        self
    }

    pub fn mime_types(mut self, table: MimeTable) -> Self {
        self.mime_types = table;
        self
    }

    pub fn tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls_cert = Some(cert.into());
        self.tls_key = Some(key.into());
        self
    }

    /// Certificate and key paths, `None` for plain HTTP
    ///
    /// Giving only one of the two is an error.
    pub fn tls_files(&self) -> Result<Option<(&Path, &Path)>> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Ok(Some((cert, key))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ImbedError::Tls("certificate given without a key".into())),
            (None, Some(_)) => Err(ImbedError::Tls("key given without a certificate".into())),
        }
    }
}

/// Response body: empty, a single buffer, or a reader drained in
/// [`STREAM_CHUNK`] frames
pub struct AssetBody {
    kind: BodyKind,
}

enum BodyKind {
    Empty,
    Full(Option<Bytes>),
    /// Read on the polling thread
    Stream(Box<dyn Read + Send>),
    /// Read on the blocking pool, frames arrive through the channel
    Offloaded(mpsc::Receiver<io::Result<Bytes>>),
}

/// Next frame of a blocking reader, `None` at the end
fn read_frame(reader: &mut dyn Read) -> Option<io::Result<Bytes>> {
    let mut buf = vec![0u8; STREAM_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return None,
            Ok(n) => {
                buf.truncate(n);
                return Some(Ok(Bytes::from(buf)));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Some(Err(e)),
        }
    }
}

/// Feed the frames of `reader` into `tx` until the end, an error, or the
/// receiving body being dropped
fn pump(mut reader: Box<dyn Read + Send>, tx: mpsc::Sender<io::Result<Bytes>>) {
    while let Some(frame) = read_frame(&mut *reader) {
        let failed = frame.is_err();
        if tx.blocking_send(frame).is_err() || failed {
            return;
        }
    }
}

impl AssetBody {
    pub fn empty() -> Self {
        AssetBody {
            kind: BodyKind::Empty,
        }
    }

    pub fn full(data: Bytes) -> Self {
        AssetBody {
            kind: BodyKind::Full(Some(data)),
        }
    }

    pub fn stream(reader: Box<dyn Read + Send>) -> Self {
        AssetBody {
            kind: BodyKind::Stream(reader),
        }
    }

    /// Move the reads of a streamed body onto tokio's blocking pool
    ///
    /// Polling the returned body only waits on a bounded channel, so it never
    /// blocks an async worker. Bodies that do not stream, and calls made
    /// outside a runtime, return the body unchanged.
    pub fn offload(self) -> Self {
        let reader = match self.kind {
            BodyKind::Stream(reader) => reader,
            kind => return AssetBody { kind },
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => return AssetBody::stream(reader),
        };
        let (tx, rx) = mpsc::channel(STREAM_BACKLOG);
        runtime.spawn_blocking(move || pump(reader, tx));
        AssetBody {
            kind: BodyKind::Offloaded(rx),
        }
    }

    /// Drain the whole body synchronously
    ///
    /// Must not be called from async code once the body is offloaded.
    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self.kind {
            BodyKind::Empty | BodyKind::Full(None) => Ok(Bytes::new()),
            BodyKind::Full(Some(data)) => Ok(data),
            BodyKind::Stream(mut reader) => {
                let mut out = Vec::new();
                reader.read_to_end(&mut out)?;
                Ok(Bytes::from(out))
            }
            BodyKind::Offloaded(mut rx) => {
                let mut out = Vec::new();
                while let Some(frame) = rx.blocking_recv() {
                    out.extend_from_slice(&frame?);
                }
                Ok(Bytes::from(out))
            }
        }
    }
}

impl std::fmt::Debug for AssetBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            BodyKind::Empty => "empty",
            BodyKind::Full(_) => "full",
            BodyKind::Stream(_) => "stream",
            BodyKind::Offloaded(_) => "offloaded",
        };
        f.debug_struct("AssetBody").field("kind", &kind).finish()
    }
}

impl Body for AssetBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<io::Result<Frame<Bytes>>>> {
        let this = self.get_mut();
        let next = match &mut this.kind {
            BodyKind::Empty => None,
            BodyKind::Full(data) => return Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            BodyKind::Stream(reader) => read_frame(&mut **reader),
            BodyKind::Offloaded(rx) => match rx.poll_recv(cx) {
                Poll::Ready(next) => next,
                Poll::Pending => return Poll::Pending,
            },
        };
        match next {
            Some(Ok(data)) => Poll::Ready(Some(Ok(Frame::data(data)))),
            Some(Err(e)) => {
                this.kind = BodyKind::Empty;
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.kind = BodyKind::Empty;
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.kind, BodyKind::Empty | BodyKind::Full(None))
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            BodyKind::Empty | BodyKind::Full(None) => SizeHint::with_exact(0),
            BodyKind::Full(Some(data)) => SizeHint::with_exact(data.len() as u64),
            BodyKind::Stream(_) | BodyKind::Offloaded(_) => SizeHint::default(),
        }
    }
}

/// Read adapter over an open virtual file
struct FileReader(Box<dyn File>);

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// What a request path resolved to
enum Resolved {
    /// Packed record and its stored bytes
    Packed(Asset),
    /// Live file seen through an overlay
    Live { path: String, meta: Metadata },
}

impl Resolved {
    fn tag(&self) -> String {
        match self {
            Resolved::Packed(asset) => asset.tag().to_string(),
            Resolved::Live { meta, .. } => tag_of_metadata(meta.size(), meta.modified()),
        }
    }

    fn modified(&self) -> SystemTime {
        match self {
            Resolved::Packed(asset) => asset.modified(),
            Resolved::Live { meta, .. } => meta.modified(),
        }
    }
}

/// Serves the contents of a [`FileSystem`] over HTTP
pub struct AssetServer {
    fs: Arc<dyn FileSystem>,
    options: ServerOptions,
}

impl AssetServer {
    /// Serve `fs` with `options`
    ///
    /// Without a configured fallback, a `404.html` at the root of `fs`
    /// becomes the not-found page.
    pub fn new(fs: Arc<dyn FileSystem>, mut options: ServerOptions) -> Self {
        if options.not_found.is_none() && fs.stat(DEFAULT_NOT_FOUND).is_ok_and(|m| m.is_file()) {
            info!("Using {} as the not-found page", DEFAULT_NOT_FOUND);
            options.not_found = Some(DEFAULT_NOT_FOUND.to_string());
        }
        AssetServer { fs, options }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Answer one request
    pub fn handle<B>(&self, req: &Request<B>) -> Response<AssetBody> {
        let method = req.method();
        if method != Method::GET && method != Method::HEAD {
            let mut resp = status_only(StatusCode::METHOD_NOT_ALLOWED);
            resp.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
            return resp;
        }

        let Some(path) = self.request_path(req.uri().path()) else {
            return status_only(StatusCode::NOT_FOUND);
        };

        let (resolved, status) = match self.resolve(&path) {
            Ok(Some(found)) => found,
            Ok(None) => {
                debug!("{} {} -> 404", method, req.uri().path());
                return status_only(StatusCode::NOT_FOUND);
            }
            Err(e) => {
                warn!("Failed to resolve {:?}: {}", path, e);
                return status_only(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        if not_modified(req.headers(), &resolved.tag(), resolved.modified()) {
            return status_only(StatusCode::NOT_MODIFIED);
        }

        match self.respond(req, &resolved, status, method == Method::HEAD) {
            Ok(resp) => {
                debug!("{} {} -> {}", method, req.uri().path(), resp.status());
                resp
            }
            Err(e) => {
                warn!("Failed to serve {:?}: {}", path, e);
                status_only(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Index path for a request path, `None` outside the prefix
    fn request_path(&self, raw: &str) -> Option<String> {
        let rest = raw.strip_prefix(self.options.prefix.as_str())?;
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let decoded = percent_decode_str(rest).decode_utf8_lossy();
        Some(clean_path(&decoded))
    }

    /// Exact file, then `index.html` inside it, then the not-found asset
    fn resolve(&self, path: &str) -> Result<Option<(Resolved, StatusCode)>> {
        for candidate in [path.to_string(), join(path, "index.html")] {
            if let Some(found) = self.lookup_file(&candidate)? {
                return Ok(Some((found, StatusCode::OK)));
            }
        }
        if let Some(fallback) = &self.options.not_found {
            if let Some(found) = self.lookup_file(&clean_path(fallback))? {
                return Ok(Some((found, StatusCode::NOT_FOUND)));
            }
        }
        Ok(None)
    }

    fn lookup_file(&self, path: &str) -> Result<Option<Resolved>> {
        if let Some(asset) = self.fs.asset(path) {
            return Ok(Some(Resolved::Packed(asset)));
        }
        match self.fs.stat(path) {
            Ok(meta) if meta.is_file() => Ok(Some(Resolved::Live {
                path: path.to_string(),
                meta,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn respond<B>(
        &self,
        req: &Request<B>,
        resolved: &Resolved,
        status: StatusCode,
        head: bool,
    ) -> Result<Response<AssetBody>> {
        let mut headers = HeaderMap::new();
        let body = match resolved {
            Resolved::Packed(asset) => {
                set_header(&mut headers, header::CONTENT_TYPE, asset.mime_type());
                match asset.compression().content_coding() {
                    Some(coding) => {
                        headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
                        if accepts_encoding(req.headers(), coding) {
                            set_header(&mut headers, header::CONTENT_ENCODING, coding);
                            set_length(&mut headers, asset.raw_bytes().len() as u64);
                            AssetBody::full(asset.stored())
                        } else if head {
                            AssetBody::empty()
                        } else {
                            AssetBody::stream(asset.reader()?)
                        }
                    }
                    None => {
                        set_length(&mut headers, asset.size());
                        AssetBody::full(asset.stored())
                    }
                }
            }
            Resolved::Live { path, meta } => {
                let mime = self.options.mime_types.lookup(path);
                set_header(&mut headers, header::CONTENT_TYPE, &mime);
                set_length(&mut headers, meta.size());
                if head {
                    AssetBody::empty()
                } else {
                    AssetBody::stream(Box::new(FileReader(self.fs.open(path)?)))
                }
            }
        };

        set_header(&mut headers, header::ETAG, &format!("\"{}\"", resolved.tag()));
        set_header(
            &mut headers,
            header::LAST_MODIFIED,
            &http_date(resolved.modified()),
        );

        let mut resp = Response::new(if head { AssetBody::empty() } else { body });
        *resp.status_mut() = status;
        *resp.headers_mut() = headers;
        Ok(resp)
    }
}

fn status_only(status: StatusCode) -> Response<AssetBody> {
    let mut resp = Response::new(AssetBody::empty());
    *resp.status_mut() = status;
    resp
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => warn!("Dropping invalid {} header value {:?}", name, value),
    }
}

fn set_length(headers: &mut HeaderMap, len: u64) {
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
}

/// Format a timestamp as an IMF-fixdate
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE).to_string()
}

/// Parse an HTTP date in any of the three formats clients send
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc).into());
    }
    // RFC 850 and asctime
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc().into())
}

/// Entity tags listed in an `If-None-Match` value, weak markers and quotes removed
fn entity_tags(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(|token| {
        let token = token.trim();
        let token = token
            .strip_prefix("W/")
            .or_else(|| token.strip_prefix("w/"))
            .unwrap_or(token);
        token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(token)
    })
}

/// Conditional GET check
///
/// `If-Modified-Since` only counts when the request has no `If-None-Match`.
fn not_modified(headers: &HeaderMap, tag: &str, modified: SystemTime) -> bool {
    if headers.contains_key(header::IF_NONE_MATCH) {
        return headers
            .get_all(header::IF_NONE_MATCH)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| entity_tags(v).any(|t| t == "*" || t == tag));
    }

    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
        .is_some_and(|since| since >= truncate_to_secs(modified))
}

/// Whether `Accept-Encoding` lists `coding` with a non-zero quality
fn accepts_encoding(headers: &HeaderMap, coding: &str) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|item| {
            let mut parts = item.split(';');
            let name = parts.next().unwrap_or("").trim();
            if !name.eq_ignore_ascii_case(coding) {
                return false;
            }
            let refused = parts.any(|param| {
                let param = param.trim();
                match param.strip_prefix("q=").or_else(|| param.strip_prefix("Q=")) {
                    Some(q) => q.trim().parse::<f32>().map(|q| q <= 0.0).unwrap_or(false),
                    None => false,
                }
            });
            !refused
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn headers(pairs: &[(HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_http_date_round_trip() {
        let t = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(t));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(t));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_entity_tags() {
        let tags: Vec<_> = entity_tags(r#""abc", W/"def" ,w/"ghi", plain"#).collect();
        assert_eq!(tags, vec!["abc", "def", "ghi", "plain"]);
    }

    #[test]
    fn test_not_modified_by_tag() {
        let t = UNIX_EPOCH;
        assert!(not_modified(&headers(&[(header::IF_NONE_MATCH, "\"x\", \"abc\"")]), "abc", t));
        assert!(!not_modified(&headers(&[(header::IF_NONE_MATCH, "\"abcd\"")]), "abc", t));
        assert!(!not_modified(&HeaderMap::new(), "abc", t));
    }

    #[test]
    fn test_tag_mismatch_ignores_date() {
        let mtime = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let both = headers(&[
            (header::IF_NONE_MATCH, "\"stale\""),
            (header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT"),
        ]);
        assert!(!not_modified(&both, "abc", mtime));
        let any = headers(&[(header::IF_NONE_MATCH, "*")]);
        assert!(not_modified(&any, "abc", mtime));
    }

    #[test]
    fn test_not_modified_by_date() {
        let mtime = UNIX_EPOCH + Duration::from_millis(784_111_777_500);
        let same = headers(&[(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT")]);
        assert!(not_modified(&same, "t", mtime));
        let earlier = headers(&[(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:36 GMT")]);
        assert!(!not_modified(&earlier, "t", mtime));
        let garbage = headers(&[(header::IF_MODIFIED_SINCE, "not a date")]);
        assert!(!not_modified(&garbage, "t", mtime));
    }

    #[test]
    fn test_accepts_encoding() {
        let h = headers(&[(header::ACCEPT_ENCODING, "deflate, gzip;q=0.8")]);
        assert!(accepts_encoding(&h, "gzip"));
        assert!(!accepts_encoding(&h, "zstd"));

        let refused = headers(&[(header::ACCEPT_ENCODING, "gzip;q=0, br")]);
        assert!(!accepts_encoding(&refused, "gzip"));

        let split = headers(&[
            (header::ACCEPT_ENCODING, "br"),
            (header::ACCEPT_ENCODING, "GZIP"),
        ]);
        assert!(accepts_encoding(&split, "gzip"));
        assert!(!accepts_encoding(&HeaderMap::new(), "gzip"));
    }

    #[test]
    fn test_body_frames() {
        let body = AssetBody::stream(Box::new(io::Cursor::new(vec![9u8; STREAM_CHUNK + 10])));
        assert_eq!(body.size_hint().exact(), None);
        assert_eq!(body.into_bytes().unwrap().len(), STREAM_CHUNK + 10);

        let full = AssetBody::full(Bytes::from_static(b"abc"));
        assert_eq!(full.size_hint().exact(), Some(3));
        assert!(!full.is_end_stream());
        assert!(AssetBody::empty().is_end_stream());
    }

    /// Reader that records the thread it was read on
    struct ThreadRecorder {
        data: io::Cursor<Vec<u8>>,
        threads: Arc<std::sync::Mutex<Vec<std::thread::ThreadId>>>,
    }

    impl Read for ThreadRecorder {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Ok(mut threads) = self.threads.lock() {
                threads.push(std::thread::current().id());
            }
            self.data.read(buf)
        }
    }

    #[tokio::test]
    async fn test_offloaded_stream_reads_off_the_runtime() {
        let threads = Arc::new(std::sync::Mutex::new(Vec::new()));
        let reader = ThreadRecorder {
            data: io::Cursor::new(vec![5u8; STREAM_CHUNK * 2 + 3]),
            threads: threads.clone(),
        };
        let mut body = AssetBody::stream(Box::new(reader)).offload();
        assert_eq!(format!("{:?}", body), "AssetBody { kind: \"offloaded\" }");

        let mut received = Vec::new();
        while let Some(frame) = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
            let data = frame.unwrap().into_data().unwrap();
            received.extend_from_slice(&data);
        }
        assert_eq!(received, vec![5u8; STREAM_CHUNK * 2 + 3]);
        assert!(body.is_end_stream());

        let runtime_thread = std::thread::current().id();
        let threads = threads.lock().unwrap();
        assert!(!threads.is_empty());
        assert!(threads.iter().all(|t| *t != runtime_thread));
    }

    #[test]
    fn test_offload_outside_runtime_keeps_stream() {
        let body = AssetBody::stream(Box::new(io::Cursor::new(vec![1u8; 10]))).offload();
        assert_eq!(format!("{:?}", body), "AssetBody { kind: \"stream\" }");
        assert_eq!(body.into_bytes().unwrap().len(), 10);

        let full = AssetBody::full(Bytes::from_static(b"xy")).offload();
        assert_eq!(full.size_hint().exact(), Some(2));
    }

    #[test]
    fn test_tls_files_need_both() {
        assert!(ServerOptions::new().tls_files().unwrap().is_none());
        let both = ServerOptions::new().tls("cert.pem", "key.pem");
        let (cert, key) = both.tls_files().unwrap().unwrap();
        assert_eq!(cert, Path::new("cert.pem"));
        assert_eq!(key, Path::new("key.pem"));

        let mut only_cert = ServerOptions::new();
        only_cert.tls_cert = Some("cert.pem".into());
        assert!(matches!(only_cert.tls_files(), Err(ImbedError::Tls(_))));
        let mut only_key = ServerOptions::new();
        only_key.tls_key = Some("key.pem".into());
        assert!(matches!(only_key.tls_files(), Err(ImbedError::Tls(_))));
    }
}
