//! HTTP front end: routes terminal clients to an animation stream and
//! everything else to a redirect.
//!
//! One thread per connection; sessions share only the frame cache and the
//! read-only configuration.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tiny_http::{HTTPVersion, Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, info_span, warn};

use crate::animation::{AnimationLoop, CancelToken, SystemClock};
use crate::config::StreamConfig;
use crate::error::ServerError;
use crate::loader::FrameStore;
use crate::sink::{Framing, HttpBodyWriter};
use crate::{transform, ColorCycler, ColorPalette};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const NO_CACHE: &str = "no-cache, no-transform";

/// What to do with an incoming request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// Send a 302 to this location
    Redirect(&'a str),
    /// Stream the animation, reversed when `flip` is set
    Stream { flip: bool },
    /// `HEAD` from a terminal client: the stream's status line and headers only
    StreamHead,
    /// Anything but `GET` or `HEAD`
    MethodNotAllowed,
}

/// Whether a client should get the animation stream.
///
/// Clients without a User-Agent are treated as terminals, as are those whose
/// User-Agent contains one of `terminal_agents`.
pub fn should_stream<S: AsRef<str>>(user_agent: Option<&str>, terminal_agents: &[S]) -> bool {
    match user_agent {
        None => true,
        Some(ua) if ua.is_empty() => true,
        Some(ua) => terminal_agents.iter().any(|agent| ua.contains(agent.as_ref())),
    }
}

/// Whether the request URL asks for reversed frames (`?flip=true`, any case).
pub fn flip_requested(url: &str) -> bool {
    let Some((_, query)) = url.split_once('?') else {
        return false;
    };
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "flip")
        .is_some_and(|(_, value)| value.eq_ignore_ascii_case("true"))
}

pub fn route<'a>(
    config: &'a StreamConfig,
    method: &Method,
    user_agent: Option<&str>,
    url: &str,
) -> Route<'a> {
    let head_only = match method {
        Method::Get => false,
        Method::Head => true,
        _ => return Route::MethodNotAllowed,
    };
    if !should_stream(user_agent, config.terminal_agents.as_slice()) {
        Route::Redirect(&config.redirect_url)
    } else if head_only {
        Route::StreamHead
    } else {
        Route::Stream {
            flip: flip_requested(url),
        }
    }
}

/// Cancellation tokens of live sessions, keyed by session id.
#[derive(Clone, Debug, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<u64, CancelToken>>>,
    next_id: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new session until the returned guard is dropped.
    pub fn register(&self) -> SessionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new();
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, token.clone());
        SessionGuard {
            id,
            token,
            registry: self.clone(),
        }
    }

    pub fn cancel_all(&self) {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        for token in sessions.values() {
            token.cancel();
        }
    }

    pub fn active(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn remove(&self, id: u64) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Registration of one live session.
#[derive(Debug)]
pub struct SessionGuard {
    id: u64,
    token: CancelToken,
    registry: SessionRegistry,
}

impl SessionGuard {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

struct ServerState {
    config: StreamConfig,
    palette: ColorPalette,
    store: FrameStore,
    sessions: SessionRegistry,
    shutdown: AtomicBool,
}

/// Blocking HTTP server for animation streams.
pub struct StreamServer {
    http: Arc<Server>,
    state: Arc<ServerState>,
}

impl StreamServer {
    /// Bind `config.bind`, serving frames from the configured directories.
    pub fn bind(config: StreamConfig) -> Result<Self, ServerError> {
        let store = FrameStore::new(config.frames.source());
        Self::with_store(config, store)
    }

    /// Bind `config.bind`, serving frames from `store`.
    pub fn with_store(config: StreamConfig, store: FrameStore) -> Result<Self, ServerError> {
        config.validate()?;
        let palette = config.palette()?;
        let http = Server::http(config.bind.as_str()).map_err(|e| ServerError::Bind {
            addr: config.bind.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http: Arc::new(http),
            state: Arc::new(ServerState {
                config,
                palette,
                store,
                sessions: SessionRegistry::new(),
                shutdown: AtomicBool::new(false),
            }),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.server_addr().to_ip()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            http: self.http.clone(),
            state: self.state.clone(),
        }
    }

    /// Accept connections until shut down.
    pub fn run(&self) {
        if let Some(addr) = self.local_addr() {
            info!(%addr, "listening");
        }

        for request in self.http.incoming_requests() {
            if self.state.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let state = self.state.clone();
            thread::spawn(move || handle_request(&state, request));
        }

        info!("server stopped");
    }
}

/// Stops a running [`StreamServer`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    http: Arc<Server>,
    state: Arc<ServerState>,
}

impl ShutdownHandle {
    /// Stop accepting connections and cancel every live stream.
    pub fn shutdown(&self) {
        self.state.shutdown.store(true, Ordering::SeqCst);
        self.state.sessions.cancel_all();
        self.http.unblock();
    }

    pub fn active_sessions(&self) -> usize {
        self.state.sessions.active()
    }
}

fn handle_request(state: &ServerState, request: Request) {
    let user_agent = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("User-Agent"))
        .map(|h| h.value.as_str());

    match route(&state.config, request.method(), user_agent, request.url()) {
        Route::Redirect(location) => respond_redirect(request, location),
        Route::Stream { flip } => stream(state, request, flip),
        Route::StreamHead => respond_stream_head(request),
        Route::MethodNotAllowed => respond_method_not_allowed(request),
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn respond_redirect(request: Request, location: &str) {
    debug!(url = request.url(), "redirecting browser client");
    let headers = header("Location", location).into_iter().collect();
    let response = Response::new(StatusCode(302), headers, Cursor::new(Vec::new()), Some(0), None);
    if let Err(err) = request.respond(response) {
        debug!(error = %err, "failed to send redirect");
    }
}

fn respond_method_not_allowed(request: Request) {
    debug!(method = %request.method(), "method not allowed");
    let body = b"Method Not Allowed".to_vec();
    let len = body.len();
    let headers = [header("Content-Type", TEXT_PLAIN), header("Allow", "GET, HEAD")]
        .into_iter()
        .flatten()
        .collect();
    let response = Response::new(StatusCode(405), headers, Cursor::new(body), Some(len), None);
    if let Err(err) = request.respond(response) {
        debug!(error = %err, "failed to send error response");
    }
}

fn respond_stream_head(request: Request) {
    let framing = framing_for(request.http_version());
    let mut writer = request.into_writer();
    if let Err(err) = write_stream_head(&mut writer, framing) {
        debug!(error = %err, "failed to send stream head");
    }
}

fn framing_for(version: &HTTPVersion) -> Framing {
    if *version == HTTPVersion(1, 0) {
        Framing::Raw
    } else {
        Framing::Chunked
    }
}

fn respond_no_frames(request: Request) {
    warn!("frame set is empty");
    let body = b"No frames available".to_vec();
    let len = body.len();
    let headers = header("Content-Type", TEXT_PLAIN).into_iter().collect();
    let response = Response::new(StatusCode(500), headers, Cursor::new(body), Some(len), None);
    if let Err(err) = request.respond(response) {
        debug!(error = %err, "failed to send error response");
    }
}

/// Write the status line and headers of a streaming response.
pub fn write_stream_head<W: Write + ?Sized>(w: &mut W, framing: Framing) -> std::io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {TEXT_PLAIN}\r\nCache-Control: {NO_CACHE}\r\n"
    );
    if framing == Framing::Chunked {
        head.push_str("Transfer-Encoding: chunked\r\n");
    }
    head.push_str("Connection: close\r\n\r\n");
    w.write_all(head.as_bytes())?;
    w.flush()
}

fn stream(state: &ServerState, request: Request, flip: bool) {
    let cached = state.store.load();
    let frames = if flip {
        transform::reverse(cached)
    } else {
        cached.clone()
    };
    if frames.is_empty() {
        respond_no_frames(request);
        return;
    }

    let framing = framing_for(request.http_version());
    let remote = request.remote_addr().copied();

    let session = state.sessions.register();
    let span = info_span!("stream", id = session.id(), ?remote, flip);
    let _enter = span.enter();

    let mut writer = request.into_writer();
    if let Err(err) = write_stream_head(&mut writer, framing) {
        debug!(error = %err, "client went away before the stream started");
        return;
    }
    info!(frames = frames.len(), "stream started");

    let mut sink = HttpBodyWriter::new(writer, framing);
    let cycler = ColorCycler::new(state.palette.clone());
    AnimationLoop::new(frames, cycler, state.config.timing()).run(
        &mut sink,
        &SystemClock::new(),
        session.token(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_stream() {
        let agents = ["curl"];
        assert!(should_stream(None, &agents));
        assert!(should_stream(Some(""), &agents));
        assert!(should_stream(Some("curl/8.5.0"), &agents));
        assert!(!should_stream(Some("Mozilla/5.0 (X11; Linux x86_64)"), &agents));
        assert!(!should_stream(Some("Wget/1.21"), &agents));
        assert!(should_stream(Some("Wget/1.21"), &["curl", "Wget"]));
    }

    #[test]
    fn test_flip_requested() {
        assert!(flip_requested("/?flip=true"));
        assert!(flip_requested("/?flip=TRUE"));
        assert!(flip_requested("/anything?x=1&flip=True"));
        assert!(!flip_requested("/"));
        assert!(!flip_requested("/?flip=false"));
        assert!(!flip_requested("/?flip=1"));
        assert!(!flip_requested("/?flip"));
        assert!(!flip_requested("/?flipped=true"));
        // First occurrence wins.
        assert!(!flip_requested("/?flip=no&flip=true"));
    }

    #[test]
    fn test_route() {
        let config = StreamConfig::default();
        assert_eq!(
            route(&config, &Method::Get, Some("Mozilla/5.0"), "/?flip=true"),
            Route::Redirect("https://github.com/ArneshRC/Vi")
        );
        assert_eq!(
            route(&config, &Method::Get, Some("curl/8.0"), "/?flip=true"),
            Route::Stream { flip: true }
        );
        assert_eq!(
            route(&config, &Method::Get, None, "/"),
            Route::Stream { flip: false }
        );
    }

    #[test]
    fn test_route_by_method() {
        let config = StreamConfig::default();
        assert_eq!(
            route(&config, &Method::Head, Some("curl/8"), "/?flip=true"),
            Route::StreamHead
        );
        assert_eq!(
            route(&config, &Method::Head, Some("Mozilla/5.0"), "/"),
            Route::Redirect("https://github.com/ArneshRC/Vi")
        );
        for method in [Method::Post, Method::Put, Method::Delete, Method::Options] {
            assert_eq!(
                route(&config, &method, Some("curl/8"), "/"),
                Route::MethodNotAllowed
            );
        }
    }

    #[test]
    fn test_framing_for_version() {
        assert_eq!(framing_for(&HTTPVersion(1, 0)), Framing::Raw);
        assert_eq!(framing_for(&HTTPVersion(1, 1)), Framing::Chunked);
    }

    #[test]
    fn test_stream_head() {
        let mut out = Vec::new();
        write_stream_head(&mut out, Framing::Chunked).unwrap();
        let head = String::from_utf8(out).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(head.contains("Cache-Control: no-cache, no-transform\r\n"));
        assert!(head.contains("Transfer-Encoding: chunked\r\n"));
        assert!(head.ends_with("\r\n\r\n"));

        let mut raw = Vec::new();
        write_stream_head(&mut raw, Framing::Raw).unwrap();
        assert!(!String::from_utf8(raw).unwrap().contains("Transfer-Encoding"));
    }

    #[test]
    fn test_registry_tracks_sessions() {
        let registry = SessionRegistry::new();
        let a = registry.register();
        let b = registry.register();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.active(), 2);

        registry.cancel_all();
        assert!(a.token().is_cancelled());
        assert!(b.token().is_cancelled());

        drop(a);
        assert_eq!(registry.active(), 1);
        drop(b);
        assert_eq!(registry.active(), 0);
    }
}
