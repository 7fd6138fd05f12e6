use uuid::Uuid;

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum RequestKind {
    /// Fetch the current USD-BRL quote, persist it and answer it as JSON
    GetQuote,

    /// Liveness check answered with the desk's counters as plain text
    Debug,
}

/// Request received by the quote server
///
/// Created by the HTTP front end (or the test harness) and consumed by a
/// [`RequestHandler`].
pub struct Request {
    kind: RequestKind,
    id: Uuid,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// Interface for handling requests, implemented by the quote desk
pub trait RequestHandler {
    /// Handle a request
    ///
    /// This method may be called concurrently from different threads, none
    /// of which belongs to an async runtime.
    fn handle(&self, request: Request);

    /// Shut the handler down
    ///
    /// This method waits for all work spawned by the handler to finish.
    fn shutdown(self);
}

/// Transport behind a [`Request`], implemented by the HTTP front end and the
/// test harness
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;

    /// Respond with an error status and message
    fn respond_with_err(self: Box<Self>, status: u16, err: String, id: Uuid);
    /// Respond with a JSON document
    fn respond_with_json(self: Box<Self>, body: String, id: Uuid);
    /// Respond with a plain string
    fn respond_with_string(self: Box<Self>, s: String, id: Uuid);
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the request id
    ///
    /// It is echoed back in the `X-Request-Id` response header.
    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the request URL
    #[inline]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Respond with an error.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_err(self, status: u16, err: impl Into<String>) {
        self.raw.respond_with_err(status, err.into(), self.id);
    }

    /// Respond with a JSON document with status 200.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_json(self, body: impl Into<String>) {
        self.raw.respond_with_json(body.into(), self.id);
    }

    /// Respond with an arbitrary string with status 200.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_string(self, s: impl Into<String>) {
        self.raw.respond_with_string(s.into(), self.id);
    }

    /// Create a new request from a [`RawRequest`]
    #[inline]
    pub fn from_raw(kind: RequestKind, id: Uuid, raw: Box<dyn RawRequest + Send>) -> Self {
        Self { kind, id, raw }
    }
}
