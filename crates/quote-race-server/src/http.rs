//! 🏗 HTTP request implementation

use std::io::Read;

use quote_race_core::RequestKind;
use tiny_http::{Header, Response};
use uuid::Uuid;

struct HTTPRequest(tiny_http::Request);

impl quote_race_core::RawRequest for HTTPRequest {
    fn url(&self) -> &str {
        self.0.url()
    }

    fn respond_with_err(self: Box<Self>, status: u16, err: String, id: Uuid) {
        self.respond(Response::from_string(err).with_status_code(status), id)
    }

    fn respond_with_json(self: Box<Self>, body: String, id: Uuid) {
        // `from_data` sets no Content-Type of its own
        let mut res = Response::from_data(body.into_bytes()).with_status_code(200);
        add_header(&mut res, b"Content-Type", b"application/json");
        self.respond(res, id)
    }

    fn respond_with_string(self: Box<Self>, s: String, id: Uuid) {
        self.respond(Response::from_string(s).with_status_code(200), id)
    }
}

impl HTTPRequest {
    /// Add HTTP headers (CORS, X-Request-Id) to `res` and send it
    fn respond<R: Read>(self, mut res: Response<R>, id: Uuid) {
        add_response_cors_headers(&mut res);
        add_header(
            &mut res,
            b"X-Request-Id",
            id.hyphenated().to_string().as_bytes(),
        );
        send(self.0, res);
    }
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error message.
pub fn parse(rq: tiny_http::Request) -> Option<quote_race_core::Request> {
    use tiny_http::Method::*;

    let kind = match (rq.method(), rq.url()) {
        (Options, _) => {
            let mut res = Response::empty(204);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
        (Get, "/cotacao") => RequestKind::GetQuote,
        (Get, "/debug") => RequestKind::Debug,
        (Get, _) => {
            let mut res = Response::from_string(
                "🦀 could not find the service you are looking for!

Valid requests are:
  GET  /cotacao
  GET  /debug",
            )
            .with_status_code(404);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
        _ => {
            let mut res = Response::empty(405);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
    };

    let id = rq
        .headers()
        .iter()
        .find(|hdr| hdr.field.equiv("x-request-id"))
        .and_then(|hdr| Uuid::parse_str(hdr.value.as_str()).ok())
        .unwrap_or_else(Uuid::new_v4);

    Some(quote_race_core::Request::from_raw(
        kind,
        id,
        Box::new(HTTPRequest(rq)),
    ))
}

/// Send `res`; a client that went away is only worth a log line
fn send<R: Read>(rq: tiny_http::Request, res: Response<R>) {
    if let Err(err) = rq.respond(res) {
        tracing::warn!(%err, "HTTP response failed");
    }
}

fn add_header<R: Read>(res: &mut Response<R>, field: &[u8], value: &[u8]) {
    match Header::from_bytes(field, value) {
        Ok(header) => res.add_header(header),
        Err(()) => tracing::warn!(
            field = %String::from_utf8_lossy(field),
            "dropping invalid response header"
        ),
    }
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    add_header(res, b"Access-Control-Request-Method", b"*");
    add_header(res, b"Access-Control-Allow-Origin", b"*");
    add_header(res, b"Access-Control-Allow-Headers", b"*");
    add_header(res, b"Access-Control-Expose-Headers", b"*");
}
