use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Shorthand for a duration in milliseconds
#[allow(unused)]
pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Start a mock server answering GET `route` with `status` and `body` after
/// `delay`
#[allow(unused)]
pub async fn serve(route: &str, status: u16, body: &str, delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}
