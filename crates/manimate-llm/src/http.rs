use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
// Large document batches can take a while to embed upstream.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client shared by the hosted embedding backends: rustls, bounded timeouts, a
/// `manimate/<version>` user agent and no redirects.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn default_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("manimate/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .build()
}
