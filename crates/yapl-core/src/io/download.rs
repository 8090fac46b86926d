//! Single-GET HTTP access: streaming archive bodies and small text probes.

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;

use crate::io::extract::Source;

/// Name of the build stamp published next to a runtime archive.
pub const BUILD_ID_FILE: &str = "BUILD_ID.txt";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared HTTP client with the crate's user agent.
pub fn client() -> Result<Client, FetchError> {
    Ok(Client::builder().user_agent(crate::USER_AGENT).build()?)
}

/// Issue one GET and expose the body as a buffered async reader.
///
/// Non-2xx responses fail before any body bytes are read.
pub async fn open_remote(
    client: &Client,
    url: &str,
) -> Result<impl AsyncBufRead + Unpin + Send + use<>, FetchError> {
    let response = client.get(url).send().await?.error_for_status()?;
    let stream = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(std::io::Error::other));
    Ok(StreamReader::new(Box::pin(stream)))
}

/// Read a small text resource: one GET for remote sources, a file read otherwise.
pub async fn fetch_text(client: &Client, source: &Source) -> Result<String, FetchError> {
    match source {
        Source::Remote(url) => {
            let text = client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            Ok(text)
        }
        Source::Local(path) => Ok(tokio::fs::read_to_string(path).await?),
    }
}

/// Location of `file` published in the same directory as `source`.
///
/// `https://host/a/b/runtime.tar.xz` becomes `https://host/a/b/<file>`; query
/// strings on the archive URL are dropped.
pub fn sibling(source: &Source, file: &str) -> Source {
    match source {
        Source::Remote(url) => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            let base = path.rsplit_once('/').map_or(path, |(base, _)| base);
            Source::Remote(format!("{base}/{file}"))
        }
        Source::Local(path) => Source::Local(path.with_file_name(file)),
    }
}

/// Fetch the trimmed `BUILD_ID.txt` published next to `source`.
pub async fn fetch_build_id(client: &Client, source: &Source) -> Result<String, FetchError> {
    let location = sibling(source, BUILD_ID_FILE);
    tracing::debug!("Fetching build stamp from {location}");
    let text = fetch_text(client, &location).await?;
    Ok(text.trim().to_string())
}
