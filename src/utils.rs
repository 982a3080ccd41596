use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::error::FetchError;

pub fn build_http_client() -> Result<Client> {
    let user_agent = format!("sublink/{}", env!("CARGO_PKG_VERSION"));
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

/// Sends the request and returns the body of a successful response.
pub async fn fetch_text(request: RequestBuilder, url: &str) -> Result<String, FetchError> {
    let res = request.send().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;
    let status = res.status();
    let text = res.text().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
            body: text,
        });
    }
    Ok(text)
}

pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, FetchError> {
    let text = fetch_text(request, url).await?;
    serde_json::from_str(&text).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Accepts `12` as well as `"12"`; upstreams aren't consistent about it.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
#[cfg(test)]
pub(crate) async fn serve_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}
