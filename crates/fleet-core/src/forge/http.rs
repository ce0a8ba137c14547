//! HTTP plumbing shared by the forge clients

use std::time::Duration;

use fleet_git::NetworkKind;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::{Error, ErrorKind, Result};

/// Upper bound on pages fetched for one listing.
pub(super) const MAX_PAGES: u32 = 1000;

static USER_AGENT: &str = concat!("fleet", "/", env!("CARGO_PKG_VERSION"));

pub(super) fn client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::with_source(ErrorKind::Process, "failed to build HTTP client", e))
}

/// Read a token from `var`, ignoring empty values.
pub(super) fn token_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|token| !token.trim().is_empty())
}

/// Send a GET and decode the JSON body. `Ok(None)` means 404.
pub(super) async fn get_json<T: DeserializeOwned>(
    forge: &str,
    request: RequestBuilder,
) -> Result<Option<T>> {
    let response = request.send().await.map_err(|e| transport_error(forge, e))?;
    let status = response.status();
    let url = response.url().to_string();
    tracing::debug!(forge, %url, %status, "GET");

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::network(
            NetworkKind::AuthFailed,
            format!("{forge} rejected the request to {url} ({status}); check the access token"),
        ));
    }
    if status.is_server_error() {
        return Err(Error::network(
            NetworkKind::Unreachable,
            format!("{forge} returned {status} for {url}"),
        ));
    }
    if !status.is_success() {
        return Err(Error::process(format!("{forge} returned {status} for {url}")));
    }

    let body = response
        .json::<T>()
        .await
        .map_err(|e| Error::with_source(ErrorKind::Process, format!("unexpected {forge} response from {url}"), e))?;
    Ok(Some(body))
}

fn transport_error(forge: &str, err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() {
        NetworkKind::Timeout
    } else {
        NetworkKind::Unreachable
    };
    Error::with_source(ErrorKind::Network(kind), format!("cannot reach {forge}: {err}"), err)
}
