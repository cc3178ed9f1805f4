//! REST client for the user record endpoints
//!
//! Used by the `users` CLI subcommands to manage records on a running server.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::{ErrorBody, MessageBody};
use crate::db::{NewUser, UserPatch, UserRecord};
use crate::{Error, Result};

/// Client for `/api/users`
#[derive(Clone)]
pub struct RecordClient {
    http: reqwest::Client,
    base: Url,
}

impl RecordClient {
    /// Create a client for the server at `server`
    ///
    /// # Errors
    ///
    /// Returns error if the URL cannot be parsed
    pub fn new(server: &str) -> Result<Self> {
        let base = Url::parse(server)
            .map_err(|e| Error::Config(format!("invalid server URL {server}: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn url(&self, id: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::Config(format!("cannot use {} as a base URL", self.base)))?;
            segments.pop_if_empty().push("api").push("users");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// List all records, newest first
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn list(&self) -> Result<Vec<UserRecord>> {
        let response = self.http.get(self.url(None)?).send().await?;
        decode(response).await
    }

    /// Fetch a single record
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no record has this id
    pub async fn get(&self, id: &str) -> Result<UserRecord> {
        let response = self.http.get(self.url(Some(id))?).send().await?;
        decode(response).await
    }

    /// Create a record
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the server rejects the payload
    pub async fn create(&self, user: &NewUser) -> Result<UserRecord> {
        let response = self.http.post(self.url(None)?).json(user).send().await?;
        decode(response).await
    }

    /// Apply a partial update
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` or `Error::Validation` on rejection
    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<UserRecord> {
        let response = self
            .http
            .put(self.url(Some(id))?)
            .json(patch)
            .send()
            .await?;
        decode(response).await
    }

    /// Delete a record, returning the server's confirmation message
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no record has this id
    pub async fn delete(&self, id: &str) -> Result<String> {
        let response = self.http.delete(self.url(Some(id))?).send().await?;
        let body: MessageBody = decode(response).await?;
        Ok(body.message)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    tracing::debug!(status = status.as_u16(), %message, "record request rejected");

    Err(match status {
        StatusCode::BAD_REQUEST => Error::Validation(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_resource_urls() {
        let client = RecordClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.url(None).unwrap().as_str(),
            "http://localhost:3000/api/users"
        );
        assert_eq!(
            client.url(Some("abc")).unwrap().as_str(),
            "http://localhost:3000/api/users/abc"
        );

        let prefixed = RecordClient::new("http://example.com/app/").unwrap();
        assert_eq!(
            prefixed.url(Some("42")).unwrap().as_str(),
            "http://example.com/app/api/users/42"
        );
    }

    #[test]
    fn rejects_invalid_base() {
        assert!(matches!(RecordClient::new("::"), Err(Error::Config(_))));
    }
}
