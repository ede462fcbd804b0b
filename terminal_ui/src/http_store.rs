//! [`RemoteStore`] backed by the document server's HTTP API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use sahabat_shared::{Document, DocumentId, Fields, NewDocument, RemoteStore, StoreError};
use url::Url;

#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base: Url,
}

impl HttpStore {
    pub fn new(base: Url) -> Self {
        Self::with_client(base, Client::new())
    }

    pub fn with_client(base: Url, client: Client) -> Self {
        Self { client, base }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn documents_url(&self, collection: &str) -> Result<Url, StoreError> {
        self.url(&["collections", collection, "documents"])
    }

    fn document_url(&self, collection: &str, id: &DocumentId) -> Result<Url, StoreError> {
        self.url(&["collections", collection, "documents", id.as_str()])
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

async fn success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn add_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        let response = self
            .client
            .post(self.documents_url(collection)?)
            .json(&fields)
            .send()
            .await
            .map_err(transport)?;
        let created: NewDocument = success(response).await?.json().await.map_err(transport)?;
        Ok(created.id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let response = self
            .client
            .get(self.documents_url(collection)?)
            .send()
            .await
            .map_err(transport)?;
        success(response).await?.json().await.map_err(transport)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.document_url(collection, id)?)
            .json(&fields)
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.clone(),
            });
        }
        success(response).await?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.document_url(collection, id)?)
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        success(response).await?;
        Ok(())
    }
}
