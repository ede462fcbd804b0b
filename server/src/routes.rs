use actix_web::{delete, get, patch, post, web, HttpResponse};
use sahabat_shared::{DocumentId, Fields, MemoryStore, NewDocument, RemoteStore};

use crate::error::ApiError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(add_document)
        .service(list_documents)
        .service(update_document)
        .service(delete_document);
}

fn collection_name(name: &str) -> Result<&str, ApiError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(name)
    } else {
        Err(ApiError::InvalidCollection(name.to_string()))
    }
}

#[post("/collections/{collection}/documents")]
async fn add_document(
    store: web::Data<MemoryStore>,
    path: web::Path<String>,
    fields: web::Json<Fields>,
) -> Result<HttpResponse, ApiError> {
    let collection = collection_name(&path)?;
    let id = store.add_document(collection, fields.into_inner()).await?;
    Ok(HttpResponse::Created().json(NewDocument { id }))
}

#[get("/collections/{collection}/documents")]
async fn list_documents(
    store: web::Data<MemoryStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let collection = collection_name(&path)?;
    let documents = store.list_documents(collection).await?;
    Ok(HttpResponse::Ok().json(documents))
}

#[patch("/collections/{collection}/documents/{id}")]
async fn update_document(
    store: web::Data<MemoryStore>,
    path: web::Path<(String, String)>,
    fields: web::Json<Fields>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id) = path.into_inner();
    let collection = collection_name(&collection)?;
    store
        .update_document(collection, &DocumentId::from(id), fields.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/collections/{collection}/documents/{id}")]
async fn delete_document(
    store: web::Data<MemoryStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (collection, id) = path.into_inner();
    let collection = collection_name(&collection)?;
    store
        .delete_document(collection, &DocumentId::from(id))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use sahabat_shared::Document;
    use serde_json::{json, Value};

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(MemoryStore::new()))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn add_then_list() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/collections/todo/documents")
            .set_json(json!({ "text": "", "editable": true, "timestamp": "t0" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: NewDocument = test::read_body_json(resp).await;

        let req = test::TestRequest::get()
            .uri("/collections/todo/documents")
            .to_request();
        let documents: Vec<Document> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, created.id);
        assert_eq!(documents[0].fields["editable"], json!(true));
    }

    #[actix_web::test]
    async fn patch_merges_and_reports_missing() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/collections/inProgress/documents")
            .set_json(json!({ "text": "draft", "editable": true }))
            .to_request();
        let created: NewDocument = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/collections/inProgress/documents/{}", created.id))
            .set_json(json!({ "text": "final", "editable": false }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri("/collections/inProgress/documents")
            .to_request();
        let documents: Vec<Document> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(documents[0].fields["text"], json!("final"));

        let req = test::TestRequest::patch()
            .uri("/collections/inProgress/documents/missing")
            .set_json(json!({ "text": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap_or_default().contains("missing"));
    }

    #[actix_web::test]
    async fn delete_succeeds_even_when_absent() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/collections/done/documents")
            .set_json(json!({ "text": "shipped" }))
            .to_request();
        let created: NewDocument = test::call_and_read_body_json(&app, req).await;

        for _ in 0..2 {
            let req = test::TestRequest::delete()
                .uri(&format!("/collections/done/documents/{}", created.id))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }

        let req = test::TestRequest::get()
            .uri("/collections/done/documents")
            .to_request();
        let documents: Vec<Document> = test::call_and_read_body_json(&app, req).await;
        assert!(documents.is_empty());
    }

    #[actix_web::test]
    async fn rejects_odd_collection_names() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/collections/to%20do/documents")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[::core::prelude::v1::test]
    fn collection_names() {
        assert!(collection_name("inProgress").is_ok());
        assert!(collection_name("my_list-2").is_ok());
        assert!(collection_name("").is_err());
        assert!(collection_name("a/b").is_err());
    }
}
