use mockito::{Matcher, Server};
use scriptorium_config::Endpoint;
use scriptorium_index::{EngineClient, EngineDocument, EngineRequest, Error, HttpEngineClient};
use serde_json::json;
use std::time::Duration;

fn endpoint(host_with_port: &str) -> Endpoint {
    let (host, port) = host_with_port.split_once(':').unwrap();
    Endpoint {
        scheme: "http".into(),
        host: host.into(),
        port: Some(port.parse().unwrap()),
        path: "/solr/core/".into(),
        timeout: Duration::from_secs(5),
    }
}

fn client(server: &Server) -> HttpEngineClient {
    HttpEngineClient::new(&endpoint(&server.host_with_port())).unwrap()
}

fn error_body(status: u16, msg: &str) -> String {
    json!({"responseHeader": {"status": status}, "error": {"msg": msg, "code": status}}).to_string()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_succeeds_on_ok_status() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/solr/core/admin/ping")
        .match_query(Matcher::UrlEncoded("wt".into(), "json".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"responseHeader":{"status":0},"status":"OK"}"#)
        .create_async()
        .await;

    client(&server).ping().await?;
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn ping_with_other_status_is_unavailable() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/solr/core/admin/ping")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"DISABLED"}"#)
        .create_async()
        .await;

    let err = client(&server).ping().await.unwrap_err();
    assert!(err.is_service_unavailable());
    Ok(())
}

#[tokio::test]
async fn update_posts_document_array() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/solr/core/update")
        .match_query(Matcher::UrlEncoded("wt".into(), "json".into()))
        .match_body(Matcher::Json(json!([{"id": "1", "title": "A"}])))
        .with_header("content-type", "application/json")
        .with_body(r#"{"responseHeader":{"status":0,"QTime":3}}"#)
        .create_async()
        .await;

    let mut doc = EngineDocument::new();
    doc.insert("id".into(), json!("1"));
    doc.insert("title".into(), json!("A"));
    let response = client(&server)
        .execute(EngineRequest::Update {
            documents: vec![doc],
        })
        .await?;

    assert_eq!(response.status, 200);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn delete_commit_and_rollback_bodies() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let ok = r#"{"responseHeader":{"status":0}}"#;
    let mut mocks = Vec::new();
    for body in [
        json!({"delete": ["3", "4"]}),
        json!({"delete": {"query": "*:*"}}),
        json!({"commit": {}}),
        json!({"rollback": {}}),
    ] {
        mocks.push(
            server
                .mock("POST", "/solr/core/update")
                .match_query(Matcher::Any)
                .match_body(Matcher::Json(body))
                .with_body(ok)
                .create_async()
                .await,
        );
    }

    let client = client(&server);
    client.execute(EngineRequest::DeleteById { ids: vec![3, 4] }).await?;
    client
        .execute(EngineRequest::DeleteByQuery {
            query: "*:*".into(),
        })
        .await?;
    client.execute(EngineRequest::Commit).await?;
    client.execute(EngineRequest::Rollback).await?;

    for mock in mocks {
        mock.assert_async().await;
    }
    Ok(())
}

#[tokio::test]
async fn extract_sends_file_body() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/solr/core/update/extract")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("extractOnly".into(), "true".into()),
            Matcher::UrlEncoded("resource.name".into(), "a b.pdf".into()),
        ]))
        .match_header("content-type", "application/pdf")
        .match_body("%PDF")
        .with_body(r#"{"a b.pdf":"text","a b.pdf_metadata":[]}"#)
        .create_async()
        .await;

    let response = client(&server)
        .execute(EngineRequest::Extract {
            file_name: "a b.pdf".into(),
            content_type: "application/pdf".into(),
            body: b"%PDF".to_vec(),
        })
        .await?;

    assert_eq!(response.body["a b.pdf"], json!("text"));
    mock.assert_async().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

async fn select_error(status: usize) -> Error {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/solr/core/select")
        .match_query(Matcher::Any)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(error_body(status as u16, "something went wrong"))
        .create_async()
        .await;

    client(&server)
        .execute(EngineRequest::Select {
            params: vec![("q".into(), "*:*".into())],
        })
        .await
        .unwrap_err()
}

#[tokio::test]
async fn bad_request_is_an_invalid_query() -> anyhow::Result<()> {
    let err = select_error(400).await;
    assert!(matches!(err, Error::InvalidQuery(ref msg) if msg == "something went wrong"));
    Ok(())
}

#[tokio::test]
async fn missing_core_and_server_errors_are_unavailable() -> anyhow::Result<()> {
    assert!(select_error(404).await.is_service_unavailable());
    assert!(select_error(503).await.is_service_unavailable());
    Ok(())
}

#[tokio::test]
async fn other_statuses_are_engine_errors() -> anyhow::Result<()> {
    let err = select_error(409).await;
    assert!(matches!(err, Error::Engine { status: 409, .. }));
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_unavailable() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?.to_string();
    drop(listener);

    let client = HttpEngineClient::new(&endpoint(&address))?;
    let err = client.execute(EngineRequest::Commit).await.unwrap_err();
    assert!(err.is_service_unavailable());
    Ok(())
}
