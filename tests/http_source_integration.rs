use axum::{extract::Query, http::StatusCode, response::Json, routing::get, Router};
use salesboard::filter::FilterSpec;
use salesboard::pipeline::{self, ReportOptions};
use salesboard::record::sales;
use salesboard::source::{HttpSource, RecordSource, Region, SalesQuery};
use salesboard::{PipelineError, UnavailableReason};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn products() -> Value {
    json!([
        {"Produto": "Mesa", "Categoria do Produto": "moveis", "Preço": 100.0, "Frete": 10.0,
         "Data da Compra": "01/01/2022", "Vendedor": "Ana", "Local da compra": "SP",
         "Avaliação da compra": 5, "Tipo de pagamento": "boleto", "Quantidade de parcelas": 1,
         "lat": -22.19, "lon": -48.79},
        {"Produto": "Cadeira", "Categoria do Produto": "moveis", "Preço": 200.0, "Frete": 12.0,
         "Data da Compra": "15/01/2022", "Vendedor": "Bia", "Local da compra": "SP",
         "Avaliação da compra": 4, "Tipo de pagamento": "cartao_credito", "Quantidade de parcelas": 3,
         "lat": -22.19, "lon": -48.79},
        {"Produto": "Fone", "Categoria do Produto": "eletronicos", "Preço": 300.0, "Frete": 5.0,
         "Data da Compra": "03/03/2022", "Vendedor": "Ana", "Local da compra": "SP",
         "Avaliação da compra": 3, "Tipo de pagamento": "boleto", "Quantidade de parcelas": 1,
         "lat": -22.19, "lon": -48.79},
        {"Produto": "Livro", "Categoria do Produto": "livros", "Preço": 50.0, "Frete": 3.0,
         "Data da Compra": "10/02/2022", "Vendedor": "Caio", "Local da compra": "RJ",
         "Avaliação da compra": 5, "Tipo de pagamento": "pix", "Quantidade de parcelas": 1,
         "lat": -22.25, "lon": -42.66},
        {"Produto": "Livro", "Categoria do Produto": "livros", "Preço": 50.0, "Frete": 3.0,
         "Data da Compra": "11/02/2022", "Vendedor": "Caio", "Local da compra": "RJ",
         "Avaliação da compra": 2, "Tipo de pagamento": "pix", "Quantidade de parcelas": 1,
         "lat": -22.25, "lon": -42.66}
    ])
}

/// Serve `app` on an ephemeral port and return its base URL
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_end_to_end_sales_report() {
    let base = spawn_server(Router::new().route("/produtos", get(|| async { Json(products()) }))).await;
    let source = HttpSource::new(format!("{base}/produtos"), Duration::from_secs(5)).unwrap();

    let report = pipeline::run_sales(&source, &FilterSpec::new(), &ReportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.totals.count, 5);
    assert_eq!(report.totals.revenue, 700.0);
    assert_eq!(report.by_location[0].location, "SP");
    assert_eq!(report.by_location[0].revenue, 600.0);
    assert_eq!(report.by_location[1].location, "RJ");
    assert_eq!(report.by_location[1].revenue, 100.0);
    assert_eq!(report.monthly.len(), 3);
    assert_eq!(report.monthly[1].month, "February");
    assert_eq!(report.monthly[1].revenue, 100.0);
    assert_eq!(report.by_category[0].key, "moveis");
}

#[tokio::test]
async fn test_query_parameters_are_sent() {
    let seen: Arc<std::sync::Mutex<Option<HashMap<String, String>>>> = Arc::default();
    let captured = seen.clone();
    let app = Router::new().route(
        "/produtos",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(params);
                Json(json!([]))
            }
        }),
    );
    let base = spawn_server(app).await;

    let source = HttpSource::new(format!("{base}/produtos"), Duration::from_secs(5))
        .unwrap()
        .with_query(SalesQuery {
            region: Region::Nordeste,
            year: Some(2021),
        });
    assert!(source.load().await.unwrap().is_empty());

    let params = seen.lock().unwrap().clone().unwrap();
    assert_eq!(params.get("regiao").map(String::as_str), Some("nordeste"));
    assert_eq!(params.get("ano").map(String::as_str), Some("2021"));
}

#[tokio::test]
async fn test_error_status_is_source_unavailable() {
    let app = Router::new().route(
        "/produtos",
        get(|| async { (StatusCode::NOT_FOUND, "gone") }),
    );
    let base = spawn_server(app).await;
    let source = HttpSource::new(format!("{base}/produtos"), Duration::from_secs(5)).unwrap();

    let result = pipeline::run_sales(&source, &FilterSpec::new(), &ReportOptions::default()).await;
    assert!(matches!(
        result,
        Err(PipelineError::SourceUnavailable {
            reason: UnavailableReason::Status(404),
            ..
        })
    ));
}

#[tokio::test]
async fn test_client_error_is_not_retried_whatever_the_url() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/connection/produtos",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::NOT_FOUND
            }
        }),
    );
    let base = spawn_server(app).await;
    let source = HttpSource::new(format!("{base}/connection/produtos"), Duration::from_secs(5))
        .unwrap()
        .with_retry(3, Duration::from_millis(5));

    let err = source.load().await.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_is_source_unavailable() {
    let app = Router::new().route(
        "/produtos",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(products())
        }),
    );
    let base = spawn_server(app).await;
    let source = HttpSource::new(format!("{base}/produtos"), Duration::from_millis(100)).unwrap();

    match source.load().await {
        Err(PipelineError::SourceUnavailable {
            reason: UnavailableReason::Timeout,
            message,
        }) => assert!(message.contains("timed out")),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_recovers_from_server_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/produtos",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StatusCode::SERVICE_UNAVAILABLE)
                } else {
                    Ok(Json(products()))
                }
            }
        }),
    );
    let base = spawn_server(app).await;
    let source = HttpSource::new(format!("{base}/produtos"), Duration::from_secs(5))
        .unwrap()
        .with_retry(2, Duration::from_millis(10));

    let records = source.load().await.unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_body_fails_before_aggregation() {
    let app = Router::new().route(
        "/produtos",
        get(|| async { Json(json!([{"Local da compra": "SP", "Preço": "caro", "lat": 0, "lon": 0}])) }),
    );
    let base = spawn_server(app).await;
    let source = HttpSource::new(format!("{base}/produtos"), Duration::from_secs(5)).unwrap();

    let result = pipeline::run_sales(&source, &FilterSpec::new(), &ReportOptions::default()).await;
    match result {
        Err(PipelineError::MalformedRecord { field }) => assert_eq!(field, sales::PRICE),
        other => panic!("expected malformed record, got {:?}", other),
    }
}
