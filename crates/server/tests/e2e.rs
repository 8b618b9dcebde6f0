use std::net::SocketAddr;

use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

use configs::AppConfig;

struct TestApp {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_server() -> anyhow::Result<TestApp> {
    let mut cfg = AppConfig::default();
    cfg.database.url = std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    cfg.database.min_connections = 1;
    cfg.payment.webhook_secret = "whsec_e2e".into();

    let app = server::build_app(cfg).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async {
            let _ = rx.await;
        };
        if let Err(e) = server::serve(listener, app, shutdown).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, shutdown: Some(tx) })
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = start_server().await?;
    let res = reqwest::get(format!("{}/health", app.base_url)).await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn e2e_member_books_course() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = start_server().await?;
    let client = reqwest::Client::new();
    let base = &app.base_url;

    let tenant: Value = client.post(format!("{base}/tenants")).json(&json!({"name": "Riverside Club"})).send().await?.json().await?;
    let tid = tenant["id"].as_str().unwrap_or_default();

    let phone = format!("137{:08}", Uuid::new_v4().as_u128() % 100_000_000);
    let res = client
        .post(format!("{base}/tenants/{tid}/members"))
        .header("x-actor", "e2e")
        .json(&json!({"phone": phone, "name": "Zhou Min", "initial_days": 7}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let member: Value = res.json().await?;

    let res = client
        .post(format!("{base}/tenants/{tid}/members"))
        .json(&json!({"phone": "13000000000", "name": "No Key", "id_card": "110101199001011234"}))
        .send()
        .await?;
    // no PII key configured
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);

    let course: Value = client
        .post(format!("{base}/tenants/{tid}/courses"))
        .json(&json!({"name": "Evening Pilates", "starts_at": "2031-05-01T18:30:00Z", "max_capacity": 12}))
        .send()
        .await?
        .json()
        .await?;
    let cid = course["id"].as_str().unwrap_or_default();

    let res = client
        .post(format!("{base}/courses/{cid}/bookings"))
        .json(&json!({"member_id": member["id"]}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);

    let bookings: Value = client.get(format!("{base}/members/{}/bookings", member["id"].as_str().unwrap_or_default())).send().await?.json().await?;
    assert_eq!(bookings.as_array().map(Vec::len), Some(1));
    assert_eq!(bookings[0]["status"], "confirmed");

    let res = client.get(format!("{base}/members/{}", Uuid::new_v4())).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    let err: Value = res.json().await?;
    assert_eq!(err["error"], "Not Found");
    Ok(())
}
