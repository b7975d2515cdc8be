//! End-to-end flows against a real Postgres: paging, filters, parent/child writes,
//! derived fee status, deletes and login.
//!
//! Runs only when `DATABASE_URL` is set (a `.env` file works too); otherwise it returns early.
//! All data is tagged with a per-run suffix so repeated runs against the same database don't
//! collide.

use campus_admin::app::auth::seed_break_glass;
use campus_admin::{transport, AppConfig, DatabaseService, LocalBlobStore, ModelRegistry, PgCredentialVerifier};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
struct Api {
    base_url: String,
    client: reqwest::Client,
}

impl Api {
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.call(Method::GET, path, None).await
    }

    /// Lists an entity with query parameters; reqwest handles the encoding.
    async fn list(&self, entity: &str, params: &[(&str, String)]) -> Value {
        let resp = self
            .client
            .get(format!("{}/api/{}", self.base_url, entity))
            .query(params)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap()
    }

    /// POSTs and returns `data`, asserting 201.
    async fn create(&self, entity: &str, body: Value) -> Value {
        let (status, resp) = self
            .call(Method::POST, &format!("/api/{}", entity), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create {entity}: {resp}");
        resp["data"].clone()
    }
}

fn id_of(record: &Value) -> i64 {
    record["id"].as_i64().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_api_flows() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        println!("DATABASE_URL not set; skipping test_api_flows");
        return Ok(());
    }

    let uploads = tempfile::tempdir()?;
    let config = AppConfig::from_lookup(|key| match key {
        "UPLOAD_DIR" => Some(uploads.path().display().to_string()),
        other => std::env::var(other).ok(),
    })?;

    let registry = Arc::new(ModelRegistry::with_catalog());
    let db_service = DatabaseService::new(&config).await?;
    db_service.ensure_schema(&registry).await?;
    let pool = db_service.pool().clone();

    let state = transport::http::AppState {
        db_service: Arc::new(db_service),
        model_registry: registry,
        credentials: Arc::new(PgCredentialVerifier::new(pool.clone())),
        blob_store: Arc::new(LocalBlobStore::new(
            config.upload_dir.clone(),
            config.public_base_url.clone(),
        )),
        config: Arc::new(config),
    };
    let router = transport::http::create_router(state);

    // Bind to an ephemeral port to avoid conflicts if an API server is already running.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let api = Api {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    };
    let tag = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .to_string();

    // --- fixtures ---
    let locale = api
        .create("locales", json!({ "name": format!("Campus {}", tag) }))
        .await;
    let user = api
        .create(
            "users",
            json!({
                "username": format!("clerk_{}", tag),
                "full_name": "Front Desk",
                "password": "s3cret-pass"
            }),
        )
        .await;
    assert!(user.get("password_hash").is_none(), "secret leaked: {user}");
    assert!(user.get("password").is_none());

    let consignee = api
        .create("consignees", json!({ "name": format!("Acme {}", tag) }))
        .await;
    let mut items = Vec::new();
    for n in 0..3 {
        items.push(
            api.create(
                "items",
                json!({
                    "code": format!("SKU-{}-{}", tag, n),
                    "name": format!("Item {}", n),
                    "unit_price": "2.50"
                }),
            )
            .await,
        );
    }

    // --- POST then GET returns the submitted values ---
    let student_body = json!({
        "first_name": "Ada",
        "last_name": format!("Lovelace {}", tag),
        "document_number": format!("DOC-{}", tag),
        "birth_date": "2012-12-10",
        "locale_id": id_of(&locale),
        "active": true
    });
    let student = api.create("students", student_body.clone()).await;
    let (status, fetched) = api.get(&format!("/api/students/{}", id_of(&student))).await;
    assert_eq!(status, StatusCode::OK);
    for (key, value) in student_body.as_object().unwrap() {
        assert_eq!(&fetched["data"][key], value, "field {key}");
    }
    assert!(fetched["data"]["created_at"].is_string());

    // --- ordinals are assigned in input order, whatever the client sends ---
    let order = api
        .create(
            "orders",
            json!({
                "header": {
                    "consignee_id": id_of(&consignee),
                    "user_id": id_of(&user),
                    "locale_id": id_of(&locale),
                    "order_date": "2024-05-01",
                    "notes": format!("order {}", tag)
                },
                "details": [
                    { "item_id": id_of(&items[2]), "quantity": "1", "unit_price": "2.50", "line_nbr": 9 },
                    { "item_id": id_of(&items[0]), "quantity": "2", "unit_price": "2.50", "line_nbr": 9 },
                    { "item_id": id_of(&items[1]), "quantity": "3", "unit_price": "2.50" }
                ]
            }),
        )
        .await;
    let details = order["details"].as_array().unwrap();
    let line_nbrs: Vec<i64> = details.iter().map(|d| d["line_nbr"].as_i64().unwrap()).collect();
    let detail_items: Vec<i64> = details.iter().map(|d| d["item_id"].as_i64().unwrap()).collect();
    assert_eq!(line_nbrs, vec![1, 2, 3]);
    assert_eq!(
        detail_items,
        vec![id_of(&items[2]), id_of(&items[0]), id_of(&items[1])]
    );
    assert_eq!(details[1]["quantity"], json!("2.00"));

    // PUT with a details array replaces and renumbers.
    let (status, updated) = api
        .call(
            Method::PUT,
            &format!("/api/orders/{}", id_of(&order)),
            Some(json!({
                "status": "shipped",
                "details": [ { "item_id": id_of(&items[1]), "quantity": "5", "unit_price": "2.00" } ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["data"]["status"], json!("shipped"));
    assert_eq!(updated["data"]["details"].as_array().unwrap().len(), 1);
    assert_eq!(updated["data"]["details"][0]["line_nbr"], json!(1));

    // --- a missing referenced item rolls back the header too ---
    let orphan_note = format!("orphan {}", tag);
    let (status, body) = api
        .call(
            Method::POST,
            "/api/orders",
            Some(json!({
                "consignee_id": id_of(&consignee),
                "user_id": id_of(&user),
                "locale_id": id_of(&locale),
                "order_date": "2024-05-02",
                "notes": orphan_note,
                "details": [
                    { "item_id": id_of(&items[0]), "quantity": "1", "unit_price": "1.00" },
                    { "item_id": 999_999_999_999i64, "quantity": "1", "unit_price": "1.00" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("details[1].item_id 999999999999 does not exist in items")
    );
    let listed = api.list("orders", &[("notes", orphan_note.clone())]).await;
    assert_eq!(listed["data"]["pagination"]["total"], json!(0));

    // --- a failing insert after the header and first detail rolls everything back ---
    let details_before: i64 = sqlx::query_scalar("SELECT count(*) FROM order_details")
        .fetch_one(&pool)
        .await?;
    let partial_note = format!("partial {}", tag);
    let (status, body) = api
        .call(
            Method::POST,
            "/api/orders",
            Some(json!({
                "consignee_id": id_of(&consignee),
                "user_id": id_of(&user),
                "locale_id": id_of(&locale),
                "order_date": "2024-05-02",
                "notes": partial_note,
                "details": [
                    { "item_id": id_of(&items[0]), "quantity": "1", "unit_price": "1.00" },
                    { "item_id": id_of(&items[1]), "quantity": "0", "unit_price": "1.00" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(
        body["error"],
        json!("Value violates check constraint 'order_details_quantity_check'")
    );
    let listed = api.list("orders", &[("notes", partial_note.clone())]).await;
    assert_eq!(listed["data"]["pagination"]["total"], json!(0));
    let details_after: i64 = sqlx::query_scalar("SELECT count(*) FROM order_details")
        .fetch_one(&pool)
        .await?;
    assert_eq!(details_after, details_before);

    // --- payments drive the fee paid flag ---
    let fee = api
        .create(
            "fees",
            json!({ "student_id": id_of(&student), "description": "Tuition", "amount": "100.00" }),
        )
        .await;
    assert_eq!(fee["paid"], json!(false));

    let first = api
        .create(
            "payments",
            json!({ "fee_id": id_of(&fee), "amount": "60.00", "paid_on": "2024-05-03" }),
        )
        .await;
    assert_eq!(first["fee_status"]["paid"], json!(false));
    assert_eq!(first["fee_status"]["paid_total"], json!("60.00"));
    assert_eq!(first["fee_status"]["remaining_amount"], json!("40.00"));

    let second = api
        .create(
            "payments",
            json!({ "fee_id": id_of(&fee), "amount": "40.00", "paid_on": "2024-05-04" }),
        )
        .await;
    assert_eq!(second["fee_status"]["paid"], json!(true));
    assert_eq!(second["fee_status"]["remaining_amount"], json!("0.00"));

    let (_, fee_now) = api.get(&format!("/api/fees/{}", id_of(&fee))).await;
    assert_eq!(fee_now["data"]["paid"], json!(true));

    let (_, paid_fees) = api
        .get(&format!("/api/fees?student_id={}&paid=true", id_of(&student)))
        .await;
    assert_eq!(paid_fees["data"]["pagination"]["total"], json!(1));

    let (status, deleted) = api
        .call(Method::DELETE, &format!("/api/payments/{}", id_of(&second)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"]["fee_status"]["paid"], json!(false));
    let (_, fee_now) = api.get(&format!("/api/fees/{}", id_of(&fee))).await;
    assert_eq!(fee_now["data"]["paid"], json!(false));

    // Raising the fee amount reopens it; lowering it closes it.
    let (_, lowered) = api
        .call(
            Method::PUT,
            &format!("/api/fees/{}", id_of(&fee)),
            Some(json!({ "amount": "60.00" })),
        )
        .await;
    assert_eq!(lowered["data"]["paid"], json!(true));

    // --- concurrent payments on one fee serialize on the fee row ---
    let shared_fee = api
        .create(
            "fees",
            json!({ "student_id": id_of(&student), "description": "Trip", "amount": "100.00" }),
        )
        .await;
    let mut handles = Vec::new();
    for day in 1..=10 {
        let api = api.clone();
        let fee_id = id_of(&shared_fee);
        handles.push(tokio::spawn(async move {
            api.call(
                Method::POST,
                "/api/payments",
                Some(json!({
                    "fee_id": fee_id,
                    "amount": "10.00",
                    "paid_on": format!("2024-06-{:02}", day)
                })),
            )
            .await
        }));
    }
    let mut saw_paid = 0;
    for handle in handles {
        let (status, body) = handle.await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        if body["data"]["fee_status"]["paid"] == json!(true) {
            saw_paid += 1;
        }
    }
    // Only the payment that completed the total observes the flip.
    assert_eq!(saw_paid, 1);
    let (_, shared_now) = api.get(&format!("/api/fees/{}", id_of(&shared_fee))).await;
    assert_eq!(shared_now["data"]["paid"], json!(true));

    // --- paging: rows <= limit and total is the unpaginated count ---
    let marker = format!("Pager {}", tag);
    let mut pager_ids = Vec::new();
    for n in 0..3 {
        let c = api
            .create("consignees", json!({ "name": format!("{} #{}", marker, n) }))
            .await;
        pager_ids.push(id_of(&c));
    }
    let base = vec![("name", marker.clone()), ("limit", "2".to_string())];
    let with = |extra: &[(&'static str, String)]| {
        let mut params = base.clone();
        params.extend_from_slice(extra);
        params
    };
    let page1 = api.list("consignees", &base).await;
    assert_eq!(page1["data"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(page1["data"]["pagination"]["total"], json!(3));
    assert_eq!(page1["data"]["pagination"]["total_pages"], json!(2));

    let page2 = api.list("consignees", &with(&[("page", "2".to_string())])).await;
    assert_eq!(page2["data"]["rows"].as_array().unwrap().len(), 1);
    assert_eq!(page2["data"]["pagination"]["total"], json!(3));

    let desc = api
        .list(
            "consignees",
            &with(&[("sortBy", "id".to_string()), ("sortOrder", "desc".to_string())]),
        )
        .await;
    assert_eq!(desc["data"]["rows"][0]["id"], json!(pager_ids[2]));

    // Adding a filter never grows the total.
    let narrowed = api
        .list("consignees", &with(&[("id", pager_ids[0].to_string())]))
        .await;
    assert_eq!(narrowed["data"]["pagination"]["total"], json!(1));

    let (_, set) = api
        .get(&format!(
            "/api/payments?fee_id={}&method=cash,card",
            id_of(&fee)
        ))
        .await;
    assert_eq!(set["data"]["pagination"]["total"], json!(0));

    // --- deletes ---
    let (status, body) = api
        .call(Method::DELETE, "/api/consignees/999999999999", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = api
        .call(Method::DELETE, &format!("/api/locales/{}", id_of(&locale)), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = api
        .call(
            Method::POST,
            "/api/items",
            Some(json!({ "code": format!("SKU-{}-0", tag), "name": "dup", "unit_price": "1.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = api
        .call(Method::DELETE, &format!("/api/orders/{}", id_of(&order)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = api.get(&format!("/api/orders/{}", id_of(&order))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // --- login ---
    let (status, body) = api
        .call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": format!("clerk_{}", tag), "password": "s3cret-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"], json!(id_of(&user)));

    let (status, _) = api
        .call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": format!("clerk_{}", tag), "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let break_glass = format!("bg_{}", tag);
    seed_break_glass(&pool, &break_glass, "emergency").await?;
    let (status, body) = api
        .call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": break_glass, "password": "emergency" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["is_break_glass"], json!(true));

    server_handle.abort();
    Ok(())
}
