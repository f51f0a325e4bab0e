use power_network_rust::{build_app, EngineSettings, MemoryStore};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    async fn spawn() -> Self {
        let settings = EngineSettings {
            tariff_per_kwh: Some(0.2),
            ..EngineSettings::default()
        };
        let app = build_app(MemoryStore::new(), settings);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{}", address),
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    async fn post_ok(&self, path: &str, json: Value) -> Value {
        let response = self.post(path, json).await;
        assert_eq!(response.status(), StatusCode::OK, "POST {}", path);
        response.json().await.unwrap()
    }

    async fn get_ok(&self, path: &str) -> Value {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {}", path);
        response.json().await.unwrap()
    }
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

/// grid -> MDB (main) -> DB-1 (sub), with a lighting load on DB-1
async fn build_small_network(client: &TestClient) -> (String, String, String, String) {
    let source = client
        .post_ok(
            "/powersources",
            json!({"name": "Grid", "source_type": "grid", "voltage": "380", "total_ampacity": 250.0}),
        )
        .await;
    let source_id = id_of(&source);

    let mdb = client
        .post_ok(
            &format!("/powersources/{}/panels", source_id),
            json!({"name": "MDB", "ampacity": 250.0}),
        )
        .await;
    let mdb_id = id_of(&mdb);
    assert_eq!(mdb["panel_type"], "main");

    let db = client
        .post_ok(
            &format!("/panels/{}/child_panels", mdb_id),
            json!({"name": "DB-1", "ampacity": 63.0}),
        )
        .await;
    let db_id = id_of(&db);
    assert_eq!(db["panel_type"], "sub");

    let circuit = client
        .post_ok(
            &format!("/panels/{}/breakers", db_id),
            json!({"name": "Lights", "rated_current": 16.0, "poles": 1, "position": 1}),
        )
        .await;
    let load = client
        .post_ok(
            &format!("/circuitbreakers/{}/loads", id_of(&circuit)),
            json!({
                "name": "Hall Lights",
                "load_type": "lighting",
                "ampacity": 9.5,
                "power_consumption": 2000.0,
                "estimated_usage_hours": 5.0
            }),
        )
        .await;
    assert_eq!(load["panel"].as_str(), Some(db_id.as_str()));

    (source_id, mdb_id, db_id, id_of(&load))
}

#[tokio::test]
async fn test_build_network_and_derived_figures() {
    let client = TestClient::spawn().await;
    let (_source_id, mdb_id, db_id, load_id) = build_small_network(&client).await;

    let health = client.get_ok("/health").await;
    assert_eq!(health["status"], "healthy");

    let path = client.get_ok(&format!("/panels/{}/full_path", db_id)).await;
    assert_eq!(path["path"], json!(["Grid", "MDB", "DB-1"]));

    let total = client.get_ok(&format!("/panels/{}/total_load", mdb_id)).await;
    assert_eq!(total["total_ampacity"], 9.5);
    assert_eq!(total["load_count"], 1);

    let details = client.get_ok(&format!("/loads/{}/details", load_id)).await;
    assert_eq!(details["total_path"], "Grid → MDB → DB-1 → Hall Lights");
    assert_eq!(details["voltage"], "380");
    assert_eq!(details["daily_consumption_kwh"], 10.0);
    assert_eq!(details["monthly_consumption_kwh"], 300.0);
    assert_eq!(details["monthly_cost"], 60.0);

    let children = client
        .get_ok(&format!("/panels/{}/all_child_panels", mdb_id))
        .await;
    assert_eq!(children["total"], 1);
}

#[tokio::test]
async fn test_feed_cycle_is_rejected() {
    let client = TestClient::spawn().await;
    let (_source_id, mdb_id, _db_id, _load_id) = build_small_network(&client).await;

    let upstream = client
        .post_ok(
            &format!("/panels/{}/breakers", mdb_id),
            json!({"name": "Upstream", "rated_current": 100.0, "position": 1}),
        )
        .await;
    let downstream = client
        .post_ok(
            &format!("/panels/{}/breakers", mdb_id),
            json!({"name": "Downstream", "rated_current": 63.0, "position": 2}),
        )
        .await;

    let response = client
        .put(
            &format!("/circuitbreakers/{}/feeding_breakers", id_of(&downstream)),
            json!({"feeding_breakers": [id_of(&upstream)]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put(
            &format!("/circuitbreakers/{}/feeding_breakers", id_of(&upstream)),
            json!({"feeding_breakers": [id_of(&downstream)]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("loop"));

    // The rejected change left the upstream breaker untouched
    let feeders = client
        .get_ok(&format!("/circuitbreakers/{}/feeding_breakers", id_of(&upstream)))
        .await;
    assert_eq!(feeders["total"], 0);

    let fed = client
        .get_ok(&format!("/circuitbreakers/{}/fed_breakers", id_of(&upstream)))
        .await;
    assert_eq!(fed["items"][0]["id"], id_of(&downstream));
}

#[tokio::test]
async fn test_sub_panel_cannot_adopt_children() {
    let client = TestClient::spawn().await;
    let (_source_id, _mdb_id, db_id, _load_id) = build_small_network(&client).await;

    let response = client
        .post(
            &format!("/panels/{}/child_panels", db_id),
            json!({"name": "DB-1A", "ampacity": 32.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let promoted = client
        .post_ok(
            &format!("/panels/{}/set_type", db_id),
            json!({"panel_type": "sub_main"}),
        )
        .await;
    assert_eq!(promoted["panel_type"], "sub_main");

    let response = client
        .post(
            &format!("/panels/{}/child_panels", db_id),
            json!({"name": "DB-1A", "ampacity": 32.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_ids_and_cascading_delete() {
    let client = TestClient::spawn().await;
    let (source_id, _mdb_id, db_id, load_id) = build_small_network(&client).await;

    let response = client.get("/panels/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.delete(&format!("/powersources/{}", source_id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        client.get(&format!("/panels/{}", db_id)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.get(&format!("/loads/{}", load_id)).await.status(),
        StatusCode::NOT_FOUND
    );

    let panels = client.get_ok("/panels").await;
    assert_eq!(panels["total"], 0);
}
