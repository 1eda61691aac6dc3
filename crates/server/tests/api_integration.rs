use std::{collections::HashMap, net::SocketAddr, time::Duration};

use api::ApiState;
use axum::serve;
use feed::FeedClient;
use mockito::{Matcher, Server, ServerGuard};
use reqwest::StatusCode;
use serde_json::{Value, json};
use server::{API_VERSION, router};
use tokio::{
    net::{TcpListener, TcpStream},
    time::{Instant, sleep},
};
use url::Url;
use warehouse::ConnectionProvider;

const TEST_KEY: &str = include_str!("../../warehouse/testdata/test_key.pem");

async fn spawn_server(
    warehouse_url: &str,
    feed_url: &str,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let store = HashMap::from([
        ("WAREHOUSE_USER".to_owned(), "dashboard".to_owned()),
        ("WAREHOUSE_ACCOUNT".to_owned(), "acme-eu1".to_owned()),
        ("WAREHOUSE_PRIVATE_KEY".to_owned(), TEST_KEY.to_owned()),
        ("WAREHOUSE_DATABASE".to_owned(), "analytics".to_owned()),
    ]);
    let reader =
        ConnectionProvider::new(store).open(Url::parse(warehouse_url).unwrap()).unwrap();
    let feed = FeedClient::with_base_url("test-key".to_owned(), Url::parse(feed_url).unwrap());
    let allowed = config::DEFAULT_ALLOWED_ORIGINS.split(',').map(|s| s.to_owned()).collect();
    let app = router(ApiState::new(reader, feed), allowed);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        serve(listener, app.into_make_service()).await.unwrap();
    });
    (addr, handle)
}

async fn wait_for_server(addr: SocketAddr) {
    let start = Instant::now();
    loop {
        if TcpStream::connect(addr).await.is_ok() {
            break;
        }
        if start.elapsed() > Duration::from_secs(5) {
            panic!("server did not start in time");
        }
        sleep(Duration::from_millis(10)).await;
    }
}

async fn warehouse_mock(server: &mut ServerGuard, marker: &str, data: Value) -> mockito::Mock {
    server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("database".into(), "analytics".into()),
            Matcher::Regex(marker.to_owned()),
        ]))
        .with_status(200)
        .with_body(json!({ "meta": [], "data": data }).to_string())
        .create_async()
        .await
}

async fn get_json(addr: SocketAddr, path: &str) -> (StatusCode, Value) {
    let resp = reqwest::get(format!("http://{addr}/{API_VERSION}{path}")).await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

fn ys(series: &Value) -> Vec<f64> {
    series["points"].as_array().unwrap().iter().map(|p| p["y"].as_f64().unwrap()).collect()
}

#[tokio::test]
async fn cohort_view_derives_active_users_and_growth() {
    let mut warehouse = Server::new_async().await;
    let mock = warehouse_mock(
        &mut warehouse,
        "first_seen\\+AS",
        json!([
            {"date": "2024-01-01", "new_users": "10", "total_users": "10"},
            {"date": "2024-02-01", "new_users": "4", "total_users": "9"},
            {"date": "2024-03-01", "new_users": "1", "total_users": null}
        ]),
    )
    .await;
    let (addr, server) = spawn_server(&warehouse.url(), "http://127.0.0.1:1").await;
    wait_for_server(addr).await;

    let (status, body) = get_json(addr, "/views/user-cohort?granularity=month").await;
    assert_eq!(status, StatusCode::OK);
    mock.assert_async().await;

    let stacked = &body["charts"][0];
    assert_eq!(stacked["title"], "Number of Swappers Over Time");
    assert_eq!(stacked["stacked"], true);
    assert_eq!(ys(&stacked["series"][0]), vec![0.0, 5.0, 0.0]);
    assert_eq!(ys(&body["charts"][1]["series"][0]), vec![10.0, 14.0, 15.0]);

    server.abort();
}

#[tokio::test]
async fn flow_view_scales_edges_against_heaviest_flow() {
    let mut warehouse = Server::new_async().await;
    warehouse_mock(
        &mut warehouse,
        "AS\\+swapper_count",
        json!([
            {"source_chain": "arbitrum", "destination_chain": "base", "swap_volume": 2500.0, "swap_count": "40", "swapper_count": "20"},
            {"source_chain": "base", "destination_chain": "arbitrum", "swap_volume": 100.0, "swap_count": "2", "swapper_count": "1"},
            {"source_chain": null, "destination_chain": "base", "swap_volume": null, "swap_count": "4", "swapper_count": "2"}
        ]),
    )
    .await;
    let (addr, server) = spawn_server(&warehouse.url(), "http://127.0.0.1:1").await;
    wait_for_server(addr).await;

    let (status, body) = get_json(addr, "/views/chain-flow").await;
    assert_eq!(status, StatusCode::OK);
    let charts = body["charts"].as_array().unwrap();
    assert_eq!(charts.len(), 3);
    let by_swappers = &charts[0];
    assert_eq!(by_swappers["chart"], "flow_graph");
    assert_eq!(by_swappers["nodes"].as_array().unwrap().len(), 3);
    for edge in by_swappers["edges"].as_array().unwrap() {
        let width = edge["width"].as_f64().unwrap();
        assert!((1.0..=10.0).contains(&width));
        if edge["weight"] == 20.0 {
            assert_eq!(width, 10.0);
        }
    }
    for node in by_swappers["nodes"].as_array().unwrap() {
        assert!(node["x"].as_f64().unwrap().abs() <= 1.0 + 1e-9);
    }
    assert!(by_swappers["nodes"].as_array().unwrap().iter().any(|n| n["id"] == "unknown"));

    server.abort();
}

#[tokio::test]
async fn dashboard_over_empty_warehouse() {
    let mut warehouse = Server::new_async().await;
    warehouse_mock(&mut warehouse, "SELECT", json!([])).await;
    let (addr, server) = spawn_server(&warehouse.url(), "http://127.0.0.1:1").await;
    wait_for_server(addr).await;

    let (status, body) =
        get_json(addr, "/dashboard?granularity=week&start_date=2024-01-01&end_date=2024-06-30")
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["filters"],
        json!({"granularity": "week", "start_date": "2024-01-01", "end_date": "2024-06-30"})
    );
    let rows = body["rows"].as_array().unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r["section"]["id"].as_str().unwrap()).collect();
    assert_eq!(
        ids,
        vec![
            "kpi",
            "time-series",
            "user-cohort",
            "chain-flow",
            "source-ranking",
            "destination-ranking"
        ]
    );
    for row in rows {
        assert_eq!(row["section"]["errors"], json!([]));
    }
    assert_eq!(rows[0]["section"]["charts"][1]["value"], 0.0);
    assert_eq!(rows[0]["section"]["charts"][0]["value"], Value::Null);

    server.abort();
}

#[tokio::test]
async fn nft_rows_come_from_the_feed() {
    let mut feed = Server::new_async().await;
    feed.mock("GET", Matcher::Regex("^/query/\\d+/results$".into()))
        .match_header("x-dune-api-key", "test-key")
        .with_status(200)
        .with_body(
            json!({
                "result": {
                    "metadata": {"column_names": ["Date", "Total Minters", "Total NFTs Minted", "Number of NFT Minted", "Total Number of NFT Minted", "Value of NFTs Minted", "Total Value of NFTs Minted"]},
                    "rows": [
                        {"Date": "2024-08-16", "Total Minters": 7, "Total NFTs Minted": 9, "Number of NFT Minted": 9, "Total Number of NFT Minted": 9, "Value of NFTs Minted": 18.0, "Total Value of NFTs Minted": 18.0}
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    let (addr, server) = spawn_server("http://127.0.0.1:1", &feed.url()).await;
    wait_for_server(addr).await;

    let (status, body) = get_json(addr, "/nft").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    for row in rows {
        assert_eq!(row["section"]["errors"], json!([]));
    }
    let cards = rows[0]["section"]["charts"].as_array().unwrap();
    assert_eq!(cards[0]["value"], 7.0);
    assert_eq!(cards[2]["value"], 18.0);
    let table = &rows[2]["section"]["charts"][0];
    assert_eq!(table["chart"], "table");
    assert_eq!(table["columns"][0], "#");
    assert_eq!(table["rows"][0][0], 1);

    server.abort();
}
