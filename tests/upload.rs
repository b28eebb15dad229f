//! Statement upload over HTTP: multipart handling, summary, and the resulting positions.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use tokio::sync::RwLock;
use trade_journal::api::routes::{AppState, UserStore, app_router};
use trade_journal::journal::{Journal, SharedJournal, TradeFilter};

const TOS_STATEMENT: &str = "Account Statement for 123456789\n\
\n\
Account Trade History\n\
,Exec Time,Spread,Side,Qty,Pos Effect,Symbol,Exp,Strike,Type,Price,Net Price,Order Type\n\
,01/15/24 09:31:02,STOCK,BUY,+10,TO OPEN,AAPL,,,STOCK,100.00,100.00,LMT\n\
,01/15/24 15:02:11,STOCK,SELL,-10,TO CLOSE,AAPL,,,STOCK,120.00,120.00,LMT\n\
,01/16/24 10:00:00,STOCK,BUY,+4,TO OPEN,MSFT,,,STOCK,400.00,400.00,LMT\n\
\n";

fn test_app_state() -> (AppState, SharedJournal) {
    let journal = Journal::new().shared();
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = AppState {
        journal: journal.clone(),
        jwt_secret: b"test-jwt-secret".to_vec(),
        user_store,
        db: None,
    };
    (state, journal)
}

async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

/// Register and log in a fresh user, returning the bearer token.
async fn login(client: &reqwest::Client, base_url: &str, username: &str) -> String {
    let creds = serde_json::json!({ "username": username, "password": "pw" });
    let reg = client
        .post(format!("{}/auth/register", base_url))
        .json(&creds)
        .send()
        .await
        .unwrap();
    assert_eq!(reg.status().as_u16(), 201);
    let json: serde_json::Value = client
        .post(format!("{}/auth/login", base_url))
        .json(&creds)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    json["token"].as_str().unwrap().to_string()
}

fn statement_form(platform: Option<&str>, body: Option<&str>) -> Form {
    let mut form = Form::new();
    if let Some(platform) = platform {
        form = form.text("platform", platform.to_string());
    }
    if let Some(body) = body {
        form = form.part(
            "file",
            Part::bytes(body.as_bytes().to_vec()).file_name("statement.csv"),
        );
    }
    form
}

async fn upload(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    form: Form,
) -> reqwest::Response {
    client
        .post(format!("{}/api/dashboard/upload-statement", base_url))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn upload_thinkorswim_returns_summary_and_stores_positions() {
    let (state, _journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "alice").await;

    let res = upload(
        &client,
        &base_url,
        &token,
        statement_form(Some("thinkorswim"), Some(TOS_STATEMENT)),
    )
    .await;

    assert_eq!(res.status().as_u16(), 200);
    let summary: serde_json::Value = res.json().await.unwrap();
    assert_eq!(summary["num_executions"], 3);
    assert_eq!(summary["trades_added"], 3);
    assert_eq!(summary["new_positions"], 2);
    assert_eq!(summary["closed_positions"], 1);
    assert_eq!(summary["open_positions"], 1);
    assert_eq!(summary["day_trades"], 1);
    assert_eq!(summary["swing_trades"], 0);
    assert_eq!(summary["pnl_by_symbol"]["AAPL"].as_f64(), Some(200.0));
    assert_eq!(summary["symbols"], serde_json::json!(["AAPL", "MSFT"]));

    let positions: serde_json::Value = client
        .get(format!("{}/api/trades/positions", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(positions["total_count"], 2);
    let list = positions["positions"].as_array().unwrap();
    assert_eq!(list[0]["symbol"], "MSFT");
    assert_eq!(list[0]["status"], "OPEN");
    assert_eq!(list[1]["symbol"], "AAPL");
    assert_eq!(list[1]["status"], "CLOSED");
    assert_eq!(list[1]["pnl"].as_f64(), Some(200.0));

    let aapl_id = list[1]["id"].as_str().unwrap();
    let detail: serde_json::Value = client
        .get(format!("{}/api/trades/positions/{}", base_url, aapl_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["trades_count"], 2);
    assert!(
        detail["trades"]
            .as_array()
            .unwrap()
            .iter()
            .all(|t| t["trading_type"] == "Day")
    );
}

#[tokio::test]
async fn upload_robinhood_ignores_option_rows() {
    let (state, journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "bob").await;
    let statement = "Activity Date,Process Date,Settle Date,Instrument,Description,Trans Code,Quantity,Price,Amount\n\
03/04/2024,03/04/2024,03/06/2024,AAPL,AAPL Call,BTO,1,$2.50,($250.00)\n\
03/04/2024,03/04/2024,03/06/2024,AAPL,Apple,Buy,5,$170.00,($850.00)\n";

    let res = upload(
        &client,
        &base_url,
        &token,
        statement_form(Some("Robinhood"), Some(statement)),
    )
    .await;

    assert_eq!(res.status().as_u16(), 200);
    let summary: serde_json::Value = res.json().await.unwrap();
    assert_eq!(summary["num_executions"], 1);
    assert_eq!(summary["open_positions"], 1);

    let trades: serde_json::Value = client
        .get(format!("{}/api/trades", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let trades = trades["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["ticker_symbol"], "AAPL");
    assert_eq!(trades[0]["status"], "OPEN");
    assert_eq!(trades[0]["shares_remaining"].as_f64(), Some(5.0));

    let user_id = uuid::Uuid::parse_str(trades[0]["user_id"].as_str().unwrap()).unwrap();
    let stored = journal.read().await.trades_for_user(user_id, &TradeFilter::default());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].position_id.as_deref(), trades[0]["position_id"].as_str());
}

#[tokio::test]
async fn upload_rejects_unsupported_platform() {
    let (state, _journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "carol").await;

    let res = upload(
        &client,
        &base_url,
        &token,
        statement_form(Some("etrade"), Some(TOS_STATEMENT)),
    )
    .await;

    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("etrade"));
}

#[tokio::test]
async fn upload_requires_platform_and_file() {
    let (state, _journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "dave").await;

    let no_platform = upload(&client, &base_url, &token, statement_form(None, Some(TOS_STATEMENT))).await;
    assert_eq!(no_platform.status().as_u16(), 400);

    let no_file = upload(&client, &base_url, &token, statement_form(Some("thinkorswim"), None)).await;
    assert_eq!(no_file.status().as_u16(), 400);
    let json: serde_json::Value = no_file.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn upload_without_trades_returns_400_and_writes_nothing() {
    let (state, _journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "erin").await;

    let res = upload(
        &client,
        &base_url,
        &token,
        statement_form(Some("thinkorswim"), Some("Cash Balance\nDATE,TIME\n")),
    )
    .await;

    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("No trades found"));
    let positions: serde_json::Value = client
        .get(format!("{}/api/trades/positions", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(positions["total_count"], 0);
}

#[tokio::test]
async fn upload_without_token_returns_401() {
    let (state, _journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/dashboard/upload-statement", base_url))
        .multipart(statement_form(Some("thinkorswim"), Some(TOS_STATEMENT)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn second_upload_closes_open_position_and_keeps_others() {
    let (state, _journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "frank").await;

    let first = upload(
        &client,
        &base_url,
        &token,
        statement_form(Some("thinkorswim"), Some(TOS_STATEMENT)),
    )
    .await;
    assert_eq!(first.status().as_u16(), 200);

    let closing = "Account Trade History\n\
,Exec Time,Spread,Side,Qty,Pos Effect,Symbol,Exp,Strike,Type,Price,Net Price,Order Type\n\
,01/20/24 11:00:00,STOCK,SELL,-4,TO CLOSE,MSFT,,,STOCK,410.00,410.00,LMT\n";
    let second = upload(
        &client,
        &base_url,
        &token,
        statement_form(Some("thinkorswim"), Some(closing)),
    )
    .await;
    assert_eq!(second.status().as_u16(), 200);
    let summary: serde_json::Value = second.json().await.unwrap();
    assert_eq!(summary["updated_positions"], 1);
    assert_eq!(summary["new_positions"], 0);

    let positions: serde_json::Value = client
        .get(format!("{}/api/trades/positions?status=CLOSED", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(positions["total_count"], 2);
    let aapl = positions["positions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["symbol"] == "AAPL")
        .unwrap();
    assert_eq!(aapl["pnl"].as_f64(), Some(200.0));
}

#[tokio::test]
async fn round_trip_upload_counts_realized_pnl_once_on_dashboard() {
    let (state, _journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "grace").await;
    let statement = "Account Trade History\n\
,Exec Time,Spread,Side,Qty,Pos Effect,Symbol,Exp,Strike,Type,Price,Net Price,Order Type\n\
,01/15/24 09:31:02,STOCK,BUY,+10,TO OPEN,AAPL,,,STOCK,100.00,100.00,LMT\n\
,01/15/24 15:02:11,STOCK,SELL,-10,TO CLOSE,AAPL,,,STOCK,120.00,120.00,LMT\n";

    let res = upload(
        &client,
        &base_url,
        &token,
        statement_form(Some("thinkorswim"), Some(statement)),
    )
    .await;
    assert_eq!(res.status().as_u16(), 200);

    let json: serde_json::Value = client
        .get(format!("{}/api/dashboard/stats", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let stats = &json["stats"];
    assert_eq!(stats["total_profit_loss"].as_f64(), Some(200.0));
    assert_eq!(stats["win_count"], 1);
    assert_eq!(stats["loss_count"], 0);
    assert_eq!(stats["win_rate"].as_f64(), Some(100.0));
    assert_eq!(stats["total_trades"], 2);
}

#[tokio::test]
async fn concurrent_uploads_share_one_open_position() {
    let (state, journal) = test_app_state();
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let token = login(&client, &base_url, "heidi").await;
    let buy = |day: u32| {
        format!(
            "Account Trade History\n\
,Exec Time,Spread,Side,Qty,Pos Effect,Symbol,Exp,Strike,Type,Price,Net Price,Order Type\n\
,01/{day:02}/24 10:00:00,STOCK,BUY,+5,TO OPEN,NVDA,,,STOCK,50.00,50.00,LMT\n"
        )
    };
    let (first, second) = (buy(2), buy(3));

    let (a, b) = tokio::join!(
        upload(&client, &base_url, &token, statement_form(Some("thinkorswim"), Some(&first))),
        upload(&client, &base_url, &token, statement_form(Some("thinkorswim"), Some(&second))),
    );
    assert_eq!(a.status().as_u16(), 200);
    assert_eq!(b.status().as_u16(), 200);

    let positions: serde_json::Value = client
        .get(format!("{}/api/trades/positions?status=OPEN", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(positions["total_count"], 1);

    let open = &positions["positions"][0];
    let position_id = open["id"].as_str().unwrap();
    let user_id = uuid::Uuid::parse_str(open["user_id"].as_str().unwrap()).unwrap();
    let trades: Vec<_> = journal
        .read()
        .await
        .trades_for_user(user_id, &TradeFilter::default())
        .into_iter()
        .filter(|t| t.position_id.as_deref() == Some(position_id))
        .collect();
    assert_eq!(trades.len(), 2);
}
