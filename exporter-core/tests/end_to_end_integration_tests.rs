use exporter_core::feed::socketio;
use exporter_core::feed::WebSocketTransport;
use exporter_core::monitoring::encode_metrics;
use exporter_core::testing::{eventually, fast_feed_config};
use exporter_core::{ConnectionManager, ExchangeMetrics, FeedConfig};
use futures_util::{SinkExt, StreamExt};
use prometheus::Registry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const OPEN: &str = r#"0{"sid":"e2e","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#;

/// Serve two Socket.IO sessions: the first drops after two orders, the
/// second stays up, answering pings, after one completed trade.
async fn run_exchange(listener: TcpListener) {
    for round in 0..2 {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        ws.send(Message::Text(OPEN.to_string())).await.unwrap();
        ws.send(Message::Text("40".to_string())).await.unwrap();

        if round == 0 {
            for price in [50_000, 50_100] {
                let frame = socketio::encode_event("order", &json!({"type": 1, "unit_price": price, "amount": 0.1}));
                ws.send(Message::Text(frame)).await.unwrap();
            }
            ws.send(Message::Text(socketio::DISCONNECT.to_string())).await.unwrap();
            continue;
        }

        let frame = socketio::encode_event(
            "order_completed",
            &json!({"type": 2, "unit_price": 51_000.5, "amount": 0.25, "create_date": "2019-01-10T12:00:00Z"}),
        );
        ws.send(Message::Text(frame)).await.unwrap();

        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                if text == socketio::PING {
                    let _ = ws.send(Message::Text(socketio::PONG.to_string())).await;
                }
            }
        }
    }
}

#[tokio::test]
async fn test_websocket_feed_to_scrape() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = FeedConfig {
        url: format!(
            "ws://{}/socket.io/?EIO=3&transport=websocket",
            listener.local_addr().unwrap()
        ),
        ping_interval: Duration::from_millis(50),
        ping_timeout: Duration::from_millis(500),
        ..fast_feed_config()
    };
    assert!(config.validate().is_ok());
    tokio::spawn(run_exchange(listener));

    let registry = Registry::new();
    let metrics = Arc::new(ExchangeMetrics::new("crypto").unwrap());
    metrics.register(&registry).unwrap();

    let manager = ConnectionManager::new(WebSocketTransport::from_config(&config), &config, metrics.clone());
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(manager.run(stop_rx));

    let traded = eventually(Duration::from_secs(5), || {
        metrics
            .snapshot()
            .value("crypto_trade_count", &[("operation", "ask")])
            == Some(1.0)
    })
    .await;
    assert!(traded, "completed trade from the second session never arrived");

    let scrape = encode_metrics(&registry).unwrap();
    assert!(scrape.contains(
        r#"crypto_order_count{base_currency="BTC",event="create",exchange_name="bitcointrade",operation="bid",quote_currency="BRL"} 2"#
    ));
    assert!(scrape.contains(
        r#"crypto_trade_price{base_currency="BTC",exchange_name="bitcointrade",operation="ask",quote_currency="BRL"} 51000.5"#
    ));
    assert!(scrape.contains(
        r#"crypto_trade_amount_sum{base_currency="BTC",exchange_name="bitcointrade",operation="ask",quote_currency="BRL"} 0.25"#
    ));

    // Keep-alive pings must hold the second session open
    tokio::time::sleep(Duration::from_millis(300)).await;

    stop_tx.send(true).unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stats.sessions_established, 2);
    assert_eq!(stats.events_applied, 3);
}
