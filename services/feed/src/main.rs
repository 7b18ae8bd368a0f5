//! Live feed service: exposes the greenloop ledger's leaderboard, account
//! state, and scan activity to clients over JSON HTTP and websockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State as AxumState};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use greenloop_ledger::{Ledger, Memory, ProfileDefaults};
use greenloop_types::{
    Account, Classification, Event, Guess, Leaderboard, UserId, VoucherCatalog,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{info, warn};

const DEMO_ITEMS: [&str; 6] = [
    "plastic bottle",
    "aluminum can",
    "glass jar",
    "cardboard box",
    "paper bag",
    "steel tin",
];

#[derive(Clone)]
struct AppState {
    ledger: Arc<Ledger<Memory>>,
    broadcaster: broadcast::Sender<FeedEvent>,
}

#[derive(Clone, Debug, Serialize)]
struct EntryDto {
    user: String,
    display_name: String,
    points: u64,
    scans: u64,
    rank: u32,
}

#[derive(Clone, Debug, Serialize)]
struct AccountDto {
    display_name: String,
    points: u64,
    coins: u64,
    scans: u64,
}

#[derive(Clone, Debug, Serialize)]
struct VoucherDto {
    id: u32,
    title: &'static str,
    cost: u64,
    tint: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeedEvent {
    Leaderboard {
        entries: Vec<EntryDto>,
    },
    Scan {
        user: String,
        item: String,
        points: u64,
    },
    Account {
        user: String,
        account: AccountDto,
    },
    Redemption {
        user: String,
        voucher: u32,
        cost: u64,
        new_coins: u64,
    },
}

fn leaderboard_entries(leaderboard: &Leaderboard) -> Vec<EntryDto> {
    leaderboard
        .entries
        .iter()
        .map(|entry| EntryDto {
            user: entry.user.to_string(),
            display_name: entry.display_name.clone(),
            points: entry.points,
            scans: entry.scans,
            rank: entry.rank,
        })
        .collect()
}

fn account_dto(account: &Account) -> AccountDto {
    AccountDto {
        display_name: account.profile.display_name.clone(),
        points: account.totals.points,
        coins: account.totals.coins,
        scans: account.totals.scans,
    }
}

fn feed_event(event: Event) -> FeedEvent {
    match event {
        Event::LeaderboardUpdated { leaderboard } => FeedEvent::Leaderboard {
            entries: leaderboard_entries(&leaderboard),
        },
        Event::ScanRecorded { user, record } => FeedEvent::Scan {
            user: user.to_string(),
            item: record.item_name,
            points: record.points_awarded,
        },
        Event::AccountCreated { user, account } | Event::AccountChanged { user, account } => {
            FeedEvent::Account {
                user: user.to_string(),
                account: account_dto(&account),
            }
        }
        Event::VoucherRedeemed {
            user,
            voucher,
            cost,
            new_coins,
        } => FeedEvent::Redemption {
            user: user.to_string(),
            voucher: voucher.0,
            cost,
            new_coins,
        },
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn leaderboard(AxumState(state): AxumState<AppState>) -> impl IntoResponse {
    match state.ledger.leaderboard().await {
        Ok(leaderboard) => Json(leaderboard_entries(&leaderboard)).into_response(),
        Err(err) => {
            warn!(%err, "leaderboard read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn vouchers(AxumState(state): AxumState<AppState>) -> Json<Vec<VoucherDto>> {
    Json(
        state
            .ledger
            .catalog()
            .vouchers()
            .iter()
            .map(|voucher| VoucherDto {
                id: voucher.id.0,
                title: voucher.title,
                cost: voucher.cost,
                tint: voucher.tint,
            })
            .collect(),
    )
}

async fn account(
    AxumState(state): AxumState<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    match state.ledger.account(&UserId::new(user)).await {
        Ok(Some(account)) => Json(account_dto(&account)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            warn!(%err, "account read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(state): AxumState<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Snapshot first so every client starts from the current ranking.
    if let Ok(leaderboard) = state.ledger.leaderboard().await {
        let snapshot = FeedEvent::Leaderboard {
            entries: leaderboard_entries(&leaderboard),
        };
        if let Ok(payload) = serde_json::to_string(&snapshot) {
            let _ = tx.send(Message::Text(payload));
        }
    }

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let broadcast_task = {
        let tx = tx.clone();
        let mut updates = state.broadcaster.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = updates.recv().await {
                if let Ok(payload) = serde_json::to_string(&event) {
                    let _ = tx.send(Message::Text(payload));
                }
            }
        })
    };

    // The feed is read-only; drain client frames until the socket closes.
    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Close(_) => break,
            _ => {}
        }
    }

    write_task.abort();
    broadcast_task.abort();
}

/// Generates synthetic scan/redeem traffic so a fresh deployment has a
/// moving feed to look at. Enabled with GREENLOOP_FEED_DEMO=1.
async fn demo_loop(ledger: Arc<Ledger<Memory>>, tick_ms: u64) {
    let mut rng = StdRng::from_entropy();
    let users: Vec<(UserId, ProfileDefaults)> = (0..8)
        .map(|i| {
            let name = format!("Demo{i}");
            (
                UserId::new(format!("demo-{i:04}")),
                ProfileDefaults {
                    display_name: name.clone(),
                    email: format!("{}@greenloop.demo", name.to_lowercase()),
                },
            )
        })
        .collect();

    for (user, defaults) in &users {
        if let Err(err) = ledger.get_or_create(user, defaults).await {
            warn!(%err, user = %user, "demo account creation failed");
            return;
        }
    }

    let mut interval = time::interval(Duration::from_millis(tick_ms));
    loop {
        interval.tick().await;

        let (user, _) = &users[rng.gen_range(0..users.len())];
        let item = DEMO_ITEMS[rng.gen_range(0..DEMO_ITEMS.len())];
        let classification = Classification::new(vec![Guess {
            label: item.to_string(),
            confidence_bps: rng.gen_range(6_000..9_900),
        }]);
        if let Err(err) = ledger.confirm_scan(user, &classification).await {
            warn!(%err, user = %user, "demo scan failed");
        }

        // Occasionally spend coins on the cheapest voucher.
        if rng.gen_range(0..10) == 0 {
            if let Some(voucher) = ledger.catalog().vouchers().first() {
                let _ = ledger.redeem(user, voucher.id).await;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("GREENLOOP_FEED_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("GREENLOOP_FEED_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9321);

    let ledger = Arc::new(Ledger::new(
        Memory::default(),
        VoucherCatalog::default(),
        Arc::new(greenloop_ledger::SystemTimeSource),
    ));
    let (broadcaster, _) = broadcast::channel::<FeedEvent>(1024);

    // Pump committed ledger events into the websocket broadcast.
    {
        let ledger = ledger.clone();
        let broadcaster = broadcaster.clone();
        let mut events = ledger.subscribe_events().await;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let _ = broadcaster.send(feed_event(event));
            }
        });
    }

    if std::env::var("GREENLOOP_FEED_DEMO").as_deref() == Ok("1") {
        let tick_ms = std::env::var("GREENLOOP_FEED_DEMO_TICK_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1_500);
        tokio::spawn(demo_loop(ledger.clone(), tick_ms));
    }

    let state = AppState {
        ledger,
        broadcaster,
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .route("/leaderboard", get(leaderboard))
        .route("/vouchers", get(vouchers))
        .route("/account/:user", get(account))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}").parse().context("invalid listen addr")?;
    info!(%addr, "feed service listening");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
