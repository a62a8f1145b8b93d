//! # adesto-demo
//!
//! End-to-end smoke run of the Adesto engines against the in-memory store:
//! two users browse the directory, one creates and both join a space, both
//! open the space view, toggle availability concurrently and chat. The
//! interesting part is watching the projections converge through optimistic
//! updates plus realtime reconciliation.

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adesto_engine::{EngineConfig, ExploreView, SpaceView};
use adesto_shared::{DateWindow, Session, SlotKey, UserId};
use adesto_store::{MemoryStore, NewSpace, SpaceStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,adesto_demo=debug")),
        )
        .init();

    info!("Starting Adesto demo v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::from_env();
    let store = MemoryStore::new();

    let ana = Session::new(UserId::new(), "Ana").with_avatar("https://cdn/avatars/ana.png");
    let ben = Session::new(UserId::new(), "Ben");

    // Ana explores, creates a space; both join.
    let explore = ExploreView::open(store.clone(), Some(ana.clone())).await?;
    let directory = explore.directory();

    let space = directory
        .lock()
        .await
        .create(NewSpace {
            name: "Morning Runners".to_string(),
            description: Some("Easy 5k along the river, all paces welcome".to_string()),
            location: Some("Riverside".to_string()),
            category: Some("Health & Fitness".to_string()),
            creator_id: ana.user_id, // reassigned from the session
            is_private: false,
            color: Some("from-emerald-400 to-emerald-600".to_string()),
        })
        .await?;
    directory.lock().await.join(space.id).await?;
    store.join_space(space.id, ben.user_id).await?;
    info!(space = %space.id, name = %space.name, "space created and joined");

    // Both users mount the space view over the same rolling window.
    let today = Utc::now().date_naive();
    let window = DateWindow::new(today - chrono::Duration::days(1), config.window_days);
    let ana_view = SpaceView::open(store.clone(), space.id, Some(ana), &config, window).await?;
    let ben_view = SpaceView::open(store.clone(), space.id, Some(ben), &config, window).await?;

    // Concurrent toggles on the same slots from both clients.
    let slot_8am = SlotKey::new(today, "8AM".parse().expect("known label"));
    let slot_7pm = SlotKey::new(today, "7PM".parse().expect("known label"));
    let toggles = vec![
        ana_view.toggle(slot_8am),
        ana_view.toggle(slot_7pm),
        ben_view.toggle(slot_8am),
    ];
    for result in join_all(toggles).await {
        result?;
    }

    ana_view.send("Anyone up for 8AM tomorrow?").await?;
    ben_view.send("I'm in, see you at the bridge").await?;

    // Let the realtime feeds drain, then compare projections.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let ana_8am = ana_view.slot(&slot_8am).await;
    let ben_8am = ben_view.slot(&slot_8am).await;
    info!(
        count = ana_8am.count,
        mine = ana_8am.mine,
        "8AM slot as Ana sees it"
    );
    info!(
        count = ben_8am.count,
        mine = ben_8am.mine,
        "8AM slot as Ben sees it"
    );
    anyhow::ensure!(ana_8am.count == 2, "both signals should be aggregated");
    anyhow::ensure!(ben_8am.count == 2, "projections should converge");

    for entry in ana_view.messages().await {
        info!(
            sender = %entry.message.sender_name,
            pending = entry.pending,
            "chat: {}",
            entry.message.content
        );
    }

    info!("demo finished, views converged");
    Ok(())
}
