//! # Purchase Walkthrough
//!
//! Runs the shipped catalog through the engine end to end, against the
//! local gateway and the fake store:
//!
//! 1. Virtual purchases (gold -> key, gold + key -> sword)
//! 2. An IAP the player starts
//! 3. An unsolicited store purchase redeemed through the purchase queue
//! 4. A purchase the player cannot afford
//!
//! Usage: `purchase_walkthrough [DATA_DIR]` (defaults to the workspace `data/`).
//! Set `RUST_LOG=coffer_transactions=debug` for step-level logs.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use coffer_economy::{Catalog, Inventory, InventoryService, Wallet, WalletService};
use coffer_transactions::{
    EngineConfig, FakeStoreAdapter, FakeStoreMode, LocalFulfillmentGateway, PurchasingAdapter,
    TransactionEngine, TransactionEvent,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("coffer_transactions=info".parse()?),
        )
        .with_target(true)
        .init();

    let data_dir = std::env::args().nth(1).map_or_else(
        || PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data"),
        PathBuf::from,
    );
    let catalog = Arc::new(Catalog::from_file(data_dir.join("catalog.toml"))?);
    let config = EngineConfig::from_file(data_dir.join("engine.toml"))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(walkthrough(config, catalog))
}

async fn walkthrough(config: EngineConfig, catalog: Arc<Catalog>) -> Result<(), Box<dyn Error>> {
    let wallet = Arc::new(Wallet::from_catalog(&catalog));
    let inventory = Arc::new(Inventory::from_catalog(&catalog));

    let engine = TransactionEngine::new(
        config,
        Arc::clone(&catalog),
        Arc::clone(&wallet) as Arc<dyn WalletService>,
        Arc::clone(&inventory) as Arc<dyn InventoryService>,
    );
    engine.initialize(Arc::new(LocalFulfillmentGateway::new(
        Arc::clone(&catalog),
        Arc::clone(&wallet) as Arc<dyn WalletService>,
        Arc::clone(&inventory) as Arc<dyn InventoryService>,
    )));

    let store = Arc::new(
        FakeStoreAdapter::new(FakeStoreMode::AutoApprove)
            .with_product("com.coffer.gems_100", "Pouch of Gems", "$0.99")
            .with_product("com.coffer.starter", "Starter Bundle", "$4.99"),
    );
    let events = engine.subscribe();
    engine
        .set_purchasing_adapter(Arc::clone(&store) as Arc<dyn PurchasingAdapter>)
        .wait()
        .await?;

    println!("═══════════════════════════════════════════════════════════════");
    println!("  COFFER PURCHASE WALKTHROUGH");
    println!("═══════════════════════════════════════════════════════════════");
    print_state(&wallet, &inventory);

    println!("\n[1] Virtual purchases");
    for key in ["buy_key", "buy_sword"] {
        let result = engine.begin_transaction_by_key(key, Vec::new()).wait().await?;
        println!(
            "    {key}: paid {} gold, received {:?}",
            result.costs.currency_total("gold"),
            result
                .rewards
                .items
                .iter()
                .map(|i| i.instance_id.as_str())
                .collect::<Vec<_>>()
        );
    }

    println!("\n[2] In-app purchase");
    if let Some(info) = engine.localized_product_info("com.coffer.gems_100")? {
        println!("    store lists {} at {}", info.name, info.price);
    }
    let result = engine.begin_transaction_by_key("gem_pack", Vec::new()).wait().await?;
    println!(
        "    gem_pack: received {} gems",
        result.rewards.currency_total("gems")
    );

    println!("\n[3] Unsolicited purchase");
    store.inject_unsolicited("com.coffer.starter");
    for _ in 0..100 {
        if store.unfinalized_count() == 0 && engine.pending_iap().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("    store purchases consumed: {:?}", store.finalized());

    println!("\n[4] Unaffordable purchase");
    wallet.set_balance("gems", 0)?;
    match engine
        .begin_transaction_by_key("gems_to_gold", Vec::new())
        .wait()
        .await
    {
        Ok(_) => println!("    gems_to_gold: unexpectedly succeeded"),
        Err(e) => println!("    gems_to_gold: {e}"),
    }

    println!("\n───────────────────────────────────────────────────────────────");
    print_state(&wallet, &inventory);

    println!("\nReceipts:");
    for receipt in engine.recent_receipts() {
        println!("  {receipt}");
    }

    let (succeeded, failed) = events.try_iter().fold((0, 0), |(ok, err), event| match event {
        TransactionEvent::Succeeded { .. } => (ok + 1, err),
        TransactionEvent::Failed { .. } => (ok, err + 1),
        _ => (ok, err),
    });
    println!("\nEvents: {succeeded} succeeded, {failed} failed");

    engine.remove_purchasing_adapter();
    Ok(())
}

fn print_state(wallet: &Wallet, inventory: &Inventory) {
    let snapshot = wallet.snapshot();
    println!(
        "  gold={} gems={}",
        snapshot.balance("gold").unwrap_or(0),
        snapshot.balance("gems").unwrap_or(0)
    );
    let items: Vec<String> = inventory.items().into_iter().map(|i| i.id).collect();
    println!("  items={items:?}");
}
