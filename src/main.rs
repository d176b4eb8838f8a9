mod cli;

use std::io::{BufRead, Write};
use std::sync::Arc;

use clap::Parser;

use astore::catalog::{
    ASSET_PACK_PRODUCT_TYPE, AssetPackListingData, Price, PrivateAssetPack, UserPurchase,
};
use astore::config::Config;
use astore::error::{AppError, AppResult};
use astore::logging::{LogConfig, init_logging};
use astore::purchase::{FlowServices, FlowTransition};
use astore::services::{PurchaseCatalog, PurchaseQuery, ShopClient, SystemUrlOpener};
use astore::session::{Profile, UserContext};
use astore::store::{AssetStoreController, PackSelection};

use cli::{Cli, Command, PurchaseArgs, PurchasesArgs};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    init_logging(&LogConfig::from_section(&config.log).with_verbosity(cli.verbose))?;

    let token = cli.auth_token.ok_or(AppError::NotAuthenticated)?;
    let client = Arc::new(ShopClient::from_config(&config.services)?);

    match cli.command {
        Command::Purchases(args) => list_purchases(client.as_ref(), token, args).await,
        Command::Purchase(args) => run_purchase(config, client, token, args).await,
    }
}

async fn list_purchases(
    client: &ShopClient,
    token: String,
    args: PurchasesArgs,
) -> AppResult<()> {
    let user = UserContext::logged_in(
        Profile {
            id: args.user_id.clone(),
            email: String::new(),
        },
        token,
    );
    let purchases = client
        .list_user_purchases(
            &user.authorization_header()?,
            &PurchaseQuery::received_asset_packs(args.user_id),
        )
        .await?;

    if purchases.is_empty() {
        println!("no asset packs owned");
    }
    for purchase in &purchases {
        match &purchase.created_at {
            Some(created_at) => println!("{}\t{created_at}", purchase.product_id),
            None => println!("{}", purchase.product_id),
        }
    }
    Ok(())
}

async fn run_purchase(
    config: Config,
    client: Arc<ShopClient>,
    token: String,
    args: PurchaseArgs,
) -> AppResult<()> {
    let user = UserContext::logged_in(
        Profile {
            id: args.user_id.clone(),
            email: args.email.clone(),
        },
        token,
    );
    refresh_received_packs(&user, client.as_ref(), &args).await?;

    let max_wait = config.purchase.max_wait();
    let services = FlowServices {
        billing: client.clone(),
        catalog: client.clone(),
        opener: Arc::new(SystemUrlOpener),
    };
    let mut store = AssetStoreController::new(services, user.clone(), config.purchase);
    let mut received = user.subscribe_received_packs();

    if matches!(
        store.select_private_pack(listing_from_args(&args)),
        PackSelection::OpenedPackPage | PackSelection::AlreadyOwned
    ) {
        println!("asset pack {} is already owned", args.pack_id);
        return Ok(());
    }

    let mut transition = store.request_purchase().await?;
    if transition == FlowTransition::PasswordRequested {
        let password = prompt_password()?;
        transition = store.submit_password(password).await?;
    }
    if let FlowTransition::CheckoutOpened { url } = &transition {
        println!("complete the payment at {url}");
    }

    let deadline = tokio::time::sleep(max_wait);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = store.purchase_flow_mut().next_event() => {
                let Some(event) = event else {
                    return Err(AppError::invalid_argument("purchase flow closed unexpectedly"));
                };
                if let Some(FlowTransition::Succeeded { refresh_catalog }) =
                    store.handle_flow_event(event)
                {
                    if refresh_catalog {
                        refresh_received_packs(&user, client.as_ref(), &args).await?;
                        store.on_received_packs_changed(&user.received_packs());
                    }
                    break;
                }
                if let Some(message) = store.purchase_flow().last_check_failure() {
                    tracing::debug!(%message, "purchase check failed, still waiting");
                }
            }
            changed = received.changed() => {
                if changed.is_err() {
                    continue;
                }
                let snapshot = received.borrow_and_update().clone();
                if matches!(
                    store.on_received_packs_changed(&snapshot),
                    Some(FlowTransition::Succeeded { .. })
                ) {
                    break;
                }
            }
            () = &mut deadline => {
                store.dismiss_purchase();
                return Err(AppError::PurchaseTimeout {
                    pack_id: args.pack_id.clone(),
                    waited_secs: max_wait.as_secs(),
                });
            }
        }
    }

    println!("asset pack {} purchased", args.pack_id);
    Ok(())
}

async fn refresh_received_packs(
    user: &UserContext,
    client: &ShopClient,
    args: &PurchaseArgs,
) -> AppResult<()> {
    let purchases = client
        .list_user_purchases(
            &user.authorization_header()?,
            &PurchaseQuery::received_asset_packs(args.user_id.clone()),
        )
        .await?;
    user.set_received_packs(received_packs_from(&purchases, args));
    Ok(())
}

/// The listing endpoint only reports product ids; the pack being bought
/// gets its display name from the command line.
fn received_packs_from(purchases: &[UserPurchase], args: &PurchaseArgs) -> Vec<PrivateAssetPack> {
    purchases
        .iter()
        .filter(|purchase| {
            purchase.product_type.is_empty() || purchase.product_type == ASSET_PACK_PRODUCT_TYPE
        })
        .map(|purchase| {
            let name = if purchase.product_id == args.pack_id {
                args.name.clone()
            } else {
                None
            };
            PrivateAssetPack {
                id: purchase.product_id.clone(),
                name: name.unwrap_or_else(|| purchase.product_id.clone()),
                tag: purchase.product_id.clone(),
                content: Vec::new(),
            }
        })
        .collect()
}

fn listing_from_args(args: &PurchaseArgs) -> AssetPackListingData {
    AssetPackListingData {
        id: args.pack_id.clone(),
        name: args.name.clone().unwrap_or_else(|| args.pack_id.clone()),
        description: String::new(),
        prices: vec![Price {
            value: 0,
            currency: String::new(),
            stripe_price_id: args.price_id.clone(),
        }],
    }
}

fn prompt_password() -> AppResult<String> {
    let mut stderr = std::io::stderr();
    write!(stderr, "asset store password: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|source| AppError::io_with_context(source, "failed to read password"))?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::invalid_argument("password must not be empty"));
    }
    Ok(password)
}
