use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use gymsms::application::credited::CreditedDispatcher;
use gymsms::application::dispatcher::DispatchEngine;
use gymsms::application::ledger::CreditLedger;
use gymsms::application::monitor::BalanceMonitor;
use gymsms::application::notices::Notifier;
use gymsms::application::provider::ProviderClient;
use gymsms::application::templates::TemplateResolver;
use gymsms::application::tracker::CampaignTracker;
use gymsms::application::worker::{DispatchHandle, DispatchPool};
use gymsms::config::Settings;
use gymsms::domain::ledger::{Credits, SmsPackage};
use gymsms::domain::party::CompanyProfile;
use gymsms::domain::ports::{
    CampaignStoreBox, CreditPoolStoreBox, NotificationStoreBox, ProviderLedger, ProviderLedgerRef,
    TemplateStoreBox, VoucherLedger, VoucherLedgerRef, VoucherStoreBox,
};
use gymsms::error::DispatchError;
use gymsms::infrastructure::in_memory::{
    InMemoryCampaignStore, InMemoryCreditPoolStore, InMemoryNotificationStore, InMemoryTemplateStore,
    InMemoryVoucherStore,
};
#[cfg(feature = "storage-rocksdb")]
use gymsms::infrastructure::rocksdb::RocksDBStore;
use gymsms::infrastructure::seed::seed_templates;
use gymsms::interfaces::csv::event_reader::{Billing, DispatchEvent, EventReader};
use gymsms::interfaces::csv::outcome_writer::OutcomeWriter;
use gymsms::telemetry::init_tracing;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

#[derive(Parser)]
#[command(name = "gymsms", author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "GYMSMS_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, env = "GYMSMS_LOG_JSON")]
    log_json: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one SMS per row of an events CSV and print the campaign outcomes.
    Dispatch {
        /// Input events CSV file
        input: PathBuf,

        /// Set the provider pool to this many credits before dispatching.
        #[arg(long)]
        seed_credits: Option<Decimal>,
    },
    /// Ask the provider for the live balance and resync the pool.
    Balance,
    /// Top up a company's voucher from an SMS package.
    Refill {
        #[arg(long)]
        company_id: u64,
        #[arg(long)]
        company_name: String,
        #[arg(long, default_value = "")]
        company_phone: String,
        #[arg(long)]
        company_tin: Option<String>,
        /// Voucher expiry (RFC 3339), normally the subscription end.
        #[arg(long)]
        expires_at: DateTime<Utc>,
        #[arg(long)]
        package: String,
        #[arg(long)]
        units: Decimal,
        #[arg(long, default_value = "0")]
        price: Decimal,
    },
    /// Poll the provider balance and warn the owner until Ctrl-C.
    Monitor,
}

struct Stores {
    templates: TemplateStoreBox,
    campaigns: CampaignStoreBox,
    notifications: NotificationStoreBox,
    pools: CreditPoolStoreBox,
    vouchers: VoucherStoreBox,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            templates: Box::new(InMemoryTemplateStore::new()),
            campaigns: Box::new(InMemoryCampaignStore::new()),
            notifications: Box::new(InMemoryNotificationStore::new()),
            pools: Box::new(InMemoryCreditPoolStore::new()),
            vouchers: Box::new(InMemoryVoucherStore::new()),
        }
    }

    fn open(db_path: Option<PathBuf>) -> gymsms::error::Result<Self> {
        match db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => {
                let store = RocksDBStore::open(path)?;
                Ok(Self {
                    templates: Box::new(store.clone()),
                    campaigns: Box::new(store.clone()),
                    notifications: Box::new(store.clone()),
                    pools: Box::new(store.clone()),
                    vouchers: Box::new(store),
                })
            }
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(_) => {
                eprintln!(
                    "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
                );
                Ok(Self::in_memory())
            }
            None => Ok(Self::in_memory()),
        }
    }
}

struct Services {
    engine: Arc<DispatchEngine>,
    pool: DispatchPool,
    ledger: CreditLedger,
    credited: CreditedDispatcher,
}

async fn build_services(settings: &Settings, stores: Stores) -> Result<Services> {
    seed_templates(stores.templates.as_ref()).await.into_diagnostic()?;

    let (ledger, _ledger_task) = CreditLedger::spawn(
        stores.pools,
        stores.vouchers,
        settings.gateway.provider,
        settings.ledger_policy(),
    );
    let provider_ledger: ProviderLedgerRef = Arc::new(ledger.clone());
    let voucher_ledger: VoucherLedgerRef = Arc::new(ledger.clone());

    let gateway = settings.gateway.build().into_diagnostic()?;
    let provider = ProviderClient::new(gateway, provider_ledger.clone(), settings.gateway.country_code.clone());
    let engine = Arc::new(DispatchEngine::new(
        TemplateResolver::new(stores.templates, settings.fallback_locale),
        CampaignTracker::new(stores.campaigns, stores.notifications),
        provider,
    ));

    let pool = DispatchPool::start(engine.clone(), settings.pool_config());
    let credited = CreditedDispatcher::new(pool.handle(), provider_ledger, voucher_ledger);

    Ok(Services {
        engine,
        pool,
        ledger,
        credited,
    })
}

async fn dispatch_event(
    event: DispatchEvent,
    pool: DispatchHandle,
    credited: CreditedDispatcher,
) -> gymsms::error::Result<()> {
    match event.billing() {
        Billing::None => {
            pool.dispatch(event.into_request()).await?;
        }
        Billing::Provider => {
            credited.dispatch_with_provider_credits(event.into_request()).await?;
        }
        Billing::Voucher => {
            let company = event.voucher_company()?;
            credited.dispatch_with_voucher(company, event.into_request()).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let stores = Stores::open(cli.db_path).into_diagnostic()?;
    let services = build_services(&cli.settings, stores).await?;

    match cli.command {
        Command::Dispatch { input, seed_credits } => {
            if let Some(credits) = seed_credits {
                services.ledger.resync(Credits(credits)).await.into_diagnostic()?;
            }

            // Process events
            let file = File::open(input).into_diagnostic()?;
            let reader = EventReader::new(file);
            let mut running = JoinSet::new();
            for event_result in reader.events() {
                match event_result {
                    Ok(event) => {
                        let pool = services.pool.handle();
                        let credited = services.credited.clone();
                        running.spawn(dispatch_event(event, pool, credited));
                    }
                    Err(e) => {
                        eprintln!("Error reading event: {}", e);
                    }
                }
            }
            while let Some(joined) = running.join_next().await {
                let result = joined.map_err(|e| DispatchError::InternalError(Box::new(e)));
                if let Err(e) = result.and_then(|r| r) {
                    eprintln!("Error dispatching event: {}", e);
                }
            }
            services.pool.shutdown().await.into_diagnostic()?;

            // Output final state
            let campaigns = services.engine.tracker().campaigns().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = OutcomeWriter::new(stdout.lock());
            writer.write_campaigns(campaigns).into_diagnostic()?;
        }
        Command::Balance => {
            let balance = services.engine.provider().check_balance().await.into_diagnostic()?;
            let pool = ProviderLedger::balance(&services.ledger).await.into_diagnostic()?;
            println!("provider,remaining,used");
            match pool {
                Some(pool) => println!("{},{},{}", pool.provider, pool.remaining, pool.used),
                None => println!("{},{},0", cli.settings.gateway.provider, balance),
            }
            services.pool.shutdown().await.into_diagnostic()?;
        }
        Command::Refill {
            company_id,
            company_name,
            company_phone,
            company_tin,
            expires_at,
            package,
            units,
            price,
        } => {
            let company = CompanyProfile {
                id: company_id,
                name: company_name,
                phone: company_phone,
                tin: company_tin,
                locale: None,
                subscription_end: expires_at,
            };
            let package = SmsPackage {
                name: package,
                units: Credits(units),
                price,
                provider: cli.settings.gateway.provider,
            };
            let voucher = services.ledger.refill(company, package).await.into_diagnostic()?;
            println!("company,package,granted,remaining,expires_at");
            println!(
                "{},{},{},{},{}",
                voucher.company_id,
                voucher.package_name,
                voucher.granted,
                voucher.remaining,
                voucher.expires_at.to_rfc3339()
            );
            services.pool.shutdown().await.into_diagnostic()?;
        }
        Command::Monitor => {
            let monitor = BalanceMonitor::new(
                services.engine.clone(),
                Notifier::new(services.credited.clone()),
                cli.settings.owner(),
                Credits(cli.settings.low_balance_floor),
                cli.settings.monitor_interval(),
            );
            let (stop, stopped) = watch::channel(false);
            let running = tokio::spawn(monitor.run(stopped));

            tokio::signal::ctrl_c().await.into_diagnostic()?;
            let _ = stop.send(true);
            running.await.into_diagnostic()?;
            services.pool.shutdown().await.into_diagnostic()?;
        }
    }

    Ok(())
}
