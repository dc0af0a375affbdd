use crate::{
    address::ContractAddress,
    deployment::{
        DeploymentEnv,
        DeploymentStore,
    },
    fuel::ForcWalletEnvironment,
    notification::DEFAULT_MARKETPLACE_URL,
    selector::{
        MintEventFilter,
        SelectorConfig,
    },
    wallets,
};
use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::path::{
    Path,
    PathBuf,
};

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:4000/";

#[derive(Parser, Debug)]
#[command(
    name = "epic-game",
    version,
    about = "Pick and mint your Epic Game character",
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["local", "devnet", "testnet"])
            .required(true)
    )
)]
pub struct Args {
    #[arg(long)]
    pub local: bool,

    #[arg(long)]
    pub devnet: bool,

    #[arg(long)]
    pub testnet: bool,

    /// Override the RPC URL of the selected network
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Game contract id; defaults to the newest deployment record
    #[arg(short, long)]
    pub contract_id: Option<String>,

    /// forc-wallet profile to play with
    #[arg(short, long)]
    pub wallet: String,

    /// defaults to ~/.fuel/wallets
    #[arg(long)]
    pub wallet_dir: Option<String>,

    /// Link shown after a mint; `{contract}` and `{token_id}` are substituted
    #[arg(long, default_value = DEFAULT_MARKETPLACE_URL)]
    pub marketplace_url: String,

    /// Only react to mints sent by this wallet
    #[arg(long)]
    pub only_my_mints: bool,

    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: DeploymentEnv,
    pub wallet: ForcWalletEnvironment,
    pub selector: SelectorConfig,
    pub log_dir: PathBuf,
}

impl Args {
    pub fn network(&self) -> DeploymentEnv {
        if self.local {
            DeploymentEnv::Local
        } else if self.devnet {
            DeploymentEnv::Dev
        } else {
            DeploymentEnv::Test
        }
    }

    pub fn rpc_url(&self) -> String {
        let default = match self.network() {
            DeploymentEnv::Local => DEFAULT_LOCAL_RPC_URL,
            DeploymentEnv::Dev => DEFAULT_DEVNET_RPC_URL,
            DeploymentEnv::Test => DEFAULT_TESTNET_RPC_URL,
        };
        self.rpc_url.clone().unwrap_or_else(|| default.to_owned())
    }

    /// Resolves the contract address, falling back to the deployment records
    /// found under `deployments_root`.
    pub fn into_config(self, deployments_root: impl AsRef<Path>) -> Result<AppConfig> {
        let network = self.network();
        let contract_address: ContractAddress = match &self.contract_id {
            Some(raw) => raw.parse().wrap_err("parsing --contract-id")?,
            None => {
                let store = DeploymentStore::new(deployments_root, network);
                let record = store.latest()?.ok_or_else(|| {
                    eyre!("No deployment record found for {network}; provide --contract-id")
                })?;
                tracing::info!(
                    "Using deployment record {} (network {}) deployed at {}",
                    record.contract_id,
                    record.network_url,
                    record.deployed_at
                );
                record.contract_id.parse().wrap_err_with(|| {
                    format!("parsing contract id from {}", store.path().display())
                })?
            }
        };
        let mint_event_filter = if self.only_my_mints {
            MintEventFilter::LocalSigner
        } else {
            MintEventFilter::AnySender
        };
        let wallet = ForcWalletEnvironment {
            keystore_dir: wallets::resolve_keystore_dir(self.wallet_dir.as_deref())?,
            wallet_name: self.wallet.clone(),
            rpc_url: self.rpc_url(),
        };
        Ok(AppConfig {
            network,
            wallet,
            selector: SelectorConfig {
                contract_address,
                marketplace_url: self.marketplace_url,
                mint_event_filter,
            },
            log_dir: self.log_dir,
        })
    }
}
