//! Fuel network implementations of the wallet and contract seams.

use crate::{
    address::{
        AccountId,
        ContractAddress,
    },
    character::{
        CharacterMinted,
        MintReceipt,
        RawCharacter,
    },
    contract::{
        GameContract,
        MintBroadcaster,
        MintSubscription,
        WalletEnvironment,
        WalletProvider,
    },
    epic_game_types::{
        CharacterAttributes,
        CharacterNFTMinted,
        EpicGame,
    },
    wallets::{
        self,
        Keystore,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use fuels::{
    accounts::ViewOnlyAccount,
    core::codec::LogDecoder,
    programs::calls::ContractDependency,
    prelude::{
        ContractId,
        Execution,
        Provider,
        VariableOutputPolicy,
        Wallet,
    },
};
use futures::future::try_join_all;
use std::{
    ops::RangeInclusive,
    path::PathBuf,
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time,
};
use tracing::{
    debug,
    info,
    warn,
};

pub const MINT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// A forc-wallet keystore selected by name counts as the injected wallet.
#[derive(Clone, Debug)]
pub struct ForcWalletEnvironment {
    pub keystore_dir: PathBuf,
    pub wallet_name: String,
    pub rpc_url: String,
}

impl WalletEnvironment for ForcWalletEnvironment {
    type Provider = ForcWalletProvider;

    fn detect(&self) -> Option<ForcWalletProvider> {
        match Keystore::locate(&self.keystore_dir, &self.wallet_name) {
            Ok(keystore) => Some(ForcWalletProvider {
                keystore,
                rpc_url: self.rpc_url.clone(),
            }),
            Err(e) => {
                warn!(error = %e, "no forc-wallet keystore available");
                None
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForcWalletProvider {
    keystore: Keystore,
    rpc_url: String,
}

impl WalletProvider for ForcWalletProvider {
    type Signer = Wallet;

    async fn signer(&self) -> Result<Wallet> {
        info!(rpc_url = %self.rpc_url, "connecting to Fuel node");
        let provider = Provider::connect(&self.rpc_url)
            .await
            .wrap_err_with(|| format!("Failed to connect to provider at {}", self.rpc_url))?;
        self.keystore.unlock(&provider)
    }
}

/// Blocks still to scan, and the height the next scan starts from. The first
/// scan only marks the tip, so mints made before the client started are not
/// replayed.
fn scan_window(next_height: Option<u32>, latest: u32) -> (Option<RangeInclusive<u32>>, u32) {
    match next_height {
        None => (None, latest.saturating_add(1)),
        Some(next) if next > latest => (None, next),
        Some(next) => (Some(next..=latest), latest.saturating_add(1)),
    }
}

/// Follows every `CharacterNFTMinted` log of one contract, whoever sent the
/// transaction, by scanning new blocks.
struct MintFollower {
    provider: Provider,
    decoder: LogDecoder,
    minted: MintBroadcaster,
    next_height: Option<u32>,
}

impl MintFollower {
    async fn run(mut self, interval: Duration) {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll().await {
                warn!(error = %e, "mint log poll failed; retrying next tick");
            }
        }
    }

    async fn poll(&mut self) -> Result<usize> {
        let latest = self
            .provider
            .latest_block_height()
            .await
            .wrap_err("latest_block_height failed")?;
        let (window, next_height) = scan_window(self.next_height, latest);
        let mut published = 0;
        if let Some(heights) = window {
            for height in heights {
                published += self.scan_block(height).await?;
                // a failed block is retried from here on the next tick
                self.next_height = Some(height.saturating_add(1));
            }
        }
        self.next_height = Some(next_height);
        Ok(published)
    }

    async fn scan_block(&self, height: u32) -> Result<usize> {
        let Some(block) = self
            .provider
            .block_by_height(height.into())
            .await
            .wrap_err_with(|| format!("block_by_height({height}) failed"))?
        else {
            debug!(height, "block not available yet");
            return Ok(0);
        };
        let mut published = 0;
        for tx_id in block.transactions {
            let receipts = self
                .provider
                .tx_status(&tx_id)
                .await
                .wrap_err_with(|| format!("tx_status({tx_id}) failed"))?
                .take_receipts();
            // the decoder only matches logs emitted by the game contract
            let logs = self
                .decoder
                .decode_logs_with_type::<CharacterNFTMinted>(&receipts)
                .wrap_err("failed to decode CharacterNFTMinted logs")?;
            for log in logs {
                let event = minted_event(log);
                debug!(height, token_id = event.token_id, "mint log found");
                self.minted.publish(event);
                published += 1;
            }
        }
        Ok(published)
    }
}

pub struct FuelGameContract {
    instance: EpicGame<Wallet>,
    address: ContractAddress,
    signer: AccountId,
    minted: MintBroadcaster,
    follower: JoinHandle<()>,
}

fn raw_character(attributes: CharacterAttributes) -> RawCharacter {
    RawCharacter {
        character_index: attributes.character_index,
        name: attributes.name.to_string(),
        image_uri: attributes.image_uri.to_string(),
        hp: attributes.hp,
        max_hp: attributes.max_hp,
        attack_damage: attributes.attack_damage,
    }
}

fn minted_event(log: CharacterNFTMinted) -> CharacterMinted {
    CharacterMinted {
        sender: AccountId(log.sender.0),
        token_id: log.token_id,
        character_index: log.character_index,
    }
}

impl GameContract for FuelGameContract {
    type Signer = Wallet;

    /// Must be called inside a tokio runtime: the mint log follower is
    /// spawned here and lives as long as the binding.
    fn connect(address: ContractAddress, wallet: Wallet) -> Result<Self> {
        let signer = wallets::signer_account(&wallet);
        let provider = wallet
            .try_provider()
            .wrap_err("wallet has no provider")?
            .clone();
        let instance = EpicGame::new(ContractId::from(address.0), wallet);
        let minted = MintBroadcaster::default();
        let follower = MintFollower {
            provider,
            decoder: instance.log_decoder(),
            minted: minted.clone(),
            next_height: None,
        };
        let follower = tokio::spawn(follower.run(MINT_POLL_INTERVAL));
        Ok(Self {
            instance,
            address,
            signer,
            minted,
            follower,
        })
    }

    fn address(&self) -> ContractAddress {
        self.address
    }

    fn signer_address(&self) -> AccountId {
        self.signer
    }

    async fn all_default_characters(&self) -> Result<Vec<RawCharacter>> {
        let count = self
            .instance
            .methods()
            .default_character_count()
            .simulate(Execution::state_read_only())
            .await
            .wrap_err("default_character_count call failed")?
            .value;
        // try_join_all keeps input order, so templates stay in index order
        let reads = (0..count).map(|index| async move {
            self.instance
                .methods()
                .default_character(index)
                .simulate(Execution::state_read_only())
                .await
                .map(|response| raw_character(response.value))
        });
        try_join_all(reads)
            .await
            .wrap_err("default_character call failed")
    }

    async fn check_if_user_has_nft(&self) -> Result<RawCharacter> {
        let response = self
            .instance
            .methods()
            .check_if_user_has_nft()
            .simulate(Execution::state_read_only())
            .await
            .wrap_err("check_if_user_has_nft call failed")?;
        Ok(raw_character(response.value))
    }

    // The mint log reaches subscribers through the follower like any other
    // sender's, so it is not published from the receipt here.
    async fn mint_character_nft(&self, character_index: u64) -> Result<MintReceipt> {
        let response = self
            .instance
            .methods()
            .mint_character_nft(character_index)
            .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
            .call()
            .await
            .wrap_err_with(|| format!("mint_character_nft({character_index}) failed"))?;
        Ok(MintReceipt {
            tx_id: response.tx_id.map(|id| id.to_string()),
        })
    }

    fn subscribe_minted(&self) -> MintSubscription {
        self.minted.subscribe()
    }
}

impl Drop for FuelGameContract {
    fn drop(&mut self) {
        self.follower.abort();
    }
}
