//! Session lifecycle and mint synchronization for the character selection
//! screen.
//!
//! All contract I/O runs on spawned tasks whose results come back as
//! [`SelectorEvent`]s. State changes only happen in [`CharacterSelector::apply`]
//! and the methods taking `&mut self`, so handlers always see the current
//! binding rather than the one that was live when the I/O started. Every
//! message is tagged with the epoch of the binding that produced it and is
//! dropped if that binding has since been torn down.

use crate::{
    address::ContractAddress,
    character::{
        CharacterData,
        CharacterMinted,
        MintReceipt,
        RawCharacter,
    },
    contract::{
        GameContract,
        WalletEnvironment,
        WalletProvider,
    },
    notification::{
        DEFAULT_MARKETPLACE_URL,
        MintNotification,
    },
};
use color_eyre::eyre::{
    Report,
    Result,
};
use std::{
    fmt,
    sync::Arc,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{
    debug,
    info,
    trace,
    warn,
};

#[cfg(test)]
mod tests;

/// Which mint broadcasts trigger an ownership re-check.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MintEventFilter {
    /// React to every mint on the contract, whoever sent it.
    #[default]
    AnySender,
    /// React only to mints sent by the bound signer.
    LocalSigner,
}

#[derive(Clone, Debug)]
pub struct SelectorConfig {
    pub contract_address: ContractAddress,
    pub marketplace_url: String,
    pub mint_event_filter: MintEventFilter,
}

impl SelectorConfig {
    pub fn new(contract_address: ContractAddress) -> Self {
        Self {
            contract_address,
            marketplace_url: DEFAULT_MARKETPLACE_URL.to_owned(),
            mint_event_filter: MintEventFilter::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContractOperation {
    Signer,
    Connect,
    ListCharacters,
    CheckOwnership,
    Mint,
}

impl fmt::Display for ContractOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractOperation::Signer => "derive signer",
            ContractOperation::Connect => "bind contract",
            ContractOperation::ListCharacters => "list default characters",
            ContractOperation::CheckOwnership => "check owned character",
            ContractOperation::Mint => "mint character",
        };
        write!(f, "{name}")
    }
}

/// Failures the selector absorbs. None of them leave it in an unusable state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionFault {
    ProviderUnavailable,
    ContractCallFailed {
        operation: ContractOperation,
        message: String,
    },
    AlreadyMounted,
}

impl SessionFault {
    fn contract_call(operation: ContractOperation, error: &Report) -> Self {
        SessionFault::ContractCallFailed {
            operation,
            message: format!("{error:#}"),
        }
    }
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFault::ProviderUnavailable => write!(f, "wallet provider not found"),
            SessionFault::ContractCallFailed { operation, message } => {
                write!(f, "{operation} failed: {message}")
            }
            SessionFault::AlreadyMounted => write!(f, "session already initialized"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MintRequest {
    Submitted,
    /// A mint is already awaiting confirmation.
    Busy,
    NoBinding,
}

#[derive(Debug)]
pub enum SelectorEvent {
    CatalogLoaded {
        epoch: u64,
        result: Result<Vec<RawCharacter>>,
    },
    MintSettled {
        epoch: u64,
        character_index: u64,
        result: Result<MintReceipt>,
    },
    CharacterMinted {
        epoch: u64,
        event: CharacterMinted,
    },
    OwnershipChecked {
        epoch: u64,
        event: CharacterMinted,
        result: Result<RawCharacter>,
    },
}

impl SelectorEvent {
    fn epoch(&self) -> u64 {
        match self {
            SelectorEvent::CatalogLoaded { epoch, .. }
            | SelectorEvent::MintSettled { epoch, .. }
            | SelectorEvent::CharacterMinted { epoch, .. }
            | SelectorEvent::OwnershipChecked { epoch, .. } => *epoch,
        }
    }
}

/// Receives the owned character NFT whenever a mint broadcast is handled.
pub type CharacterNftCallback = Box<dyn FnMut(CharacterData) + Send>;

pub struct CharacterSelector<C: GameContract> {
    config: SelectorConfig,
    binding: Option<Arc<C>>,
    epoch: u64,
    mounted: bool,
    characters: Vec<CharacterData>,
    minting: bool,
    subscription: Option<JoinHandle<()>>,
    set_character_nft: CharacterNftCallback,
    events_tx: mpsc::UnboundedSender<SelectorEvent>,
    events_rx: mpsc::UnboundedReceiver<SelectorEvent>,
}

impl<C: GameContract> CharacterSelector<C> {
    pub fn new(
        config: SelectorConfig,
        set_character_nft: impl FnMut(CharacterData) + Send + 'static,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            binding: None,
            epoch: 0,
            mounted: false,
            characters: Vec::new(),
            minting: false,
            subscription: None,
            set_character_nft: Box::new(set_character_nft),
            events_tx,
            events_rx,
        }
    }

    pub fn characters(&self) -> &[CharacterData] {
        &self.characters
    }

    pub fn is_minting(&self) -> bool {
        self.minting
    }

    pub fn has_binding(&self) -> bool {
        self.binding.is_some()
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Looks for a wallet, derives a signer and binds the contract. Runs once;
    /// later calls do nothing.
    pub async fn mount<E>(&mut self, env: &E) -> Result<(), SessionFault>
    where
        E: WalletEnvironment,
        E::Provider: WalletProvider<Signer = C::Signer>,
    {
        if self.mounted {
            debug!("selector already mounted");
            return Err(SessionFault::AlreadyMounted);
        }
        self.mounted = true;

        let Some(provider) = env.detect() else {
            warn!("wallet provider not found; character catalog stays empty");
            return Err(SessionFault::ProviderUnavailable);
        };
        let signer = provider.signer().await.map_err(|e| {
            warn!(error = %e, "failed to derive signer");
            SessionFault::contract_call(ContractOperation::Signer, &e)
        })?;
        let binding = C::connect(self.config.contract_address, signer).map_err(|e| {
            warn!(error = %e, "failed to bind game contract");
            SessionFault::contract_call(ContractOperation::Connect, &e)
        })?;
        info!(
            contract = %binding.address(),
            signer = %binding.signer_address(),
            "game contract bound"
        );
        self.set_binding(binding).await;
        Ok(())
    }

    /// Replaces the binding: drops the previous subscription, then subscribes
    /// to mint broadcasts and loads the catalog through the new one.
    pub async fn set_binding(&mut self, binding: C) {
        self.teardown().await;
        let binding = Arc::new(binding);
        let epoch = self.epoch;

        let mut subscription = binding.subscribe_minted();
        let tx = self.events_tx.clone();
        self.subscription = Some(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                if tx.send(SelectorEvent::CharacterMinted { epoch, event }).is_err() {
                    break;
                }
            }
        }));

        info!("getting contract characters to mint");
        let tx = self.events_tx.clone();
        let loader = binding.clone();
        tokio::spawn(async move {
            let result = loader.all_default_characters().await;
            let _ = tx.send(SelectorEvent::CatalogLoaded { epoch, result });
        });

        self.binding = Some(binding);
    }

    /// Releases the subscription and the binding.
    pub async fn unmount(&mut self) {
        self.teardown().await;
        self.binding = None;
    }

    /// Releases the current subscription. Replies still owed by the old
    /// binding, including its mint receipt, are dropped as stale, so the mint
    /// flag is cleared here.
    async fn teardown(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.minting = false;
        if let Some(handle) = self.subscription.take() {
            handle.abort();
            // resolves once the task, and with it the subscription, is dropped
            let _ = handle.await;
            debug!("mint subscription released");
        }
    }

    pub fn begin_mint(&mut self, character_index: u64) -> MintRequest {
        let Some(binding) = self.binding.clone() else {
            debug!(character_index, "mint requested without a contract binding");
            return MintRequest::NoBinding;
        };
        if self.minting {
            debug!(character_index, "mint already in progress");
            return MintRequest::Busy;
        }
        self.minting = true;
        info!(character_index, "minting character in progress");

        let epoch = self.epoch;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = binding.mint_character_nft(character_index).await;
            let _ = tx.send(SelectorEvent::MintSettled {
                epoch,
                character_index,
                result,
            });
        });
        MintRequest::Submitted
    }

    /// Waits for the next message from a spawned contract call or from the
    /// mint subscription.
    pub async fn next_event(&mut self) -> Option<SelectorEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<SelectorEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Folds a message into the selector state. Returns a notification when a
    /// minted character has been handed to the parent.
    pub fn apply(&mut self, event: SelectorEvent) -> Option<MintNotification> {
        if event.epoch() != self.epoch {
            trace!(?event, "dropping message from a released binding");
            return None;
        }
        match event {
            SelectorEvent::CatalogLoaded { result, .. } => {
                match result {
                    Ok(raw) => {
                        self.characters = raw.into_iter().map(CharacterData::from).collect();
                        info!(count = self.characters.len(), "character catalog loaded");
                    }
                    Err(e) => {
                        let fault =
                            SessionFault::contract_call(ContractOperation::ListCharacters, &e);
                        warn!(%fault, "keeping previous catalog");
                    }
                }
                None
            }
            SelectorEvent::MintSettled {
                character_index,
                result,
                ..
            } => {
                self.minting = false;
                match result {
                    Ok(receipt) => {
                        info!(character_index, tx_id = ?receipt.tx_id, "mint confirmed");
                    }
                    Err(e) => {
                        let fault = SessionFault::contract_call(ContractOperation::Mint, &e);
                        warn!(character_index, %fault, "mint failed");
                    }
                }
                None
            }
            SelectorEvent::CharacterMinted { epoch, event } => {
                self.on_character_minted(epoch, event);
                None
            }
            SelectorEvent::OwnershipChecked { event, result, .. } => match result {
                Ok(raw) => {
                    let nft = CharacterData::from(raw);
                    info!(token_id = event.token_id, name = %nft.name, "character NFT received");
                    (self.set_character_nft)(nft);
                    Some(MintNotification::new(
                        &self.config.marketplace_url,
                        &self.config.contract_address,
                        event.token_id,
                    ))
                }
                Err(e) => {
                    let fault = SessionFault::contract_call(ContractOperation::CheckOwnership, &e);
                    warn!(token_id = event.token_id, %fault, "ownership re-check failed");
                    None
                }
            },
        }
    }

    fn on_character_minted(&mut self, epoch: u64, event: CharacterMinted) {
        info!(
            sender = %event.sender,
            token_id = event.token_id,
            character_index = event.character_index,
            "CharacterNFTMinted"
        );
        let Some(binding) = self.binding.clone() else {
            return;
        };
        if self.config.mint_event_filter == MintEventFilter::LocalSigner
            && event.sender != binding.signer_address()
        {
            debug!(sender = %event.sender, "ignoring mint sent by another account");
            return;
        }
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = binding.check_if_user_has_nft().await;
            let _ = tx.send(SelectorEvent::OwnershipChecked {
                epoch,
                event,
                result,
            });
        });
    }
}

impl<C: GameContract> Drop for CharacterSelector<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.subscription.take() {
            handle.abort();
        }
    }
}
