//! In-memory stand-ins for the wallet and the deployed game contract.

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
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

pub const GAME_CONTRACT: ContractAddress = ContractAddress([0xe1; 32]);

pub fn alice() -> AccountId {
    AccountId([0xa1; 32])
}

pub fn bob() -> AccountId {
    AccountId([0xb0; 32])
}

pub fn template(character_index: u64, name: &str) -> RawCharacter {
    RawCharacter {
        character_index,
        name: format!("{name}\0\0\0\0"),
        image_uri: format!("https://i.imgur.com/{name}.png"),
        hp: 100 + character_index * 50,
        max_hp: 100 + character_index * 50,
        attack_damage: 10 + character_index * 5,
    }
}

pub fn default_templates() -> Vec<RawCharacter> {
    vec![
        template(0, "Leo"),
        template(1, "Aang"),
        template(2, "Pikachu"),
    ]
}

#[derive(Default)]
struct ChainState {
    templates: Vec<RawCharacter>,
    holdings: HashMap<AccountId, (u64, u64)>,
    next_token_id: u64,
    fail_catalog: bool,
    fail_ownership: bool,
    fail_mints: bool,
    catalog_calls: usize,
    ownership_calls: usize,
    mint_calls: Vec<(AccountId, u64)>,
}

/// A shared game contract every [`LocalGameContract`] binds to.
#[derive(Clone)]
pub struct LocalChain {
    state: Arc<Mutex<ChainState>>,
    minted: MintBroadcaster,
}

impl LocalChain {
    pub fn new(templates: Vec<RawCharacter>) -> Self {
        let state = ChainState {
            templates,
            next_token_id: 1,
            ..ChainState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            minted: MintBroadcaster::default(),
        }
    }

    pub fn with_default_templates() -> Self {
        Self::new(default_templates())
    }

    pub fn wallet(&self, account: AccountId) -> InjectedWallet {
        InjectedWallet {
            provider: Some(LocalWalletProvider {
                chain: self.clone(),
                account,
                fail_signer: false,
            }),
        }
    }

    pub fn binding(&self, account: AccountId) -> LocalGameContract {
        LocalGameContract {
            address: GAME_CONTRACT,
            chain: self.clone(),
            account,
        }
    }

    /// Emits a mint broadcast without touching holdings, as a mint from a
    /// client outside the test would.
    pub fn emit(&self, event: CharacterMinted) -> usize {
        self.minted.publish(event)
    }

    pub fn give(&self, account: AccountId, token_id: u64, character_index: u64) {
        let mut state = self.state.lock().unwrap();
        state.holdings.insert(account, (token_id, character_index));
    }

    pub fn set_next_token_id(&self, token_id: u64) {
        self.state.lock().unwrap().next_token_id = token_id;
    }

    pub fn fail_catalog(&self) {
        self.state.lock().unwrap().fail_catalog = true;
    }

    pub fn fail_ownership(&self) {
        self.state.lock().unwrap().fail_ownership = true;
    }

    pub fn fail_mints(&self) {
        self.state.lock().unwrap().fail_mints = true;
    }

    pub fn catalog_calls(&self) -> usize {
        self.state.lock().unwrap().catalog_calls
    }

    pub fn ownership_calls(&self) -> usize {
        self.state.lock().unwrap().ownership_calls
    }

    pub fn mint_calls(&self) -> Vec<(AccountId, u64)> {
        self.state.lock().unwrap().mint_calls.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.minted.subscriber_count()
    }
}

/// Wallet environment with an optional injected provider.
pub struct InjectedWallet {
    provider: Option<LocalWalletProvider>,
}

impl InjectedWallet {
    pub fn absent() -> Self {
        Self { provider: None }
    }

    pub fn with_failing_signer(mut self) -> Self {
        if let Some(provider) = self.provider.as_mut() {
            provider.fail_signer = true;
        }
        self
    }
}

impl WalletEnvironment for InjectedWallet {
    type Provider = LocalWalletProvider;

    fn detect(&self) -> Option<Self::Provider> {
        self.provider.clone()
    }
}

#[derive(Clone)]
pub struct LocalWalletProvider {
    chain: LocalChain,
    account: AccountId,
    fail_signer: bool,
}

pub struct LocalSigner {
    chain: LocalChain,
    account: AccountId,
}

impl WalletProvider for LocalWalletProvider {
    type Signer = LocalSigner;

    async fn signer(&self) -> Result<LocalSigner> {
        if self.fail_signer {
            return Err(eyre!("user rejected the connection request"));
        }
        Ok(LocalSigner {
            chain: self.chain.clone(),
            account: self.account,
        })
    }
}

pub struct LocalGameContract {
    address: ContractAddress,
    chain: LocalChain,
    account: AccountId,
}

impl GameContract for LocalGameContract {
    type Signer = LocalSigner;

    fn connect(address: ContractAddress, signer: LocalSigner) -> Result<Self> {
        Ok(Self {
            address,
            chain: signer.chain,
            account: signer.account,
        })
    }

    fn address(&self) -> ContractAddress {
        self.address
    }

    fn signer_address(&self) -> AccountId {
        self.account
    }

    async fn all_default_characters(&self) -> Result<Vec<RawCharacter>> {
        let mut state = self.chain.state.lock().unwrap();
        state.catalog_calls += 1;
        if state.fail_catalog {
            return Err(eyre!("call reverted: getAllDefaultCharacters"));
        }
        Ok(state.templates.clone())
    }

    async fn check_if_user_has_nft(&self) -> Result<RawCharacter> {
        let mut state = self.chain.state.lock().unwrap();
        state.ownership_calls += 1;
        if state.fail_ownership {
            return Err(eyre!("call reverted: checkIfUserHasNFT"));
        }
        let owned = state
            .holdings
            .get(&self.account)
            .and_then(|(_, index)| state.templates.get(*index as usize))
            .cloned()
            .unwrap_or_default();
        Ok(owned)
    }

    async fn mint_character_nft(&self, character_index: u64) -> Result<MintReceipt> {
        let event = {
            let mut state = self.chain.state.lock().unwrap();
            state.mint_calls.push((self.account, character_index));
            if state.fail_mints {
                return Err(eyre!("transaction reverted: mintCharacterNFT"));
            }
            if character_index as usize >= state.templates.len() {
                return Err(eyre!("unknown character index {character_index}"));
            }
            let token_id = state.next_token_id;
            state.next_token_id += 1;
            state
                .holdings
                .insert(self.account, (token_id, character_index));
            CharacterMinted {
                sender: self.account,
                token_id,
                character_index,
            }
        };
        self.chain.minted.publish(event);
        Ok(MintReceipt {
            tx_id: Some(format!("0x{:064x}", event.token_id)),
        })
    }

    fn subscribe_minted(&self) -> MintSubscription {
        self.chain.minted.subscribe()
    }
}
