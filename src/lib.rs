pub mod address;
pub mod character;
pub mod config;
pub mod contract;
pub mod deployment;
pub mod fuel;
pub mod notification;
pub mod selector;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub mod epic_game_types {
    use fuels::macros::abigen;

    abigen!(Contract(
        name = "EpicGame",
        abi = "sway-projects/epic-game/out/release/epic-game-abi.json"
    ));
}

pub use address::{
    AccountId,
    ContractAddress,
};
pub use character::{
    CharacterData,
    CharacterMinted,
    MintReceipt,
    RawCharacter,
};
pub use contract::{
    GameContract,
    MintBroadcaster,
    MintSubscription,
    WalletEnvironment,
    WalletProvider,
};
pub use notification::MintNotification;
pub use selector::{
    CharacterSelector,
    MintEventFilter,
    MintRequest,
    SelectorConfig,
    SelectorEvent,
    SessionFault,
};
