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
};
use color_eyre::eyre::Result;
use tokio::sync::broadcast::{
    self,
    error::RecvError,
};

const MINT_BROADCAST_CAPACITY: usize = 64;

/// Where a wallet provider may have been injected.
pub trait WalletEnvironment {
    type Provider: WalletProvider;

    /// `None` when no wallet is available; callers degrade instead of failing.
    fn detect(&self) -> Option<Self::Provider>;
}

pub trait WalletProvider {
    type Signer;

    /// derive the signing identity used to bind the game contract
    fn signer(&self) -> impl Future<Output = Result<Self::Signer>>;
}

/// Operations the client consumes from the deployed game contract.
pub trait GameContract: Sized + Send + Sync + 'static {
    type Signer;

    /// bind the contract at `address` to `signer`
    fn connect(address: ContractAddress, signer: Self::Signer) -> Result<Self>;

    fn address(&self) -> ContractAddress;

    fn signer_address(&self) -> AccountId;

    /// read-only; templates in contract order
    fn all_default_characters(
        &self,
    ) -> impl Future<Output = Result<Vec<RawCharacter>>> + Send;

    /// read-only; a zeroed record when the signer holds no character
    fn check_if_user_has_nft(&self) -> impl Future<Output = Result<RawCharacter>> + Send;

    /// Submits the mint and resolves once the transaction is included.
    fn mint_character_nft(
        &self,
        character_index: u64,
    ) -> impl Future<Output = Result<MintReceipt>> + Send;

    fn subscribe_minted(&self) -> MintSubscription;
}

/// Fan-out of [`CharacterMinted`] broadcasts to every live subscription.
#[derive(Clone, Debug)]
pub struct MintBroadcaster {
    sender: broadcast::Sender<CharacterMinted>,
}

impl Default for MintBroadcaster {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(MINT_BROADCAST_CAPACITY);
        Self { sender }
    }
}

impl MintBroadcaster {
    /// Returns the number of subscriptions the event reached.
    pub fn publish(&self, event: CharacterMinted) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> MintSubscription {
        MintSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A standing listener for mint broadcasts. Dropping it unsubscribes.
#[derive(Debug)]
pub struct MintSubscription {
    receiver: broadcast::Receiver<CharacterMinted>,
}

impl MintSubscription {
    /// `None` once the broadcaster is gone.
    pub async fn next(&mut self) -> Option<CharacterMinted> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "mint subscription lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    fn minted(token_id: u64) -> CharacterMinted {
        CharacterMinted {
            sender: AccountId([1; 32]),
            token_id,
            character_index: 0,
        }
    }

    #[tokio::test]
    async fn publish__reaches_every_subscription() {
        // given
        let broadcaster = MintBroadcaster::default();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        // when
        let reached = broadcaster.publish(minted(3));

        // then
        assert_eq!(reached, 2);
        assert_eq!(first.next().await, Some(minted(3)));
        assert_eq!(second.next().await, Some(minted(3)));
    }

    #[test]
    fn subscriber_count__drops_with_subscription() {
        let broadcaster = MintBroadcaster::default();
        let subscription = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(subscription);

        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(minted(1)), 0);
    }

    #[tokio::test]
    async fn next__ends_when_broadcaster_is_dropped() {
        let broadcaster = MintBroadcaster::default();
        let mut subscription = broadcaster.subscribe();

        drop(broadcaster);

        assert_eq!(subscription.next().await, None);
    }
}
