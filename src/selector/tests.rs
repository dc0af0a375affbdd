#![allow(non_snake_case)]

use super::*;
use crate::{
    address::AccountId,
    test_helpers::{
        GAME_CONTRACT,
        InjectedWallet,
        LocalChain,
        LocalGameContract,
        alice,
        bob,
        template,
    },
};
use std::sync::Mutex;

type Received = Arc<Mutex<Vec<CharacterData>>>;

fn selector_with(config: SelectorConfig) -> (CharacterSelector<LocalGameContract>, Received) {
    let received: Received = Arc::default();
    let sink = received.clone();
    let selector = CharacterSelector::new(config, move |nft| {
        sink.lock().unwrap().push(nft);
    });
    (selector, received)
}

async fn mounted_with(
    chain: &LocalChain,
    account: AccountId,
    config: SelectorConfig,
) -> (CharacterSelector<LocalGameContract>, Received) {
    let (mut selector, received) = selector_with(config);
    selector.mount(&chain.wallet(account)).await.unwrap();
    let loaded = selector.next_event().await.unwrap();
    assert!(matches!(loaded, SelectorEvent::CatalogLoaded { .. }));
    selector.apply(loaded);
    (selector, received)
}

async fn mounted(
    chain: &LocalChain,
    account: AccountId,
) -> (CharacterSelector<LocalGameContract>, Received) {
    mounted_with(chain, account, SelectorConfig::new(GAME_CONTRACT)).await
}

async fn settle_mint(selector: &mut CharacterSelector<LocalGameContract>) {
    while selector.is_minting() {
        let event = selector.next_event().await.unwrap();
        selector.apply(event);
    }
}

fn minted(sender: AccountId, token_id: u64, character_index: u64) -> CharacterMinted {
    CharacterMinted {
        sender,
        token_id,
        character_index,
    }
}

fn names(selector: &CharacterSelector<LocalGameContract>) -> Vec<String> {
    selector
        .characters()
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

#[tokio::test]
async fn mount__without_wallet_provider_leaves_catalog_empty() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, _) = selector_with(SelectorConfig::new(GAME_CONTRACT));

    // when
    let outcome = selector.mount(&InjectedWallet::absent()).await;

    // then
    assert_eq!(outcome, Err(SessionFault::ProviderUnavailable));
    assert!(!selector.has_binding());
    assert!(selector.characters().is_empty());
    assert_eq!(chain.catalog_calls(), 0);
    assert!(selector.try_next_event().is_none());
}

#[tokio::test]
async fn mount__loads_catalog_in_contract_order() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, _) = selector_with(SelectorConfig::new(GAME_CONTRACT));

    // when
    selector.mount(&chain.wallet(alice())).await.unwrap();
    let event = selector.next_event().await.unwrap();
    let notification = selector.apply(event);

    // then
    assert!(notification.is_none());
    assert!(selector.has_binding());
    assert_eq!(names(&selector), vec!["Leo", "Aang", "Pikachu"]);
    assert_eq!(selector.characters()[2], CharacterData::from(template(2, "Pikachu")));
    assert_eq!(chain.catalog_calls(), 1);
    assert_eq!(chain.subscriber_count(), 1);
}

#[tokio::test]
async fn mount__runs_only_once() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, _) = mounted(&chain, alice()).await;

    // when
    let outcome = selector.mount(&chain.wallet(bob())).await;

    // then
    assert_eq!(outcome, Err(SessionFault::AlreadyMounted));
    assert_eq!(chain.catalog_calls(), 1);
    assert_eq!(chain.subscriber_count(), 1);
}

#[tokio::test]
async fn mount__signer_failure_leaves_no_binding() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, _) = selector_with(SelectorConfig::new(GAME_CONTRACT));

    // when
    let outcome = selector
        .mount(&chain.wallet(alice()).with_failing_signer())
        .await;

    // then
    assert!(matches!(
        outcome,
        Err(SessionFault::ContractCallFailed {
            operation: ContractOperation::Signer,
            ..
        })
    ));
    assert!(!selector.has_binding());
    assert_eq!(selector.begin_mint(0), MintRequest::NoBinding);
}

#[tokio::test]
async fn apply__catalog_failure_keeps_catalog_empty() {
    // given
    let chain = LocalChain::with_default_templates();
    chain.fail_catalog();
    let (mut selector, _) = selector_with(SelectorConfig::new(GAME_CONTRACT));
    selector.mount(&chain.wallet(alice())).await.unwrap();

    // when
    let event = selector.next_event().await.unwrap();
    selector.apply(event);

    // then
    assert!(selector.has_binding());
    assert!(selector.characters().is_empty());
}

#[tokio::test]
async fn begin_mint__without_binding_is_a_no_op() {
    let (mut selector, _) = selector_with(SelectorConfig::new(GAME_CONTRACT));

    assert_eq!(selector.begin_mint(1), MintRequest::NoBinding);
    assert!(!selector.is_minting());
    assert!(selector.try_next_event().is_none());
}

#[tokio::test]
async fn begin_mint__sets_flag_until_receipt_is_confirmed() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, _) = mounted(&chain, alice()).await;
    let catalog_before = selector.characters().to_vec();

    // when
    let request = selector.begin_mint(1);

    // then
    assert_eq!(request, MintRequest::Submitted);
    assert!(selector.is_minting());
    settle_mint(&mut selector).await;
    assert!(!selector.is_minting());
    assert_eq!(chain.mint_calls(), vec![(alice(), 1)]);
    assert_eq!(selector.characters(), catalog_before.as_slice());
}

#[tokio::test]
async fn begin_mint__clears_flag_when_mint_fails() {
    // given
    let chain = LocalChain::with_default_templates();
    chain.fail_mints();
    let (mut selector, received) = mounted(&chain, alice()).await;

    // when
    selector.begin_mint(0);
    settle_mint(&mut selector).await;

    // then
    assert!(!selector.is_minting());
    assert_eq!(chain.mint_calls(), vec![(alice(), 0)]);
    assert_eq!(names(&selector).len(), 3);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn begin_mint__rejects_second_mint_while_first_is_pending() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, _) = mounted(&chain, alice()).await;
    assert_eq!(selector.begin_mint(0), MintRequest::Submitted);

    // when
    let second = selector.begin_mint(1);

    // then
    assert_eq!(second, MintRequest::Busy);
    settle_mint(&mut selector).await;
    assert_eq!(chain.mint_calls(), vec![(alice(), 0)]);
    assert_eq!(selector.begin_mint(1), MintRequest::Submitted);
}

#[tokio::test]
async fn apply__minted_event_hands_owned_character_to_parent() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, received) = mounted(&chain, alice()).await;
    chain.give(alice(), 42, 1);

    // when
    chain.emit(minted(alice(), 42, 1));
    let event = selector.next_event().await.unwrap();
    assert!(selector.apply(event).is_none());
    let event = selector.next_event().await.unwrap();
    let notification = selector.apply(event);

    // then
    let notification = notification.expect("notification after ownership check");
    assert_eq!(chain.ownership_calls(), 1);
    assert_eq!(
        *received.lock().unwrap(),
        vec![CharacterData::from(template(1, "Aang"))]
    );
    assert_eq!(notification.token_id, 42);
    assert!(notification.message.contains(&GAME_CONTRACT.to_string()));
    assert!(notification.url.ends_with("/42"));
}

#[tokio::test]
async fn apply__local_mint_round_trip_invokes_parent_once() {
    // given
    let chain = LocalChain::with_default_templates();
    chain.set_next_token_id(7);
    let (mut selector, received) = mounted(&chain, alice()).await;

    // when
    selector.begin_mint(2);
    let mut notifications = Vec::new();
    while notifications.is_empty() || selector.is_minting() {
        let event = selector.next_event().await.unwrap();
        notifications.extend(selector.apply(event));
    }

    // then
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].token_id, 7);
    assert_eq!(received.lock().unwrap().len(), 1);
    assert_eq!(received.lock().unwrap()[0].name, "Pikachu");
}

#[tokio::test]
async fn apply__reacts_to_other_senders_by_default() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, received) = mounted(&chain, alice()).await;

    // when
    chain.emit(minted(bob(), 3, 0));
    let event = selector.next_event().await.unwrap();
    selector.apply(event);
    let event = selector.next_event().await.unwrap();
    let notification = selector.apply(event);

    // then
    assert_eq!(chain.ownership_calls(), 1);
    assert!(notification.is_some());
    // alice holds nothing, so the parent receives the zeroed answer
    assert!(received.lock().unwrap()[0].is_empty());
}

#[tokio::test]
async fn apply__local_signer_filter_ignores_other_senders() {
    // given
    let chain = LocalChain::with_default_templates();
    let config = SelectorConfig {
        mint_event_filter: MintEventFilter::LocalSigner,
        ..SelectorConfig::new(GAME_CONTRACT)
    };
    let (mut selector, received) = mounted_with(&chain, alice(), config).await;

    // when
    chain.emit(minted(bob(), 3, 0));
    let event = selector.next_event().await.unwrap();
    let notification = selector.apply(event);
    tokio::task::yield_now().await;

    // then
    assert!(notification.is_none());
    assert!(selector.try_next_event().is_none());
    assert_eq!(chain.ownership_calls(), 0);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn apply__ownership_failure_skips_parent_and_notification() {
    // given
    let chain = LocalChain::with_default_templates();
    chain.fail_ownership();
    let (mut selector, received) = mounted(&chain, alice()).await;

    // when
    chain.emit(minted(alice(), 5, 0));
    let event = selector.next_event().await.unwrap();
    selector.apply(event);
    let event = selector.next_event().await.unwrap();
    let notification = selector.apply(event);

    // then
    assert!(notification.is_none());
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unmount__releases_subscription_and_stops_callbacks() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, received) = mounted(&chain, alice()).await;
    assert_eq!(chain.subscriber_count(), 1);

    // when
    selector.unmount().await;
    let reached = chain.emit(minted(alice(), 9, 0));
    tokio::task::yield_now().await;

    // then
    assert_eq!(chain.subscriber_count(), 0);
    assert_eq!(reached, 0);
    assert!(selector.try_next_event().is_none());
    assert!(!selector.has_binding());
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn apply__drops_events_delivered_before_teardown() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, received) = mounted(&chain, alice()).await;
    chain.emit(minted(alice(), 11, 0));
    let stale = selector.next_event().await.unwrap();

    // when
    selector.unmount().await;
    let notification = selector.apply(stale);

    // then
    assert!(notification.is_none());
    assert_eq!(chain.ownership_calls(), 0);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn set_binding__resubscribes_through_the_new_binding() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, received) = mounted(&chain, alice()).await;
    chain.give(bob(), 12, 2);

    // when
    selector.set_binding(chain.binding(bob())).await;
    let loaded = selector.next_event().await.unwrap();
    selector.apply(loaded);
    chain.emit(minted(bob(), 12, 2));
    let event = selector.next_event().await.unwrap();
    selector.apply(event);
    let event = selector.next_event().await.unwrap();
    selector.apply(event);

    // then
    assert_eq!(chain.subscriber_count(), 1);
    assert_eq!(chain.catalog_calls(), 2);
    assert_eq!(
        *received.lock().unwrap(),
        vec![CharacterData::from(template(2, "Pikachu"))]
    );
}

async fn drain_until_catalog(selector: &mut CharacterSelector<LocalGameContract>) {
    loop {
        let event = selector.next_event().await.unwrap();
        let loaded = matches!(event, SelectorEvent::CatalogLoaded { .. });
        selector.apply(event);
        if loaded {
            break;
        }
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    while let Some(event) = selector.try_next_event() {
        selector.apply(event);
    }
}

#[tokio::test]
async fn set_binding__clears_flag_of_mint_pending_on_old_binding() {
    // given
    let chain = LocalChain::with_default_templates();
    let (mut selector, _) = mounted(&chain, alice()).await;
    assert_eq!(selector.begin_mint(0), MintRequest::Submitted);

    // when
    selector.set_binding(chain.binding(bob())).await;
    drain_until_catalog(&mut selector).await;

    // then
    assert!(!selector.is_minting());
    assert_eq!(selector.begin_mint(1), MintRequest::Submitted);
    settle_mint(&mut selector).await;
    assert!(!selector.is_minting());
    assert!(chain.mint_calls().contains(&(bob(), 1)));
}

#[tokio::test]
async fn set_binding__drops_ownership_answer_owed_by_old_binding() {
    // given
    let chain = LocalChain::with_default_templates();
    chain.give(alice(), 5, 1);
    let (mut selector, received) = mounted(&chain, alice()).await;
    chain.emit(minted(alice(), 5, 1));
    let heard = selector.next_event().await.unwrap();
    assert!(selector.apply(heard).is_none());

    // when
    selector.set_binding(chain.binding(bob())).await;
    drain_until_catalog(&mut selector).await;

    // then
    assert_eq!(chain.ownership_calls(), 1);
    assert!(received.lock().unwrap().is_empty());
    assert_eq!(chain.subscriber_count(), 1);
}
