use crate::ui;
use color_eyre::eyre::Result;
use epic_game_client::{
    CharacterData,
    CharacterSelector,
    MintRequest,
    config::AppConfig,
    fuel::FuelGameContract,
};
use tokio::sync::watch;
use tracing::{
    info,
    warn,
};

type Selector = CharacterSelector<FuelGameContract>;

/// Owned-NFT slot the selector writes through its callback.
struct NftSlot(watch::Receiver<Option<CharacterData>>);

fn selector_with_slot(config: &AppConfig) -> (Selector, NftSlot) {
    let (tx, rx) = watch::channel(None);
    let selector = CharacterSelector::new(config.selector.clone(), move |nft| {
        tx.send_replace(Some(nft));
    });
    (selector, NftSlot(rx))
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (mut selector, mut slot) = selector_with_slot(&config);

    // mount may prompt for the keystore password, so it runs before the
    // terminal switches to raw mode
    let mut status = match selector.mount(&config.wallet).await {
        Ok(()) => format!(
            "{} | wallet '{}' | contract {}",
            config.network,
            config.wallet.wallet_name,
            config.selector.contract_address
        ),
        Err(fault) => {
            warn!(%fault, "running without a contract binding");
            format!("{} | not connected: {fault}", config.network)
        }
    };

    let mut ui_state = ui::UiState::default();
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut selector, &mut slot, &mut ui_state, &mut status).await;
    ui::terminal_exit(&mut ui_state)?;
    selector.unmount().await;
    info!("epic-game client stopped");
    res
}

async fn run_loop(
    selector: &mut Selector,
    slot: &mut NftSlot,
    ui_state: &mut ui::UiState,
    status: &mut String,
) -> Result<()> {
    let mut input = ui::spawn_input_reader();
    redraw(selector, slot, ui_state, status)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            Some(event) = selector.next_event() => {
                if let Some(notification) = selector.apply(event) {
                    ui_state.show_notification(notification);
                }
            }
            Ok(()) = slot.0.changed() => {}
            ev = input.recv() => {
                let Some(ev) = ev else { break };
                match ui::handle_event(ui_state, ev, selector.characters().len()) {
                    Some(ui::UserEvent::Quit) => break,
                    Some(ui::UserEvent::Mint(index)) => {
                        *status = mint_status(selector, index);
                    }
                    Some(ui::UserEvent::Redraw) => {}
                    None => continue,
                }
            }
        }
        redraw(selector, slot, ui_state, status)?;
    }
    Ok(())
}

fn mint_status(selector: &mut Selector, index: u64) -> String {
    let name = selector
        .characters()
        .get(index as usize)
        .map(|character| character.name.clone())
        .unwrap_or_else(|| format!("#{index}"));
    match selector.begin_mint(index) {
        MintRequest::Submitted => format!("Minting {name}"),
        MintRequest::Busy => String::from("A mint is already in progress"),
        MintRequest::NoBinding => String::from("No wallet connected; cannot mint"),
    }
}

fn redraw(
    selector: &Selector,
    slot: &NftSlot,
    ui_state: &mut ui::UiState,
    status: &str,
) -> Result<()> {
    let owned = slot.0.borrow().clone();
    let snap = ui::Snapshot {
        characters: selector.characters(),
        minting: selector.is_minting(),
        owned: owned.as_ref(),
        status,
    };
    ui::draw(ui_state, &snap)
}
