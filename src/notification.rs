use crate::address::ContractAddress;

pub const DEFAULT_MARKETPLACE_URL: &str =
    "https://testnets.opensea.io/assets/{contract}/{token_id}";

/// Fills the `{contract}` and `{token_id}` placeholders of a marketplace URL
/// template.
pub fn marketplace_url(template: &str, contract: &ContractAddress, token_id: u64) -> String {
    template
        .replace("{contract}", &contract.to_string())
        .replace("{token_id}", &token_id.to_string())
}

/// Message shown to the player once a minted character has been picked up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintNotification {
    pub token_id: u64,
    pub url: String,
    pub message: String,
}

impl MintNotification {
    pub fn new(template: &str, contract: &ContractAddress, token_id: u64) -> Self {
        let url = marketplace_url(template, contract, token_id);
        let message = format!("Your NFT is all done -- see it here: {url}");
        Self {
            token_id,
            url,
            message,
        }
    }
}
