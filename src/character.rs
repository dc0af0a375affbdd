use crate::address::AccountId;

/// A character record as the contract returns it.
///
/// The contract stores names and image references in fixed-width strings,
/// so both may carry trailing padding.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawCharacter {
    pub character_index: u64,
    pub name: String,
    pub image_uri: String,
    pub hp: u64,
    pub max_hp: u64,
    pub attack_damage: u64,
}

/// Display record for a mintable template or an owned character NFT.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CharacterData {
    pub name: String,
    pub image_uri: String,
    pub hp: u64,
    pub max_hp: u64,
    pub attack_damage: u64,
}

impl CharacterData {
    /// The contract answers an ownership query with a zeroed record when the
    /// caller holds nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.image_uri.is_empty() && self.max_hp == 0
    }
}

fn unpad(raw: &str) -> String {
    raw.trim_end_matches(['\0', ' ']).trim().to_owned()
}

impl From<RawCharacter> for CharacterData {
    fn from(raw: RawCharacter) -> Self {
        Self {
            name: unpad(&raw.name),
            image_uri: unpad(&raw.image_uri),
            hp: raw.hp,
            max_hp: raw.max_hp,
            attack_damage: raw.attack_damage,
        }
    }
}

/// Broadcast emitted by the contract after every successful mint, whoever
/// submitted it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CharacterMinted {
    pub sender: AccountId,
    pub token_id: u64,
    pub character_index: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MintReceipt {
    pub tx_id: Option<String>,
}
