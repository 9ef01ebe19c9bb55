// Raffle program address derivations
use solana_program::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

pub const VAULT_SEED: &[u8] = b"vault";
pub const FEED_SEED: &[u8] = b"feed";
pub const PLAYER_SEED: &[u8] = b"player";

/// PDA that owns every pooled token account of a raffle and signs its VRF requests
pub fn find_vault_authority(program_id: &Pubkey, raffle: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, raffle.as_ref()], program_id)
}

/// Token account holding the pooled balance of `mint` for a raffle
pub fn vault_token_address(program_id: &Pubkey, raffle: &Pubkey, mint: &Pubkey) -> Pubkey {
    let (authority, _) = find_vault_authority(program_id, raffle);
    get_associated_token_address(&authority, mint)
}

/// Feed registration of `mint` with a price oracle
pub fn find_feed_record_address(program_id: &Pubkey, oracle: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[FEED_SEED, oracle.as_ref(), mint.as_ref()], program_id)
}

/// Holdings record of `player` in a raffle
pub fn find_player_address(program_id: &Pubkey, raffle: &Pubkey, player: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PLAYER_SEED, raffle.as_ref(), player.as_ref()], program_id)
}
