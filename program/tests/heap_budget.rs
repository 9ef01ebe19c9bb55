// Heap use of a full-size raffle, measured with an allocator that never
// frees, like the on-chain bump heap.
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use solana_program::{entrypoint::HEAP_LENGTH, pubkey::Pubkey};

use chance_raffle::{
    collaborator::{RandomnessSource, TokenVault},
    raffle_error::RaffleError,
    raffle_state::{
        Raffle, RaffleConfig, RaffleStatus, TokenEntry, MAX_TOKENS_PER_RAFFLE, STATE_HEAP_BUDGET,
    },
};

struct BumpCounter;

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for BumpCounter {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATED.fetch_add(layout.size(), Ordering::SeqCst);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATED.fetch_add(new_size, Ordering::SeqCst);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: BumpCounter = BumpCounter;

struct FixedRequest;

impl RandomnessSource for FixedRequest {
    fn request(&mut self) -> Result<u128, RaffleError> {
        Ok(1)
    }
}

struct AcceptingVault;

impl TokenVault for AcceptingVault {
    fn take_deposit(&mut self, _: &Pubkey, _: &Pubkey, _: u64, _: u64) -> Result<(), RaffleError> {
        Ok(())
    }

    fn pay_out(&mut self, _: &Pubkey, _: &Pubkey, _: u64) -> Result<(), RaffleError> {
        Ok(())
    }

    fn pay_fee(&mut self, _: &Pubkey, _: u64) -> Result<(), RaffleError> {
        Ok(())
    }
}

#[test]
fn full_raffle_loads_and_settles_within_the_program_heap() {
    let max_tokens = MAX_TOKENS_PER_RAFFLE;
    let max_players = Raffle::max_players_for(max_tokens);
    let admin = Pubkey::new_unique();
    let config = RaffleConfig {
        max_players,
        max_tokens,
        ticket_fee: 1_000,
        price_oracle: Pubkey::new_unique(),
        randomness_oracle: Pubkey::new_unique(),
        fee_recipient: Pubkey::new_unique(),
    };
    config.validate_account_limits().unwrap();

    let mut raffle = Raffle::new(admin, config).unwrap();
    for _ in 0..max_tokens {
        raffle.tokens.push(TokenEntry {
            mint: Pubkey::new_unique(),
            decimals: 9,
            is_registered_with_price_oracle: true,
            pooled: u64::MAX,
        });
    }
    for _ in 0..max_players {
        raffle
            .ledger
            .add_chance(&Pubkey::new_unique(), 1_000_000)
            .unwrap();
    }
    raffle.collected_fee = max_players as u64 * 1_000;
    raffle.request_draw(&admin, &mut FixedRequest).unwrap();

    let mut data = vec![0u8; Raffle::space(max_players, max_tokens)];
    raffle.save(&mut data).unwrap();

    ALLOCATED.store(0, Ordering::SeqCst);
    let mut loaded = Raffle::load(&data).unwrap();
    let settlement = loaded.fulfill(1, 12_345, &mut AcceptingVault).unwrap();
    loaded.save(&mut data).unwrap();
    let allocated = ALLOCATED.load(Ordering::SeqCst);

    assert_eq!(settlement.tokens.len(), max_tokens as usize);
    assert_eq!(loaded.status, RaffleStatus::Resolved);
    // account infos of a full fulfilment transaction take under 8 KiB
    assert!(
        allocated + 8 * 1024 <= HEAP_LENGTH,
        "fulfilment allocated {} bytes",
        allocated
    );
    assert!(Raffle::heap_footprint(max_players, max_tokens) <= STATE_HEAP_BUDGET);
}
