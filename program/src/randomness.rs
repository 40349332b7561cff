// Pooled Lottery Program - Randomness
use solana_program::{clock::Clock, hash::hashv, pubkey::Pubkey};

/// Source of the winning slot index.
///
/// Implementations must return a value in `[0, upper)` for `upper > 0`.
pub trait RandomnessSource {
    fn draw_index(&mut self, upper: u64) -> u64;
}

/// Reduce a seed to a value in `[0, max)` using its first 8 bytes
pub fn generate_random_value(seed: &[u8], max: u64) -> u64 {
    if max == 0 {
        return 0;
    }

    let mut bytes = [0u8; 8];
    let len = std::cmp::min(seed.len(), 8);
    bytes[..len].copy_from_slice(&seed[..len]);

    u64::from_le_bytes(bytes) % max
}

/// Entropy derived from the clock sysvar, the ledger address and the entries.
///
/// Predictable to a validator that controls slot production. Swap in a
/// verifiable source through `RandomnessSource` where that matters.
pub struct ClockEntropy {
    seed: [u8; 32],
}

impl ClockEntropy {
    pub fn new(clock: &Clock, ledger: &Pubkey, participants: &[Pubkey]) -> Self {
        let slot = clock.slot.to_le_bytes();
        let timestamp = clock.unix_timestamp.to_le_bytes();

        let mut inputs: Vec<&[u8]> = Vec::with_capacity(participants.len() + 3);
        inputs.push(&slot);
        inputs.push(&timestamp);
        inputs.push(ledger.as_ref());
        inputs.extend(participants.iter().map(|participant| participant.as_ref()));

        Self {
            seed: hashv(&inputs).to_bytes(),
        }
    }
}

impl RandomnessSource for ClockEntropy {
    fn draw_index(&mut self, upper: u64) -> u64 {
        let index = generate_random_value(&self.seed, upper);
        // re-hash so consecutive draws differ
        self.seed = hashv(&[&self.seed]).to_bytes();
        index
    }
}
