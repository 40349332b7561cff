// Pooled Lottery Program - Constants

/// Fixed entry fee in lamports (0.1 SOL)
pub const ENTRY_FEE: u64 = 100_000_000;

/// Minimum number of entries before a winner can be picked
pub const MIN_PARTICIPANTS: usize = 3;

/// Participant slots allocated when the ledger account is created
pub const INITIAL_PARTICIPANT_SLOTS: usize = 16;

/// Slots added each time the ledger account runs out of room
pub const PARTICIPANT_GROWTH_SLOTS: usize = 32;

/// Max participants returned by one GetParticipants call.
/// 4 + 30 * 32 = 964 bytes, under the 1024 byte return data limit.
pub const PARTICIPANTS_PAGE_SIZE: usize = 30;

/// Seed prefix of the per-round prize claim address
pub const PRIZE_CLAIM_SEED: &[u8] = b"prize";
