// Pooled Lottery Program - State
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};

use crate::{constants::PRIZE_CLAIM_SEED, error::LotteryError};

/// Fixed-size header at the start of the ledger account.
/// Participant slots (32 bytes each) follow it directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerHeader {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Identity allowed to query the pool and pick winners
    pub manager: Pubkey,
    /// Required entry amount in lamports
    pub entry_fee: u64,
    /// Lamports collected since the last payout
    pub pooled_balance: u64,
    /// Number of completed payouts
    pub round: u64,
    /// Winner of the previous round (zero before the first payout)
    pub last_winner: Pubkey,
    /// Number of occupied participant slots
    pub participant_count: u32,
}

impl Sealed for LedgerHeader {}

impl IsInitialized for LedgerHeader {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for LedgerHeader {
    const LEN: usize = 1 + 32 + 8 + 8 + 8 + 32 + 4;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, LedgerHeader::LEN];
        let (is_initialized, manager, entry_fee, pooled_balance, round, last_winner, participant_count) =
            array_refs![src, 1, 32, 8, 8, 8, 32, 4];

        let is_initialized = match is_initialized[0] {
            0 => false,
            1 => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(LedgerHeader {
            is_initialized,
            manager: Pubkey::new_from_array(*manager),
            entry_fee: u64::from_le_bytes(*entry_fee),
            pooled_balance: u64::from_le_bytes(*pooled_balance),
            round: u64::from_le_bytes(*round),
            last_winner: Pubkey::new_from_array(*last_winner),
            participant_count: u32::from_le_bytes(*participant_count),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, LedgerHeader::LEN];
        let (
            is_initialized_dst,
            manager_dst,
            entry_fee_dst,
            pooled_balance_dst,
            round_dst,
            last_winner_dst,
            participant_count_dst,
        ) = mut_array_refs![dst, 1, 32, 8, 8, 8, 32, 4];

        is_initialized_dst[0] = self.is_initialized as u8;
        manager_dst.copy_from_slice(self.manager.as_ref());
        *entry_fee_dst = self.entry_fee.to_le_bytes();
        *pooled_balance_dst = self.pooled_balance.to_le_bytes();
        *round_dst = self.round.to_le_bytes();
        last_winner_dst.copy_from_slice(self.last_winner.as_ref());
        *participant_count_dst = self.participant_count.to_le_bytes();
    }
}

/// Account size needed to hold `slots` participants
pub fn account_space(slots: usize) -> usize {
    LedgerHeader::LEN + slots * PUBKEY_BYTES
}

/// Number of participant slots an account of `data_len` bytes can hold
pub fn slot_capacity(data_len: usize) -> usize {
    data_len.saturating_sub(LedgerHeader::LEN) / PUBKEY_BYTES
}

/// Escrow record for one round's prize, stored at the address from
/// [`find_prize_claim_address`]. Holds the prize lamports until the winner
/// claims them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrizeClaim {
    pub is_initialized: bool,
    /// Ledger the prize was drawn from
    pub ledger: Pubkey,
    /// Round the prize closes (the ledger's round before the draw)
    pub round: u64,
    pub winner: Pubkey,
    /// Lamports owed to the winner
    pub prize: u64,
    /// Account that funded the escrow's rent, refunded on claim
    pub rent_payer: Pubkey,
    /// Lamports `rent_payer` put in
    pub rent_deposit: u64,
}

impl Sealed for PrizeClaim {}

impl IsInitialized for PrizeClaim {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for PrizeClaim {
    const LEN: usize = 1 + 32 + 8 + 32 + 8 + 32 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, PrizeClaim::LEN];
        let (is_initialized, ledger, round, winner, prize, rent_payer, rent_deposit) =
            array_refs![src, 1, 32, 8, 32, 8, 32, 8];

        let is_initialized = match is_initialized[0] {
            0 => false,
            1 => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(PrizeClaim {
            is_initialized,
            ledger: Pubkey::new_from_array(*ledger),
            round: u64::from_le_bytes(*round),
            winner: Pubkey::new_from_array(*winner),
            prize: u64::from_le_bytes(*prize),
            rent_payer: Pubkey::new_from_array(*rent_payer),
            rent_deposit: u64::from_le_bytes(*rent_deposit),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, PrizeClaim::LEN];
        let (is_initialized_dst, ledger_dst, round_dst, winner_dst, prize_dst, rent_payer_dst, rent_deposit_dst) =
            mut_array_refs![dst, 1, 32, 8, 32, 8, 32, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        ledger_dst.copy_from_slice(self.ledger.as_ref());
        *round_dst = self.round.to_le_bytes();
        winner_dst.copy_from_slice(self.winner.as_ref());
        *prize_dst = self.prize.to_le_bytes();
        rent_payer_dst.copy_from_slice(self.rent_payer.as_ref());
        *rent_deposit_dst = self.rent_deposit.to_le_bytes();
    }
}

/// Find the program derived address holding the prize of `round`
pub fn find_prize_claim_address(program_id: &Pubkey, ledger: &Pubkey, round: u64) -> (Pubkey, u8) {
    let round_bytes = round.to_le_bytes();
    Pubkey::find_program_address(&[PRIZE_CLAIM_SEED, ledger.as_ref(), &round_bytes], program_id)
}

/// The lottery ledger: manager, pool and the ordered entries of the current round.
///
/// `manager` and `entry_fee` are fixed by [`LotteryLedger::new`]; nothing
/// else writes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotteryLedger {
    pub(crate) manager: Pubkey,
    pub(crate) entry_fee: u64,
    pub(crate) pooled_balance: u64,
    pub(crate) round: u64,
    pub(crate) last_winner: Pubkey,
    pub(crate) participants: Vec<Pubkey>,
}

impl LotteryLedger {
    /// Create an empty ledger in its first round
    pub fn new(manager: Pubkey, entry_fee: u64) -> Self {
        Self {
            manager,
            entry_fee,
            pooled_balance: 0,
            round: 0,
            last_winner: Pubkey::default(),
            participants: Vec::new(),
        }
    }

    pub fn manager(&self) -> &Pubkey {
        &self.manager
    }

    pub fn entry_fee(&self) -> u64 {
        self.entry_fee
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn last_winner(&self) -> Option<Pubkey> {
        if self.round == 0 {
            None
        } else {
            Some(self.last_winner)
        }
    }

    /// Account size needed for the current participant list
    pub fn required_space(&self) -> usize {
        account_space(self.participants.len())
    }

    /// Verify `pooled_balance == participants.len() * entry_fee`
    pub fn check_pool_invariant(&self) -> Result<(), LotteryError> {
        let expected = (self.participants.len() as u64)
            .checked_mul(self.entry_fee)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        if expected != self.pooled_balance {
            return Err(LotteryError::PoolBalanceMismatch);
        }
        Ok(())
    }

    /// Whether account data already holds an initialized ledger
    pub fn is_initialized_account(data: &[u8]) -> bool {
        data.len() >= LedgerHeader::LEN && data[0] != 0
    }

    /// Decode a ledger from account data
    pub fn unpack_from_account(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() < LedgerHeader::LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        let header = LedgerHeader::unpack_unchecked(&data[..LedgerHeader::LEN])?;
        if !header.is_initialized {
            return Err(LotteryError::LedgerNotInitialized.into());
        }

        let count = header.participant_count as usize;
        if count > slot_capacity(data.len()) {
            return Err(ProgramError::InvalidAccountData);
        }

        let participants = data[LedgerHeader::LEN..]
            .chunks_exact(PUBKEY_BYTES)
            .take(count)
            .map(|slot| Pubkey::new_from_array(*array_ref![slot, 0, 32]))
            .collect();

        let ledger = Self {
            manager: header.manager,
            entry_fee: header.entry_fee,
            pooled_balance: header.pooled_balance,
            round: header.round,
            last_winner: header.last_winner,
            participants,
        };
        ledger.check_pool_invariant()?;
        Ok(ledger)
    }

    /// Encode the ledger into account data, zeroing unused slots
    pub fn pack_into_account(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        if dst.len() < self.required_space() {
            return Err(ProgramError::AccountDataTooSmall);
        }
        let participant_count =
            u32::try_from(self.participants.len()).map_err(|_| LotteryError::ArithmeticOverflow)?;

        let header = LedgerHeader {
            is_initialized: true,
            manager: self.manager,
            entry_fee: self.entry_fee,
            pooled_balance: self.pooled_balance,
            round: self.round,
            last_winner: self.last_winner,
            participant_count,
        };
        LedgerHeader::pack(header, &mut dst[..LedgerHeader::LEN])?;

        let (used, unused) = dst[LedgerHeader::LEN..].split_at_mut(self.participants.len() * PUBKEY_BYTES);
        for (slot, participant) in used.chunks_exact_mut(PUBKEY_BYTES).zip(&self.participants) {
            slot.copy_from_slice(participant.as_ref());
        }
        unused.fill(0);
        Ok(())
    }
}
