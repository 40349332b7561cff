// Pooled Lottery Program - Instructions
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::mem::size_of;

use crate::state::find_prize_claim_address;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum LotteryInstruction {
    /// Create the ledger account and make the signer its manager
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The manager, pays for the ledger account
    /// 1. `[signer, writable]` The new ledger account
    /// 2. `[]` System program
    InitializeLedger,

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The entrant
    /// 1. `[writable]` The ledger account
    /// 2. `[]` System program
    Enter {
        /// Lamports attached to the entry, must equal the entry fee
        amount: u64,
    },

    /// Return a page of participants as return data (Borsh `Vec<Pubkey>`)
    ///
    /// Accounts expected:
    /// 0. `[]` The ledger account
    GetParticipants {
        /// Index of the first participant in the page
        start: u32,
    },

    /// Return the pooled balance as return data (u64 LE), manager only
    ///
    /// Accounts expected:
    /// 0. `[signer]` The caller
    /// 1. `[]` The ledger account
    GetBalance,

    /// Return the lamports held by an account as return data (u64 LE)
    ///
    /// Accounts expected:
    /// 0. `[]` The ledger account
    /// 1. `[]` The account to query
    GetBalanceOf,

    /// Draw a winner, move the pool into this round's prize claim account
    /// and reset for the next round. Returns the winner as return data.
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The manager, funds the prize claim account's rent
    /// 1. `[writable]` The ledger account
    /// 2. `[writable]` Prize claim account, PDA of ("prize", ledger, round)
    /// 3. `[]` System program
    PickWinner,

    /// Pay a drawn prize to its winner and refund the claim account's rent.
    /// Anyone may send it; lamports only go to the recorded accounts.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Prize claim account
    /// 1. `[writable]` The winner
    /// 2. `[writable]` The account that funded the claim account's rent
    ClaimPrize,
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    /// Packs a LotteryInstruction into a byte buffer, in the same layout
    /// `unpack` reads
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>() + 1);
        match *self {
            Self::InitializeLedger => buf.push(0),
            Self::Enter { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::GetParticipants { start } => {
                buf.push(2);
                buf.extend_from_slice(&start.to_le_bytes());
            }
            Self::GetBalance => buf.push(3),
            Self::GetBalanceOf => buf.push(4),
            Self::PickWinner => buf.push(5),
            Self::ClaimPrize => buf.push(6),
        }
        buf
    }
}

/// Create initialize_ledger instruction
pub fn initialize_ledger(program_id: &Pubkey, manager: &Pubkey, ledger: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*manager, true),
            AccountMeta::new(*ledger, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: LotteryInstruction::InitializeLedger.pack(),
    }
}

/// Create enter instruction
pub fn enter(program_id: &Pubkey, entrant: &Pubkey, ledger: &Pubkey, amount: u64) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*entrant, true),
            AccountMeta::new(*ledger, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: LotteryInstruction::Enter { amount }.pack(),
    }
}

/// Create get_participants instruction
pub fn get_participants(program_id: &Pubkey, ledger: &Pubkey, start: u32) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*ledger, false)],
        data: LotteryInstruction::GetParticipants { start }.pack(),
    }
}

/// Create get_balance instruction
pub fn get_balance(program_id: &Pubkey, caller: &Pubkey, ledger: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new_readonly(*ledger, false),
        ],
        data: LotteryInstruction::GetBalance.pack(),
    }
}

/// Create get_balance_of instruction
pub fn get_balance_of(program_id: &Pubkey, ledger: &Pubkey, target: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*ledger, false),
            AccountMeta::new_readonly(*target, false),
        ],
        data: LotteryInstruction::GetBalanceOf.pack(),
    }
}

/// Create pick_winner instruction for the ledger's current `round`
pub fn pick_winner(program_id: &Pubkey, manager: &Pubkey, ledger: &Pubkey, round: u64) -> Instruction {
    let (prize_claim, _) = find_prize_claim_address(program_id, ledger, round);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*manager, true),
            AccountMeta::new(*ledger, false),
            AccountMeta::new(prize_claim, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: LotteryInstruction::PickWinner.pack(),
    }
}

/// Create claim_prize instruction for the prize drawn in `round`
pub fn claim_prize(
    program_id: &Pubkey,
    ledger: &Pubkey,
    round: u64,
    winner: &Pubkey,
    rent_payer: &Pubkey,
) -> Instruction {
    let (prize_claim, _) = find_prize_claim_address(program_id, ledger, round);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(prize_claim, false),
            AccountMeta::new(*winner, false),
            AccountMeta::new(*rent_payer, false),
        ],
        data: LotteryInstruction::ClaimPrize.pack(),
    }
}
