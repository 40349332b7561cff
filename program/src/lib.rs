// Pooled Lottery Program
// A fixed-fee lottery: players enter, the manager draws a winner who takes the whole pool

pub mod constants;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod processor;
pub mod randomness;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub use solana_program;

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
