// Pooled Lottery Program - Instruction Processor
use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::{clock::Clock, Sysvar},
};

use crate::{
    constants::{
        ENTRY_FEE, INITIAL_PARTICIPANT_SLOTS, PARTICIPANTS_PAGE_SIZE, PARTICIPANT_GROWTH_SLOTS,
        PRIZE_CLAIM_SEED,
    },
    error::LotteryError,
    instruction::LotteryInstruction,
    ledger::{Balances, Treasury},
    randomness::ClockEntropy,
    state::{account_space, find_prize_claim_address, slot_capacity, LotteryLedger, PrizeClaim},
};

/// Lamport balances of the accounts passed to an instruction
pub struct AccountBalances<'a, 'b> {
    accounts: &'a [AccountInfo<'b>],
}

impl<'a, 'b> AccountBalances<'a, 'b> {
    pub fn new(accounts: &'a [AccountInfo<'b>]) -> Self {
        Self { accounts }
    }
}

impl<'a, 'b> Balances for AccountBalances<'a, 'b> {
    fn balance_of(&self, owner: &Pubkey) -> u64 {
        self.accounts
            .iter()
            .find(|account| account.key == owner)
            .map(|account| account.lamports())
            .unwrap_or(0)
    }
}

/// Moves the prize out of the ledger account into the round's claim account.
/// The winner collects it later with ClaimPrize.
pub struct PrizeEscrow<'a, 'b> {
    ledger: &'a AccountInfo<'b>,
    claim: &'a AccountInfo<'b>,
    /// Lamports that must stay in the ledger account (rent exemption)
    reserve: u64,
    /// Winner and amount escrowed, once paid
    escrowed: Option<(Pubkey, u64)>,
}

impl<'a, 'b> PrizeEscrow<'a, 'b> {
    pub fn new(ledger: &'a AccountInfo<'b>, claim: &'a AccountInfo<'b>, reserve: u64) -> Self {
        Self {
            ledger,
            claim,
            reserve,
            escrowed: None,
        }
    }

    pub fn escrowed(&self) -> Option<(Pubkey, u64)> {
        self.escrowed
    }
}

impl<'a, 'b> Treasury for PrizeEscrow<'a, 'b> {
    fn pay_out(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), LotteryError> {
        if self.escrowed.is_some() {
            msg!("Prize for this round was already escrowed");
            return Err(LotteryError::InvalidPrizeClaim);
        }
        if self.claim.key == self.ledger.key {
            return Err(LotteryError::InvalidPrizeClaim);
        }

        let remaining = self
            .ledger
            .lamports()
            .checked_sub(amount)
            .ok_or(LotteryError::InsufficientVaultFunds)?;
        if remaining < self.reserve {
            msg!(
                "Payout of {} lamports would leave the ledger below its rent reserve",
                amount
            );
            return Err(LotteryError::InsufficientVaultFunds);
        }
        let credited = self
            .claim
            .lamports()
            .checked_add(amount)
            .ok_or(LotteryError::ArithmeticOverflow)?;

        **self.ledger.lamports.borrow_mut() = remaining;
        **self.claim.lamports.borrow_mut() = credited;
        self.escrowed = Some((*recipient, amount));
        Ok(())
    }
}

/// Slice of `participants` returned by one GetParticipants call
pub fn participant_page(participants: &[Pubkey], start: u32) -> &[Pubkey] {
    let start = (start as usize).min(participants.len());
    let end = start.saturating_add(PARTICIPANTS_PAGE_SIZE).min(participants.len());
    &participants[start..end]
}

/// A ledger account created outside InitializeLedger must already have room
/// for the header and be rent exempt
pub fn check_prefunded_ledger(rent: &Rent, lamports: u64, data_len: usize) -> ProgramResult {
    if data_len < account_space(0) {
        msg!("Ledger account holds {} bytes, needs at least {}", data_len, account_space(0));
        return Err(ProgramError::AccountDataTooSmall);
    }
    if !rent.is_exempt(lamports, data_len) {
        msg!("Ledger account is not rent exempt");
        return Err(ProgramError::AccountNotRentExempt);
    }
    Ok(())
}

/// Program state handler.
pub struct Processor;

impl Processor {
    /// Process a lottery instruction
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::InitializeLedger => {
                msg!("Instruction: Initialize Ledger");
                Self::process_initialize_ledger(accounts, program_id)
            }
            LotteryInstruction::Enter { amount } => {
                msg!("Instruction: Enter");
                Self::process_enter(accounts, amount, program_id)
            }
            LotteryInstruction::GetParticipants { start } => {
                msg!("Instruction: Get Participants");
                Self::process_get_participants(accounts, start, program_id)
            }
            LotteryInstruction::GetBalance => {
                msg!("Instruction: Get Balance");
                Self::process_get_balance(accounts, program_id)
            }
            LotteryInstruction::GetBalanceOf => {
                msg!("Instruction: Get Balance Of");
                Self::process_get_balance_of(accounts, program_id)
            }
            LotteryInstruction::PickWinner => {
                msg!("Instruction: Pick Winner");
                Self::process_pick_winner(accounts, program_id)
            }
            LotteryInstruction::ClaimPrize => {
                msg!("Instruction: Claim Prize");
                Self::process_claim_prize(accounts, program_id)
            }
        }
    }

    /// Load the ledger after checking the account belongs to this program
    fn load_ledger(ledger_info: &AccountInfo, program_id: &Pubkey) -> Result<LotteryLedger, ProgramError> {
        if ledger_info.owner != program_id {
            msg!("Ledger account must be owned by this program");
            return Err(LotteryError::InvalidLedgerAccount.into());
        }
        let data = ledger_info.try_borrow_data()?;
        let ledger = LotteryLedger::unpack_from_account(&data)?;
        Ok(ledger)
    }

    fn process_initialize_ledger(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let manager_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !manager_info.is_signer {
            msg!("Manager must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let program_owned = ledger_info.owner == program_id;
        if program_owned && LotteryLedger::is_initialized_account(&ledger_info.try_borrow_data()?) {
            msg!("Ledger account is already initialized");
            return Err(LotteryError::LedgerAlreadyInitialized.into());
        }

        if !ledger_info.is_signer {
            msg!("Ledger account must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if program_owned {
            check_prefunded_ledger(&Rent::get()?, ledger_info.lamports(), ledger_info.data_len())?;
        } else {
            let space = account_space(INITIAL_PARTICIPANT_SLOTS);
            let rent_lamports = Rent::get()?.minimum_balance(space);
            invoke(
                &system_instruction::create_account(
                    manager_info.key,
                    ledger_info.key,
                    rent_lamports,
                    space as u64,
                    program_id,
                ),
                &[
                    manager_info.clone(),
                    ledger_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }

        let ledger = LotteryLedger::new(*manager_info.key, ENTRY_FEE);
        ledger.pack_into_account(&mut ledger_info.try_borrow_mut_data()?)?;

        msg!(
            "Ledger {} initialized: Manager={}, EntryFee={} lamports",
            ledger_info.key,
            manager_info.key,
            ENTRY_FEE
        );
        Ok(())
    }

    fn process_enter(accounts: &[AccountInfo], amount: u64, program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let entrant_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !entrant_info.is_signer {
            msg!("Entrant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut ledger = Self::load_ledger(ledger_info, program_id)?;
        ledger.enter(*entrant_info.key, amount)?;

        if ledger.required_space() > ledger_info.data_len() {
            let slots = slot_capacity(ledger_info.data_len())
                .checked_add(PARTICIPANT_GROWTH_SLOTS)
                .ok_or(LotteryError::ArithmeticOverflow)?;
            let new_len = account_space(slots);
            msg!("Growing ledger to {} participant slots", slots);
            ledger_info.realloc(new_len, false)?;
        }

        // The ledger holds its rent reserve plus exactly the pool
        let target_lamports = Rent::get()?
            .minimum_balance(ledger_info.data_len())
            .checked_add(ledger.pooled_balance)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        let after_fee = ledger_info
            .lamports()
            .checked_add(amount)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        let rent_top_up = target_lamports.saturating_sub(after_fee);

        invoke(
            &system_instruction::transfer(entrant_info.key, ledger_info.key, amount),
            &[
                entrant_info.clone(),
                ledger_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        if rent_top_up > 0 {
            msg!("Entrant covers {} lamports of additional rent", rent_top_up);
            invoke(
                &system_instruction::transfer(entrant_info.key, ledger_info.key, rent_top_up),
                &[
                    entrant_info.clone(),
                    ledger_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }

        ledger.pack_into_account(&mut ledger_info.try_borrow_mut_data()?)?;

        msg!(
            "Entry #{} recorded for {}. Pool: {} lamports",
            ledger.participants().len(),
            entrant_info.key,
            ledger.pooled_balance
        );
        Ok(())
    }

    fn process_get_participants(accounts: &[AccountInfo], start: u32, program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let ledger_info = next_account_info(account_info_iter)?;

        let ledger = Self::load_ledger(ledger_info, program_id)?;
        let page = participant_page(ledger.participants(), start).to_vec();

        msg!(
            "Returning {} of {} participants from index {}",
            page.len(),
            ledger.participants().len(),
            start
        );
        set_return_data(&page.try_to_vec()?);
        Ok(())
    }

    fn process_get_balance(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let ledger = Self::load_ledger(ledger_info, program_id)?;
        let balance = ledger.balance(caller_info.key)?;

        msg!("Pooled balance: {} lamports", balance);
        set_return_data(&balance.to_le_bytes());
        Ok(())
    }

    fn process_get_balance_of(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let ledger_info = next_account_info(account_info_iter)?;
        let target_info = next_account_info(account_info_iter)?;

        let ledger = Self::load_ledger(ledger_info, program_id)?;
        let balances = AccountBalances::new(std::slice::from_ref(target_info));
        let balance = ledger.balance_of(&balances, target_info.key);

        msg!("Balance of {}: {} lamports", target_info.key, balance);
        set_return_data(&balance.to_le_bytes());
        Ok(())
    }

    fn process_pick_winner(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let manager_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !manager_info.is_signer {
            msg!("Manager must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut ledger = Self::load_ledger(ledger_info, program_id)?;
        let round = ledger.round();

        let (expected_claim_pubkey, bump_seed) =
            find_prize_claim_address(program_id, ledger_info.key, round);
        if *claim_info.key != expected_claim_pubkey {
            msg!("Invalid prize claim account address");
            return Err(LotteryError::InvalidPrizeClaim.into());
        }
        if claim_info.owner == program_id {
            msg!("Prize for round {} was already drawn", round);
            return Err(LotteryError::InvalidPrizeClaim.into());
        }

        // Fund the claim account's rent and hand it to this program. Lamports
        // already sitting at the address count toward the rent.
        let rent_deposit = Rent::get()?
            .minimum_balance(PrizeClaim::LEN)
            .saturating_sub(claim_info.lamports());
        if rent_deposit > 0 {
            invoke(
                &system_instruction::transfer(manager_info.key, claim_info.key, rent_deposit),
                &[
                    manager_info.clone(),
                    claim_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }
        let round_bytes = round.to_le_bytes();
        let claim_seeds: &[&[u8]] = &[
            PRIZE_CLAIM_SEED,
            ledger_info.key.as_ref(),
            &round_bytes,
            &[bump_seed],
        ];
        invoke_signed(
            &system_instruction::allocate(claim_info.key, PrizeClaim::LEN as u64),
            &[claim_info.clone(), system_program_info.clone()],
            &[claim_seeds],
        )?;
        invoke_signed(
            &system_instruction::assign(claim_info.key, program_id),
            &[claim_info.clone(), system_program_info.clone()],
            &[claim_seeds],
        )?;

        let clock = Clock::get()?;
        let mut entropy = ClockEntropy::new(&clock, ledger_info.key, ledger.participants());
        let reserve = Rent::get()?.minimum_balance(ledger_info.data_len());
        let mut escrow = PrizeEscrow::new(ledger_info, claim_info, reserve);

        let winner = ledger.pick_winner(manager_info.key, &mut entropy, &mut escrow)?;
        let prize = escrow.escrowed().map(|(_, amount)| amount).unwrap_or(0);

        let claim = PrizeClaim {
            is_initialized: true,
            ledger: *ledger_info.key,
            round,
            winner,
            prize,
            rent_payer: *manager_info.key,
            rent_deposit,
        };
        PrizeClaim::pack(claim, &mut claim_info.try_borrow_mut_data()?)?;
        ledger.pack_into_account(&mut ledger_info.try_borrow_mut_data()?)?;

        msg!(
            "Winner picked: {}. {} lamports held at {} until claimed",
            winner,
            prize,
            claim_info.key
        );
        set_return_data(winner.as_ref());
        Ok(())
    }

    fn process_claim_prize(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let claim_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;
        let rent_payer_info = next_account_info(account_info_iter)?;

        if claim_info.owner != program_id {
            msg!("Prize claim account must be owned by this program");
            return Err(LotteryError::InvalidPrizeClaim.into());
        }
        let claim = PrizeClaim::unpack_unchecked(&claim_info.try_borrow_data()?)?;
        if !claim.is_initialized {
            msg!("Prize claim account is empty");
            return Err(LotteryError::InvalidPrizeClaim.into());
        }
        if claim.winner != *winner_info.key {
            msg!("Prize belongs to {}", claim.winner);
            return Err(LotteryError::WinnerAccountMissing.into());
        }
        if claim.rent_payer != *rent_payer_info.key {
            msg!("Rent refund belongs to {}", claim.rent_payer);
            return Err(LotteryError::InvalidPrizeClaim.into());
        }

        // Everything above the rent deposit goes to the winner
        let held = claim_info.lamports();
        let to_winner = held
            .checked_sub(claim.rent_deposit)
            .ok_or(LotteryError::InsufficientVaultFunds)?;

        **claim_info.lamports.borrow_mut() = 0;
        let winner_lamports = winner_info
            .lamports()
            .checked_add(to_winner)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        **winner_info.lamports.borrow_mut() = winner_lamports;
        let rent_payer_lamports = rent_payer_info
            .lamports()
            .checked_add(claim.rent_deposit)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        **rent_payer_info.lamports.borrow_mut() = rent_payer_lamports;
        claim_info.try_borrow_mut_data()?.fill(0);

        msg!(
            "Round {} prize of {} lamports paid to {}",
            claim.round,
            to_winner,
            winner_info.key
        );
        Ok(())
    }
}
