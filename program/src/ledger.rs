// Pooled Lottery Program - Ledger operations
//
// Pure state machine over `LotteryLedger`. Every operation checks all of its
// preconditions before touching state, so a rejected call leaves the ledger
// exactly as it was.
use solana_program::{msg, pubkey::Pubkey};

use crate::{
    constants::MIN_PARTICIPANTS, error::LotteryError, randomness::RandomnessSource,
    state::LotteryLedger,
};

/// Lookup of externally held balances
pub trait Balances {
    /// Balance of `owner`; unknown identities hold 0
    fn balance_of(&self, owner: &Pubkey) -> u64;
}

/// Destination of the prize.
pub trait Treasury {
    /// Move `amount` from the pool to `recipient`. Must either complete fully
    /// or fail without moving anything.
    fn pay_out(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), LotteryError>;
}

impl LotteryLedger {
    /// Record one entry for `caller` paying `attached_value`
    pub fn enter(&mut self, caller: Pubkey, attached_value: u64) -> Result<(), LotteryError> {
        if attached_value != self.entry_fee {
            msg!(
                "Entry rejected: sent {} lamports, fee is {} lamports",
                attached_value,
                self.entry_fee
            );
            return Err(LotteryError::InvalidEntryAmount);
        }

        let pooled_balance = self
            .pooled_balance
            .checked_add(self.entry_fee)
            .ok_or(LotteryError::ArithmeticOverflow)?;

        self.participants.push(caller);
        self.pooled_balance = pooled_balance;
        Ok(())
    }

    /// Entries of the current round in the order they were made
    pub fn participants(&self) -> &[Pubkey] {
        &self.participants
    }

    /// Pooled balance, visible to the manager only
    pub fn balance(&self, caller: &Pubkey) -> Result<u64, LotteryError> {
        if *caller != self.manager {
            msg!("You are not the manager");
            return Err(LotteryError::NotAuthorized);
        }
        Ok(self.pooled_balance)
    }

    pub fn balance_of<B: Balances + ?Sized>(&self, balances: &B, owner: &Pubkey) -> u64 {
        balances.balance_of(owner)
    }

    /// Draw a winner, pay them the whole pool and start the next round.
    ///
    /// Checks run in order: manager, then participant minimum. If the payout
    /// fails the ledger is left untouched.
    pub fn pick_winner<R, T>(
        &mut self,
        caller: &Pubkey,
        randomness: &mut R,
        treasury: &mut T,
    ) -> Result<Pubkey, LotteryError>
    where
        R: RandomnessSource + ?Sized,
        T: Treasury + ?Sized,
    {
        if *caller != self.manager {
            msg!("Only Manager can pick the Winner");
            return Err(LotteryError::NotAuthorized);
        }
        if self.participants.len() < MIN_PARTICIPANTS {
            msg!(
                "Cannot pick a winner with less than {} participants",
                MIN_PARTICIPANTS
            );
            return Err(LotteryError::InsufficientParticipants);
        }

        let count = self.participants.len() as u64;
        let index = randomness.draw_index(count);
        if index >= count {
            msg!("Random index {} out of range for {} participants", index, count);
            return Err(LotteryError::RandomIndexOutOfRange);
        }

        let winner = self.participants[index as usize];
        let prize = self.pooled_balance;
        let next_round = self
            .round
            .checked_add(1)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        treasury.pay_out(&winner, prize)?;

        self.participants.clear();
        self.pooled_balance = 0;
        self.round = next_round;
        self.last_winner = winner;

        msg!(
            "Round {} complete: winner {} (index {} of {}) paid {} lamports",
            self.round,
            winner,
            index,
            count,
            prize
        );
        Ok(winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ENTRY_FEE;
    use std::collections::HashMap;

    /// Replays a fixed sequence of indices
    struct ScriptedDraws(Vec<u64>);

    impl RandomnessSource for ScriptedDraws {
        fn draw_index(&mut self, _upper: u64) -> u64 {
            self.0.remove(0)
        }
    }

    #[derive(Default)]
    struct MemoryTreasury {
        balances: HashMap<Pubkey, u64>,
        refuse_payouts: bool,
    }

    impl Balances for MemoryTreasury {
        fn balance_of(&self, owner: &Pubkey) -> u64 {
            self.balances.get(owner).copied().unwrap_or(0)
        }
    }

    impl Treasury for MemoryTreasury {
        fn pay_out(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), LotteryError> {
            if self.refuse_payouts {
                return Err(LotteryError::InsufficientVaultFunds);
            }
            let balance = self.balances.entry(*recipient).or_insert(0);
            *balance = balance
                .checked_add(amount)
                .ok_or(LotteryError::ArithmeticOverflow)?;
            Ok(())
        }
    }

    fn setup(entries: usize) -> (LotteryLedger, Pubkey, Vec<Pubkey>) {
        let manager = Pubkey::new_unique();
        let mut ledger = LotteryLedger::new(manager, ENTRY_FEE);
        let players: Vec<Pubkey> = (0..entries).map(|_| Pubkey::new_unique()).collect();
        for player in &players {
            ledger.enter(*player, ENTRY_FEE).unwrap();
        }
        (ledger, manager, players)
    }

    #[test]
    fn test_new_ledger_is_empty() {
        let manager = Pubkey::new_unique();
        let ledger = LotteryLedger::new(manager, ENTRY_FEE);
        assert_eq!(ledger.manager(), &manager);
        assert!(ledger.participants().is_empty());
        assert_eq!(ledger.balance(&manager), Ok(0));
        assert_eq!(ledger.round(), 0);
    }

    #[test]
    fn test_wrong_amount_is_rejected_without_state_change() {
        let (mut ledger, manager, _) = setup(1);
        let player = Pubkey::new_unique();
        let before = ledger.clone();

        assert_eq!(
            ledger.enter(player, 2 * ENTRY_FEE),
            Err(LotteryError::InvalidEntryAmount)
        );
        assert_eq!(ledger, before);
        assert_eq!(
            ledger.enter(player, ENTRY_FEE - 1),
            Err(LotteryError::InvalidEntryAmount)
        );
        assert_eq!(ledger, before);
        assert_eq!(ledger.balance(&manager), Ok(ENTRY_FEE));
    }

    #[test]
    fn test_entries_keep_call_order() {
        let (ledger, manager, players) = setup(4);
        assert_eq!(ledger.participants(), players.as_slice());
        assert_eq!(ledger.balance(&manager), Ok(4 * ENTRY_FEE));
        ledger.check_pool_invariant().unwrap();
    }

    #[test]
    fn test_duplicate_entries_take_separate_slots() {
        let manager = Pubkey::new_unique();
        let repeat = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let mut ledger = LotteryLedger::new(manager, ENTRY_FEE);
        ledger.enter(repeat, ENTRY_FEE).unwrap();
        ledger.enter(other, ENTRY_FEE).unwrap();
        ledger.enter(repeat, ENTRY_FEE).unwrap();

        assert_eq!(ledger.participants(), &[repeat, other, repeat]);
        assert_eq!(ledger.balance(&manager), Ok(3 * ENTRY_FEE));

        // Both of the repeated identity's slots can win
        for index in [0, 2] {
            let mut round = ledger.clone();
            let mut treasury = MemoryTreasury::default();
            let winner = round
                .pick_winner(&manager, &mut ScriptedDraws(vec![index]), &mut treasury)
                .unwrap();
            assert_eq!(winner, repeat);
        }
    }

    #[test]
    fn test_balance_requires_manager() {
        let (ledger, _, players) = setup(2);
        for player in &players {
            assert_eq!(ledger.balance(player), Err(LotteryError::NotAuthorized));
        }
    }

    #[test]
    fn test_balance_of_delegates_to_balances() {
        let (ledger, _, players) = setup(1);
        let mut treasury = MemoryTreasury::default();
        treasury.balances.insert(players[0], 42);
        assert_eq!(ledger.balance_of(&treasury, &players[0]), 42);
        assert_eq!(ledger.balance_of(&treasury, &Pubkey::new_unique()), 0);
    }

    #[test]
    fn test_pick_winner_requires_manager() {
        let (mut ledger, _, players) = setup(4);
        let before = ledger.clone();
        let mut treasury = MemoryTreasury::default();
        assert_eq!(
            ledger.pick_winner(&players[0], &mut ScriptedDraws(vec![0]), &mut treasury),
            Err(LotteryError::NotAuthorized)
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_authorization_checked_before_participant_count() {
        let (mut ledger, _, players) = setup(1);
        let mut treasury = MemoryTreasury::default();
        assert_eq!(
            ledger.pick_winner(&players[0], &mut ScriptedDraws(vec![0]), &mut treasury),
            Err(LotteryError::NotAuthorized)
        );
    }

    #[test]
    fn test_pick_winner_needs_three_entries() {
        let (mut ledger, manager, _) = setup(2);
        let before = ledger.clone();
        let mut treasury = MemoryTreasury::default();
        assert_eq!(
            ledger.pick_winner(&manager, &mut ScriptedDraws(vec![0]), &mut treasury),
            Err(LotteryError::InsufficientParticipants)
        );
        assert_eq!(ledger, before);

        ledger.enter(Pubkey::new_unique(), ENTRY_FEE).unwrap();
        assert!(ledger
            .pick_winner(&manager, &mut ScriptedDraws(vec![2]), &mut treasury)
            .is_ok());
    }

    #[test]
    fn test_pick_winner_pays_pool_and_resets() {
        let (mut ledger, manager, players) = setup(4);
        let mut treasury = MemoryTreasury::default();

        let winner = ledger
            .pick_winner(&manager, &mut ScriptedDraws(vec![1]), &mut treasury)
            .unwrap();

        assert_eq!(winner, players[1]);
        assert_eq!(treasury.balance_of(&players[1]), 4 * ENTRY_FEE);
        assert_eq!(treasury.balance_of(&players[0]), 0);
        assert!(ledger.participants().is_empty());
        assert_eq!(ledger.balance(&manager), Ok(0));
        assert_eq!(ledger.round(), 1);
        assert_eq!(ledger.last_winner(), Some(players[1]));
        ledger.check_pool_invariant().unwrap();
    }

    #[test]
    fn test_failed_payout_leaves_ledger_untouched() {
        let (mut ledger, manager, _) = setup(3);
        let before = ledger.clone();
        let mut treasury = MemoryTreasury {
            refuse_payouts: true,
            ..Default::default()
        };

        assert_eq!(
            ledger.pick_winner(&manager, &mut ScriptedDraws(vec![0]), &mut treasury),
            Err(LotteryError::InsufficientVaultFunds)
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_out_of_range_draw_is_rejected() {
        let (mut ledger, manager, _) = setup(3);
        let before = ledger.clone();
        let mut treasury = MemoryTreasury::default();
        assert_eq!(
            ledger.pick_winner(&manager, &mut ScriptedDraws(vec![3]), &mut treasury),
            Err(LotteryError::RandomIndexOutOfRange)
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_next_round_starts_from_empty() {
        let (mut ledger, manager, _) = setup(3);
        let mut treasury = MemoryTreasury::default();
        ledger
            .pick_winner(&manager, &mut ScriptedDraws(vec![0]), &mut treasury)
            .unwrap();

        let newcomer = Pubkey::new_unique();
        ledger.enter(newcomer, ENTRY_FEE).unwrap();
        assert_eq!(ledger.participants(), &[newcomer]);
        assert_eq!(ledger.balance(&manager), Ok(ENTRY_FEE));
    }

    #[test]
    fn test_pool_invariant_holds_through_a_session() {
        let (mut ledger, manager, _) = setup(0);
        let mut treasury = MemoryTreasury::default();
        let mut draws = ScriptedDraws(vec![4, 0]);

        for round in 0..2 {
            for attempt in 0..10u64 {
                // every other attempt sends one lamport too many
                let _ = ledger.enter(Pubkey::new_unique(), ENTRY_FEE + attempt % 2);
                ledger.check_pool_invariant().unwrap();
            }
            assert_eq!(ledger.participants().len(), 5);
            ledger.pick_winner(&manager, &mut draws, &mut treasury).unwrap();
            ledger.check_pool_invariant().unwrap();
            assert_eq!(ledger.round(), round + 1);
        }
    }
}
