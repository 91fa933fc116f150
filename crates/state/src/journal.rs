use crate::account::Account;
use crate::{is_reserved_key, KEY_CODE, KEY_CODE_HASH, KEY_CODE_SIZE, KEY_SUICIDE};
use helios_evm::log::Log;
use helios_evm::statedb::{StateDB, StateError};
use helios_types::{Address, Amount, H256, HashExt};
use std::collections::HashMap;

/// A reverse operation recorded before each state mutation.
#[derive(Debug, Clone)]
enum JournalEntry {
    AccountCreated(Address),
    BalanceChanged(Address, Amount),
    SeqChanged(Address, u64),
    DataChanged(Address, H256, Option<Vec<u8>>),
    LogAdded,
}

/// An in-memory account state with a change journal and stacked snapshots.
///
/// A snapshot token marks a position in the journal. Reverting to a token
/// plays the journal backwards to that mark, dropping any inner marks on the
/// way; committing simply discards the mark, leaving the changes attributed
/// to the enclosing snapshot. Tokens that were already closed are ignored,
/// so a revert arriving after a commit of the same token is harmless.
#[derive(Debug, Default)]
pub struct JournaledState {
    accounts: HashMap<Address, Account>,
    journal: Vec<JournalEntry>,
    marks: Vec<usize>,
    logs: Vec<Log>,
}

impl JournaledState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an account directly, bypassing the journal. For genesis and
    /// test setup only; never call while snapshots are open.
    pub fn insert_account(&mut self, addr: Address, account: Account) {
        self.accounts.insert(addr, account);
    }

    pub fn account(&self, addr: Address) -> Option<&Account> {
        self.accounts.get(&addr)
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Number of snapshots currently open.
    pub fn open_snapshots(&self) -> usize {
        self.marks.len()
    }

    fn account_mut(&mut self, addr: Address) -> Result<&mut Account, StateError> {
        self.accounts
            .get_mut(&addr)
            .ok_or(StateError::AccountNotFound)
    }

    fn set_data(&mut self, addr: Address, key: H256, value: Vec<u8>) -> Result<(), StateError> {
        let account = self
            .accounts
            .get_mut(&addr)
            .ok_or(StateError::AccountNotFound)?;
        let prev = account.data.insert(key, value);
        self.journal.push(JournalEntry::DataChanged(addr, key, prev));
        Ok(())
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated(addr) => {
                self.accounts.remove(&addr);
            }
            JournalEntry::BalanceChanged(addr, prev) => {
                if let Some(account) = self.accounts.get_mut(&addr) {
                    account.balance = prev;
                }
            }
            JournalEntry::SeqChanged(addr, prev) => {
                if let Some(account) = self.accounts.get_mut(&addr) {
                    account.seq = prev;
                }
            }
            JournalEntry::DataChanged(addr, key, prev) => {
                if let Some(account) = self.accounts.get_mut(&addr) {
                    match prev {
                        Some(value) => {
                            account.data.insert(key, value);
                        }
                        None => {
                            account.data.remove(&key);
                        }
                    }
                }
            }
            JournalEntry::LogAdded => {
                self.logs.pop();
            }
        }
    }
}

impl StateDB for JournaledState {
    fn create_account(&mut self, addr: Address) -> Result<(), StateError> {
        if self.accounts.contains_key(&addr) {
            return Err(StateError::AccountExists);
        }
        self.accounts.insert(addr, Account::default());
        self.journal.push(JournalEntry::AccountCreated(addr));
        Ok(())
    }

    fn sub_balance(&mut self, addr: Address, value: &Amount) -> Result<(), StateError> {
        let account = self.account_mut(addr)?;
        let prev = account.balance;
        account.balance = prev
            .checked_sub(value)
            .ok_or(StateError::InsufficientBalance)?;
        self.journal.push(JournalEntry::BalanceChanged(addr, prev));
        Ok(())
    }

    fn add_balance(&mut self, addr: Address, value: &Amount) -> Result<(), StateError> {
        let account = self.account_mut(addr)?;
        let prev = account.balance;
        account.balance = prev + *value;
        self.journal.push(JournalEntry::BalanceChanged(addr, prev));
        Ok(())
    }

    fn get_balance(&self, addr: Address) -> Amount {
        self.accounts
            .get(&addr)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn get_seq(&self, addr: Address) -> u64 {
        self.accounts.get(&addr).map(|a| a.seq).unwrap_or(0)
    }

    fn add_seq(&mut self, addr: Address) -> Result<(), StateError> {
        let account = self.account_mut(addr)?;
        let prev = account.seq;
        account.seq = prev + 1;
        self.journal.push(JournalEntry::SeqChanged(addr, prev));
        Ok(())
    }

    fn get_code_hash(&self, addr: Address) -> H256 {
        self.get_state(addr, *KEY_CODE_HASH)
    }

    fn get_code(&self, addr: Address) -> Vec<u8> {
        self.accounts
            .get(&addr)
            .map(|a| a.data(&KEY_CODE).to_vec())
            .unwrap_or_default()
    }

    fn set_code(&mut self, addr: Address, code: Vec<u8>) -> Result<(), StateError> {
        let hash = helios_crypto::keccak256(&code);
        let size = (code.len() as u32).to_le_bytes();
        self.set_data(addr, *KEY_CODE, code)?;
        self.set_data(addr, *KEY_CODE_HASH, hash.as_bytes().to_vec())?;
        self.set_data(addr, *KEY_CODE_SIZE, size.to_vec())?;
        Ok(())
    }

    fn get_code_size(&self, addr: Address) -> usize {
        let Some(account) = self.accounts.get(&addr) else {
            return 0;
        };
        let bytes = account.data(&KEY_CODE_SIZE);
        if bytes.len() == 4 {
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
        } else {
            0
        }
    }

    fn get_state(&self, addr: Address, key: H256) -> H256 {
        self.accounts
            .get(&addr)
            .map(|a| {
                let bytes = a.data(&key);
                if bytes.is_empty() {
                    H256::zero()
                } else {
                    H256::from_slice_truncated(bytes)
                }
            })
            .unwrap_or_default()
    }

    fn set_state(&mut self, addr: Address, key: H256, value: H256) -> Result<(), StateError> {
        if is_reserved_key(&key) {
            return Err(StateError::ReservedKey(key));
        }
        self.set_data(addr, key, value.as_bytes().to_vec())
    }

    fn suicide(&mut self, addr: Address) -> Result<bool, StateError> {
        self.set_data(addr, *KEY_SUICIDE, vec![1])?;
        Ok(true)
    }

    fn has_suicided(&self, addr: Address) -> bool {
        self.accounts
            .get(&addr)
            .map(|a| {
                let bytes = a.data(&KEY_SUICIDE);
                !bytes.is_empty() && bytes[0] == 1
            })
            .unwrap_or(false)
    }

    fn exist(&self, addr: Address) -> bool {
        self.accounts.contains_key(&addr)
    }

    fn empty(&self, addr: Address) -> bool {
        match self.accounts.get(&addr) {
            None => true,
            Some(account) => {
                account.seq == 0 && account.balance.is_zero() && self.get_code_size(addr) == 0
            }
        }
    }

    fn snapshot(&mut self) -> usize {
        self.marks.push(self.journal.len());
        self.marks.len()
    }

    fn revert_to_snapshot(&mut self, n: usize) {
        if n == 0 || n > self.marks.len() {
            // The token was already closed (the machine commits and the
            // host's unwind path may still revert afterwards), or never
            // existed.
            return;
        }
        let mark = self.marks[n - 1];
        while self.journal.len() > mark {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.marks.truncate(n - 1);
    }

    fn commit_snapshot(&mut self, n: usize) {
        if n == self.marks.len() {
            self.marks.pop();
        } else {
            tracing::debug!(token = n, open = self.marks.len(), "out-of-order commit ignored");
        }
    }

    fn add_log(&mut self, log: Log) {
        self.journal.push(JournalEntry::LogAdded);
        self.logs.push(log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::from_bytes(bytes)
    }

    fn key(n: u64) -> H256 {
        let mut bytes = [0u8; 32];
        bytes[31] = n as u8;
        H256::from(bytes)
    }

    #[test]
    fn test_revert_restores_everything() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account {
            balance: Amount::from_u64(100),
            ..Account::default()
        });

        let snapshot = state.snapshot();
        state.create_account(addr(2)).unwrap();
        state.sub_balance(addr(1), &Amount::from_u64(40)).unwrap();
        state.add_balance(addr(2), &Amount::from_u64(40)).unwrap();
        state.add_seq(addr(1)).unwrap();
        state.set_state(addr(1), key(1), key(9)).unwrap();
        state.add_log(Log::new(addr(1), vec![], vec![1]));

        state.revert_to_snapshot(snapshot);

        assert!(!state.exist(addr(2)));
        assert_eq!(state.get_balance(addr(1)), Amount::from_u64(100));
        assert_eq!(state.get_seq(addr(1)), 0);
        assert_eq!(state.get_state(addr(1), key(1)), H256::zero());
        assert!(state.logs().is_empty());
        assert_eq!(state.open_snapshots(), 0);
    }

    #[test]
    fn test_nested_commit_then_outer_revert() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account::default());

        let outer = state.snapshot();
        state.set_state(addr(1), key(1), key(1)).unwrap();

        let inner = state.snapshot();
        state.set_state(addr(1), key(2), key(2)).unwrap();
        state.commit_snapshot(inner);

        // The inner changes are visible after its commit.
        assert_eq!(state.get_state(addr(1), key(2)), key(2));

        // The outer revert undoes the committed inner changes too.
        state.revert_to_snapshot(outer);
        assert_eq!(state.get_state(addr(1), key(1)), H256::zero());
        assert_eq!(state.get_state(addr(1), key(2)), H256::zero());
    }

    #[test]
    fn test_revert_after_commit_is_ignored() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account::default());

        let snapshot = state.snapshot();
        state.set_state(addr(1), key(1), key(7)).unwrap();
        state.commit_snapshot(snapshot);
        state.revert_to_snapshot(snapshot);

        assert_eq!(state.get_state(addr(1), key(1)), key(7));
    }

    #[test]
    fn test_revert_drops_inner_marks() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account::default());

        let outer = state.snapshot();
        let _inner = state.snapshot();
        state.set_state(addr(1), key(1), key(7)).unwrap();

        state.revert_to_snapshot(outer);
        assert_eq!(state.open_snapshots(), 0);
        assert_eq!(state.get_state(addr(1), key(1)), H256::zero());
    }

    #[test]
    fn test_reserved_keys_rejected() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account::default());

        for key in [*KEY_CODE, *KEY_CODE_HASH, *KEY_CODE_SIZE, *KEY_SUICIDE] {
            assert_eq!(
                state.set_state(addr(1), key, H256::zero()),
                Err(StateError::ReservedKey(key))
            );
        }
    }

    #[test]
    fn test_code_round_trip() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account::default());

        let code = vec![0x60, 0x01, 0x60, 0x02, 0x01];
        state.set_code(addr(1), code.clone()).unwrap();

        assert_eq!(state.get_code(addr(1)), code);
        assert_eq!(state.get_code_size(addr(1)), code.len());
        assert_eq!(state.get_code_hash(addr(1)), helios_crypto::keccak256(&code));

        // The size is stored under the reserved key as 4 LE bytes.
        let account = state.account(addr(1)).unwrap();
        assert_eq!(account.data(&KEY_CODE_SIZE), &(code.len() as u32).to_le_bytes());
    }

    #[test]
    fn test_empty_accounts() {
        let mut state = JournaledState::new();
        assert!(state.empty(addr(1)));

        state.insert_account(addr(1), Account::default());
        assert!(state.empty(addr(1)));

        state.add_seq(addr(1)).unwrap();
        assert!(!state.empty(addr(1)));
    }

    #[test]
    fn test_sub_balance_insufficient() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account::default());
        assert_eq!(
            state.sub_balance(addr(1), &Amount::from_u64(1)),
            Err(StateError::InsufficientBalance)
        );
    }

    #[test]
    fn test_suicide_flag_reverts() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account::default());

        let snapshot = state.snapshot();
        state.suicide(addr(1)).unwrap();
        assert!(state.has_suicided(addr(1)));

        state.revert_to_snapshot(snapshot);
        assert!(!state.has_suicided(addr(1)));
    }
}
