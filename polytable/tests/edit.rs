//! The scoped edit proxy.

use polytable::{
    IndexSpec, MultiIndex, StatusFlag, ThreadStatus, UniqueHashMap, UpdatePointerTombstones,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct Account {
    alias: String,
    balance: i64,
}

struct ByAlias;

impl IndexSpec<u32, Account> for ByAlias {
    type SubKey = String;
    type Map<R: Clone + Eq> = UniqueHashMap<String, R>;

    fn project(_id: &u32, account: &Account) -> String {
        account.alias.clone()
    }
}

type Accounts = MultiIndex<
    u32,
    Account,
    UpdatePointerTombstones,
    UniqueHashMap<u32, usize>,
    (ByAlias,),
    ThreadStatus,
>;

fn account(alias: &str, balance: i64) -> Account {
    Account {
        alias: alias.into(),
        balance,
    }
}

#[test]
fn edit_of_a_new_key_inserts_on_commit() {
    let mut accounts = Accounts::new();
    let mut edit = accounts.edit(1);
    edit.alias = "ada".into();
    edit.balance = 100;
    assert!(edit.commit());

    assert_eq!(accounts.get(&1), Some(&account("ada", 100)));
    assert_eq!(accounts.by::<ByAlias, _>().find(&"ada".to_string()), accounts.find(&1));
}

#[test]
fn edit_of_an_existing_record_replaces_on_drop() {
    let mut accounts = Accounts::new();
    accounts.insert(1, account("ada", 100));

    {
        let mut edit = accounts.edit(1);
        edit.balance += 50;
        // Dropped without an explicit commit: the edit applies implicitly.
    }
    assert!(ThreadStatus::get());
    assert_eq!(accounts.get(&1).unwrap().balance, 150);
}

#[test]
fn abort_discards_the_buffer() {
    let mut accounts = Accounts::new();
    accounts.insert(1, account("ada", 100));

    let mut edit = accounts.edit(1);
    edit.balance = 0;
    edit.abort();

    assert_eq!(accounts.get(&1).unwrap().balance, 100);
}

#[test]
fn colliding_commit_reports_failure() {
    let mut accounts = Accounts::new();
    accounts.insert(1, account("ada", 100));
    accounts.insert(2, account("grace", 200));

    let mut edit = accounts.edit(2);
    edit.alias = "ada".into();
    assert!(!edit.commit());
    assert!(!ThreadStatus::get());

    assert_eq!(accounts.get(&2), Some(&account("grace", 200)));
    assert_eq!(accounts.by::<ByAlias, _>().len(), 2);
}

#[test]
fn implicit_commit_failure_sets_the_flag() {
    let mut accounts = Accounts::new();
    accounts.insert(1, account("ada", 100));
    accounts.insert(2, account("grace", 200));

    {
        let mut edit = accounts.edit(2);
        edit.alias = "ada".into();
    }
    assert!(!ThreadStatus::get());
    assert_eq!(accounts.get(&2).unwrap().alias, "grace");
}

#[test]
fn edit_of_a_dead_record_revives_on_commit() {
    let mut accounts = Accounts::new();
    let handle = accounts.insert(1, account("ada", 100));
    accounts.remove(handle);
    assert_eq!(accounts.len(), 0);

    let mut edit = accounts.edit(1);
    assert_eq!(edit.alias, "ada");
    edit.balance = 7;
    assert!(edit.commit());

    assert_eq!(accounts.len(), 1);
    assert!(accounts.is_live(handle));
    assert_eq!(accounts.get(&1), Some(&account("ada", 7)));
    assert_eq!(accounts.by::<ByAlias, _>().len(), 1);
}

#[test]
fn unchanged_commit_is_a_noop() {
    let mut accounts = Accounts::new();
    accounts.insert(1, account("ada", 100));

    let edit = accounts.edit(1);
    assert!(edit.commit());
    assert_eq!(accounts.get(&1), Some(&account("ada", 100)));
}
