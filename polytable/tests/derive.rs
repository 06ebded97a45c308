use polytable::PolyTable;

macro_rules! assert_eq_sorted {
    ($left:expr, $right:expr) => {
        let mut left: Vec<_> = $left.into_iter().collect();
        let mut right: Vec<_> = $right.into_iter().collect();
        left.sort();
        right.sort();
        assert_eq!(left, right);
    };
}

#[derive(Debug, Clone, PartialEq, PolyTable)]
#[polytable(key = id)]
#[polytable(index(fields(value)))]
pub struct Item {
    pub id: u32,
    pub value: u32,
}

#[test]
fn test_remove() {
    let mut table = ItemTable::new();

    let a = table.insert(Item { id: 10, value: 0 });
    let b = table.insert(Item { id: 11, value: 1 });
    let c = table.insert(Item { id: 12, value: 0 });
    let d = table.insert(Item { id: 13, value: 0 });

    assert_eq_sorted!(table.get_by_value(0), [a, d, c]);
    table.remove(d);
    assert_eq_sorted!(table.get_by_value(0), [a, c]);
    table.remove(c);
    assert_eq_sorted!(table.get_by_value(0), [a]);
    table.remove(a);
    assert_eq_sorted!(table.get_by_value(0), []);
    assert_eq_sorted!(table.get_by_value(1), [b]);
}

#[test]
fn test_remove_reinsert() {
    let mut table = ItemTable::new();

    let a = table.insert(Item { id: 10, value: 0 });
    table.insert(Item { id: 11, value: 1 });
    let c = table.insert(Item { id: 12, value: 0 });
    let d = table.insert(Item { id: 13, value: 0 });

    assert_eq_sorted!(table.get_by_value(0), [a, d, c]);
    let item = table.resolve(c).map(|(_, item)| item.clone()).unwrap();
    table.remove(c);
    assert!(!table.contains(&12));
    assert_eq_sorted!(table.get_by_value(0), [a, d]);
    table.insert(item);
    assert_eq!(table.get_by_value(0).count(), 3);
}

#[derive(Debug, Clone, PartialEq, PolyTable)]
#[polytable(module = badge, key = id, policy = "update_pointer_tombstones")]
#[polytable(index(fields(owner), unique, getter = find_by_owner))]
#[polytable(index(fields(kind)))]
pub struct Badge {
    pub id: u64,
    pub owner: String,
    pub kind: u8,
}

#[test]
fn unique_getter_and_tombstones() {
    let mut table = badge::Table::new();
    let ada = table.insert(Badge {
        id: 1,
        owner: "ada".into(),
        kind: 0,
    });
    table.insert(Badge {
        id: 2,
        owner: "grace".into(),
        kind: 0,
    });

    assert_eq!(table.find_by_owner("ada".into()), Some(ada));
    assert_eq!(table.get_by_kind(0).count(), 2);

    // A second badge for an existing owner is rejected by the unique index.
    let rejected = table.try_insert(Badge {
        id: 3,
        owner: "ada".into(),
        kind: 1,
    });
    assert!(rejected.is_err());
    assert_eq!(table.len(), 2);
    assert_eq!(table.get_by_kind(1).count(), 0);

    // Tombstone and revive through the derived table.
    table.remove(ada);
    assert_eq!(table.len(), 1);
    assert_eq!(table.physical_len(), 2);
    assert_eq!(table.find_by_owner("ada".into()), None);

    table.insert(Badge {
        id: 1,
        owner: "ada".into(),
        kind: 3,
    });
    assert_eq!(table.len(), 2);
    assert_eq!(table.physical_len(), 2);
    assert_eq!(table.find_by_owner("ada".into()), Some(ada));
}

#[test]
fn from_iterator_collects() {
    let table: ItemTable = (0u32..4).map(|n| Item { id: n, value: n % 2 }).collect();
    assert_eq!(table.len(), 4);
    assert_eq!(table.get_by_value(0).count(), 2);
}
