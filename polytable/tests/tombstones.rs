//! Lazy deletion: dead records, revival, and compaction.

use polytable::{
    IndexSpec, MultiHashMap, MultiIndex, SecondaryMap, UniqueHashMap, UpdatePointerTombstones,
};

#[derive(Clone, Debug, PartialEq)]
struct Note {
    text: String,
    shelf: u8,
}

fn note(text: &str, shelf: u8) -> Note {
    Note {
        text: text.into(),
        shelf,
    }
}

struct ByShelf;

impl IndexSpec<u32, Note> for ByShelf {
    type SubKey = u8;
    type Map<R: Clone + Eq> = MultiHashMap<u8, R>;

    fn project(_id: &u32, note: &Note) -> u8 {
        note.shelf
    }
}

type Shelves =
    MultiIndex<u32, Note, UpdatePointerTombstones, UniqueHashMap<u32, usize>, (ByShelf,)>;

#[test]
fn erase_tombstones_and_reinsert_revives() {
    let mut shelves = Shelves::new();
    for key in 0u32..5 {
        shelves.insert(key, note(&format!("note-{key}"), (key % 2) as u8));
    }

    assert_eq!(shelves.remove_key(&1), 1);
    assert_eq!(shelves.remove_key(&3), 1);

    assert_eq!(shelves.len(), 3);
    assert_eq!(shelves.physical_len(), 5);
    // Dead records stay in the primary map until compaction.
    assert_eq!(shelves.primary().len(), 5);
    let mut keys: Vec<u32> = shelves.keys().copied().collect();
    keys.sort();
    assert_eq!(keys, vec![0, 2, 4]);

    // Reinsertion of a dead key revives the slot instead of growing storage.
    let (handle, inserted) = shelves.emplace(1, note("reborn", 1));
    assert!(inserted);
    assert!(shelves.is_live(handle));
    assert_eq!(shelves.len(), 4);
    assert_eq!(shelves.physical_len(), 5);
    assert_eq!(shelves.get(&1).unwrap().text, "reborn");

    shelves.compact();
    assert_eq!(shelves.len(), 4);
    assert_eq!(shelves.physical_len(), 4);
    assert_eq!(shelves.get(&1).unwrap().text, "reborn");
}

#[test]
fn dead_records_are_invisible_to_lookup() {
    let mut shelves = Shelves::new();
    shelves.insert(1, note("a", 0));
    let handle = shelves.find(&1).unwrap();
    shelves.remove(handle);

    assert_eq!(shelves.find(&1), None);
    assert!(!shelves.contains(&1));
    assert_eq!(shelves.count(&1), 0);
    assert_eq!(shelves.get_all(&1).count(), 0);
    assert_eq!(shelves.iter().count(), 0);
    assert_eq!(shelves.by::<ByShelf, _>().count(&0), 0);

    // The handle still observes the dead record.
    assert!(!shelves.is_live(handle));
    assert_eq!(shelves.resolve(handle).unwrap().1.text, "a");

    // Erasing a dead record again is a no-op.
    assert!(!shelves.remove(handle));
    assert_eq!(shelves.remove_key(&1), 0);
}

#[test]
fn modify_revives_a_dead_record() {
    let mut shelves = Shelves::new();
    let handle = shelves.insert(1, note("a", 0));
    shelves.remove(handle);
    assert_eq!(shelves.len(), 0);

    assert!(shelves.modify(handle, |n| n.text = "risen".into()));

    assert_eq!(shelves.len(), 1);
    assert!(shelves.is_live(handle));
    assert_eq!(shelves.get(&1).unwrap().text, "risen");
    assert_eq!(shelves.by::<ByShelf, _>().count(&0), 1);
}

#[test]
fn clear_resets_everything() {
    let mut shelves = Shelves::new();
    shelves.insert(1, note("a", 0));
    shelves.insert(2, note("b", 1));
    shelves.remove_key(&1);

    shelves.clear();
    assert_eq!(shelves.len(), 0);
    assert_eq!(shelves.physical_len(), 0);
    assert!(!shelves.contains(&2));
    assert!(shelves.by::<ByShelf, _>().is_empty());
}

// Revival that collides in a unique secondary: the record stays dead and
// keeps the payload that failed to move in.

#[derive(Clone, Debug, PartialEq)]
struct Badge {
    owner: String,
}

struct ByOwner;

impl IndexSpec<u32, Badge> for ByOwner {
    type SubKey = String;
    type Map<R: Clone + Eq> = UniqueHashMap<String, R>;

    fn project(_id: &u32, badge: &Badge) -> String {
        badge.owner.clone()
    }
}

type Badges =
    MultiIndex<u32, Badge, UpdatePointerTombstones, UniqueHashMap<u32, usize>, (ByOwner,)>;

#[test]
fn failed_revival_stays_dead() {
    let mut badges = Badges::new();
    let first = badges.insert(
        1,
        Badge {
            owner: "ada".into(),
        },
    );
    badges.remove(first);
    badges.insert(
        2,
        Badge {
            owner: "grace".into(),
        },
    );

    // Reviving key 1 with grace's name collides in ByOwner.
    let (handle, inserted) = badges.emplace(
        1,
        Badge {
            owner: "grace".into(),
        },
    );
    assert!(!inserted);
    assert!(handle.is_null());

    assert_eq!(badges.len(), 1);
    assert_eq!(badges.physical_len(), 2);
    assert!(!badges.is_live(first));
    // The failed payload moved in before the rejection and stays.
    assert_eq!(badges.resolve(first).unwrap().1.owner, "grace");
    assert_eq!(
        badges.by::<ByOwner, _>().find(&"grace".to_string()),
        badges.find(&2)
    );
}

#[test]
fn compact_drops_dead_records_only() {
    let mut badges = Badges::new();
    for key in 0u32..6 {
        badges.insert(
            key,
            Badge {
                owner: format!("owner-{key}"),
            },
        );
    }
    badges.remove_key(&0);
    badges.remove_key(&5);

    badges.compact();

    assert_eq!(badges.len(), 4);
    assert_eq!(badges.physical_len(), 4);
    for key in 1u32..5 {
        assert_eq!(badges.get(&key).unwrap().owner, format!("owner-{key}"));
    }
    assert!(!badges.contains(&0));
    assert!(!badges.contains(&5));
}
