use polytable::{Handle, IndexSpec, MultiHashMap, MultiIndex, NoInvalidate, UniqueHashMap};

#[derive(Clone, Debug, PartialEq)]
struct Product {
    name: String,
    category: String,
    price_cents: u64,
    rank: u32,
}

fn product(name: &str, category: &str, price_cents: u64, rank: u32) -> Product {
    Product {
        name: name.into(),
        category: category.into(),
        price_cents,
        rank,
    }
}

struct ByCategory;

impl IndexSpec<u32, Product> for ByCategory {
    type SubKey = String;
    type Map<R: Clone + Eq> = MultiHashMap<String, R>;

    fn project(_id: &u32, product: &Product) -> String {
        product.category.clone()
    }
}

struct ByName;

impl IndexSpec<u32, Product> for ByName {
    type SubKey = String;
    type Map<R: Clone + Eq> = UniqueHashMap<String, R>;

    fn project(_id: &u32, product: &Product) -> String {
        product.name.clone()
    }
}

type Catalog =
    MultiIndex<u32, Product, NoInvalidate, UniqueHashMap<u32, usize>, (ByCategory, ByName)>;

#[test]
fn count_and_erase_by_category() {
    let mut catalog = Catalog::new();
    catalog.insert(1, product("widget", "hardware", 2999, 1));
    catalog.insert(2, product("gizmo", "software", 4999, 2));
    catalog.insert(3, product("tool", "hardware", 2999, 3));

    let hardware = "hardware".to_string();
    assert_eq!(catalog.by::<ByCategory, _>().count(&hardware), 2);
    assert_eq!(catalog.remove_by::<ByCategory, _>(&hardware), 2);

    assert_eq!(catalog.len(), 1);
    assert!(catalog.contains(&2));
    assert!(!catalog.contains(&1));
    assert!(!catalog.contains(&3));
    assert!(!catalog.by::<ByCategory, _>().contains(&hardware));
}

#[test]
fn duplicate_primary_key_returns_existing() {
    let mut catalog = Catalog::new();
    let first = catalog.insert(7, product("widget", "hardware", 100, 1));

    let (handle, inserted) = catalog.emplace(7, product("other", "software", 200, 2));
    assert!(!inserted);
    assert_eq!(handle, first);
    assert_eq!(catalog.get(&7).unwrap().name, "widget");

    let err = catalog
        .try_insert(7, product("third", "software", 300, 3))
        .unwrap_err();
    assert_eq!(err.key, 7);
    assert_eq!(err.payload.name, "third");
}

#[test]
fn unique_secondary_rejection_rolls_back() {
    let mut catalog = Catalog::new();
    catalog.insert(1, product("widget", "hardware", 100, 1));

    // Same name as an existing record: the unique ByName index rejects it
    // after ByCategory was already written, which must be undone.
    let (handle, inserted) = catalog.emplace(2, product("widget", "software", 200, 2));
    assert!(!inserted);
    assert!(handle.is_null());

    assert_eq!(catalog.len(), 1);
    assert!(!catalog.contains(&2));
    assert_eq!(catalog.by::<ByCategory, _>().count(&"software".to_string()), 0);
    assert_eq!(catalog.by::<ByCategory, _>().len(), 1);
    assert_eq!(catalog.by::<ByName, _>().len(), 1);
}

#[test]
fn modify_updates_every_index() {
    let mut catalog = Catalog::new();
    let handle = catalog.insert(1, product("widget", "hardware", 100, 1));
    catalog.insert(2, product("gizmo", "software", 200, 2));

    assert!(catalog.modify(handle, |p| p.category = "software".into()));

    assert_eq!(catalog.by::<ByCategory, _>().count(&"software".to_string()), 2);
    assert_eq!(catalog.by::<ByCategory, _>().count(&"hardware".to_string()), 0);
    assert_eq!(catalog.by::<ByName, _>().find(&"widget".to_string()), Some(handle));
}

#[test]
fn colliding_modify_restores_old_state() {
    let mut catalog = Catalog::new();
    let first = catalog.insert(1, product("widget", "hardware", 100, 1));
    let second = catalog.insert(2, product("gizmo", "software", 200, 2));

    // Renaming record 2 to "widget" collides in the unique ByName index.
    assert!(!catalog.modify(second, |p| p.name = "widget".into()));

    assert_eq!(catalog.get(&2), Some(&product("gizmo", "software", 200, 2)));
    assert_eq!(catalog.by::<ByName, _>().find(&"widget".to_string()), Some(first));
    assert_eq!(catalog.by::<ByName, _>().find(&"gizmo".to_string()), Some(second));
    assert_eq!(catalog.by::<ByCategory, _>().count(&"software".to_string()), 1);
    assert_eq!(catalog.by::<ByCategory, _>().count(&"hardware".to_string()), 1);
}

#[test]
fn replace_equal_payload_is_a_noop() {
    let mut catalog = Catalog::new();
    let handle = catalog.insert(1, product("widget", "hardware", 100, 1));

    assert!(catalog.replace(handle, product("widget", "hardware", 100, 1)));
    assert_eq!(catalog.len(), 1);

    assert!(catalog.replace(handle, product("widget", "hardware", 150, 1)));
    assert_eq!(catalog.get(&1).unwrap().price_cents, 150);
}

#[test]
fn identity_modify_leaves_indices_pointwise_unchanged() {
    let mut catalog = Catalog::new();
    let handle = catalog.insert(1, product("widget", "hardware", 100, 1));
    catalog.insert(2, product("gizmo", "software", 200, 2));

    let entries = |catalog: &Catalog| -> Vec<(String, u32)> {
        let mut entries: Vec<_> = catalog
            .by::<ByName, _>()
            .iter()
            .map(|(name, h)| (name.clone(), *catalog.key_of(h).unwrap()))
            .collect();
        entries.sort();
        entries
    };
    let before = entries(&catalog);

    assert!(catalog.modify(handle, |_| {}));

    let after = entries(&catalog);
    assert_eq!(before, after);
    assert_eq!(catalog.get(&1), Some(&product("widget", "hardware", 100, 1)));
}

#[test]
fn insert_or_replace_upserts() {
    let mut catalog = Catalog::new();
    let (first, inserted) = catalog.insert_or_replace(1, product("widget", "hardware", 100, 1));
    assert!(inserted);

    let (again, inserted) = catalog.insert_or_replace(1, product("widget", "hardware", 900, 1));
    assert!(!inserted);
    assert_eq!(again, first);
    assert_eq!(catalog.get(&1).unwrap().price_cents, 900);
}

#[test]
fn lookup_on_empty_table() {
    let catalog = Catalog::new();
    assert_eq!(catalog.find(&1), None);
    assert_eq!(catalog.count(&1), 0);
    assert_eq!(catalog.get_all(&1).count(), 0);
    assert!(catalog.is_empty());
}

#[test]
fn with_capacity_reserves_storage() {
    let catalog = Catalog::with_capacity(32);
    assert!(catalog.capacity() >= 32);
    assert!(catalog.is_empty());
}

#[test]
fn remove_absent_key_is_zero() {
    let mut catalog = Catalog::new();
    catalog.insert(1, product("widget", "hardware", 100, 1));
    assert_eq!(catalog.remove_key(&99), 0);
    assert_eq!(catalog.remove_by::<ByCategory, _>(&"nope".to_string()), 0);
}

#[test]
fn handles_resolve_through_the_table() {
    let mut catalog = Catalog::new();
    let handle = catalog.insert(5, product("widget", "hardware", 100, 1));

    assert_eq!(catalog.key_of(handle), Some(&5));
    assert_eq!(catalog.payload_of(handle).unwrap().name, "widget");
    assert!(catalog.is_live(handle));
    assert_eq!(catalog.key_of(Handle::null()), None);
}

#[test]
fn debug_output_lists_live_entries() {
    let mut catalog = Catalog::new();
    catalog.insert(1, product("widget", "hardware", 100, 1));
    let rendered = format!("{catalog:?}");
    assert!(rendered.contains("widget"));
}
