mod common;

use common::contacts;
use rekord_core::{props, Condition, Sort, Value};
use rekord_db::{Context, NativeStore, PersistentStore, RekordConfig};

fn on_disk(dir: &tempfile::TempDir) -> RekordConfig {
    RekordConfig::default()
        .with_store_path(dir.path().join("contacts.db"))
        .with_counter_path(dir.path().join("counters.ron"))
        .with_generate_relationships(true)
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let ctx = Context::open(on_disk(&dir), contacts()).unwrap();
        let people = ctx.entity("Person");
        people
            .create_with(&props! {
                "given_name" => "Ada",
                "born" => "1815-12-10 00:00:00 UTC",
                "employer" => props! { "name" => "Analytical Engines" },
            })
            .unwrap();
        people.create_with(&props! { "firstName" => "Alan" }).unwrap();
        assert!(ctx.save().unwrap());
    }

    let ctx = Context::open(on_disk(&dir), contacts()).unwrap();
    let people = ctx.entity("Person");
    let all = people.all("id");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].get_str("firstName"), Some("Ada"));
    assert_eq!(all[0].get_int("id"), Some(0));
    assert_eq!(all[1].get_int("id"), Some(1));
    assert!(matches!(all[0].get("born"), Some(Value::Date(_))));

    let staff = people.query(
        Condition::raw("employer.name == %@", vec![Value::from("Analytical Engines")]),
        Sort::Unsorted,
        None,
    );
    assert_eq!(staff.len(), 1);

    // counters and store ids both continue where they left off
    let grace = people.create().unwrap();
    assert_eq!(grace.get_int("id"), Some(2));
    assert!(all.iter().all(|r| r.id < grace.id));
}

#[test]
fn drop_saves_staged_changes() {
    let dir = tempfile::tempdir().unwrap();
    {
        let ctx = Context::open(on_disk(&dir), contacts()).unwrap();
        ctx.entity("Company").create_with(&props! { "name" => "Acme" }).unwrap();
    }

    let ctx = Context::open(on_disk(&dir), contacts()).unwrap();
    assert_eq!(ctx.entity("Company").count(Condition::all()).unwrap(), 1);
}

#[test]
fn drop_without_save_on_drop_discards() {
    let dir = tempfile::tempdir().unwrap();
    {
        let ctx = Context::open(on_disk(&dir).with_save_on_drop(false), contacts()).unwrap();
        ctx.entity("Company").create_with(&props! { "name" => "Acme" }).unwrap();
    }

    let ctx = Context::open(on_disk(&dir), contacts()).unwrap();
    assert_eq!(ctx.entity("Company").count(Condition::all()).unwrap(), 0);
}

#[test]
fn deletes_are_staged_until_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.db");

    let store = NativeStore::open(&path, contacts()).unwrap();
    let mut acme = store.insert("Company").unwrap();
    acme.set("name", "Acme");
    store.put(&acme).unwrap();
    store.save().unwrap();

    store.delete(acme.id).unwrap();
    assert!(store.has_changes());
    assert_eq!(store.get(acme.id).unwrap(), None);
    drop(store);

    // the delete was never saved
    let store = NativeStore::open(&path, contacts()).unwrap();
    assert_eq!(store.get(acme.id).unwrap(), Some(acme.clone()));
    store.delete(acme.id).unwrap();
    store.save().unwrap();
    drop(store);

    let store = NativeStore::open(&path, contacts()).unwrap();
    assert_eq!(store.get(acme.id).unwrap(), None);
}

#[test]
fn counters_are_shared_through_the_counter_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = RekordConfig::default().with_counter_path(dir.path().join("counters.ron"));

    let first = Context::open(config.clone(), contacts()).unwrap();
    let second = Context::open(config.clone(), contacts()).unwrap();

    let ids: Vec<i64> = [&first, &second, &first]
        .iter()
        .map(|ctx| ctx.entity("Person").create().unwrap().get_int("id").unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
    drop(first);
    drop(second);

    let third = Context::open(config, contacts()).unwrap();
    assert_eq!(third.entity("Person").create().unwrap().get_int("id"), Some(3));
}

#[test]
fn failed_create_leaves_nothing_staged() {
    let dir = tempfile::tempdir().unwrap();
    let counter_path = dir.path().join("counters.ron");
    let ctx = Context::open(on_disk(&dir), contacts()).unwrap();
    let people = ctx.entity("Person");
    std::fs::write(&counter_path, "not ron {{{").unwrap();

    assert!(people.create_with(&props! { "firstName" => "Ada" }).is_err());
    assert!(people.create().is_err());
    assert_eq!(people.count(Condition::all()).unwrap(), 0);

    // nothing reaches disk either
    ctx.save().unwrap();
    drop(ctx);
    std::fs::remove_file(&counter_path).unwrap();
    let ctx = Context::open(on_disk(&dir), contacts()).unwrap();
    assert_eq!(ctx.entity("Person").count(Condition::all()).unwrap(), 0);
}
