//! Contacts Demo
//!
//! Loads the address-book model, then creates, queries, updates and watches
//! people through the record façade.
//!
//! Usage: `contacts [config.ron] [model.ron|model-dir]`. Set `RUST_LOG` to
//! see the library's logs (defaults to `info`).

use rekord_core::{props, Condition, Model, Record, Sort, Value};
use rekord_db::{Context, FieldObserver, RekordConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Person;
impl Model for Person {}

/// Logs every field the façade writes.
struct AuditLog;

impl FieldObserver for AuditLog {
    fn will_change(&self, record: &Record, field: &str) {
        tracing::trace!(record = %record.id, field, old = %record.get_or_null(field), "will change");
    }

    fn did_change(&self, record: &Record, field: &str) {
        tracing::debug!(record = %record.id, field, new = %record.get_or_null(field), "changed");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from).unwrap_or_else(|| root.join("rekord.ron"));
    let model_path = args.next().map(PathBuf::from).unwrap_or_else(|| root.join("model"));

    let config = RekordConfig::load(&config_path)?;
    let schemas = rekord_model::load_model(&model_path)?;
    info!(entities = schemas.len(), "Loaded model");

    let ctx = Context::open(config, schemas)?;
    ctx.add_observer(Arc::new(AuditLog));

    let people = ctx.model::<Person>();
    let mut watch = ctx.watch("Person", Condition::raw("age >= %@", vec![Value::Int(30)]), "lastName")?;
    println!("Adults at start: {}", watch.current().len());

    // Remote keys, string numbers and nested maps are all accepted.
    people.create_with(&props! {
        "given_name" => "Ada",
        "last_name" => "Lovelace",
        "age" => "36",
        "active" => "YES",
        "born" => "1815-12-10 00:00:00 GMT",
        "employer" => props! { "name" => "Analytical Engines", "founded" => "1834" },
        "pets" => vec![
            Value::from(props! { "name" => "Pixel", "species" => "cat" }),
            Value::from(props! { "name" => "Byte", "species" => "dog" }),
        ],
    })?;
    people.create_with(&props! { "firstName" => "Charles", "lastName" => "Babbage", "age" => 79 })?;
    people.create_with(&props! { "firstName" => "Alan", "lastName" => "Turing", "age" => 24 })?;

    // Same employer map resolves to the existing company.
    let grace = people.find_or_create(&props! {
        "firstName" => "Grace",
        "lastName" => "Hopper",
        "employer" => props! { "name" => "Analytical Engines", "founded" => 1834 },
    })?;
    println!("Companies: {}", ctx.entity("Company").count(Condition::all())?);

    if let Some(changed) = watch.try_next() {
        println!("Adults after inserts: {}", changed.len());
    }

    println!("\nEveryone by age, oldest first:");
    for person in people.all("age DESC, lastName") {
        println!(
            "  #{} {} {} ({})",
            person.get_or_null("id"),
            person.get_or_null("firstName"),
            person.get_or_null("lastName"),
            person.get_or_null("age"),
        );
    }

    let colleagues = people.query(
        Condition::raw("%K == %@", vec![Value::from("employer.name"), Value::from("Analytical Engines")]),
        vec![props! { "firstName" => "ASC" }],
        None,
    );
    println!("\nAnalytical Engines staff: {}", colleagues.len());

    if let Some(mut alan) = people.find(props! { "lastName" => "Turing" }, Sort::Unsorted) {
        ctx.update(&mut alan, &props! { "age" => "41", "unknown" => "dropped" })?;
        println!("Turing is now {}", alan.get_or_null("age"));
    }

    let under_forty = people.count("age < 40")?;
    println!("Under forty: {}", under_forty);

    ctx.delete(&grace)?;
    println!("Saved: {}", ctx.save()?);
    println!("Nothing left to save: {}", !ctx.save()?);

    watch.cancel();
    Ok(())
}
