use confbind::{instantiate, Bindable, Bindings, Configuration, Nested, Simple};

#[derive(Debug, Default)]
struct AppConfig {
    name: String,
    debug: bool,
    database: Option<DatabaseConfig>,
}

#[derive(Debug, Default)]
struct DatabaseConfig {
    host: String,
    port: i32,
    pool_size: Option<i32>,
}

impl Bindable for AppConfig {
    fn bindings() -> Bindings<Self> {
        Bindings::new()
            .simple(Simple::field("name", |c: &mut Self, v: String| c.name = v))
            .simple(Simple::field("debug", |c: &mut Self, v: bool| c.debug = v))
            .nested(Nested::field(
                "database",
                |c: &mut Self, v: Option<DatabaseConfig>| c.database = v,
            ))
    }
}

impl Bindable for DatabaseConfig {
    fn bindings() -> Bindings<Self> {
        Bindings::new()
            .simple(Simple::field("host", |c: &mut Self, v: String| c.host = v))
            .simple(Simple::field("port", |c: &mut Self, v: i32| c.port = v))
            .simple(Simple::field("pool_size", |c: &mut Self, v: Option<i32>| {
                c.pool_size = v
            }))
    }
}

fn main() -> Result<(), confbind::Error> {
    let config = Configuration::parse(
        r#"
        name = "demo-app"
        debug = true

        [database]
        host = "localhost"
        port = "5432"
        "#,
    )?;

    let app: AppConfig = instantiate(&config)?.expect("configuration is not empty");

    println!("App: {} (debug={})", app.name, app.debug);
    if let Some(db) = &app.database {
        println!(
            "Database: {}:{} (pool_size={:?})",
            db.host, db.port, db.pool_size
        );
    }

    Ok(())
}
