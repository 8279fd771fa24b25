use common::config::Config;
use std::{env, fs, path::Path};

mod runner;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Same DATABASE_URL the services connect to.
    let database_url = Config::from_env().database_url;
    let (db_path, url) = sqlite_target(&database_url);
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("clean") => {
            remove_db_file(db_path);
        }
        Some("fresh") => {
            remove_db_file(db_path);
            create_db_dir(db_path);
            runner::run_all_migrations(&url).await;
        }
        _ => {
            create_db_dir(db_path);
            runner::run_all_migrations(&url).await;
        }
    }
}

fn remove_db_file(path: &str) {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).expect("Failed to delete DB file");
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
}

fn create_db_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).expect("Failed to create DB directory");
        }
    }
}

/// Splits a DSN or bare path into the SQLite file path and a connect URL.
fn sqlite_target(database_url: &str) -> (&str, String) {
    match database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
    {
        Some(rest) => {
            let path = rest.split('?').next().unwrap_or(rest);
            (path, database_url.to_owned())
        }
        None => (database_url, format!("sqlite://{database_url}?mode=rwc")),
    }
}
