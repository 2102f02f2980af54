use clap::{Parser, Subcommand};
use mindbase_backend::config::Config;
use mindbase_backend::setup::db_setup;
use rusqlite::{params, Connection};
use bcrypt::{hash, DEFAULT_COST};
use redb::Database;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial portal setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup {
        db_type: Option<String>,
    }
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => {
                match db_type.as_deref() {
                    Some("accounts") => setup_accounts_database(&config),
                    Some("content") => setup_content_database(&config),
                    Some(other) => eprintln!("Error: Unknown database type '{}'. Use 'accounts' or 'content'.", other),
                    None => {
                        setup_accounts_database(&config);
                        setup_content_database(&config);
                    }
                }
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { username, display_name, password } => {
                create_admin_account(&config, username, display_name, password);
            }
            AdminAction::List => {
                list_admin_accounts(&config);
            }
            AdminAction::ChangePassword { username, new_password } => {
                change_admin_password(&config, username, new_password);
            }
        },
    }
}

fn setup_accounts_database(config: &Config) {
    let db_path = config.accounts_db_path();
    if db_path.exists() {
        println!("Accounts database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up accounts database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create accounts database file.");
    match db_setup::setup_accounts_db(&mut conn) {
        Ok(_) => println!("Accounts database setup completed successfully."),
        Err(e) => eprintln!("Error setting up accounts database: {}", e),
    }
}

fn setup_content_database(config: &Config) {
    let db_path = config.content_db_path();
    if db_path.exists() {
        println!("Content database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up content database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let db = Database::create(&db_path).expect("Failed to create content database file.");
    match db_setup::setup_content_db(&db) {
        Ok(_) => println!("Content database setup completed successfully."),
        Err(e) => eprintln!("Error setting up content database: {}", e),
    }
}

fn create_admin_account(config: &Config, username: &str, display_name: &str, password: &str) {
    let db_path = config.accounts_db_path();
    if !db_path.exists() {
        eprintln!("Error: Accounts database not found at '{}'. Please run `setup_cli db setup` first.", db_path.display());
        return;
    }
    let conn = Connection::open(&db_path).expect("Could not open accounts database.");
    let hashed_password = hash(password, DEFAULT_COST).expect("Failed to hash password");

    match conn.execute(
        "INSERT INTO accounts (username, display_name, password_hash, role) VALUES (?1, ?2, ?3, 'admin')",
        params![username, display_name, hashed_password],
    ) {
        Ok(_) => println!("Admin account '{}' created successfully.", username),
        Err(e) => eprintln!("Error creating admin account: {}. It might be because the username already exists.", e),
    }
}

fn list_admin_accounts(config: &Config) {
    let conn = match Connection::open(&config.accounts_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("Error: Accounts database not found. Please run `setup_cli db setup` first.");
            return;
        }
    };
    let mut stmt = match conn.prepare("SELECT username FROM accounts WHERE role = 'admin' ORDER BY username") {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error preparing database query: {}", e);
            return;
        }
    };
    let account_iter = stmt.query_map([], |row| row.get(0));

    println!("Listing admin accounts:");
    match account_iter {
        Ok(accounts) => {
            for account in accounts {
                println!("- {}", account.unwrap_or_else(|_| "Invalid username".to_string()));
            }
        }
        Err(e) => eprintln!("Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, username: &str, new_password: &str) {
    let conn = match Connection::open(&config.accounts_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("Error: Accounts database not found.");
            return;
        }
    };
    let hashed_password = hash(new_password, DEFAULT_COST).expect("Failed to hash new password");
    match conn.execute(
        "UPDATE accounts SET password_hash = ?1 WHERE username = ?2 AND role = 'admin'",
        params![hashed_password, username],
    ) {
        Ok(0) => eprintln!("Error: No admin account named '{}' found.", username),
        Ok(_) => println!("Password for admin account '{}' changed successfully.", username),
        Err(e) => eprintln!("Error updating password: {}", e),
    }
}
