//! todoclient - command-line front end for the to-do API.
//!
//! # Usage
//!
//! ```bash
//! todoclient login -u alice -p secret1
//! todoclient add "Buy milk" -d "two litres"
//! todoclient list
//! todoclient complete <id>
//! todoclient logout
//! ```
//!
//! Session tokens are kept in `.todoclient/session.json` unless the config
//! file selects another token store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use todoclient::config::{
    config_schema, load_config, ConfigV1, FileTokenStoreConfig, TokenStoreConfig,
};
use todoclient::models::{Credentials, NewTodo, Registration, Todo, TodoPatch};
use todoclient::startup::build_session;
use todoclient::utils::logger::init_logging;
use todoclient::{ClientError, Session};

#[derive(Parser)]
#[command(name = "todoclient")]
#[command(author, version, about = "Manage your to-do list from the terminal")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "./config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session tokens
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// End the session
    Logout,
    /// Show the current user
    Whoami,
    /// List all to-dos
    List,
    /// Show one to-do
    Show { id: String },
    /// Create a to-do
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Change a to-do
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Delete a to-do
    Delete { id: String },
    /// Mark a to-do completed
    Complete { id: String },
    /// Mark a to-do not completed
    Incomplete { id: String },
    /// Print the JSON schema of the configuration file
    Schema,
}

fn default_config() -> ConfigV1 {
    ConfigV1 {
        token_store: TokenStoreConfig::File(FileTokenStoreConfig {
            path: PathBuf::from(".todoclient/session.json"),
        }),
        ..ConfigV1::default()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Schema = cli.command {
        return match config_schema() {
            Ok(schema) => {
                println!("{}", schema);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error rendering schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&cli.config, default_config()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let session = match build_session(Arc::new(config)).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error starting session: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&session, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(session: &Session, command: Commands) -> Result<(), ClientError> {
    let auth = session.auth();
    let todos = session.todos();

    match command {
        Commands::Login { username, password } => {
            auth.login(&Credentials::new(username, password)).await?;
            println!("Logged in.");
        }
        Commands::Register {
            username,
            password,
            confirm_password,
        } => {
            auth.register(&Registration::new(username, password, confirm_password))
                .await?;
            println!("Account created, logged in.");
        }
        Commands::Logout => {
            auth.logout().await?;
            println!("Logged out.");
        }
        Commands::Whoami => match auth.current_user().await? {
            Some(user) => println!(
                "{} {} <{}> ({})",
                user.first_name, user.last_name, user.email, user.id
            ),
            None => println!("Not logged in."),
        },
        Commands::List => {
            let list = todos.list_todos().await?;
            if list.is_empty() {
                println!("Nothing to do.");
            }
            for todo in &list {
                print_todo(todo);
            }
        }
        Commands::Show { id } => {
            let todo = todos.get_todo(&id).await?;
            print_todo(&todo);
            if let Some(description) = todo.description.as_deref().filter(|d| !d.is_empty()) {
                println!("    {}", description);
            }
            println!(
                "    created {}, updated {}",
                todo.created_at.to_rfc3339(),
                todo.updated_at.to_rfc3339()
            );
        }
        Commands::Add { title, description } => {
            let todo = todos
                .create_todo(&NewTodo::new(&title, description.as_deref()))
                .await?;
            print_todo(&todo);
        }
        Commands::Edit {
            id,
            title,
            description,
            completed,
        } => {
            let mut patch = TodoPatch::default();
            if let Some(title) = title {
                patch = patch.title(&title);
            }
            if let Some(description) = description {
                patch = patch.description(&description);
            }
            if let Some(completed) = completed {
                patch = patch.completed(completed);
            }
            print_todo(&todos.update_todo(&id, &patch).await?);
        }
        Commands::Delete { id } => {
            todos.delete_todo(&id).await?;
            println!("Deleted {}.", id);
        }
        Commands::Complete { id } => print_todo(&todos.set_completed(&id, true).await?),
        Commands::Incomplete { id } => print_todo(&todos.set_completed(&id, false).await?),
        Commands::Schema => {
            let schema = config_schema().map_err(|e| ClientError::Decode(e.to_string()))?;
            println!("{}", schema);
        }
    }
    Ok(())
}

fn print_todo(todo: &Todo) {
    let mark = if todo.completed { "x" } else { " " };
    println!("[{}] {}  {}", mark, todo.id, todo.title);
}

fn report(error: &ClientError) {
    match error {
        ClientError::Validation(errors) => {
            for (field, field_errors) in errors.field_errors() {
                for e in field_errors {
                    let message = e
                        .message
                        .as_ref()
                        .map_or_else(|| e.code.to_string(), |m| m.to_string());
                    eprintln!("{}: {}", field, message);
                }
            }
        }
        ClientError::SessionExpired => {
            eprintln!("Session expired. Please login again: todoclient login");
        }
        other => eprintln!("Error: {}", other),
    }
}
