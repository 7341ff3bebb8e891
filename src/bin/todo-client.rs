//! Command-line front end for the todo API.
//!
//! ```bash
//! todo-client list
//! todo-client add "Bygg Todo-app" "Skapa en fullstack applikation"
//! todo-client edit 2 "Bygg Todo-app i Rust"
//! todo-client toggle 2
//! todo-client delete 2
//! todo-client --admin-token s3cret init-db
//! ```

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use todo_api::client::{ClientError, HttpTodoApi, TodoApi, TodoBoard};

#[derive(Parser, Debug)]
#[command(name = "todo-client")]
#[command(about = "Manage todos through the todo API", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the API, including the `/api` prefix
    #[arg(long, env = "TODO_API_URL", default_value = "http://localhost:5000/api")]
    api_url: String,

    /// Token sent as `X-Admin-Token` with `init-db`
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List every todo, newest first
    List,

    /// Create a todo
    Add {
        #[arg(value_name = "TITLE")]
        title: String,

        #[arg(value_name = "DESCRIPTION")]
        description: Option<String>,
    },

    /// Change the title and/or description of a todo
    Edit {
        id: i32,

        #[arg(value_name = "TITLE")]
        title: Option<String>,

        #[arg(value_name = "DESCRIPTION")]
        description: Option<String>,
    },

    /// Flip the completed flag of a todo
    Toggle { id: i32 },

    /// Delete a todo permanently
    Delete { id: i32 },

    /// Drop the todos table and reseed it
    InitDb,
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut api = HttpTodoApi::new(cli.api_url);
    if let Some(token) = cli.admin_token {
        api = api.with_admin_token(token);
    }
    let mut board = TodoBoard::new(api);

    match cli.command.unwrap_or(Command::List) {
        Command::List => board.refresh().await?,
        Command::Add { title, description } => {
            let draft = board.draft_mut();
            draft.title = title;
            draft.description = description.unwrap_or_default();
            if !board.submit_draft().await? {
                return Err("title is required".into());
            }
        }
        Command::Edit {
            id,
            title,
            description,
        } => {
            board.refresh().await?;
            board.start_edit(id)?;
            if let Some(edit) = board.editing_mut() {
                if let Some(title) = title {
                    edit.title = title;
                }
                if let Some(description) = description {
                    edit.description = description;
                }
            }
            board.save_edit().await?;
        }
        Command::Toggle { id } => {
            board.refresh().await?;
            board.toggle_complete(id).await?;
        }
        Command::Delete { id } => board.delete(id).await?,
        Command::InitDb => {
            let records = board.api().reset().await?;
            eprintln!("database reset with {records} seed todos");
            board.refresh().await?;
        }
    }

    print!("{}", board.render());
    Ok(())
}

#[rocket::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(ClientError::Api { status, message }) = err.downcast_ref::<ClientError>() {
                eprintln!("error: server answered {status}: {message}");
            } else {
                eprintln!("error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}
