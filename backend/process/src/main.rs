use std::path::PathBuf;

use clap::{Parser, Subcommand};
use registry::{Credentials, RecordStore, Registry, Role, credentials::DEFAULT_ITERATIONS};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding the collection files.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add an admin account.
    CreateUser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long, default_value = "admin")]
        role: Role,

        #[arg(long, env = "PASSWORD_ITERATIONS", default_value_t = DEFAULT_ITERATIONS)]
        iterations: u32,
    },
    /// Append centers from a JSON array, keeping their ids.
    ImportCenters { file: PathBuf },
    /// Append symbols from a JSON array, keeping their ids.
    ImportSigns { file: PathBuf },
    /// Append candidates from a JSON array, keeping their ids.
    ImportCandidates { file: PathBuf },
    ListUsers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let registry = Registry::new(RecordStore::new(&args.data_dir));

    println!("Data directory: {}\n", args.data_dir.display());

    match args.command {
        Command::CreateUser {
            username,
            password,
            role,
            iterations,
        } => {
            let user = process::create_user(
                &registry,
                Credentials::new(iterations),
                &username,
                &password,
                role,
            )
            .await?;

            println!("Created {} ({}) with id {}", user.username, user.role, user.id);
        }
        Command::ImportCenters { file } => {
            process::import_file(&registry.centers, &file).await?;
        }
        Command::ImportSigns { file } => {
            process::import_file(&registry.signs, &file).await?;
        }
        Command::ImportCandidates { file } => {
            process::import_file(&registry.candidates, &file).await?;
        }
        Command::ListUsers => {
            for user in registry.users.list().await? {
                println!("{:<38} {:<12} {}", user.id, user.role, user.username);
            }
        }
    }

    Ok(())
}
