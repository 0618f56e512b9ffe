use clap::Parser;
use registry::Role;
use server::{config::Config, session::Sessions};

/// Prints a session cookie signed with the configured secret, for poking a
/// local server with curl.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    user_id: String,

    #[arg(long, default_value = "superadmin")]
    role: Role,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load()?;
    let sessions = Sessions::new(&config.auth_secret);

    let token = sessions.sign_session(&args.user_id, args.role)?;

    println!("Cookie: session={token}");
    println!("\ncurl -H 'Cookie: session={token}' http://localhost:{}/admin", config.port);

    Ok(())
}
