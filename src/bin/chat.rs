//! Terminal chat front-end. Run a relay first, then:
//! cargo run --bin globeguide-chat

use clap::Parser;
use dotenv::dotenv;
use globeguide::client::{ ChatSession, RelayClient };
use globeguide::config::prompt::DEFAULT_GREETING;
use globeguide::models::chat::Role;
use std::error::Error;
use std::io::Write;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for a running GlobeGuide relay")]
struct ChatArgs {
    /// Chat endpoint of the relay to talk to.
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:4000/api/chat")]
    relay_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = ChatArgs::parse();

    let client = RelayClient::new(args.relay_url);
    let mut session = ChatSession::new(DEFAULT_GREETING);

    println!("{}", DEFAULT_GREETING);
    println!("(type your message, or an empty line to quit)");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => line,
            _ => break,
        };

        // Print the assistant reply incrementally: emit the suffix the last
        // message grew by, or reprint it when the turn failed and the
        // placeholder was swapped for the error message.
        let mut shown = String::new();
        client.submit_turn(&mut session, &line, |s| {
            if let Some(last) = s.messages().last() {
                if last.role != Role::Assistant {
                    return;
                }
                match last.content.strip_prefix(shown.as_str()) {
                    Some(delta) => {
                        print!("{}", delta);
                        std::io::stdout().flush().ok();
                    }
                    None => {
                        println!();
                        print!("{}", last.content);
                        std::io::stdout().flush().ok();
                    }
                }
                shown = last.content.clone();
            }
        }).await;
        println!();
    }

    Ok(())
}
