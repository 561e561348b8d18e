use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };

use crate::client::clipboard::copy_to_clipboard;
use crate::client::{ converse, ChatSession, Phase, RelayClient };
use crate::config::persona::PersonaConfig;

/// Line-oriented client: one line of stdin per message, reply printed as
/// it streams. `/tip`, `/copy` and `/quit` mirror the full-screen actions.
pub async fn run_plain(
    persona: Arc<PersonaConfig>,
    relay: Arc<dyn RelayClient>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut session = ChatSession::new(persona);
    let name = session.persona().name.clone();
    println!("{}: {}", name, session.persona().greeting);
    println!("{}", session.persona().disclaimer);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => {
                break;
            }
            "/tip" => {
                println!("Tip {}: {}", name, session.persona().tip_address);
                println!("{}", session.persona().tip_note);
                continue;
            }
            "/copy" => {
                match copy_to_clipboard(&session.persona().tip_address) {
                    Ok(()) => println!("Address copied to clipboard!"),
                    Err(e) => {
                        log::error!("Could not copy text: {}", e);
                        eprintln!("Failed to copy address. Please try again.");
                    }
                }
                continue;
            }
            _ => {}
        }

        session.set_input(line);
        let mut printed = 0usize;
        let mut started = false;
        converse(&mut session, relay.as_ref(), |s| {
            if s.phase() != Phase::Streaming {
                return;
            }
            if let Some(turn) = s.turns().last() {
                if !started {
                    print!("{}: ", name);
                    started = true;
                }
                print!("{}", &turn.content[printed..]);
                printed = turn.content.len();
                let _ = std::io::stdout().flush();
            }
        }).await;

        if started {
            println!();
        }
        if let Some(notice) = session.error_notice() {
            eprintln!("{}", notice);
            session.dismiss_error();
        }
    }

    Ok(())
}
