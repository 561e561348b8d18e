use clap::Parser;
use dotenv::dotenv;
use nadiya_chat::cli::{ Args, Command };
use std::error::Error;
use std::fs::OpenOptions;

fn init_logging(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match &args.command {
        Command::Serve(_) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        }
        Command::Chat(chat) => {
            if let Some(path) = &chat.log_file {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                    .target(env_logger::Target::Pipe(Box::new(file)))
                    .init();
            } else {
                // no log output on the chat surface
                env_logger::Builder::new().filter_level(log::LevelFilter::Off).init();
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();
    init_logging(&args)?;

    nadiya_chat::run(args).await
}
