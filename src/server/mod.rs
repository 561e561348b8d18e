pub mod api;
pub mod relay;

use crate::cli::ServeArgs;
use api::AppState;
use log::{ info, warn };
use std::env;
use std::error::Error;

pub struct Server {
    args: ServeArgs,
    state: AppState,
}

impl Server {
    pub fn new(args: ServeArgs, state: AppState) -> Self {
        if env::var(&state.api_key_env).map(|k| k.trim().is_empty()).unwrap_or(true) {
            warn!(
                "{} is not set. Every chat request will fail until it is provided.",
                state.api_key_env
            );
        } else {
            info!("Provider credential found in {}", state.api_key_env);
        }

        Self { args, state }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.args, self.state.clone()).await
    }
}
