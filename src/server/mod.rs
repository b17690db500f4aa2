pub mod api;

use crate::cli::Args;
use crate::relay::Relay;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Server {
    relay: Arc<Mutex<Relay>>,
    args: Args,
}

impl Server {
    pub fn new(relay: Arc<Mutex<Relay>>, args: Args) -> Self {
        Self { relay, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(self.relay.clone(), self.args.clone()).await
    }
}
