use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::fanout::FanoutDispatcher;
use crate::hub::BroadcastHub;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub hub: Arc<BroadcastHub>,
    pub dispatcher: FanoutDispatcher,
}
