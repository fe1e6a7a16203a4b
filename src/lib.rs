pub mod accounts;
pub mod api;
pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod utils;

pub use db::DbPool;

use config::Config;

use crate::accounts::Accounts;
use crate::auth::{AccessPolicy, AuthorizationGate, TokenService};
use crate::booking::{ClassRegistry, NotificationChannel, ReservationLedger};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub gate: AuthorizationGate,
    pub accounts: Accounts,
    pub classes: ClassRegistry,
    pub reservations: ReservationLedger,
    pub notifications: NotificationChannel,
}

impl AppState {
    /// Wire every component to the shared pool. `config` must already be validated.
    pub fn new(config: Config, db: DbPool) -> Self {
        let tokens = TokenService::new(config.jwt_secret(), config.auth.token_ttl_secs);
        let policy = AccessPolicy::new(config.policy.list_classes.clone());

        Self {
            gate: AuthorizationGate::new(tokens.clone(), policy),
            accounts: Accounts::new(db.clone(), tokens, config.server.uploads_dir.clone()),
            classes: ClassRegistry::new(db.clone()),
            reservations: ReservationLedger::new(db.clone()),
            notifications: NotificationChannel::new(db.clone()),
            config,
            db,
        }
    }
}
