use crate::{
    config::GatewayConfig,
    db::{DbPool, OrmConn},
    mailer::Mailer,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub gateway: GatewayConfig,
    pub mailer: Mailer,
}
