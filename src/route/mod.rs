use crate::config::Config;
use crate::recorder::Recorder;
use crate::session::SessionManager;
use crate::stats::Stats;
use crate::stream::manager::Manager;

pub mod record;
pub mod stats;
pub mod stream;
pub mod sys;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    pub streams: Manager,
    pub recorder: Recorder,
    pub stats: Stats,
}
