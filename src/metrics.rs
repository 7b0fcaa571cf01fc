use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref PUSHER: IntGauge = IntGauge::new("pusher", "pusher number").unwrap();
    pub static ref PLAYER: IntGauge = IntGauge::new("player", "player number").unwrap();
    pub static ref RECORDING: IntGauge =
        IntGauge::new("recording", "running record task number").unwrap();
    pub static ref SESSION: IntGauge = IntGauge::new("session", "login session number").unwrap();
    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("livectl".to_string()), None).unwrap();
    pub static ref ENCODER: TextEncoder = TextEncoder::new();
}

static REGISTER: Once = Once::new();

pub fn register() {
    REGISTER.call_once(|| {
        for gauge in [&*PUSHER, &*PLAYER, &*RECORDING, &*SESSION] {
            if let Err(e) = REGISTRY.register(Box::new(gauge.clone())) {
                error!("metrics register error: {}", e);
            }
        }
    });
}

pub fn encode() -> String {
    let mut buffer = vec![];
    if let Err(e) = ENCODER.encode(&REGISTRY.gather(), &mut buffer) {
        error!("metrics encode error: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
