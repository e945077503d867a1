use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use crate::http::server::AppState;
use crate::load_balancer::InstanceSnapshot;
use crate::resilience::CircuitState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub algorithm: String,
    pub instances: usize,
    pub healthy_instances: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatus {
    #[serde(flatten)]
    pub instance: InstanceSnapshot,
    pub circuit: Option<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let instances = state.dispatcher.registry().all();
    let healthy_instances = instances.iter().filter(|i| i.healthy).count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        algorithm: state.dispatcher.strategy().algorithm().name().to_string(),
        instances: instances.len(),
        healthy_instances,
    })
}

pub async fn get_backends(State(state): State<AppState>) -> Json<Vec<BackendStatus>> {
    let guard = state.dispatcher.guard();
    let statuses = state
        .dispatcher
        .registry()
        .all()
        .into_iter()
        .map(|instance| {
            let circuit = guard.circuit_state(&instance.url).map(circuit_label);
            BackendStatus { instance, circuit }
        })
        .collect();

    Json(statuses)
}

fn circuit_label(state: CircuitState) -> String {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half-open",
    }
    .to_string()
}
