//! Single reconciliation cycles run against in-memory collaborators.

mod common;

use common::*;
use squad_event_system::Layer;
use squad_server::sync::{LayerInfoSync, ServerInfoSync, SyncCycle};
use squad_server::{create_squad_event_system, ControlChannel, EngineConfig, LayerCatalog, ServerState};
use std::sync::Arc;

struct Cycles {
    control: Arc<MockControl>,
    state: Arc<ServerState>,
    layer_info: LayerInfoSync,
    server_info: ServerInfoSync,
}

async fn cycles(catalog: Vec<Layer>) -> Cycles {
    let control = MockControl::new(journal());
    control.connect().await.unwrap();
    let state = Arc::new(ServerState::new());
    let catalog = Arc::new(LayerCatalog::new(Arc::new(StaticLayers(catalog))));
    let events = create_squad_event_system();

    let layer_info = LayerInfoSync::new(
        control.clone(),
        catalog.clone(),
        state.clone(),
        events.clone(),
        EngineConfig::default(),
    );
    let server_info = ServerInfoSync::new(control.clone(), catalog, state.clone(), events);
    Cycles {
        control,
        state,
        layer_info,
        server_info,
    }
}

impl Cycles {
    fn report_current(&self, layer: &str) {
        *self.control.current_layer.lock().unwrap() = layer.to_string();
    }

    fn report_next(&self, layer: &str) {
        *self.control.next_layer.lock().unwrap() = layer.to_string();
    }

    fn report_server_map(&self, map: &str) {
        *self.control.server_info.lock().unwrap() =
            format!(r#"{{"ServerName_s":"Test","MaxPlayers":100,"PlayerCount_I":"0","MapName_s":"{map}"}}"#);
    }

    async fn current_id(&self) -> Option<String> {
        self.state
            .layers
            .load()
            .await
            .value
            .current_layer
            .as_ref()
            .map(|l| l.layer_id.clone())
    }
}

fn training_range() -> Layer {
    layer("JensensRange_GB-MIL", "Jensen's Training Range", "JensensRange")
}

#[tokio::test]
async fn test_training_range_is_never_adopted() {
    let c = cycles(vec![training_range(), layer("Narva_RAAS_v1", "Narva RAAS v1", "Narva")]).await;

    c.report_current("Jensen's Training Range");
    c.layer_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await, None);

    c.report_current("Narva RAAS v1");
    c.layer_info.run_cycle().await.unwrap();
    c.report_current("Jensen's Training Range");
    c.layer_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await.as_deref(), Some("Narva_RAAS_v1"));
}

#[tokio::test]
async fn test_vote_sentinel_leaves_next_layer_unset() {
    let c = cycles(vec![
        layer("Narva_RAAS_v1", "Narva RAAS v1", "Narva"),
        layer("Vote_Placeholder", "To be voted", "Placeholder"),
    ])
    .await;

    c.report_next("To be voted");
    c.layer_info.run_cycle().await.unwrap();
    let layers = c.state.layers.load().await;
    assert!(layers.value.next_layer.is_none());
    assert!(layers.value.next_layer_to_be_voted);

    c.report_next("Narva RAAS v1");
    c.layer_info.run_cycle().await.unwrap();
    let layers = c.state.layers.load().await;
    assert_eq!(layers.value.next_layer.as_ref().unwrap().layer_id, "Narva_RAAS_v1");
    assert!(!layers.value.next_layer_to_be_voted);
}

#[tokio::test]
async fn test_current_layer_resolves_by_name_then_id_then_classname() {
    let c = cycles(vec![
        layer("Gorodok_Alias", "Gorodok_RAAS_v1", "GorodokAlias"),
        layer("Gorodok_RAAS_v1", "Gorodok RAAS v1", "Gorodok"),
        layer("Skorpo_Invasion_v1", "Skorpo Invasion v1", "Skorpo"),
        layer("Mutaha_AAS_v1", "Mutaha AAS v1", "Mutaha_AAS"),
    ])
    .await;

    c.report_current("Gorodok_RAAS_v1");
    c.layer_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await.as_deref(), Some("Gorodok_Alias"));

    c.report_current("Skorpo_Invasion_v1");
    c.layer_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await.as_deref(), Some("Skorpo_Invasion_v1"));

    c.report_current("mutahaaas");
    c.layer_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await.as_deref(), Some("Mutaha_AAS_v1"));

    // Unknown identifiers keep what is already known.
    c.report_current("Yehorivka RAAS v9");
    c.layer_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await.as_deref(), Some("Mutaha_AAS_v1"));
}

#[tokio::test]
async fn test_history_is_seeded_once() {
    let c = cycles(vec![
        layer("Narva_RAAS_v1", "Narva RAAS v1", "Narva"),
        layer("Gorodok_RAAS_v1", "Gorodok RAAS v1", "Gorodok"),
    ])
    .await;

    c.layer_info.run_cycle().await.unwrap();
    c.report_current("Gorodok RAAS v1");
    c.layer_info.run_cycle().await.unwrap();
    c.layer_info.run_cycle().await.unwrap();

    let layers = c.state.layers.load().await;
    assert_eq!(layers.value.history.len(), 1);
    assert_eq!(
        layers.value.history[0].layer.as_ref().map(|l| l.layer_id.as_str()),
        Some("Narva_RAAS_v1")
    );
    assert_eq!(layers.value.current_layer.as_ref().unwrap().layer_id, "Gorodok_RAAS_v1");
}

#[tokio::test]
async fn test_server_info_adopts_layer_by_id_only_on_change() {
    let c = cycles(vec![
        layer("Narva_RAAS_v1", "Narva RAAS v1", "Narva"),
        layer("Gorodok_RAAS_v1", "Gorodok RAAS v1", "Gorodok"),
    ])
    .await;
    c.layer_info.run_cycle().await.unwrap();
    let settled = c.state.layers.load().await.version;

    c.report_server_map("Narva_RAAS_v1");
    c.server_info.run_cycle().await.unwrap();
    assert_eq!(c.state.layers.load().await.version, settled);
    let info = c.state.server_info.load().await;
    assert_eq!(info.value.as_ref().unwrap().current_layer, "Narva_RAAS_v1");

    c.report_server_map("Gorodok_RAAS_v1");
    c.server_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await.as_deref(), Some("Gorodok_RAAS_v1"));
    let adopted = c.state.layers.load().await.version;
    assert_eq!(adopted, settled + 1);

    // Names are not ids; neither is an unknown map.
    c.report_server_map("Narva RAAS v1");
    c.server_info.run_cycle().await.unwrap();
    c.report_server_map("Yehorivka_RAAS_v9");
    c.server_info.run_cycle().await.unwrap();
    assert_eq!(c.current_id().await.as_deref(), Some("Gorodok_RAAS_v1"));
    assert_eq!(c.state.layers.load().await.version, adopted);
}
