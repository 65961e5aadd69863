//! In-memory collaborators for driving a full engine in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use squad_event_system::{EosId, Layer, Squad, SteamId};
use squad_server::{
    AdminListError, AdminSource, CatalogError, ControlChannel, ControlError, ControlEvent, FetchedPlayer,
    LayerSource, LogReader, LogReaderError, MapInfo,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

pub const EOS_A: &str = "0002a10186d9414496bf20d22d3860ba";
pub const EOS_B: &str = "00026e21ce3d43c792613bdbb6dec1ba";

/// Shared, ordered record of collaborator calls.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub fn fetched(steam: u64, eos: Option<&str>, name: &str, team: u8, squad: Option<u32>) -> FetchedPlayer {
    FetchedPlayer {
        steam_id: SteamId(steam),
        eos_id: eos.map(EosId::new),
        name: name.to_string(),
        team_id: Some(team),
        squad_id: squad,
        is_leader: false,
        role: None,
    }
}

pub fn layer(id: &str, name: &str, classname: &str) -> Layer {
    Layer {
        layer_id: id.to_string(),
        name: name.to_string(),
        classname: classname.to_string(),
        map_name: classname.to_string(),
        mod_name: "Vanilla".to_string(),
        gamemode: "RAAS".to_string(),
        gamemode_type: None,
        version: "v1".to_string(),
        size: None,
        size_type: None,
        number_of_capture_points: 0,
        lighting: None,
        teams: Vec::new(),
    }
}

pub struct MockControl {
    pub journal: Journal,
    pub players: Mutex<Vec<FetchedPlayer>>,
    pub squads: Mutex<Vec<Squad>>,
    pub current_layer: Mutex<String>,
    pub next_layer: Mutex<String>,
    pub layer_listing: Mutex<String>,
    pub server_info: Mutex<String>,
    pub fail_players: AtomicBool,
    pub connected: AtomicBool,
    ids: Mutex<HashMap<EosId, SteamId>>,
    events: broadcast::Sender<ControlEvent>,
}

impl MockControl {
    pub fn new(journal: Journal) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            journal,
            players: Mutex::new(Vec::new()),
            squads: Mutex::new(Vec::new()),
            current_layer: Mutex::new("Narva RAAS v1".to_string()),
            next_layer: Mutex::new("To be voted".to_string()),
            layer_listing: Mutex::new("List of available layers :\nNarva_RAAS_v1\n".to_string()),
            server_info: Mutex::new(
                r#"{"ServerName_s":"Test","MaxPlayers":100,"PlayerCount_I":"2","MapName_s":"Narva_RAAS_v1"}"#.to_string(),
            ),
            fail_players: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            ids: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn set_players(&self, players: Vec<FetchedPlayer>) {
        *self.players.lock().unwrap() = players;
    }

    pub fn push_event(&self, event: ControlEvent) {
        self.events.send(event).expect("engine is subscribed");
    }

    fn record(&self, call: &str) {
        self.journal.lock().unwrap().push(format!("control:{call}"));
    }

    fn ensure_connected(&self) -> Result<(), ControlError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ControlError::NotConnected)
        }
    }
}

#[async_trait]
impl ControlChannel for MockControl {
    async fn connect(&self) -> Result<(), ControlError> {
        self.record("connect");
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ControlError> {
        self.record("disconnect");
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, command: &str) -> Result<String, ControlError> {
        self.record(command);
        self.ensure_connected()?;
        match command {
            "ListLayers" => Ok(self.layer_listing.lock().unwrap().clone()),
            "ShowServerInfo" => Ok(self.server_info.lock().unwrap().clone()),
            other => Err(ControlError::MalformedResponse(format!("unknown command {other}"))),
        }
    }

    async fn list_players(&self) -> Result<Vec<FetchedPlayer>, ControlError> {
        self.record("list_players");
        self.ensure_connected()?;
        if self.fail_players.load(Ordering::SeqCst) {
            return Err(ControlError::Transport("connection reset".to_string()));
        }
        Ok(self.players.lock().unwrap().clone())
    }

    async fn list_squads(&self) -> Result<Vec<Squad>, ControlError> {
        self.record("list_squads");
        self.ensure_connected()?;
        Ok(self.squads.lock().unwrap().clone())
    }

    async fn current_map(&self) -> Result<MapInfo, ControlError> {
        self.record("current_map");
        self.ensure_connected()?;
        Ok(MapInfo {
            level: "Narva".to_string(),
            layer: self.current_layer.lock().unwrap().clone(),
        })
    }

    async fn next_map(&self) -> Result<MapInfo, ControlError> {
        self.record("next_map");
        self.ensure_connected()?;
        Ok(MapInfo {
            level: String::new(),
            layer: self.next_layer.lock().unwrap().clone(),
        })
    }

    fn add_ids(&self, steam_id: SteamId, eos_id: &EosId) {
        self.ids.lock().unwrap().insert(eos_id.clone(), steam_id);
    }

    fn steam_id_for(&self, eos_id: &EosId) -> Option<SteamId> {
        self.ids.lock().unwrap().get(eos_id).copied()
    }

    async fn warn(&self, target: &str, _message: &str) -> Result<(), ControlError> {
        self.record(&format!("warn {target}"));
        self.ensure_connected()
    }

    async fn kick(&self, target: &str, _reason: &str) -> Result<(), ControlError> {
        self.record(&format!("kick {target}"));
        self.ensure_connected()
    }

    async fn ban(&self, target: &str, _interval: &str, _reason: &str) -> Result<(), ControlError> {
        self.record(&format!("ban {target}"));
        self.ensure_connected()
    }

    fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }
}

/// Hands out the receiving end of a line channel the test writes into.
pub struct ChannelLogReader {
    journal: Journal,
    lines: Mutex<Option<mpsc::Receiver<String>>>,
}

impl ChannelLogReader {
    pub fn new(journal: Journal) -> (Arc<Self>, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(64);
        let reader = Arc::new(Self {
            journal,
            lines: Mutex::new(Some(rx)),
        });
        (reader, tx)
    }
}

#[async_trait]
impl LogReader for ChannelLogReader {
    async fn watch(&self) -> Result<mpsc::Receiver<String>, LogReaderError> {
        self.journal.lock().unwrap().push("log:watch".to_string());
        self.lines.lock().unwrap().take().ok_or(LogReaderError::AlreadyWatching)
    }

    async fn unwatch(&self) -> Result<(), LogReaderError> {
        self.journal.lock().unwrap().push("log:unwatch".to_string());
        Ok(())
    }
}

pub struct StaticLayers(pub Vec<Layer>);

#[async_trait]
impl LayerSource for StaticLayers {
    async fn fetch(&self) -> Result<Vec<Layer>, CatalogError> {
        Ok(self.0.clone())
    }
}

/// Serves whatever list text the test last put in, counting fetches.
pub struct ScriptedAdmins {
    pub list: Mutex<String>,
    pub fetches: AtomicUsize,
}

impl ScriptedAdmins {
    pub fn new(list: &str) -> Arc<Self> {
        Arc::new(Self {
            list: Mutex::new(list.to_string()),
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AdminSource for ScriptedAdmins {
    async fn fetch(&self) -> Result<Vec<String>, AdminListError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.list.lock().unwrap().clone()])
    }
}

// Log lines as the server writes them.

pub fn join_line(chain: u64, name: &str) -> String {
    format!("[2024.03.01-18.00.00:100][{chain:>3}]LogNet: Join request: /Game/Maps/Transition/TransitionMap?Name={name}?SplitscreenCount=1")
}

pub fn post_login_line(chain: u64, eos: &str, steam: u64) -> String {
    format!(
        "[2024.03.01-18.00.01:200][{chain:>3}]LogSquad: PostLogin: NewPlayer: BP_PlayerController_C /Game/Maps/Narva/Gameplay_Layers/Narva_RAAS_v1.Narva_RAAS_v1:PersistentLevel.BP_PlayerController_C_2130438728 (IP: 10.0.0.5 | Online IDs: EOS: {eos} steam: {steam})"
    )
}

pub fn wound_line(victim: &str, attacker_eos: &str, attacker_steam: u64) -> String {
    format!(
        "[2024.03.01-18.20.01:000][ 91]LogSquadTrace: [DedicatedServer]ASQSoldier::Wound(): Player:{victim} KillingDamage=-100.000000 from BP_PlayerController_C_2130438728 (Online IDs: EOS: {attacker_eos} steam: {attacker_steam} | Contoller ID: BP_PlayerController_C_2130438728) caused by BP_AK74_Rifle_C_2130412345"
    )
}

pub fn disconnect_line(eos: &str) -> String {
    format!(
        "[2024.03.01-18.30.00:000][200]LogNet: UChannel::Close: Sending CloseBunch. ChIndex == 0. Name: [UChannel] ChIndex: 0, Closing: 0 [UNetConnection] RemoteAddr: 10.0.0.5:7777, Name: EOSIpNetConnection_2147482557, Driver: GameNetDriver EOSNetDriver_2147482578, IsServer: YES, PC: BP_PlayerController_C_2130438728, Owner: BP_PlayerController_C_2130438728, UniqueId: RedpointEOS:{eos}"
    )
}

pub fn possess_line(chain: u64, name: &str, eos: &str, steam: u64, pawn: &str) -> String {
    format!(
        "[2024.03.01-18.10.00:000][{chain:>3}]LogSquadTrace: [DedicatedServer]ASQPlayerController::OnPossess(): PC={name} (Online IDs: EOS: {eos} steam: {steam}) Pawn={pawn} FullPath={pawn}"
    )
}

pub fn unpossess_line(chain: u64, name: &str, eos: &str, steam: u64) -> String {
    format!(
        "[2024.03.01-18.10.00:500][{chain:>3}]LogSquadTrace: [DedicatedServer]ASQPlayerController::OnUnPossess(): PC={name} (Online IDs: EOS: {eos} steam: {steam})"
    )
}

/// A timestamp drift the anti-cheat heuristic rates as high.
pub fn movement_line(chain: u64, character: &str) -> String {
    format!(
        "[2024.03.01-18.11.00:000][{chain:>3}]LogNetPlayerMovement: Warning: ServerMove: TimeStamp expired: 110.000000, CurrentTimeStamp: 10.000000, Character: {character}"
    )
}

pub fn new_game_line(chain: u64, second: u32, map: &str, layer: &str) -> String {
    format!(
        "[2024.03.01-19.00.{second:02}:000][{chain:>3}]LogWorld: Bringing World /Game/Maps/{map}/Gameplay_Layers/{layer}.{layer} up for play (max tick rate 50) at 2024.03.01-19.00.{second:02}"
    )
}
