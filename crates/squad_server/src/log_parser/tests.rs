use super::*;
use crate::error::LogRuleError;
use tokio::time::{Duration, Instant};

const EOS_A: &str = "0002a10186d9414496bf20d22d3860ba";
const EOS_B: &str = "00026e21ce3d43c792613bdbb6dec1ba";

fn extractor() -> LogEventExtractor {
    LogEventExtractor::new(&EngineConfig::default())
}

fn join(chain: u64, name: &str) -> String {
    format!("[2024.03.01-18.00.00:100][{chain:>3}]LogNet: Join request: /Game/Maps/Transition/TransitionMap?Name={name}?SplitscreenCount=1")
}

fn post_login(chain: u64) -> String {
    format!(
        "[2024.03.01-18.00.01:200][{chain:>3}]LogSquad: PostLogin: NewPlayer: BP_PlayerController_C /Game/Maps/Narva/Gameplay_Layers/Narva_RAAS_v1.Narva_RAAS_v1:PersistentLevel.BP_PlayerController_C_2130438728 (IP: 10.0.0.5 | Online IDs: EOS: {EOS_A} steam: 76561198000000001)"
    )
}

fn movement(chain: u64, expired: f64, current: f64) -> String {
    format!(
        "[2024.03.01-18.05.00:000][{chain:>3}]LogNetPlayerMovement: Warning: ServerMove: TimeStamp expired: {expired:.6}, CurrentTimeStamp: {current:.6}, Character: BP_Soldier_RU_Rifleman_C_2130401015"
    )
}

fn explosion(millis: u32, chain: u64, instigator: &str) -> String {
    format!(
        "[2024.03.01-18.06.07:{millis:03}][{chain:>3}]LogSquadTrace: [DedicatedServer]ApplyExplosiveDamage(): HitActor=nullptr DamageCauser=BP_Mortarround_C_1 DamageInstigator={instigator}"
    )
}

#[test]
fn all_rule_patterns_compile() {
    assert_eq!(rules::RULES.len(), rules::rule_count());
}

#[test]
fn unmatched_line_yields_nothing() {
    let mut extractor = extractor();
    assert!(extractor.extract("[2024.03.01-18.00.00:100][  1]LogTemp: nothing to see").is_none());
    assert_eq!(extractor.stats(), (1, 0));
}

#[test]
fn join_then_login_produces_connection() {
    let mut extractor = extractor();
    let now = Instant::now();

    assert!(extractor.extract_at(&join(12, "[TAG] Alpha"), now).is_none());
    let event = extractor.extract_at(&post_login(12), now).unwrap();

    match event {
        LogEvent::PlayerConnected {
            header,
            ip,
            eos_id,
            steam_id,
            player_suffix,
            player_controller,
        } => {
            assert_eq!(header.chain_id, 12);
            assert_eq!(ip, "10.0.0.5");
            assert_eq!(eos_id.as_str(), EOS_A);
            assert_eq!(steam_id, SteamId(76561198000000001));
            assert_eq!(player_suffix, "[TAG] Alpha");
            assert_eq!(player_controller.as_deref(), Some("BP_PlayerController_C_2130438728"));
        }
        other => panic!("unexpected event {other:?}"),
    }

    let identity = extractor.store().player(SteamId(76561198000000001)).unwrap();
    assert_eq!(identity.suffix.as_deref(), Some("[TAG] Alpha"));
    assert_eq!(identity.controller.as_deref(), Some("BP_PlayerController_C_2130438728"));
    assert_eq!(extractor.store().pending_len(), 0);
}

#[test]
fn login_without_join_request_is_an_error() {
    let mut extractor = extractor();
    let now = Instant::now();

    let result = extractor.try_extract(&post_login(7), now);
    assert_eq!(result, Err(LogRuleError::MissingJoinRequest(7)));
    assert!(extractor.extract_at(&post_login(7), now).is_none());
}

#[test]
fn second_login_on_same_chain_finds_nothing() {
    let mut extractor = extractor();
    let now = Instant::now();

    extractor.extract_at(&join(3, "Bravo"), now);
    assert!(extractor.try_extract(&post_login(3), now).unwrap().is_some());
    assert_eq!(
        extractor.try_extract(&post_login(3), now),
        Err(LogRuleError::MissingJoinRequest(3))
    );
}

#[test]
fn stale_join_request_expires() {
    let mut extractor = extractor();
    let now = Instant::now();

    extractor.extract_at(&join(5, "Slow"), now);
    let later = now + Duration::from_secs(121);
    assert_eq!(
        extractor.try_extract(&post_login(5), later),
        Err(LogRuleError::MissingJoinRequest(5))
    );
}

#[test]
fn movement_warnings_deduplicate_by_chain() {
    let mut extractor = extractor();

    let first = extractor.extract(&movement(40, 110.0, 10.0));
    assert!(matches!(
        first,
        Some(LogEvent::MovementAnomaly {
            probability: CheatProbability::High,
            ..
        })
    ));
    assert!(extractor.extract(&movement(40, 110.0, 10.0)).is_none());

    let unlikely = extractor.extract(&movement(41, 50.0, 1.0));
    assert!(matches!(
        unlikely,
        Some(LogEvent::MovementAnomaly {
            probability: CheatProbability::Unlikely,
            ..
        })
    ));
}

#[test]
fn movement_within_normal_drift_is_ignored_but_still_stored() {
    let mut extractor = extractor();

    assert!(extractor.extract(&movement(50, 400.0, 10.0)).is_none());
    // Same chain again with a suspicious drift: still the same burst.
    assert!(extractor.extract(&movement(50, 110.0, 10.0)).is_none());
}

#[test]
fn explosion_pair_fires_only_on_full_key_match() {
    let mut extractor = extractor();

    assert!(extractor.extract(&explosion(100, 9, "BP_PlayerController_C_1")).is_none());
    let fired = extractor.extract(&explosion(900, 9, "BP_PlayerController_C_1"));
    match fired {
        Some(LogEvent::ExplosionAttack { header, instigator }) => {
            assert_eq!(header.chain_id, 9);
            assert_eq!(header.time, "2024.03.01-18.06.07:900");
            assert_eq!(instigator, "BP_PlayerController_C_1");
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert!(extractor.extract(&explosion(950, 10, "BP_PlayerController_C_1")).is_none());
    let trace = extractor.store().last_explosion().unwrap();
    assert_eq!(trace.chain_id, 10);
}

#[test]
fn possess_then_unpossess_in_same_chain_is_a_switch() {
    let mut extractor = extractor();
    let possess = format!(
        "[2024.03.01-18.10.00:000][ 77]LogSquadTrace: [DedicatedServer]ASQPlayerController::OnPossess(): PC=Alpha (Online IDs: EOS: {EOS_A} steam: 76561198000000001) Pawn=BP_Soldier_RU_Medic_C_2130401015 FullPath=BP_Soldier_RU_Medic_C"
    );
    match extractor.extract(&possess) {
        Some(LogEvent::PlayerPossess {
            player_suffix,
            eos_id,
            possess_classname,
            character_classname,
            ..
        }) => {
            assert_eq!(player_suffix, "Alpha");
            assert_eq!(eos_id.unwrap().as_str(), EOS_A);
            assert_eq!(possess_classname, "BP_Soldier_RU_Medic");
            assert_eq!(character_classname, "BP_Soldier_RU_Medic_C_2130401015");
        }
        other => panic!("unexpected event {other:?}"),
    }

    let unpossess = |chain: u64| {
        format!(
            "[2024.03.01-18.10.00:500][{chain:>3}]LogSquadTrace: [DedicatedServer]ASQPlayerController::OnUnPossess(): PC=Alpha (Online IDs: EOS: {EOS_A} steam: 76561198000000001)"
        )
    };
    assert!(matches!(
        extractor.extract(&unpossess(77)),
        Some(LogEvent::PlayerUnpossess { switch_possess: true, .. })
    ));
    assert!(matches!(
        extractor.extract(&unpossess(78)),
        Some(LogEvent::PlayerUnpossess { switch_possess: false, .. })
    ));
}

#[test]
fn damage_lines_parse_attacker_identity() {
    let mut extractor = extractor();
    let damaged = format!(
        "[2024.03.01-18.20.00:000][ 90]LogSquad: Player:Victim ActualDamage=31.000002 from Shooter (Online IDs: EOS: {EOS_B} steam: 76561198000000002 | Player Controller ID: BP_PlayerController_C_2130438728)caused by BP_AK74_Rifle_C_2130412345"
    );
    match extractor.extract(&damaged) {
        Some(LogEvent::PlayerDamaged(line)) => {
            assert_eq!(line.victim_name, "Victim");
            assert_eq!(line.attacker_name.as_deref(), Some("Shooter"));
            assert_eq!(line.attacker_steam_id, SteamId(76561198000000002));
            assert_eq!(line.attacker_controller.as_deref(), Some("BP_PlayerController_C_2130438728"));
            assert_eq!(line.weapon, "BP_AK74_Rifle");
            assert!((line.damage - 31.000002).abs() < f64::EPSILON);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let wounded = format!(
        "[2024.03.01-18.20.01:000][ 91]LogSquadTrace: [DedicatedServer]ASQSoldier::Wound(): Player:Victim KillingDamage=-100.000000 from BP_PlayerController_C_2130438728 (Online IDs: EOS: {EOS_B} steam: 76561198000000002 | Contoller ID: BP_PlayerController_C_2130438728) caused by BP_AK74_Rifle_C_2130412345"
    );
    match extractor.extract(&wounded) {
        Some(LogEvent::PlayerWounded(line)) => {
            assert!(line.attacker_name.is_none());
            assert_eq!(line.attacker_controller.as_deref(), Some("BP_PlayerController_C_2130438728"));
            assert!((line.damage - 100.0).abs() < f64::EPSILON);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn round_outcomes_are_consumed_by_round_end() {
    let mut extractor = extractor();
    let won = "[2024.03.01-19.00.00:000][200]LogSquadGameEvents: Display: Team 1, 1st Battalion ( United States Army ) has won the match with 212 Tickets on layer Narva RAAS v1 (level Narva)!";
    let lost = "[2024.03.01-19.00.00:000][200]LogSquadGameEvents: Display: Team 2, 2nd Guards ( Russian Ground Forces ) has lost the match with 0 Tickets on layer Narva RAAS v1 (level Narva)!";
    let ended = "[2024.03.01-19.00.01:000][201]LogGameState: Match State Changed from InProgress to WaitingPostMatch";

    assert!(extractor.extract(won).is_none());
    assert!(extractor.extract(lost).is_none());
    match extractor.extract(ended) {
        Some(LogEvent::RoundEnded { winner, loser, .. }) => {
            let winner = winner.unwrap();
            assert_eq!(winner.team, 1);
            assert_eq!(winner.faction, "United States Army");
            assert_eq!(winner.tickets, 212);
            assert_eq!(winner.layer, "Narva RAAS v1");
            assert_eq!(loser.unwrap().team, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(
        extractor.extract(ended),
        Some(LogEvent::RoundEnded { winner: None, loser: None, .. })
    ));
}

#[test]
fn transition_map_is_not_a_new_game() {
    let mut extractor = extractor();
    let transition = "[2024.03.01-19.01.00:000][210]LogWorld: Bringing World /Game/Maps/TransitionMap/TransitionMap.TransitionMap up for play (max tick rate 50) at 2024.03.01-19.01.00";
    assert!(extractor.extract(transition).is_none());

    let narva = "[2024.03.01-19.02.00:000][211]LogWorld: Bringing World /Game/Maps/Narva/Gameplay_Layers/Narva_RAAS_v1.Narva_RAAS_v1 up for play (max tick rate 50) at 2024.03.01-19.02.00";
    match extractor.extract(narva) {
        Some(LogEvent::NewGame {
            dlc,
            map_classname,
            layer_classname,
            ..
        }) => {
            assert_eq!(dlc, "Game");
            assert_eq!(map_classname, "Narva");
            assert_eq!(layer_classname, "Narva_RAAS_v1");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn simple_server_lines() {
    let mut extractor = extractor();

    let tick = "[2024.03.01-19.03.00:000][  0]LogSquad: USQGameState: Server Tick Rate: 49.87";
    assert!(matches!(
        extractor.extract(tick),
        Some(LogEvent::TickRate { tick_rate, .. }) if (tick_rate - 49.87).abs() < 1e-9
    ));

    let broadcast = "[2024.03.01-19.04.00:000][ 12]LogSquad: ADMIN COMMAND: Message broadcasted <Seeding rules apply> from RCON";
    assert!(matches!(
        extractor.extract(broadcast),
        Some(LogEvent::AdminBroadcast { ref message, ref from, .. }) if message == "Seeding rules apply" && from == "RCON"
    ));

    let account = format!(
        "[2024.03.01-19.05.00:000][ 13]LogEOS: Verbose: [LogEOSConnect] FConnectClient::CacheExternalAccountInfo - ProductUserId: {EOS_A}, AccountType: 1, AccountId: 76561198000000001, DisplayName: <Redacted>"
    );
    assert!(matches!(
        extractor.extract(&account),
        Some(LogEvent::ExternalAccountInfo { steam_id: SteamId(76561198000000001), .. })
    ));
}

#[test]
fn disconnect_line_carries_transient_id() {
    let mut extractor = extractor();
    let line = format!(
        "[2024.03.01-19.06.00:000][ 14]LogNet: UChannel::Close: Sending CloseBunch. ChIndex == 0. Name: [UChannel] ChIndex: 0, Closing: 0 [UNetConnection] RemoteAddr: 10.0.0.5:7777, Name: EOSIpNetConnection_2147482431, Driver: GameNetDriver EOSNetDriver_2147482475, IsServer: YES, PC: BP_PlayerController_C_2130438728, Owner: BP_PlayerController_C_2130438728, UniqueId: RedpointEOS:{EOS_A}"
    );
    match extractor.extract(&line) {
        Some(LogEvent::PlayerDisconnected {
            ip,
            player_controller,
            eos_id,
            ..
        }) => {
            assert_eq!(ip, "10.0.0.5");
            assert_eq!(player_controller, "BP_PlayerController_C_2130438728");
            assert_eq!(eos_id.as_str(), EOS_A);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
