use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

use mafia_core::utils::test_setup::setup_test_env;
use mafia_core::{
    BroadcastPublisher, GameError, GameOption, GamePhase, GameService, GameStatus, KillSource,
    Participant, Role,
};

fn participants(n: usize) -> Vec<Participant> {
    (0..n)
        .map(|i| Participant {
            member_id: 100 + i as u64,
            nickname: format!("player{}", i),
        })
        .collect()
}

/// シャッフル結果に依存しないよう、座席順に役職を並べ直す
async fn fix_roles(service: &GameService, room_id: u64, roles: &[Role]) {
    let mut game = service.games.load(room_id).await.unwrap();
    for (i, role) in roles.iter().enumerate() {
        let member_id = game.member_at(i as i32 + 1).unwrap();
        let player = game.players.get_mut(&member_id).unwrap();
        player.role = Some(*role);
        player.enable_vote = *role != Role::Mutant;
    }
    service.games.save(game).await;
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Value>) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

#[tokio::test]
async fn full_game_until_citizen_win() {
    setup_test_env();
    let publisher = Arc::new(BroadcastPublisher::new());
    let service = GameService::with_rng(publisher.clone(), StdRng::seed_from_u64(42));

    let setting = GameOption {
        zombie: 1,
        mutant: false,
        doctor_skill_usage: 1,
        day_dis_time_sec: 120,
    };
    service.start_game(1, &participants(6), setting).await.unwrap();
    let mut system_rx = publisher.subscribe("game-1-system");

    fix_roles(
        &service,
        1,
        &[
            Role::Zombie,
            Role::Police,
            Role::PlagueDoctor,
            Role::Citizen,
            Role::Citizen,
            Role::Citizen,
        ],
    )
    .await;

    // ---- 1日目: 議論短縮 → 投票で市民(座席4)を処刑対象に ----
    service.skip_discussion(1, 100).await.unwrap();
    assert!(matches!(
        service.skip_discussion(1, 10).await.unwrap_err(),
        GameError::GameTimeOver
    ));

    service.change_phase(1, GamePhase::DayVote).await.unwrap();
    for member_id in 100..106 {
        service.vote(1, member_id, 4).await.unwrap();
    }

    service.change_phase(1, GamePhase::DayFinalVote).await.unwrap();
    for member_id in 100..104 {
        service.final_vote(1, member_id).await.unwrap();
    }
    assert!(service.final_vote_result(1).await.unwrap());
    assert!(drain(&mut system_rx).contains(&json!({"votekill": true})));

    // ---- 1日目の夜: ゾンビは座席5を狙うが医者が治療する ----
    service.change_phase(1, GamePhase::NightAction).await.unwrap();
    {
        // 夜はゾンビ以外の生存者が全員ミュートされている
        let game = service.games.load(1).await.unwrap();
        for (seat, member_id) in &game.seat_map {
            let p = &game.players[member_id];
            assert_eq!(!p.mute_mic, *seat == 1, "seat {}", seat);
        }
    }

    let game = service.games.load(1).await.unwrap();
    let zombie = game.member_at(1).unwrap();
    let doctor = game.member_at(3).unwrap();
    service.set_target(1, zombie, 5).await.unwrap();
    let answer = service.set_target(1, doctor, 5).await.unwrap();
    assert!(answer.contains("残りワクチンは0個"));

    // 処刑対象(4)だけが死に、襲撃対象(5)は治療で生き残る
    let deaths = service.night_result(1).await.unwrap();
    assert_eq!(deaths, vec![4]);
    let night_messages = drain(&mut system_rx);
    let report = night_messages
        .iter()
        .find(|m| m.get("death").is_some())
        .unwrap();
    assert_eq!(report["death"], json!("4"));
    assert_eq!(report["heal"], json!("5"));

    let game = service.games.load(1).await.unwrap();
    assert_eq!(game.status, GameStatus::Playing);
    assert_eq!(game.live_count(), 5);

    // ---- 2日目: 生存者全員でゾンビ(座席1)を処刑 ----
    service.change_phase(1, GamePhase::DayDiscussion).await.unwrap();
    let game = service.games.load(1).await.unwrap();
    assert!(game.round.votes.is_empty());
    assert!(game.round.kill_targets.is_empty());

    service.change_phase(1, GamePhase::DayVote).await.unwrap();
    for seat in [1, 2, 3, 5, 6] {
        let member_id = game.member_at(seat).unwrap();
        service.vote(1, member_id, 1).await.unwrap();
    }
    // 死亡者は投票できない
    assert!(matches!(
        service.vote(1, game.member_at(4).unwrap(), 1).await.unwrap_err(),
        GameError::DeadCannotVote
    ));

    service.change_phase(1, GamePhase::DayFinalVote).await.unwrap();
    // 生存5人なので賛成3票で成立する
    for seat in [2, 3, 5] {
        let member_id = game.member_at(seat).unwrap();
        service.final_vote(1, member_id).await.unwrap();
    }
    assert!(service.final_vote_result(1).await.unwrap());

    service.change_phase(1, GamePhase::NightAction).await.unwrap();
    let deaths = service.night_result(1).await.unwrap();
    assert_eq!(deaths, vec![1]);

    // ゾンビ全滅で市民勝利、以後のラウンドはもう始められない
    let game = service.games.load(1).await.unwrap();
    assert_eq!(game.status, GameStatus::CitizenWin);
    assert_eq!(game.round.kill_targets.get(&KillSource::Vote), Some(&1));

    let players = service.end_game_players(1).await.unwrap();
    assert_eq!(players.len(), 6);

    service.change_phase(1, GamePhase::DayVote).await.unwrap();
    assert!(matches!(
        service.vote(1, 101, 2).await.unwrap_err(),
        GameError::GameAlreadyEnded
    ));

    // ---- 後片付け ----
    service.delete_game(1).await.unwrap();
    assert!(matches!(
        service.find_by_id(1).await.unwrap_err(),
        GameError::GameNotFound
    ));
    assert!(drain(&mut system_rx).contains(&json!({"backroom": true})));
}

#[tokio::test]
async fn two_rooms_play_independently() {
    setup_test_env();
    let publisher = Arc::new(BroadcastPublisher::new());
    let service = Arc::new(GameService::with_rng(
        publisher,
        StdRng::seed_from_u64(7),
    ));

    let setting = GameOption {
        zombie: 1,
        mutant: false,
        doctor_skill_usage: 1,
        day_dis_time_sec: 120,
    };
    service.start_game(1, &participants(6), setting.clone()).await.unwrap();
    service.start_game(2, &participants(6), setting).await.unwrap();

    service.change_phase(1, GamePhase::DayVote).await.unwrap();
    service.change_phase(2, GamePhase::NightAction).await.unwrap();

    let voting = {
        let service = service.clone();
        tokio::spawn(async move {
            for member_id in 100..106 {
                service.vote(1, member_id, 2).await.unwrap();
            }
        })
    };
    let rejected = {
        let service = service.clone();
        tokio::spawn(async move { service.vote(2, 100, 2).await })
    };

    voting.await.unwrap();
    assert!(matches!(
        rejected.await.unwrap().unwrap_err(),
        GameError::InvalidPhase
    ));

    assert_eq!(service.games.load(1).await.unwrap().round.votes.len(), 6);
    assert!(service.games.load(2).await.unwrap().round.votes.is_empty());
}
