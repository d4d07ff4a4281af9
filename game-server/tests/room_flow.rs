//! 通过 TCP 驱动完整房间流程

use std::time::Duration;

use game_server::{serve, ServerConfig, ServerState};
use protocol::{
    ClientMessage, Connection, Connector, CreateRoomRequest, ErrorCode, Listener, NetworkConfig,
    Position, RoomSnapshot, RoomStatus, ServerMessage, SettingUpdate, Side, TcpConnection,
    TcpConnector, TcpListener, WinReason,
};
use tokio::time::timeout;

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ServerState::shared(ServerConfig::default());
    tokio::spawn(serve(listener, state));
    addr
}

/// 读取消息直到满足条件
async fn expect<T>(
    conn: &mut TcpConnection,
    mut pick: impl FnMut(ServerMessage) -> Option<T>,
) -> T {
    timeout(Duration::from_secs(5), async {
        loop {
            let msg: ServerMessage = conn.recv().await.unwrap();
            if let Some(found) = pick(msg) {
                return found;
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

async fn wait_room(conn: &mut TcpConnection, pred: impl Fn(&RoomSnapshot) -> bool) -> RoomSnapshot {
    expect(conn, |msg| match msg {
        ServerMessage::RoomUpdated { room } if pred(&room) => Some(room),
        _ => None,
    })
    .await
}

async fn login(addr: &str, user: &str) -> TcpConnection {
    let mut conn = TcpConnector::new(NetworkConfig::default())
        .connect(addr)
        .await
        .unwrap();
    conn.send(&ClientMessage::Login {
        user_id: user.to_string(),
    })
    .await
    .unwrap();
    let info = expect(&mut conn, |msg| match msg {
        ServerMessage::LoginSuccess { user } => Some(user),
        _ => None,
    })
    .await;
    assert_eq!(info.id, user);
    conn
}

/// alice 创建房间，bob 加入，返回房间 ID
async fn open_room(
    alice: &mut TcpConnection,
    bob: &mut TcpConnection,
    request: CreateRoomRequest,
) -> u64 {
    alice.send(&ClientMessage::CreateRoom(request)).await.unwrap();
    let room_id = expect(alice, |msg| match msg {
        ServerMessage::RoomCreated { room } => Some(room.id),
        _ => None,
    })
    .await;

    bob.send(&ClientMessage::JoinRoom { room_id }).await.unwrap();
    let room = expect(bob, |msg| match msg {
        ServerMessage::RoomJoined { room } => Some(room),
        _ => None,
    })
    .await;
    assert_eq!(room.guest.as_deref(), Some("bob"));

    let joined = expect(alice, |msg| match msg {
        ServerMessage::PlayerJoined { user_id, .. } => Some(user_id),
        _ => None,
    })
    .await;
    assert_eq!(joined, "bob");
    room_id
}

async fn ready_both(alice: &mut TcpConnection, bob: &mut TcpConnection, room_id: u64) -> RoomSnapshot {
    for conn in [&mut *alice, &mut *bob] {
        conn.send(&ClientMessage::UpdateSettings {
            room_id,
            updates: vec![SettingUpdate::Ready(true)],
        })
        .await
        .unwrap();
    }
    wait_room(bob, |room| room.status == RoomStatus::Playing).await;
    wait_room(alice, |room| room.status == RoomStatus::Playing).await
}

#[tokio::test]
async fn test_duplicate_login_rejected() {
    let addr = start_server().await;
    let _alice = login(&addr, "alice").await;

    let mut other = TcpConnector::new(NetworkConfig::default())
        .connect(&addr)
        .await
        .unwrap();
    other
        .send(&ClientMessage::Login {
            user_id: " alice ".to_string(),
        })
        .await
        .unwrap();
    let code = expect(&mut other, |msg| match msg {
        ServerMessage::Error { code, .. } => Some(code),
        _ => None,
    })
    .await;
    assert_eq!(code, ErrorCode::UserIdOccupied);
}

#[tokio::test]
async fn test_gomoku_match_to_connect_five() {
    let addr = start_server().await;
    let mut alice = login(&addr, "alice").await;
    let mut bob = login(&addr, "bob").await;

    let room_id = open_room(
        &mut alice,
        &mut bob,
        CreateRoomRequest {
            map: Some("gomokuMap".to_string()),
            ..CreateRoomRequest::default()
        },
    )
    .await;
    let room = ready_both(&mut alice, &mut bob, room_id).await;
    assert!(room.game.started);
    // 五子棋房主执上方
    assert_eq!(room.sides.creator, Side::Top);

    let mut top_stones = (3..=7).map(|col| Position::at(7, col));
    let mut bottom_stones = (0..5).map(|i| Position::at(0, i * 2));
    let mut turn = room.game.turn_side;
    let mut placed = 0;

    loop {
        let (conn, at) = match turn {
            Side::Top => (&mut alice, top_stones.next().unwrap()),
            Side::Bottom => (&mut bob, bottom_stones.next().unwrap()),
        };
        conn.send(&ClientMessage::PlaceStone { room_id, at })
            .await
            .unwrap();
        placed += 1;

        let count = placed;
        let room = wait_room(conn, |room| {
            room.game
                .board
                .as_ref()
                .map_or(0, |b| b.all_pieces().len())
                == count
        })
        .await;
        if room.game.winner.is_some() {
            assert_eq!(room.game.winner, Some(Side::Top));
            assert_eq!(room.game.winner_reason, Some(WinReason::Connect5));
            break;
        }
        turn = room.game.turn_side;
    }

    bob.send(&ClientMessage::PlaceStone {
        room_id,
        at: Position::at(14, 14),
    })
    .await
    .unwrap();
    let code = expect(&mut bob, |msg| match msg {
        ServerMessage::Error { code, .. } => Some(code),
        _ => None,
    })
    .await;
    assert_eq!(code, ErrorCode::GameAlreadyOver);
}

#[tokio::test]
async fn test_rejected_intents_and_creator_leave() {
    let addr = start_server().await;
    let mut alice = login(&addr, "alice").await;
    let mut bob = login(&addr, "bob").await;

    let room_id = open_room(&mut alice, &mut bob, CreateRoomRequest::default()).await;
    let room = ready_both(&mut alice, &mut bob, room_id).await;

    // 对方回合的走子被拒绝
    let waiter = match room.sides.seat_of(room.game.turn_side.opponent()) {
        protocol::Seat::Creator => &mut alice,
        protocol::Seat::Guest => &mut bob,
    };
    waiter
        .send(&ClientMessage::MakeMove {
            room_id,
            from: Position::at(6, 4),
            to: Position::at(4, 4),
            promotion: None,
        })
        .await
        .unwrap();
    let code = expect(waiter, |msg| match msg {
        ServerMessage::Error { code, .. } => Some(code),
        _ => None,
    })
    .await;
    assert_eq!(code, ErrorCode::NotYourTurn);

    alice
        .send(&ClientMessage::LeaveRoom { room_id })
        .await
        .unwrap();
    let rooms = expect(&mut alice, |msg| match msg {
        ServerMessage::RoomList { rooms } if rooms.is_empty() => Some(rooms),
        _ => None,
    })
    .await;
    assert!(rooms.is_empty());

    let message = expect(&mut bob, |msg| match msg {
        ServerMessage::RoomClosed { room_id: closed, message } if closed == room_id => {
            Some(message)
        }
        _ => None,
    })
    .await;
    assert_eq!(message, "방장이 방을 떠나 로비로 이동합니다.");

    // bob 已回到大厅，可以重新建房
    bob.send(&ClientMessage::CreateRoom(CreateRoomRequest::default()))
        .await
        .unwrap();
    let room = expect(&mut bob, |msg| match msg {
        ServerMessage::RoomCreated { room } => Some(room),
        _ => None,
    })
    .await;
    assert_eq!(room.creator, "bob");
}
