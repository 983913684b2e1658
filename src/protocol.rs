//! Wire messages between browser clients and the room server.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`; events
//! without a payload omit `data`.

use serde::{Deserialize, Serialize};

/// Server-assigned connection id.
pub type ConnId = u64;

/// Largest board accepted in a `player_update`, in either dimension.
pub const MAX_BOARD_DIM: usize = 64;
/// Highest cell value a client may report (piece colors are 1-7).
pub const MAX_CELL_VALUE: u8 = 7;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom(String),
    JoinRoom(JoinRequest),
    StartGame(String),
    PlayerUpdate(BoardUpdate),
    PlayerDied(String),
    ResetLobby(String),
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: String,
    pub player_name: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoardUpdate {
    pub room_id: String,
    pub matrix: Vec<Vec<u8>>,
    pub score: u32,
}

impl BoardUpdate {
    /// Rectangular, bounded in size, and using known cell values.
    pub fn is_well_formed(&self) -> bool {
        let Some(width) = self.matrix.first().map(Vec::len) else {
            return true;
        };
        self.matrix.len() <= MAX_BOARD_DIM
            && width <= MAX_BOARD_DIM
            && self
                .matrix
                .iter()
                .all(|row| row.len() == width && row.iter().all(|&c| c <= MAX_CELL_VALUE))
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every connection: the id the server knows this client by.
    Connected(ConnId),
    RoomCreated(String),
    JoinedSuccess(String),
    ErrorMessage(String),
    UpdateRoomState(RoomView),
    GameStarted,
    RemoteBoardUpdate(RemoteBoard),
    PlayerEliminated(ConnId),
    GameOverWinner(RoomPlayer),
    GameOverDraw,
    ReturnToLobby,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayer {
    pub id: ConnId,
    pub name: String,
    pub is_host: bool,
    pub is_alive: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub players: Vec<RoomPlayer>,
    pub game_started: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RemoteBoard {
    pub id: ConnId,
    pub matrix: Vec<Vec<u8>>,
    pub score: u32,
}

impl ClientMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_use_contract_field_names() {
        let msg = ClientMessage::from_json(
            r#"{"event":"join_room","data":{"roomId":"AB12","playerName":"ana"}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom(JoinRequest {
                room_id: "AB12".into(),
                player_name: "ana".into(),
            })
        );

        let msg = ClientMessage::from_json(r#"{"event":"create_room","data":"bob"}"#).unwrap();
        assert_eq!(msg, ClientMessage::CreateRoom("bob".into()));

        let update = ClientMessage::PlayerUpdate(BoardUpdate {
            room_id: "AB12".into(),
            matrix: vec![vec![0, 1]],
            score: 40,
        });
        let value: serde_json::Value = serde_json::from_str(&update.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"event": "player_update", "data": {"roomId": "AB12", "matrix": [[0, 1]], "score": 40}})
        );
    }

    #[test]
    fn server_messages_use_contract_field_names() {
        let msg = ServerMessage::UpdateRoomState(RoomView {
            players: vec![RoomPlayer {
                id: 3,
                name: "ana".into(),
                is_host: true,
                is_alive: true,
            }],
            game_started: false,
        });
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"event": "update_room_state", "data": {
                "players": [{"id": 3, "name": "ana", "isHost": true, "isAlive": true}],
                "gameStarted": false
            }})
        );

        let value: serde_json::Value =
            serde_json::from_str(&ServerMessage::GameStarted.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "game_started"}));
    }

    #[test]
    fn unknown_events_and_bad_payloads_are_rejected() {
        assert!(ClientMessage::from_json(r#"{"event":"fly","data":"x"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"event":"start_game","data":7}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"event":"join_room","data":{"roomId":"A"}}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn ragged_or_oversized_boards_are_malformed() {
        let board = |matrix: Vec<Vec<u8>>| BoardUpdate {
            room_id: "X".into(),
            matrix,
            score: 0,
        };
        assert!(board(vec![vec![0; 10]; 20]).is_well_formed());
        assert!(board(vec![]).is_well_formed());
        assert!(!board(vec![vec![0; 10], vec![0; 9]]).is_well_formed());
        assert!(!board(vec![vec![0; 10]; 65]).is_well_formed());
        assert!(board(vec![vec![7; 10]]).is_well_formed());
        assert!(!board(vec![vec![8; 10]]).is_well_formed());
    }
}
