//! Room roster bookkeeping for multiplayer matches.
//!
//! [`RoomManager`] holds no sockets. Every operation returns the
//! [`Envelope`]s that should be delivered, so the transport can stay a thin
//! relay and all rules here run in plain unit tests.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::protocol::{
    BoardUpdate, ClientMessage, ConnId, JoinRequest, RemoteBoard, RoomPlayer, RoomView,
    ServerMessage,
};

pub const MAX_PLAYERS: usize = 4;
pub const ROOM_CODE_LEN: usize = 4;
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Game already in progress")]
    AlreadyStarted,
    #[error("Only the host can do that")]
    NotHost,
    #[error("Enter a name first")]
    InvalidName,
    #[error("You are not in that room")]
    NotInRoom,
}

/// Display names must contain something besides whitespace.
pub fn validate_name(name: &str) -> Result<String, RoomError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RoomError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub to: ConnId,
    pub message: ServerMessage,
}

#[derive(Debug, Clone)]
pub struct Room {
    id: String,
    players: Vec<RoomPlayer>,
    started: bool,
}

impl Room {
    fn new(id: String, host: ConnId, name: String) -> Self {
        Self {
            id,
            players: vec![RoomPlayer {
                id: host,
                name,
                is_host: true,
                is_alive: true,
            }],
            started: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn players(&self) -> &[RoomPlayer] {
        &self.players
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn contains(&self, conn: ConnId) -> bool {
        self.players.iter().any(|p| p.id == conn)
    }

    pub fn host(&self) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.is_host)
    }

    fn is_host(&self, conn: ConnId) -> bool {
        self.host().is_some_and(|p| p.id == conn)
    }

    fn view(&self) -> RoomView {
        RoomView {
            players: self.players.clone(),
            game_started: self.started,
        }
    }

    fn broadcast(&self, message: ServerMessage) -> Vec<Envelope> {
        self.players
            .iter()
            .map(|p| Envelope {
                to: p.id,
                message: message.clone(),
            })
            .collect()
    }

    fn roster(&self) -> Vec<Envelope> {
        self.broadcast(ServerMessage::UpdateRoomState(self.view()))
    }

    /// Back to the lobby with everyone alive again.
    fn revert(&mut self) {
        self.started = false;
        for p in self.players.iter_mut() {
            p.is_alive = true;
        }
    }

    /// Announces the winner (or a draw) once at most one player is left
    /// standing, then reverts the room. Empty while the match is undecided.
    fn settle(&mut self) -> Vec<Envelope> {
        if !self.started {
            return Vec::new();
        }
        let mut living = self.players.iter().filter(|p| p.is_alive);
        let result = match (living.next(), living.next()) {
            (Some(winner), None) => ServerMessage::GameOverWinner(winner.clone()),
            (None, _) => ServerMessage::GameOverDraw,
            _ => return Vec::new(),
        };
        tracing::info!(room = %self.id, ?result, "match finished");
        let mut out = self.broadcast(result);
        self.revert();
        out.extend(self.roster());
        out
    }
}

pub struct RoomManager {
    rooms: HashMap<String, Room>,
    rng: StdRng,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(&normalize_code(id))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_of(&self, conn: ConnId) -> Option<&Room> {
        self.rooms.values().find(|r| r.contains(conn))
    }

    /// Applies one client message. Create/join failures come back to the
    /// sender as `error_message`; anything else that fails is dropped.
    pub fn handle(&mut self, conn: ConnId, message: ClientMessage) -> Vec<Envelope> {
        let surface = matches!(
            message,
            ClientMessage::CreateRoom(_) | ClientMessage::JoinRoom(_)
        );
        let result = match message {
            ClientMessage::CreateRoom(name) => self.create_room(conn, &name),
            ClientMessage::JoinRoom(JoinRequest {
                room_id,
                player_name,
            }) => self.join_room(conn, &room_id, &player_name),
            ClientMessage::StartGame(room_id) => self.start_game(conn, &room_id),
            ClientMessage::PlayerUpdate(update) => self.player_update(conn, update),
            ClientMessage::PlayerDied(room_id) => self.player_died(conn, &room_id),
            ClientMessage::ResetLobby(room_id) => self.reset_lobby(conn, &room_id),
        };
        match result {
            Ok(out) => out,
            Err(err) if surface => vec![Envelope {
                to: conn,
                message: ServerMessage::ErrorMessage(err.to_string()),
            }],
            Err(err) => {
                tracing::debug!(conn, %err, "request ignored");
                Vec::new()
            }
        }
    }

    pub fn create_room(&mut self, conn: ConnId, name: &str) -> Result<Vec<Envelope>, RoomError> {
        let name = validate_name(name)?;
        let mut out = self.disconnect(conn);
        let code = self.unique_code();
        let room = Room::new(code.clone(), conn, name);
        tracing::info!(room = %code, conn, "room created");
        out.push(Envelope {
            to: conn,
            message: ServerMessage::RoomCreated(code.clone()),
        });
        out.extend(room.roster());
        self.rooms.insert(code, room);
        Ok(out)
    }

    pub fn join_room(
        &mut self,
        conn: ConnId,
        room_id: &str,
        name: &str,
    ) -> Result<Vec<Envelope>, RoomError> {
        let name = validate_name(name)?;
        let code = normalize_code(room_id);
        let room = self.rooms.get(&code).ok_or(RoomError::RoomNotFound)?;
        if room.contains(conn) {
            let mut out = vec![Envelope {
                to: conn,
                message: ServerMessage::JoinedSuccess(code),
            }];
            out.extend(room.roster());
            return Ok(out);
        }
        if room.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }
        if room.started {
            return Err(RoomError::AlreadyStarted);
        }

        let mut out = self.disconnect(conn);
        let room = self.rooms.get_mut(&code).ok_or(RoomError::RoomNotFound)?;
        room.players.push(RoomPlayer {
            id: conn,
            name,
            is_host: false,
            is_alive: true,
        });
        tracing::info!(room = %code, conn, players = room.players.len(), "player joined");
        out.push(Envelope {
            to: conn,
            message: ServerMessage::JoinedSuccess(code),
        });
        out.extend(room.roster());
        Ok(out)
    }

    pub fn start_game(&mut self, conn: ConnId, room_id: &str) -> Result<Vec<Envelope>, RoomError> {
        let room = self.member_room(conn, room_id)?;
        if !room.is_host(conn) {
            return Err(RoomError::NotHost);
        }
        if room.started {
            return Err(RoomError::AlreadyStarted);
        }
        room.started = true;
        for p in room.players.iter_mut() {
            p.is_alive = true;
        }
        tracing::info!(room = %room.id, players = room.players.len(), "match started");
        Ok(room.broadcast(ServerMessage::GameStarted))
    }

    /// Relays a board snapshot to everyone else in the room.
    pub fn player_update(
        &mut self,
        conn: ConnId,
        update: BoardUpdate,
    ) -> Result<Vec<Envelope>, RoomError> {
        if !update.is_well_formed() {
            tracing::debug!(conn, "malformed board dropped");
            return Ok(Vec::new());
        }
        let room = self.member_room(conn, &update.room_id)?;
        let message = ServerMessage::RemoteBoardUpdate(RemoteBoard {
            id: conn,
            matrix: update.matrix,
            score: update.score,
        });
        Ok(room
            .players
            .iter()
            .filter(|p| p.id != conn)
            .map(|p| Envelope {
                to: p.id,
                message: message.clone(),
            })
            .collect())
    }

    pub fn player_died(&mut self, conn: ConnId, room_id: &str) -> Result<Vec<Envelope>, RoomError> {
        let room = self.member_room(conn, room_id)?;
        if !room.started {
            return Ok(Vec::new());
        }
        let Some(player) = room.players.iter_mut().find(|p| p.id == conn && p.is_alive) else {
            return Ok(Vec::new());
        };
        player.is_alive = false;
        tracing::info!(room = %room.id, conn, "player eliminated");
        let mut out = room.broadcast(ServerMessage::PlayerEliminated(conn));
        out.extend(room.settle());
        Ok(out)
    }

    pub fn reset_lobby(&mut self, conn: ConnId, room_id: &str) -> Result<Vec<Envelope>, RoomError> {
        let room = self.member_room(conn, room_id)?;
        if !room.is_host(conn) {
            return Err(RoomError::NotHost);
        }
        room.revert();
        let mut out = room.broadcast(ServerMessage::ReturnToLobby);
        out.extend(room.roster());
        Ok(out)
    }

    /// Drops `conn` from its room, if any. An empty room is destroyed; a
    /// departing host hands over to the next player in join order. Leaving a
    /// running match counts as being eliminated.
    pub fn disconnect(&mut self, conn: ConnId) -> Vec<Envelope> {
        let Some(code) = self
            .rooms
            .iter()
            .find(|(_, r)| r.contains(conn))
            .map(|(code, _)| code.clone())
        else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return Vec::new();
        };

        let Some(index) = room.players.iter().position(|p| p.id == conn) else {
            return Vec::new();
        };
        let leaving = room.players.remove(index);
        if room.players.is_empty() {
            self.rooms.remove(&code);
            tracing::info!(room = %code, "room closed");
            return Vec::new();
        }
        if leaving.is_host {
            if let Some(next) = room.players.first_mut() {
                next.is_host = true;
                tracing::info!(room = %code, host = next.id, "host transferred");
            }
        }

        let mut out = Vec::new();
        if room.started && leaving.is_alive {
            out.extend(room.broadcast(ServerMessage::PlayerEliminated(conn)));
            let settled = room.settle();
            if !settled.is_empty() {
                out.extend(settled);
                return out;
            }
        }
        out.extend(room.roster());
        out
    }

    fn member_room(&mut self, conn: ConnId, room_id: &str) -> Result<&mut Room, RoomError> {
        let room = self
            .rooms
            .get_mut(&normalize_code(room_id))
            .ok_or(RoomError::RoomNotFound)?;
        if !room.contains(conn) {
            return Err(RoomError::NotInRoom);
        }
        Ok(room)
    }

    fn unique_code(&mut self) -> String {
        loop {
            let code: String = (0..ROOM_CODE_LEN)
                .map(|_| ROOM_CODE_CHARS[self.rng.gen_range(0..ROOM_CODE_CHARS.len())] as char)
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}
