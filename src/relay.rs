//! Connection registry for the room server: decodes inbound frames, runs them
//! through the [`RoomManager`] and fans the results out to per-connection
//! channels.

use std::collections::HashMap;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::protocol::{ClientMessage, ConnId, ServerMessage};
use crate::room::{Envelope, RoomManager};

pub struct Relay {
    rooms: RoomManager,
    peers: HashMap<ConnId, UnboundedSender<String>>,
    next_id: ConnId,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RoomManager::new())
    }
}

impl Relay {
    pub fn new(rooms: RoomManager) -> Self {
        Self {
            rooms,
            peers: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Registers a new connection. The receiver yields encoded frames for it,
    /// starting with its `connected` greeting.
    pub fn connect(&mut self) -> (ConnId, UnboundedReceiver<String>) {
        let conn = self.next_id;
        self.next_id += 1;
        let (tx, rx) = unbounded_channel();
        self.peers.insert(conn, tx);
        self.deliver(vec![Envelope {
            to: conn,
            message: ServerMessage::Connected(conn),
        }]);
        (conn, rx)
    }

    pub fn handle_text(&mut self, conn: ConnId, text: &str) {
        match ClientMessage::from_json(text) {
            Ok(message) => {
                let out = self.rooms.handle(conn, message);
                self.deliver(out);
            }
            Err(e) => tracing::debug!(conn, error = %e, "dropping malformed frame"),
        }
    }

    pub fn disconnect(&mut self, conn: ConnId) {
        self.peers.remove(&conn);
        let out = self.rooms.disconnect(conn);
        self.deliver(out);
    }

    fn deliver(&self, out: Vec<Envelope>) {
        for Envelope { to, message } in out {
            let Some(tx) = self.peers.get(&to) else {
                continue;
            };
            match message.to_json() {
                Ok(text) => {
                    if tx.send(text).is_err() {
                        tracing::debug!(conn = to, "peer channel closed");
                    }
                }
                Err(e) => tracing::warn!(conn = to, error = %e, "failed to encode message"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(ServerMessage::from_json(&text).unwrap());
        }
        out
    }

    fn create(relay: &mut Relay, conn: ConnId, rx: &mut UnboundedReceiver<String>) -> String {
        relay.handle_text(conn, r#"{"event":"create_room","data":"host"}"#);
        drain(rx)
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::RoomCreated(code) => Some(code),
                _ => None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn greets_each_connection_with_its_id() {
        let mut relay = Relay::new(RoomManager::seeded(1));
        let (a, mut rx_a) = relay.connect();
        let (b, mut rx_b) = relay.connect();
        assert_ne!(a, b);
        let first = rx_a.recv().await.unwrap();
        assert_eq!(ServerMessage::from_json(&first).unwrap(), ServerMessage::Connected(a));
        assert_eq!(drain(&mut rx_b), vec![ServerMessage::Connected(b)]);
        assert_eq!(relay.peer_count(), 2);
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let mut relay = Relay::new(RoomManager::seeded(2));
        let (a, mut rx) = relay.connect();
        drain(&mut rx);
        relay.handle_text(a, "{not json");
        relay.handle_text(a, r#"{"event":"teleport","data":1}"#);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(relay.rooms().room_count(), 0);
    }

    #[test]
    fn board_updates_reach_opponents() {
        let mut relay = Relay::new(RoomManager::seeded(3));
        let (a, mut rx_a) = relay.connect();
        let (b, mut rx_b) = relay.connect();
        drain(&mut rx_a);
        drain(&mut rx_b);
        let code = create(&mut relay, a, &mut rx_a);
        relay.handle_text(
            b,
            &format!(r#"{{"event":"join_room","data":{{"roomId":"{code}","playerName":"guest"}}}}"#),
        );
        assert!(drain(&mut rx_b).contains(&ServerMessage::JoinedSuccess(code.clone())));
        drain(&mut rx_a);

        relay.handle_text(
            a,
            &format!(r#"{{"event":"player_update","data":{{"roomId":"{code}","matrix":[[0,5]],"score":40}}}}"#),
        );
        assert!(drain(&mut rx_a).is_empty());
        let got = drain(&mut rx_b);
        assert_eq!(got.len(), 1);
        assert!(matches!(
            &got[0],
            ServerMessage::RemoteBoardUpdate(board) if board.id == a && board.score == 40
        ));
    }

    #[test]
    fn socket_close_runs_disconnect() {
        let mut relay = Relay::new(RoomManager::seeded(4));
        let (a, mut rx_a) = relay.connect();
        let (b, mut rx_b) = relay.connect();
        let code = create(&mut relay, a, &mut rx_a);
        relay.handle_text(
            b,
            &format!(r#"{{"event":"join_room","data":{{"roomId":"{code}","playerName":"guest"}}}}"#),
        );
        drain(&mut rx_b);

        relay.disconnect(a);
        assert_eq!(relay.peer_count(), 1);
        let roster = drain(&mut rx_b)
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::UpdateRoomState(view) => Some(view),
                _ => None,
            })
            .unwrap();
        assert_eq!(roster.players.len(), 1);
        assert!(roster.players[0].is_host);
        assert_eq!(roster.players[0].id, b);
    }
}
