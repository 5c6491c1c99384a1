use chrono::Utc;
use dashmap::DashMap;
use std::{collections::VecDeque, sync::Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::{ChatEntry, OnlinePlayer, ServerMessage};

pub const MAX_MESSAGE_CHARS: usize = 280;

#[derive(Debug, Error, PartialEq)]
pub enum ChatError {
    #[error("message is empty")]
    Empty,
    #[error("message is longer than {} characters", MAX_MESSAGE_CHARS)]
    TooLong,
}

/// An open socket in the room
#[derive(Debug, Clone)]
pub struct ChatMember {
    pub address: String,
    pub username: String,
    pub tx: mpsc::Sender<ServerMessage>,
}

/// Global chat shared by every connection, with a bounded replay history
pub struct ChatRoom {
    members: DashMap<Uuid, ChatMember>,
    history: Mutex<VecDeque<ChatEntry>>,
    history_limit: usize,
}

impl ChatRoom {
    pub fn new(history_limit: usize) -> Self {
        Self {
            members: DashMap::new(),
            history: Mutex::new(VecDeque::with_capacity(history_limit)),
            history_limit,
        }
    }

    /// Register a connection and return its id
    pub fn join(&self, member: ChatMember) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.members.insert(connection_id, member);
        connection_id
    }

    pub fn leave(&self, connection_id: &Uuid) {
        self.members.remove(connection_id);
    }

    /// Oldest first
    pub fn history(&self) -> Vec<ChatEntry> {
        match self.history.lock() {
            Ok(history) => history.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Addresses with at least one open socket, one entry each
    pub fn online_players(&self) -> Vec<OnlinePlayer> {
        let mut players: Vec<OnlinePlayer> = self
            .members
            .iter()
            .map(|member| OnlinePlayer {
                address: member.address.clone(),
                username: member.username.clone(),
            })
            .collect();
        players.sort();
        players.dedup();
        players
    }

    /// Validate and store a message; the caller broadcasts it
    pub fn post(&self, address: &str, username: &str, text: &str) -> Result<ChatEntry, ChatError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ChatError::Empty);
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::TooLong);
        }

        let entry = ChatEntry {
            id: Uuid::new_v4(),
            address: address.to_string(),
            username: username.to_string(),
            message: message.to_string(),
            sent_at: Utc::now(),
        };

        let mut history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.push_back(entry.clone());
        while history.len() > self.history_limit {
            history.pop_front();
        }

        Ok(entry)
    }

    /// Send to every open socket
    pub async fn broadcast(&self, message: ServerMessage) {
        let senders: Vec<mpsc::Sender<ServerMessage>> =
            self.members.iter().map(|member| member.tx.clone()).collect();

        for tx in senders {
            let _ = tx.send(message.clone()).await;
        }
    }

    pub async fn broadcast_player_list(&self) {
        let players = self.online_players();
        self.broadcast(ServerMessage::PlayerList { players }).await;
    }
}
