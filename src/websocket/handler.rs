use crate::{
    auth::{self, AuthenticatedUser},
    casino::CasinoError,
    game::{crash, CrashTick, GameError},
    websocket::{
        chat::ChatMember,
        messages::{ClientMessage, ServerMessage},
    },
    AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::{Arc, Mutex};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

/// Per-socket state shared by the receive loop and the close path
struct Connection {
    /// Owner id stamped on crash rounds launched from this socket
    id: Uuid,
    address: String,
    username: String,
    tx: mpsc::Sender<ServerMessage>,
    /// Ticker of the crash round launched from this socket
    crash_ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    fn set_crash_ticker(&self, ticker: JoinHandle<()>) {
        let previous = match self.crash_ticker.lock() {
            Ok(mut slot) => slot.replace(ticker),
            Err(poisoned) => poisoned.into_inner().replace(ticker),
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn take_crash_ticker(&self) -> Option<JoinHandle<()>> {
        match self.crash_ticker.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// WebSocket upgrade handler with authentication
pub async fn handle_websocket(
    user: AuthenticatedUser,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection authenticated for {}", user.address);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthenticatedUser) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(100);

    let connection = Arc::new(Connection {
        id: Uuid::new_v4(),
        username: auth::display_name(&user.address),
        address: user.address,
        tx: tx.clone(),
        crash_ticker: Mutex::new(None),
    });

    let connection_id = state.chat.join(ChatMember {
        address: connection.address.clone(),
        username: connection.username.clone(),
        tx: tx.clone(),
    });

    let _ = tx
        .send(ServerMessage::Welcome {
            address: connection.address.clone(),
            username: connection.username.clone(),
            stats: state.casino.stats(&connection.address),
        })
        .await;
    let _ = tx
        .send(ServerMessage::ChatHistory {
            messages: state.chat.history(),
        })
        .await;

    state.chat.broadcast_player_list().await;

    // Spawn a task to send messages to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from the client
    let state_for_recv = state.clone();
    let connection_for_recv = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if let Err(e) =
                            handle_client_message(client_msg, &state_for_recv, &connection_for_recv)
                                .await
                        {
                            tracing::warn!(
                                "Rejected message from {}: {}",
                                connection_for_recv.address,
                                e
                            );
                            let error_msg = ServerMessage::Error {
                                message: e.to_string(),
                            };
                            let _ = connection_for_recv.tx.send(error_msg).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse message: {}", e);
                        let error_msg = ServerMessage::Error {
                            message: format!("Invalid message format: {}", e),
                        };
                        let _ = connection_for_recv.tx.send(error_msg).await;
                    }
                },
                Message::Close(_) => {
                    tracing::info!("Client disconnected: {}", connection_for_recv.address);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.chat.leave(&connection_id);
    state.chat.broadcast_player_list().await;

    close_crash_round(&state, &connection).await;

    tracing::info!("WebSocket connection closed for {}", connection.address);
}

/// Stop this socket's ticker and finish a rocket it launched without its player
async fn close_crash_round(state: &AppState, connection: &Connection) {
    if let Some(ticker) = connection.take_crash_ticker() {
        ticker.abort();
    }
    if let Some(settled) = state
        .casino
        .crash_abandon(&connection.address, connection.id)
        .await
    {
        tracing::info!(
            "Resolved abandoned crash round of {}: {}",
            connection.address,
            settled.settlement.summary
        );
    }
}

/// Drive a crash round every `TICK_INTERVAL` until it settles or the socket goes away
fn spawn_crash_ticker(state: Arc<AppState>, connection: Arc<Connection>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(crash::TICK_INTERVAL);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            if connection.tx.is_closed() {
                break;
            }

            match state.casino.crash_tick(&connection.address).await {
                Ok((CrashTick::Flying { multiplier }, _)) => {
                    if connection
                        .tx
                        .send(ServerMessage::CrashTick { multiplier })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok((tick, settled)) => {
                    let ended = match tick {
                        CrashTick::AutoCashedOut { multiplier, payout } => {
                            ServerMessage::CrashCashedOut { multiplier, payout }
                        }
                        CrashTick::Crashed { crash_point } => {
                            ServerMessage::CrashCrashed { crash_point }
                        }
                        CrashTick::Flying { multiplier } => ServerMessage::CrashTick { multiplier },
                    };
                    let _ = connection.tx.send(ended).await;
                    if let Some(settled) = settled {
                        let _ = connection.tx.send(settled.into()).await;
                    }
                    break;
                }
                // Cashed out by hand since the last tick
                Err(CasinoError::NoActiveRound(_)) | Err(CasinoError::Game(GameError::RoundOver)) => {
                    tracing::debug!("Crash round of {} ended outside the ticker", connection.address);
                    break;
                }
                Err(e) => {
                    tracing::error!("Crash tick failed for {}: {}", connection.address, e);
                    break;
                }
            }
        }
    })
}

/// Handle individual client messages
async fn handle_client_message(
    msg: ClientMessage,
    state: &Arc<AppState>,
    connection: &Arc<Connection>,
) -> anyhow::Result<()> {
    let casino = &state.casino;
    let address = connection.address.as_str();
    let tx = &connection.tx;

    match msg {
        ClientMessage::SpinSlots { bet } => {
            let (spin, settled) = casino.spin_slots(address, bet).await?;
            tx.send(ServerMessage::SlotsResult(spin)).await?;
            tx.send(settled.into()).await?;
        }
        ClientMessage::SpinRoulette { bet, selection } => {
            let (spin, settled) = casino.spin_roulette(address, bet, selection).await?;
            tx.send(ServerMessage::RouletteResult(spin)).await?;
            tx.send(settled.into()).await?;
        }
        ClientMessage::BlackjackDeal { bet } => {
            let update = casino.blackjack_deal(address, bet).await?;
            tx.send(ServerMessage::BlackjackState(update.view)).await?;
            if let Some(settled) = update.settled {
                tx.send(settled.into()).await?;
            }
        }
        ClientMessage::BlackjackHit => {
            let update = casino.blackjack_hit(address).await?;
            tx.send(ServerMessage::BlackjackState(update.view)).await?;
            if let Some(settled) = update.settled {
                tx.send(settled.into()).await?;
            }
        }
        ClientMessage::BlackjackStand => {
            let update = casino.blackjack_stand(address).await?;
            tx.send(ServerMessage::BlackjackState(update.view)).await?;
            if let Some(settled) = update.settled {
                tx.send(settled.into()).await?;
            }
        }
        ClientMessage::MinesStart { bet } => {
            let update = casino.mines_start(address, bet).await?;
            tx.send(ServerMessage::MinesState(update.view)).await?;
        }
        ClientMessage::MinesReveal { tile } => {
            let update = casino.mines_reveal(address, tile).await?;
            tx.send(ServerMessage::MinesState(update.view)).await?;
            if let Some(settled) = update.settled {
                tx.send(settled.into()).await?;
            }
        }
        ClientMessage::MinesCashOut => {
            let update = casino.mines_cash_out(address).await?;
            tx.send(ServerMessage::MinesState(update.view)).await?;
            if let Some(settled) = update.settled {
                tx.send(settled.into()).await?;
            }
        }
        ClientMessage::CrashLaunch { bet, auto_cash_out } => {
            casino
                .crash_launch(address, connection.id, bet, auto_cash_out)
                .await?;
            tracing::debug!("{} launched a crash round ({:.2})", address, bet);
            connection.set_crash_ticker(spawn_crash_ticker(state.clone(), connection.clone()));
            tx.send(ServerMessage::CrashLaunched { bet, auto_cash_out })
                .await?;
        }
        ClientMessage::CrashCashOut => {
            let settled = casino.crash_cash_out(address).await?;
            tx.send(ServerMessage::CrashCashedOut {
                multiplier: settled.settlement.payout / settled.bet,
                payout: settled.settlement.payout,
            })
            .await?;
            tx.send(settled.into()).await?;
        }
        ClientMessage::Chat { message } => {
            let entry = state
                .chat
                .post(address, &connection.username, &message)?;
            state.chat.broadcast(ServerMessage::ChatMessage(entry)).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::game::CrashRound;
    use tokio_test::assert_ok;

    const PLAYER: &str = "0x3333333333333333333333333333333333333333";

    fn connection() -> (Arc<Connection>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(512);
        let connection = Arc::new(Connection {
            id: Uuid::new_v4(),
            address: PLAYER.to_string(),
            username: auth::display_name(PLAYER),
            tx,
            crash_ticker: Mutex::new(None),
        });
        (connection, rx)
    }

    #[tokio::test]
    async fn test_slots_message_sends_result_and_settlement() {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let (connection, mut rx) = connection();

        handle_client_message(ClientMessage::SpinSlots { bet: 5.0 }, &state, &connection)
            .await
            .unwrap();

        assert!(matches!(rx.recv().await, Some(ServerMessage::SlotsResult(_))));
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::RoundSettled { bet, .. }) if bet == 5.0
        ));
    }

    #[tokio::test]
    async fn test_rejected_bet_surfaces_error() {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let (connection, _rx) = connection();

        let err = handle_client_message(ClientMessage::SpinSlots { bet: 0.0 }, &state, &connection)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 0.01"));
    }

    #[tokio::test]
    async fn test_chat_message_is_broadcast() {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let (connection, mut rx) = connection();
        state.chat.join(ChatMember {
            address: connection.address.clone(),
            username: connection.username.clone(),
            tx: connection.tx.clone(),
        });

        handle_client_message(
            ClientMessage::Chat {
                message: " good luck ".to_string(),
            },
            &state,
            &connection,
        )
        .await
        .unwrap();

        match rx.recv().await {
            Some(ServerMessage::ChatMessage(entry)) => {
                assert_eq!(entry.message, "good luck");
                assert_eq!(entry.username, "Player-3333");
            }
            other => panic!("expected a chat message, got {:?}", other),
        }
        assert_eq!(state.chat.history().len(), 1);
    }

    #[tokio::test]
    async fn test_crash_ticker_runs_round_to_settlement() {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let (connection, mut rx) = connection();

        handle_client_message(
            ClientMessage::CrashLaunch {
                bet: 1.0,
                auto_cash_out: None,
            },
            &state,
            &connection,
        )
        .await
        .unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMessage::CrashLaunched { .. })));

        // Pin a low crash point so the round ends after a few ticks
        state
            .casino
            .replace_crash_round(PLAYER, CrashRound::with_crash_point(1.0, None, 1.02).unwrap());

        loop {
            match rx.recv().await {
                Some(ServerMessage::CrashTick { .. }) => continue,
                Some(ServerMessage::CrashCrashed { .. }) => break,
                other => panic!("unexpected message {:?}", other),
            }
        }
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::RoundSettled { won: false, .. })
        ));
        assert!(!state.casino.has_crash_round(PLAYER));
    }

    #[tokio::test]
    async fn test_closing_one_tab_leaves_other_tabs_rocket() {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let (first_tab, mut first_rx) = connection();
        let (second_tab, _second_rx) = connection();

        // The first tab plays a round to the end and keeps its finished ticker
        handle_client_message(
            ClientMessage::CrashLaunch {
                bet: 1.0,
                auto_cash_out: None,
            },
            &state,
            &first_tab,
        )
        .await
        .unwrap();
        state
            .casino
            .replace_crash_round(PLAYER, CrashRound::with_crash_point(1.0, None, 1.02).unwrap());
        while !matches!(first_rx.recv().await, Some(ServerMessage::RoundSettled { .. })) {}

        handle_client_message(
            ClientMessage::CrashLaunch {
                bet: 10.0,
                auto_cash_out: None,
            },
            &state,
            &second_tab,
        )
        .await
        .unwrap();
        state
            .casino
            .replace_crash_round(PLAYER, CrashRound::with_crash_point(10.0, None, 90.0).unwrap());

        close_crash_round(&state, &first_tab).await;
        assert!(state.casino.has_crash_round(PLAYER));

        close_crash_round(&state, &second_tab).await;
        assert!(!state.casino.has_crash_round(PLAYER));
        assert_eq!(state.casino.stats(PLAYER).balance, 989.0);
    }

    #[tokio::test]
    async fn test_close_settles_rocket_without_ticker() {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let (connection, _rx) = connection();
        state
            .casino
            .crash_launch(PLAYER, connection.id, 5.0, None)
            .await
            .unwrap();

        close_crash_round(&state, &connection).await;
        assert!(!state.casino.has_crash_round(PLAYER));
        assert_ok!(state.casino.crash_launch(PLAYER, connection.id, 5.0, None).await);
    }

    #[tokio::test]
    async fn test_ticker_stops_quietly_after_manual_cash_out() {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let (connection, mut rx) = connection();

        handle_client_message(
            ClientMessage::CrashLaunch {
                bet: 2.0,
                auto_cash_out: None,
            },
            &state,
            &connection,
        )
        .await
        .unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMessage::CrashLaunched { .. })));

        // Cashed out but not yet taken out of play when the ticker looks at it
        let mut cashed_out = CrashRound::with_crash_point(2.0, None, 50.0).unwrap();
        cashed_out.cash_out().unwrap();
        state.casino.replace_crash_round(PLAYER, cashed_out);

        let ticker = connection.take_crash_ticker().unwrap();
        assert_ok!(tokio::time::timeout(std::time::Duration::from_secs(1), ticker).await);
        assert!(rx.try_recv().is_err());
    }
}
