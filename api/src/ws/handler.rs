//! WebSocket upgrade handlers.
//!
//! Each handler upgrades the HTTP request, splits the socket, starts a writer
//! task draining the connection's outbound queue, and hands the inbound half
//! to a [`Session`] for the channel's receive loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitStream;
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::channels::Channel;
use super::connection::Connection;
use super::feeds::{PnlGenerator, DEMO_STRATEGY_ID};
use super::metrics::WsMetrics;
use super::session::Session;
use super::source::run_source;
use crate::state::HubState;

/// Upgrade handler for the shared tick broadcast.
pub async fn ticks_handler(ws: WebSocketUpgrade, State(state): State<HubState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ticks(socket, state))
}

/// Upgrade handler for the order echo channel.
pub async fn orders_handler(
    ws: WebSocketUpgrade,
    State(state): State<HubState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_orders(socket, state))
}

/// Upgrade handler for the private P&L stream.
pub async fn pnl_handler(ws: WebSocketUpgrade, State(state): State<HubState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_pnl(socket, state))
}

/// Handles a tick channel connection.
async fn handle_ticks(socket: WebSocket, state: HubState) {
    let Some((mut session, mut inbound, writer)) = open(socket, Channel::Ticks, &state).await
    else {
        return;
    };

    session.register(Arc::clone(&state.registry));
    session.attach_producer(state.ticks.acquire());

    let end = session
        .run_control_loop(&mut inbound, state.config.strict_control_messages)
        .await;
    info!(connection_id = session.connection().id(), ?end, "tick session ended");

    drop(session);
    finish_writer(writer, state.config.send_timeout()).await;
}

/// Handles an order channel connection.
async fn handle_orders(socket: WebSocket, state: HubState) {
    let Some((mut session, mut inbound, writer)) = open(socket, Channel::Orders, &state).await
    else {
        return;
    };

    let end = session
        .run_echo_loop(&mut inbound, state.config.strict_control_messages)
        .await;
    info!(connection_id = session.connection().id(), ?end, "order session ended");

    drop(session);
    finish_writer(writer, state.config.send_timeout()).await;
}

/// Handles a P&L channel connection.
async fn handle_pnl(socket: WebSocket, state: HubState) {
    let Some((mut session, mut inbound, writer)) = open(socket, Channel::Pnl, &state).await
    else {
        return;
    };

    let generator = PnlGenerator::new(DEMO_STRATEGY_ID, state.config.pnl_interval());
    session.spawn_producer(run_source(generator, session.connection().clone()));

    let end = session.run_until_closed(&mut inbound).await;
    info!(connection_id = session.connection().id(), ?end, "pnl session ended");

    drop(session);
    finish_writer(writer, state.config.send_timeout()).await;
}

/// Accepts a socket: starts its writer, creates the session and greets the client.
///
/// Returns `None` if the client vanished before the greeting could be queued.
async fn open(
    socket: WebSocket,
    channel: Channel,
    state: &HubState,
) -> Option<(Session, SplitStream<WebSocket>, JoinHandle<()>)> {
    let (ws_sender, inbound) = socket.split();

    // Create channel for outgoing messages
    let (tx, rx) = mpsc::channel::<String>(state.config.outbound_buffer);
    let writer = spawn_writer(ws_sender, rx, Arc::clone(&state.metrics));

    let connection = Connection::new(tx, state.config.send_timeout());
    let session = Session::accept(channel, connection, Arc::clone(&state.metrics));

    if let Err(e) = session.greet().await {
        warn!(connection_id = session.connection().id(), error = %e, "failed to greet client");
        drop(session);
        writer.abort();
        return None;
    }

    Some((session, inbound, writer))
}

/// Spawns the task that forwards queued frames to the socket.
///
/// The task ends once every sender is gone or the socket rejects a write,
/// then closes the socket.
fn spawn_writer<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<String>,
    metrics: Arc<WsMetrics>,
) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                debug!("socket rejected write, stopping writer");
                break;
            }
            metrics.record_message_sent();
        }
        let _ = sink.close().await;
    })
}

/// Lets the writer flush what is queued, aborting it if the socket stalls.
async fn finish_writer(mut writer: JoinHandle<()>, grace: Duration) {
    if tokio::time::timeout(grace, &mut writer).await.is_err() {
        debug!("writer did not finish in time, aborting");
        writer.abort();
    }
}
