use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::connection::LinkEvent;
use crate::dispatcher::Intent;
use crate::mqtt::MqttTransport;
use crate::session::{SendOutcome, Session};
use crate::transport::{Delivery, Transport};
use crate::ui::{UiCommand, UiEvent};

const COMMAND_CAP: usize = 64;

pub struct LinkHandle {
    pub tx: mpsc::Sender<UiCommand>,
    pub events: mpsc::UnboundedReceiver<UiEvent>,
    pub task: JoinHandle<()>,
}

/// Must be called inside a tokio runtime.
pub fn spawn(config: LinkConfig) -> LinkHandle {
    let (transport, transport_rx) = MqttTransport::channel();
    let (tx, rx) = mpsc::channel(COMMAND_CAP);
    let (ui_tx, events) = mpsc::unbounded_channel();
    let session = Session::new(transport, config);
    let task = tokio::spawn(run(session, transport_rx, rx, ui_tx));
    LinkHandle { tx, events, task }
}

pub async fn run<T: Transport>(
    mut session: Session<T>,
    mut transport_rx: mpsc::UnboundedReceiver<Delivery>,
    mut rx: mpsc::Receiver<UiCommand>,
    ui: mpsc::UnboundedSender<UiEvent>,
) {
    let status_tx = ui.clone();
    session.observe(move |event| {
        if let LinkEvent::StatusChanged(state) = event {
            let _ = status_tx.send(UiEvent::Status(*state));
        }
    });

    let mut backlog: VecDeque<UiCommand> = VecDeque::new();

    loop {
        tokio::select! {
            next = recv_or_backlog(&mut rx, &mut backlog) => {
                let Some(cmd) = next else { break };
                let cmd = coalesce_drive(cmd, &mut rx, &mut backlog);
                handle_command(&mut session, cmd, &ui);
            }
            Some(delivery) = transport_rx.recv() => {
                if let Some(update) = session.handle_delivery(delivery) {
                    let _ = ui.send(UiEvent::Telemetry(update));
                }
            }
        }
    }

    info!("command channel closed, link actor stopping");
    session.disconnect();
}

fn handle_command<T: Transport>(
    session: &mut Session<T>,
    cmd: UiCommand,
    ui: &mpsc::UnboundedSender<UiEvent>,
) {
    match cmd {
        UiCommand::Connect => {
            session.connect();
        }
        UiCommand::Disconnect => session.disconnect(),
        UiCommand::Login(identity) => session.login(identity),
        UiCommand::Send(intent) => match session.send(intent, Instant::now()) {
            Ok(SendOutcome::Published(out)) => {
                let _ = ui.send(UiEvent::Sent(out));
            }
            Ok(SendOutcome::Held) => {}
            Ok(SendOutcome::Dropped(out)) => {
                let _ = ui.send(UiEvent::Rejected(format!(
                    "not connected, {} not sent",
                    out.topic
                )));
            }
            Err(e) => {
                warn!(error = %e, "intent rejected");
                let _ = ui.send(UiEvent::Rejected(e.to_string()));
            }
        },
    }
}

fn coalesce_drive(
    first: UiCommand,
    rx: &mut mpsc::Receiver<UiCommand>,
    backlog: &mut VecDeque<UiCommand>,
) -> UiCommand {
    if !is_drive(&first) {
        return first;
    }

    let mut last = first;
    let mut skipped = 0usize;
    while let Ok(next) = rx.try_recv() {
        if is_drive(&next) {
            last = next;
            skipped += 1;
        } else {
            backlog.push_back(next);
            break;
        }
    }
    if skipped > 0 {
        debug!(skipped, "queued drive intents collapsed");
    }
    last
}

fn is_drive(cmd: &UiCommand) -> bool {
    matches!(cmd, UiCommand::Send(Intent::Drive { .. }))
}

async fn recv_or_backlog(
    rx: &mut mpsc::Receiver<UiCommand>,
    backlog: &mut VecDeque<UiCommand>,
) -> Option<UiCommand> {
    if let Some(cmd) = backlog.pop_front() {
        return Some(cmd);
    }
    rx.recv().await
}
