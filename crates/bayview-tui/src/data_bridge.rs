//! Data bridge: connects [`Controller`] streams to TUI actions.
//!
//! Runs as a background task. Connects, pushes the current snapshot so the
//! screens have something to draw, then forwards every snapshot, snapshot
//! timestamp and connection-state change until cancelled.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use bayview_core::{ConnectionState, Controller};

use crate::action::Action;

pub async fn spawn_data_bridge(
    controller: Controller,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let _ = action_tx.send(Action::Connecting);

    if let Err(e) = controller.connect().await {
        warn!(error = %e, "failed to connect to status server");
        let _ = action_tx.send(Action::Disconnected(e.to_string()));
        return;
    }

    let mut machines = controller.machines();
    let mut conn_state = controller.connection_state();
    let mut last_snapshot = controller.store().subscribe_last_snapshot();

    let _ = action_tx.send(Action::MachinesUpdated(machines.current().clone()));
    if let Some(action) = connection_action(&conn_state.borrow_and_update()) {
        let _ = action_tx.send(action);
    }
    if let Some(at) = *last_snapshot.borrow_and_update() {
        let _ = action_tx.send(Action::SnapshotReceived(at));
    }

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(snapshot) = machines.changed() => {
                debug!(machines = snapshot.len(), "dispatching MachinesUpdated");
                let _ = action_tx.send(Action::MachinesUpdated(snapshot));
            }
            Ok(()) = last_snapshot.changed() => {
                if let Some(at) = *last_snapshot.borrow_and_update() {
                    let _ = action_tx.send(Action::SnapshotReceived(at));
                }
            }
            Ok(()) = conn_state.changed() => {
                let state = conn_state.borrow_and_update().clone();
                if let Some(action) = connection_action(&state) {
                    let _ = action_tx.send(action);
                }
            }
        }
    }

    controller.disconnect().await;
    debug!("data bridge shut down");
}

/// Status-bar action for a connection state.
fn connection_action(state: &ConnectionState) -> Option<Action> {
    match state {
        ConnectionState::Connected => Some(Action::Connected),
        ConnectionState::Connecting => Some(Action::Connecting),
        ConnectionState::Reconnecting { attempt } => Some(Action::Reconnecting(*attempt)),
        ConnectionState::Failed => Some(Action::Disconnected("connection failed".into())),
        ConnectionState::Disconnected => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use bayview_core::ControllerConfig;

    #[test]
    fn connection_states_map_to_actions() {
        assert!(matches!(
            connection_action(&ConnectionState::Reconnecting { attempt: 3 }),
            Some(Action::Reconnecting(3))
        ));
        assert!(matches!(
            connection_action(&ConnectionState::Failed),
            Some(Action::Disconnected(_))
        ));
        assert!(connection_action(&ConnectionState::Disconnected).is_none());
    }

    #[tokio::test]
    async fn unreachable_server_still_reports_connected_with_empty_grid() {
        // Nothing listens on the discard port; the initial fetch fails and
        // is swallowed, so the bridge carries on with an empty snapshot.
        let mut config = ControllerConfig::new("http://127.0.0.1:9".parse().unwrap());
        config.websocket_enabled = false;
        config.timeout = std::time::Duration::from_millis(500);
        let controller = Controller::new(config);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(spawn_data_bridge(controller, tx, cancel.clone()));

        assert!(matches!(rx.recv().await, Some(Action::Connecting)));
        match rx.recv().await {
            Some(Action::MachinesUpdated(snapshot)) => assert!(snapshot.is_empty()),
            other => panic!("expected MachinesUpdated, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some(Action::Connected)));

        cancel.cancel();
        task.await.unwrap();
    }
}
