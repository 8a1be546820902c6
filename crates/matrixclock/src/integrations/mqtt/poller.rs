use std::time::Duration;

use super::bridge::BridgeError;
use super::bridge::BrokerCallbacks;
use super::client::BrokerEvent;
use super::client::EventPump;

/// Pump the broker connection forever, handing every event to `callbacks`.
///
/// Each cycle runs [`BrokerCallbacks::before_pump`], waits at most `wait`
/// for traffic and then sleeps for the same bound. Returns only on a
/// connection or dispatch error.
pub async fn poll_broker(
    pump: &mut dyn EventPump,
    callbacks: &dyn BrokerCallbacks,
    wait: Duration,
) -> Result<(), BridgeError> {
    loop {
        callbacks.before_pump()?;
        for event in pump.pump(wait).await? {
            dispatch(callbacks, event)?;
        }
        tokio::time::sleep(wait).await;
    }
}

fn dispatch(callbacks: &dyn BrokerCallbacks, event: BrokerEvent) -> Result<(), BridgeError> {
    match event {
        BrokerEvent::Connected { session_present } => callbacks.on_connect(session_present),
        BrokerEvent::Disconnected => callbacks.on_disconnect(),
        BrokerEvent::Message(msg) => callbacks.on_message(&msg.topic, &msg.payload)?,
    }
    Ok(())
}
