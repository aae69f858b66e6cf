//! Startup and `reconnect` port connections.

use midicmd_io::MidiBackend;

/// Connects the output port to each of `ports`, in order.
///
/// Failures are logged and skipped. Returns how many connections succeeded.
pub fn connect_all<B: MidiBackend + ?Sized>(backend: &mut B, ports: &[String]) -> usize {
    let from = backend.output_port_name();
    let mut connected = 0;
    for remote in ports {
        match backend.connect(remote) {
            Ok(()) => {
                tracing::info!(%from, to = %remote, "connected");
                connected += 1;
            }
            Err(err) => tracing::warn!("cannot connect {from} to {remote}: {err}"),
        }
    }
    connected
}
