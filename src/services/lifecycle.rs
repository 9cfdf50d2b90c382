use futures::{pin_mut, select, FutureExt};
use log::error;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};

/// Resolves once the process receives SIGINT or SIGTERM
pub(super) async fn termination_signal() {
    let ctrl_c = ctrl_c().fuse();
    pin_mut!(ctrl_c);

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm_stream) => {
            let sigterm = sigterm_stream.recv().fuse();
            pin_mut!(sigterm);

            select! {
                _ = sigterm => {},
                _ = ctrl_c => {},
            };
        }
        Err(e) => {
            error!("Failed to listen for SIGTERM: {}", e);
            ctrl_c.await.ok();
        }
    }
}
