use std::net::IpAddr;

use anyhow::Context;
use dashlink_core::session::SessionRegistry;
use tokio::sync::mpsc;

use crate::terminal::print;

pub async fn exec(registry: &SessionRegistry, address: IpAddr, command: &str) -> anyhow::Result<()> {
    let session = registry
        .open(address)
        .await
        .with_context(|| format!("no supported device at {address}"))?;
    print::header(&format!("running on {}", session.device()), registry.config().quiet);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            print::print(&line);
        }
    });

    let status = session
        .execute_streaming(command, tx)
        .await
        .with_context(|| format!("failed to run `{command}` on {}", session.device()))?;
    printer.await?;

    anyhow::ensure!(status == 0, "`{command}` exited with status {status}");
    Ok(())
}
