//! Foreground print loop for a running capture

use std::future::Future;

use anyhow::Result;
use sniffer_capture::LoopExit;
use sniffer_packet::CapturedPacket;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// How the print loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// Interrupted or packet count reached; the session still needs stopping
    User,
    /// The capture loop ended on its own
    Exited(LoopExit),
}

/// Hand packets to `emit` until `interrupt` fires, `limit` packets were
/// emitted or the capture loop exits
///
/// `interrupt` is polled for the whole run, so it fires even if it became
/// ready while `emit` was busy. Returns how the loop ended and how many
/// packets were emitted.
pub async fn print_until<S, W>(
    rx: &mut UnboundedReceiver<CapturedPacket>,
    interrupt: S,
    exit_task: &mut JoinHandle<Option<LoopExit>>,
    limit: Option<u64>,
    mut emit: W,
) -> Result<(Interrupt, u64)>
where
    S: Future,
    W: FnMut(&CapturedPacket) -> Result<()>,
{
    tokio::pin!(interrupt);
    let mut printed: u64 = 0;

    let end = loop {
        tokio::select! {
            _ = &mut interrupt => break Interrupt::User,
            packet = rx.recv() => {
                let Some(packet) = packet else {
                    // The worker dropped the sink; the exit notice follows
                    break Interrupt::Exited((&mut *exit_task).await?.unwrap_or(LoopExit::Stopped));
                };
                emit(&packet)?;
                printed += 1;
                if limit.is_some_and(|limit| printed >= limit) {
                    break Interrupt::User;
                }
            }
            exit = &mut *exit_task => {
                break Interrupt::Exited(exit?.unwrap_or(LoopExit::Stopped));
            }
        }
    };

    Ok((end, printed))
}
