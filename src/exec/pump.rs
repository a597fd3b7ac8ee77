// src/exec/pump.rs

//! Per-process output pump.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tracing::{debug, error};

use crate::engine::ProcessExit;
use crate::exec::backend::ProcessSink;
use crate::types::StreamKind;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Forward a child's stdout/stderr chunks to `sink` until both pipes close,
/// then wait for the exit status and forward that.
///
/// One task sends every event for the process, so all output is delivered
/// before the exit.
pub async fn pump_process(mut child: Child, sink: ProcessSink) {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = vec![0u8; READ_CHUNK_BYTES];
    let mut err_buf = vec![0u8; READ_CHUNK_BYTES];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => {
                match read {
                    Some(n) => {
                        sink.output(StreamKind::Stdout, out_buf[..n].to_vec()).await;
                    }
                    None => stdout = None,
                }
            }
            read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => {
                match read {
                    Some(n) => {
                        sink.output(StreamKind::Stderr, err_buf[..n].to_vec()).await;
                    }
                    None => stderr = None,
                }
            }
        }
    }

    match child.wait().await {
        Ok(status) => {
            let exit = ProcessExit::from_status(status);
            debug!(
                key = %sink.key(),
                generation = sink.generation(),
                exit_code = ?exit.code,
                signal = ?exit.signal,
                "run process exited"
            );
            sink.exited(exit).await;
        }
        Err(e) => {
            error!(
                key = %sink.key(),
                generation = sink.generation(),
                error = %e,
                "waiting for run process failed"
            );
            sink.failed(format!("waiting for process: {e}")).await;
        }
    }
}

/// Read one chunk. `None` means the pipe is closed (EOF or read error).
async fn read_chunk<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> Option<usize>
where
    R: AsyncRead + Unpin,
{
    let reader = pipe.as_mut()?;
    match reader.read(buf).await {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(e) => {
            debug!(error = %e, "reading from run process pipe failed; treating as closed");
            None
        }
    }
}
