use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::StageReport;

/// Reads `reader` to the end, sending one line at a time into `tx`
///
/// Line terminators (`\n` or `\r\n`) are stripped and bytes that are not
/// UTF-8 are replaced rather than rejected. A read error ends the source and
/// is returned to the caller; it concerns the whole stream, not one line.
pub(crate) async fn read_lines<R>(reader: R, tx: mpsc::Sender<String>) -> io::Result<StageReport>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut report = StageReport::new("lines");
    let mut buf = Vec::with_capacity(1024);

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            trace!("End of input after {} lines", report.received);
            break;
        }
        report.received += 1;

        let line = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
        if tx.send(line).await.is_err() {
            debug!("Line receiver dropped, stopping source");
            break;
        }
        report.emitted += 1;
    }

    Ok(report)
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}
