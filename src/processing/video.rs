//! Base layer and RPU extraction
//!
//! Disk mode runs ffmpeg and dovi_tool one after the other through
//! `BL.hevc`. Streamed mode runs them together: a tee task copies ffmpeg's
//! stdout into `BL.hevc` and into dovi_tool's stdin, and the three are joined
//! so the first failure aborts the others.

use crate::dolby_vision::DoviTool;
use crate::utils::{Error, FfmpegWrapper, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

const TEE_BUFFER_SIZE: usize = 1 << 20;

/// Intermediate video files inside the job workspace
#[derive(Debug, Clone)]
pub struct LayerPaths {
    pub base_layer: PathBuf,
    pub rpu: PathBuf,
    pub injected: PathBuf,
}

impl LayerPaths {
    pub fn in_workspace(workspace: &Path) -> Self {
        Self {
            base_layer: workspace.join("BL.hevc"),
            rpu: workspace.join("RPU.bin"),
            injected: workspace.join("BL_RPU.hevc"),
        }
    }
}

/// Extracts the base layer and its converted RPU in a single pass.
pub async fn extract_streamed(
    ffmpeg: &FfmpegWrapper,
    dovi: &DoviTool,
    input: &Path,
    layers: &LayerPaths,
) -> Result<()> {
    let mut producer = ffmpeg.spawn_base_layer_stream(input)?;
    let mut consumer = dovi.spawn_extract_rpu_from_stdin(&layers.rpu)?;

    let source = producer
        .stdout
        .take()
        .ok_or_else(|| Error::extraction("ffmpeg stdout was not captured"))?;
    let sink = consumer
        .stdin
        .take()
        .ok_or_else(|| Error::metadata("dovi_tool stdin was not captured"))?;
    let file = tokio::fs::File::create(&layers.base_layer)
        .await
        .map_err(|e| {
            Error::extraction(format!(
                "Cannot create {}: {}",
                layers.base_layer.display(),
                e
            ))
        })?;

    let produce = async {
        ffmpeg
            .ffmpeg()
            .wait(producer)
            .await
            .map_err(|e| Error::extraction(e.to_string()))
    };
    let consume = async {
        dovi.runner()
            .wait(consumer)
            .await
            .map_err(|e| Error::metadata(format!("RPU extraction failed: {}", e)))
    };

    let (_, bytes, _) = tokio::try_join!(produce, tee(source, file, sink), consume)?;
    debug!("Streamed {} bytes of base layer", bytes);

    if bytes == 0 {
        return Err(Error::extraction("ffmpeg produced an empty base layer"));
    }
    let rpu_size = tokio::fs::metadata(&layers.rpu).await.map(|m| m.len()).unwrap_or(0);
    if rpu_size == 0 {
        return Err(Error::metadata(format!(
            "dovi_tool produced no RPU at {}",
            layers.rpu.display()
        )));
    }
    Ok(())
}

/// Copies `source` into `file` and `sink` until EOF, returning the byte
/// count. A consumer that hangs up early only stops the copy into `sink`;
/// its own exit status reports the failure.
pub async fn tee<R, F, W>(mut source: R, mut file: F, mut sink: W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    F: AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; TEE_BUFFER_SIZE];
    let mut total = 0u64;
    let mut sink_open = true;

    loop {
        let n = source
            .read(&mut buf)
            .await
            .map_err(|e| Error::extraction(format!("Reading ffmpeg output failed: {}", e)))?;
        if n == 0 {
            break;
        }

        file.write_all(&buf[..n])
            .await
            .map_err(|e| Error::extraction(format!("Writing base layer failed: {}", e)))?;

        if sink_open {
            if let Err(e) = sink.write_all(&buf[..n]).await {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(Error::extraction(format!(
                        "Feeding dovi_tool failed: {}",
                        e
                    )));
                }
                warn!("dovi_tool closed its input early");
                sink_open = false;
            }
        }
        total += n as u64;
    }

    file.flush()
        .await
        .map_err(|e| Error::extraction(format!("Writing base layer failed: {}", e)))?;
    if sink_open {
        // EOF for the consumer
        if let Err(e) = sink.shutdown().await {
            debug!("Closing dovi_tool input: {}", e);
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct HungUp;

    impl AsyncWrite for HungUp {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::from(ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn test_layer_paths() {
        let layers = LayerPaths::in_workspace(Path::new("/w"));
        assert_eq!(layers.base_layer, Path::new("/w/BL.hevc"));
        assert_eq!(layers.rpu, Path::new("/w/RPU.bin"));
        assert_eq!(layers.injected, Path::new("/w/BL_RPU.hevc"));
    }

    #[tokio::test]
    async fn test_tee_copies_to_both() {
        let data: Vec<u8> = (0..3_000_000u32).map(|i| (i % 251) as u8).collect();
        let mut file = Vec::new();
        let mut sink = Vec::new();

        let total = tee(data.as_slice(), &mut file, &mut sink).await.unwrap();

        assert_eq!(total, data.len() as u64);
        assert!(file == data);
        assert!(sink == data);
    }

    #[tokio::test]
    async fn test_tee_survives_closed_consumer() {
        let mut file = Vec::new();
        let total = tee(&b"annexb"[..], &mut file, HungUp).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(file, b"annexb");
    }

    #[cfg(unix)]
    mod fake_tools {
        use super::super::*;
        use crate::config::ThrottleProfile;
        use crate::utils::ToolRunner;
        use pretty_assertions::assert_eq;
        use std::os::unix::fs::PermissionsExt;

        fn runner(dir: &Path, name: &str, body: &str) -> ToolRunner {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            ToolRunner::new(path.to_string_lossy().to_string(), ThrottleProfile::unthrottled())
        }

        const WRITE_STDIN_TO_LAST_ARG: &str = r#"for a in "$@"; do last="$a"; done
cat > "$last""#;

        #[tokio::test]
        async fn test_streamed_extraction() {
            let dir = tempfile::tempdir().unwrap();
            let ffmpeg = FfmpegWrapper::new(
                runner(dir.path(), "ffmpeg", "printf 'annexb-stream'"),
                runner(dir.path(), "ffprobe", "true"),
            );
            let dovi = DoviTool::new(runner(dir.path(), "dovi_tool", WRITE_STDIN_TO_LAST_ARG));
            let layers = LayerPaths::in_workspace(dir.path());

            extract_streamed(&ffmpeg, &dovi, Path::new("in.mkv"), &layers)
                .await
                .unwrap();

            assert_eq!(std::fs::read(&layers.base_layer).unwrap(), b"annexb-stream");
            assert_eq!(std::fs::read(&layers.rpu).unwrap(), b"annexb-stream");
        }

        #[tokio::test]
        async fn test_streamed_producer_failure() {
            let dir = tempfile::tempdir().unwrap();
            let ffmpeg = FfmpegWrapper::new(
                runner(dir.path(), "ffmpeg", "echo 'no video stream' >&2; exit 1"),
                runner(dir.path(), "ffprobe", "true"),
            );
            let dovi = DoviTool::new(runner(dir.path(), "dovi_tool", WRITE_STDIN_TO_LAST_ARG));
            let layers = LayerPaths::in_workspace(dir.path());

            let result = extract_streamed(&ffmpeg, &dovi, Path::new("in.mkv"), &layers).await;
            assert!(matches!(result, Err(Error::Extraction { .. })));
        }

        #[tokio::test]
        async fn test_streamed_consumer_failure() {
            let dir = tempfile::tempdir().unwrap();
            let ffmpeg = FfmpegWrapper::new(
                runner(dir.path(), "ffmpeg", "printf 'annexb-stream'"),
                runner(dir.path(), "ffprobe", "true"),
            );
            let dovi = DoviTool::new(runner(dir.path(), "dovi_tool", "cat > /dev/null; exit 1"));
            let layers = LayerPaths::in_workspace(dir.path());

            let result = extract_streamed(&ffmpeg, &dovi, Path::new("in.mkv"), &layers).await;
            assert!(matches!(result, Err(Error::Metadata { .. })));
        }
    }
}
