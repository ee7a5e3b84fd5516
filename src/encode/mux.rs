use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::encode::ffmpeg::{ensure_parent_dir, is_ffmpeg_on_path};
use crate::foundation::core::CancelFlag;
use crate::foundation::error::{LyricframeError, LyricframeResult};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Fixed codec settings for the final audio/video mux.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MuxOpts {
    /// Video codec.
    pub video_codec: String,
    /// Encoder preset.
    pub preset: String,
    /// Constant rate factor.
    pub crf: u8,
    /// Audio codec.
    pub audio_codec: String,
    /// Audio bitrate, ffmpeg syntax.
    pub audio_bitrate: String,
    /// Stop at the end of the shorter input.
    pub shortest: bool,
    /// Overwrite an existing output file.
    pub overwrite: bool,
}

impl Default for MuxOpts {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            shortest: true,
            overwrite: true,
        }
    }
}

impl MuxOpts {
    /// ffmpeg arguments combining `video` and `audio` into `out`.
    pub fn args(&self, video: &Path, audio: &Path, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            (if self.overwrite { "-y" } else { "-n" }).into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            video.into(),
            "-i".into(),
            audio.into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:v".into(),
            self.video_codec.clone().into(),
            "-preset".into(),
            self.preset.clone().into(),
            "-crf".into(),
            self.crf.to_string().into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            self.audio_codec.clone().into(),
            "-b:a".into(),
            self.audio_bitrate.clone().into(),
        ];
        if self.shortest {
            args.push("-shortest".into());
        }
        args.push("-movflags".into());
        args.push("+faststart".into());
        args.push(out.into());
        args
    }
}

/// Mux the silent `video` with `audio` into `out`, re-encoding both.
///
/// Blocks until ffmpeg exits. When `cancel` fires the child is killed and
/// [`LyricframeError::Cancelled`] is returned. Failures carry the intermediate path so callers can
/// leave it in place.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(video = %video.display(), out = %out.display())
)]
pub fn mux_audio(
    video: &Path,
    audio: &Path,
    out: &Path,
    opts: &MuxOpts,
    cancel: Option<&CancelFlag>,
) -> LyricframeResult<()> {
    let fail = |msg: String| LyricframeError::encoding(msg, video.to_path_buf());

    if !is_ffmpeg_on_path() {
        return Err(fail(
            "ffmpeg is required for muxing, but was not found on PATH".to_string(),
        ));
    }
    ensure_parent_dir(out)?;

    let mut child = Command::new("ffmpeg")
        .args(opts.args(video, audio, out))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| fail(format!("failed to spawn ffmpeg: {e}")))?;

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| fail("failed to open ffmpeg stderr (unexpected)".to_string()))?;
    let stderr_drain = std::thread::spawn(move || {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf)?;
        Ok::<_, std::io::Error>(buf)
    });

    let status = loop {
        if cancel.is_some_and(CancelFlag::is_cancelled) {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stderr_drain.join();
            let _ = std::fs::remove_file(out);
            tracing::info!("mux cancelled");
            return Err(LyricframeError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(CANCEL_POLL_INTERVAL),
            Err(e) => return Err(fail(format!("failed to wait for ffmpeg: {e}"))),
        }
    };

    let stderr_bytes = stderr_drain
        .join()
        .map_err(|_| fail("ffmpeg stderr drain thread panicked".to_string()))?
        .unwrap_or_default();
    if !status.success() {
        return Err(fail(format!(
            "ffmpeg exited with status {}: {}",
            status,
            String::from_utf8_lossy(&stderr_bytes).trim()
        )));
    }

    let len = std::fs::metadata(out).map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        return Err(fail(format!(
            "ffmpeg reported success but '{}' is missing or empty",
            out.display()
        )));
    }
    Ok(())
}

/// Container duration of a media file in seconds, via `ffprobe`.
pub fn probe_duration_secs(path: &Path) -> LyricframeResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: ProbeFormat,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| LyricframeError::asset_unavailable(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(LyricframeError::asset_unavailable(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| LyricframeError::serde(format!("ffprobe json parse failed: {e}")))?;
    parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| {
            LyricframeError::asset_unavailable(format!(
                "ffprobe reported no duration for '{}'",
                path.display()
            ))
        })
}

/// Silent intermediate path for `out`: `<stem>.silent.mp4` in the same directory.
pub fn intermediate_path_for(out: &Path) -> PathBuf {
    out.with_extension("silent.mp4")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/mux.rs"]
mod tests;
