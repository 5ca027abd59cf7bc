use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StripConfig;
use crate::events::CompletedSession;
use crate::processing::compose::compose_strip;

/// Files written for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSession {
    pub shots: Vec<PathBuf>,
    pub strip: PathBuf,
}

/// Writes finished sessions to `output_dir` until the booth hangs up.
pub async fn run(
    mut sessions: Receiver<CompletedSession>,
    output_dir: PathBuf,
    strip: StripConfig,
    ratio: f64,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let session = select! {
            _ = cancel.cancelled() => {
                // flush what the booth already handed over
                match sessions.try_recv() {
                    Ok(session) => session,
                    Err(_) => break,
                }
            }
            maybe = sessions.recv() => match maybe {
                Some(session) => session,
                None => break,
            },
        };
        let filter = session.filter;
        let dir = output_dir.clone();
        let strip = strip.clone();
        let saved = tokio::task::spawn_blocking(move || save_session(&dir, &session, &strip, ratio))
            .await
            .context("saver worker panicked")?;
        match saved {
            Ok(saved) => info!(
                %filter,
                shots = saved.shots.len(),
                strip = %saved.strip.display(),
                "session saved"
            ),
            Err(err) => warn!(%filter, "failed to save session: {err:?}"),
        }
    }
    debug!("saver stopped");
    Ok(())
}

/// Encode every shot and the composed strip as PNG. Blocking.
pub fn save_session(
    output_dir: &Path,
    session: &CompletedSession,
    strip: &StripConfig,
    ratio: f64,
) -> Result<SavedSession> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let stamp = session.started_at.format("%Y%m%d_%H%M%S");

    let mut shots = Vec::with_capacity(session.shots.len());
    for (n, shot) in session.shots.iter().enumerate() {
        let path = output_dir.join(format!("photobooth_{stamp}_{}.png", n + 1));
        shot.save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "shot written");
        shots.push(path);
    }

    let sheet = compose_strip(&session.shots, strip, ratio, session.started_at.date_naive());
    let strip_path = output_dir.join(format!("photobooth_{stamp}_strip.png"));
    sheet
        .save(&strip_path)
        .with_context(|| format!("failed to write {}", strip_path.display()))?;

    Ok(SavedSession {
        shots,
        strip: strip_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterKind;
    use chrono::{Local, TimeZone};
    use image::RgbaImage;

    #[test]
    fn writes_numbered_shots_and_strip() {
        let dir = tempfile::tempdir().unwrap();
        let started_at = Local.with_ymd_and_hms(2024, 5, 1, 14, 30, 5).unwrap();
        let session = CompletedSession {
            started_at,
            filter: FilterKind::CameraView,
            shots: vec![RgbaImage::new(30, 20), RgbaImage::new(30, 20)],
        };
        let saved = save_session(dir.path(), &session, &StripConfig::default(), 1.5).unwrap();
        assert_eq!(saved.shots.len(), 2);
        assert!(
            saved.shots[1]
                .ends_with("photobooth_20240501_143005_2.png")
        );
        assert!(saved.strip.ends_with("photobooth_20240501_143005_strip.png"));
        assert!(saved.strip.exists());
        let sheet = image::open(&saved.strip).unwrap();
        assert!(sheet.width() > 30);
    }
}
