//! The capability set every debrid backend implements.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::poll::{Poller, Polled, Probe};
use super::{
    AddedTorrent, FileCandidate, ProviderError, ProviderKind, ResolutionError, TorrentSnapshot,
    TorrentStatus,
};
use crate::metrics;

/// One debrid backend's add/poll/select/unrestrict protocol.
///
/// Ranking and file selection are shared and live outside this trait;
/// implementations only speak the provider's wire protocol. API keys are
/// passed per call since they may come from the request.
#[async_trait]
pub trait DebridProvider: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> ProviderKind;

    /// Budget used while waiting for the file list.
    fn hydration(&self) -> &Poller;

    /// Ids of files the provider reports as instantly available.
    ///
    /// `Ok(None)` means the provider cannot tell per-file availability and
    /// no penalty should be applied.
    async fn check_availability(
        &self,
        api_key: &str,
        info_hash: &str,
    ) -> Result<Option<HashSet<String>>, ProviderError>;

    /// Submit a magnet and return the provider's torrent id.
    async fn add_source(&self, api_key: &str, magnet: &str)
        -> Result<AddedTorrent, ProviderError>;

    /// Fetch the current status and file list of a torrent.
    async fn list_files(
        &self,
        api_key: &str,
        torrent_id: &str,
    ) -> Result<TorrentSnapshot, ProviderError>;

    /// Wait until the torrent has a non-empty file list.
    ///
    /// A file list embedded in the add response is used as-is. Transport
    /// errors while polling count as a pending attempt.
    async fn poll_until_ready(
        &self,
        api_key: &str,
        added: AddedTorrent,
    ) -> Result<TorrentSnapshot, ResolutionError> {
        let kind = self.kind();

        if let Some(snapshot) = added.snapshot {
            if snapshot.status == TorrentStatus::Failed {
                return Err(ResolutionError::AddFailed(format!(
                    "provider reported status '{}'",
                    snapshot.raw_status
                )));
            }
            if !snapshot.files.is_empty() {
                debug!(provider = %kind, torrent_id = %snapshot.torrent_id, "File list embedded in add response");
                return Ok(snapshot);
            }
        }

        let torrent_id = added.torrent_id.as_str();
        let polled = self
            .hydration()
            .poll(move |attempt| async move {
                match self.list_files(api_key, torrent_id).await {
                    Ok(snapshot) if snapshot.status == TorrentStatus::Failed => {
                        Err(ResolutionError::AddFailed(format!(
                            "provider reported status '{}'",
                            snapshot.raw_status
                        )))
                    }
                    Ok(snapshot) if !snapshot.files.is_empty() => Ok(Probe::Ready(snapshot)),
                    Ok(snapshot) => {
                        debug!(
                            provider = %kind,
                            torrent_id,
                            attempt,
                            status = %snapshot.raw_status,
                            "File list not available yet"
                        );
                        Ok(Probe::Pending)
                    }
                    Err(e) => {
                        warn!(provider = %kind, torrent_id, attempt, error = %e, "Status poll failed");
                        Ok(Probe::Pending)
                    }
                }
            })
            .await?;

        match polled {
            Polled::Ready { value, attempts } => {
                metrics::HYDRATION_ATTEMPTS
                    .with_label_values(&[kind.as_str()])
                    .observe(attempts as f64);
                Ok(value)
            }
            Polled::Exhausted { attempts } => {
                metrics::HYDRATION_ATTEMPTS
                    .with_label_values(&[kind.as_str()])
                    .observe(attempts as f64);
                Err(ResolutionError::HydrationTimeout { attempts })
            }
        }
    }

    /// Mark a file for download, for providers that need explicit selection.
    async fn select_file(
        &self,
        _api_key: &str,
        _snapshot: &TorrentSnapshot,
        _file: &FileCandidate,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Produce the final direct URL for the selected file.
    async fn finalize_link(
        &self,
        api_key: &str,
        snapshot: &TorrentSnapshot,
        file: &FileCandidate,
    ) -> Result<String, ResolutionError>;
}
