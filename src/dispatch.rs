//! Delivery of new music to one account: playlist mutations, then email.
//!
//! Playlist changes and the notification are not transactional. A failed
//! email never undoes tracks already added.

use std::collections::BTreeMap;

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use reqwest::StatusCode;
use thiserror::Error;

use crate::{
    config::SmtpConfig,
    fetch::FetchError,
    management::Account,
    spotify::playlist::ADD_TRACKS_LIMIT,
    types::ReleaseKind,
    utils, warning,
};

pub const EMAIL_SUBJECT: &str = "New music on Spotify";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("playlist {0} no longer exists")]
    PlaylistMissing(String),
    #[error("playlist request failed: {0}")]
    Playlist(String),
    #[error("email delivery failed: {0}")]
    Email(String),
}

impl DispatchError {
    /// Classifies a failed playlist mutation. 404 and 403 mean the playlist
    /// was deleted (or unfollowed) on the account.
    pub fn from_playlist_mutation(playlist_id: &str, err: FetchError) -> Self {
        match &err {
            FetchError::Http(e)
                if matches!(e.status(), Some(StatusCode::NOT_FOUND | StatusCode::FORBIDDEN)) =>
            {
                DispatchError::PlaylistMissing(playlist_id.to_string())
            }
            _ => DispatchError::Playlist(err.to_string()),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait PlaylistService {
    /// Creates the new music playlist on `user`'s account and returns its id.
    async fn create_playlist(&mut self, user: &str) -> Result<String, DispatchError>;

    async fn append_tracks(
        &mut self,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), DispatchError>;
}

#[allow(async_fn_in_trait)]
pub trait Mailer {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body_text: &str,
        body_html: &str,
    ) -> Result<(), DispatchError>;
}

/// A new release waiting to be delivered to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRelease {
    pub artist_id: String,
    pub artist_name: String,
    pub release_id: String,
    pub name: String,
    pub kind: ReleaseKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Releases whose tracks are now in the playlist.
    pub delivered: Vec<String>,
    /// Releases without known tracks.
    pub skipped: Vec<String>,
    pub tracks_added: usize,
    pub playlist_recreated: bool,
    pub emailed: bool,
}

/// Adds the tracks of `releases` to the account's playlist and notifies it.
///
/// The playlist is created first when the account has none. When a mutation
/// reports the playlist missing, it is recreated once and all pending tracks
/// are added again; a second failure is returned. The account's playlist id
/// is updated in place.
pub async fn deliver_to_account<P: PlaylistService, M: Mailer>(
    user: &str,
    account: &mut Account,
    releases: &[PendingRelease],
    tracks: &BTreeMap<String, Vec<String>>,
    playlists: &mut P,
    mailer: Option<&M>,
) -> Result<DeliveryReport, DispatchError> {
    let mut report = DeliveryReport::default();
    let mut uris: Vec<String> = Vec::new();
    let mut delivered_releases: Vec<&PendingRelease> = Vec::new();

    for release in releases {
        match tracks.get(&release.release_id) {
            Some(release_tracks) if !release_tracks.is_empty() => {
                uris.extend(release_tracks.iter().cloned());
                report.delivered.push(release.release_id.clone());
                delivered_releases.push(release);
            }
            _ => {
                warning!(
                    "No tracks found for {} by {}, skipping it.",
                    release.name,
                    release.artist_name
                );
                report.skipped.push(release.release_id.clone());
            }
        }
    }

    if uris.is_empty() {
        return Ok(report);
    }

    let playlist_id = match &account.playlist_id {
        Some(id) => id.clone(),
        None => {
            let id = playlists.create_playlist(user).await?;
            account.playlist_id = Some(id.clone());
            id
        }
    };

    let playlist_id = match append_all(playlists, &playlist_id, &uris).await {
        Ok(()) => playlist_id,
        Err(DispatchError::PlaylistMissing(_)) => {
            warning!(
                "Playlist {} of {} is gone, creating a new one.",
                playlist_id,
                user
            );
            let id = playlists.create_playlist(user).await?;
            account.playlist_id = Some(id.clone());
            report.playlist_recreated = true;
            append_all(playlists, &id, &uris).await?;
            id
        }
        Err(e) => return Err(e),
    };
    report.tracks_added = uris.len();

    if let Some(mailer) = mailer {
        if !account.email.is_empty() {
            let link = utils::playlist_link(&playlist_id);
            let text = email_text(&link, &delivered_releases);
            let html = email_html(&link, &delivered_releases);
            match mailer
                .send_email(&account.email, EMAIL_SUBJECT, &text, &html)
                .await
            {
                Ok(()) => report.emailed = true,
                Err(e) => warning!("Cannot notify {}. Err: {}", user, e),
            }
        }
    }

    Ok(report)
}

async fn append_all<P: PlaylistService>(
    playlists: &mut P,
    playlist_id: &str,
    uris: &[String],
) -> Result<(), DispatchError> {
    for chunk in uris.chunks(ADD_TRACKS_LIMIT) {
        playlists.append_tracks(playlist_id, chunk).await?;
    }
    Ok(())
}

pub fn email_text(playlist_link: &str, releases: &[&PendingRelease]) -> String {
    let mut text = String::from(
        "We've detected new music!\nCheck it out in your New Music playlist on Spotify:\n",
    );
    text.push_str(playlist_link);
    text.push_str("\n\n");
    for release in releases {
        text.push_str(&format!(
            "- {} - {} ({})\n",
            release.artist_name, release.name, release.kind
        ));
    }
    text
}

pub fn email_html(playlist_link: &str, releases: &[&PendingRelease]) -> String {
    let items: String = releases
        .iter()
        .map(|release| {
            format!(
                "<li>{} - {} ({})</li>",
                escape_html(&release.artist_name),
                escape_html(&release.name),
                release.kind
            )
        })
        .collect();

    format!(
        "<html>\n  <body>\n    <p>We've detected new music!<br>\n    Check it out in your <a href=\"{link}\">New Music playlist</a></p>\n    <ul>{items}</ul>\n  </body>\n</html>\n",
        link = escape_html(playlist_link),
        items = items
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Sends notifications through an SMTPS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, DispatchError> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|e| DispatchError::Email(format!("invalid sender address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| DispatchError::Email(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, sender })
    }
}

impl Mailer for SmtpMailer {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body_text: &str,
        body_html: &str,
    ) -> Result<(), DispatchError> {
        let receiver: Mailbox = to
            .parse()
            .map_err(|e| DispatchError::Email(format!("invalid address {to}: {e}")))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(receiver)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                body_text.to_string(),
                body_html.to_string(),
            ))
            .map_err(|e| DispatchError::Email(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DispatchError::Email(e.to_string()))?;
        Ok(())
    }
}
