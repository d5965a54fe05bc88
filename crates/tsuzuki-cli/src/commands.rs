use std::collections::BTreeSet;
use std::sync::Arc;

use tsuzuki_api::anilist::AniListClient;
use tsuzuki_api::discord::DiscordWebhook;
use tsuzuki_api::qbittorrent::QbitClient;
use tsuzuki_core::config::AppConfig;
use tsuzuki_core::db::DbHandle;
use tsuzuki_core::error::TsuzukiError;
use tsuzuki_core::scheduler::{run_forever, Scheduler, SchedulerSettings, SeriesOutcome};
use tsuzuki_core::torrent::NyaaFeed;

use crate::args::EditArgs;

type Engine = Scheduler<AniListClient, NyaaFeed, QbitClient, Option<DiscordWebhook>>;

fn api_error(e: impl std::fmt::Display) -> TsuzukiError {
    TsuzukiError::Api(e.to_string())
}

fn open_db() -> Result<DbHandle, TsuzukiError> {
    DbHandle::open(&AppConfig::ensure_db_path()?)
}

fn build_engine(config: &AppConfig) -> Result<Engine, TsuzukiError> {
    config.validate()?;
    let proxy = config.general.proxy.as_deref();

    let metadata = AniListClient::new(
        config.anilist.user_name.clone(),
        config.anilist.access_token.clone(),
        proxy,
    )
    .map_err(api_error)?;
    let feed = NyaaFeed::new(proxy)?;

    let qbit = &config.qbittorrent;
    let mut downloader = QbitClient::new(
        &qbit.url,
        qbit.username.clone(),
        qbit.password.clone(),
        qbit.root_dir.clone(),
    )
    .map_err(api_error)?;
    if let Some(mirror) = &qbit.link_mirror {
        downloader = downloader.with_link_mirror(qbit.mirror_source_host.clone(), mirror.clone());
    }

    let notifier = config
        .notify
        .discord_webhook
        .as_deref()
        .map(|url| DiscordWebhook::new(url, config.notify.username.clone()))
        .transpose()
        .map_err(api_error)?;

    let settings = SchedulerSettings::from_config(config)?;
    Ok(Scheduler::new(
        metadata,
        feed,
        downloader,
        notifier,
        open_db()?,
        settings,
    ))
}

pub async fn run(config: AppConfig) -> Result<(), TsuzukiError> {
    let engine = Arc::new(build_engine(&config)?);
    tracing::info!(
        user = %config.anilist.user_name,
        every_minutes = config.general.check_interval_minutes,
        "tsuzuki started"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    run_forever(
        engine,
        config.check_interval(),
        config.reset_interval(),
        shutdown,
    )
    .await;
    Ok(())
}

pub async fn check(config: AppConfig) -> Result<(), TsuzukiError> {
    let engine = build_engine(&config)?;
    let report = engine.run_cycle().await.map_err(api_error)?;

    for series in &report.series {
        println!(
            "{:>8}  {:<48}  {}",
            series.media_id,
            series.title,
            describe(&series.outcome)
        );
    }
    println!(
        "{} series checked, {} episodes sent to qBittorrent",
        report.series.len(),
        report.downloaded_count()
    );
    Ok(())
}

pub async fn list() -> Result<(), TsuzukiError> {
    let db = open_db()?;
    let records = db.all_series().await?;
    if records.is_empty() {
        println!("no tracked series");
        return Ok(());
    }

    for record in records {
        let mut line = format!(
            "{:>8}  {:<48}  eps [{}]",
            record.media_id,
            record.title,
            episode_summary(&record.downloaded)
        );
        if record.starting_episode > 0 {
            line.push_str(&format!("  offset {}", record.starting_episode));
        }
        if let Some(alt) = &record.alternative_title {
            line.push_str(&format!("  as \"{alt}\""));
        }
        let updated = record.updated_at.with_timezone(&chrono::Local);
        line.push_str(&format!("  {}", updated.format("%Y-%m-%d %H:%M")));
        println!("{line}");
    }
    Ok(())
}

pub async fn edit(args: EditArgs) -> Result<(), TsuzukiError> {
    if args.starting_episode.is_none() && args.alt_title.is_none() && !args.clear_alt_title {
        println!("nothing to change");
        return Ok(());
    }

    let db = open_db()?;
    let not_tracked = || TsuzukiError::Database(format!("series {} is not tracked", args.media_id));

    if let Some(episode) = args.starting_episode {
        if !db.set_starting_episode(args.media_id, episode).await? {
            return Err(not_tracked());
        }
        println!("starting episode set to {episode}");
    }
    if args.alt_title.is_some() || args.clear_alt_title {
        let title = args.alt_title.clone().filter(|t| !t.trim().is_empty());
        if !db.set_alternative_title(args.media_id, title.clone()).await? {
            return Err(not_tracked());
        }
        match title {
            Some(title) => println!("searching as \"{title}\""),
            None => println!("alternative title cleared"),
        }
    }
    Ok(())
}

pub async fn forget(media_id: u64) -> Result<(), TsuzukiError> {
    let db = open_db()?;
    if db.delete_series(media_id).await? {
        println!("forgot series {media_id}");
        Ok(())
    } else {
        Err(TsuzukiError::Database(format!(
            "series {media_id} is not tracked"
        )))
    }
}

fn describe(outcome: &SeriesOutcome) -> String {
    match outcome {
        SeriesOutcome::UpToDate => "up to date".into(),
        SeriesOutcome::BackingOff { remaining } => format!("backing off, {remaining} cycles left"),
        SeriesOutcome::Downloaded { episodes } => {
            let set: BTreeSet<u32> = episodes.iter().copied().collect();
            format!("downloading {}", episode_summary(&set))
        }
        SeriesOutcome::NotFound { retry_in } => format!("not found, retry in {retry_in} cycles"),
        SeriesOutcome::Skipped { reason } => format!("skipped: {reason}"),
    }
}

/// `1-3, 5, 7-8`.
fn episode_summary(episodes: &BTreeSet<u32>) -> String {
    let mut parts = Vec::new();
    let mut iter = episodes.iter().copied();
    let Some(mut first) = iter.next() else {
        return String::new();
    };
    let mut last = first;

    for ep in iter {
        if ep == last + 1 {
            last = ep;
            continue;
        }
        parts.push(span(first, last));
        first = ep;
        last = ep;
    }
    parts.push(span(first, last));
    parts.join(", ")
}

fn span(first: u32, last: u32) -> String {
    if first == last {
        first.to_string()
    } else {
        format!("{first}-{last}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_summary() {
        let set = |eps: &[u32]| eps.iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(episode_summary(&set(&[])), "");
        assert_eq!(episode_summary(&set(&[4])), "4");
        assert_eq!(episode_summary(&set(&[1, 2, 3, 5, 7, 8])), "1-3, 5, 7-8");
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&SeriesOutcome::Downloaded {
                episodes: vec![2, 1, 3]
            }),
            "downloading 1-3"
        );
        assert_eq!(
            describe(&SeriesOutcome::NotFound { retry_in: 4 }),
            "not found, retry in 4 cycles"
        );
    }
}
