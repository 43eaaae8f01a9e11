//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use timetable_sync::adapters::curricula::{HttpCurriculaSource, StaticCurricula};
use timetable_sync::adapters::http::{FixtureHttpClient, ReqwestHttpClient};
use timetable_sync::adapters::persistence::JsonFetchCache;
use timetable_sync::adapters::ui::{BatchInputPort, TuiInputPort};
use timetable_sync::ports::{CurriculaPort, FetchCachePort, HttpPort, InputPort};
use timetable_sync::shared::config::AppConfig;
use timetable_sync::usecases::{
    ChangeTracker, SessionRequest, SessionService, TimetableFetcher, TimetableService,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config not loaded, using defaults");
            AppConfig::default()
        }
    };
    let interactive = cfg.interactive_or_default();
    if interactive {
        timetable_sync::adapters::ui::init_ui();
    }

    // --- HTTP: live client, or replay from a fixture manifest ---
    let timeout = Duration::from_secs(cfg.request_timeout_secs_or_default());
    let http: Arc<dyn HttpPort> = match cfg.fixture_manifest.as_deref() {
        Some(manifest) => {
            info!(manifest, "replaying HTTP from fixtures");
            Arc::new(
                FixtureHttpClient::from_manifest(manifest)
                    .await
                    .map_err(|e| anyhow::anyhow!("{}", e))?,
            )
        }
        None => Arc::new(ReqwestHttpClient::new(timeout).map_err(|e| anyhow::anyhow!("{}", e))?),
    };

    // --- Fetch cache (change detection across runs) ---
    let data_path = cfg.data_dir_or_default();
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), "data directory");
    let cache_impl = JsonFetchCache::new(cfg.cache_path());
    cache_impl
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let cache: Arc<dyn FetchCachePort> = Arc::new(cache_impl);

    // --- Curricula: from config when listed, otherwise from the course site ---
    let configured = cfg
        .curricula_or_default()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let curricula: Arc<dyn CurriculaPort> = if configured.is_empty() {
        Arc::new(HttpCurriculaSource::new(Arc::clone(&http)))
    } else {
        info!(count = configured.len(), "using configured curricula");
        Arc::new(StaticCurricula::new(configured.clone()))
    };

    // --- Services ---
    let fetcher = TimetableFetcher::new(Arc::clone(&http)).with_request_timeout(timeout);
    let timetables = Arc::new(TimetableService::with_fetcher(fetcher));
    let session = Arc::new(SessionService::new(
        timetables,
        curricula,
        Some(ChangeTracker::new(cache)),
    ));

    let years = cfg.years_or_default().map_err(|e| anyhow::anyhow!("{}", e))?;
    if let Some(kind) = cfg.course_kind() {
        info!(kind = ?kind, years = ?years, "course configured");
    }
    let max_year = years
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .max(cfg.course_duration_or_default());
    let request = SessionRequest {
        course_site_url: cfg.course_site_url().unwrap_or_default(),
        curricula: configured,
        years,
        widen: cfg.widen_range_or_default(),
        reference: cfg.reference_date(),
        group: cfg.group.clone(),
        export_csv: cfg.export_csv.as_deref().map(PathBuf::from),
    };

    let input_port: Arc<dyn InputPort> = if interactive {
        Arc::new(TuiInputPort::new(session, request, max_year))
    } else {
        if request.course_site_url.is_empty() {
            anyhow::bail!("Set TIMETABLE_SYNC_COURSE_SITE_URL (env or .env) for batch runs");
        }
        Arc::new(BatchInputPort::new(session, request))
    };

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
