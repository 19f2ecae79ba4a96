use anyhow::Result;
use time::Duration as DateDuration;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::core::time::today_utc;
use crate::repositories;
use crate::services::attendance::{self, StudentRef};

/// Worker entry point: sweep absentee alerts per active school on a fixed
/// interval until a shutdown signal arrives. Alerts stay derived; the sweep
/// logs and counts them, it never persists them.
pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep = tokio::spawn(absentee_sweep_loop(state.clone(), shutdown_rx));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    if let Err(err) = sweep.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn absentee_sweep_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().attendance().sweep_interval_seconds);
    let mut ticker = interval(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        if *shutdown.borrow() {
            break;
        }

        if let Err(err) = sweep_all_schools(&state).await {
            tracing::error!(error = %err, "Absentee sweep failed");
        }
    }
}

async fn sweep_all_schools(state: &AppState) -> Result<()> {
    let schools = repositories::schools::list_active(state.db()).await?;

    for school in schools {
        let alerts = sweep_school(state, &school.id).await?;
        if alerts > 0 {
            metrics::counter!("absentee_alerts_total").increment(alerts as u64);
        }
    }

    Ok(())
}

async fn sweep_school(state: &AppState, school_id: &str) -> Result<usize> {
    let settings = state.settings().attendance();
    let today = today_utc();
    let window_start = today - DateDuration::days(settings.alert_window_days);

    let rows = repositories::attendance::list_for_school(
        state.db(),
        school_id,
        Some(window_start),
        Some(today),
    )
    .await?;
    let profiles = repositories::student_profiles::list_for_school(state.db(), school_id).await?;

    let sessions = attendance::group_sessions(&rows, &profiles, settings.marker_policy);

    let user_ids: Vec<String> = profiles.iter().map(|profile| profile.user_id.clone()).collect();
    let users = repositories::users::list_by_ids(state.db(), &user_ids).await?;
    let names: std::collections::HashMap<String, String> =
        users.into_iter().map(|user| (user.id, user.full_name)).collect();

    let students: Vec<StudentRef> = profiles
        .iter()
        .map(|profile| StudentRef {
            user_id: profile.user_id.clone(),
            full_name: names.get(&profile.user_id).cloned().unwrap_or_default(),
            class_name: profile.class_name.clone(),
            section: profile.section.clone(),
        })
        .collect();

    let alerts = attendance::absentee_alerts(
        &sessions,
        &students,
        today,
        settings.alert_window_days,
        settings.alert_threshold,
    );

    for alert in &alerts {
        tracing::warn!(
            school_id,
            user_id = alert.student.user_id,
            full_name = alert.student.full_name,
            class_name = alert.student.class_name,
            section = alert.student.section,
            absent_days = alert.absent_days,
            last_absent = %alert.last_absent,
            "Student flagged by absentee sweep"
        );
    }

    Ok(alerts.len())
}
