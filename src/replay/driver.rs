//! Event driver for fixture replays.

use tracing::{debug, info};

use super::{StaticEngine, TaskKind};
use crate::error::{Error, Result};
use crate::traits::{RunCallback, RunStats};

/// Replay every play of the engine's fixture through `callback`.
///
/// Event order matches a live linear run: play start, then for each task a
/// task start followed by one runner start per play host, after which the
/// task's facts are applied. Notified handlers follow the play's tasks.
/// Run complete is delivered last, with the summary it returns.
pub async fn replay(engine: &StaticEngine, callback: &dyn RunCallback) -> Result<RunStats> {
    let fixture = engine.fixture();
    let mut stats = RunStats {
        hosts: fixture.host_names(),
        ..Default::default()
    };

    for (play_index, play) in fixture.plays.iter().enumerate() {
        let context = engine.play_context(play_index)?;
        let hosts = fixture.play_hosts(play);
        info!(play = %play.name, hosts = hosts.len(), "Replaying play");

        callback.on_play_start(&context).await?;
        stats.plays += 1;

        let mut notified: Vec<&str> = Vec::new();
        for (index, task) in play.tasks.iter().enumerate() {
            let id = engine
                .task_id(play_index, TaskKind::Task, index)
                .ok_or_else(|| Error::TaskNotFound(task.name.clone()))?;

            callback.on_task_start(&id, task.is_conditional()).await?;
            stats.tasks += 1;

            for host in &hosts {
                callback.on_runner_start(host, &id).await?;
            }

            if !task.runs() {
                debug!(task = %task.name, "Conditional false, skipped");
                continue;
            }
            for host in &hosts {
                engine.apply_facts(host, &task.set_facts);
            }
            for handler in &task.notify {
                if !notified.contains(&handler.as_str()) {
                    notified.push(handler);
                }
            }
        }

        for (index, handler) in play.handlers.iter().enumerate() {
            if !notified.contains(&handler.name.as_str()) {
                continue;
            }
            let id = engine
                .task_id(play_index, TaskKind::Handler, index)
                .ok_or_else(|| Error::TaskNotFound(handler.name.clone()))?;

            callback.on_handler_task_start(&id).await?;
            stats.handlers += 1;

            for host in &hosts {
                callback.on_runner_start(host, &id).await?;
            }
            if handler.runs() {
                for host in &hosts {
                    engine.apply_facts(host, &handler.set_facts);
                }
            }
        }
    }

    callback.on_run_complete(&stats).await?;
    Ok(stats)
}
