// src/watch/event_handler.rs

//! Turns one changed path into runtime events.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::registry::TaskName;
use crate::watch::cache::FileCache;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchRule;

/// Process a single filesystem change.
///
/// 1. Relativise the path and find the watch rules matching it.
/// 2. Drop the event if the file content is unchanged since it was last seen.
/// 3. Trigger the union of the matching rules' tasks, in rule order.
/// 4. If a matching rule has `reload = true`, request a reload of the path.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    path: &Path,
    rules: &[WatchRule],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    cache: Arc<Mutex<FileCache>>,
) -> bool {
    let Some(rel) = relative_str(root, path) else {
        warn!("could not relativize path {:?} against root {:?}", path, root);
        return true;
    };

    let matching: Vec<&WatchRule> = rules.iter().filter(|r| r.matches(&rel)).collect();
    if matching.is_empty() {
        return true;
    }

    if !content_changed(fs, path, cache).await {
        debug!(path = %rel, "content unchanged; ignoring event");
        return true;
    }

    let mut tasks: Vec<&TaskName> = Vec::new();
    for rule in &matching {
        for task in rule.tasks() {
            if !tasks.contains(&task) {
                tasks.push(task);
            }
        }
    }

    for task in tasks {
        debug!(task = %task, path = %rel, "watch match -> triggering task");
        let event = RuntimeEvent::TaskTriggered {
            task: task.clone(),
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    if matching.iter().any(|r| r.reload()) {
        debug!(path = %rel, "watch match -> reload");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::ReloadRequested { paths: vec![rel] })
            .await
        {
            warn!("failed to send RuntimeEvent::ReloadRequested: {err}");
            return false;
        }
    }

    true
}

/// Compare the file's hash against the cache. A removed file is a change if
/// it was known before.
async fn content_changed(fs: Arc<dyn FileSystem>, path: &Path, cache: Arc<Mutex<FileCache>>) -> bool {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let mut cache = match cache.lock() {
            Ok(g) => g,
            Err(_) => {
                warn!("file cache mutex poisoned; triggering anyway");
                return true;
            }
        };

        if !fs.exists(&path) {
            return cache.forget(&path);
        }
        if fs.is_dir(&path) {
            return false;
        }

        match cache.observe(fs.as_ref(), &path) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(file = ?path, error = %err, "failed to hash changed file; triggering anyway");
                true
            }
        }
    })
    .await
    .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn rules() -> Vec<WatchRule> {
        vec![
            WatchRule::new(["static/less/**/*.less"], &[], ["less"], false).unwrap(),
            WatchRule::new(["static/**/*"], &["static/dist/**".to_string()], ["less", "js"], false).unwrap(),
            WatchRule::new(["templates/**/*.html"], &[], Vec::<String>::new(), true).unwrap(),
        ]
    }

    fn drain(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<RuntimeEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn triggered(events: &[RuntimeEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                RuntimeEvent::TaskTriggered { task, .. } => Some(task.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn triggers_union_of_matching_rules_once_per_content() {
        let mock = MockFileSystem::new();
        mock.add_file("root/static/less/site.less", "@a: 1;");
        let fs: Arc<dyn FileSystem> = Arc::new(mock.clone());
        let cache = Arc::new(Mutex::new(FileCache::new()));
        let (tx, mut rx) = mpsc::channel(16);
        let path = Path::new("root/static/less/site.less");

        assert!(process_file_change(fs.clone(), Path::new("root"), path, &rules(), &tx, cache.clone()).await);
        assert_eq!(triggered(&drain(&mut rx)), vec!["less", "js"]);

        // Same bytes again: nothing.
        process_file_change(fs.clone(), Path::new("root"), path, &rules(), &tx, cache.clone()).await;
        assert!(drain(&mut rx).is_empty());

        mock.add_file("root/static/less/site.less", "@a: 2;");
        process_file_change(fs, Path::new("root"), path, &rules(), &tx, cache).await;
        assert_eq!(triggered(&drain(&mut rx)), vec!["less", "js"]);
    }

    #[tokio::test]
    async fn excluded_and_unmatched_paths_are_ignored() {
        let mock = MockFileSystem::new();
        mock.add_file("root/static/dist/site.css", "a{}");
        mock.add_file("root/README.md", "hi");
        let fs: Arc<dyn FileSystem> = Arc::new(mock);
        let cache = Arc::new(Mutex::new(FileCache::new()));
        let (tx, mut rx) = mpsc::channel(16);

        for p in ["root/static/dist/site.css", "root/README.md"] {
            process_file_change(fs.clone(), Path::new("root"), Path::new(p), &rules(), &tx, cache.clone()).await;
        }
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn reload_rules_request_a_reload_of_the_path() {
        let mock = MockFileSystem::new();
        mock.add_file("root/templates/index.html", "<p>");
        let fs: Arc<dyn FileSystem> = Arc::new(mock.clone());
        let cache = Arc::new(Mutex::new(FileCache::new()));
        let (tx, mut rx) = mpsc::channel(16);
        let path = Path::new("root/templates/index.html");

        process_file_change(fs.clone(), Path::new("root"), path, &rules(), &tx, cache.clone()).await;
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            RuntimeEvent::ReloadRequested { paths } if paths == &vec!["templates/index.html".to_string()]
        ));

        // Removing a known file is a change too.
        mock.remove_file("root/templates/index.html");
        process_file_change(fs, Path::new("root"), path, &rules(), &tx, cache).await;
        assert_eq!(drain(&mut rx).len(), 1);
    }
}
