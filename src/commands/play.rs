use super::build_launcher;
use colored::Colorize;
use quantum_launcher::config::LauncherConfig;
use quantum_launcher::launcher::ChainState;
use quantum_launcher::paths::LauncherPaths;
use quantum_launcher::version;

pub async fn play(
    paths: LauncherPaths,
    config: LauncherConfig,
    requested: Option<&str>,
) -> anyhow::Result<()> {
    let mut launcher = build_launcher(paths, config)?;
    launcher.refresh_versions().await;

    if let Some(id) = requested {
        let selection = launcher.select(id).map(|v| v.id.clone());
        if let Err(e) = selection {
            let known: Vec<_> = launcher.entries().iter().map(|e| e.version.clone()).collect();
            if let Some(suggestion) = version::suggest(id, &known) {
                eprintln!("{} Did you mean {}?", "?".yellow(), suggestion.cyan());
            }
            return Err(e.into());
        }
    }

    let Some(selected) = launcher.selected().cloned() else {
        anyhow::bail!("No versions available");
    };
    println!("{} {}", "==>".bold().cyan(), selected.display_name.bold());

    match launcher.primary_action().await? {
        ChainState::Failed(label) => {
            launcher.handle_close().await;
            anyhow::bail!(label);
        }
        ChainState::Running => {}
        other => tracing::debug!("Primary action ended in {:?}", other),
    }

    println!(
        "{} Game running (pid {}); press Ctrl-C to stop",
        "✓".green(),
        launcher.supervisor().pid().unwrap_or_default()
    );

    let interrupted = tokio::select! {
        _ = launcher.wait_for_exit() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        println!("\n{} Stopping game...", "==>".bold().cyan());
        launcher.stop();
    }

    launcher.handle_close().await;
    println!("{} Game exited", "✓".green());
    Ok(())
}

pub async fn runtime(paths: LauncherPaths, config: LauncherConfig) -> anyhow::Result<()> {
    let launcher = build_launcher(paths, config)?;
    let home = launcher.ensure_runtime().await?;
    println!("{} JDK ready at {}", "✓".green(), home.display());
    Ok(())
}
