use super::build_launcher;
use colored::Colorize;
use quantum_launcher::config::LauncherConfig;
use quantum_launcher::paths::LauncherPaths;
use quantum_launcher::platform::PlatformProfile;
use quantum_launcher::version::VersionKind;

pub async fn versions(paths: LauncherPaths, config: LauncherConfig) -> anyhow::Result<()> {
    let mut launcher = build_launcher(paths, config)?;
    let entries = launcher.refresh_versions().await;

    let channel_count = entries
        .iter()
        .filter(|e| e.version.kind == VersionKind::Channel)
        .count();
    if entries.len() == channel_count {
        println!(
            "{} Release index unavailable; showing channels only",
            "⚠".yellow()
        );
    }

    println!("{}", "==> Versions".bold().green());
    for entry in entries {
        let marker = if entry.selected { "*" } else { " " };
        let kind = match entry.version.kind {
            VersionKind::Channel => "channel",
            VersionKind::Indev => "indev",
            VersionKind::Release => "release",
        };
        print!(
            "{} {:<16} {}",
            marker.cyan(),
            entry.version.id.bold(),
            format!("({}, {})", entry.version.display_name, kind).dimmed()
        );
        if entry.installed {
            print!(" {}", "installed".green());
        }
        println!();
    }

    Ok(())
}

pub fn paths(paths: &LauncherPaths, config: &LauncherConfig) -> anyhow::Result<()> {
    println!("{}: {}", "Root".bold(), paths.root().display());
    println!("{}: {}", "Versions".bold(), paths.versions_dir().display());
    println!("{}: {}", "Staging".bold(), paths.temp_dir().display());
    println!("{}: {}", "Runtime".bold(), paths.runtime_dir().display());
    println!("{}: {}", "Log".bold(), paths.log_file().display());
    println!("{}: {}", "Release cache".bold(), paths.releases_file().display());

    match PlatformProfile::detect(&config.runtime_version) {
        Ok(profile) => {
            println!(
                "{}: {}",
                "Java".bold(),
                profile.java_executable(&paths.runtime_dir()).display()
            );
            println!("{}: {}/{}", "Platform".bold(), profile.os, profile.arch);
        }
        Err(e) => println!("{}: {}", "Platform".bold(), e.to_string().red()),
    }

    Ok(())
}
